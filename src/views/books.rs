//! Catalog browsing and borrowing.

#[cfg(test)]
#[path = "books_test.rs"]
mod books_test;

use time::Date;

use super::non_blank;
use super::notice::{ApiResultExt, Notice, ViewError};
use crate::models::Book;
use crate::net::api::{self, BookQuery};
use crate::net::client::ApiClient;

pub const PAGE_SIZE: u32 = 12;

/// Category filter choices; no category means all.
pub const CATEGORIES: [&str; 5] = ["Fiction", "Non-fiction", "Science", "History", "Biography"];

#[derive(Debug)]
pub struct BooksView {
    api: ApiClient,
    search: String,
    category: Option<String>,
    page: u32,
    books: Vec<Book>,
    total_pages: u32,
}

impl BooksView {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            search: String::new(),
            category: None,
            page: 1,
            books: Vec::new(),
            total_pages: 1,
        }
    }

    #[must_use]
    pub fn books(&self) -> &[Book] {
        &self.books
    }

    #[must_use]
    pub fn page(&self) -> u32 {
        self.page
    }

    #[must_use]
    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    #[must_use]
    pub fn search(&self) -> &str {
        &self.search
    }

    #[must_use]
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    #[must_use]
    pub fn query(&self) -> BookQuery {
        BookQuery {
            search: non_blank(&self.search),
            category: self.category.clone(),
            page: Some(self.page),
            limit: Some(PAGE_SIZE),
        }
    }

    /// Fetch the current page with the current filters.
    ///
    /// # Errors
    ///
    /// The API failure, as a notice-ready [`ViewError`].
    pub async fn load(&mut self) -> Result<(), ViewError> {
        let page = api::list_books(&self.api, &self.query())
            .await
            .or_notice("Failed to fetch books")?;
        self.total_pages = page.total_pages();
        self.books = page.data;
        tracing::debug!(page = self.page, count = self.books.len(), "books loaded");
        Ok(())
    }

    /// New search term; back to page 1 and re-fetch.
    ///
    /// # Errors
    ///
    /// See [`BooksView::load`].
    pub async fn set_search(&mut self, search: &str) -> Result<(), ViewError> {
        self.search = search.to_owned();
        self.page = 1;
        self.load().await
    }

    /// New category (`None`, empty or `all` clears it); back to page 1 and re-fetch.
    ///
    /// # Errors
    ///
    /// See [`BooksView::load`].
    pub async fn set_category(&mut self, category: Option<&str>) -> Result<(), ViewError> {
        self.category = normalize_category(category);
        self.page = 1;
        self.load().await
    }

    /// Set search, category and page together and fetch once.
    ///
    /// The page count is unknown until the first response, so a `page` past
    /// the end costs one more fetch of the last page.
    ///
    /// # Errors
    ///
    /// See [`BooksView::load`].
    pub async fn open(&mut self, search: &str, category: Option<&str>, page: u32) -> Result<(), ViewError> {
        self.search = search.to_owned();
        self.category = normalize_category(category);
        self.page = page.max(1);
        self.load().await?;
        if self.page > self.total_pages.max(1) {
            self.page = self.total_pages.max(1);
            self.load().await?;
        }
        Ok(())
    }

    /// Jump to `page`, clamped to the known page range.
    ///
    /// # Errors
    ///
    /// See [`BooksView::load`].
    pub async fn go_to_page(&mut self, page: u32) -> Result<(), ViewError> {
        self.page = page.clamp(1, self.total_pages.max(1));
        self.load().await
    }

    /// Returns `false` without fetching when already on the last page.
    ///
    /// # Errors
    ///
    /// See [`BooksView::load`].
    pub async fn next_page(&mut self) -> Result<bool, ViewError> {
        if self.page >= self.total_pages {
            return Ok(false);
        }
        self.page += 1;
        self.load().await.map(|()| true)
    }

    /// Returns `false` without fetching when already on page 1.
    ///
    /// # Errors
    ///
    /// See [`BooksView::load`].
    pub async fn prev_page(&mut self) -> Result<bool, ViewError> {
        if self.page <= 1 {
            return Ok(false);
        }
        self.page -= 1;
        self.load().await.map(|()| true)
    }

    /// Borrow `book_id` until `due_date`, then re-fetch the page.
    ///
    /// # Errors
    ///
    /// [`ViewError::Invalid`] when signed out, out of stock, or the due date
    /// is missing or before `today`; otherwise the server's refusal.
    pub async fn borrow(&mut self, book_id: &str, due_date: Option<Date>, today: Date) -> Result<Notice, ViewError> {
        if self.api.session().user().is_none() {
            return Err(ViewError::invalid("Please login to borrow books"));
        }
        if self
            .books
            .iter()
            .any(|book| book.id == book_id && !book.is_available())
        {
            return Err(ViewError::invalid("No copies available"));
        }
        let Some(due_date) = due_date else {
            return Err(ViewError::invalid("Please select a due date"));
        };
        if due_date < today {
            return Err(ViewError::invalid("Due date cannot be in the past"));
        }

        api::borrow_book(&self.api, book_id, due_date)
            .await
            .or_notice("Failed to borrow book")?;
        tracing::info!(book_id, due = %due_date, "book borrowed");

        if let Err(e) = self.load().await {
            tracing::warn!(error = %e, "re-fetch after borrow failed");
        }
        Ok(Notice::success("Book borrowed successfully"))
    }
}

fn normalize_category(category: Option<&str>) -> Option<String> {
    category
        .and_then(non_blank)
        .filter(|c| !c.eq_ignore_ascii_case("all"))
}
