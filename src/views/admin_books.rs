//! Catalog administration for librarians and admins.

#[cfg(test)]
#[path = "admin_books_test.rs"]
mod admin_books_test;

use super::notice::{ApiResultExt, Notice, ViewError};
use super::{ADMIN_LIST_LIMIT, non_blank};
use crate::models::Book;
use crate::net::api::{self, BookForm, BookQuery};
use crate::net::client::ApiClient;

/// Form rules checked before a create or update is sent.
///
/// # Errors
///
/// [`ViewError::Invalid`] for the first rule the form breaks.
pub fn validate_book(form: &BookForm) -> Result<(), ViewError> {
    if non_blank(&form.title).is_none() || non_blank(&form.author).is_none() || non_blank(&form.isbn).is_none() {
        return Err(ViewError::invalid("Title, author and ISBN are required"));
    }
    if form.total_copies < 1 {
        return Err(ViewError::invalid("Total copies must be at least 1"));
    }
    if form.effective_available() > form.total_copies {
        return Err(ViewError::invalid("Available copies cannot exceed total copies"));
    }
    Ok(())
}

#[derive(Debug)]
pub struct AdminBooksView {
    api: ApiClient,
    search: String,
    books: Vec<Book>,
}

impl AdminBooksView {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self { api, search: String::new(), books: Vec::new() }
    }

    #[must_use]
    pub fn books(&self) -> &[Book] {
        &self.books
    }

    #[must_use]
    pub fn find(&self, id: &str) -> Option<&Book> {
        self.books.iter().find(|book| book.id == id)
    }

    /// # Errors
    ///
    /// The API failure, as a notice-ready [`ViewError`].
    pub async fn load(&mut self) -> Result<(), ViewError> {
        let query = BookQuery {
            search: non_blank(&self.search),
            limit: Some(ADMIN_LIST_LIMIT),
            ..BookQuery::default()
        };
        self.books = api::list_books(&self.api, &query)
            .await
            .or_notice("Failed to fetch books")?
            .data;
        Ok(())
    }

    /// # Errors
    ///
    /// See [`AdminBooksView::load`].
    pub async fn set_search(&mut self, search: &str) -> Result<(), ViewError> {
        self.search = search.to_owned();
        self.load().await
    }

    /// # Errors
    ///
    /// Validation failures, or the server's refusal (e.g. duplicate ISBN).
    pub async fn create(&mut self, form: BookForm) -> Result<Notice, ViewError> {
        validate_book(&form)?;
        let title = form.title.trim().to_owned();
        api::create_book(&self.api, form)
            .await
            .or_notice("Failed to save book")?;
        tracing::info!(%title, "book created");
        self.refresh().await;
        Ok(Notice::success("Book created successfully"))
    }

    /// # Errors
    ///
    /// Validation failures, or the server's refusal.
    pub async fn update(&mut self, id: &str, form: BookForm) -> Result<Notice, ViewError> {
        validate_book(&form)?;
        api::update_book(&self.api, id, form)
            .await
            .or_notice("Failed to save book")?;
        tracing::info!(book_id = id, "book updated");
        self.refresh().await;
        Ok(Notice::success("Book updated successfully"))
    }

    /// # Errors
    ///
    /// The server's refusal.
    pub async fn delete(&mut self, id: &str) -> Result<Notice, ViewError> {
        api::delete_book(&self.api, id)
            .await
            .map_err(|e| ViewError::Api { message: "Failed to delete book".to_owned(), source: e })?;
        tracing::info!(book_id = id, "book deleted");
        self.refresh().await;
        Ok(Notice::success("Book deleted successfully"))
    }

    async fn refresh(&mut self) {
        if let Err(e) = self.load().await {
            tracing::warn!(error = %e, "re-fetch after book change failed");
        }
    }
}
