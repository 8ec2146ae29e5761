//! Typed LibraryHub endpoint calls.
//!
//! One function per REST resource operation, all routed through
//! [`ApiClient`] so every call gets the bearer token and the 401 hook.
//! Responses are unwrapped from the server's `{ data }` envelope here so
//! views only see domain types.
//!
//! ERROR HANDLING
//! ==============
//! Every function returns the wrapper's [`ApiError`] unchanged; no call
//! retries and none swallows a failure.

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use std::path::PathBuf;

use reqwest::Method;
use serde::Serialize;
use serde_json::{Value, json};
use time::Date;

use super::client::{ApiClient, RequestOptions};
use super::error::ApiError;
use super::transport::{FormField, RequestBody};
use crate::models::{
    AuthPayload, Book, BorrowRecord, BorrowStatus, Envelope, Page, Role, User, UserStatistics, format_date,
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Catalog filters for `GET /books`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BookQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl BookQuery {
    fn options(&self) -> RequestOptions {
        RequestOptions::new()
            .param("search", self.search.as_deref())
            .param("category", self.category.as_deref())
            .param("page", self.page)
            .param("limit", self.limit)
    }
}

/// Directory filters for `GET /users`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UserQuery {
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl UserQuery {
    fn options(&self) -> RequestOptions {
        RequestOptions::new()
            .param("search", self.search.as_deref())
            .param("page", self.page)
            .param("limit", self.limit)
    }
}

/// Book create/update form, sent as multipart.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BookForm {
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub description: Option<String>,
    pub published_year: Option<i32>,
    pub total_copies: u32,
    /// Defaults to `total_copies` when unset.
    pub available_copies: Option<u32>,
    pub category: Option<String>,
    pub cover_image: Option<PathBuf>,
}

impl BookForm {
    /// Pre-fill an edit form from an existing book.
    #[must_use]
    pub fn from_book(book: &Book) -> Self {
        Self {
            title: book.title.clone(),
            author: book.author.clone(),
            isbn: book.isbn.clone(),
            description: book.description.clone(),
            published_year: book.published_year,
            total_copies: book.total_copies,
            available_copies: Some(book.available_copies),
            category: book.category.clone(),
            cover_image: None,
        }
    }

    #[must_use]
    pub fn effective_available(&self) -> u32 {
        self.available_copies.unwrap_or(self.total_copies)
    }

    #[must_use]
    pub fn into_fields(self) -> Vec<FormField> {
        let available = self.effective_available();
        let mut fields = vec![
            FormField::text("title", self.title.trim()),
            FormField::text("author", self.author.trim()),
            FormField::text("isbn", self.isbn.trim()),
            FormField::text("description", self.description.unwrap_or_default()),
            FormField::text(
                "publishedYear",
                self.published_year.map(|y| y.to_string()).unwrap_or_default(),
            ),
            FormField::text("totalCopies", self.total_copies.to_string()),
            FormField::text("availableCopies", available.to_string()),
            FormField::text("category", self.category.unwrap_or_default()),
        ];
        if let Some(path) = self.cover_image {
            fields.push(FormField::file("coverImage", path));
        }
        fields
    }
}

/// Profile form, sent as multipart.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub name: String,
    pub email: String,
    pub profile_image: Option<PathBuf>,
}

impl ProfileUpdate {
    #[must_use]
    pub fn into_fields(self) -> Vec<FormField> {
        let mut fields = vec![
            FormField::text("name", self.name.trim()),
            FormField::text("email", self.email.trim()),
        ];
        if let Some(path) = self.profile_image {
            fields.push(FormField::file("profileImage", path));
        }
        fields
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}

fn book_path(id: &str) -> String {
    format!("/books/{id}")
}

fn user_path(id: &str) -> String {
    format!("/users/{id}")
}

fn user_status_path(id: &str) -> String {
    format!("/users/{id}/status")
}

fn user_role_path(id: &str) -> String {
    format!("/users/{id}/role")
}

fn change_password_path(id: &str) -> String {
    format!("/users/{id}/change-password")
}

/// Numeric ids go back on the wire as numbers, anything else as a string.
fn id_json(id: &str) -> Value {
    id.parse::<i64>().map_or_else(|_| Value::String(id.to_owned()), Value::from)
}

fn to_json<T: Serialize>(body: &T) -> Result<RequestBody, ApiError> {
    serde_json::to_value(body)
        .map(RequestBody::Json)
        .map_err(|e| ApiError::Request(e.to_string()))
}

/// `POST /auth/login`.
///
/// # Errors
///
/// Any [`ApiError`]; bad credentials surface as `Auth` or `Validation`.
pub async fn login(api: &ApiClient, credentials: &Credentials) -> Result<AuthPayload, ApiError> {
    api.send(Method::POST, "/auth/login", to_json(credentials)?).await
}

/// `POST /auth/register`.
///
/// # Errors
///
/// Any [`ApiError`].
pub async fn register(api: &ApiClient, registration: &Registration) -> Result<AuthPayload, ApiError> {
    api.send(Method::POST, "/auth/register", to_json(registration)?).await
}

/// `GET /auth/me`: the account behind the current token.
///
/// # Errors
///
/// Any [`ApiError`].
pub async fn fetch_current_user(api: &ApiClient) -> Result<User, ApiError> {
    let envelope: Envelope<User> = api.get("/auth/me", RequestOptions::new()).await?;
    Ok(envelope.data)
}

/// `GET /books`.
///
/// # Errors
///
/// Any [`ApiError`].
pub async fn list_books(api: &ApiClient, query: &BookQuery) -> Result<Page<Book>, ApiError> {
    api.get("/books", query.options()).await
}

/// `POST /books` (multipart).
///
/// # Errors
///
/// Any [`ApiError`].
pub async fn create_book(api: &ApiClient, form: BookForm) -> Result<(), ApiError> {
    api.execute(Method::POST, "/books", RequestBody::Multipart(form.into_fields()))
        .await
}

/// `PUT /books/{id}` (multipart).
///
/// # Errors
///
/// Any [`ApiError`].
pub async fn update_book(api: &ApiClient, id: &str, form: BookForm) -> Result<(), ApiError> {
    api.execute(Method::PUT, &book_path(id), RequestBody::Multipart(form.into_fields()))
        .await
}

/// `DELETE /books/{id}`.
///
/// # Errors
///
/// Any [`ApiError`].
pub async fn delete_book(api: &ApiClient, id: &str) -> Result<(), ApiError> {
    api.execute(Method::DELETE, &book_path(id), RequestBody::Empty).await
}

/// `POST /borrow { bookId, dueDate }`.
///
/// # Errors
///
/// Any [`ApiError`]; stock and loan-limit refusals arrive as `Validation`.
pub async fn borrow_book(api: &ApiClient, book_id: &str, due_date: Date) -> Result<(), ApiError> {
    let body = json!({ "bookId": id_json(book_id), "dueDate": format_date(due_date) });
    api.execute(Method::POST, "/borrow", RequestBody::Json(body)).await
}

/// `POST /borrow/return { borrowRecordId }`.
///
/// # Errors
///
/// Any [`ApiError`].
pub async fn return_book(api: &ApiClient, record_id: &str) -> Result<(), ApiError> {
    let body = json!({ "borrowRecordId": id_json(record_id) });
    api.execute(Method::POST, "/borrow/return", RequestBody::Json(body)).await
}

/// `GET /borrow/history/my`; `None` lists every status.
///
/// # Errors
///
/// Any [`ApiError`].
pub async fn my_borrow_history(api: &ApiClient, status: Option<BorrowStatus>) -> Result<Vec<BorrowRecord>, ApiError> {
    let options = RequestOptions::new().param("status", status.map(BorrowStatus::as_str));
    let envelope: Envelope<Vec<BorrowRecord>> = api.get("/borrow/history/my", options).await?;
    Ok(envelope.data)
}

/// `GET /users`.
///
/// # Errors
///
/// Any [`ApiError`].
pub async fn list_users(api: &ApiClient, query: &UserQuery) -> Result<Page<User>, ApiError> {
    api.get("/users", query.options()).await
}

/// `GET /users/{id}`.
///
/// # Errors
///
/// Any [`ApiError`].
pub async fn get_user(api: &ApiClient, id: &str) -> Result<User, ApiError> {
    let envelope: Envelope<User> = api.get(&user_path(id), RequestOptions::new()).await?;
    Ok(envelope.data)
}

/// `PUT /users/{id}` (multipart); returns the updated account.
///
/// # Errors
///
/// Any [`ApiError`].
pub async fn update_user(api: &ApiClient, id: &str, update: ProfileUpdate) -> Result<User, ApiError> {
    let envelope: Envelope<User> = api
        .send(Method::PUT, &user_path(id), RequestBody::Multipart(update.into_fields()))
        .await?;
    Ok(envelope.data)
}

/// `PATCH /users/{id}/status`: flip active/inactive.
///
/// # Errors
///
/// Any [`ApiError`].
pub async fn toggle_user_status(api: &ApiClient, id: &str) -> Result<(), ApiError> {
    api.execute(Method::PATCH, &user_status_path(id), RequestBody::Empty).await
}

/// `PUT /users/{id}/role { role }`.
///
/// # Errors
///
/// Any [`ApiError`].
pub async fn change_user_role(api: &ApiClient, id: &str, role: Role) -> Result<(), ApiError> {
    let body = json!({ "role": role });
    api.execute(Method::PUT, &user_role_path(id), RequestBody::Json(body)).await
}

/// `DELETE /users/{id}`.
///
/// # Errors
///
/// Any [`ApiError`].
pub async fn delete_user(api: &ApiClient, id: &str) -> Result<(), ApiError> {
    api.execute(Method::DELETE, &user_path(id), RequestBody::Empty).await
}

/// `POST /users/{id}/change-password { currentPassword, newPassword }`.
///
/// # Errors
///
/// Any [`ApiError`]; a wrong current password arrives as `Validation`.
pub async fn change_password(api: &ApiClient, id: &str, change: &PasswordChange) -> Result<(), ApiError> {
    api.execute(Method::POST, &change_password_path(id), to_json(change)?).await
}

/// `GET /users/statistics/all`.
///
/// # Errors
///
/// Any [`ApiError`].
pub async fn user_statistics(api: &ApiClient) -> Result<UserStatistics, ApiError> {
    let envelope: Envelope<UserStatistics> = api.get("/users/statistics/all", RequestOptions::new()).await?;
    Ok(envelope.data)
}
