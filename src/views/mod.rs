//! Headless feature views.
//!
//! SYSTEM CONTEXT
//! ==============
//! One module per screen. A view holds the screen's filters and the last
//! fetched rows, validates form input before anything is sent, and re-fetches
//! after every successful mutation. Business rules stay on the server; its
//! refusals come back as [`ViewError::Api`] carrying the server's message.
//!
//! Front ends (the CLI) render the rows and print [`Notice`]s.

pub mod admin_books;
pub mod admin_users;
pub mod auth;
pub mod books;
pub mod borrow_history;
pub mod notice;
pub mod profile;

pub use notice::{Notice, NoticeLevel, ViewError};

/// Shared by registration and password change.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Listing size used by the admin screens.
pub const ADMIN_LIST_LIMIT: u32 = 100;

/// `None` for empty or whitespace-only input.
pub(crate) fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}
