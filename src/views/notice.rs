//! User-facing outcomes of view actions.

use std::fmt;

use serde::Serialize;

use crate::net::error::ApiError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Error,
}

/// One toast-style message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Success, message: message.into() }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Error, message: message.into() }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.level == NoticeLevel::Success
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Why a view action did not happen.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ViewError {
    /// Rejected by client-side form validation; nothing was sent.
    #[error("{0}")]
    Invalid(String),

    /// The server or the network refused the call.
    #[error("{message}")]
    Api {
        message: String,
        #[source]
        source: ApiError,
    },
}

impl ViewError {
    pub(crate) fn invalid(message: &str) -> Self {
        Self::Invalid(message.to_owned())
    }

    /// Wrap an API failure with the message a user should see.
    #[must_use]
    pub fn api(fallback: &str, source: ApiError) -> Self {
        Self::Api { message: source.user_message(fallback), source }
    }

    #[must_use]
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Invalid(_) => None,
            Self::Api { source, .. } => Some(source),
        }
    }

    #[must_use]
    pub fn notice(&self) -> Notice {
        Notice::error(self.to_string())
    }
}

/// Bind a fallback message to an API result.
pub(crate) trait ApiResultExt<T> {
    fn or_notice(self, fallback: &str) -> Result<T, ViewError>;
}

impl<T> ApiResultExt<T> for Result<T, ApiError> {
    fn or_notice(self, fallback: &str) -> Result<T, ViewError> {
        self.map_err(|e| ViewError::api(fallback, e))
    }
}
