//! Failure taxonomy for API calls.
//!
//! ERROR HANDLING
//! ==============
//! Nothing here retries. Every failure is terminal for the user action that
//! issued it; views turn errors into notices with [`ApiError::user_message`].

#[cfg(test)]
#[path = "error_test.rs"]
mod error_test;

use serde_json::Value;

const SESSION_EXPIRED_MESSAGE: &str = "Session expired, please sign in again";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    /// No response was received.
    #[error("network error: {0}")]
    Network(String),

    /// 401 from the server. The session has already been cleared.
    #[error("unauthorized: {message}")]
    Auth { message: String },

    /// 4xx other than 401.
    #[error("request rejected ({status}): {message}")]
    Validation { status: u16, message: String },

    /// 5xx or any other unexpected status.
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// The body did not have the expected shape.
    #[error("unexpected response body: {0}")]
    Decode(String),

    /// An identical mutation is still in flight.
    #[error("an identical {method} {path} request is already in flight")]
    DuplicateRequest { method: String, path: String },

    /// The request could not be assembled (e.g. an upload file is unreadable).
    #[error("failed to build request: {0}")]
    Request(String),
}

impl ApiError {
    /// Classify a non-success status.
    #[must_use]
    pub fn from_status(status: u16, body: &Value) -> Self {
        let message = server_message(body);
        match status {
            401 => Self::Auth {
                message: message.unwrap_or_else(|| SESSION_EXPIRED_MESSAGE.to_owned()),
            },
            400..=499 => Self::Validation {
                status,
                message: message.unwrap_or_else(|| format!("request failed with status {status}")),
            },
            _ => Self::Server {
                status,
                message: message.unwrap_or_else(|| format!("server responded with status {status}")),
            },
        }
    }

    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Auth { .. } => Some(401),
            Self::Validation { status, .. } | Self::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth { .. })
    }

    /// Text for a user-facing notice.
    ///
    /// Validation and auth failures show the server's message; everything
    /// else shows `fallback`, with a hint when the server was unreachable.
    #[must_use]
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Auth { message } | Self::Validation { message, .. } => message.clone(),
            Self::Network(_) => format!("{fallback}: cannot reach the server"),
            Self::DuplicateRequest { .. } => "That request is already in progress".to_owned(),
            Self::Request(message) => format!("{fallback}: {message}"),
            Self::Server { .. } | Self::Decode(_) => fallback.to_owned(),
        }
    }
}

/// Pull `message` (or `error`) out of an error body.
fn server_message(body: &Value) -> Option<String> {
    let text = match body {
        Value::Object(map) => map
            .get("message")
            .or_else(|| map.get("error"))
            .and_then(Value::as_str),
        Value::String(text) => Some(text.as_str()),
        _ => None,
    }?;
    let text = text.trim();
    if text.is_empty() { None } else { Some(text.to_owned()) }
}
