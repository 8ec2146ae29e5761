//! Auth-session state: bearer token plus the cached current user.
//!
//! DESIGN
//! ======
//! One `SessionStore` per process, shared as `Arc<SessionStore>` and passed
//! explicitly to the HTTP client and shell. The token is mirrored to a
//! durable [`TokenStorage`] on every change; the durable copy is read once,
//! when the store is opened, and never again.
//!
//! ERROR HANDLING
//! ==============
//! Durable-write failures are logged and never block the in-memory update, so
//! logout always leaves memory cleared even when the disk is read-only.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::models::User;

const TOKEN_FILE_NAME: &str = "session.json";

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session storage I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("session record is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Durable backend holding the single session-token record.
pub trait TokenStorage: Send + Sync {
    /// Read the persisted token, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the record exists but cannot be read.
    fn load(&self) -> Result<Option<String>, SessionError>;

    /// Persist `token`, replacing any previous record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be written.
    fn save(&self, token: &str) -> Result<(), SessionError>;

    /// Delete the record. Removing a missing record is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing record cannot be deleted.
    fn remove(&self) -> Result<(), SessionError>;
}

impl<T: TokenStorage + ?Sized> TokenStorage for std::sync::Arc<T> {
    fn load(&self) -> Result<Option<String>, SessionError> {
        (**self).load()
    }

    fn save(&self, token: &str) -> Result<(), SessionError> {
        (**self).save(token)
    }

    fn remove(&self) -> Result<(), SessionError> {
        (**self).remove()
    }
}

#[derive(Serialize, Deserialize)]
struct TokenRecord {
    token: String,
}

/// JSON record `{"token": "..."}` in the client state directory.
#[derive(Debug, Clone)]
pub struct FileTokenStorage {
    path: PathBuf,
}

impl FileTokenStorage {
    #[must_use]
    pub fn in_dir(dir: &Path) -> Self {
        Self { path: dir.join(TOKEN_FILE_NAME) }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> SessionError {
        SessionError::Io { path: self.path.clone(), source }
    }
}

impl TokenStorage for FileTokenStorage {
    fn load(&self) -> Result<Option<String>, SessionError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };
        let record: TokenRecord = serde_json::from_str(&raw)?;
        Ok(Some(record.token).filter(|token| !token.is_empty()))
    }

    fn save(&self, token: &str) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let raw = serde_json::to_string(&TokenRecord { token: token.to_owned() })?;
        std::fs::write(&self.path, raw).map_err(|e| self.io_error(e))
    }

    fn remove(&self) -> Result<(), SessionError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }
}

/// Non-durable backend for tests and `--ephemeral` runs.
#[derive(Debug, Default)]
pub struct MemoryTokenStorage {
    value: Mutex<Option<String>>,
}

impl MemoryTokenStorage {
    #[must_use]
    pub fn with_token(token: &str) -> Self {
        Self { value: Mutex::new(Some(token.to_owned())) }
    }

    /// Current durable value, for assertions.
    #[must_use]
    pub fn stored(&self) -> Option<String> {
        self.value.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl TokenStorage for MemoryTokenStorage {
    fn load(&self) -> Result<Option<String>, SessionError> {
        Ok(self.stored())
    }

    fn save(&self, token: &str) -> Result<(), SessionError> {
        *self.value.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.to_owned());
        Ok(())
    }

    fn remove(&self) -> Result<(), SessionError> {
        *self.value.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

/// Snapshot of the in-memory session.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Session {
    pub token: Option<String>,
    pub user: Option<User>,
}

impl Session {
    #[must_use]
    pub fn is_cleared(&self) -> bool {
        self.token.is_none() && self.user.is_none()
    }
}

pub struct SessionStore {
    storage: Box<dyn TokenStorage>,
    state: Mutex<Session>,
}

impl SessionStore {
    /// Open the store, reading the durable token once.
    ///
    /// An unreadable record is logged and treated as absent.
    #[must_use]
    pub fn open(storage: Box<dyn TokenStorage>) -> Self {
        let token = match storage.load() {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read persisted session; starting signed out");
                None
            }
        };
        Self {
            storage,
            state: Mutex::new(Session { token, user: None }),
        }
    }

    /// Store backed only by memory.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::open(Box::new(MemoryTokenStorage::default()))
    }

    fn state(&self) -> std::sync::MutexGuard<'_, Session> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.state().token.clone()
    }

    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.state().user.clone()
    }

    #[must_use]
    pub fn snapshot(&self) -> Session {
        self.state().clone()
    }

    pub fn set_user(&self, user: Option<User>) {
        self.state().user = user;
    }

    /// Persist (or remove) the durable token, then update memory.
    pub fn set_token(&self, token: Option<String>) {
        let mut state = self.state();
        let written = match token.as_deref() {
            Some(token) => self.storage.save(token),
            None => self.storage.remove(),
        };
        if let Err(e) = written {
            tracing::warn!(error = %e, "failed to mirror session token to durable storage");
        }
        state.token = token;
    }

    /// Remove the durable record, then clear token and user.
    pub fn logout(&self) {
        let mut state = self.state();
        if let Err(e) = self.storage.remove() {
            tracing::warn!(error = %e, "failed to remove persisted session token");
        }
        state.token = None;
        state.user = None;
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("SessionStore")
            .field("has_token", &state.token.is_some())
            .field("user", &state.user.as_ref().map(|u| u.id.as_str()))
            .finish_non_exhaustive()
    }
}
