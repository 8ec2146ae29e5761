//! De-duplication of concurrent identical mutations.
//!
//! DESIGN
//! ======
//! A double-submitted borrow or delete would otherwise reach the server
//! twice. Each non-GET request takes a ticket keyed by
//! `(method, path, hash(query + body))`; while a ticket is held, an identical
//! request is refused. Tickets release on drop, including on error paths.

#[cfg(test)]
#[path = "inflight_test.rs"]
mod inflight_test;

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use sha2::{Digest, Sha256};

use super::transport::{FormField, HttpRequest, RequestBody};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RequestKey {
    pub method: String,
    pub path: String,
    body_hash: [u8; 32],
}

impl RequestKey {
    #[must_use]
    pub fn for_request(request: &HttpRequest) -> Self {
        let mut hasher = Sha256::new();
        for (name, value) in &request.query {
            hasher.update(b"q:");
            hasher.update(name.as_bytes());
            hasher.update(b"=");
            hasher.update(value.as_bytes());
            hasher.update(b"\n");
        }
        match &request.body {
            RequestBody::Empty => hasher.update(b"empty"),
            RequestBody::Json(json) => {
                hasher.update(b"json:");
                hasher.update(json.to_string().as_bytes());
            }
            RequestBody::Multipart(fields) => {
                for field in fields {
                    match field {
                        FormField::Text { name, value } => {
                            hasher.update(b"text:");
                            hasher.update(name.as_bytes());
                            hasher.update(b"=");
                            hasher.update(value.as_bytes());
                        }
                        FormField::File { name, path } => {
                            hasher.update(b"file:");
                            hasher.update(name.as_bytes());
                            hasher.update(b"=");
                            hasher.update(path.to_string_lossy().as_bytes());
                        }
                    }
                    hasher.update(b"\n");
                }
            }
        }
        Self {
            method: request.method.as_str().to_owned(),
            path: request.path.clone(),
            body_hash: hasher.finalize().into(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct InFlightGuard {
    active: Arc<Mutex<HashSet<RequestKey>>>,
}

impl InFlightGuard {
    /// Claim `key`; `None` if an identical request already holds it.
    #[must_use]
    pub fn try_acquire(&self, key: RequestKey) -> Option<InFlightTicket> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if !active.insert(key.clone()) {
            return None;
        }
        Some(InFlightTicket { key, active: Arc::clone(&self.active) })
    }

    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.active.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Held for the duration of one request.
#[derive(Debug)]
pub struct InFlightTicket {
    key: RequestKey,
    active: Arc<Mutex<HashSet<RequestKey>>>,
}

impl Drop for InFlightTicket {
    fn drop(&mut self) {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}
