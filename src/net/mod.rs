//! Networking for the LibraryHub REST API.
//!
//! SYSTEM CONTEXT
//! ==============
//! `transport` is the raw HTTP seam (reqwest in production, an in-memory
//! server in tests), `client` wraps it with the session hooks, `inflight`
//! de-duplicates concurrent identical mutations, `api` holds the typed
//! endpoint calls and `error` the failure taxonomy.

pub mod api;
pub mod client;
pub mod error;
pub mod inflight;
pub mod transport;
