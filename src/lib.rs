//! LibraryHub client core.
//!
//! SYSTEM CONTEXT
//! ==============
//! Headless client for the LibraryHub REST API. `net` owns the authenticated
//! HTTP wrapper, `session` the token/user store, `routes` + `guard` + `shell`
//! the role-gated navigation, and `views` the per-screen state and actions
//! that a front end (the CLI, or a UI shell) drives.

pub mod config;
pub mod guard;
pub mod models;
pub mod net;
pub mod routes;
pub mod session;
pub mod shell;
pub mod views;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::{ClientConfig, ConfigError, ConfigOverrides, DeploymentMode};
pub use net::client::ApiClient;
pub use net::error::ApiError;
pub use routes::Route;
pub use session::SessionStore;
pub use shell::App;
