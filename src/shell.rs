//! Application shell.
//!
//! SYSTEM CONTEXT
//! ==============
//! Owns the process-wide session store, the router and the authenticated API
//! client, and is the only entry point for user navigation. Every
//! navigation is resolved through the role guard before the router moves.
//!
//! STARTUP
//! =======
//! With a persisted token and no cached user, [`App::startup`] issues exactly
//! one `GET /auth/me`. Failure is logged and swallowed; the user stays
//! anonymous. A 401 still runs the client's hook, which clears the stale
//! token and lands on `/login`.

#[cfg(test)]
#[path = "shell_test.rs"]
mod shell_test;

use std::sync::Arc;

use crate::config::ClientConfig;
use crate::guard::{self, AuthState};
use crate::models::AuthPayload;
use crate::net::api;
use crate::net::client::ApiClient;
use crate::net::error::ApiError;
use crate::net::transport::{ReqwestTransport, Transport};
use crate::routes::{Navigator, Route, Router};
use crate::session::{SessionStore, TokenStorage};

#[derive(Debug)]
pub struct App {
    session: Arc<SessionStore>,
    router: Arc<Router>,
    api: ApiClient,
}

impl App {
    /// Production wiring: reqwest transport with the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Request`] if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig, storage: Box<dyn TokenStorage>) -> Result<Self, ApiError> {
        let transport = ReqwestTransport::new(config.request_timeout)?;
        let session = Arc::new(SessionStore::open(storage));
        tracing::info!(mode = ?config.mode, api = %config.api_base_url, "client configured");
        Ok(Self::with_transport(Arc::new(transport), &config.api_base_url, session))
    }

    #[must_use]
    pub fn with_transport(transport: Arc<dyn Transport>, base_url: &str, session: Arc<SessionStore>) -> Self {
        let router = Arc::new(Router::default());
        let api = ApiClient::new(
            transport,
            base_url,
            Arc::clone(&session),
            Arc::clone(&router) as Arc<dyn Navigator>,
        );
        Self { session, router, api }
    }

    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    #[must_use]
    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    #[must_use]
    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    #[must_use]
    pub fn current_route(&self) -> Route {
        self.router.current()
    }

    #[must_use]
    pub fn auth_state(&self) -> AuthState {
        AuthState::from_user(self.session.user().as_ref())
    }

    /// Silent re-hydration of the cached user from a persisted token.
    pub async fn startup(&self) -> AuthState {
        if self.session.token().is_none() || self.session.user().is_some() {
            return self.auth_state();
        }
        match api::fetch_current_user(&self.api).await {
            Ok(user) => {
                tracing::info!(user_id = %user.id, role = %user.role, "session restored");
                self.session.set_user(Some(user));
            }
            Err(e) => {
                tracing::warn!(error = %e, "session restore failed; continuing signed out");
            }
        }
        self.auth_state()
    }

    /// Navigate through the guard; returns the route actually reached.
    pub fn navigate(&self, route: Route) -> Route {
        let landing = guard::resolve(route, self.auth_state());
        if landing != route {
            tracing::info!(requested = %route, redirected = %landing, "navigation redirected");
        }
        self.router.navigate(landing);
        landing
    }

    /// [`App::navigate`] for a raw path; unknown paths land on home.
    pub fn navigate_path(&self, path: &str) -> Route {
        self.navigate(Route::from_path(path))
    }

    /// Store a login/register response and go to the catalog.
    pub fn sign_in(&self, payload: AuthPayload) {
        tracing::info!(user_id = %payload.user.id, role = %payload.user.role, "signed in");
        self.session.set_token(Some(payload.token));
        self.session.set_user(Some(payload.user));
        self.navigate(Route::Books);
    }

    pub fn logout(&self) {
        tracing::info!("signed out");
        self.session.logout();
        self.router.navigate(Route::Login);
    }
}
