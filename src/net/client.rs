//! Authenticated API client.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every REST call goes through [`ApiClient::request`]. The outgoing hook
//! attaches `Authorization: Bearer <token>` from the session store while the
//! request is built; the incoming hook turns any 401 into a session wipe plus
//! forced navigation to `/login` before the error reaches the caller. This is
//! the only place a network response mutates the session.

#[cfg(test)]
#[path = "client_test.rs"]
mod client_test;

use std::sync::Arc;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::error::ApiError;
use super::inflight::{InFlightGuard, RequestKey};
use super::transport::{HttpRequest, HttpResponse, RequestBody, Transport};
use crate::routes::{Navigator, Route};
use crate::session::SessionStore;

/// Query-string builder that drops absent and empty values.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestOptions {
    pub query: Vec<(String, String)>,
}

impl RequestOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn param(mut self, name: &str, value: Option<impl ToString>) -> Self {
        if let Some(value) = value {
            let value = value.to_string();
            if !value.trim().is_empty() {
                self.query.push((name.to_owned(), value));
            }
        }
        self
    }
}

#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    base_url: String,
    session: Arc<SessionStore>,
    navigator: Arc<dyn Navigator>,
    in_flight: InFlightGuard,
}

impl ApiClient {
    #[must_use]
    pub fn new(
        transport: Arc<dyn Transport>,
        base_url: &str,
        session: Arc<SessionStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            transport,
            base_url: base_url.trim_end_matches('/').to_owned(),
            session,
            navigator,
            in_flight: InFlightGuard::default(),
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// Outgoing hook: resolve the URL and attach the current bearer token.
    #[must_use]
    pub fn prepare(&self, method: Method, path: &str, body: RequestBody, options: RequestOptions) -> HttpRequest {
        let path = if path.starts_with('/') { path.to_owned() } else { format!("/{path}") };
        let mut headers = vec![("Accept".to_owned(), "application/json".to_owned())];
        if let Some(token) = self.session.token() {
            headers.push(("Authorization".to_owned(), format!("Bearer {token}")));
        }
        HttpRequest {
            method,
            url: format!("{}{path}", self.base_url),
            path,
            query: options.query,
            headers,
            body,
        }
    }

    /// Issue one request and return the JSON body of a 2xx response.
    ///
    /// # Errors
    ///
    /// - [`ApiError::Network`] when no response arrived
    /// - [`ApiError::Auth`] on 401, after the session was cleared
    /// - [`ApiError::Validation`] / [`ApiError::Server`] for other failures
    /// - [`ApiError::DuplicateRequest`] when an identical mutation is in flight
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: RequestBody,
        options: RequestOptions,
    ) -> Result<Value, ApiError> {
        let request = self.prepare(method, path, body, options);
        let method = request.method.clone();
        let path = request.path.clone();

        let _ticket = if method == Method::GET {
            None
        } else {
            let ticket = self.in_flight.try_acquire(RequestKey::for_request(&request));
            if ticket.is_none() {
                tracing::warn!(%method, %path, "dropping duplicate in-flight request");
                return Err(ApiError::DuplicateRequest { method: method.to_string(), path });
            }
            ticket
        };

        tracing::debug!(%method, url = %request.url, "request");
        let response = match self.transport.send(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(%method, %path, error = %e, "request failed");
                return Err(e);
            }
        };
        self.handle_response(&method, &path, response)
    }

    /// Incoming hook.
    fn handle_response(&self, method: &Method, path: &str, response: HttpResponse) -> Result<Value, ApiError> {
        if response.is_success() {
            tracing::debug!(%method, %path, status = response.status, "response");
            return Ok(response.body);
        }

        let error = ApiError::from_status(response.status, &response.body);
        if response.status == 401 {
            tracing::warn!(%method, %path, "unauthorized; clearing session");
            self.session.logout();
            self.navigator.navigate(Route::Login);
        } else {
            tracing::warn!(%method, %path, status = response.status, error = %error, "request rejected");
        }
        Err(error)
    }

    /// GET and decode.
    ///
    /// # Errors
    ///
    /// Everything [`ApiClient::request`] returns, plus [`ApiError::Decode`].
    pub async fn get<T: DeserializeOwned>(&self, path: &str, options: RequestOptions) -> Result<T, ApiError> {
        let value = self.request(Method::GET, path, RequestBody::Empty, options).await?;
        decode(value)
    }

    /// Send a body and decode the response.
    ///
    /// # Errors
    ///
    /// Everything [`ApiClient::request`] returns, plus [`ApiError::Decode`].
    pub async fn send<T: DeserializeOwned>(&self, method: Method, path: &str, body: RequestBody) -> Result<T, ApiError> {
        let value = self.request(method, path, body, RequestOptions::new()).await?;
        decode(value)
    }

    /// Send a body and ignore the response payload.
    ///
    /// # Errors
    ///
    /// Everything [`ApiClient::request`] returns.
    pub async fn execute(&self, method: Method, path: &str, body: RequestBody) -> Result<(), ApiError> {
        self.request(method, path, body, RequestOptions::new()).await.map(|_| ())
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
}
