//! Raw HTTP seam.
//!
//! DESIGN
//! ======
//! [`Transport`] takes a fully prepared request (URL resolved, credentials
//! attached) and returns status + JSON body. It never interprets statuses;
//! that belongs to the client's response hook. Tests swap in an in-memory
//! server behind the same trait.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::Method;
use serde_json::Value;

use super::error::ApiError;

#[derive(Clone, Debug, PartialEq)]
pub enum FormField {
    Text { name: String, value: String },
    File { name: String, path: PathBuf },
}

impl FormField {
    #[must_use]
    pub fn text(name: &str, value: impl Into<String>) -> Self {
        Self::Text { name: name.to_owned(), value: value.into() }
    }

    #[must_use]
    pub fn file(name: &str, path: PathBuf) -> Self {
        Self::File { name: name.to_owned(), path }
    }
}

#[derive(Clone, Debug, PartialEq, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(Value),
    Multipart(Vec<FormField>),
}

/// A request ready for the wire.
#[derive(Clone, Debug)]
pub struct HttpRequest {
    pub method: Method,
    /// Path relative to the API base, e.g. `/books/3`.
    pub path: String,
    /// Absolute URL (`base + path`).
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

impl HttpRequest {
    /// Case-insensitive header lookup.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    #[must_use]
    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Value,
}

impl HttpResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Send a prepared request.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Network`] when no response was received and
    /// [`ApiError::Request`] when the request could not be assembled.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError>;
}

pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    /// Build the shared reqwest client.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Request`] if the TLS backend fails to initialize.
    pub fn new(timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| ApiError::Request(e.to_string()))?;
        Ok(Self { http })
    }
}

#[async_trait::async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let mut builder = self.http.request(request.method, &request.url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(json) => builder.json(&json),
            RequestBody::Multipart(fields) => builder.multipart(build_form(fields).await?),
        };

        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Ok(HttpResponse { status, body: parse_body(text) })
    }
}

async fn build_form(fields: Vec<FormField>) -> Result<reqwest::multipart::Form, ApiError> {
    let mut form = reqwest::multipart::Form::new();
    for field in fields {
        form = match field {
            FormField::Text { name, value } => form.text(name, value),
            FormField::File { name, path } => {
                let bytes = tokio::fs::read(&path)
                    .await
                    .map_err(|e| ApiError::Request(format!("cannot read {}: {e}", path.display())))?;
                let file_name = path
                    .file_name()
                    .map_or_else(|| "upload".to_owned(), |n| n.to_string_lossy().into_owned());
                let part = reqwest::multipart::Part::bytes(bytes)
                    .file_name(file_name)
                    .mime_str(guess_mime(&path))
                    .map_err(|e| ApiError::Request(e.to_string()))?;
                form.part(name, part)
            }
        };
    }
    Ok(form)
}

fn guess_mime(path: &std::path::Path) -> &'static str {
    let ext = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

/// JSON when possible, otherwise the raw text; empty bodies become `null`.
pub(crate) fn parse_body(text: String) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(&text).unwrap_or(Value::String(text))
}
