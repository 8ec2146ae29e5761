//! Client configuration parsed from environment variables.

use std::path::PathBuf;
use std::time::Duration;

pub const DEVELOPMENT_API_URL: &str = "http://localhost:3000/api";
pub const PRODUCTION_API_URL: &str = "https://library-backend-production-1103.up.railway.app/api";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown LIBRARYHUB_MODE: {0} (expected 'development' or 'production')")]
    UnknownMode(String),
    #[error("invalid API URL '{0}': expected an http:// or https:// URL")]
    InvalidApiUrl(String),
    #[error("invalid LIBRARYHUB_TIMEOUT_SECS: {0}")]
    InvalidTimeout(String),
}

/// Deployment flavor; decides the default API base URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeploymentMode {
    #[default]
    Development,
    Production,
}

impl DeploymentMode {
    /// Parse a mode flag such as `development`, `dev`, `production` or `prod`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownMode`] for any other value.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(ConfigError::UnknownMode(other.to_owned())),
        }
    }

    #[must_use]
    pub fn default_api_url(self) -> &'static str {
        match self {
            Self::Development => DEVELOPMENT_API_URL,
            Self::Production => PRODUCTION_API_URL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub mode: DeploymentMode,
    /// Resolved once; never changes for the lifetime of the process.
    pub api_base_url: String,
    pub request_timeout: Duration,
    /// Directory holding the durable session record. `None` keeps the session in memory only.
    pub state_dir: Option<PathBuf>,
}

/// Explicitly set config values; anything left `None` falls back to a default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub mode: Option<DeploymentMode>,
    pub api_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub state_dir: Option<PathBuf>,
}

impl ConfigOverrides {
    /// Read overrides from environment variables.
    ///
    /// A `.env` file in the working directory is loaded first when present.
    ///
    /// Optional:
    /// - `LIBRARYHUB_MODE`: `development` (default) or `production`
    /// - `LIBRARYHUB_API_URL`: overrides the mode's default base URL
    /// - `LIBRARYHUB_TIMEOUT_SECS`: default 10
    /// - `LIBRARYHUB_STATE_DIR`: where the session token is persisted
    ///
    /// # Errors
    ///
    /// Returns an error if the mode or timeout cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let mode = std::env::var("LIBRARYHUB_MODE")
            .ok()
            .map(|raw| DeploymentMode::parse(&raw))
            .transpose()?;
        let api_url = std::env::var("LIBRARYHUB_API_URL").ok();
        let timeout_secs = std::env::var("LIBRARYHUB_TIMEOUT_SECS")
            .ok()
            .map(|raw| {
                raw.trim()
                    .parse::<u64>()
                    .map_err(|_| ConfigError::InvalidTimeout(raw.clone()))
            })
            .transpose()?;
        let state_dir = std::env::var_os("LIBRARYHUB_STATE_DIR").map(PathBuf::from);

        Ok(Self { mode, api_url, timeout_secs, state_dir })
    }

    /// Field-wise: values set on `self` win over `fallback`.
    #[must_use]
    pub fn or(self, fallback: Self) -> Self {
        Self {
            mode: self.mode.or(fallback.mode),
            api_url: self.api_url.or(fallback.api_url),
            timeout_secs: self.timeout_secs.or(fallback.timeout_secs),
            state_dir: self.state_dir.or(fallback.state_dir),
        }
    }
}

impl ClientConfig {
    /// Build typed client config from environment variables.
    ///
    /// See [`ConfigOverrides::from_env`] for the variables read.
    ///
    /// # Errors
    ///
    /// Returns an error if the mode, URL or timeout cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_overrides(ConfigOverrides::from_env()?)
    }

    /// Resolve overrides against the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidApiUrl`] if the URL override is not http(s).
    pub fn from_overrides(overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        Self::build(
            overrides.mode.unwrap_or_default(),
            overrides.api_url.as_deref(),
            overrides.timeout_secs.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            overrides.state_dir,
        )
    }

    /// Build config from already-parsed values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidApiUrl`] if the override is not an http(s) URL.
    pub fn build(
        mode: DeploymentMode,
        api_url: Option<&str>,
        timeout_secs: u64,
        state_dir: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let api_base_url = resolve_base_url(mode, api_url)?;
        Ok(Self {
            mode,
            api_base_url,
            request_timeout: Duration::from_secs(timeout_secs),
            state_dir,
        })
    }

    /// Origin that serves uploaded assets (the API base without its `/api` suffix).
    #[must_use]
    pub fn asset_base_url(&self) -> &str {
        self.api_base_url
            .strip_suffix("/api")
            .unwrap_or(&self.api_base_url)
    }

    /// Resolve a server-relative asset path such as `/uploads/covers/1.jpg`.
    #[must_use]
    pub fn asset_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_owned();
        }
        if path.starts_with('/') {
            format!("{}{path}", self.asset_base_url())
        } else {
            format!("{}/{path}", self.asset_base_url())
        }
    }
}

fn resolve_base_url(mode: DeploymentMode, api_url: Option<&str>) -> Result<String, ConfigError> {
    let raw = match api_url.map(str::trim) {
        Some(url) if !url.is_empty() => url,
        _ => mode.default_api_url(),
    };
    if !(raw.starts_with("http://") || raw.starts_with("https://")) {
        return Err(ConfigError::InvalidApiUrl(raw.to_owned()));
    }
    Ok(raw.trim_end_matches('/').to_owned())
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
