//! Login and registration forms.

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use super::notice::{ApiResultExt, Notice, ViewError};
use super::{MIN_PASSWORD_LEN, non_blank};
use crate::net::api::{self, Credentials, Registration};
use crate::net::error::ApiError;
use crate::shell::App;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    /// # Errors
    ///
    /// [`ViewError::Invalid`] naming the first missing field.
    pub fn validate(&self) -> Result<Credentials, ViewError> {
        let email = non_blank(&self.email).ok_or_else(|| ViewError::invalid("Email is required"))?;
        if self.password.is_empty() {
            return Err(ViewError::invalid("Password is required"));
        }
        Ok(Credentials { email, password: self.password.clone() })
    }

    /// Sign in and land on the catalog.
    ///
    /// # Errors
    ///
    /// Validation failures, or the server's refusal.
    pub async fn submit(&self, app: &App) -> Result<Notice, ViewError> {
        let credentials = self.validate()?;
        let payload = api::login(app.api(), &credentials)
            .await
            .map_err(login_error)?;
        app.sign_in(payload);
        Ok(Notice::success("Login successful"))
    }
}

fn login_error(error: ApiError) -> ViewError {
    match error.status() {
        Some(404) => ViewError::Api { message: "User not found. Please check your email.".to_owned(), source: error },
        Some(401) => ViewError::Api { message: "Invalid email or password.".to_owned(), source: error },
        _ => ViewError::api("Login failed", error),
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl RegisterForm {
    /// # Errors
    ///
    /// [`ViewError::Invalid`] for the first rule the input breaks.
    pub fn validate(&self) -> Result<Registration, ViewError> {
        let name = non_blank(&self.name).ok_or_else(|| ViewError::invalid("Name is required"))?;
        let email = non_blank(&self.email).ok_or_else(|| ViewError::invalid("Email is required"))?;
        if self.password.is_empty() {
            return Err(ViewError::invalid("Password is required"));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ViewError::invalid("Password must be at least 6 characters"));
        }
        if self.password != self.confirm_password {
            return Err(ViewError::invalid("Passwords do not match"));
        }
        Ok(Registration { name, email, password: self.password.clone() })
    }

    /// Create the account, sign in and land on the catalog.
    ///
    /// # Errors
    ///
    /// Validation failures, or the server's refusal (e.g. email taken).
    pub async fn submit(&self, app: &App) -> Result<Notice, ViewError> {
        let registration = self.validate()?;
        let payload = api::register(app.api(), &registration)
            .await
            .or_notice("Registration failed")?;
        app.sign_in(payload);
        Ok(Notice::success("Account created successfully"))
    }
}
