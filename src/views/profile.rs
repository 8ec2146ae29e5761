//! The signed-in user's own profile and password.

#[cfg(test)]
#[path = "profile_test.rs"]
mod profile_test;

use std::path::PathBuf;

use super::notice::{ApiResultExt, Notice, ViewError};
use super::{MIN_PASSWORD_LEN, non_blank};
use crate::models::User;
use crate::net::api::{self, PasswordChange, ProfileUpdate};
use crate::net::client::ApiClient;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProfileForm {
    pub name: String,
    pub email: String,
    pub profile_image: Option<PathBuf>,
}

impl ProfileForm {
    /// Pre-fill from the loaded account.
    #[must_use]
    pub fn from_user(user: &User) -> Self {
        Self { name: user.name.clone(), email: user.email.clone(), profile_image: None }
    }

    /// # Errors
    ///
    /// [`ViewError::Invalid`] when name or email is blank.
    pub fn validate(&self) -> Result<ProfileUpdate, ViewError> {
        match (non_blank(&self.name), non_blank(&self.email)) {
            (Some(name), Some(email)) => Ok(ProfileUpdate { name, email, profile_image: self.profile_image.clone() }),
            _ => Err(ViewError::invalid("Name and email are required")),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PasswordForm {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

impl PasswordForm {
    /// # Errors
    ///
    /// [`ViewError::Invalid`] for the first rule the input breaks.
    pub fn validate(&self) -> Result<PasswordChange, ViewError> {
        if self.current_password.is_empty() || self.new_password.is_empty() || self.confirm_password.is_empty() {
            return Err(ViewError::invalid("All password fields are required"));
        }
        if self.new_password != self.confirm_password {
            return Err(ViewError::invalid("New passwords do not match"));
        }
        if self.new_password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ViewError::invalid("New password must be at least 6 characters"));
        }
        Ok(PasswordChange {
            current_password: self.current_password.clone(),
            new_password: self.new_password.clone(),
        })
    }
}

#[derive(Debug)]
pub struct ProfileView {
    api: ApiClient,
    user: Option<User>,
}

impl ProfileView {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self { api, user: None }
    }

    #[must_use]
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    fn user_id(&self) -> Result<String, ViewError> {
        self.api
            .session()
            .user()
            .map(|user| user.id)
            .ok_or_else(|| ViewError::invalid("Please login to view your profile"))
    }

    /// Fetch the account behind the session.
    ///
    /// # Errors
    ///
    /// [`ViewError::Invalid`] when signed out, else the API failure.
    pub async fn load(&mut self) -> Result<&User, ViewError> {
        let id = self.user_id()?;
        let user = api::get_user(&self.api, &id)
            .await
            .or_notice("Failed to fetch profile")?;
        Ok(self.user.insert(user))
    }

    /// # Errors
    ///
    /// Validation failures, or the server's refusal (e.g. email taken).
    pub async fn update(&mut self, form: &ProfileForm) -> Result<Notice, ViewError> {
        let id = self.user_id()?;
        let update = form.validate()?;
        let user = api::update_user(&self.api, &id, update)
            .await
            .or_notice("Failed to update profile")?;
        tracing::info!(user_id = %user.id, "profile updated");
        self.user = Some(user);
        Ok(Notice::success("Profile updated successfully"))
    }

    /// # Errors
    ///
    /// Validation failures, or the server's refusal (e.g. wrong current password).
    pub async fn change_password(&self, form: &PasswordForm) -> Result<Notice, ViewError> {
        let id = self.user_id()?;
        let change = form.validate()?;
        api::change_password(&self.api, &id, &change)
            .await
            .or_notice("Failed to change password")?;
        tracing::info!(user_id = %id, "password changed");
        Ok(Notice::success("Password changed successfully"))
    }
}
