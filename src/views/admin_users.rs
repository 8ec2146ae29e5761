//! User administration (admin only).

#[cfg(test)]
#[path = "admin_users_test.rs"]
mod admin_users_test;

use super::notice::{ApiResultExt, Notice, ViewError};
use super::{ADMIN_LIST_LIMIT, non_blank};
use crate::models::{Role, User, UserStatistics};
use crate::net::api::{self, UserQuery};
use crate::net::client::ApiClient;

#[derive(Debug)]
pub struct AdminUsersView {
    api: ApiClient,
    search: String,
    users: Vec<User>,
    stats: Option<UserStatistics>,
}

impl AdminUsersView {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self { api, search: String::new(), users: Vec::new(), stats: None }
    }

    #[must_use]
    pub fn users(&self) -> &[User] {
        &self.users
    }

    /// Last statistics fetched; `None` until one succeeds.
    #[must_use]
    pub fn stats(&self) -> Option<&UserStatistics> {
        self.stats.as_ref()
    }

    /// Fetch the user list and the statistics panel.
    ///
    /// Statistics failures are only logged.
    ///
    /// # Errors
    ///
    /// The user-list API failure.
    pub async fn load(&mut self) -> Result<(), ViewError> {
        self.load_users().await?;
        self.load_stats().await;
        Ok(())
    }

    /// # Errors
    ///
    /// See [`AdminUsersView::load`].
    pub async fn set_search(&mut self, search: &str) -> Result<(), ViewError> {
        self.search = search.to_owned();
        self.load().await
    }

    async fn load_users(&mut self) -> Result<(), ViewError> {
        let query = UserQuery {
            search: non_blank(&self.search),
            limit: Some(ADMIN_LIST_LIMIT),
            ..UserQuery::default()
        };
        self.users = api::list_users(&self.api, &query)
            .await
            .or_notice("Failed to fetch users")?
            .data;
        Ok(())
    }

    async fn load_stats(&mut self) {
        match api::user_statistics(&self.api).await {
            Ok(stats) => self.stats = Some(stats),
            Err(e) => tracing::error!(error = %e, "failed to fetch user statistics"),
        }
    }

    async fn refresh(&mut self) {
        if let Err(e) = self.load_users().await {
            tracing::warn!(error = %e, "re-fetch after user change failed");
        }
    }

    /// Flip a user between active and inactive.
    ///
    /// # Errors
    ///
    /// The server's refusal.
    pub async fn toggle_status(&mut self, id: &str) -> Result<Notice, ViewError> {
        api::toggle_user_status(&self.api, id)
            .await
            .or_notice("Failed to update status")?;
        tracing::info!(user_id = id, "user status toggled");
        self.refresh().await;
        Ok(Notice::success("User status updated"))
    }

    /// # Errors
    ///
    /// The server's refusal.
    pub async fn change_role(&mut self, id: &str, role: Role) -> Result<Notice, ViewError> {
        api::change_user_role(&self.api, id, role)
            .await
            .or_notice("Failed to update role")?;
        tracing::info!(user_id = id, %role, "user role changed");
        self.refresh().await;
        Ok(Notice::success("User role updated"))
    }

    /// # Errors
    ///
    /// The server's refusal.
    pub async fn delete(&mut self, id: &str) -> Result<Notice, ViewError> {
        api::delete_user(&self.api, id)
            .await
            .map_err(|e| ViewError::Api { message: "Failed to delete user".to_owned(), source: e })?;
        tracing::info!(user_id = id, "user deleted");
        self.refresh().await;
        Ok(Notice::success("User deleted successfully"))
    }
}
