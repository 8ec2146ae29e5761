//! Route table and client-side navigation.
//!
//! SYSTEM CONTEXT
//! ==============
//! The HTTP client forces navigation to `/login` on 401 through the
//! [`Navigator`] seam; the shell resolves user navigation through the guard
//! and records the landing route in a [`Router`].

#[cfg(test)]
#[path = "routes_test.rs"]
mod routes_test;

use std::fmt;
use std::sync::{Mutex, PoisonError};

use crate::models::Role;

/// Access requirement of a route.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    Public,
    Authenticated,
    Roles(&'static [Role]),
}

pub const STAFF_ROLES: &[Role] = &[Role::Admin, Role::Librarian];
pub const ADMIN_ROLES: &[Role] = &[Role::Admin];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Route {
    Home,
    Login,
    Register,
    Books,
    BorrowHistory,
    Profile,
    AdminBooks,
    AdminUsers,
}

impl Route {
    pub const ALL: [Route; 8] = [
        Route::Home,
        Route::Login,
        Route::Register,
        Route::Books,
        Route::BorrowHistory,
        Route::Profile,
        Route::AdminBooks,
        Route::AdminUsers,
    ];

    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::Home => "/",
            Self::Login => "/login",
            Self::Register => "/register",
            Self::Books => "/books",
            Self::BorrowHistory => "/borrow",
            Self::Profile => "/profile",
            Self::AdminBooks => "/admin/books",
            Self::AdminUsers => "/admin/users",
        }
    }

    /// Match a path; anything unknown falls back to home.
    #[must_use]
    pub fn from_path(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let trimmed = path.trim_end_matches('/');
        let normalized = if trimmed.is_empty() { "/" } else { trimmed };
        Self::ALL
            .into_iter()
            .find(|route| route.path() == normalized)
            .unwrap_or(Self::Home)
    }

    #[must_use]
    pub fn access(self) -> Access {
        match self {
            Self::Home | Self::Login | Self::Register | Self::Books => Access::Public,
            Self::BorrowHistory | Self::Profile => Access::Authenticated,
            Self::AdminBooks => Access::Roles(STAFF_ROLES),
            Self::AdminUsers => Access::Roles(ADMIN_ROLES),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Anything that can move the client to a route without further checks.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

/// Current route plus the navigation trail.
#[derive(Debug)]
pub struct Router {
    inner: Mutex<RouterInner>,
}

#[derive(Debug)]
struct RouterInner {
    current: Route,
    history: Vec<Route>,
}

impl Router {
    #[must_use]
    pub fn new(start: Route) -> Self {
        Self {
            inner: Mutex::new(RouterInner { current: start, history: vec![start] }),
        }
    }

    #[must_use]
    pub fn current(&self) -> Route {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).current
    }

    #[must_use]
    pub fn history(&self) -> Vec<Route> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).history.clone()
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new(Route::Home)
    }
}

impl Navigator for Router {
    fn navigate(&self, route: Route) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.current = route;
        inner.history.push(route);
        tracing::debug!(route = %route, "navigated");
    }
}
