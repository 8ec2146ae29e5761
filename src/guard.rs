//! Role guard.
//!
//! Every access decision goes through [`is_allowed`]; views never inspect
//! roles directly.

#[cfg(test)]
#[path = "guard_test.rs"]
mod guard_test;

use crate::models::{Role, User};
use crate::routes::{Access, Route};

/// Who is using the client right now.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthState {
    Anonymous,
    Authenticated(Role),
}

impl AuthState {
    #[must_use]
    pub fn from_user(user: Option<&User>) -> Self {
        user.map_or(Self::Anonymous, |user| Self::Authenticated(user.role))
    }

    #[must_use]
    pub fn role(self) -> Option<Role> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated(role) => Some(role),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Redirect(Route),
}

/// Capability check: does `current` appear in `required`?
#[must_use]
pub fn is_allowed(required: &[Role], current: Role) -> bool {
    required.contains(&current)
}

#[must_use]
pub fn authorize(access: Access, state: AuthState) -> Decision {
    match (access, state) {
        (Access::Public, _) => Decision::Allow,
        (Access::Authenticated | Access::Roles(_), AuthState::Anonymous) => Decision::Redirect(Route::Login),
        (Access::Authenticated, AuthState::Authenticated(_)) => Decision::Allow,
        (Access::Roles(required), AuthState::Authenticated(role)) => {
            if is_allowed(required, role) {
                Decision::Allow
            } else {
                Decision::Redirect(Route::Books)
            }
        }
    }
}

/// Final landing route for a navigation attempt.
///
/// Redirect targets are public, so one redirect always settles.
#[must_use]
pub fn resolve(route: Route, state: AuthState) -> Route {
    match authorize(route.access(), state) {
        Decision::Allow => route,
        Decision::Redirect(target) => {
            debug_assert_eq!(target.access(), Access::Public);
            target
        }
    }
}
