//! Wire DTOs for the LibraryHub REST API.
//!
//! DESIGN
//! ======
//! These are transient caches of server state. Field names follow the
//! server's camelCase JSON; identifiers are normalized to strings because the
//! API emits them as numbers in some deployments and strings in others.

#[cfg(test)]
#[path = "models_test.rs"]
mod models_test;

use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

const SECONDS_PER_DAY: i64 = 86_400;

/// Account role; decides which admin screens a user may reach.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Member,
    Librarian,
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Member, Role::Librarian, Role::Admin];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Librarian => "librarian",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "member" => Ok(Self::Member),
            "librarian" => Ok(Self::Librarian),
            "admin" => Ok(Self::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// An account as returned by `/auth/me` and `/users`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub profile_image: Option<String>,
}

fn default_active() -> bool {
    true
}

/// A catalog entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub title: String,
    pub author: String,
    pub isbn: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub published_year: Option<i32>,
    pub total_copies: u32,
    pub available_copies: u32,
    #[serde(default)]
    pub cover_image: Option<String>,
}

impl Book {
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.available_copies > 0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BorrowStatus {
    Borrowed,
    Returned,
}

impl BorrowStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Borrowed => "borrowed",
            Self::Returned => "returned",
        }
    }
}

impl fmt::Display for BorrowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One loan of one book copy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BorrowRecord {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(deserialize_with = "deserialize_id")]
    pub book_id: String,
    /// Embedded book row; the server names this association `Book`.
    #[serde(default, rename = "Book", alias = "book")]
    pub book: Option<Book>,
    #[serde(default, alias = "userId", deserialize_with = "deserialize_opt_id")]
    pub borrower_id: Option<String>,
    #[serde(
        serialize_with = "time::serde::rfc3339::serialize",
        deserialize_with = "deserialize_timestamp"
    )]
    pub borrow_date: OffsetDateTime,
    #[serde(
        serialize_with = "time::serde::rfc3339::serialize",
        deserialize_with = "deserialize_timestamp"
    )]
    pub due_date: OffsetDateTime,
    pub status: BorrowStatus,
}

impl BorrowRecord {
    /// Overdue only while still borrowed; a returned loan is never overdue.
    #[must_use]
    pub fn is_overdue(&self, now: OffsetDateTime) -> bool {
        self.status == BorrowStatus::Borrowed && self.due_date < now
    }

    /// Whole days until the due date, rounded up. Negative once overdue.
    #[must_use]
    pub fn days_left(&self, now: OffsetDateTime) -> i64 {
        let secs = (self.due_date - now).whole_seconds();
        let floor = secs.div_euclid(SECONDS_PER_DAY);
        if secs.rem_euclid(SECONDS_PER_DAY) == 0 {
            floor
        } else {
            floor + 1
        }
    }

    #[must_use]
    pub fn title(&self) -> &str {
        self.book.as_ref().map_or("(unknown book)", |book| book.title.as_str())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default, alias = "totalPages")]
    pub pages: u32,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
}

/// A list response: `{ data: [...], pagination? }`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

impl<T> Page<T> {
    /// Page count for navigation; never below one.
    #[must_use]
    pub fn total_pages(&self) -> u32 {
        self.pagination.as_ref().map_or(1, |p| p.pages.max(1))
    }
}

/// A single-resource response: `{ data }`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

/// Login/register response carrying the bearer token and the account.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct AuthPayload {
    pub token: String,
    #[serde(rename = "data", alias = "user")]
    pub user: User,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleCounts {
    #[serde(default)]
    pub admin: u64,
    #[serde(default)]
    pub librarian: u64,
    #[serde(default)]
    pub member: u64,
}

/// Admin dashboard counters from `/users/statistics/all`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStatistics {
    #[serde(default)]
    pub total_users: u64,
    #[serde(default)]
    pub active_users: u64,
    #[serde(default)]
    pub inactive_users: u64,
    #[serde(default)]
    pub users_by_role: RoleCounts,
}

fn id_from_value<E: serde::de::Error>(value: serde_json::Value) -> Result<String, E> {
    match value {
        serde_json::Value::String(id) => Ok(id),
        serde_json::Value::Number(number) => Ok(number.to_string()),
        _ => Err(E::custom("expected string or numeric id")),
    }
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    id_from_value(serde_json::Value::deserialize(deserializer)?)
}

fn deserialize_opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(value) => id_from_value(value).map(Some),
    }
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).ok_or_else(|| D::Error::custom(format!("invalid timestamp: {raw}")))
}

/// Parse an RFC 3339 timestamp or a bare `YYYY-MM-DD` date (midnight UTC).
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<OffsetDateTime> {
    let raw = raw.trim();
    if let Ok(ts) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(ts);
    }
    parse_date(raw).map(|date| date.midnight().assume_utc())
}

/// Parse a `YYYY-MM-DD` form date.
#[must_use]
pub fn parse_date(raw: &str) -> Option<Date> {
    Date::parse(raw.trim(), format_description!("[year]-[month]-[day]")).ok()
}

/// Format a date the way the API expects due dates.
#[must_use]
pub fn format_date(date: Date) -> String {
    date.format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_default()
}
