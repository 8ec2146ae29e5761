//! The signed-in user's loans.

#[cfg(test)]
#[path = "borrow_history_test.rs"]
mod borrow_history_test;

use std::fmt;

use time::OffsetDateTime;

use super::notice::{ApiResultExt, Notice, ViewError};
use crate::models::{BorrowRecord, BorrowStatus};
use crate::net::api;
use crate::net::client::ApiClient;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HistoryTab {
    #[default]
    Borrowed,
    Returned,
    All,
}

impl HistoryTab {
    pub const ALL: [HistoryTab; 3] = [HistoryTab::Borrowed, HistoryTab::Returned, HistoryTab::All];

    /// `status` filter sent to the server; `All` sends none.
    #[must_use]
    pub fn status(self) -> Option<BorrowStatus> {
        match self {
            Self::Borrowed => Some(BorrowStatus::Borrowed),
            Self::Returned => Some(BorrowStatus::Returned),
            Self::All => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Borrowed => "borrowed",
            Self::Returned => "returned",
            Self::All => "all",
        }
    }
}

impl fmt::Display for HistoryTab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for HistoryTab {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|tab| tab.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown tab: {s}"))
    }
}

/// Due-date standing of one loan at a given instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DueStatus {
    Returned,
    Overdue { days: i64 },
    DueIn { days: i64 },
}

impl DueStatus {
    #[must_use]
    pub fn of(record: &BorrowRecord, now: OffsetDateTime) -> Self {
        if record.status == BorrowStatus::Returned {
            return Self::Returned;
        }
        let days = record.days_left(now);
        if record.is_overdue(now) {
            Self::Overdue { days: days.abs() }
        } else {
            Self::DueIn { days }
        }
    }
}

impl fmt::Display for DueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Returned => f.write_str("returned"),
            Self::Overdue { days } => write!(f, "overdue by {days} day(s)"),
            Self::DueIn { days } => write!(f, "{days} day(s) left"),
        }
    }
}

#[derive(Debug)]
pub struct BorrowHistoryView {
    api: ApiClient,
    tab: HistoryTab,
    records: Vec<BorrowRecord>,
}

impl BorrowHistoryView {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self { api, tab: HistoryTab::default(), records: Vec::new() }
    }

    #[must_use]
    pub fn tab(&self) -> HistoryTab {
        self.tab
    }

    #[must_use]
    pub fn records(&self) -> &[BorrowRecord] {
        &self.records
    }

    /// # Errors
    ///
    /// The API failure, as a notice-ready [`ViewError`].
    pub async fn load(&mut self) -> Result<(), ViewError> {
        self.records = api::my_borrow_history(&self.api, self.tab.status())
            .await
            .or_notice("Failed to fetch borrow history")?;
        tracing::debug!(tab = %self.tab, count = self.records.len(), "borrow history loaded");
        Ok(())
    }

    /// Switch tab and re-fetch.
    ///
    /// # Errors
    ///
    /// See [`BorrowHistoryView::load`].
    pub async fn select_tab(&mut self, tab: HistoryTab) -> Result<(), ViewError> {
        self.tab = tab;
        self.load().await
    }

    /// Return a loan, then re-fetch the current tab.
    ///
    /// # Errors
    ///
    /// The server's refusal (e.g. already returned).
    pub async fn return_book(&mut self, record_id: &str) -> Result<Notice, ViewError> {
        api::return_book(&self.api, record_id)
            .await
            .or_notice("Failed to return book")?;
        tracing::info!(record_id, "book returned");

        if let Err(e) = self.load().await {
            tracing::warn!(error = %e, "re-fetch after return failed");
        }
        Ok(Notice::success("Book returned successfully"))
    }

    #[must_use]
    pub fn overdue(&self, now: OffsetDateTime) -> Vec<&BorrowRecord> {
        self.records.iter().filter(|r| r.is_overdue(now)).collect()
    }
}
