//! Journal data handed in by the application's core services.
//!
//! These are plain values; this crate never reads or writes journal storage.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single journal entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub body: String,
    pub date: NaiveDate,
    /// Free-form place, e.g. "Kyoto, Japan".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl JournalEntry {
    pub fn new(date: NaiveDate, body: impl Into<String>) -> Self {
        Self {
            title: None,
            body: body.into(),
            date,
            location: None,
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

/// A recorded trip expense.
///
/// Amounts are reported as entered; no currency conversion happens here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub description: String,
    pub category: String,
    pub amount: f64,
    pub currency: String,
    pub date: NaiveDate,
}

impl Expense {
    pub fn new(
        date: NaiveDate,
        description: impl Into<String>,
        category: impl Into<String>,
        amount: f64,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            description: description.into(),
            category: category.into(),
            amount,
            currency: currency.into(),
            date,
        }
    }
}

/// Anything the truncation policy can order chronologically.
pub trait Dated {
    fn date(&self) -> NaiveDate;
}

impl Dated for JournalEntry {
    fn date(&self) -> NaiveDate {
        self.date
    }
}

impl Dated for Expense {
    fn date(&self) -> NaiveDate {
        self.date
    }
}
