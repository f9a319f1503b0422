//! Typed results returned to the presentation layer.

use serde::{Deserialize, Serialize};

use super::CompletionResult;

/// Whether a result came from the model or was computed locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputStatus {
    /// Generated by the provider (possibly served from the cache).
    Native,
    /// Locally computed approximation, or model text that failed to parse.
    Degraded,
    /// Canned answer for an empty input set; no provider was involved.
    Empty,
}

/// Result of one analysis operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis<T> {
    pub value: T,
    pub status: OutputStatus,
    /// Provider that produced the text, when one did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// Served from the response cache.
    #[serde(default)]
    pub cached: bool,
    /// Number of input records that made it into the prompt.
    pub considered: usize,
    /// Number of input records supplied.
    pub total: usize,
}

impl<T> Analysis<T> {
    /// Canned result for an empty input set.
    pub fn empty(value: T) -> Self {
        Self {
            value,
            status: OutputStatus::Empty,
            provider: None,
            cached: false,
            considered: 0,
            total: 0,
        }
    }

    pub(crate) fn native(value: T, result: &CompletionResult, considered: usize, total: usize) -> Self {
        Self {
            value,
            status: OutputStatus::Native,
            provider: Some(result.provider.clone()),
            cached: result.cached,
            considered,
            total,
        }
    }

    pub(crate) fn degraded(value: T, provider: Option<String>, considered: usize, total: usize) -> Self {
        Self {
            value,
            status: OutputStatus::Degraded,
            provider,
            cached: false,
            considered,
            total,
        }
    }

    pub fn is_native(&self) -> bool {
        self.status == OutputStatus::Native
    }

    pub fn is_degraded(&self) -> bool {
        self.status == OutputStatus::Degraded
    }

    /// Whether the input had to be cut down to fit the prompt budget.
    pub fn was_truncated(&self) -> bool {
        self.considered < self.total
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Analysis<U> {
        Analysis {
            value: f(self.value),
            status: self.status,
            provider: self.provider,
            cached: self.cached,
            considered: self.considered,
            total: self.total,
        }
    }
}

/// Output of a use case that expects structured data.
///
/// `Unparsed` carries the model's raw text when it could not be parsed even
/// after a corrective re-prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Structured<T> {
    Parsed(T),
    Unparsed(String),
}

impl<T> Structured<T> {
    pub fn parsed(&self) -> Option<&T> {
        match self {
            Structured::Parsed(v) => Some(v),
            Structured::Unparsed(_) => None,
        }
    }

    pub fn into_parsed(self) -> Option<T> {
        match self {
            Structured::Parsed(v) => Some(v),
            Structured::Unparsed(_) => None,
        }
    }

    pub fn unparsed(&self) -> Option<&str> {
        match self {
            Structured::Parsed(_) => None,
            Structured::Unparsed(s) => Some(s),
        }
    }
}

/// Metadata extracted from a set of entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryMetadata {
    #[serde(default)]
    pub mood: Option<String>,
    #[serde(default)]
    pub themes: Vec<String>,
    #[serde(default)]
    pub people: Vec<String>,
    #[serde(default)]
    pub places: Vec<String>,
    #[serde(default)]
    pub activities: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceRecommendation {
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub reason: String,
}

/// Narrative reading of a trip's expenses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpenseReport {
    pub summary: String,
    #[serde(default)]
    pub highlights: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
}
