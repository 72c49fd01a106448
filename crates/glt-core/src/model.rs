//! Snapshot types consumed from the issue tracker.
//!
//! These are read-only inputs owned by the external tracker; the engine
//! treats each fetch cycle's values as immutable.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Seconds in an hour, for converting tracker time fields.
const SECONDS_PER_HOUR: f64 = 3600.0;

/// Parse error for tracker enum fields.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid {field}: {value}")]
pub struct InvalidField {
    pub field: &'static str,
    pub value: String,
}

/// Open/closed state of an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueState {
    Opened,
    Closed,
}

impl IssueState {
    /// String representation matching the tracker API.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Opened => "opened",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for IssueState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for IssueState {
    type Err = InvalidField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "opened" => Ok(Self::Opened),
            "closed" => Ok(Self::Closed),
            _ => Err(InvalidField {
                field: "issue state",
                value: s.to_string(),
            }),
        }
    }
}

/// One tracker issue, as of the current fetch cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    /// Project-scoped issue number.
    pub iid: u64,
    pub title: String,
    pub state: IssueState,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    /// Current label set, unordered.
    pub labels: Vec<String>,
    /// Cumulative tracked time reported by the tracker.
    pub total_spent_seconds: i64,
    /// Current time estimate reported by the tracker.
    pub estimate_seconds: i64,
    /// Usernames of the current assignees.
    pub assignees: Vec<String>,
}

impl Issue {
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self.state, IssueState::Closed)
    }

    /// Tracker estimate converted to hours.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn estimate_hours(&self) -> f64 {
        self.estimate_seconds as f64 / SECONDS_PER_HOUR
    }

    /// Tracker cumulative spend converted to hours.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn spent_hours(&self) -> f64 {
        self.total_spent_seconds as f64 / SECONDS_PER_HOUR
    }
}

/// A free-text activity note on an issue.
///
/// May encode a time command (see [`crate::parse_spent`]); otherwise it is a
/// plain comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub author: String,
    pub created_at: DateTime<Utc>,
    pub body: String,
}

/// Whether a label was added to or removed from an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelAction {
    Add,
    Remove,
}

/// One label add/remove event. Unordered on arrival; consumers must sort by
/// timestamp before interpretation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEvent {
    pub label: String,
    pub action: LabelAction,
    pub actor: String,
    pub created_at: DateTime<Utc>,
}

/// Commit metadata attached to an issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub author_email: String,
    pub created_at: DateTime<Utc>,
    pub additions: u64,
    pub deletions: u64,
    pub short_id: String,
}

/// A known tracker user identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub email: String,
    pub display_name: String,
}
