//! Core value types shared across the engine.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Validation errors for engine configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required label name was empty.
    #[error("{field} label cannot be empty")]
    EmptyLabel { field: &'static str },

    /// Two workflow stages were configured with the same label name.
    #[error("label {label:?} is configured for more than one workflow stage")]
    DuplicateStageLabel { label: String },

    /// A date range was constructed with `start >= end`.
    #[error("date range start {start} must precede end {end}")]
    EmptyRange { start: NaiveDate, end: NaiveDate },

    /// A date range string could not be parsed.
    #[error("invalid date range {0:?}, expected \"YYYY-MM-DD/YYYY-MM-DD\"")]
    RangeParse(String),
}

/// A half-open day interval `[start, end)`.
///
/// Used as the value-equality key for spend buckets. Ordering follows the
/// start date so `BTreeMap<DateRange, _>` iterates chronologically.
/// Serializes as the string `"YYYY-MM-DD/YYYY-MM-DD"` so it can key JSON
/// maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Creates a range after validating that `start < end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ValidationError> {
        if start >= end {
            return Err(ValidationError::EmptyRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// The single-day bucket `[date, date + 1d)`.
    #[must_use]
    pub fn day(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date + Duration::days(1),
        }
    }

    /// First day covered by the range.
    #[must_use]
    pub const fn start(&self) -> NaiveDate {
        self.start
    }

    /// First day after the range.
    #[must_use]
    pub const fn end(&self) -> NaiveDate {
        self.end
    }

    /// UTC midnight at the start of the range.
    #[must_use]
    pub fn start_time(&self) -> DateTime<Utc> {
        day_start(self.start)
    }

    /// UTC midnight at the (exclusive) end of the range.
    #[must_use]
    pub fn end_time(&self) -> DateTime<Utc> {
        day_start(self.end)
    }

    /// Whether a timestamp falls inside the half-open interval.
    #[must_use]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        let date = at.date_naive();
        date >= self.start && date < self.end
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.start, self.end)
    }
}

impl FromStr for DateRange {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, end) = s
            .split_once('/')
            .ok_or_else(|| ValidationError::RangeParse(s.to_string()))?;
        let start = start
            .parse::<NaiveDate>()
            .map_err(|_| ValidationError::RangeParse(s.to_string()))?;
        let end = end
            .parse::<NaiveDate>()
            .map_err(|_| ValidationError::RangeParse(s.to_string()))?;
        Self::new(start, end)
    }
}

impl Serialize for DateRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DateRange {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// UTC midnight at the start of the given day.
#[must_use]
pub fn day_start(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// The configured label taxonomy of a workflow board.
///
/// All classification is driven by this catalog; the engine carries no
/// hardcoded label names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelCatalog {
    /// Label marking an issue as ready for work.
    pub to_do: String,
    /// Label marking an issue as actively worked on.
    pub doing: String,
    /// Label marking an issue as finished.
    pub done: String,
    /// Labels meaning "exited active development" independent of `done`.
    #[serde(default)]
    pub passed: Vec<String>,
    /// Issues carrying any of these are excluded from dashboard totals.
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Extra mutually-exclusive board labels beyond the three stages.
    #[serde(default)]
    pub board: Vec<String>,
}

impl Default for LabelCatalog {
    fn default() -> Self {
        Self {
            to_do: "To Do".to_string(),
            doing: "Doing".to_string(),
            done: "Done".to_string(),
            passed: Vec::new(),
            exclude: Vec::new(),
            board: Vec::new(),
        }
    }
}

impl LabelCatalog {
    /// Validates that stage labels are non-empty and mutually distinct.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, label) in [
            ("to_do", &self.to_do),
            ("doing", &self.doing),
            ("done", &self.done),
        ] {
            if label.is_empty() {
                return Err(ValidationError::EmptyLabel { field });
            }
        }
        for (a, b) in [
            (&self.to_do, &self.doing),
            (&self.to_do, &self.done),
            (&self.doing, &self.done),
        ] {
            if a == b {
                return Err(ValidationError::DuplicateStageLabel { label: a.clone() });
            }
        }
        Ok(())
    }

    /// Whether `label` belongs to the mutually-exclusive board set.
    #[must_use]
    pub fn is_board_label(&self, label: &str) -> bool {
        label == self.to_do
            || label == self.doing
            || label == self.done
            || self.board.iter().any(|l| l == label)
    }

    /// Whether `label` means the issue has exited active development.
    ///
    /// The `done` stage label is part of the passed set.
    #[must_use]
    pub fn is_passed_label(&self, label: &str) -> bool {
        label == self.done || self.passed.iter().any(|l| l == label)
    }

    /// Whether `label` excludes its issue from dashboard stratification.
    #[must_use]
    pub fn is_exclude_label(&self, label: &str) -> bool {
        self.exclude.iter().any(|l| l == label)
    }
}
