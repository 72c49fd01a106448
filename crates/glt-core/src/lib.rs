//! Time-accounting engine for issue-tracker tickets.
//!
//! This crate reconstructs, per issue, a day-bucketed ledger of time spent
//! and a lifecycle timeline from three independent signals:
//! - free-text activity notes carrying "time spent" commands
//! - label add/remove events encoding workflow transitions
//! - commit metadata attributed to known users
//!
//! and aggregates many such ledgers into period statistics.

pub mod calendar;
mod labels;
mod ledger;
pub mod model;
mod spend;
mod stage;
mod stats;
pub mod types;

pub use crate::labels::{LabelClassifier, TaskState};
pub use crate::ledger::{WrappedIssue, build_wrapped_issue};
pub use crate::spend::{parse_estimate, parse_spent};
pub use crate::stage::{StageMetric, stage_metric};
pub use crate::stats::{GitStatistics, ReportIssue, collect_statistics, report_rows, spends_sum};
pub use crate::types::{DateRange, LabelCatalog, ValidationError};
