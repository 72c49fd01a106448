//! Per-issue ledger construction.
//!
//! Combines one issue's notes, label events, and commits into a
//! [`WrappedIssue`]: a day-bucketed spend ledger plus lifecycle timestamps.
//! Construction is a pure function of its inputs; re-invocation with
//! identical inputs yields a value-equal result.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;

use crate::labels::{LabelClassifier, TaskState};
use crate::model::{Commit, Issue, LabelEvent, Note, User};
use crate::spend::{parse_estimate, parse_spent};
use crate::types::DateRange;

/// One issue enriched with its derived time ledger and lifecycle timeline.
///
/// Immutable after construction; a re-fetch replaces the value wholesale.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WrappedIssue {
    pub issue: Issue,
    /// Day-bucketed spend ledger in hours. When present, buckets tile the
    /// lookback-to-end range exhaustively with no gaps or overlaps.
    pub spends: BTreeMap<DateRange, f64>,
    /// First time the in-work label was added.
    pub start_time: Option<DateTime<Utc>>,
    /// First time a passed label was added.
    pub pass_time: Option<DateTime<Utc>>,
    /// Close timestamp, if the issue is closed.
    pub end_time: Option<DateTime<Utc>>,
    /// Workflow stage; `None` when the label set is unclassifiable.
    pub status: Option<TaskState>,
    /// The issue's labels restricted to catalog-known names.
    pub labels: Vec<String>,
    /// Label events, sorted by timestamp.
    pub events: Vec<LabelEvent>,
    /// Notes that are plain comments rather than time commands.
    pub comments: Vec<Note>,
    /// Commits from known user identities, oldest first.
    pub commits: Vec<Commit>,
}

impl WrappedIssue {
    /// Sum of every spend bucket, i.e. total parsed spend over the ledger
    /// range, in hours.
    #[must_use]
    pub fn total_spend_hours(&self) -> f64 {
        self.spends.values().sum()
    }
}

/// Builds the ledger for one issue, or `None` for a no-signal issue.
///
/// An issue has signal when it carries at least one note that parses to a
/// nonzero spend or estimate, or at least one label event. The spend ledger
/// tiles `[floor, end]` day by day and is only populated when qualifying
/// notes exist.
///
/// Commits whose author email does not map to a known user are excluded.
/// This is a filtering policy, not an error; exclusions are logged.
#[must_use]
#[allow(clippy::needless_pass_by_value)]
pub fn build_wrapped_issue(
    issue: Issue,
    notes: Vec<Note>,
    events: Vec<LabelEvent>,
    commits: Vec<Commit>,
    classifier: &LabelClassifier,
    users: &[User],
    floor: NaiveDate,
    end: NaiveDate,
) -> Option<WrappedIssue> {
    let (command_notes, comments): (Vec<Note>, Vec<Note>) = notes.into_iter().partition(|note| {
        parse_spent(&note.body).abs() > f64::EPSILON
            || parse_estimate(&note.body).abs() > f64::EPSILON
    });

    if command_notes.is_empty() && events.is_empty() {
        return None;
    }

    let spends = if command_notes.is_empty() {
        BTreeMap::new()
    } else {
        bucket_spends(&command_notes, floor, end)
    };

    let mut events = events;
    events.sort_by_key(|e| e.created_at);

    let start_time = classifier.start_time(&events);
    let pass_time = classifier.passed_time(&events);
    let end_time = issue.closed_at;

    let labels = classifier.known_labels(&issue.labels);
    let status = if issue.is_closed() {
        Some(TaskState::Done)
    } else {
        classifier.task_state(&labels)
    };

    let mut commits = filter_known_commits(commits, users, issue.iid);
    commits.sort_by(|a, b| a.created_at.cmp(&b.created_at));

    Some(WrappedIssue {
        issue,
        spends,
        start_time,
        pass_time,
        end_time,
        status,
        labels,
        events,
        comments,
        commits,
    })
}

/// Tiles `[floor, end]` with day buckets, summing parsed spend of the notes
/// created within each day.
fn bucket_spends(notes: &[Note], floor: NaiveDate, end: NaiveDate) -> BTreeMap<DateRange, f64> {
    let mut spends = BTreeMap::new();
    let mut day = floor;
    while day <= end {
        let bucket = DateRange::day(day);
        let hours: f64 = notes
            .iter()
            .filter(|note| bucket.contains(note.created_at))
            .map(|note| parse_spent(&note.body))
            .sum();
        spends.insert(bucket, hours);
        day += Duration::days(1);
    }
    spends
}

/// Keeps only commits whose author email belongs to a known user.
fn filter_known_commits(commits: Vec<Commit>, users: &[User], issue_iid: u64) -> Vec<Commit> {
    commits
        .into_iter()
        .filter(|commit| {
            let known = users.iter().any(|u| u.email == commit.author_email);
            if !known {
                tracing::debug!(
                    issue = issue_iid,
                    author = %commit.author_email,
                    commit = %commit.short_id,
                    "excluding commit from unknown author"
                );
            }
            known
        })
        .collect()
}
