//! Label-set classification and workflow-stage transitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{LabelAction, LabelEvent};
use crate::types::{LabelCatalog, ValidationError};

/// Workflow stage of an issue, derived from its label set.
///
/// Stages are mutually exclusive; conflicting label combinations are a
/// policy violation resolved by priority (`Done` > `Doing` > `ToDo`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    ToDo,
    Doing,
    Done,
}

impl TaskState {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ToDo => "to do",
            Self::Doing => "doing",
            Self::Done => "done",
        }
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Pure mapping from label-name sets to workflow stages, configured once
/// from a [`LabelCatalog`].
#[derive(Debug, Clone)]
pub struct LabelClassifier {
    catalog: LabelCatalog,
}

impl LabelClassifier {
    /// Creates a classifier after validating the catalog.
    pub fn new(catalog: LabelCatalog) -> Result<Self, ValidationError> {
        catalog.validate()?;
        Ok(Self { catalog })
    }

    /// The underlying catalog.
    #[must_use]
    pub const fn catalog(&self) -> &LabelCatalog {
        &self.catalog
    }

    /// Label set after moving the issue into the doing stage.
    #[must_use]
    pub fn start_issue(&self, labels: &[String]) -> Vec<String> {
        self.transition(labels, &self.catalog.doing)
    }

    /// Label set after moving the issue back to the to-do stage.
    #[must_use]
    pub fn pause_issue(&self, labels: &[String]) -> Vec<String> {
        self.transition(labels, &self.catalog.to_do)
    }

    /// Label set after moving the issue to the done stage.
    #[must_use]
    pub fn finish_issue(&self, labels: &[String]) -> Vec<String> {
        self.transition(labels, &self.catalog.done)
    }

    /// Removes every board-exclusive label except `target`, then appends
    /// `target` if absent. Idempotent.
    fn transition(&self, labels: &[String], target: &str) -> Vec<String> {
        let mut next: Vec<String> = labels
            .iter()
            .filter(|label| label.as_str() == target || !self.catalog.is_board_label(label))
            .cloned()
            .collect();
        if !next.iter().any(|label| label == target) {
            next.push(target.to_string());
        }
        next
    }

    /// Whether the doing label is present.
    #[must_use]
    pub fn in_work(&self, labels: &[String]) -> bool {
        labels.iter().any(|l| *l == self.catalog.doing)
    }

    /// Whether the to-do label is present.
    #[must_use]
    pub fn is_ready_for_work(&self, labels: &[String]) -> bool {
        labels.iter().any(|l| *l == self.catalog.to_do)
    }

    /// Whether work on the issue is parked: back on to-do and not in work.
    #[must_use]
    pub fn is_paused(&self, labels: &[String]) -> bool {
        self.is_ready_for_work(labels) && !self.in_work(labels)
    }

    /// Whether any passed label (including done) is present.
    #[must_use]
    pub fn is_passed(&self, labels: &[String]) -> bool {
        labels.iter().any(|l| self.catalog.is_passed_label(l))
    }

    /// Maps a label set to a workflow stage.
    ///
    /// More than one stage predicate holding simultaneously is an
    /// inconsistent-state condition: it is logged and the highest-priority
    /// match wins (`Done` > `Doing` > `ToDo`). An unclassifiable set maps
    /// to `None`.
    #[must_use]
    pub fn task_state(&self, labels: &[String]) -> Option<TaskState> {
        let passed = self.is_passed(labels);
        let doing = self.in_work(labels);
        let ready = self.is_ready_for_work(labels);

        if usize::from(passed) + usize::from(doing) + usize::from(ready) > 1 {
            tracing::warn!(?labels, "inconsistent label state, using highest-priority stage");
        }

        if passed {
            Some(TaskState::Done)
        } else if doing {
            Some(TaskState::Doing)
        } else if ready {
            Some(TaskState::ToDo)
        } else {
            None
        }
    }

    /// Restricts a label set to names the catalog knows about.
    #[must_use]
    pub fn known_labels(&self, labels: &[String]) -> Vec<String> {
        labels
            .iter()
            .filter(|l| self.catalog.is_board_label(l) || self.catalog.is_passed_label(l))
            .cloned()
            .collect()
    }

    /// Earliest timestamp at which the doing label was added, if any.
    #[must_use]
    pub fn start_time(&self, events: &[LabelEvent]) -> Option<DateTime<Utc>> {
        events
            .iter()
            .filter(|e| e.action == LabelAction::Add && e.label == self.catalog.doing)
            .map(|e| e.created_at)
            .min()
    }

    /// Earliest timestamp at which any passed label was added, if any.
    #[must_use]
    pub fn passed_time(&self, events: &[LabelEvent]) -> Option<DateTime<Utc>> {
        events
            .iter()
            .filter(|e| e.action == LabelAction::Add && self.catalog.is_passed_label(&e.label))
            .map(|e| e.created_at)
            .min()
    }
}
