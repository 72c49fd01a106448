//! Stage-interval reconstruction from an unordered label-event log.
//!
//! Label add/remove events implicitly encode the time ranges during which an
//! issue carried the in-work label. This module sorts the relevant events
//! and replays them through a small state machine, clipping the resulting
//! intervals to the reporting window.

use chrono::{DateTime, Duration, Utc};

use crate::calendar::working_duration;
use crate::model::{LabelAction, LabelEvent};

/// In-work measurement for one issue over one reporting window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageMetric {
    /// How many times work was (re)started inside the window.
    pub iterations: u32,
    /// Total in-work time inside the window, weekends excluded.
    pub duration: Duration,
}

impl StageMetric {
    /// The zero metric.
    #[must_use]
    pub fn zero() -> Self {
        Self {
            iterations: 0,
            duration: Duration::zero(),
        }
    }
}

/// Replay state: either no in-work label is applied, or one has been applied
/// since the recorded instant.
#[derive(Debug, Clone, Copy)]
enum StageState {
    Idle,
    InProgress(DateTime<Utc>),
}

/// Measures in-work time and iteration count for `events` over
/// `[window_start, window_end]`.
///
/// Only events on `in_work_label` participate. Each `Add` opens an interval
/// that runs to the next event on that label (whatever its action), or to
/// the window end if none follows. Intervals are clipped to the window and
/// measured with [`working_duration`]. Non-`Add` events only terminate
/// intervals; they never count as iterations.
#[must_use]
pub fn stage_metric(
    events: &[LabelEvent],
    in_work_label: &str,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> StageMetric {
    let mut relevant: Vec<&LabelEvent> = events
        .iter()
        .filter(|e| e.label == in_work_label)
        .collect();
    relevant.sort_by_key(|e| e.created_at);

    let mut state = StageState::Idle;
    let mut intervals: Vec<(DateTime<Utc>, DateTime<Utc>)> = Vec::new();
    let mut iterations = 0u32;

    for event in relevant {
        if let StageState::InProgress(since) = state {
            intervals.push((since, event.created_at));
        }
        state = match event.action {
            LabelAction::Add => {
                if event.created_at >= window_start && event.created_at <= window_end {
                    iterations += 1;
                }
                StageState::InProgress(event.created_at)
            }
            LabelAction::Remove => StageState::Idle,
        };
    }

    // Still in progress at the end of the log: close at the window end.
    if let StageState::InProgress(since) = state {
        intervals.push((since, window_end));
    }

    let mut duration = Duration::zero();
    for (start, end) in intervals {
        let clipped_start = start.max(window_start);
        let clipped_end = end.min(window_end);
        if clipped_end > clipped_start {
            duration += working_duration(clipped_start, clipped_end);
        }
    }

    StageMetric {
        iterations,
        duration,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const DOING: &str = "Doing";

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        // March 2025; the 10th-14th are weekdays.
        Utc.with_ymd_and_hms(2025, 3, day, hour, 0, 0).unwrap()
    }

    fn event(label: &str, action: LabelAction, when: DateTime<Utc>) -> LabelEvent {
        LabelEvent {
            label: label.to_string(),
            action,
            actor: "dev".to_string(),
            created_at: when,
        }
    }

    #[test]
    fn unmatched_add_runs_to_window_end() {
        let events = vec![event(DOING, LabelAction::Add, at(11, 9))];
        let metric = stage_metric(&events, DOING, at(10, 9), at(12, 9));
        assert_eq!(metric.iterations, 1);
        assert_eq!(metric.duration, Duration::hours(24));
    }

    #[test]
    fn pair_entirely_before_window_is_zero() {
        let events = vec![
            event(DOING, LabelAction::Add, at(10, 9)),
            event(DOING, LabelAction::Remove, at(10, 17)),
        ];
        let metric = stage_metric(&events, DOING, at(11, 0), at(12, 0));
        assert_eq!(metric, StageMetric::zero());
    }

    #[test]
    fn interval_straddling_window_start_is_truncated() {
        let events = vec![
            event(DOING, LabelAction::Add, at(10, 9)),
            event(DOING, LabelAction::Remove, at(11, 17)),
        ];
        let metric = stage_metric(&events, DOING, at(11, 9), at(12, 9));
        // Add happened before the window: not an iteration, duration clipped.
        assert_eq!(metric.iterations, 0);
        assert_eq!(metric.duration, Duration::hours(8));
    }

    #[test]
    fn consecutive_adds_split_intervals() {
        let events = vec![
            event(DOING, LabelAction::Add, at(10, 9)),
            event(DOING, LabelAction::Add, at(10, 12)),
            event(DOING, LabelAction::Remove, at(10, 17)),
        ];
        let metric = stage_metric(&events, DOING, at(10, 0), at(10, 23));
        assert_eq!(metric.iterations, 2);
        assert_eq!(metric.duration, Duration::hours(8));
    }

    #[test]
    fn unsorted_events_are_reordered() {
        let events = vec![
            event(DOING, LabelAction::Remove, at(10, 17)),
            event(DOING, LabelAction::Add, at(10, 9)),
        ];
        let metric = stage_metric(&events, DOING, at(10, 0), at(10, 23));
        assert_eq!(metric.iterations, 1);
        assert_eq!(metric.duration, Duration::hours(8));
    }

    #[test]
    fn other_labels_are_ignored() {
        let events = vec![
            event("To Do", LabelAction::Add, at(10, 9)),
            event("bug", LabelAction::Add, at(10, 10)),
        ];
        let metric = stage_metric(&events, DOING, at(10, 0), at(10, 23));
        assert_eq!(metric, StageMetric::zero());
    }

    #[test]
    fn weekend_portion_is_excluded() {
        // In work Friday 09:00 through Monday 09:00.
        let events = vec![
            event(DOING, LabelAction::Add, at(14, 9)),
            event(DOING, LabelAction::Remove, at(17, 9)),
        ];
        let metric = stage_metric(&events, DOING, at(14, 0), at(17, 23));
        // 15h Friday + 9h Monday, nothing for Sat/Sun.
        assert_eq!(metric.duration, Duration::hours(24));
    }
}
