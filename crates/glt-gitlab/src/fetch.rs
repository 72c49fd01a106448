//! Single-flight fetch orchestration.
//!
//! One fetch pass gathers issues for every configured user, then notes,
//! label events, and commits per issue, and builds the wrapped-issue
//! collection. The pass is all-or-nothing: any error aborts it, is logged,
//! and surfaces as [`FetchOutcome::Failed`]. A pass arriving while another
//! is in flight is rejected as [`FetchOutcome::Busy`], never queued.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{Duration, NaiveDate};
use glt_core::model::{Commit, Issue, LabelEvent, Note, User};
use glt_core::{LabelCatalog, LabelClassifier, WrappedIssue, build_wrapped_issue};

use crate::GitLabError;

/// The read-only tracker feed the orchestrator consumes.
///
/// [`crate::Client`] is the production implementation; tests substitute
/// fakes.
pub trait IssueFeed {
    /// Issues currently assigned to `assignee`.
    fn assigned_issues(
        &self,
        assignee: &str,
    ) -> impl Future<Output = Result<Vec<Issue>, GitLabError>> + Send;

    /// All notes on one issue.
    fn notes(&self, issue_iid: u64) -> impl Future<Output = Result<Vec<Note>, GitLabError>> + Send;

    /// All label events on one issue.
    fn label_events(
        &self,
        issue_iid: u64,
    ) -> impl Future<Output = Result<Vec<LabelEvent>, GitLabError>> + Send;

    /// Commits attached to one issue.
    fn commits(
        &self,
        issue_iid: u64,
    ) -> impl Future<Output = Result<Vec<Commit>, GitLabError>> + Send;

    /// Known user identities, for commit-author filtering.
    fn users(&self) -> impl Future<Output = Result<Vec<User>, GitLabError>> + Send;
}

impl IssueFeed for crate::Client {
    async fn assigned_issues(&self, assignee: &str) -> Result<Vec<Issue>, GitLabError> {
        Self::assigned_issues(self, assignee).await
    }

    async fn notes(&self, issue_iid: u64) -> Result<Vec<Note>, GitLabError> {
        Self::notes(self, issue_iid).await
    }

    async fn label_events(&self, issue_iid: u64) -> Result<Vec<LabelEvent>, GitLabError> {
        Self::label_events(self, issue_iid).await
    }

    async fn commits(&self, issue_iid: u64) -> Result<Vec<Commit>, GitLabError> {
        Self::commits(self, issue_iid).await
    }

    async fn users(&self) -> Result<Vec<User>, GitLabError> {
        Self::users(self).await
    }
}

/// Result of one fetch pass.
#[derive(Debug)]
pub enum FetchOutcome {
    /// Another pass is in flight; re-request later.
    Busy,
    /// The pass completed; issues are ordered by issue number.
    Ok(Vec<WrappedIssue>),
    /// The pass aborted; no partial results are exposed.
    Failed(GitLabError),
}

impl FetchOutcome {
    /// Convenience accessor for completed passes.
    #[must_use]
    pub fn issues(self) -> Option<Vec<WrappedIssue>> {
        match self {
            Self::Ok(issues) => Some(issues),
            Self::Busy | Self::Failed(_) => None,
        }
    }
}

/// Fetch orchestrator owning the in-flight token.
#[derive(Debug)]
pub struct Fetcher<C> {
    feed: C,
    classifier: LabelClassifier,
    lookback_days: i64,
    in_flight: AtomicBool,
}

impl<C: IssueFeed + Sync> Fetcher<C> {
    /// Creates an orchestrator after validating the label catalog.
    pub fn new(feed: C, catalog: LabelCatalog, lookback_days: i64) -> Result<Self, GitLabError> {
        let classifier = LabelClassifier::new(catalog)?;
        Ok(Self {
            feed,
            classifier,
            lookback_days,
            in_flight: AtomicBool::new(false),
        })
    }

    /// Runs one fetch pass for the given users, with the spend ledger tiled
    /// from `end - lookback_days` to `end`.
    ///
    /// Fetching proceeds sequentially per user, then per issue. Issues
    /// assigned to several users are fetched once; the final collection is
    /// ordered by issue number.
    pub async fn fetch(&self, usernames: &[String], end: NaiveDate) -> FetchOutcome {
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            tracing::debug!("fetch pass already in flight, rejecting");
            return FetchOutcome::Busy;
        };

        match self.fetch_all(usernames, end).await {
            Ok(issues) => FetchOutcome::Ok(issues),
            Err(error) => {
                tracing::error!(%error, "fetch pass aborted");
                FetchOutcome::Failed(error)
            }
        }
    }

    async fn fetch_all(
        &self,
        usernames: &[String],
        end: NaiveDate,
    ) -> Result<Vec<WrappedIssue>, GitLabError> {
        let users = self.feed.users().await?;
        let floor = end - Duration::days(self.lookback_days);

        let mut by_iid: BTreeMap<u64, Issue> = BTreeMap::new();
        for username in usernames {
            for issue in self.feed.assigned_issues(username).await? {
                by_iid.entry(issue.iid).or_insert(issue);
            }
        }
        tracing::debug!(count = by_iid.len(), "collected assigned issues");

        let mut wrapped = Vec::with_capacity(by_iid.len());
        for (iid, issue) in by_iid {
            let notes = self.feed.notes(iid).await?;
            let events = self.feed.label_events(iid).await?;
            let commits = self.feed.commits(iid).await?;
            match build_wrapped_issue(
                issue,
                notes,
                events,
                commits,
                &self.classifier,
                &users,
                floor,
                end,
            ) {
                Some(issue) => wrapped.push(issue),
                None => tracing::debug!(issue = iid, "dropping no-signal issue"),
            }
        }
        Ok(wrapped)
    }
}

/// Token held for the duration of one pass; released on drop so an aborted
/// or cancelled pass never wedges the orchestrator.
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use glt_core::model::{IssueState, LabelAction};
    use std::sync::Arc;
    use tokio::sync::Notify;

    fn issue(iid: u64) -> Issue {
        Issue {
            iid,
            title: format!("issue {iid}"),
            state: IssueState::Opened,
            created_at: Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap(),
            closed_at: None,
            labels: Vec::new(),
            total_spent_seconds: 0,
            estimate_seconds: 0,
            assignees: Vec::new(),
        }
    }

    fn doing_added() -> LabelEvent {
        LabelEvent {
            label: "Doing".to_string(),
            action: LabelAction::Add,
            actor: "dev".to_string(),
            created_at: Utc.with_ymd_and_hms(2025, 3, 5, 9, 0, 0).unwrap(),
        }
    }

    /// Feed whose `users()` call blocks until released, so tests can hold a
    /// pass in flight deterministically.
    struct GatedFeed {
        started: Arc<Notify>,
        release: Arc<Notify>,
    }

    impl IssueFeed for GatedFeed {
        async fn assigned_issues(&self, _assignee: &str) -> Result<Vec<Issue>, GitLabError> {
            Ok(vec![issue(2), issue(1)])
        }

        async fn notes(&self, _issue_iid: u64) -> Result<Vec<Note>, GitLabError> {
            Ok(Vec::new())
        }

        async fn label_events(&self, _issue_iid: u64) -> Result<Vec<LabelEvent>, GitLabError> {
            Ok(vec![doing_added()])
        }

        async fn commits(&self, _issue_iid: u64) -> Result<Vec<Commit>, GitLabError> {
            Ok(Vec::new())
        }

        async fn users(&self) -> Result<Vec<User>, GitLabError> {
            self.started.notify_one();
            self.release.notified().await;
            Ok(Vec::new())
        }
    }

    /// Feed that fails the pass at the first call.
    struct FailingFeed;

    impl IssueFeed for FailingFeed {
        async fn assigned_issues(&self, _assignee: &str) -> Result<Vec<Issue>, GitLabError> {
            Ok(Vec::new())
        }

        async fn notes(&self, _issue_iid: u64) -> Result<Vec<Note>, GitLabError> {
            Ok(Vec::new())
        }

        async fn label_events(&self, _issue_iid: u64) -> Result<Vec<LabelEvent>, GitLabError> {
            Ok(Vec::new())
        }

        async fn commits(&self, _issue_iid: u64) -> Result<Vec<Commit>, GitLabError> {
            Ok(Vec::new())
        }

        async fn users(&self) -> Result<Vec<User>, GitLabError> {
            Err(GitLabError::InvalidResponse("boom".to_string()))
        }
    }

    fn end_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn concurrent_fetch_is_rejected_as_busy() {
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let fetcher = Arc::new(
            Fetcher::new(
                GatedFeed {
                    started: Arc::clone(&started),
                    release: Arc::clone(&release),
                },
                LabelCatalog::default(),
                14,
            )
            .unwrap(),
        );

        let first = tokio::spawn({
            let fetcher = Arc::clone(&fetcher);
            async move { fetcher.fetch(&["alice".to_string()], end_date()).await }
        });

        // Wait until the first pass is provably inside the feed.
        started.notified().await;
        let second = fetcher.fetch(&["alice".to_string()], end_date()).await;
        assert!(matches!(second, FetchOutcome::Busy));

        // The rejected call must not have disturbed the first pass.
        release.notify_one();
        let outcome = first.await.unwrap();
        let issues = outcome.issues().unwrap();
        assert_eq!(issues.len(), 2);
    }

    #[tokio::test]
    async fn issues_are_deduplicated_and_ordered_by_iid() {
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        release.notify_one();
        let fetcher = Fetcher::new(
            GatedFeed { started, release },
            LabelCatalog::default(),
            14,
        )
        .unwrap();

        // Two users with identical assignments: fetched once each.
        let outcome = fetcher
            .fetch(&["alice".to_string(), "bob".to_string()], end_date())
            .await;
        let issues = outcome.issues().unwrap();
        let iids: Vec<u64> = issues.iter().map(|w| w.issue.iid).collect();
        assert_eq!(iids, vec![1, 2]);
    }

    #[tokio::test]
    async fn failed_pass_reports_failure_and_releases_the_token() {
        let fetcher = Fetcher::new(FailingFeed, LabelCatalog::default(), 14).unwrap();

        let outcome = fetcher.fetch(&["alice".to_string()], end_date()).await;
        assert!(matches!(outcome, FetchOutcome::Failed(_)));

        // The token is released: the next pass is not Busy.
        let next = fetcher.fetch(&["alice".to_string()], end_date()).await;
        assert!(matches!(next, FetchOutcome::Failed(_)));
    }
}
