//! Read-only GitLab v4 REST client.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use glt_core::model::{Commit, Issue, IssueState, LabelEvent, Note, User};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::GitLabError;

/// Default request timeout for API calls.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// GitLab pagination page size.
const PER_PAGE: usize = 100;

/// GitLab API client scoped to one project.
///
/// # Thread Safety
///
/// The client is safe to clone and share across threads. Each clone shares
/// the underlying HTTP connection pool.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: String,
    project: String,
    token: String,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url)
            .field("project", &self.project)
            .field("token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Creates a client for one project.
    ///
    /// `project` is the numeric project id or a URL-encoded project path.
    ///
    /// # Errors
    ///
    /// Returns an error if the token or base URL is empty, or if the HTTP
    /// client fails to build.
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        project: impl Into<String>,
    ) -> Result<Self, GitLabError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(GitLabError::InvalidToken {
                reason: "access token cannot be empty",
            });
        }

        let base_url = base_url.into();
        let base_url = base_url.trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(GitLabError::InvalidBaseUrl(base_url));
        }

        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(GitLabError::ClientBuild)?;

        Ok(Self {
            http,
            base_url,
            project: project.into(),
            token,
        })
    }

    /// Issues currently assigned to `assignee`, updated within the tracker's
    /// retention of interest.
    pub async fn assigned_issues(&self, assignee: &str) -> Result<Vec<Issue>, GitLabError> {
        let path = format!("projects/{}/issues", self.project);
        let raw: Vec<RawIssue> = self
            .get_paged(&path, &[("assignee_username", assignee)])
            .await?;
        raw.into_iter().map(RawIssue::into_issue).collect()
    }

    /// All notes on one issue.
    pub async fn notes(&self, issue_iid: u64) -> Result<Vec<Note>, GitLabError> {
        let path = format!("projects/{}/issues/{issue_iid}/notes", self.project);
        let raw: Vec<RawNote> = self.get_paged(&path, &[]).await?;
        Ok(raw.into_iter().map(RawNote::into_note).collect())
    }

    /// All label add/remove events on one issue. Events whose label has
    /// since been deleted arrive without a name and are skipped.
    pub async fn label_events(&self, issue_iid: u64) -> Result<Vec<LabelEvent>, GitLabError> {
        let path = format!(
            "projects/{}/issues/{issue_iid}/resource_label_events",
            self.project
        );
        let raw: Vec<RawLabelEvent> = self.get_paged(&path, &[]).await?;
        raw.into_iter()
            .filter(|event| event.label.is_some())
            .map(RawLabelEvent::into_event)
            .collect()
    }

    /// Repository commits that reference the issue number in their message.
    pub async fn commits(&self, issue_iid: u64) -> Result<Vec<Commit>, GitLabError> {
        let path = format!("projects/{}/repository/commits", self.project);
        let raw: Vec<RawCommit> = self.get_paged(&path, &[("with_stats", "true")]).await?;
        let reference = format!("#{issue_iid}");
        Ok(raw
            .into_iter()
            .filter(|commit| commit.message.contains(&reference))
            .map(RawCommit::into_commit)
            .collect())
    }

    /// Members of the project.
    pub async fn users(&self) -> Result<Vec<User>, GitLabError> {
        let path = format!("projects/{}/users", self.project);
        let raw: Vec<RawUser> = self.get_paged(&path, &[]).await?;
        Ok(raw.into_iter().map(RawUser::into_user).collect())
    }

    /// Fetches every page of a collection endpoint.
    async fn get_paged<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, GitLabError> {
        let mut collected = Vec::new();
        let per_page = PER_PAGE.to_string();

        for page in 1.. {
            let page_str = page.to_string();
            let url = format!("{}/api/v4/{path}", self.base_url);
            let response = self
                .http
                .get(&url)
                .header("PRIVATE-TOKEN", &self.token)
                .query(query)
                .query(&[("per_page", per_page.as_str()), ("page", page_str.as_str())])
                .send()
                .await?;

            let status = response.status();
            let body = response.text().await?;
            if !status.is_success() {
                return Err(GitLabError::Api {
                    status: status.as_u16(),
                    message: body,
                });
            }

            let batch: Vec<T> = serde_json::from_str(&body)
                .map_err(|err| GitLabError::InvalidResponse(err.to_string()))?;
            let len = batch.len();
            collected.extend(batch);
            if len < PER_PAGE {
                break;
            }
        }

        Ok(collected)
    }
}

// Wire shapes of the GitLab v4 API, converted into engine snapshot types.

#[derive(Debug, Deserialize)]
struct RawIssue {
    iid: u64,
    title: String,
    state: String,
    created_at: DateTime<Utc>,
    closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    labels: Vec<String>,
    time_stats: RawTimeStats,
    #[serde(default)]
    assignees: Vec<RawAssignee>,
}

#[derive(Debug, Deserialize)]
struct RawTimeStats {
    time_estimate: i64,
    total_time_spent: i64,
}

#[derive(Debug, Deserialize)]
struct RawAssignee {
    username: String,
}

impl RawIssue {
    fn into_issue(self) -> Result<Issue, GitLabError> {
        let state: IssueState = self
            .state
            .parse()
            .map_err(|err: glt_core::model::InvalidField| {
                GitLabError::InvalidResponse(err.to_string())
            })?;
        Ok(Issue {
            iid: self.iid,
            title: self.title,
            state,
            created_at: self.created_at,
            closed_at: self.closed_at,
            labels: self.labels,
            total_spent_seconds: self.time_stats.total_time_spent,
            estimate_seconds: self.time_stats.time_estimate,
            assignees: self.assignees.into_iter().map(|a| a.username).collect(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawNote {
    body: String,
    created_at: DateTime<Utc>,
    author: RawAssignee,
}

impl RawNote {
    fn into_note(self) -> Note {
        Note {
            author: self.author.username,
            created_at: self.created_at,
            body: self.body,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawLabelEvent {
    label: Option<RawLabelRef>,
    action: String,
    user: RawAssignee,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct RawLabelRef {
    name: String,
}

impl RawLabelEvent {
    fn into_event(self) -> Result<LabelEvent, GitLabError> {
        let action = serde_json::from_value(serde_json::Value::String(self.action))
            .map_err(|err| GitLabError::InvalidResponse(err.to_string()))?;
        let label = self
            .label
            .map(|l| l.name)
            .ok_or_else(|| GitLabError::InvalidResponse("label event without label".to_string()))?;
        Ok(LabelEvent {
            label,
            action,
            actor: self.user.username,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawCommit {
    short_id: String,
    author_email: String,
    created_at: DateTime<Utc>,
    message: String,
    #[serde(default)]
    stats: Option<RawCommitStats>,
}

#[derive(Debug, Deserialize)]
struct RawCommitStats {
    additions: u64,
    deletions: u64,
}

impl RawCommit {
    fn into_commit(self) -> Commit {
        let (additions, deletions) = self
            .stats
            .map_or((0, 0), |stats| (stats.additions, stats.deletions));
        Commit {
            author_email: self.author_email,
            created_at: self.created_at,
            additions,
            deletions,
            short_id: self.short_id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawUser {
    username: String,
    #[serde(default)]
    email: String,
    name: String,
}

impl RawUser {
    fn into_user(self) -> User {
        User {
            username: self.username,
            email: self.email,
            display_name: self.name,
        }
    }
}
