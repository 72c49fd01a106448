//! Command implementations.

pub mod issues;
pub mod report;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use glt_core::WrappedIssue;
use glt_gitlab::{Client, FetchOutcome, Fetcher};

use crate::Config;

/// Runs one fetch pass against the configured GitLab project, with the
/// spend ledger reaching back `lookback_days` from `end`.
pub(crate) async fn fetch_issues(config: &Config, end: NaiveDate) -> Result<Vec<WrappedIssue>> {
    let client = Client::new(&config.gitlab_url, &config.token, &config.project)
        .context("failed to create GitLab client")?;
    let fetcher = Fetcher::new(client, config.labels.clone(), config.lookback_days)
        .context("invalid label configuration")?;

    match fetcher.fetch(&config.users, end).await {
        FetchOutcome::Ok(issues) => Ok(issues),
        FetchOutcome::Busy => bail!("a fetch pass is already in progress, try again later"),
        FetchOutcome::Failed(error) => Err(error).context("fetch pass failed"),
    }
}
