//! Issues command: list the wrapped issues of the current ledger window.

use std::fmt::Write;

use anyhow::{Context, Result};
use chrono::Utc;
use glt_core::WrappedIssue;

use crate::Config;
use crate::commands::fetch_issues;

/// Formats the human-readable issue list.
pub fn format_issues(issues: &[WrappedIssue]) -> String {
    let mut output = String::new();

    if issues.is_empty() {
        writeln!(output, "No issues with tracked activity.").unwrap();
        return output;
    }

    for wrapped in issues {
        let status = wrapped.status.map_or("-", |state| state.as_str());
        writeln!(
            output,
            "#{:<6} {:<8} spend {:>6.1}h  est {:>6.1}h  {}",
            wrapped.issue.iid,
            status,
            wrapped.total_spend_hours(),
            wrapped.issue.estimate_hours(),
            wrapped.issue.title,
        )
        .unwrap();
    }

    output
}

/// Runs the issues command.
pub async fn run(config: &Config, json: bool) -> Result<()> {
    let today = Utc::now().date_naive();
    let issues = fetch_issues(config, today).await?;

    if json {
        let output =
            serde_json::to_string_pretty(&issues).context("failed to serialize issues")?;
        println!("{output}");
    } else {
        print!("{}", format_issues(&issues));
    }
    Ok(())
}
