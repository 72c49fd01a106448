//! Report command: period statistics and per-issue rows.
//!
//! The reporting window defaults to the current calendar week (Monday to
//! Monday, UTC) and can be shifted to the previous week or set explicitly
//! with `--from`/`--to`.

use std::fmt::Write;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use glt_core::types::day_start;
use glt_core::{GitStatistics, ReportIssue, collect_statistics, report_rows};
use serde::Serialize;

use crate::Config;
use crate::commands::fetch_issues;

/// Computed report data, independent of the output format.
#[derive(Debug)]
pub struct ReportData {
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub statistics: GitStatistics,
    pub rows: Vec<ReportIssue>,
}

/// Monday 00:00 UTC of the week containing `today`, to the next Monday.
fn week_boundaries(today: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let days_since_monday = today.weekday().num_days_from_monday();
    let monday = today - chrono::Duration::days(i64::from(days_since_monday));
    let next_monday = monday + chrono::Duration::days(7);
    (day_start(monday), day_start(next_monday))
}

/// Previous Monday 00:00 UTC to this week's Monday.
fn last_week_boundaries(today: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let (this_monday, _) = week_boundaries(today);
    (this_monday - chrono::Duration::days(7), this_monday)
}

/// Resolves the reporting window from the CLI flags.
fn resolve_window(
    last_week: bool,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    if let (Some(from), Some(to)) = (from, to) {
        if from >= to {
            bail!("--from ({from}) must precede --to ({to})");
        }
        return Ok((day_start(from), day_start(to)));
    }
    if last_week {
        Ok(last_week_boundaries(today))
    } else {
        Ok(week_boundaries(today))
    }
}

/// Formats the human-readable report output.
#[expect(
    clippy::too_many_lines,
    reason = "flat report layout, one line per statistic"
)]
pub fn format_report(data: &ReportData) -> String {
    let mut output = String::new();
    let stats = &data.statistics;

    let start = data.period_start.date_naive();
    let end = data.period_end.date_naive();
    writeln!(output, "PERIOD REPORT: {start} .. {end}").unwrap();

    writeln!(output).unwrap();
    writeln!(output, "STARTED IN PERIOD").unwrap();
    writeln!(output, "─────────────────").unwrap();
    writeln!(
        output,
        "Open:    estimate {:>8.1}h   spend {:>8.1}h",
        stats.open_estimates_started_in_period, stats.open_spends_started_in_period
    )
    .unwrap();
    writeln!(
        output,
        "Closed:  estimate {:>8.1}h   spend {:>8.1}h",
        stats.closed_estimates_started_in_period, stats.closed_spends_started_in_period
    )
    .unwrap();
    writeln!(
        output,
        "All:     estimate {:>8.1}h   spend {:>8.1}h",
        stats.all_estimates_started_in_period, stats.all_spends_started_in_period
    )
    .unwrap();

    writeln!(output).unwrap();
    writeln!(output, "STARTED EARLIER").unwrap();
    writeln!(output, "───────────────").unwrap();
    writeln!(
        output,
        "Open:    estimate {:>8.1}h   spend {:>8.1}h",
        stats.open_estimates_started_before, stats.open_spends_started_before
    )
    .unwrap();
    writeln!(
        output,
        "Closed:  estimate {:>8.1}h   spend {:>8.1}h",
        stats.closed_estimates_started_before, stats.closed_spends_started_before
    )
    .unwrap();
    writeln!(
        output,
        "All:     estimate {:>8.1}h   spend {:>8.1}h",
        stats.all_estimates_started_before, stats.all_spends_started_before
    )
    .unwrap();

    writeln!(output).unwrap();
    writeln!(output, "AT THE REPORTING MOMENT").unwrap();
    writeln!(output, "───────────────────────").unwrap();
    writeln!(output, "Open spend:   {:>8.1}h", stats.open_spend_at_moment).unwrap();
    writeln!(
        output,
        "Closed spend: {:>8.1}h",
        stats.closed_spend_at_moment
    )
    .unwrap();
    writeln!(output, "All spend:    {:>8.1}h", stats.all_spend_at_moment).unwrap();

    writeln!(output).unwrap();
    writeln!(output, "BY ISSUE").unwrap();
    writeln!(output, "────────").unwrap();
    if data.rows.is_empty() {
        writeln!(output, "(no issues with activity in this period)").unwrap();
        return output;
    }
    for row in &data.rows {
        writeln!(
            output,
            "#{:<6} {:<20} est {:>6.1}h  spend {:>6.1}h/{:>6.1}h  \
             in work {:>6.1}h ({}x)  +{} -{}  {}",
            row.iid,
            row.assignee,
            row.estimate_hours,
            row.spend_period_hours,
            row.spend_total_hours,
            row.in_work_hours,
            row.iterations,
            row.additions,
            row.deletions,
            row.title,
        )
        .unwrap();
    }

    output
}

/// JSON report structure.
#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub period: JsonPeriod,
    pub statistics: &'a GitStatistics,
    pub issues: &'a [ReportIssue],
}

#[derive(Debug, Serialize)]
pub struct JsonPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Formats report data as JSON.
pub fn format_report_json(data: &ReportData) -> Result<String> {
    let report = JsonReport {
        period: JsonPeriod {
            start: data.period_start.date_naive(),
            end: data.period_end.date_naive(),
        },
        statistics: &data.statistics,
        issues: &data.rows,
    };
    serde_json::to_string_pretty(&report).context("failed to serialize report")
}

/// Runs the report command.
pub async fn run(
    config: &Config,
    last_week: bool,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    json: bool,
) -> Result<()> {
    let today = Utc::now().date_naive();
    let (period_start, period_end) = resolve_window(last_week, from, to, today)?;

    let issues = fetch_issues(config, period_end.date_naive()).await?;
    let statistics = collect_statistics(&issues, period_start, period_end, &config.labels);
    let rows = report_rows(&issues, period_start, period_end, &config.labels);

    let data = ReportData {
        period_start,
        period_end,
        statistics,
        rows,
    };

    if json {
        println!("{}", format_report_json(&data)?);
    } else {
        print!("{}", format_report(&data));
    }
    Ok(())
}
