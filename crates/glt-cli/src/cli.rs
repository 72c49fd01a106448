//! Command-line argument definitions.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

/// GitLab time accounting.
///
/// Reconstructs per-issue time ledgers from tracker notes, label events, and
/// commits, and reports period statistics.
#[derive(Debug, Parser)]
#[command(name = "glt", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Report period statistics and per-issue rows.
    Report {
        /// Report on the previous calendar week instead of the current one.
        #[arg(long, conflicts_with_all = ["from", "to"])]
        last_week: bool,

        /// Window start date (UTC, inclusive).
        #[arg(long, requires = "to")]
        from: Option<NaiveDate>,

        /// Window end date (UTC, exclusive).
        #[arg(long, requires = "from")]
        to: Option<NaiveDate>,

        /// Emit JSON instead of the human-readable report.
        #[arg(long)]
        json: bool,
    },

    /// List the wrapped issues of the current week.
    Issues {
        /// Emit JSON instead of the human-readable list.
        #[arg(long)]
        json: bool,
    },
}
