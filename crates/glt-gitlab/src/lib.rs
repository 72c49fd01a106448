//! GitLab integration for the time-accounting engine.
//!
//! Provides:
//! - [`Client`]: a read-only GitLab v4 REST client producing the snapshot
//!   types the engine consumes
//! - [`IssueFeed`]: the trait seam the fetch orchestrator depends on
//! - [`Fetcher`]: the single-flight fetch pass turning raw feeds into an
//!   ordered collection of [`glt_core::WrappedIssue`]

mod client;
mod fetch;

pub use client::Client;
pub use fetch::{FetchOutcome, Fetcher, IssueFeed};

use thiserror::Error;

/// GitLab client and fetch-pass errors.
#[derive(Debug, Error)]
pub enum GitLabError {
    /// The provided access token was invalid.
    #[error("invalid access token: {reason}")]
    InvalidToken { reason: &'static str },
    /// The base URL could not be used.
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
    /// Failed to build the HTTP client.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    /// HTTP request failed.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The API returned an error status.
    #[error("API error: status {status}: {message}")]
    Api { status: u16, message: String },
    /// The response body did not match the expected shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    /// The configured label catalog was rejected.
    #[error(transparent)]
    Catalog(#[from] glt_core::ValidationError),
}
