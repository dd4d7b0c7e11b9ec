//! Metrics source abstraction
//!
//! The pipeline reads activity numbers through the [`MetricsSource`] trait so
//! the collection logic stays independent of the hosting API. The GitHub
//! implementation lives in [`github`].

pub mod github;

pub use github::GitHubMetrics;

use crate::config::RepoSlug;
use chrono::NaiveDate;
use thiserror::Error;

/// Errors from the metrics source API. None of these are retried; any failure
/// is terminal for the run.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("metrics API request failed: {0}")]
    Transport(String),

    #[error("metrics API returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("failed to parse metrics API response: {0}")]
    Parse(String),
}

/// Whole-repository totals as of the current moment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepoTotals {
    pub stargazers: u64,
    pub commits: u64,
    pub contributors: u64,
}

/// One day's traffic or clone numbers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrafficSample {
    pub count: u64,
    pub uniques: u64,
}

/// Read-only source of repository activity metrics.
///
/// `Sync` because the paired per-date fetches (traffic and clones) are issued
/// concurrently.
pub trait MetricsSource: Sync {
    /// Current stargazer, commit, and contributor totals.
    fn totals(&self, repo: &RepoSlug) -> Result<RepoTotals, ApiError>;

    /// Page views for a single day. Days outside the source's retention
    /// window report zero.
    fn daily_traffic(&self, repo: &RepoSlug, date: NaiveDate) -> Result<TrafficSample, ApiError>;

    /// Clones for a single day, with the same retention-window default.
    fn daily_clones(&self, repo: &RepoSlug, date: NaiveDate) -> Result<TrafficSample, ApiError>;
}
