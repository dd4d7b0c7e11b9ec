//! repo-insights - GitHub repository metrics committed as a time-series dataset
//!
//! Collects per-repository activity metrics (stargazers, commits,
//! contributors, traffic views, clone counts) from the GitHub REST API and
//! upserts them, one record per calendar day, into a dataset file that lives
//! on a branch of a git repository. The repository itself is the durable
//! store; publishing happens through low-level git object construction
//! (blob -> tree -> commit -> ref update), no local checkout required.

pub mod cli;
pub mod codec;
pub mod config;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod store;
