//! Collection pipeline
//!
//! Orchestrates one run:
//! 1. Ensure the insights branch exists (created lazily from the default branch)
//! 2. Load the current dataset from the branch (missing file -> empty dataset)
//! 3. Backfill recent history when the dataset is thin
//! 4. Gather yesterday's record and upsert it
//! 5. Encode and publish the new snapshot in a single commit
//!
//! Every step depends on the previous one, so the run is sequential; only the
//! paired per-date fetches inside a single day's gathering run concurrently.
//! A failure anywhere aborts the rest — the in-memory dataset is discarded and
//! the branch is only ever mutated by the final publish.

mod backfill;

pub use backfill::BACKFILL_WINDOW;

use crate::codec;
use crate::config::Settings;
use crate::metrics::MetricsSource;
use crate::models::{Dataset, DayStat};
use crate::store::VersionedFileStore;
use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};
use tracing::info;

/// One collection run over a metrics source and a versioned file store.
pub struct Pipeline<'a, S, M> {
    settings: &'a Settings,
    store: &'a S,
    metrics: &'a M,
}

impl<'a, S: VersionedFileStore, M: MetricsSource> Pipeline<'a, S, M> {
    pub fn new(settings: &'a Settings, store: &'a S, metrics: &'a M) -> Self {
        Self {
            settings,
            store,
            metrics,
        }
    }

    /// Run the full collection pipeline. `today` is the run date; the record
    /// written unconditionally is for the day before it.
    pub fn run(&self, today: NaiveDate) -> Result<RunOutputs> {
        self.store
            .ensure_branch(&self.settings.branch)
            .context("failed to provision insights branch")?;

        let mut dataset = self
            .load_dataset()
            .context("failed to load existing dataset")?;
        info!(records = dataset.len(), "loaded dataset");

        let backfilled = self
            .backfill(&mut dataset, today)
            .context("failed to backfill history")?;

        let yesterday = today - Duration::days(1);
        let record = self
            .gather_day(yesterday)
            .with_context(|| format!("failed to gather metrics for {yesterday}"))?;
        let outputs = RunOutputs::from_record(&record);
        dataset.upsert(record);

        let content = codec::encode(&dataset, self.settings.format)?;
        let commit = self
            .store
            .publish(
                &self.settings.branch,
                &self.settings.dataset_path(),
                &content,
                &self.settings.commit_message(),
            )
            .context("failed to publish dataset snapshot")?;
        info!(%commit, records = dataset.len(), "published dataset snapshot");

        Ok(RunOutputs {
            commit,
            records: dataset.len(),
            backfilled,
            ..outputs
        })
    }

    /// Load the dataset file from the insights branch. A missing file is not
    /// an error — a fresh repository starts with an empty dataset.
    fn load_dataset(&self) -> Result<Dataset> {
        let path = self.settings.dataset_path();
        match self.store.read(&self.settings.branch, &path)? {
            Some(bytes) => Ok(codec::decode(&bytes, self.settings.format)?),
            None => {
                info!(path, "no dataset file yet, starting empty");
                Ok(Dataset::default())
            }
        }
    }

    /// Assemble one day's record: whole-repo totals plus that day's traffic
    /// and clone numbers. The two per-date fetches are independent reads and
    /// run concurrently.
    fn gather_day(&self, date: NaiveDate) -> Result<DayStat> {
        let metrics = self.metrics;
        let target = &self.settings.target;

        let totals = metrics.totals(target)?;
        let (traffic, clones) = rayon::join(
            || metrics.daily_traffic(target, date),
            || metrics.daily_clones(target, date),
        );
        let traffic = traffic?;
        let clones = clones?;

        Ok(DayStat {
            date,
            stargazers: totals.stargazers,
            commits: totals.commits,
            contributors: totals.contributors,
            traffic_views: traffic.count,
            traffic_uniques: traffic.uniques,
            clones_count: clones.count,
            clones_uniques: clones.uniques,
        })
    }
}

/// Named results of one collection run, for downstream consumption.
#[derive(Debug, Clone, Default)]
pub struct RunOutputs {
    pub stargazers: u64,
    pub commits: u64,
    pub contributors: u64,
    /// Yesterday's page views
    pub traffic_count: u64,
    pub traffic_uniques: u64,
    /// Yesterday's clones
    pub clones_count: u64,
    pub clones_uniques: u64,
    /// Commit id of the published snapshot
    pub commit: String,
    /// Records in the published dataset
    pub records: usize,
    /// Days inserted by the backfill step
    pub backfilled: usize,
}

impl RunOutputs {
    fn from_record(record: &DayStat) -> Self {
        Self {
            stargazers: record.stargazers,
            commits: record.commits,
            contributors: record.contributors,
            traffic_count: record.traffic_views,
            traffic_uniques: record.traffic_uniques,
            clones_count: record.clones_count,
            clones_uniques: record.clones_uniques,
            ..Default::default()
        }
    }

    /// `name=value` lines in the order downstream automation expects.
    pub fn to_output_lines(&self) -> String {
        format!(
            "stargazers={}\ncommits={}\ncontributors={}\ntraffic_count={}\ntraffic_uniques={}\nclones_count={}\nclones_uniques={}\ncommit={}\n",
            self.stargazers,
            self.commits,
            self.contributors,
            self.traffic_count,
            self.traffic_uniques,
            self.clones_count,
            self.clones_uniques,
            self.commit,
        )
    }

    /// Short human summary for logs.
    pub fn summary(&self) -> String {
        let mut parts = vec![
            format!("{} stars", self.stargazers),
            format!("{} commits", self.commits),
            format!("{} contributors", self.contributors),
            format!("{} records", self.records),
        ];
        if self.backfilled > 0 {
            parts.push(format!("{} backfilled", self.backfilled));
        }
        parts.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_lines_shape() {
        let outputs = RunOutputs {
            stargazers: 10,
            commits: 120,
            contributors: 4,
            traffic_count: 55,
            traffic_uniques: 21,
            clones_count: 7,
            clones_uniques: 3,
            commit: "abc123".to_string(),
            records: 14,
            backfilled: 13,
        };

        let lines: Vec<_> = outputs.to_output_lines().lines().map(String::from).collect();
        assert_eq!(lines.first().map(String::as_str), Some("stargazers=10"));
        assert_eq!(lines.last().map(String::as_str), Some("commit=abc123"));
        assert_eq!(lines.len(), 8);
    }

    #[test]
    fn test_summary_mentions_backfill_only_when_it_ran() {
        let mut outputs = RunOutputs::default();
        assert!(!outputs.summary().contains("backfilled"));

        outputs.backfilled = 13;
        assert!(outputs.summary().contains("13 backfilled"));
    }
}
