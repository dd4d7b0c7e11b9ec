//! History backfill
//!
//! When the loaded dataset has fewer than [`BACKFILL_WINDOW`] records, the
//! most recent window is rebuilt wholesale before the normal daily update:
//! offsets 14 down to 2 relative to the run date, oldest first. Offset 1 is
//! yesterday, which the unconditional daily update covers anyway (and upsert
//! is idempotent per date, so covering it twice would merely be redundant).

use super::Pipeline;
use crate::metrics::MetricsSource;
use crate::models::Dataset;
use crate::store::VersionedFileStore;
use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};
use tracing::{debug, info};

/// Minimum number of days that must be present before a plain daily update.
pub const BACKFILL_WINDOW: usize = 14;

/// Oldest backfilled day, as an offset in days from the run date.
const OLDEST_OFFSET: i64 = 14;
/// Newest backfilled day; offset 1 is left to the daily update.
const NEWEST_OFFSET: i64 = 2;

impl<S: VersionedFileStore, M: MetricsSource> Pipeline<'_, S, M> {
    /// Rebuild the recent window when the dataset is thin. Returns the number
    /// of upserted days (13, or 0 when the dataset is already long enough).
    ///
    /// The decision is all-or-nothing on the record count. Gaps inside an
    /// already-long history are not inspected, and a dataset one record short
    /// of the window still gets the full sweep — upsert keeps that harmless.
    pub(crate) fn backfill(&self, dataset: &mut Dataset, today: NaiveDate) -> Result<usize> {
        if dataset.len() >= BACKFILL_WINDOW {
            debug!(records = dataset.len(), "dataset long enough, no backfill");
            return Ok(0);
        }

        info!(
            records = dataset.len(),
            window = BACKFILL_WINDOW,
            "dataset below window, backfilling recent history"
        );

        let mut inserted = 0;
        for offset in (NEWEST_OFFSET..=OLDEST_OFFSET).rev() {
            let date = today - Duration::days(offset);
            let record = self
                .gather_day(date)
                .with_context(|| format!("failed to gather metrics for {date}"))?;
            dataset.upsert(record);
            inserted += 1;
        }
        Ok(inserted)
    }
}
