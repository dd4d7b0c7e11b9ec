//! Core data models
//!
//! A `DayStat` is one calendar day's metrics snapshot; a `Dataset` is the
//! ordered collection of snapshots for one tracked repository. The dataset is
//! decoded fresh from the insights branch on every run, mutated only through
//! [`Dataset::upsert`], and published back in a single commit.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One day's metrics snapshot, keyed by calendar date.
///
/// All fields are required on decode; a dataset file with a record missing
/// any of these keys is malformed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayStat {
    /// Calendar date, the record's unique key
    pub date: NaiveDate,
    /// Stargazer total as of collection time
    pub stargazers: u64,
    /// Commit total on the default branch
    pub commits: u64,
    /// Distinct-author contributor count
    pub contributors: u64,
    /// Page views on this date
    pub traffic_views: u64,
    /// Unique visitors on this date
    pub traffic_uniques: u64,
    /// Clones on this date
    pub clones_count: u64,
    /// Unique cloners on this date
    pub clones_uniques: u64,
}

/// Ordered collection of [`DayStat`] records for one tracked repository.
///
/// Insertion order is preserved; dates are unique. No chronological ordering
/// is enforced beyond that, so callers that care about date order must append
/// in date order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    records: Vec<DayStat>,
}

impl Dataset {
    pub fn new(records: Vec<DayStat>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[DayStat] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Insert-or-replace keyed by date.
    ///
    /// An existing record with the same date is replaced at its current index;
    /// otherwise the record is appended. This is the sole mutation path, which
    /// keeps dates unique. O(n) scan; datasets top out at a few hundred rows.
    pub fn upsert(&mut self, record: DayStat) {
        match self.records.iter().position(|r| r.date == record.date) {
            Some(idx) => self.records[idx] = record,
            None => self.records.push(record),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stat(date: &str, stargazers: u64) -> DayStat {
        DayStat {
            date: date.parse().expect("test date"),
            stargazers,
            commits: 100,
            contributors: 5,
            traffic_views: 20,
            traffic_uniques: 10,
            clones_count: 3,
            clones_uniques: 2,
        }
    }

    #[test]
    fn test_upsert_appends_new_date() {
        let mut dataset = Dataset::default();
        dataset.upsert(stat("2024-01-01", 10));
        dataset.upsert(stat("2024-01-02", 12));

        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.records()[0].date.to_string(), "2024-01-01");
        assert_eq!(dataset.records()[1].date.to_string(), "2024-01-02");
    }

    #[test]
    fn test_upsert_replaces_in_place() {
        let mut dataset = Dataset::new(vec![
            stat("2024-01-01", 10),
            stat("2024-01-02", 11),
            stat("2024-01-03", 12),
        ]);
        dataset.upsert(stat("2024-01-02", 99));

        assert_eq!(dataset.len(), 3);
        // Same index, new value
        assert_eq!(dataset.records()[1].date.to_string(), "2024-01-02");
        assert_eq!(dataset.records()[1].stargazers, 99);
        assert_eq!(dataset.records()[2].stargazers, 12);
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let mut once = Dataset::new(vec![stat("2024-01-01", 10)]);
        once.upsert(stat("2024-01-01", 15));

        let mut twice = Dataset::new(vec![stat("2024-01-01", 10)]);
        twice.upsert(stat("2024-01-01", 15));
        twice.upsert(stat("2024-01-01", 15));

        assert_eq!(once, twice);
        assert_eq!(once.len(), 1);
    }

    #[test]
    fn test_dates_stay_unique() {
        let mut dataset = Dataset::default();
        for day in ["2024-01-01", "2024-01-02", "2024-01-01", "2024-01-02"] {
            dataset.upsert(stat(day, 1));
        }

        let mut dates: Vec<_> = dataset.records().iter().map(|r| r.date).collect();
        dates.sort();
        dates.dedup();
        assert_eq!(dates.len(), dataset.len());
    }
}
