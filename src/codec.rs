//! Dataset serialization
//!
//! Two on-disk formats, selected once per run: a pretty-printed JSON array of
//! records, and a CSV table with a fixed header. The dataset is
//! format-agnostic in memory; this module is the only place that touches
//! bytes.

use crate::models::{Dataset, DayStat};
use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Fixed CSV header; columns always serialize in this order.
pub const CSV_HEADER: &str =
    "date,stargazers,commits,contributors,traffic_views,traffic_uniques,clones_count,clones_uniques";

#[derive(Error, Debug)]
pub enum FormatError {
    #[error("unsupported format '{0}' (expected 'json' or 'csv')")]
    Unsupported(String),

    #[error("malformed dataset: {0}")]
    Malformed(String),

    #[error("failed to serialize dataset: {0}")]
    Encode(String),
}

/// Dataset file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Json,
    Csv,
}

impl Format {
    /// File extension, used to derive the dataset file name.
    pub fn extension(&self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Csv => "csv",
        }
    }
}

impl FromStr for Format {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, FormatError> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Format::Json),
            "csv" => Ok(Format::Csv),
            _ => Err(FormatError::Unsupported(s.to_string())),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Encode a dataset for publication.
///
/// JSON output is pretty-printed (2-space indent) and deterministic so the
/// committed file diffs cleanly run over run.
pub fn encode(dataset: &Dataset, format: Format) -> Result<String, FormatError> {
    match format {
        Format::Json => serde_json::to_string_pretty(dataset.records())
            .map_err(|e| FormatError::Encode(e.to_string())),
        Format::Csv => Ok(encode_csv(dataset)),
    }
}

/// Decode a dataset file fetched from the insights branch.
pub fn decode(bytes: &[u8], format: Format) -> Result<Dataset, FormatError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| FormatError::Malformed(format!("not valid UTF-8: {e}")))?;
    match format {
        Format::Json => {
            let records: Vec<DayStat> = serde_json::from_str(text)
                .map_err(|e| FormatError::Malformed(e.to_string()))?;
            Ok(Dataset::new(records))
        }
        Format::Csv => decode_csv(text),
    }
}

fn encode_csv(dataset: &Dataset) -> String {
    let mut out = String::with_capacity(CSV_HEADER.len() + dataset.len() * 64);
    out.push_str(CSV_HEADER);
    out.push('\n');
    for r in dataset.records() {
        // Plain integers and an ISO date, so no quoting is ever needed
        out.push_str(&format!(
            "{},{},{},{},{},{},{},{}\n",
            r.date,
            r.stargazers,
            r.commits,
            r.contributors,
            r.traffic_views,
            r.traffic_uniques,
            r.clones_count,
            r.clones_uniques,
        ));
    }
    out
}

fn decode_csv(text: &str) -> Result<Dataset, FormatError> {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());

    let header = lines
        .next()
        .ok_or_else(|| FormatError::Malformed("empty file, expected header row".to_string()))?;
    if header.trim() != CSV_HEADER {
        return Err(FormatError::Malformed(format!(
            "unexpected header '{}'",
            header.trim()
        )));
    }

    let mut records = Vec::new();
    for (i, line) in lines.enumerate() {
        let record = parse_csv_row(line)
            .map_err(|e| FormatError::Malformed(format!("row {}: {e}", i + 1)))?;
        records.push(record);
    }
    Ok(Dataset::new(records))
}

fn parse_csv_row(line: &str) -> Result<DayStat, String> {
    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() != 8 {
        return Err(format!("expected 8 fields, found {}", fields.len()));
    }

    let date: NaiveDate = fields[0]
        .trim()
        .parse()
        .map_err(|e| format!("bad date '{}': {e}", fields[0]))?;

    let mut counts = [0u64; 7];
    for (slot, field) in counts.iter_mut().zip(&fields[1..]) {
        *slot = field
            .trim()
            .parse()
            .map_err(|_| format!("bad count '{}'", field.trim()))?;
    }

    Ok(DayStat {
        date,
        stargazers: counts[0],
        commits: counts[1],
        contributors: counts[2],
        traffic_views: counts[3],
        traffic_uniques: counts[4],
        clones_count: counts[5],
        clones_uniques: counts[6],
    })
}
