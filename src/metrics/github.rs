//! GitHub metrics client
//!
//! Sync HTTP via ureq — no async runtime needed. GitHub reports stargazers
//! directly on the repo object but has no total-count endpoint for commits or
//! contributors; those come from requesting one item per page and reading the
//! last page number out of the `Link` pagination header.

use super::{ApiError, MetricsSource, RepoTotals, TrafficSample};
use crate::config::RepoSlug;
use chrono::NaiveDate;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = concat!("repo-insights/", env!("CARGO_PKG_VERSION"));
const ACCEPT: &str = "application/vnd.github+json";

/// GitHub REST API metrics source.
pub struct GitHubMetrics {
    agent: ureq::Agent,
    api_url: String,
    token: String,
}

fn make_agent() -> ureq::Agent {
    ureq::config::Config::builder()
        .http_status_as_error(false) // We handle status codes ourselves
        .timeout_global(Some(Duration::from_secs(30)))
        .build()
        .new_agent()
}

#[derive(Deserialize)]
struct RepoInfo {
    stargazers_count: u64,
}

#[derive(Deserialize)]
struct TrafficPayload {
    #[serde(default)]
    views: Vec<TrafficEntry>,
}

#[derive(Deserialize)]
struct ClonesPayload {
    #[serde(default)]
    clones: Vec<TrafficEntry>,
}

#[derive(Deserialize)]
struct TrafficEntry {
    timestamp: String,
    count: u64,
    uniques: u64,
}

impl GitHubMetrics {
    pub fn new(api_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            agent: make_agent(),
            api_url: api_url.into(),
            token: token.into(),
        }
    }

    fn get(&self, path: &str) -> Result<ureq::http::Response<ureq::Body>, ApiError> {
        self.agent
            .get(format!("{}{}", self.api_url, path))
            .header("Authorization", &format!("Bearer {}", self.token))
            .header("Accept", ACCEPT)
            .header("User-Agent", USER_AGENT)
            .call()
            .map_err(|e| ApiError::Transport(e.to_string()))
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = check_status(self.get(path)?)?;
        response
            .into_body()
            .read_json()
            .map_err(|e| ApiError::Parse(e.to_string()))
    }

    /// Total item count for a paginated listing endpoint. With `per_page=1`
    /// the last page number equals the item count; a missing `Link` header
    /// means everything fit on the single page we already have.
    fn count_via_pagination(&self, path: &str) -> Result<u64, ApiError> {
        let response = check_status(self.get(path)?)?;
        let link = response
            .headers()
            .get("link")
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        if let Some(count) = link.as_deref().and_then(last_page) {
            return Ok(count);
        }

        let items: Vec<serde_json::Value> = response
            .into_body()
            .read_json()
            .map_err(|e| ApiError::Parse(e.to_string()))?;
        Ok(items.len() as u64)
    }
}

impl MetricsSource for GitHubMetrics {
    fn totals(&self, repo: &RepoSlug) -> Result<RepoTotals, ApiError> {
        let info: RepoInfo = self.get_json(&format!("/repos/{repo}"))?;
        let commits = self.count_via_pagination(&format!("/repos/{repo}/commits?per_page=1"))?;
        let contributors =
            self.count_via_pagination(&format!("/repos/{repo}/contributors?per_page=1&anon=true"))?;

        debug!(
            %repo,
            stargazers = info.stargazers_count,
            commits,
            contributors,
            "fetched repository totals"
        );
        Ok(RepoTotals {
            stargazers: info.stargazers_count,
            commits,
            contributors,
        })
    }

    fn daily_traffic(&self, repo: &RepoSlug, date: NaiveDate) -> Result<TrafficSample, ApiError> {
        let payload: TrafficPayload =
            self.get_json(&format!("/repos/{repo}/traffic/views?per=day"))?;
        Ok(sample_for_date(&payload.views, date))
    }

    fn daily_clones(&self, repo: &RepoSlug, date: NaiveDate) -> Result<TrafficSample, ApiError> {
        let payload: ClonesPayload =
            self.get_json(&format!("/repos/{repo}/traffic/clones?per=day"))?;
        Ok(sample_for_date(&payload.clones, date))
    }
}

fn check_status(
    response: ureq::http::Response<ureq::Body>,
) -> Result<ureq::http::Response<ureq::Body>, ApiError> {
    let status = response.status().as_u16();
    if status >= 400 {
        let message = response.into_body().read_to_string().unwrap_or_default();
        return Err(ApiError::Status { status, message });
    }
    Ok(response)
}

/// Extract the last page number from a `Link` pagination header.
fn last_page(link: &str) -> Option<u64> {
    link.split(',').find_map(|part| {
        let (url, rel) = part.split_once(';')?;
        if !rel.contains("rel=\"last\"") {
            return None;
        }
        let url = url.trim().trim_start_matches('<').trim_end_matches('>');
        let query = url.split_once('?')?.1;
        query.split('&').find_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            if key == "page" {
                value.parse().ok()
            } else {
                None
            }
        })
    })
}

/// The traffic API keys each entry by an RFC 3339 timestamp at midnight UTC;
/// match on the date prefix. Absent dates (outside the two-week retention
/// window) count as zero.
fn sample_for_date(entries: &[TrafficEntry], date: NaiveDate) -> TrafficSample {
    let prefix = date.to_string();
    entries
        .iter()
        .find(|e| e.timestamp.starts_with(&prefix))
        .map(|e| TrafficSample {
            count: e.count,
            uniques: e.uniques,
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_page_from_link_header() {
        let link = "<https://api.github.com/repositories/1/commits?per_page=1&page=2>; \
                    rel=\"next\", \
                    <https://api.github.com/repositories/1/commits?per_page=1&page=1337>; \
                    rel=\"last\"";
        assert_eq!(last_page(link), Some(1337));
    }

    #[test]
    fn test_last_page_missing_rel() {
        let link = "<https://api.github.com/repositories/1/commits?page=2>; rel=\"next\"";
        assert_eq!(last_page(link), None);
        assert_eq!(last_page(""), None);
    }

    #[test]
    fn test_sample_for_date_matches_timestamp_prefix() {
        let entries = vec![
            TrafficEntry {
                timestamp: "2024-01-01T00:00:00Z".to_string(),
                count: 55,
                uniques: 21,
            },
            TrafficEntry {
                timestamp: "2024-01-02T00:00:00Z".to_string(),
                count: 61,
                uniques: 25,
            },
        ];

        let date: NaiveDate = "2024-01-02".parse().expect("date");
        assert_eq!(
            sample_for_date(&entries, date),
            TrafficSample {
                count: 61,
                uniques: 25
            }
        );
    }

    #[test]
    fn test_sample_for_date_defaults_to_zero() {
        let date: NaiveDate = "2023-06-01".parse().expect("date");
        assert_eq!(sample_for_date(&[], date), TrafficSample::default());
    }

    #[test]
    fn test_traffic_payload_parses() {
        let json = r#"{"count": 116, "uniques": 46, "views": [
            {"timestamp": "2024-01-01T00:00:00Z", "count": 55, "uniques": 21}
        ]}"#;
        let payload: TrafficPayload = serde_json::from_str(json).expect("payload");
        assert_eq!(payload.views.len(), 1);
        assert_eq!(payload.views[0].count, 55);
    }
}
