//! Run configuration
//!
//! All settings are resolved once at startup from CLI flags and environment,
//! then threaded through the pipeline as a value. Nothing below the CLI layer
//! reads process-wide state.

use crate::codec::Format;
use std::fmt;
use std::str::FromStr;

/// Branch the dataset is committed to when none is given.
pub const DEFAULT_BRANCH: &str = "repository-insights";
/// Directory inside the storage repository that holds dataset files.
pub const DEFAULT_ROOT_DIR: &str = ".insights";
/// Public GitHub API endpoint; overridable for GitHub Enterprise.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// An `owner/name` repository slug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSlug {
    pub owner: String,
    pub name: String,
}

impl FromStr for RepoSlug {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, String> {
        match s.split_once('/') {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
                Ok(Self {
                    owner: owner.to_string(),
                    name: name.to_string(),
                })
            }
            _ => Err(format!("'{s}' is not an owner/name repository slug")),
        }
    }
}

impl fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Resolved configuration for one collection run.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Repository whose metrics are collected
    pub target: RepoSlug,
    /// Repository holding the insights branch (usually the target itself)
    pub storage: RepoSlug,
    /// Branch the dataset is committed to
    pub branch: String,
    /// Directory inside the storage repository that holds the dataset
    pub root_dir: String,
    /// Dataset file format
    pub format: Format,
    /// API base URL shared by the metrics and storage clients
    pub api_url: String,
    /// Token for reading metrics from the target repository
    pub metrics_token: String,
    /// Token for writing to the storage repository (may equal metrics_token)
    pub storage_token: String,
}

impl Settings {
    /// Path of the dataset file inside the storage repository. Namespaced by
    /// the tracked repository so one storage repo can hold several datasets.
    pub fn dataset_path(&self) -> String {
        format!(
            "{}/{}/{}/stats.{}",
            self.root_dir,
            self.target.owner,
            self.target.name,
            self.format.extension()
        )
    }

    /// Commit message identifying the tracked repository.
    pub fn commit_message(&self) -> String {
        format!("Update insights for {}", self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_parses() {
        let slug: RepoSlug = "octocat/Spoon-Knife".parse().expect("slug");
        assert_eq!(slug.owner, "octocat");
        assert_eq!(slug.name, "Spoon-Knife");
        assert_eq!(slug.to_string(), "octocat/Spoon-Knife");
    }

    #[test]
    fn test_slug_rejects_bad_input() {
        assert!("octocat".parse::<RepoSlug>().is_err());
        assert!("/repo".parse::<RepoSlug>().is_err());
        assert!("owner/".parse::<RepoSlug>().is_err());
        assert!("a/b/c".parse::<RepoSlug>().is_err());
    }

    #[test]
    fn test_dataset_path() {
        let settings = Settings {
            target: "octocat/spoon-knife".parse().expect("slug"),
            storage: "octocat/stats-store".parse().expect("slug"),
            branch: DEFAULT_BRANCH.to_string(),
            root_dir: DEFAULT_ROOT_DIR.to_string(),
            format: Format::Json,
            api_url: DEFAULT_API_URL.to_string(),
            metrics_token: "t".to_string(),
            storage_token: "t".to_string(),
        };
        assert_eq!(
            settings.dataset_path(),
            ".insights/octocat/spoon-knife/stats.json"
        );
        assert_eq!(
            settings.commit_message(),
            "Update insights for octocat/spoon-knife"
        );
    }
}
