//! CLI definition and entry point

use crate::codec::Format;
use crate::config::{
    RepoSlug, Settings, DEFAULT_API_URL, DEFAULT_BRANCH, DEFAULT_ROOT_DIR,
};
use crate::metrics::GitHubMetrics;
use crate::pipeline::{Pipeline, RunOutputs};
use crate::store::GitHubStore;
use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use console::style;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// repo-insights - daily GitHub repository metrics, stored in the repository itself
#[derive(Parser, Debug)]
#[command(name = "repo-insights")]
#[command(
    version,
    about = "Commit daily GitHub repository metrics (stars, commits, traffic, clones) to an insights branch",
    long_about = "repo-insights fetches stargazer, commit, contributor, traffic, and clone \
numbers for a repository from the GitHub API and upserts them, one record per calendar day, \
into a dataset file committed to a branch of the repository itself. No database needed - \
the branch is the durable store.\n\n\
The first run creates the branch (from the default branch's tip) and backfills up to two \
weeks of traffic history. Re-running on the same day is idempotent: the day's record is \
replaced, not duplicated.",
    after_help = "\
Examples:
  repo-insights octocat/hello-world                       Update .insights/ on the repository-insights branch
  repo-insights octocat/hello-world --format csv          Keep the dataset as a CSV table
  repo-insights octocat/hello-world --storage-repo octocat/stats-store
                                                          Store the dataset in a different repository
  repo-insights octocat/hello-world --branch metrics --dir data
                                                          Custom branch and directory

The GitHub token needs repo read access for metrics (traffic requires push \
access) and contents write access to the storage repository."
)]
pub struct Cli {
    /// Repository to track, as owner/name
    #[arg(value_name = "OWNER/REPO")]
    pub repository: RepoSlug,

    /// Repository that stores the insights branch (default: the tracked repository)
    #[arg(long, value_name = "OWNER/REPO", env = "GITHUB_REPOSITORY")]
    pub storage_repo: Option<RepoSlug>,

    /// Branch the dataset is committed to
    #[arg(long, default_value = DEFAULT_BRANCH)]
    pub branch: String,

    /// Directory inside the storage repository that holds the dataset
    #[arg(long, default_value = DEFAULT_ROOT_DIR)]
    pub dir: String,

    /// Dataset format
    #[arg(long, short = 'f', default_value = "json", value_parser = ["json", "csv"])]
    pub format: String,

    /// GitHub API base URL (override for GitHub Enterprise)
    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Token for reading metrics from the tracked repository
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Token for writing to the storage repository (default: --token)
    #[arg(long, env = "INSIGHTS_STORAGE_TOKEN", hide_env_values = true)]
    pub storage_token: Option<String>,

    /// File to append name=value result lines to (the GITHUB_OUTPUT convention)
    #[arg(long, env = "GITHUB_OUTPUT", value_name = "FILE")]
    pub output_file: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "warn", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,
}

/// Run a collection against the real GitHub API.
pub fn run(cli: Cli) -> Result<()> {
    let settings = resolve_settings(&cli)?;

    let metrics = GitHubMetrics::new(settings.api_url.as_str(), settings.metrics_token.as_str());
    let store = GitHubStore::new(
        settings.api_url.as_str(),
        settings.storage_token.as_str(),
        settings.storage.clone(),
    );

    let today = Utc::now().date_naive();
    let outputs = Pipeline::new(&settings, &store, &metrics).run(today)?;

    print_summary(&settings, &outputs);
    match &cli.output_file {
        Some(path) => write_outputs(path, &outputs)?,
        None => print!("{}", outputs.to_output_lines()),
    }
    Ok(())
}

/// Fold CLI defaults into a settings value: the storage repository and token
/// fall back to the tracked repository and its token. Rejects unknown formats
/// before anything remote happens.
fn resolve_settings(cli: &Cli) -> Result<Settings> {
    Ok(Settings {
        target: cli.repository.clone(),
        storage: cli
            .storage_repo
            .clone()
            .unwrap_or_else(|| cli.repository.clone()),
        branch: cli.branch.clone(),
        root_dir: cli.dir.clone(),
        format: cli.format.parse::<Format>()?,
        api_url: cli.api_url.clone(),
        metrics_token: cli.token.clone(),
        storage_token: cli
            .storage_token
            .clone()
            .unwrap_or_else(|| cli.token.clone()),
    })
}

fn print_summary(settings: &Settings, outputs: &RunOutputs) {
    println!(
        "{} {}",
        style("Insights updated for").bold(),
        style(&settings.target).cyan()
    );
    println!("  Stars: {}", style(outputs.stargazers).cyan());
    println!("  Commits: {}", style(outputs.commits).cyan());
    println!("  Contributors: {}", style(outputs.contributors).cyan());
    println!(
        "  Views yesterday: {} ({} unique)",
        style(outputs.traffic_count).cyan(),
        outputs.traffic_uniques
    );
    println!(
        "  Clones yesterday: {} ({} unique)",
        style(outputs.clones_count).cyan(),
        outputs.clones_uniques
    );
    if outputs.backfilled > 0 {
        println!(
            "  {} backfilled {} days of history",
            style("[~]").yellow(),
            outputs.backfilled
        );
    }
    let short_commit = outputs.commit.get(..12).unwrap_or(&outputs.commit);
    println!(
        "  Snapshot {} ({} records on {})",
        style(short_commit).dim(),
        outputs.records,
        style(&settings.branch).cyan()
    );
}

/// Append result lines to the output file, `GITHUB_OUTPUT`-style.
fn write_outputs(path: &Path, outputs: &RunOutputs) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open output file {}", path.display()))?;
    file.write_all(outputs.to_output_lines().as_bytes())
        .with_context(|| format!("failed to write output file {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli() -> Cli {
        Cli {
            repository: "octocat/hello-world".parse().expect("slug"),
            storage_repo: None,
            branch: DEFAULT_BRANCH.to_string(),
            dir: DEFAULT_ROOT_DIR.to_string(),
            format: "json".to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            token: "token-a".to_string(),
            storage_token: None,
            output_file: None,
            log_level: "warn".to_string(),
        }
    }

    #[test]
    fn test_storage_defaults_to_target() {
        let settings = resolve_settings(&cli()).expect("settings");
        assert_eq!(settings.storage, settings.target);
        assert_eq!(settings.storage_token, "token-a");
        assert_eq!(settings.format, Format::Json);
    }

    #[test]
    fn test_storage_overrides_apply() {
        let mut cli = cli();
        cli.storage_repo = Some("octocat/stats-store".parse().expect("slug"));
        cli.storage_token = Some("token-b".to_string());

        let settings = resolve_settings(&cli).expect("settings");
        assert_eq!(settings.storage.to_string(), "octocat/stats-store");
        assert_eq!(settings.storage_token, "token-b");
        assert_eq!(settings.metrics_token, "token-a");
    }

    #[test]
    fn test_unknown_format_is_rejected() {
        let mut cli = cli();
        cli.format = "xml".to_string();

        let err = resolve_settings(&cli).expect_err("unsupported format");
        assert!(err.to_string().contains("unsupported format"));
    }

    #[test]
    fn test_write_outputs_appends() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("outputs.txt");
        std::fs::write(&path, "existing=1\n").expect("seed file");

        let outputs = RunOutputs {
            stargazers: 10,
            commit: "abc".to_string(),
            ..Default::default()
        };
        write_outputs(&path, &outputs).expect("write");

        let text = std::fs::read_to_string(&path).expect("read back");
        assert!(text.starts_with("existing=1\n"));
        assert!(text.contains("stargazers=10\n"));
        assert!(text.ends_with("commit=abc\n"));
    }
}
