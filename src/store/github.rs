//! GitHub-backed file store
//!
//! Talks to the git database endpoints of the GitHub REST API: refs for
//! branch heads, blob/tree/commit creation for publishing a snapshot, and the
//! contents endpoint (raw media type) for reads. No local checkout is
//! involved; every object is built server-side.

use super::{StoreError, VersionedFileStore};
use crate::config::RepoSlug;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info};

const USER_AGENT: &str = concat!("repo-insights/", env!("CARGO_PKG_VERSION"));
const ACCEPT_JSON: &str = "application/vnd.github+json";
/// Raw media type: the contents endpoint returns file bytes directly instead
/// of a base64-wrapped JSON object.
const ACCEPT_RAW: &str = "application/vnd.github.raw";

/// GitHub REST API storage backend.
pub struct GitHubStore {
    agent: ureq::Agent,
    api_url: String,
    token: String,
    repo: RepoSlug,
}

fn make_agent() -> ureq::Agent {
    ureq::config::Config::builder()
        .http_status_as_error(false) // We handle status codes ourselves
        .timeout_global(Some(Duration::from_secs(30)))
        .build()
        .new_agent()
}

#[derive(Deserialize)]
struct GitRef {
    object: GitObject,
}

#[derive(Deserialize)]
struct GitObject {
    sha: String,
}

#[derive(Deserialize)]
struct GitCommit {
    tree: GitObject,
}

#[derive(Deserialize)]
struct Created {
    sha: String,
}

#[derive(Deserialize)]
struct RepoInfo {
    default_branch: String,
}

impl GitHubStore {
    pub fn new(api_url: impl Into<String>, token: impl Into<String>, repo: RepoSlug) -> Self {
        Self {
            agent: make_agent(),
            api_url: api_url.into(),
            token: token.into(),
            repo,
        }
    }

    fn repo_url(&self) -> String {
        format!("{}/repos/{}", self.api_url, self.repo)
    }

    fn url(&self, tail: &str) -> String {
        format!("{}/{}", self.repo_url(), tail)
    }

    fn get(
        &self,
        url: &str,
        accept: &str,
    ) -> Result<ureq::http::Response<ureq::Body>, StoreError> {
        self.agent
            .get(url)
            .header("Authorization", &format!("Bearer {}", self.token))
            .header("Accept", accept)
            .header("User-Agent", USER_AGENT)
            .call()
            .map_err(|e| StoreError::Transport(e.to_string()))
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, StoreError> {
        let response = check_status(self.get(url, ACCEPT_JSON)?)?;
        response
            .into_body()
            .read_json()
            .map_err(|e| StoreError::Parse(e.to_string()))
    }

    fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<T, StoreError> {
        let response = self
            .agent
            .post(url)
            .header("Authorization", &format!("Bearer {}", self.token))
            .header("Accept", ACCEPT_JSON)
            .header("User-Agent", USER_AGENT)
            .send_json(body)
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        let response = check_status(response)?;
        response
            .into_body()
            .read_json()
            .map_err(|e| StoreError::Parse(e.to_string()))
    }

    fn patch_json(&self, url: &str, body: &serde_json::Value) -> Result<(), StoreError> {
        let response = self
            .agent
            .patch(url)
            .header("Authorization", &format!("Bearer {}", self.token))
            .header("Accept", ACCEPT_JSON)
            .header("User-Agent", USER_AGENT)
            .send_json(body)
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        check_status(response)?;
        Ok(())
    }

    fn branch_head(&self, branch: &str) -> Result<String, StoreError> {
        let head: GitRef = self.get_json(&self.url(&format!("git/ref/heads/{branch}")))?;
        Ok(head.object.sha)
    }
}

impl VersionedFileStore for GitHubStore {
    fn read(&self, branch: &str, path: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let url = self.url(&format!("contents/{path}?ref={branch}"));
        let response = self.get(&url, ACCEPT_RAW)?;

        if response.status().as_u16() == 404 {
            debug!(path, branch, "file not found on branch");
            return Ok(None);
        }
        let response = check_status(response)?;
        let text = response
            .into_body()
            .read_to_string()
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        Ok(Some(text.into_bytes()))
    }

    fn ensure_branch(&self, branch: &str) -> Result<(), StoreError> {
        let response = self.get(&self.url(&format!("git/ref/heads/{branch}")), ACCEPT_JSON)?;
        if response.status().as_u16() != 404 {
            check_status(response)?;
            debug!(branch, "branch already exists");
            return Ok(());
        }

        // Branch from the default branch's current tip
        let repo: RepoInfo = self.get_json(&self.repo_url())?;
        let base_sha = self.branch_head(&repo.default_branch)?;
        let created: Created = self.post_json(
            &self.url("git/refs"),
            &json!({
                "ref": format!("refs/heads/{branch}"),
                "sha": base_sha,
            }),
        )?;
        info!(
            branch,
            base = %repo.default_branch,
            commit = %created.sha,
            "created insights branch"
        );
        Ok(())
    }

    fn publish(
        &self,
        branch: &str,
        path: &str,
        content: &str,
        message: &str,
    ) -> Result<String, StoreError> {
        // Each step depends on the previous result; only the final ref update
        // mutates anything visible.
        let head_sha = self.branch_head(branch)?;
        let head: GitCommit = self.get_json(&self.url(&format!("git/commits/{head_sha}")))?;

        let blob: Created = self.post_json(
            &self.url("git/blobs"),
            &json!({ "content": content, "encoding": "utf-8" }),
        )?;
        let tree: Created = self.post_json(
            &self.url("git/trees"),
            &json!({
                "base_tree": head.tree.sha,
                "tree": [{ "path": path, "mode": "100644", "type": "blob", "sha": blob.sha }],
            }),
        )?;
        let commit: Created = self.post_json(
            &self.url("git/commits"),
            &json!({
                "message": message,
                "tree": tree.sha,
                "parents": [head_sha],
            }),
        )?;
        self.patch_json(
            &self.url(&format!("git/refs/heads/{branch}")),
            &json!({ "sha": commit.sha, "force": false }),
        )?;

        debug!(branch, commit = %commit.sha, "advanced branch ref");
        Ok(commit.sha)
    }
}

fn check_status(
    response: ureq::http::Response<ureq::Body>,
) -> Result<ureq::http::Response<ureq::Body>, StoreError> {
    let status = response.status().as_u16();
    if status >= 400 {
        let message = response.into_body().read_to_string().unwrap_or_default();
        return Err(StoreError::Access { status, message });
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> GitHubStore {
        GitHubStore::new(
            "https://api.github.com",
            "token",
            "octocat/spoon-knife".parse().expect("slug"),
        )
    }

    #[test]
    fn test_url_building() {
        let store = store();
        assert_eq!(
            store.repo_url(),
            "https://api.github.com/repos/octocat/spoon-knife"
        );
        assert_eq!(
            store.url("git/ref/heads/repository-insights"),
            "https://api.github.com/repos/octocat/spoon-knife/git/ref/heads/repository-insights"
        );
    }

    #[test]
    fn test_git_ref_parses() {
        let json = r#"{
            "ref": "refs/heads/main",
            "object": { "sha": "aa218f56b14c9653891f9e74264a383fa43fefbd", "type": "commit" }
        }"#;
        let git_ref: GitRef = serde_json::from_str(json).expect("ref");
        assert_eq!(
            git_ref.object.sha,
            "aa218f56b14c9653891f9e74264a383fa43fefbd"
        );
    }

    #[test]
    fn test_git_commit_parses() {
        let json = r#"{
            "sha": "7638417db6d59f3c431d3e1f261cc637155684cd",
            "tree": { "sha": "691272480426f78a0138979dd3ce63b77f706feb" }
        }"#;
        let commit: GitCommit = serde_json::from_str(json).expect("commit");
        assert_eq!(commit.tree.sha, "691272480426f78a0138979dd3ce63b77f706feb");
    }
}
