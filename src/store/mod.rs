//! Versioned file storage
//!
//! The dataset lives as a single file on a branch of a git repository. This
//! module defines the narrow contract the pipeline needs — read a file,
//! guarantee a branch, publish a snapshot — so the git object mechanics stay
//! isolated behind the trait and the storage backend could be swapped for any
//! append-structured store without touching the collection logic.

pub mod github;

pub use github::GitHubStore;

use thiserror::Error;

/// Errors from the storage backend. Auth, network, rate-limit, and permission
/// failures all surface here verbatim; none are retried.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage API request failed: {0}")]
    Transport(String),

    #[error("storage API returned {status}: {message}")]
    Access { status: u16, message: String },

    #[error("failed to parse storage API response: {0}")]
    Parse(String),
}

/// A branch-addressed file store with single-file snapshot publication.
///
/// Absent branches and files are conditions, not errors: `read` reports a
/// missing file as `Ok(None)` and `ensure_branch` creates missing branches.
pub trait VersionedFileStore {
    /// Content of `path` at the tip of `branch`, or `None` when the file (or
    /// the branch itself) does not exist yet.
    fn read(&self, branch: &str, path: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Create `branch` at the base branch's current head if it does not
    /// exist. Idempotent: a no-op when the branch is already present.
    fn ensure_branch(&self, branch: &str) -> Result<(), StoreError>;

    /// Publish `content` as the sole change to `path` on `branch`, returning
    /// the new commit id. This is a read-modify-write over the branch tip;
    /// concurrent writers are not coordinated.
    fn publish(
        &self,
        branch: &str,
        path: &str,
        content: &str,
        message: &str,
    ) -> Result<String, StoreError>;
}
