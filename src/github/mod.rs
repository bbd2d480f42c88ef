//! GitHub integration layer.
//!
//! Everything the download and upload sequences need from the hosting
//! provider goes through the [`RepoHost`] trait. [`GitHubClient`] is the only
//! implementation shipped; tests substitute an in-memory host.

mod client;
mod types;

use thiserror::Error;

use crate::repo_ref::RepoRef;

pub use client::{DEFAULT_API_URL, GitHubClient};
pub use types::{FileUpsert, NewPullRequest, PullRequest, Release, RemoteFile};

/// Errors reported by a [`RepoHost`].
#[derive(Debug, Error)]
pub enum HostError {
    #[error("not found: {0}")]
    NotFound(String),

    /// The object being created is already there (branch, pull request).
    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("GitHub API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("invalid GitHub token")]
    InvalidToken,

    #[error("invalid API URL '{0}'")]
    InvalidApiUrl(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl HostError {
    pub fn is_already_exists(&self) -> bool {
        matches!(self, HostError::AlreadyExists(_))
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error(transparent)]
    Base64(#[from] base64::DecodeError),

    #[error("unsupported content encoding '{0}'")]
    UnsupportedEncoding(String),
}

/// The remote operations used by `download` and `upload`.
///
/// `git_ref` arguments of the ref calls are full ref names such as
/// `refs/heads/main`.
pub trait RepoHost {
    /// `at` selects a branch, tag or commit; `None` reads the default branch.
    fn get_contents(
        &self,
        repo: &RepoRef,
        path: &str,
        at: Option<&str>,
    ) -> Result<RemoteFile, HostError>;

    fn default_branch(&self, repo: &RepoRef) -> Result<String, HostError>;

    /// Commit SHA the ref points at.
    fn get_ref(&self, repo: &RepoRef, git_ref: &str) -> Result<String, HostError>;

    fn create_ref(&self, repo: &RepoRef, git_ref: &str, sha: &str) -> Result<(), HostError>;

    fn upsert_file(&self, repo: &RepoRef, upsert: &FileUpsert<'_>) -> Result<(), HostError>;

    fn create_pull_request(
        &self,
        repo: &RepoRef,
        pr: &NewPullRequest,
    ) -> Result<PullRequest, HostError>;

    /// `head` is in `owner:branch` form.
    fn list_pull_requests(
        &self,
        repo: &RepoRef,
        head: &str,
        base: &str,
        state: &str,
    ) -> Result<Vec<PullRequest>, HostError>;
}
