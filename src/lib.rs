//! Crate entry point for **ruleforge**.
//!
//! This library provides the implementation behind the `ruleforge` CLI.
//! Each submodule encapsulates one responsibility (config loading, GitHub
//! access, path rules, the download and upload sequences, the update check).
//! The `pub use` re-exports make the commands and core operations
//! accessible directly from the crate root.

mod config;
mod download;
mod error;
mod github;
mod logging;
mod paths;
mod progress;
mod repo_ref;
mod upload;
mod version;

#[cfg(test)]
mod test_utils;

pub use config::{
    Config, DEFAULT_CONFIG_FILE, DEFAULT_TARGET_FILE, Overrides, load_config, resolve_config,
};
pub use download::{cmd_download, fetch_all};
pub use error::{ConfigError, Error, ParseError, Result, TransferError};
pub use github::{
    DEFAULT_API_URL, DecodeError, FileUpsert, GitHubClient, HostError, NewPullRequest,
    PullRequest, RemoteFile, RepoHost,
};
pub use logging::{Logging, init_logging};
pub use paths::{FileTransferSpec, build_specs, fallback_path, target_path};
pub use repo_ref::RepoRef;
pub use upload::{
    BranchState, PullRequestOutcome, UploadRequest, UploadStage, cmd_upload, publish_all,
};
pub use version::{
    Clock, LatestRelease, ReleaseSource, SystemClock, UpdateCheckState, UpdateChecker,
    UpdateNotifier, is_newer, should_recheck, spawn_update_check,
};
