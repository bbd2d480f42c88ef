use std::path::PathBuf;

use thiserror::Error;

use crate::github::{DecodeError, HostError};

/// Configuration problems, surfaced before any network activity.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "base repository is not set; pass --base-repo or set `base-repo` in the config file"
    )]
    MissingBaseRepository,

    #[error("commit message is not set; pass --message or set `message` in the config file")]
    MissingMessage,

    #[error(
        "GitHub token is not set; export GITHUB_TOKEN or set `github-token` in the config file"
    )]
    MissingCredential,

    #[error("failed to read config {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
}

/// Parser error of whichever format the config file is written in.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}

/// Failures of the download and upload sequences. All of them abort the run.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("failed to fetch '{primary}'{}", fallback_suffix(.fallback))]
    FileFetchFailed {
        primary: String,
        fallback: Option<String>,
        #[source]
        cause: HostError,
    },

    #[error("failed to decode contents of '{path}'")]
    ContentDecodeFailed {
        path: String,
        #[source]
        source: DecodeError,
    },

    #[error("failed to write {}", path.display())]
    LocalWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read {}", path.display())]
    LocalReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to look up {what} of the base repository")]
    RepositoryLookupFailed {
        what: &'static str,
        #[source]
        source: HostError,
    },

    #[error("failed to create branch '{branch}'")]
    BranchCreationFailed {
        branch: String,
        #[source]
        source: HostError,
    },

    #[error("failed to upload '{path}'")]
    FileUpsertFailed {
        path: String,
        #[source]
        source: HostError,
    },

    #[error("failed to create pull request from '{branch}'")]
    PullRequestCreationFailed {
        branch: String,
        #[source]
        source: HostError,
    },

    #[error("a pull request from '{branch}' already exists but none could be found")]
    PullRequestReconciliationFailed {
        branch: String,
        #[source]
        source: Option<HostError>,
    },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid repository reference: '{0}'")]
    InvalidRepositoryReference(String),

    #[error(transparent)]
    Transfer(#[from] TransferError),
}

fn fallback_suffix(fallback: &Option<String>) -> String {
    match fallback {
        Some(f) => format!(" and '{f}'"),
        None => String::new(),
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
