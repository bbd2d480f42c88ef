mod branch;
mod pull_request;

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::{Context, Result as AnyResult};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{ConfigError, Result, TransferError};
use crate::github::{FileUpsert, GitHubClient, RepoHost};
use crate::paths::{FileTransferSpec, build_specs};
use crate::progress::{err_style, ok_style, spinner};
use crate::repo_ref::RepoRef;

pub use branch::{BranchState, branch_name, ensure_branch};
pub use pull_request::{PullRequestOutcome, open_pull_request};

/// Everything one upload run needs besides the host.
#[derive(Debug, Clone)]
pub struct UploadRequest<'a> {
    pub repo: &'a RepoRef,
    pub files: &'a [String],
    pub credential: Option<&'a str>,
    pub message: Option<&'a str>,
    /// Branch name before the repository-name prefix is applied.
    pub branch_base: &'a str,
    pub repo_name: Option<&'a str>,
    pub local_dir: &'a Path,
}

/// Where an upload run is. Runs are never resumed; each one starts at `Init`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStage {
    Init,
    BranchResolving,
    BranchEnsured,
    FilesUploading,
    PrReconciling,
    Done,
    Failed,
}

struct Run {
    stage: UploadStage,
}

impl Run {
    fn advance(&mut self, next: UploadStage) {
        debug!(from = ?self.stage, to = ?next, "upload stage");
        self.stage = next;
    }
}

/// Upload local files to the base repository and open a pull request.
///
/// Sequence:
/// 1. Resolve the default branch and its tip commit.
/// 2. Create the working branch (`<repo_name>-<branch_base>`) at that commit,
///    reusing it when it already exists.
/// 3. Create or update each local file on the working branch, skipping files
///    that do not exist locally.
/// 4. Open a pull request into the default branch, or report the open one
///    when GitHub says it already exists.
///
/// # Errors
/// - [`ConfigError::MissingCredential`] / [`ConfigError::MissingMessage`]
///   before any call is made to `host`.
/// - A [`TransferError`] for the first failing remote or local step.
pub fn publish_all(host: &dyn RepoHost, req: &UploadRequest<'_>) -> Result<PullRequestOutcome> {
    if req.credential.is_none_or(|c| c.trim().is_empty()) {
        return Err(ConfigError::MissingCredential.into());
    }
    let message = req
        .message
        .filter(|m| !m.trim().is_empty())
        .ok_or(ConfigError::MissingMessage)?;

    let mut run = Run {
        stage: UploadStage::Init,
    };
    match run_upload(host, req, message, &mut run) {
        Ok(outcome) => {
            run.advance(UploadStage::Done);
            Ok(outcome)
        }
        Err(e) => {
            warn!(stage = ?run.stage, "upload failed: {}", e);
            run.advance(UploadStage::Failed);
            Err(e.into())
        }
    }
}

fn run_upload(
    host: &dyn RepoHost,
    req: &UploadRequest<'_>,
    message: &str,
    run: &mut Run,
) -> Result<PullRequestOutcome, TransferError> {
    let repo = req.repo;

    run.advance(UploadStage::BranchResolving);
    let base = host
        .default_branch(repo)
        .map_err(|source| TransferError::RepositoryLookupFailed {
            what: "default branch",
            source,
        })?;
    let base_sha = host
        .get_ref(repo, &format!("refs/heads/{}", base))
        .map_err(|source| TransferError::RepositoryLookupFailed {
            what: "default branch tip",
            source,
        })?;

    let name = branch_name(req.branch_base, req.repo_name);
    let branch = ensure_branch(host, repo, &name, &base_sha)?;
    run.advance(UploadStage::BranchEnsured);

    run.advance(UploadStage::FilesUploading);
    let mut uploaded = 0usize;
    for spec in build_specs(req.files, req.repo_name, req.local_dir) {
        if upload_file(host, repo, &spec, &branch.name, message)? {
            uploaded += 1;
        }
    }
    debug!(uploaded, branch = %branch.name, "files uploaded");

    run.advance(UploadStage::PrReconciling);
    open_pull_request(host, repo, &branch.name, &base, message, req.repo_name)
}

/// Upsert one file. Returns `false` when the local file is missing.
fn upload_file(
    host: &dyn RepoHost,
    repo: &RepoRef,
    spec: &FileTransferSpec,
    branch: &str,
    message: &str,
) -> Result<bool, TransferError> {
    let content = match fs::read(&spec.local_path) {
        Ok(c) => c,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!("'{}' not found, skipping", spec.local_path.display());
            return Ok(false);
        }
        Err(source) => {
            return Err(TransferError::LocalReadFailed {
                path: spec.local_path.clone(),
                source,
            });
        }
    };

    let target = spec.remote_target_path.as_str();
    // Absent remote file means create.
    let prior_sha = host
        .get_contents(repo, target, Some(branch))
        .ok()
        .map(|f| f.sha);

    debug!(
        local = %spec.local_path.display(),
        target,
        update = prior_sha.is_some(),
        "uploading"
    );
    host.upsert_file(
        repo,
        &FileUpsert {
            path: target,
            branch,
            message,
            content: &content,
            prior_sha: prior_sha.as_deref(),
        },
    )
    .map_err(|source| TransferError::FileUpsertFailed {
        path: target.to_string(),
        source,
    })?;

    info!("uploaded '{}' to '{}'", spec.local_path.display(), target);
    Ok(true)
}

/// CLI command: upload the configured rule files and open a pull request.
pub fn cmd_upload(cfg: &Config) -> AnyResult<()> {
    let repo = RepoRef::parse(&cfg.base_repo)?;
    info!("uploading files to base repository {}", repo);

    let pb = spinner(cfg.verbose);
    pb.set_message(format!("uploading rules to {}…", repo));

    let client = GitHubClient::new(&cfg.api_url, cfg.token())
        .with_context(|| format!("failed to create GitHub client for {}", cfg.api_url))?;
    let request = UploadRequest {
        repo: &repo,
        files: &cfg.files,
        credential: cfg.token(),
        message: cfg.message.as_deref(),
        branch_base: &cfg.branch_name,
        repo_name: cfg.repo_name.as_deref(),
        local_dir: &cfg.local_dir,
    };

    match publish_all(&client, &request) {
        Ok(outcome) => {
            pb.set_style(ok_style());
            let verb = if outcome.was_pre_existing {
                "updated"
            } else {
                "opened"
            };
            pb.finish_with_message(format!(
                "{} pull request #{}: {}",
                verb, outcome.number, outcome.url
            ));
            Ok(())
        }
        Err(e) => {
            pb.set_style(err_style());
            pb.finish_with_message(format!("upload to {} failed", repo));
            Err(e.into())
        }
    }
}
