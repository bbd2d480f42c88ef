use tracing::{info, warn};

use crate::error::TransferError;
use crate::github::{NewPullRequest, PullRequest, RepoHost};
use crate::paths::non_empty;
use crate::repo_ref::RepoRef;

/// The pull request an upload run ends with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestOutcome {
    pub number: u64,
    pub url: String,
    /// `true` when an open pull request for the branch was already there.
    pub was_pre_existing: bool,
}

impl PullRequestOutcome {
    fn from_pr(pr: PullRequest, was_pre_existing: bool) -> Self {
        Self {
            number: pr.number,
            url: pr.html_url,
            was_pre_existing,
        }
    }
}

pub fn pr_title(message: &str, repo_name: Option<&str>) -> String {
    match non_empty(repo_name) {
        Some(name) => format!("[{}] {}", name, message),
        None => message.to_string(),
    }
}

pub fn pr_body(repo_name: Option<&str>) -> String {
    format!(
        "This pull request was generated automatically from {}.\n\n\
         It contains updates to the AI agent rules.",
        non_empty(repo_name).unwrap_or("a local repository")
    )
}

/// Open a pull request from `branch` into `base`.
///
/// When GitHub reports that one already exists, the open pull requests for
/// the same head and base are listed and the first one is reported instead.
pub fn open_pull_request(
    host: &dyn RepoHost,
    repo: &RepoRef,
    branch: &str,
    base: &str,
    message: &str,
    repo_name: Option<&str>,
) -> Result<PullRequestOutcome, TransferError> {
    let new_pr = NewPullRequest {
        title: pr_title(message, repo_name),
        head: branch.to_string(),
        base: base.to_string(),
        body: pr_body(repo_name),
        maintainer_can_modify: true,
    };

    match host.create_pull_request(repo, &new_pr) {
        Ok(pr) => {
            let outcome = PullRequestOutcome::from_pr(pr, false);
            info!("opened pull request #{}: {}", outcome.number, outcome.url);
            Ok(outcome)
        }
        Err(e) if e.is_already_exists() => {
            warn!("a pull request from '{}' already exists", branch);
            reconcile(host, repo, branch, base)
        }
        Err(source) => Err(TransferError::PullRequestCreationFailed {
            branch: branch.to_string(),
            source,
        }),
    }
}

fn reconcile(
    host: &dyn RepoHost,
    repo: &RepoRef,
    branch: &str,
    base: &str,
) -> Result<PullRequestOutcome, TransferError> {
    let head = format!("{}:{}", repo.owner, branch);
    let open = host
        .list_pull_requests(repo, &head, base, "open")
        .map_err(|e| TransferError::PullRequestReconciliationFailed {
            branch: branch.to_string(),
            source: Some(e),
        })?;

    let pr = open
        .into_iter()
        .next()
        .ok_or_else(|| TransferError::PullRequestReconciliationFailed {
            branch: branch.to_string(),
            source: None,
        })?;

    let outcome = PullRequestOutcome::from_pr(pr, true);
    info!(
        "changes added to existing pull request #{}: {}",
        outcome.number, outcome.url
    );
    Ok(outcome)
}
