use tracing::info;

use crate::error::TransferError;
use crate::github::RepoHost;
use crate::paths::non_empty;
use crate::repo_ref::RepoRef;

/// The working branch of one upload run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchState {
    pub name: String,
    /// Commit the branch was created from (tip of the default branch).
    pub base_sha: String,
    pub already_existed: bool,
}

/// `<repo_name>-<base>` when a repository name is set, else `base`.
pub fn branch_name(base: &str, repo_name: Option<&str>) -> String {
    match non_empty(repo_name) {
        Some(name) => format!("{}-{}", name, base),
        None => base.to_string(),
    }
}

/// Create `refs/heads/<name>` at `base_sha`.
///
/// A branch that already exists is reused; its tip is left as is.
pub fn ensure_branch(
    host: &dyn RepoHost,
    repo: &RepoRef,
    name: &str,
    base_sha: &str,
) -> Result<BranchState, TransferError> {
    let already_existed = match host.create_ref(repo, &format!("refs/heads/{}", name), base_sha) {
        Ok(()) => {
            info!("created branch '{}'", name);
            false
        }
        Err(e) if e.is_already_exists() => {
            info!("branch '{}' already exists, adding to it", name);
            true
        }
        Err(source) => {
            return Err(TransferError::BranchCreationFailed {
                branch: name.to_string(),
                source,
            });
        }
    };

    Ok(BranchState {
        name: name.to_string(),
        base_sha: base_sha.to_string(),
        already_existed,
    })
}
