use std::path::{Path, PathBuf};

/// Where one configured file lives locally and on the base repository.
///
/// Built once per configured file at the start of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTransferSpec {
    /// Path as written in the config, e.g. `.cursor/rules.md`.
    pub relative_path: String,
    pub local_path: PathBuf,
    /// Remote path tried first when downloading.
    pub remote_primary_path: String,
    /// Remote path tried when the primary lookup fails (`<repo-name>/<relative>`).
    pub remote_fallback_path: Option<String>,
    /// Remote path written when uploading (`<dir>/<repo-name>/<file>`).
    pub remote_target_path: String,
}

impl FileTransferSpec {
    pub fn new(relative_path: &str, repo_name: Option<&str>, local_dir: &Path) -> Self {
        Self {
            relative_path: relative_path.to_string(),
            local_path: local_path(local_dir, relative_path),
            remote_primary_path: relative_path.to_string(),
            remote_fallback_path: fallback_path(relative_path, repo_name),
            remote_target_path: target_path(relative_path, repo_name),
        }
    }
}

/// Build specs for every configured file, preserving order.
pub fn build_specs(
    files: &[String],
    repo_name: Option<&str>,
    local_dir: &Path,
) -> Vec<FileTransferSpec> {
    files
        .iter()
        .map(|f| FileTransferSpec::new(f, repo_name, local_dir))
        .collect()
}

pub(crate) fn non_empty(repo_name: Option<&str>) -> Option<&str> {
    repo_name.map(str::trim).filter(|n| !n.is_empty())
}

/// Read side: `<repo-name>/<relative>`, only when a repository name is set.
pub fn fallback_path(relative_path: &str, repo_name: Option<&str>) -> Option<String> {
    non_empty(repo_name).map(|name| format!("{}/{}", name, relative_path))
}

/// Write side: the repository name is nested between the directory and the
/// file name, e.g. `.cursor/rules.md` → `.cursor/demo/rules.md`.
///
/// Not the same layout as [`fallback_path`].
pub fn target_path(relative_path: &str, repo_name: Option<&str>) -> String {
    let Some(name) = non_empty(repo_name) else {
        return relative_path.to_string();
    };
    match relative_path.rsplit_once('/') {
        Some((dir, base)) if !dir.is_empty() => format!("{}/{}/{}", dir, name, base),
        Some((_, base)) => format!("{}/{}", name, base),
        None => format!("{}/{}", name, relative_path),
    }
}

/// Local destination: `<local-dir>/<relative>`.
pub fn local_path(local_dir: &Path, relative_path: &str) -> PathBuf {
    local_dir.join(relative_path)
}
