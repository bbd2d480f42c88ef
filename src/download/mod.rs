use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result as AnyResult};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Result, TransferError};
use crate::github::{GitHubClient, HostError, RemoteFile, RepoHost};
use crate::paths::{FileTransferSpec, build_specs};
use crate::progress::{err_style, ok_style, spinner};
use crate::repo_ref::RepoRef;

/// Download every configured file from the base repository into `local_dir`.
///
/// Files are processed in list order. For each one:
/// 1. Fetch the primary path (the configured relative path).
/// 2. On any error, retry once at `<repo_name>/<relative>` when a repository
///    name is set.
/// 3. Decode the payload and write it to `<local_dir>/<relative>`, creating
///    parent directories and overwriting any existing file.
///
/// The first failure aborts the whole run. Files written before the failure
/// are left in place.
///
/// Returns the local paths written, in order.
pub fn fetch_all(
    host: &dyn RepoHost,
    repo: &RepoRef,
    files: &[String],
    repo_name: Option<&str>,
    local_dir: &Path,
) -> Result<Vec<PathBuf>> {
    let specs = build_specs(files, repo_name, local_dir);
    let mut written = Vec::with_capacity(specs.len());

    for spec in &specs {
        debug!(file = %spec.relative_path, "downloading");
        let (remote, fetched_from) = fetch_one(host, repo, spec)?;

        let bytes = remote
            .decode()
            .map_err(|source| TransferError::ContentDecodeFailed {
                path: fetched_from.to_string(),
                source,
            })?;

        write_file(&spec.local_path, &bytes)?;
        info!(
            "downloaded '{}' to {}",
            fetched_from,
            spec.local_path.display()
        );
        written.push(spec.local_path.clone());
    }

    Ok(written)
}

/// Fetch a file at its primary path, falling back once to the namespaced path.
fn fetch_one<'a>(
    host: &dyn RepoHost,
    repo: &RepoRef,
    spec: &'a FileTransferSpec,
) -> Result<(RemoteFile, &'a str), TransferError> {
    let primary_err = match host.get_contents(repo, &spec.remote_primary_path, None) {
        Ok(file) => return Ok((file, spec.remote_primary_path.as_str())),
        Err(e) => e,
    };

    let Some(fallback) = spec.remote_fallback_path.as_deref() else {
        return Err(fetch_failed(spec, None, primary_err));
    };

    debug!(
        primary = %spec.remote_primary_path,
        fallback,
        error = %primary_err,
        "primary path unavailable, trying repository-specific path"
    );
    host.get_contents(repo, fallback, None)
        .map(|file| (file, fallback))
        .map_err(|e| fetch_failed(spec, Some(fallback), e))
}

fn fetch_failed(
    spec: &FileTransferSpec,
    fallback: Option<&str>,
    cause: HostError,
) -> TransferError {
    TransferError::FileFetchFailed {
        primary: spec.remote_primary_path.clone(),
        fallback: fallback.map(str::to_string),
        cause,
    }
}

/// Write `bytes` to `dest` through a temporary file in the same directory.
///
/// The destination is either left untouched or fully replaced.
fn write_file(dest: &Path, bytes: &[u8]) -> Result<(), TransferError> {
    let failed = |source: io::Error| TransferError::LocalWriteFailed {
        path: dest.to_path_buf(),
        source,
    };

    let parent = dest
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    fs::create_dir_all(parent).map_err(failed)?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(failed)?;
    tmp.write_all(bytes).map_err(failed)?;
    let mode = match fs::metadata(dest) {
        Ok(meta) => tmp.as_file().set_permissions(meta.permissions()),
        Err(_) => set_default_mode(tmp.as_file()),
    };
    mode.map_err(failed)?;
    tmp.persist(dest).map_err(|e| failed(e.error))?;
    Ok(())
}

#[cfg(unix)]
fn set_default_mode(f: &File) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    f.set_permissions(fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn set_default_mode(_f: &File) -> io::Result<()> {
    Ok(())
}

/// CLI command: download the configured rule files.
pub fn cmd_download(cfg: &Config) -> AnyResult<()> {
    let repo = RepoRef::parse(&cfg.base_repo)?;
    info!("downloading files from base repository {}", repo);

    let pb = spinner(cfg.verbose);
    pb.set_message(format!("downloading rules from {}…", repo));

    let client = GitHubClient::new(&cfg.api_url, cfg.token())
        .with_context(|| format!("failed to create GitHub client for {}", cfg.api_url))?;
    match fetch_all(
        &client,
        &repo,
        &cfg.files,
        cfg.repo_name.as_deref(),
        &cfg.local_dir,
    ) {
        Ok(written) => {
            pb.set_style(ok_style());
            pb.finish_with_message(format!(
                "downloaded {} file(s) from {}",
                written.len(),
                repo
            ));
            Ok(())
        }
        Err(e) => {
            pb.set_style(err_style());
            pb.finish_with_message(format!("download from {} failed", repo));
            Err(e.into())
        }
    }
}
