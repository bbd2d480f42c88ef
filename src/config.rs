use git2::Repository;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::{env, fs, io};
use tracing::debug;

use crate::error::{ConfigError, ParseError};
use crate::github::DEFAULT_API_URL;

pub const DEFAULT_CONFIG_FILE: &str = ".ruleforge.yaml";
pub const DEFAULT_TARGET_FILE: &str = ".cursor/rules.md";
const DEFAULT_BRANCH_PREFIX: &str = "update-agent-rules";

/// On-disk shape of `.ruleforge.yaml`. Unknown keys are ignored.
///
/// Example:
/// ```yaml
/// base-repo: https://github.com/acme/agent-rules
/// target-files:
///   - .cursor/rules.md
/// github-token: ${GITHUB_TOKEN}
/// repo-name: demo
/// ```
///
/// A file ending in `.toml` is read as TOML with the same keys.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ConfigFile {
    base_repo: Option<String>,
    target_files: Option<Vec<String>>,
    github_token: Option<String>,
    message: Option<String>,
    verbose: Option<bool>,
    local_dir: Option<PathBuf>,
    branch_name: Option<String>,
    repo_name: Option<String>,
    api_url: Option<String>,
}

/// Effective settings for one run: config file, environment and defaults,
/// with CLI overrides applied on top.
#[derive(Debug, Clone)]
pub struct Config {
    pub base_repo: String,
    pub files: Vec<String>,
    pub github_token: Option<String>,
    pub message: Option<String>,
    pub verbose: bool,
    pub local_dir: PathBuf,
    /// Working branch name before the repository-name prefix.
    pub branch_name: String,
    /// Name of the current repository, used to namespace remote paths.
    pub repo_name: Option<String>,
    pub api_url: String,
}

/// Values given on the command line. `None` keeps the configured value.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub base_repo: Option<String>,
    pub files: Option<Vec<String>>,
    pub message: Option<String>,
    pub verbose: bool,
}

impl Config {
    /// The token, if one is configured and non-empty.
    pub fn token(&self) -> Option<&str> {
        self.github_token.as_deref().filter(|t| !t.is_empty())
    }
}

/// Load `path` into a [`Config`].
///
/// - A missing file is not an error; defaults are used.
/// - `github-token = "${NAME}"` is replaced by the value of `$NAME`.
/// - An empty token falls back to `$GITHUB_TOKEN`.
/// - An unset `repo-name` is detected from the `origin` remote of the git
///   repository containing `local-dir`.
///
/// # Errors
/// [`ConfigError::Read`] if the file exists but cannot be read,
/// [`ConfigError::Parse`] if it is not valid YAML (or TOML) for this schema.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let file = match fs::read_to_string(path) {
        Ok(txt) => parse_config(path, &txt).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no config file, using defaults");
            ConfigFile::default()
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let local_dir = file.local_dir.unwrap_or_else(|| PathBuf::from("."));

    let github_token = file
        .github_token
        .map(|t| expand_env(&t))
        .filter(|t| !t.is_empty())
        .or_else(|| env::var("GITHUB_TOKEN").ok())
        .filter(|t| !t.is_empty());

    let repo_name = file
        .repo_name
        .filter(|n| !n.trim().is_empty())
        .or_else(|| detect_repo_name(&local_dir));

    Ok(Config {
        base_repo: file.base_repo.unwrap_or_default(),
        files: file
            .target_files
            .unwrap_or_else(|| vec![DEFAULT_TARGET_FILE.to_string()]),
        github_token,
        message: file.message,
        verbose: file.verbose.unwrap_or(false),
        local_dir,
        branch_name: file
            .branch_name
            .unwrap_or_else(|| format!("{}-{}", DEFAULT_BRANCH_PREFIX, std::process::id())),
        repo_name,
        api_url: file.api_url.unwrap_or_else(|| DEFAULT_API_URL.to_string()),
    })
}

fn parse_config(path: &Path, txt: &str) -> Result<ConfigFile, ParseError> {
    if txt.trim().is_empty() {
        return Ok(ConfigFile::default());
    }
    match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => Ok(toml::from_str(txt)?),
        _ => Ok(serde_yaml::from_str(txt)?),
    }
}

/// Load `path`, apply command-line overrides and check the base repository.
///
/// # Errors
/// Everything [`load_config`] returns, plus
/// [`ConfigError::MissingBaseRepository`] when no base repository is set.
pub fn resolve_config(path: &Path, overrides: Overrides) -> Result<Config, ConfigError> {
    let mut cfg = load_config(path)?;

    if let Some(repo) = overrides.base_repo.filter(|r| !r.trim().is_empty()) {
        cfg.base_repo = repo;
    }
    if let Some(files) = overrides.files.filter(|f| !f.is_empty()) {
        cfg.files = files;
    }
    if let Some(message) = overrides.message.filter(|m| !m.is_empty()) {
        cfg.message = Some(message);
    }
    cfg.verbose |= overrides.verbose;

    if cfg.base_repo.trim().is_empty() {
        return Err(ConfigError::MissingBaseRepository);
    }
    Ok(cfg)
}

/// `${NAME}` → value of `$NAME` (empty when unset); anything else unchanged.
fn expand_env(value: &str) -> String {
    match value
        .strip_prefix("${")
        .and_then(|rest| rest.strip_suffix('}'))
    {
        Some(name) => env::var(name).unwrap_or_default(),
        None => value.to_string(),
    }
}

/// Repository name from the `origin` remote of the repository containing `dir`.
fn detect_repo_name(dir: &Path) -> Option<String> {
    let repo = Repository::discover(dir).ok()?;
    let remote = repo.find_remote("origin").ok()?;
    let name = repo_name_from_url(remote.url()?);
    debug!(?name, "detected repository name from origin");
    name
}

/// Last path segment of a GitHub remote URL, without `.git`.
fn repo_name_from_url(url: &str) -> Option<String> {
    if !url.contains("github.com") {
        return None;
    }
    let url = url.trim().trim_end_matches('/');
    let last = url.rsplit(['/', ':']).next()?;
    let name = last.strip_suffix(".git").unwrap_or(last);
    (!name.is_empty()).then(|| name.to_string())
}
