use std::fmt;

use crate::error::{Error, Result};

const HTTPS_PREFIX: &str = "https://github.com/";
const SSH_PREFIX: &str = "git@github.com:";

/// A GitHub repository identified by owner and name.
///
/// Both fields are non-empty for any value produced by [`RepoRef::parse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    /// Parse a repository URL or `owner/repo` shorthand.
    ///
    /// Accepted forms:
    /// - `https://github.com/owner/repo` (optionally with `.git` and/or a trailing `/`)
    /// - `git@github.com:owner/repo.git`
    /// - `owner/repo`
    ///
    /// One trailing `/` is stripped first, then one trailing `.git`.
    /// Extra path segments after the repository name are ignored.
    ///
    /// # Errors
    /// Returns [`Error::InvalidRepositoryReference`] when fewer than two
    /// non-empty segments remain.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let s = trimmed.strip_suffix('/').unwrap_or(trimmed);
        let s = s.strip_suffix(".git").unwrap_or(s);

        let rest = s
            .strip_prefix(HTTPS_PREFIX)
            .or_else(|| s.strip_prefix(SSH_PREFIX))
            .unwrap_or(s);

        let mut parts = rest.split('/');
        match (parts.next(), parts.next()) {
            (Some(owner), Some(name)) if !owner.is_empty() && !name.is_empty() => Ok(Self {
                owner: owner.to_string(),
                name: name.to_string(),
            }),
            _ => Err(Error::InvalidRepositoryReference(input.to_string())),
        }
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}
