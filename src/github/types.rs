use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use super::DecodeError;

/// A file as returned by the contents API.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteFile {
    #[serde(default)]
    pub path: String,
    /// Blob SHA, needed to update the file later.
    pub sha: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub encoding: Option<String>,
}

impl RemoteFile {
    /// Decode the transport encoding of `content`.
    ///
    /// GitHub wraps base64 payloads at 60 columns, so whitespace is dropped
    /// before decoding. Files above 1 MB come back with encoding `none` and
    /// no content; those are reported as unsupported.
    pub fn decode(&self) -> Result<Vec<u8>, DecodeError> {
        match self.encoding.as_deref() {
            Some("base64") => {
                let compact: String = self
                    .content
                    .chars()
                    .filter(|c| !c.is_ascii_whitespace())
                    .collect();
                Ok(STANDARD.decode(compact)?)
            }
            None | Some("") => Ok(self.content.clone().into_bytes()),
            Some(other) => Err(DecodeError::UnsupportedEncoding(other.to_string())),
        }
    }
}

/// Create-or-update request for a single file on a branch.
#[derive(Debug, Clone)]
pub struct FileUpsert<'a> {
    pub path: &'a str,
    pub branch: &'a str,
    pub message: &'a str,
    pub content: &'a [u8],
    /// Blob SHA of the existing file; `None` creates the file.
    pub prior_sha: Option<&'a str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewPullRequest {
    pub title: String,
    pub head: String,
    pub base: String,
    pub body: String,
    pub maintainer_can_modify: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub html_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub html_url: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct RepositoryInfo {
    pub default_branch: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct GitRef {
    pub object: GitObject,
}

#[derive(Debug, Deserialize)]
pub(super) struct GitObject {
    pub sha: String,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct ApiErrorBody {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub errors: Vec<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ApiErrorDetail {
    #[serde(default)]
    pub message: Option<String>,
}
