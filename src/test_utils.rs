//! Test utilities shared across modules.
//!
//! [`FakeHost`] is an in-memory [`RepoHost`] that records every call, so the
//! download and upload sequences can be checked without a network.

use std::cell::RefCell;
use std::collections::HashMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::github::{FileUpsert, HostError, NewPullRequest, PullRequest, RemoteFile, RepoHost};
use crate::repo_ref::RepoRef;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    GetContents { path: String, at: Option<String> },
    DefaultBranch,
    GetRef(String),
    CreateRef { git_ref: String, sha: String },
    Upsert {
        path: String,
        branch: String,
        prior_sha: Option<String>,
        content: Vec<u8>,
    },
    CreatePullRequest(String),
    ListPullRequests { head: String, base: String, state: String },
}

/// Scripted answer for a create call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Reply {
    #[default]
    Ok,
    AlreadyExists,
    Fail,
}

impl Reply {
    fn into_result(self, what: &str) -> Result<(), HostError> {
        match self {
            Reply::Ok => Ok(()),
            Reply::AlreadyExists => Err(HostError::AlreadyExists(format!("{what} already exists"))),
            Reply::Fail => Err(HostError::Api {
                status: 500,
                message: format!("{what} failed"),
            }),
        }
    }
}

pub struct FakeHost {
    /// Remote files keyed by path; the `at` argument is ignored.
    pub files: HashMap<String, RemoteFile>,
    pub default_branch: String,
    pub tip_sha: String,
    pub create_ref: Reply,
    pub upsert: Reply,
    pub create_pr: Reply,
    /// Answer of the list call; `Ok` returns `open_prs`.
    pub list_prs: Reply,
    pub open_prs: Vec<PullRequest>,
    pub calls: RefCell<Vec<Call>>,
}

impl Default for FakeHost {
    fn default() -> Self {
        Self {
            files: HashMap::new(),
            default_branch: "main".into(),
            tip_sha: "abcdef123456".into(),
            create_ref: Reply::Ok,
            upsert: Reply::Ok,
            create_pr: Reply::Ok,
            list_prs: Reply::Ok,
            open_prs: Vec::new(),
            calls: RefCell::new(Vec::new()),
        }
    }
}

impl FakeHost {
    /// Add a base64-encoded remote file.
    pub fn with_file(mut self, path: &str, content: &str) -> Self {
        self.files.insert(
            path.to_string(),
            RemoteFile {
                path: path.to_string(),
                sha: format!("sha-of-{path}"),
                content: STANDARD.encode(content),
                encoding: Some("base64".into()),
            },
        );
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn upserts(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Upsert { .. }))
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }
}

impl RepoHost for FakeHost {
    fn get_contents(
        &self,
        _repo: &RepoRef,
        path: &str,
        at: Option<&str>,
    ) -> Result<RemoteFile, HostError> {
        self.record(Call::GetContents {
            path: path.to_string(),
            at: at.map(str::to_string),
        });
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| HostError::NotFound(path.to_string()))
    }

    fn default_branch(&self, _repo: &RepoRef) -> Result<String, HostError> {
        self.record(Call::DefaultBranch);
        Ok(self.default_branch.clone())
    }

    fn get_ref(&self, _repo: &RepoRef, git_ref: &str) -> Result<String, HostError> {
        self.record(Call::GetRef(git_ref.to_string()));
        Ok(self.tip_sha.clone())
    }

    fn create_ref(&self, _repo: &RepoRef, git_ref: &str, sha: &str) -> Result<(), HostError> {
        self.record(Call::CreateRef {
            git_ref: git_ref.to_string(),
            sha: sha.to_string(),
        });
        self.create_ref.into_result("Reference")
    }

    fn upsert_file(&self, _repo: &RepoRef, upsert: &FileUpsert<'_>) -> Result<(), HostError> {
        self.record(Call::Upsert {
            path: upsert.path.to_string(),
            branch: upsert.branch.to_string(),
            prior_sha: upsert.prior_sha.map(str::to_string),
            content: upsert.content.to_vec(),
        });
        self.upsert.into_result("upsert")
    }

    fn create_pull_request(
        &self,
        _repo: &RepoRef,
        pr: &NewPullRequest,
    ) -> Result<PullRequest, HostError> {
        self.record(Call::CreatePullRequest(pr.title.clone()));
        self.create_pr.into_result("A pull request")?;
        Ok(PullRequest {
            number: 1,
            html_url: "https://github.com/acme/rules/pull/1".into(),
        })
    }

    fn list_pull_requests(
        &self,
        _repo: &RepoRef,
        head: &str,
        base: &str,
        state: &str,
    ) -> Result<Vec<PullRequest>, HostError> {
        self.record(Call::ListPullRequests {
            head: head.to_string(),
            base: base.to_string(),
            state: state.to_string(),
        });
        self.list_prs.into_result("listing pull requests")?;
        Ok(self.open_prs.clone())
    }
}

pub fn acme_rules() -> RepoRef {
    RepoRef {
        owner: "acme".into(),
        name: "rules".into(),
    }
}
