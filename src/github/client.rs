use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::Url;
use reqwest::blocking::{Client, Response};
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

use super::types::{ApiErrorBody, GitRef, RepositoryInfo};
use super::{FileUpsert, HostError, NewPullRequest, PullRequest, Release, RemoteFile, RepoHost};
use crate::repo_ref::RepoRef;

pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Blocking client for the GitHub REST API.
pub struct GitHubClient {
    http: Client,
    api_url: Url,
}

impl GitHubClient {
    /// Build a client for `api_url`. The token, when present and non-empty,
    /// is sent as a bearer token on every request.
    pub fn new(api_url: &str, token: Option<&str>) -> Result<Self, HostError> {
        Self::build(api_url, token, None)
    }

    /// Same as [`GitHubClient::new`] with a per-request timeout.
    pub fn with_timeout(
        api_url: &str,
        token: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, HostError> {
        Self::build(api_url, token, Some(timeout))
    }

    fn build(
        api_url: &str,
        token: Option<&str>,
        timeout: Option<Duration>,
    ) -> Result<Self, HostError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("ruleforge/", env!("CARGO_PKG_VERSION"))),
        );
        if let Some(tok) = token.filter(|t| !t.is_empty()) {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", tok))
                .map_err(|_| HostError::InvalidToken)?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let mut builder = Client::builder().default_headers(headers);
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }

        let api_url = Url::parse(api_url)
            .ok()
            .filter(|u| !u.cannot_be_a_base())
            .ok_or_else(|| HostError::InvalidApiUrl(api_url.to_string()))?;

        Ok(Self {
            http: builder.build()?,
            api_url,
        })
    }

    /// `<api>/repos/<owner>/<name>/<segments...>`, each segment percent-encoded.
    fn repo_url<'a>(&self, repo: &RepoRef, segments: impl IntoIterator<Item = &'a str>) -> Url {
        let mut url = self.api_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty()
                .extend(["repos", repo.owner.as_str(), repo.name.as_str()])
                .extend(segments);
        }
        url
    }

    fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, HostError> {
        debug!(%url, "GET");
        let resp = check(self.http.get(url).send()?)?;
        Ok(resp.json()?)
    }

    /// Latest published release of `owner/name`.
    pub fn latest_release(&self, repo: &RepoRef) -> Result<Release, HostError> {
        self.get_json(self.repo_url(repo, ["releases", "latest"]))
    }
}

/// Turn a non-success response into a [`HostError`].
fn check(resp: Response) -> Result<Response, HostError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let path = resp.url().path().to_string();
    let body: ApiErrorBody = resp.json().unwrap_or_default();
    Err(classify(status.as_u16(), &path, body))
}

fn classify(status: u16, path: &str, body: ApiErrorBody) -> HostError {
    if status == 404 {
        return HostError::NotFound(path.to_string());
    }

    let details: Vec<&str> = body
        .errors
        .iter()
        .filter_map(|e| e.message.as_deref())
        .collect();
    let message = if details.is_empty() {
        body.message
    } else {
        format!("{} ({})", body.message, details.join("; "))
    };

    if status == 422 && message.to_ascii_lowercase().contains("already exists") {
        HostError::AlreadyExists(message)
    } else {
        HostError::Api { status, message }
    }
}

impl RepoHost for GitHubClient {
    fn get_contents(
        &self,
        repo: &RepoRef,
        path: &str,
        at: Option<&str>,
    ) -> Result<RemoteFile, HostError> {
        let mut url = self.repo_url(repo, std::iter::once("contents").chain(path.split('/')));
        if let Some(r) = at {
            url.query_pairs_mut().append_pair("ref", r);
        }
        self.get_json(url)
    }

    fn default_branch(&self, repo: &RepoRef) -> Result<String, HostError> {
        let info: RepositoryInfo = self.get_json(self.repo_url(repo, std::iter::empty()))?;
        Ok(info.default_branch)
    }

    fn get_ref(&self, repo: &RepoRef, git_ref: &str) -> Result<String, HostError> {
        let short = git_ref.strip_prefix("refs/").unwrap_or(git_ref);
        let url = self.repo_url(repo, ["git", "ref"].into_iter().chain(short.split('/')));
        let r: GitRef = self.get_json(url)?;
        Ok(r.object.sha)
    }

    fn create_ref(&self, repo: &RepoRef, git_ref: &str, sha: &str) -> Result<(), HostError> {
        let url = self.repo_url(repo, ["git", "refs"]);
        debug!(%url, git_ref, sha, "POST");
        let body = json!({ "ref": git_ref, "sha": sha });
        check(self.http.post(url).json(&body).send()?)?;
        Ok(())
    }

    fn upsert_file(&self, repo: &RepoRef, upsert: &FileUpsert<'_>) -> Result<(), HostError> {
        let url = self.repo_url(
            repo,
            std::iter::once("contents").chain(upsert.path.split('/')),
        );
        debug!(%url, branch = upsert.branch, update = upsert.prior_sha.is_some(), "PUT");

        let mut body = json!({
            "message": upsert.message,
            "content": STANDARD.encode(upsert.content),
            "branch": upsert.branch,
        });
        if let Some(sha) = upsert.prior_sha {
            body["sha"] = json!(sha);
        }
        check(self.http.put(url).json(&body).send()?)?;
        Ok(())
    }

    fn create_pull_request(
        &self,
        repo: &RepoRef,
        pr: &NewPullRequest,
    ) -> Result<PullRequest, HostError> {
        let url = self.repo_url(repo, ["pulls"]);
        debug!(%url, head = %pr.head, base = %pr.base, "POST");
        let resp = check(self.http.post(url).json(pr).send()?)?;
        Ok(resp.json()?)
    }

    fn list_pull_requests(
        &self,
        repo: &RepoRef,
        head: &str,
        base: &str,
        state: &str,
    ) -> Result<Vec<PullRequest>, HostError> {
        let mut url = self.repo_url(repo, ["pulls"]);
        url.query_pairs_mut()
            .append_pair("head", head)
            .append_pair("base", base)
            .append_pair("state", state);
        self.get_json(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn repo() -> RepoRef {
        RepoRef {
            owner: "acme".into(),
            name: "rules".into(),
        }
    }

    #[test]
    fn rejects_non_base_api_url() {
        assert!(matches!(
            GitHubClient::new("mailto:someone", None),
            Err(HostError::InvalidApiUrl(_))
        ));
    }

    #[test]
    fn get_contents_reads_file_on_branch() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(GET)
                .path("/repos/acme/rules/contents/.cursor/rules.md")
                .query_param("ref", "demo-update");
            then.status(200).json_body(json!({
                "path": ".cursor/rules.md",
                "sha": "abc123",
                "content": "VGVzdCBydWxlcyBjb250ZW50Cg==",
                "encoding": "base64"
            }));
        });

        let client = GitHubClient::new(&server.base_url(), Some("tok")).unwrap();
        let file = client
            .get_contents(&repo(), ".cursor/rules.md", Some("demo-update"))
            .unwrap();

        m.assert();
        assert_eq!(file.sha, "abc123");
        assert_eq!(file.decode().unwrap(), b"Test rules content\n");
    }

    #[test]
    fn maps_404_to_not_found() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/repos/acme/rules/contents/missing.md");
            then.status(404).json_body(json!({ "message": "Not Found" }));
        });

        let client = GitHubClient::new(&server.base_url(), None).unwrap();
        let err = client.get_contents(&repo(), "missing.md", None).unwrap_err();
        assert!(matches!(err, HostError::NotFound(_)));
    }

    #[test]
    fn maps_existing_reference_to_already_exists() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(POST)
                .path("/repos/acme/rules/git/refs")
                .body_contains("refs/heads/demo-update");
            then.status(422)
                .json_body(json!({ "message": "Reference already exists" }));
        });

        let client = GitHubClient::new(&server.base_url(), Some("tok")).unwrap();
        let err = client
            .create_ref(&repo(), "refs/heads/demo-update", "abcdef")
            .unwrap_err();

        m.assert();
        assert!(err.is_already_exists());
    }

    #[test]
    fn pull_request_already_exists_is_detected_in_error_details() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/repos/acme/rules/pulls");
            then.status(422).json_body(json!({
                "message": "Validation Failed",
                "errors": [{ "resource": "PullRequest", "code": "custom",
                             "message": "A pull request already exists for acme:demo-update." }]
            }));
        });

        let client = GitHubClient::new(&server.base_url(), Some("tok")).unwrap();
        let pr = NewPullRequest {
            title: "t".into(),
            head: "demo-update".into(),
            base: "main".into(),
            body: "b".into(),
            maintainer_can_modify: true,
        };
        let err = client.create_pull_request(&repo(), &pr).unwrap_err();
        assert!(err.is_already_exists());
    }

    #[test]
    fn other_validation_errors_stay_api_errors() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/repos/acme/rules/git/refs");
            then.status(422)
                .json_body(json!({ "message": "Reference update failed" }));
        });

        let client = GitHubClient::new(&server.base_url(), Some("tok")).unwrap();
        let err = client.create_ref(&repo(), "refs/heads/x", "abc").unwrap_err();
        assert!(matches!(err, HostError::Api { status: 422, .. }));
    }

    #[test]
    fn resolves_default_branch_and_ref() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/repos/acme/rules");
            then.status(200).json_body(json!({ "default_branch": "main" }));
        });
        server.mock(|when, then| {
            when.method(GET).path("/repos/acme/rules/git/ref/heads/main");
            then.status(200).json_body(json!({
                "ref": "refs/heads/main",
                "object": { "sha": "abcdef123456", "type": "commit" }
            }));
        });

        let client = GitHubClient::new(&server.base_url(), Some("tok")).unwrap();
        assert_eq!(client.default_branch(&repo()).unwrap(), "main");
        assert_eq!(
            client.get_ref(&repo(), "refs/heads/main").unwrap(),
            "abcdef123456"
        );
    }

    #[test]
    fn upsert_sends_base64_content_and_prior_sha() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(PUT)
                .path("/repos/acme/rules/contents/.cursor/demo/rules.md")
                .body_contains("\"sha\":\"old-sha\"")
                .body_contains("\"branch\":\"demo-update\"")
                .body_contains("\"content\":\"aGVsbG8=\"");
            then.status(200).json_body(json!({ "content": { "sha": "new-sha" } }));
        });

        let client = GitHubClient::new(&server.base_url(), Some("tok")).unwrap();
        client
            .upsert_file(
                &repo(),
                &FileUpsert {
                    path: ".cursor/demo/rules.md",
                    branch: "demo-update",
                    message: "Update rules",
                    content: b"hello",
                    prior_sha: Some("old-sha"),
                },
            )
            .unwrap();
        m.assert();
    }

    #[test]
    fn lists_open_pull_requests_for_head() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(GET)
                .path("/repos/acme/rules/pulls")
                .query_param("head", "acme:demo-update")
                .query_param("base", "main")
                .query_param("state", "open");
            then.status(200).json_body(json!([
                { "number": 7, "html_url": "https://github.com/acme/rules/pull/7" }
            ]));
        });

        let client = GitHubClient::new(&server.base_url(), Some("tok")).unwrap();
        let prs = client
            .list_pull_requests(&repo(), "acme:demo-update", "main", "open")
            .unwrap();
        m.assert();
        assert_eq!(prs.len(), 1);
        assert_eq!(prs[0].number, 7);
    }
}
