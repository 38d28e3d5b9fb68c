//! Simple client for the Github REST API.
//!
//! Covers the handful of repository endpoints needed to line up commits with
//! deployments: listing commits, fetching one commit, walking tags, and the
//! pull requests and comments behind a merge commit.

use api_client::{ApiClient, TokenAuth};

use futures::stream::{BoxStream, StreamExt as _};
use http::header;
use http::HeaderValue;
use hyperdriver::client::conn::transport::tcp::TcpTransportConfig;
use hyperdriver::Client;
use serde::Serialize;
use thiserror::Error;
use tower_http::set_header::SetRequestHeaderLayer;

mod config;
pub mod models;

pub use crate::config::GithubConfig;
use crate::models::{Commit, IssueComment, PullRequest, Tag};

const CONNECT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);
const GITHUB_ACCEPT: &str = "application/vnd.github+json";
const GITHUB_API_VERSION: &str = "2022-11-28";
const GITHUB_API_VERSION_HEADER: &str = "x-github-api-version";

/// Default number of commits to request per page.
pub const DEFAULT_PER_PAGE: u32 = 100;

const PULLS_QUERY: [(&str, &str); 4] = [
    ("state", "closed"),
    ("sort", "created"),
    ("direction", "desc"),
    ("per_page", "100"),
];

/// Errors that can occur when using the Github client.
#[derive(Debug, Error)]
pub enum Error {
    /// An error from sending a request or reading its response.
    #[error(transparent)]
    Api(#[from] api_client::Error),

    /// The configured API root is not a usable URL.
    #[error("Invalid Github API base: {0}")]
    Base(#[from] api_client::uri::ParseUriError),

    /// An owner, repository or ref which can't be placed in an API path.
    #[error("Invalid {what}: {value:?}")]
    InvalidName {
        /// Which part of the path was invalid.
        what: &'static str,

        /// The rejected value.
        value: String,
    },
}

impl Error {
    /// The HTTP status Github responded with, if the error came from a response.
    pub fn status(&self) -> Option<http::StatusCode> {
        match self {
            Error::Api(error) => error.status(),
            _ => None,
        }
    }
}

/// Query parameters for listing commits.
#[derive(Debug, Clone, Serialize)]
pub struct CommitsQuery {
    /// Page size, at most 100.
    pub per_page: u32,

    /// Branch or SHA to list from; the default branch when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha: Option<String>,
}

impl Default for CommitsQuery {
    fn default() -> Self {
        Self {
            per_page: DEFAULT_PER_PAGE,
            sha: None,
        }
    }
}

impl CommitsQuery {
    /// List `per_page` commits from the default branch.
    pub fn per_page(per_page: u32) -> Self {
        Self {
            per_page,
            sha: None,
        }
    }
}

/// A Github client, optionally authenticated with a personal access token.
#[derive(Debug, Clone)]
pub struct GithubClient {
    client: ApiClient<Option<TokenAuth>>,
}

impl GithubClient {
    /// Build a client which talks to Github over the network.
    pub fn new(config: &GithubConfig) -> Result<Self, Error> {
        let mut tcp = TcpTransportConfig::default();
        tcp.connect_timeout = Some(CONNECT_TIMEOUT);

        let inner = Client::builder()
            .with_tcp(tcp)
            .with_auto_http()
            .with_user_agent(config.user_agent.clone())
            .with_timeout(config.timeout())
            .build_service();

        Self::with_service(config, inner)
    }

    /// Build a client which sends requests through `service`.
    ///
    /// The Github `Accept` and API version headers are added here, for every
    /// transport.
    pub fn with_service<S>(config: &GithubConfig, service: S) -> Result<Self, Error>
    where
        S: tower::Service<
                http::Request<hyperdriver::Body>,
                Response = http::Response<hyperdriver::Body>,
                Error = hyperdriver::client::Error,
            > + Clone
            + Send
            + Sync
            + 'static,
        S::Future: Send + 'static,
    {
        let base = api_client::uri::parse_http_uri(&config.base)?;
        let token = config.token();
        if token.is_none() {
            tracing::warn!("no Github token configured, requests will be rate limited");
        }

        let service = tower::ServiceBuilder::new()
            .layer(SetRequestHeaderLayer::if_not_present(
                header::ACCEPT,
                HeaderValue::from_static(GITHUB_ACCEPT),
            ))
            .layer(SetRequestHeaderLayer::if_not_present(
                header::HeaderName::from_static(GITHUB_API_VERSION_HEADER),
                HeaderValue::from_static(GITHUB_API_VERSION),
            ))
            .service(service);

        let client =
            ApiClient::new_with_inner_service(base, token.map(TokenAuth::github), service)
                .with_timeout(config.timeout());

        Ok(Self { client })
    }

    /// Whether requests carry a token.
    pub fn is_authenticated(&self) -> bool {
        self.client.auth().is_some()
    }

    /// Build a GET request against a Github endpoint.
    pub fn get(&self, endpoint: &str) -> api_client::RequestBuilder<Option<TokenAuth>> {
        self.client.get(endpoint)
    }

    /// List commits on a repository, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn commits(
        &self,
        owner: &str,
        repo: &str,
        query: &CommitsQuery,
    ) -> Result<Vec<Commit>, Error> {
        let commits: Vec<Commit> = self.commits_request(owner, repo, query).await?;
        tracing::debug!("Found {} commits in {owner}/{repo}", commits.len());
        Ok(commits)
    }

    /// List commits on a repository as the raw JSON Github returned.
    #[tracing::instrument(skip(self))]
    pub async fn commits_json(
        &self,
        owner: &str,
        repo: &str,
        query: &CommitsQuery,
    ) -> Result<serde_json::Value, Error> {
        self.commits_request(owner, repo, query).await
    }

    async fn commits_request<T: serde::de::DeserializeOwned>(
        &self,
        owner: &str,
        repo: &str,
        query: &CommitsQuery,
    ) -> Result<T, Error> {
        let endpoint = format!("{}/commits", repository(owner, repo)?);
        let commits = self
            .get(&endpoint)
            .query(query)
            .send()
            .await?
            .error_for_status()
            .await?
            .json()
            .await?;
        Ok(commits)
    }

    /// Fetch a single commit by SHA or ref.
    #[tracing::instrument(skip(self))]
    pub async fn commit(&self, owner: &str, repo: &str, sha: &str) -> Result<Commit, Error> {
        let endpoint = format!(
            "{}/commits/{}",
            repository(owner, repo)?,
            path_segment("ref", sha)?
        );

        let commit = self
            .get(&endpoint)
            .send()
            .await?
            .error_for_status()
            .await?
            .json()
            .await?;
        Ok(commit)
    }

    /// The most recently created closed pull requests, newest first.
    ///
    /// Only the first page is read.
    #[tracing::instrument(skip(self))]
    pub async fn closed_pulls(&self, owner: &str, repo: &str) -> Result<Vec<PullRequest>, Error> {
        let endpoint = format!("{}/pulls", repository(owner, repo)?);
        let pulls: Vec<PullRequest> = self
            .get(&endpoint)
            .query(&PULLS_QUERY)
            .send()
            .await?
            .error_for_status()
            .await?
            .json()
            .await?;
        tracing::debug!("Found {} closed pull requests in {owner}/{repo}", pulls.len());
        Ok(pulls)
    }

    /// Comments on the conversation of issue or pull request `number`.
    #[tracing::instrument(skip(self))]
    pub async fn issue_comments(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<IssueComment>, Error> {
        let endpoint = format!("{}/issues/{number}/comments", repository(owner, repo)?);
        let comments = self
            .get(&endpoint)
            .query(&[("per_page", DEFAULT_PER_PAGE)])
            .send()
            .await?
            .error_for_status()
            .await?
            .json()
            .await?;
        Ok(comments)
    }

    /// Stream the pages of a repository's tags.
    ///
    /// The stream ends after the first failed page.
    pub fn tags(&self, owner: &str, repo: &str) -> BoxStream<'static, Result<Vec<Tag>, Error>> {
        let endpoint = match repository(owner, repo) {
            Ok(endpoint) => format!("{endpoint}/tags"),
            Err(error) => return futures::stream::once(async move { Err(error) }).boxed(),
        };

        let request = self.get(&endpoint).query(&[("per_page", DEFAULT_PER_PAGE)]);
        api_client::pages(request)
            .map(|page| page.map_err(Error::from))
            .boxed()
    }
}

fn path_segment<'a>(what: &'static str, value: &'a str) -> Result<&'a str, Error> {
    let valid = !value.is_empty()
        && value != "."
        && value != ".."
        && value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'));

    if valid {
        Ok(value)
    } else {
        Err(Error::InvalidName {
            what,
            value: value.to_owned(),
        })
    }
}

fn repository(owner: &str, repo: &str) -> Result<String, Error> {
    Ok(format!(
        "repos/{}/{}",
        path_segment("owner", owner)?,
        path_segment("repository", repo)?
    ))
}

#[cfg(test)]
mod tests {
    use api_client::mock::{MockResponse, MockService};
    use futures::TryStreamExt as _;

    use super::*;

    fn commit_json(sha: &str, message: &str) -> serde_json::Value {
        serde_json::json!({
            "sha": sha,
            "html_url": format!("https://github.com/mozilla/kitsune/commit/{sha}"),
            "commit": {
                "author": {"name": "Peter", "email": "peter@example.com", "date": "2024-05-01T10:00:00Z"},
                "committer": {"name": "Peter", "email": "peter@example.com", "date": "2024-05-01T10:00:00Z"},
                "message": message,
            },
            "author": {"login": "peterbe", "avatar_url": "https://avatars.example/1", "html_url": "https://github.com/peterbe", "type": "User"},
            "committer": {"login": "peterbe", "avatar_url": "https://avatars.example/1", "html_url": "https://github.com/peterbe", "type": "User"},
        })
    }

    fn client(mock: &MockService, token: Option<&'static str>) -> GithubClient {
        let config = GithubConfig {
            token: token.map(Into::into),
            ..Default::default()
        };
        GithubClient::with_service(&config, mock.clone()).unwrap()
    }

    #[tokio::test]
    async fn list_commits() {
        let mut mock = MockService::new();
        mock.add(
            "/repos/mozilla/kitsune/commits",
            MockResponse::json(&serde_json::json!([
                commit_json("c3c3c3c3c3c3c3c3c3c3c3c3c3c3c3c3c3c3c3c3", "Third"),
                commit_json("c2c2c2c2c2c2c2c2c2c2c2c2c2c2c2c2c2c2c2c2", "Second"),
            ])),
        );

        let github = client(&mock, Some("ghp_token"));
        assert!(github.is_authenticated());

        let commits = github
            .commits("mozilla", "kitsune", &CommitsQuery::per_page(2))
            .await
            .unwrap();
        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].commit.message, "Third");
        assert_eq!(commits[1].author.as_ref().unwrap().login, "peterbe");

        let requests = mock.requests();
        assert_eq!(requests[0].query(), Some("per_page=2"));
    }

    #[tokio::test]
    async fn missing_repository_is_an_error() {
        let mock = MockService::new();
        let github = client(&mock, None);
        assert!(!github.is_authenticated());

        let error = github
            .commits("mozilla", "nope", &CommitsQuery::default())
            .await
            .unwrap_err();
        assert_eq!(error.status(), Some(http::StatusCode::NOT_FOUND));
    }

    #[tokio::test]
    async fn names_are_checked_before_sending() {
        let mock = MockService::new();
        let github = client(&mock, None);

        let error = github
            .commits("../admin", "kitsune", &CommitsQuery::default())
            .await
            .unwrap_err();
        assert!(matches!(error, Error::InvalidName { what: "owner", .. }));
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn single_commit() {
        let sha = "6377dc6de44e3557bfc1d0b186581d442a77f774";
        let mut mock = MockService::new();
        mock.add(
            &format!("/repos/mozilla/kitsune/commits/{sha}"),
            MockResponse::json(&commit_json(sha, "Only")),
        );

        let commit = client(&mock, None)
            .commit("mozilla", "kitsune", sha)
            .await
            .unwrap();
        assert_eq!(commit.sha, sha);
    }

    #[tokio::test]
    async fn tags_follow_pages() {
        let mut mock = MockService::new();
        mock.add(
            "/repos/mozilla/kitsune/tags",
            MockResponse::json(&serde_json::json!([
                {"name": "v2", "commit": {"sha": "c3c3"}},
            ]))
            .with_header(
                http::header::LINK,
                r#"<https://api.github.com/repositories/7/tags?per_page=100&page=2>; rel="next""#,
            ),
        );
        mock.add(
            "/repositories/7/tags",
            MockResponse::json(&serde_json::json!([
                {"name": "v1", "commit": {"sha": "c1c1"}},
            ])),
        );

        let pages: Vec<Vec<Tag>> = client(&mock, None)
            .tags("mozilla", "kitsune")
            .try_collect()
            .await
            .unwrap();
        let names: Vec<_> = pages.iter().flatten().map(|tag| tag.name.as_str()).collect();
        assert_eq!(names, vec!["v2", "v1"]);
    }

    #[tokio::test]
    async fn closed_pulls_and_comments() {
        let mut mock = MockService::new();
        mock.add(
            "/repos/mozilla/kitsune/pulls",
            MockResponse::json(&serde_json::json!([{
                "number": 5123,
                "html_url": "https://github.com/mozilla/kitsune/pull/5123",
                "merge_commit_sha": "6377dc6de44e3557bfc1d0b186581d442a77f774",
                "user": {"login": "peterbe", "type": "User"},
                "assignees": [],
            }])),
        );
        mock.add(
            "/repos/mozilla/kitsune/issues/5123/comments",
            MockResponse::json(&serde_json::json!([{"user": {"login": "willkg", "type": "User"}}])),
        );

        let github = client(&mock, None);
        let pulls = github.closed_pulls("mozilla", "kitsune").await.unwrap();
        assert_eq!(pulls[0].number, 5123);

        let comments = github
            .issue_comments("mozilla", "kitsune", pulls[0].number)
            .await
            .unwrap();
        assert_eq!(comments[0].user.as_ref().unwrap().login, "willkg");

        let requests = mock.requests();
        assert_eq!(
            requests[0].query(),
            Some("state=closed&sort=created&direction=desc&per_page=100")
        );
        assert_eq!(requests[1].query(), Some("per_page=100"));
    }

    #[tokio::test]
    async fn github_headers_are_sent_once() {
        let mut mock = MockService::new();
        mock.add(
            "/repos/mozilla/kitsune/commits",
            MockResponse::json(&serde_json::json!([])),
        );

        client(&mock, None)
            .commits("mozilla", "kitsune", &CommitsQuery::default())
            .await
            .unwrap();

        let headers = &mock.headers()[0];
        let accept: Vec<_> = headers.get_all(header::ACCEPT).iter().collect();
        assert_eq!(accept, vec![GITHUB_ACCEPT]);
        let version: Vec<_> = headers.get_all(GITHUB_API_VERSION_HEADER).iter().collect();
        assert_eq!(version, vec![GITHUB_API_VERSION]);
    }
}
