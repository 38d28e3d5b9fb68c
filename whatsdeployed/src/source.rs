//! Where commits, tags and deployed revisions come from.

use std::fmt;

use api_client::ApiClient;
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt as _};
use http::{Method, StatusCode, Uri};
use octocat::{CommitsQuery, GithubClient};
use thiserror::Error;

use crate::commit::Commit;
use crate::environment::Repository;
use crate::person::Person;
use crate::pulls::PullRequest;

/// Errors from a commit, tag or revision source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The Github API request failed.
    #[error(transparent)]
    Github(#[from] octocat::Error),

    /// The revision request failed before a response arrived.
    #[error(transparent)]
    Http(#[from] api_client::Error),

    /// The revision endpoint answered with something other than 200.
    #[error("HTTP {status} from {uri}")]
    Status {
        /// Requested URI.
        uri: Uri,

        /// Response status.
        status: StatusCode,
    },
}

impl SourceError {
    /// The upstream HTTP status, when there was a response.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            SourceError::Github(error) => error.status(),
            SourceError::Http(error) => error.status(),
            SourceError::Status { status, .. } => Some(*status),
        }
    }
}

/// Recent history of a repository's default branch.
#[async_trait]
pub trait CommitSource: fmt::Debug + Send + Sync {
    /// Up to `per_page` commits, newest first.
    async fn commits(&self, repository: &Repository, per_page: u32)
        -> Result<Vec<Commit>, SourceError>;
}

/// The tags of a repository, one page at a time.
pub trait TagSource: fmt::Debug + Send + Sync {
    /// Pages of `(tag name, commit sha)` pairs.
    fn tags(&self, repository: &Repository)
        -> BoxStream<'static, Result<Vec<(String, String)>, SourceError>>;
}

/// Closed pull requests and the people commenting on them.
#[async_trait]
pub trait PullSource: fmt::Debug + Send + Sync {
    /// Recently closed pull requests, newest first.
    async fn closed_pulls(&self, repository: &Repository) -> Result<Vec<PullRequest>, SourceError>;

    /// Comment authors on pull request `number`, in comment order.
    async fn commenters(&self, repository: &Repository, number: u64)
        -> Result<Vec<Person>, SourceError>;
}

/// Reads the body served at an environment's revision URL.
#[async_trait]
pub trait RevisionFetcher: fmt::Debug + Send + Sync {
    /// The response body for a `200 OK`, and an error otherwise.
    async fn fetch(&self, uri: &Uri) -> Result<String, SourceError>;
}

/// Commits and tags from the Github API.
#[derive(Debug, Clone)]
pub struct GithubSource {
    client: GithubClient,
}

impl GithubSource {
    /// Read from Github with `client`.
    pub fn new(client: GithubClient) -> Self {
        Self { client }
    }

    /// The underlying client.
    pub fn client(&self) -> &GithubClient {
        &self.client
    }
}

#[async_trait]
impl CommitSource for GithubSource {
    async fn commits(
        &self,
        repository: &Repository,
        per_page: u32,
    ) -> Result<Vec<Commit>, SourceError> {
        let commits = self
            .client
            .commits(
                &repository.owner,
                &repository.repo,
                &CommitsQuery::per_page(per_page),
            )
            .await?;
        Ok(commits.into_iter().map(Commit::from).collect())
    }
}

impl TagSource for GithubSource {
    fn tags(
        &self,
        repository: &Repository,
    ) -> BoxStream<'static, Result<Vec<(String, String)>, SourceError>> {
        self.client
            .tags(&repository.owner, &repository.repo)
            .map(|page| {
                page.map(|tags| {
                    tags.into_iter()
                        .map(|tag| (tag.name, tag.commit.sha))
                        .collect()
                })
                .map_err(SourceError::from)
            })
            .boxed()
    }
}

#[async_trait]
impl PullSource for GithubSource {
    async fn closed_pulls(&self, repository: &Repository) -> Result<Vec<PullRequest>, SourceError> {
        let pulls = self
            .client
            .closed_pulls(&repository.owner, &repository.repo)
            .await?;
        Ok(pulls.into_iter().map(PullRequest::from).collect())
    }

    async fn commenters(
        &self,
        repository: &Repository,
        number: u64,
    ) -> Result<Vec<Person>, SourceError> {
        let comments = self
            .client
            .issue_comments(&repository.owner, &repository.repo, number)
            .await?;
        Ok(comments
            .into_iter()
            .filter_map(|comment| comment.user.map(Person::from))
            .collect())
    }
}

/// Fetches revision URLs with a plain, unauthenticated HTTP client.
#[derive(Debug, Clone)]
pub struct HttpRevisionFetcher {
    client: ApiClient<()>,
}

impl HttpRevisionFetcher {
    /// Send revision requests through `client`.
    ///
    /// Revision URLs are absolute, so the client's base is never used.
    pub fn new(client: ApiClient<()>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RevisionFetcher for HttpRevisionFetcher {
    #[tracing::instrument(skip_all, fields(%uri))]
    async fn fetch(&self, uri: &Uri) -> Result<String, SourceError> {
        let response = self.client.request(Method::GET, uri.clone()).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(SourceError::Status {
                uri: uri.clone(),
                status,
            });
        }

        Ok(response.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use api_client::mock::{MockResponse, MockService};
    use futures::TryStreamExt as _;
    use octocat::GithubConfig;

    use super::*;

    fn github(mock: &MockService) -> GithubSource {
        let config = GithubConfig::default();
        GithubSource::new(GithubClient::with_service(&config, mock.clone()).unwrap())
    }

    #[tokio::test]
    async fn commits_from_github() {
        let mut mock = MockService::new();
        mock.add(
            "/repos/mozilla/kitsune/commits",
            MockResponse::json(&serde_json::json!([{
                "sha": "C3C3C3C3C3C3C3C3C3C3C3C3C3C3C3C3C3C3C3C3",
                "commit": {"message": "Third\n\nbody"},
                "author": {"login": "alice", "type": "User"},
                "committer": null
            }])),
        );

        let source = github(&mock);
        let commits = source
            .commits(&Repository::new("mozilla", "kitsune"), 25)
            .await
            .unwrap();

        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].sha.as_str(), "c3c3c3c3c3c3c3c3c3c3c3c3c3c3c3c3c3c3c3c3");
        assert_eq!(commits[0].title(), "Third");
        assert_eq!(commits[0].author.as_ref().unwrap().login, "alice");
        assert_eq!(mock.requests()[0].query(), Some("per_page=25"));
    }

    #[tokio::test]
    async fn tags_from_github() {
        let mut mock = MockService::new();
        mock.add(
            "/repos/o/r/tags",
            MockResponse::json(&serde_json::json!([
                {"name": "v2", "commit": {"sha": "bbb"}},
                {"name": "v1", "commit": {"sha": "aaa"}}
            ])),
        );

        let pages: Vec<_> = github(&mock)
            .tags(&Repository::new("o", "r"))
            .try_collect()
            .await
            .unwrap();
        assert_eq!(
            pages,
            vec![vec![
                ("v2".to_owned(), "bbb".to_owned()),
                ("v1".to_owned(), "aaa".to_owned())
            ]]
        );
    }

    #[tokio::test]
    async fn pulls_and_commenters_from_github() {
        let mut mock = MockService::new();
        mock.add(
            "/repos/mozilla/kitsune/pulls",
            MockResponse::json(&serde_json::json!([{
                "number": 5123,
                "html_url": "https://github.com/mozilla/kitsune/pull/5123",
                "merge_commit_sha": "6377DC6DE44E3557BFC1D0B186581D442A77F774",
                "user": {"login": "peterbe", "type": "User"},
                "assignees": [{"login": "willkg", "type": "User"}]
            }])),
        );
        mock.add(
            "/repos/mozilla/kitsune/issues/5123/comments",
            MockResponse::json(&serde_json::json!([
                {"user": {"login": "escattone", "type": "User"}},
                {"user": null},
                {"user": {"login": "dependabot[bot]", "type": "Bot"}}
            ])),
        );

        let source = github(&mock);
        let repository = Repository::new("mozilla", "kitsune");
        let pulls = source.closed_pulls(&repository).await.unwrap();
        assert_eq!(pulls.len(), 1);
        assert_eq!(
            pulls[0].merge_commit_sha.as_ref().map(|sha| sha.as_str()),
            Some("6377dc6de44e3557bfc1d0b186581d442a77f774")
        );
        assert_eq!(pulls[0].author.as_ref().unwrap().login, "peterbe");
        assert_eq!(pulls[0].assignees[0].login, "willkg");

        let commenters = source.commenters(&repository, 5123).await.unwrap();
        let logins: Vec<_> = commenters.iter().map(|p| p.login.as_str()).collect();
        assert_eq!(logins, vec!["escattone", "dependabot[bot]"]);
        assert!(commenters[1].is_bot());
    }

    #[tokio::test]
    async fn revision_bodies_and_statuses() {
        let mut mock = MockService::new();
        mock.add("/__version__", MockResponse::text("6377dc6\n"));
        let fetcher = HttpRevisionFetcher::new(ApiClient::new_with_inner_service(
            Uri::from_static("http://localhost/"),
            (),
            mock,
        ));

        let body = fetcher
            .fetch(&Uri::from_static("https://prod.example.com/__version__"))
            .await
            .unwrap();
        assert_eq!(body, "6377dc6\n");

        let error = fetcher
            .fetch(&Uri::from_static("https://prod.example.com/missing"))
            .await
            .unwrap_err();
        assert_eq!(error.status(), Some(StatusCode::NOT_FOUND));
        assert!(matches!(error, SourceError::Status { .. }));
    }
}
