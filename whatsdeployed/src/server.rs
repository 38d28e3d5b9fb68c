//! HTTP service.
//!
//! | Method | Path                 | Purpose                                        |
//! |--------|----------------------|------------------------------------------------|
//! | POST   | `/shas`              | Resolve deployed SHAs and load tags            |
//! | POST   | `/culprits`          | People with changes waiting per environment    |
//! | POST   | `/shortenit`         | Create or reuse a short link for a long URL    |
//! | GET    | `/shortened`         | Look up several short links at once            |
//! | GET    | `/lengthenit/{code}` | Expand one short link                          |
//! | GET    | `/s-{code}`          | Redirect to the long URL                       |
//! | GET    | `/githubapi/commits` | Proxy Github's commit list with our token      |
//! | GET    | `/deployed`          | The complete view for a long URL query         |
//! | GET    | `/health`            | Liveness                                       |

use api_client::ApiClient;
use axum::extract::{Path, Query, RawQuery, State};
use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use octocat::{CommitsQuery, GithubClient};
use serde::{Deserialize, Serialize};
use serde_json::json;
use storage::Storage;

use crate::badge::Badge;
use crate::config::Config;
use crate::culprits::CulpritGroup;
use crate::deploy::{DeployReport, DeployRequest, Deployer};
use crate::environment::{Deployment, Environment, Repository};
use crate::error::Error;
use crate::resolve::Tags;
use crate::scope::Scope;
use crate::sha::Sha;
use crate::shortlink::{LongUrl, ShortLink, ShortLinks, SHORT_PREFIX};
use crate::source::{GithubSource, HttpRevisionFetcher};

/// Errors returned to HTTP clients as `{"error": "..."}`.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The request is missing something or is malformed.
    #[error("{0}")]
    BadRequest(String),

    /// Nothing by that name.
    #[error("{0}")]
    NotFound(String),

    /// Github refused or failed the request.
    #[error(transparent)]
    Github(#[from] octocat::Error),

    /// Building the view or managing short links failed.
    #[error(transparent)]
    App(#[from] Error),
}

fn upstream_status(status: Option<StatusCode>) -> StatusCode {
    match status {
        Some(status) if status.is_client_error() || status.is_server_error() => status,
        _ => StatusCode::BAD_GATEWAY,
    }
}

impl ServerError {
    /// The HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::Github(error) => upstream_status(error.status()),
            ServerError::App(error) => match error {
                Error::Source(error) => upstream_status(error.status()),
                Error::Reconcile(_) | Error::LongUrl(_) => StatusCode::BAD_REQUEST,
                Error::Cancelled(_) | Error::CodesExhausted(_) => StatusCode::SERVICE_UNAVAILABLE,
                Error::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

type ServerResult<T> = Result<T, ServerError>;

/// Shared state behind every handler.
#[derive(Debug, Clone)]
pub struct App {
    deployer: Deployer,
    github: GithubClient,
    links: ShortLinks,
    per_page: u32,
    public_url: Option<String>,
}

impl App {
    /// A service reading Github through `github`, revisions through
    /// `revisions`, and keeping short links in `storage`.
    pub fn new(github: GithubClient, revisions: HttpRevisionFetcher, storage: &Storage) -> Self {
        Self {
            deployer: Deployer::github(GithubSource::new(github.clone()), revisions),
            github,
            links: ShortLinks::new(storage),
            per_page: crate::deploy::DEFAULT_PER_PAGE,
            public_url: None,
        }
    }

    /// Build the service from configuration, talking to the network.
    pub fn from_config(config: &Config) -> Result<Self, octocat::Error> {
        let github = GithubClient::new(&config.github)?;
        let revisions = HttpRevisionFetcher::new(
            ApiClient::new(Uri::from_static("http://localhost/"), ()).with_timeout(config.github.timeout()),
        );
        let storage = config.storage.build();
        tracing::info!(storage = storage.name(), "short links storage");

        let mut app = Self::new(github, revisions, &storage).with_per_page(config.per_page);
        if let Some(url) = &config.server.public_url {
            app = app.with_public_url(url);
        }
        Ok(app)
    }

    /// Commits compared per view.
    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page;
        self
    }

    /// The absolute site URL, used as the badge link target.
    pub fn with_public_url(mut self, url: impl Into<String>) -> Self {
        self.public_url = Some(url.into().trim_end_matches('/').to_owned());
        self
    }

    /// The routes, ready to serve.
    pub fn router(self) -> Router {
        Router::new()
            .route("/health", get(health))
            .route("/shas", post(shas))
            .route("/culprits", post(culprits))
            .route("/shortenit", post(shortenit))
            .route("/shortened", get(shortened))
            .route("/lengthenit/{code}", get(lengthenit))
            .route("/githubapi/commits", get(github_commits))
            .route("/deployed", get(deployed))
            .route("/{link}", get(short_redirect))
            .with_state(self)
    }
}

fn repository(owner: &str, repo: &str) -> ServerResult<Repository> {
    if owner.trim().is_empty() {
        return Err(ServerError::BadRequest("No 'owner'".into()));
    }
    if repo.trim().is_empty() {
        return Err(ServerError::BadRequest("No 'repo'".into()));
    }
    Ok(Repository::new(owner.trim(), repo.trim()))
}

async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::OK, Json(json!({})))
}

#[derive(Debug, Deserialize)]
struct ShasRequest {
    #[serde(default)]
    owner: String,
    #[serde(default)]
    repo: String,
    #[serde(default)]
    deployments: Vec<Deployment>,
}

#[derive(Debug, Serialize)]
struct DeploymentInfo {
    name: String,
    url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<Sha>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl From<Environment> for DeploymentInfo {
    fn from(env: Environment) -> Self {
        Self {
            sha: env.sha().cloned(),
            error: env.error().map(str::to_owned),
            name: env.name,
            url: env.url,
        }
    }
}

#[derive(Debug, Serialize)]
struct ShasResponse {
    deployments: Vec<DeploymentInfo>,
    tags: Tags,
}

async fn shas(State(app): State<App>, Json(body): Json<ShasRequest>) -> ServerResult<Json<ShasResponse>> {
    let repository = repository(&body.owner, &body.repo)?;
    let (environments, tags) = app.deployer.shas(&repository, &body.deployments).await;

    Ok(Json(ShasResponse {
        deployments: environments.into_iter().map(DeploymentInfo::from).collect(),
        tags,
    }))
}

#[derive(Debug, Deserialize)]
struct CulpritDeployment {
    name: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    sha: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl From<CulpritDeployment> for Environment {
    fn from(deployment: CulpritDeployment) -> Self {
        match deployment.sha.filter(|sha| !sha.trim().is_empty()) {
            Some(sha) => Environment::pinned(deployment.name, sha).with_url(deployment.url),
            None => Environment::unresolved(
                deployment.name,
                deployment.url,
                deployment.error.unwrap_or_else(|| "no SHA".to_owned()),
            ),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CulpritsRequest {
    #[serde(default)]
    owner: String,
    #[serde(default)]
    repo: String,
    #[serde(default)]
    deployments: Vec<CulpritDeployment>,
}

#[derive(Debug, Serialize)]
struct CulpritsResponse {
    culprits: Vec<CulpritGroup>,
}

async fn culprits(
    State(app): State<App>,
    Json(body): Json<CulpritsRequest>,
) -> ServerResult<Json<CulpritsResponse>> {
    let repository = repository(&body.owner, &body.repo)?;
    let environments: Vec<Environment> = body.deployments.into_iter().map(Environment::from).collect();

    let culprits = app
        .deployer
        .culprits_for(&repository, &environments, app.per_page)
        .await?;
    Ok(Json(CulpritsResponse { culprits }))
}

#[derive(Debug, Deserialize)]
struct ShortenRequest {
    url: String,
}

#[derive(Debug, Serialize)]
struct ShortenResponse {
    url: String,
    badge: Badge,
    markdown: String,
    restructured_text: String,
}

async fn shortenit(
    State(app): State<App>,
    Json(body): Json<ShortenRequest>,
) -> ServerResult<Json<ShortenResponse>> {
    let target = LongUrl::parse(&body.url)?;
    let link = app.links.shorten(&target).await?;
    let path = link.path();

    let full = format!("{}{path}", app.public_url.as_deref().unwrap_or_default());
    let badge = Badge::new(target.deployments.iter().map(|d| d.name.as_str()), full);

    Ok(Json(ShortenResponse {
        url: path,
        markdown: badge.markdown(),
        restructured_text: badge.restructured_text(),
        badge,
    }))
}

#[derive(Debug, Deserialize)]
struct ShortenedQuery {
    #[serde(default)]
    urls: String,
}

#[derive(Debug, Serialize)]
struct ShortenedEnvironment {
    owner: String,
    repo: String,
    revisions: Vec<(String, String)>,
    url: String,
}

impl From<ShortLink> for ShortenedEnvironment {
    fn from(link: ShortLink) -> Self {
        let url = link.long_url();
        let LongUrl {
            repository,
            deployments,
        } = link.target;
        Self {
            owner: repository.owner,
            repo: repository.repo,
            revisions: deployments.into_iter().map(|d| (d.name, d.url)).collect(),
            url,
        }
    }
}

async fn shortened(
    State(app): State<App>,
    Query(query): Query<ShortenedQuery>,
) -> ServerResult<Json<serde_json::Value>> {
    if query.urls.trim().is_empty() {
        return Err(ServerError::BadRequest("No 'urls'".into()));
    }

    let environments: Vec<ShortenedEnvironment> = app
        .links
        .shortened(&query.urls)
        .await?
        .into_iter()
        .map(ShortenedEnvironment::from)
        .collect();
    Ok(Json(json!({ "environments": environments })))
}

async fn lengthenit(State(app): State<App>, Path(code): Path<String>) -> ServerResult<Json<LongUrl>> {
    match app.links.lengthen(&code).await? {
        Some(link) => Ok(Json(link.target)),
        None => Err(ServerError::NotFound(format!("no short link {code:?}"))),
    }
}

async fn short_redirect(State(app): State<App>, Path(link): Path<String>) -> ServerResult<Response> {
    let not_found = || ServerError::NotFound(format!("no short link {link:?}"));

    let Some(code) = link.strip_prefix(&SHORT_PREFIX[1..]) else {
        return Err(not_found());
    };
    match app.links.lengthen(code).await? {
        Some(link) => Ok((StatusCode::FOUND, [(header::LOCATION, link.long_url())]).into_response()),
        None => Err(not_found()),
    }
}

#[derive(Debug, Deserialize)]
struct CommitsParams {
    #[serde(default)]
    owner: String,
    #[serde(default)]
    repo: String,
    per_page: Option<u32>,
    sha: Option<String>,
}

async fn github_commits(
    State(app): State<App>,
    Query(params): Query<CommitsParams>,
) -> ServerResult<Json<serde_json::Value>> {
    let repository = repository(&params.owner, &params.repo)?;
    let query = CommitsQuery {
        per_page: params.per_page.unwrap_or(app.per_page),
        sha: params.sha,
    };

    let commits = app
        .github
        .commits_json(&repository.owner, &repository.repo, &query)
        .await?;
    Ok(Json(commits))
}

#[derive(Debug, Default, Deserialize)]
struct DeployedOptions {
    per_page: Option<u32>,
    #[serde(default)]
    bors: bool,
}

async fn deployed(
    State(app): State<App>,
    RawQuery(raw): RawQuery,
    Query(options): Query<DeployedOptions>,
) -> ServerResult<Json<DeployReport>> {
    let target = LongUrl::from_query(raw.as_deref().unwrap_or_default())?;

    let mut request = DeployRequest::new(target.repository, target.deployments);
    request.per_page = options.per_page.unwrap_or(app.per_page);
    request.bors_mode = options.bors;

    let scope = Scope::new();
    let report = app.deployer.load(&scope, &request).await?;
    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_statuses() {
        assert_eq!(
            ServerError::BadRequest("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServerError::App(Error::LongUrl("missing owner".into())).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(upstream_status(Some(StatusCode::NOT_FOUND)), StatusCode::NOT_FOUND);
        assert_eq!(upstream_status(Some(StatusCode::OK)), StatusCode::BAD_GATEWAY);
        assert_eq!(upstream_status(None), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn culprit_deployments_without_sha_are_unresolved() {
        let env = Environment::from(CulpritDeployment {
            name: "prod".into(),
            url: "https://prod.example.com/".into(),
            sha: None,
            error: Some("HTTP 500".into()),
        });
        assert_eq!(env.error(), Some("HTTP 500"));

        let env = Environment::from(CulpritDeployment {
            name: "dev".into(),
            url: String::new(),
            sha: Some("ABCDEF1".into()),
            error: None,
        });
        assert_eq!(env.sha().map(Sha::as_str), Some("abcdef1"));
    }
}
