//! Turn revision URLs into deployed SHAs, and tag names into a lookup table.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use api_client::uri::{parse_http_uri, UriExtension as _};
use futures::StreamExt as _;
use serde::Serialize;

use crate::environment::{Deployment, Environment, Repository};
use crate::sha::{Sha, SHORT_LEN};
use crate::source::{RevisionFetcher, TagSource};

/// Query parameter that defeats caches between the server and the revision URL.
const CACHE_SCRAMBLE: &str = "cachescramble";

const MAX_SHA_LEN: usize = 40;

/// Pull a SHA out of a revision URL's response body.
///
/// Dockerflow `version.json` documents carry it in their `commit` field. Any
/// other body, JSON objects without a `commit` included, is taken as the SHA
/// itself if it has a plausible length.
pub fn extract_sha(content: &str) -> Option<Sha> {
    let content = content.trim();

    if content.starts_with('{') && content.ends_with('}') {
        if let Ok(serde_json::Value::Object(document)) = serde_json::from_str(content) {
            if let Some(commit) = document.get("commit") {
                return commit
                    .as_str()
                    .map(str::trim)
                    .filter(|commit| !commit.is_empty())
                    .map(Sha::new);
            }
        }
    }

    (SHORT_LEN..=MAX_SHA_LEN)
        .contains(&content.chars().count())
        .then(|| Sha::new(content))
}

/// Tag names keyed by the SHA they point at.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Tags(BTreeMap<Sha, String>);

impl Tags {
    /// No tags.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a tag. A later tag for the same SHA replaces the earlier one.
    pub fn insert(&mut self, sha: Sha, name: String) {
        if let Some(previous) = self.0.insert(sha, name) {
            tracing::trace!(%previous, "replaced tag");
        }
    }

    /// The tag on a commit, matching abbreviated SHAs the same way commits do.
    pub fn get(&self, sha: &Sha) -> Option<&str> {
        if let Some(name) = self.0.get(sha) {
            return Some(name);
        }
        self.0
            .iter()
            .find(|(tagged, _)| tagged.matches(sha))
            .map(|(_, name)| name.as_str())
    }

    /// Number of tagged commits.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no commit is tagged.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `(sha, tag)` pairs in SHA order.
    pub fn iter(&self) -> impl Iterator<Item = (&Sha, &str)> {
        self.0.iter().map(|(sha, name)| (sha, name.as_str()))
    }
}

impl FromIterator<(Sha, String)> for Tags {
    fn from_iter<T: IntoIterator<Item = (Sha, String)>>(iter: T) -> Self {
        let mut tags = Tags::new();
        for (sha, name) in iter {
            tags.insert(sha, name);
        }
        tags
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}

async fn resolve_one(fetcher: &dyn RevisionFetcher, deployment: &Deployment, scramble: &str) -> Environment {
    let unresolved =
        |reason: String| Environment::unresolved(&deployment.name, &deployment.url, reason);

    let uri = match parse_http_uri(&deployment.url) {
        Ok(uri) => uri.replace_query(CACHE_SCRAMBLE, scramble),
        Err(error) => {
            tracing::warn!(name = %deployment.name, url = %deployment.url, %error, "invalid revision URL");
            return unresolved(format!("invalid URL: {error}"));
        }
    };

    let body = match fetcher.fetch(&uri).await {
        Ok(body) => body,
        Err(error) => {
            tracing::warn!(name = %deployment.name, url = %deployment.url, %error, "unable to fetch revision");
            return unresolved(error.to_string());
        }
    };

    match extract_sha(&body) {
        Some(sha) => {
            tracing::debug!(name = %deployment.name, %sha, "resolved revision");
            Environment::pinned(&deployment.name, sha).with_url(&deployment.url)
        }
        None => {
            tracing::warn!(name = %deployment.name, url = %deployment.url, "no SHA in revision body");
            unresolved("response did not contain a SHA".to_owned())
        }
    }
}

/// Fetch every deployment's revision concurrently.
///
/// Deployments without a URL are skipped. A deployment whose revision can't be
/// read becomes an unresolved environment; the others still resolve.
#[tracing::instrument(skip_all, fields(deployments = deployments.len()))]
pub async fn resolve_environments(
    fetcher: &dyn RevisionFetcher,
    deployments: &[Deployment],
) -> Vec<Environment> {
    let scramble = unix_now().to_string();
    let pending = deployments
        .iter()
        .filter(|deployment| !deployment.url.trim().is_empty())
        .map(|deployment| resolve_one(fetcher, deployment, &scramble));

    futures::future::join_all(pending).await
}

/// Collect every tag on a repository.
///
/// A failed page ends the walk; the tags collected so far are returned.
#[tracing::instrument(skip_all, fields(%repository))]
pub async fn load_tags(source: &dyn TagSource, repository: &Repository) -> Tags {
    let mut tags = Tags::new();
    let mut pages = source.tags(repository);

    while let Some(page) = pages.next().await {
        match page {
            Ok(page) => {
                for (name, sha) in page {
                    tags.insert(Sha::new(sha), name);
                }
            }
            Err(error) => {
                tracing::warn!(%error, "unable to load tags, using {} found so far", tags.len());
                break;
            }
        }
    }

    tags
}
