//! Short links for saved views.
//!
//! A view is a repository plus an ordered list of named revision URLs, and is
//! written out as a long URL like
//! `/?owner=mozilla&repo=kitsune&name[]=prod&url[]=https://...`. Short links
//! map a three character code to the same content, served from `/s-{code}`.

use camino::{Utf8Path, Utf8PathBuf};
use rand::distributions::Alphanumeric;
use rand::Rng as _;
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use storage::{Storage, StorageBucket};
use url::form_urlencoded;
use url::Url;

use crate::environment::{Deployment, Repository};
use crate::error::Error;

/// Length of generated codes.
pub const CODE_LEN: usize = 3;

/// Prefix of short paths, before the code.
pub const SHORT_PREFIX: &str = "/s-";

const BUCKET: &str = "shortlinks";
const MAX_ATTEMPTS: usize = 64;

/// A repository and its named revision URLs, as carried by a long URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LongUrl {
    /// The repository.
    #[serde(flatten)]
    pub repository: Repository,

    /// Environments, in column order.
    pub deployments: Vec<Deployment>,
}

impl LongUrl {
    /// A view of `repository` with `deployments`.
    pub fn new(repository: Repository, deployments: Vec<Deployment>) -> Self {
        Self {
            repository,
            deployments,
        }
    }

    /// Parse a long URL. Absolute URLs, paths with a query and bare query
    /// strings are all accepted.
    pub fn parse(input: &str) -> Result<Self, Error> {
        let input = input.trim();
        let base = Url::parse("http://localhost/").map_err(|e| Error::LongUrl(e.to_string()))?;
        let url = if input.starts_with('/') || input.contains("://") {
            base.join(input)
        } else {
            base.join(&format!("/?{}", input.trim_start_matches('?')))
        }
        .map_err(|error| Error::LongUrl(error.to_string()))?;

        Self::from_query(url.query().unwrap_or_default())
    }

    /// Read `owner`, `repo` and the paired `name[]`/`url[]` parameters.
    pub fn from_query(query: &str) -> Result<Self, Error> {
        let mut owner = None;
        let mut repo = None;
        let mut names = Vec::new();
        let mut urls = Vec::new();

        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            match &*key {
                "owner" => owner = Some(value.into_owned()),
                "repo" => repo = Some(value.into_owned()),
                "name[]" => names.push(value.into_owned()),
                "url[]" => urls.push(value.into_owned()),
                _ => {}
            }
        }

        let owner = owner
            .filter(|owner| !owner.is_empty())
            .ok_or_else(|| Error::LongUrl("missing owner".into()))?;
        let repo = repo
            .filter(|repo| !repo.is_empty())
            .ok_or_else(|| Error::LongUrl("missing repo".into()))?;
        if names.len() != urls.len() {
            return Err(Error::LongUrl(format!(
                "{} names but {} urls",
                names.len(),
                urls.len()
            )));
        }

        let deployments = names
            .into_iter()
            .zip(urls)
            .map(|(name, url)| Deployment::new(name, url))
            .collect();

        Ok(Self::new(Repository::new(owner, repo), deployments))
    }

    /// The query string, without the leading `?`.
    pub fn query(&self) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        query
            .append_pair("owner", &self.repository.owner)
            .append_pair("repo", &self.repository.repo);
        for deployment in &self.deployments {
            query
                .append_pair("name[]", &deployment.name)
                .append_pair("url[]", &deployment.url);
        }
        query.finish()
    }

    /// The site-relative long URL, `/?owner=...`.
    pub fn path(&self) -> String {
        format!("/?{}", self.query())
    }

    fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.query().as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// A stored short link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortLink {
    /// The code after `/s-`.
    pub code: String,

    /// What the link expands to.
    #[serde(flatten)]
    pub target: LongUrl,
}

impl ShortLink {
    /// The short path, `/s-{code}`.
    pub fn path(&self) -> String {
        format!("{SHORT_PREFIX}{}", self.code)
    }

    /// The site-relative long URL.
    pub fn long_url(&self) -> String {
        self.target.path()
    }
}

/// Strip `/s-` or `s-` from a short path or code.
pub fn parse_code(input: &str) -> &str {
    let input = input.trim();
    input
        .strip_prefix(SHORT_PREFIX)
        .or_else(|| input.strip_prefix("s-"))
        .unwrap_or(input)
}

fn valid_code(code: &str) -> bool {
    !code.is_empty() && code.len() <= 32 && code.bytes().all(|b| b.is_ascii_alphanumeric())
}

fn random_code() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(CODE_LEN)
        .map(char::from)
        .collect()
}

fn link_key(code: &str) -> Utf8PathBuf {
    Utf8Path::new("links").join(format!("{code}.json"))
}

fn content_key(digest: &str) -> Utf8PathBuf {
    Utf8Path::new("content").join(format!("{digest}.json"))
}

/// Short links kept in a storage bucket.
#[derive(Debug, Clone)]
pub struct ShortLinks {
    bucket: StorageBucket,
}

impl ShortLinks {
    /// Short links in the `shortlinks` bucket of `storage`.
    pub fn new(storage: &Storage) -> Self {
        Self {
            bucket: storage.bucket(BUCKET),
        }
    }

    /// The short link for `target`, reusing the existing code when the same
    /// content was shortened before.
    #[tracing::instrument(skip_all, fields(repository = %target.repository))]
    pub async fn shorten(&self, target: &LongUrl) -> Result<ShortLink, Error> {
        let digest = target.digest();
        let index = content_key(&digest);

        if let Some(code) = self.bucket.get_json::<String>(&index).await? {
            if let Some(link) = self.lengthen(&code).await? {
                tracing::debug!(%code, "reusing short link");
                return Ok(link);
            }
        }

        for _ in 0..MAX_ATTEMPTS {
            let link = ShortLink {
                code: random_code(),
                target: target.clone(),
            };
            if self.bucket.create_json(&link_key(&link.code), &link).await? {
                self.bucket.put_json(&index, &link.code).await?;
                tracing::debug!(code = %link.code, "created short link");
                return Ok(link);
            }
            tracing::trace!(code = %link.code, "short link code taken");
        }

        Err(Error::CodesExhausted(MAX_ATTEMPTS))
    }

    /// Look up a code, with or without its `s-` prefix.
    pub async fn lengthen(&self, code: &str) -> Result<Option<ShortLink>, Error> {
        let code = parse_code(code);
        if !valid_code(code) {
            return Ok(None);
        }
        Ok(self.bucket.get_json(&link_key(code)).await?)
    }

    /// Look up a comma separated list of short paths.
    ///
    /// Entries that are not `/s-` paths, and unknown codes, are skipped.
    pub async fn shortened(&self, urls: &str) -> Result<Vec<ShortLink>, Error> {
        let mut links = Vec::new();
        for path in urls.split(',').map(str::trim) {
            if !path.starts_with(SHORT_PREFIX) {
                continue;
            }
            if let Some(link) = self.lengthen(path).await? {
                links.push(link);
            }
        }
        Ok(links)
    }
}
