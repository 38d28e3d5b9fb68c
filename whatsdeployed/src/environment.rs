//! Repositories and the deployment environments tracked against them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::sha::Sha;

/// A Github repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Repository {
    /// Owning user or organization.
    pub owner: String,

    /// Repository name.
    pub repo: String,
}

impl Repository {
    /// A repository by owner and name.
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    /// The repository page on github.com.
    pub fn html_url(&self) -> String {
        format!("https://github.com/{}/{}", self.owner, self.repo)
    }

    /// The page for one commit.
    pub fn commit_url(&self, sha: &Sha) -> String {
        format!("{}/commit/{sha}", self.html_url())
    }

    /// The page comparing two commits.
    pub fn compare_url(&self, base: &Sha, head: &Sha) -> String {
        format!("{}/compare/{base}...{head}", self.html_url())
    }
}

impl fmt::Display for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// An environment name and the URL that reports its deployed revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    /// Display name, unique within a request.
    pub name: String,

    /// URL whose body is a SHA or a Dockerflow `version.json`.
    #[serde(default)]
    pub url: String,
}

impl Deployment {
    /// A named revision URL.
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// What is known about the revision deployed to an environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Revision {
    /// The environment reported this SHA.
    Pinned(Sha),

    /// The revision could not be determined.
    Unresolved {
        /// Why resolution failed, for display.
        reason: String,
    },
}

/// A deployment environment after its revision has been resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    /// Display name.
    pub name: String,

    /// Where the revision was read from.
    pub url: String,

    /// The deployed revision.
    pub revision: Revision,
}

impl Environment {
    /// An environment pinned to `sha`.
    pub fn pinned(name: impl Into<String>, sha: impl Into<Sha>) -> Self {
        Self {
            name: name.into(),
            url: String::new(),
            revision: Revision::Pinned(sha.into()),
        }
    }

    /// An environment whose revision could not be read.
    pub fn unresolved(name: impl Into<String>, url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            revision: Revision::Unresolved {
                reason: reason.into(),
            },
        }
    }

    /// Set the source URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// The pinned SHA, if resolved.
    pub fn sha(&self) -> Option<&Sha> {
        match &self.revision {
            Revision::Pinned(sha) => Some(sha),
            Revision::Unresolved { .. } => None,
        }
    }

    /// The resolution failure, if any.
    pub fn error(&self) -> Option<&str> {
        match &self.revision {
            Revision::Pinned(_) => None,
            Revision::Unresolved { reason } => Some(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn github_urls() {
        let repo = Repository::new("mozilla", "kitsune");
        assert_eq!(repo.html_url(), "https://github.com/mozilla/kitsune");
        assert_eq!(
            repo.compare_url(&Sha::new("aaaaaaa"), &Sha::new("bbbbbbb")),
            "https://github.com/mozilla/kitsune/compare/aaaaaaa...bbbbbbb"
        );
    }

    #[test]
    fn revision_accessors() {
        let env = Environment::pinned("prod", "c1c1c1c");
        assert_eq!(env.sha().map(Sha::as_str), Some("c1c1c1c"));
        assert_eq!(env.error(), None);

        let env = Environment::unresolved("dev", "https://dev.example.com/__version__", "HTTP 500");
        assert!(env.sha().is_none());
        assert_eq!(env.error(), Some("HTTP 500"));
    }
}
