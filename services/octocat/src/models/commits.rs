//! Commit and tag data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::User;

/// A commit, as returned by the list and get commit endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commit {
    /// The SHA of the commit.
    pub sha: String,

    /// Link to the commit on github.com.
    #[serde(default)]
    pub html_url: String,

    /// The git-level commit details.
    pub commit: CommitDetails,

    /// The Github account linked to the author email, if any.
    #[serde(default)]
    pub author: Option<User>,

    /// The Github account linked to the committer email, if any.
    #[serde(default)]
    pub committer: Option<User>,
}

impl Commit {
    /// The date the commit was made, preferring the committer date.
    pub fn date(&self) -> Option<DateTime<Utc>> {
        self.commit
            .committer
            .as_ref()
            .or(self.commit.author.as_ref())
            .map(|signature| signature.date)
    }
}

/// The author, committer and message for a commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitDetails {
    /// The author of the commit.
    #[serde(default)]
    pub author: Option<GitSignature>,

    /// The committer of the commit.
    #[serde(default)]
    pub committer: Option<GitSignature>,

    /// The commit message.
    pub message: String,
}

/// The name, email and date recorded by git.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitSignature {
    /// Author name
    pub name: String,
    /// Author email
    pub email: String,
    /// The date of the commit.
    pub date: DateTime<Utc>,
}

/// A repository tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// The tag name.
    pub name: String,

    /// The tagged commit.
    pub commit: TagCommit,
}

/// The commit a tag points to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCommit {
    /// The SHA of the tagged commit.
    pub sha: String,
}
