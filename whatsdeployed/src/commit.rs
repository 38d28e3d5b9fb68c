//! Commits as seen by the matcher.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::person::Person;
use crate::sha::Sha;

/// A commit on the main branch.
///
/// Lists of commits are always newest first, as Github returns them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commit {
    /// Commit SHA.
    pub sha: Sha,

    /// The Github account of the author, when Github could link the email.
    pub author: Option<Person>,

    /// The Github account of the committer, when Github could link the email.
    pub committer: Option<Person>,

    /// Full commit message.
    pub message: String,

    /// Commit date.
    pub date: Option<DateTime<Utc>>,

    /// Link to the commit on Github.
    pub html_url: String,
}

impl Commit {
    /// A bare commit with only a SHA and message.
    pub fn new(sha: impl Into<Sha>, message: impl Into<String>) -> Self {
        Self {
            sha: sha.into(),
            author: None,
            committer: None,
            message: message.into(),
            date: None,
            html_url: String::new(),
        }
    }

    /// Set the author.
    pub fn with_author(mut self, author: Person) -> Self {
        self.author = Some(author);
        self
    }

    /// Set the committer.
    pub fn with_committer(mut self, committer: Person) -> Self {
        self.committer = Some(committer);
        self
    }

    /// The first paragraph of the message.
    pub fn title(&self) -> &str {
        title(&self.message)
    }
}

/// The first paragraph of a commit message.
pub(crate) fn title(message: &str) -> &str {
    let message = message.trim_start();
    message
        .split("\n\n")
        .next()
        .unwrap_or(message)
        .trim_end()
}

impl From<octocat::models::Commit> for Commit {
    fn from(commit: octocat::models::Commit) -> Self {
        let date = commit.date();
        Self {
            sha: Sha::new(&commit.sha),
            author: commit.author.map(Person::from),
            committer: commit.committer.map(Person::from),
            message: commit.commit.message,
            date,
            html_url: commit.html_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn titles() {
        assert_eq!(title("Fix (#1)\n\nbody"), "Fix (#1)");
        assert_eq!(title("\nLeading newline\n\n"), "Leading newline");
        assert_eq!(title(""), "");
    }
}
