//! Github API object models.

use serde::{Deserialize, Serialize};

pub mod commits;
pub mod pulls;

pub use commits::{Commit, CommitDetails, GitSignature, Tag, TagCommit};
pub use pulls::{IssueComment, PullRequest};

/// Whether a Github account is a person or an automation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UserKind {
    /// A regular account.
    #[default]
    User,

    /// A Github App or other bot account, e.g. `bors[bot]`.
    Bot,

    /// An organization account.
    Organization,
}

/// A Github account, as embedded in commits and other objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Account login, the stable identity of the account.
    pub login: String,

    /// Avatar image URL.
    #[serde(default)]
    pub avatar_url: String,

    /// Profile page URL.
    #[serde(default)]
    pub html_url: String,

    /// Account type.
    #[serde(rename = "type", default)]
    pub kind: UserKind,
}

impl User {
    /// Whether this account is a bot.
    pub fn is_bot(&self) -> bool {
        self.kind == UserKind::Bot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_type_field() {
        let user: User = serde_json::from_value(serde_json::json!({
            "login": "bors[bot]",
            "id": 26634292,
            "avatar_url": "https://avatars.githubusercontent.com/in/1847?v=4",
            "html_url": "https://github.com/apps/bors",
            "type": "Bot",
            "site_admin": false
        }))
        .unwrap();

        assert!(user.is_bot());
        assert_eq!(user.login, "bors[bot]");
    }
}
