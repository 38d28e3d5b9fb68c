//! Pull request and issue comment models.

use serde::{Deserialize, Serialize};

use super::User;

/// A pull request, as returned by the list pull requests endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    /// Pull request number, shared with its issue.
    pub number: u64,

    /// Link to the pull request on github.com.
    #[serde(default)]
    pub html_url: String,

    /// The commit created when the pull request was merged.
    #[serde(default)]
    pub merge_commit_sha: Option<String>,

    /// Who opened the pull request.
    #[serde(default)]
    pub user: Option<User>,

    /// Accounts assigned to the pull request.
    #[serde(default)]
    pub assignees: Vec<User>,
}

/// A comment on an issue or pull request conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueComment {
    /// The comment author. Deleted accounts come back as `null`.
    #[serde(default)]
    pub user: Option<User>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_pull_request() {
        let pull: PullRequest = serde_json::from_value(serde_json::json!({
            "number": 5123,
            "html_url": "https://github.com/mozilla/kitsune/pull/5123",
            "state": "closed",
            "merge_commit_sha": "6377dc6de44e3557bfc1d0b186581d442a77f774",
            "user": {"login": "peterbe", "type": "User"},
            "assignees": [{"login": "willkg", "type": "User"}],
        }))
        .unwrap();

        assert_eq!(pull.number, 5123);
        assert_eq!(pull.user.unwrap().login, "peterbe");
        assert_eq!(pull.assignees.len(), 1);
    }

    #[test]
    fn unmerged_and_ghost_users() {
        let pull: PullRequest = serde_json::from_value(serde_json::json!({
            "number": 1,
            "merge_commit_sha": null,
            "user": null,
        }))
        .unwrap();
        assert!(pull.merge_commit_sha.is_none());
        assert!(pull.assignees.is_empty());

        let comment: IssueComment = serde_json::from_value(serde_json::json!({"user": null})).unwrap();
        assert!(comment.user.is_none());
    }
}
