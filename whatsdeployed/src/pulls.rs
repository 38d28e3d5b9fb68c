//! Pull requests merged as an environment's deployed commit.

use std::collections::HashMap;

use crate::environment::{Environment, Repository};
use crate::person::Person;
use crate::sha::Sha;
use crate::source::PullSource;

/// A closed pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    /// Pull request number.
    pub number: u64,

    /// Link to the pull request.
    pub html_url: String,

    /// The commit the pull request was merged as, if it was merged.
    pub merge_commit_sha: Option<Sha>,

    /// Who opened it.
    pub author: Option<Person>,

    /// Who it was assigned to.
    pub assignees: Vec<Person>,
}

impl PullRequest {
    /// Whether this pull request was merged as `sha`.
    pub fn merged_as(&self, sha: &Sha) -> bool {
        self.merge_commit_sha
            .as_ref()
            .is_some_and(|merged| merged.matches(sha))
    }
}

impl From<octocat::models::PullRequest> for PullRequest {
    fn from(pull: octocat::models::PullRequest) -> Self {
        Self {
            number: pull.number,
            html_url: pull.html_url,
            merge_commit_sha: pull.merge_commit_sha.map(Sha::new),
            author: pull.user.map(Person::from),
            assignees: pull.assignees.into_iter().map(Person::from).collect(),
        }
    }
}

/// A merged pull request and everyone who took part in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedPull {
    /// Link to the pull request.
    pub html_url: String,

    /// Who opened it.
    pub author: Option<Person>,

    /// Who it was assigned to.
    pub assignees: Vec<Person>,

    /// Who commented on it, in comment order.
    pub commenters: Vec<Person>,
}

impl MergedPull {
    async fn gather(source: &dyn PullSource, repository: &Repository, pull: &PullRequest) -> Self {
        let commenters = match source.commenters(repository, pull.number).await {
            Ok(commenters) => commenters,
            Err(error) => {
                tracing::warn!(number = pull.number, %error, "unable to load pull request comments");
                Vec::new()
            }
        };

        Self {
            html_url: pull.html_url.clone(),
            author: pull.author.clone(),
            assignees: pull.assignees.clone(),
            commenters,
        }
    }
}

/// The pull request merged as each environment's deployed commit, in environment order.
///
/// Closed pull requests are listed once per call, and each distinct SHA is
/// looked up once. Failures are logged and leave the affected environments
/// without a pull request.
#[tracing::instrument(skip_all, fields(%repository))]
pub async fn merged_pulls(
    source: &dyn PullSource,
    repository: &Repository,
    environments: &[Environment],
) -> Vec<Option<MergedPull>> {
    let mut merged = vec![None; environments.len()];
    if environments.iter().all(|env| env.sha().is_none()) {
        return merged;
    }

    let pulls = match source.closed_pulls(repository).await {
        Ok(pulls) => pulls,
        Err(error) => {
            tracing::warn!(%error, "unable to list pull requests");
            return merged;
        }
    };

    let mut looked_up: HashMap<&Sha, Option<MergedPull>> = HashMap::new();
    for (slot, env) in merged.iter_mut().zip(environments) {
        let Some(sha) = env.sha() else {
            continue;
        };

        if let Some(found) = looked_up.get(sha) {
            slot.clone_from(found);
            continue;
        }

        let found = match pulls.iter().find(|pull| pull.merged_as(sha)) {
            Some(pull) => Some(MergedPull::gather(source, repository, pull).await),
            None => None,
        };
        tracing::trace!(%sha, found = found.is_some(), "looked up pull request");
        slot.clone_from(&found);
        looked_up.insert(sha, found);
    }
    merged
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use http::StatusCode;

    use super::*;
    use crate::source::SourceError;

    #[derive(Debug, Default)]
    struct Pulls {
        listed: Mutex<usize>,
        commented: Mutex<Vec<u64>>,
        broken_comments: bool,
    }

    #[async_trait]
    impl PullSource for Pulls {
        async fn closed_pulls(&self, _: &Repository) -> Result<Vec<PullRequest>, SourceError> {
            *self.listed.lock().unwrap() += 1;
            Ok(vec![
                PullRequest {
                    number: 12,
                    html_url: "https://github.com/o/r/pull/12".into(),
                    merge_commit_sha: Some(Sha::new("c3c3c3c3c3c3c3c3c3c3c3c3c3c3c3c3c3c3c3c3")),
                    author: Some(Person::new("carol")),
                    assignees: vec![Person::new("dave")],
                },
                PullRequest {
                    number: 11,
                    html_url: "https://github.com/o/r/pull/11".into(),
                    merge_commit_sha: None,
                    author: Some(Person::new("erin")),
                    assignees: Vec::new(),
                },
            ])
        }

        async fn commenters(&self, _: &Repository, number: u64) -> Result<Vec<Person>, SourceError> {
            self.commented.lock().unwrap().push(number);
            if self.broken_comments {
                return Err(SourceError::Status {
                    uri: http::Uri::from_static("https://api.github.com/"),
                    status: StatusCode::BAD_GATEWAY,
                });
            }
            Ok(vec![Person::new("frank")])
        }
    }

    #[derive(Debug)]
    struct Offline;

    #[async_trait]
    impl PullSource for Offline {
        async fn closed_pulls(&self, _: &Repository) -> Result<Vec<PullRequest>, SourceError> {
            Err(SourceError::Status {
                uri: http::Uri::from_static("https://api.github.com/"),
                status: StatusCode::FORBIDDEN,
            })
        }

        async fn commenters(&self, _: &Repository, _: u64) -> Result<Vec<Person>, SourceError> {
            unreachable!("no pull requests were listed")
        }
    }

    fn repository() -> Repository {
        Repository::new("o", "r")
    }

    #[tokio::test]
    async fn shared_shas_are_looked_up_once() {
        let source = Pulls::default();
        let envs = vec![
            Environment::pinned("prod", "c3c3c3c"),
            Environment::pinned("stage", "c3c3c3c"),
            Environment::pinned("dev", "d4d4d4d"),
            Environment::unresolved("demo", "https://demo.example.com", "HTTP 500"),
        ];

        let merged = merged_pulls(&source, &repository(), &envs).await;
        assert_eq!(merged.len(), 4);

        let prod = merged[0].as_ref().unwrap();
        assert_eq!(prod.html_url, "https://github.com/o/r/pull/12");
        assert_eq!(prod.author.as_ref().unwrap().login, "carol");
        assert_eq!(prod.assignees[0].login, "dave");
        assert_eq!(prod.commenters[0].login, "frank");

        assert_eq!(merged[1], merged[0]);
        assert!(merged[2].is_none());
        assert!(merged[3].is_none());

        assert_eq!(*source.listed.lock().unwrap(), 1);
        assert_eq!(*source.commented.lock().unwrap(), vec![12]);
    }

    #[tokio::test]
    async fn comment_failures_keep_the_pull_request() {
        let source = Pulls {
            broken_comments: true,
            ..Pulls::default()
        };
        let envs = vec![Environment::pinned("prod", "c3c3c3c")];

        let merged = merged_pulls(&source, &repository(), &envs).await;
        let prod = merged[0].as_ref().unwrap();
        assert_eq!(prod.author.as_ref().unwrap().login, "carol");
        assert!(prod.commenters.is_empty());
    }

    #[tokio::test]
    async fn listing_failures_find_nothing() {
        let envs = vec![Environment::pinned("prod", "c3c3c3c")];
        assert_eq!(merged_pulls(&Offline, &repository(), &envs).await, vec![None]);
    }

    #[tokio::test]
    async fn nothing_is_listed_without_shas() {
        let source = Pulls::default();
        let envs = vec![Environment::unresolved("prod", "https://prod.example.com", "timeout")];

        assert_eq!(merged_pulls(&source, &repository(), &envs).await, vec![None]);
        assert_eq!(*source.listed.lock().unwrap(), 0);
    }
}
