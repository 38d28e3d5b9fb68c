//! Who is responsible for the commits that have not reached each environment.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::bors::{extract_merge_info, is_merge_bot_commit};
use crate::commit::Commit;
use crate::environment::Environment;
use crate::person::{Person, PersonDirectory};
use crate::pulls::MergedPull;
use crate::reconcile::Reconciliation;

/// Github's committer account for changes merged with the web UI.
const WEB_FLOW_LOGIN: &str = "web-flow";

/// How a person was involved in a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Role {
    /// Wrote the change.
    Author,

    /// Committed or merged the change.
    Committer,

    /// Authored a pull request merged by the merge-queue bot.
    Contributor,

    /// Assigned to the pull request merged as the deployed commit.
    Assignee,

    /// Commented on the pull request merged as the deployed commit.
    Commenter,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Author => f.write_str("Author"),
            Role::Committer => f.write_str("Committer"),
            Role::Contributor => f.write_str("Contributor"),
            Role::Assignee => f.write_str("Assignee"),
            Role::Commenter => f.write_str("Commenter"),
        }
    }
}

/// A person and every role they had in the undeployed commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Culprit {
    /// Who.
    pub person: Person,

    /// Roles in first-seen order, without repeats.
    pub roles: Vec<Role>,
}

impl Culprit {
    /// Roles joined for display, e.g. `Author & Committer`.
    pub fn label(&self) -> String {
        self.roles
            .iter()
            .map(Role::to_string)
            .collect::<Vec<_>>()
            .join(" & ")
    }
}

impl Serialize for Culprit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (self.label(), &self.person).serialize(serializer)
    }
}

/// The culprits for one environment, most recent contribution first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CulpritGroup {
    /// Environment name.
    pub name: String,

    /// People with commits not yet in the environment.
    #[serde(rename = "users")]
    pub culprits: Vec<Culprit>,

    /// Pull requests the people were found through.
    pub links: Vec<String>,
}

impl CulpritGroup {
    /// An empty group for environment `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            culprits: Vec::new(),
            links: Vec::new(),
        }
    }

    /// Add the people who opened, were assigned to, or commented on `pull`.
    ///
    /// People already in the group keep their place and gain the new roles.
    pub fn add_pull(&mut self, pull: &MergedPull) {
        if let Some(author) = &pull.author {
            self.add(author, Role::Author);
        }
        for assignee in &pull.assignees {
            self.add(assignee, Role::Assignee);
        }
        for commenter in &pull.commenters {
            self.add(commenter, Role::Commenter);
        }
        if !self.links.contains(&pull.html_url) {
            self.links.push(pull.html_url.clone());
        }
    }

    fn add(&mut self, person: &Person, role: Role) {
        match self
            .culprits
            .iter_mut()
            .find(|culprit| culprit.person.login == person.login)
        {
            Some(culprit) => {
                if !culprit.roles.contains(&role) {
                    culprit.roles.push(role);
                }
            }
            None => self.culprits.push(Culprit {
                person: person.clone(),
                roles: vec![role],
            }),
        }
    }

    fn add_commit(&mut self, commit: &Commit, directory: &PersonDirectory) {
        if let Some(author) = &commit.author {
            self.add(author, Role::Author);
        }

        match (&commit.author, &commit.committer) {
            (Some(author), Some(committer)) if committer.login == WEB_FLOW_LOGIN => {
                self.add(author, Role::Committer);
            }
            (_, Some(committer)) if committer.login == WEB_FLOW_LOGIN => {}
            (Some(author), Some(committer)) if author.login == committer.login => {}
            (_, Some(committer)) => self.add(committer, Role::Committer),
            (_, None) => {}
        }

        if is_merge_bot_commit(commit) {
            for contributor in extract_merge_info(&commit.message, directory).contributors {
                self.add(&contributor, Role::Contributor);
            }
        }
    }
}

/// For each environment, the people whose commits sit above its deployed commit.
///
/// The span for an environment runs from the newest commit up to, but not
/// including, the commit where it was satisfied; environments that were never
/// satisfied span every commit.
pub fn culprits(
    commits: &[Commit],
    environments: &[Environment],
    reconciliation: &Reconciliation,
    directory: &PersonDirectory,
) -> Vec<CulpritGroup> {
    environments
        .iter()
        .enumerate()
        .map(|(idx, env)| {
            let end = reconciliation
                .satisfied_at(idx)
                .unwrap_or(commits.len())
                .min(commits.len());

            let mut group = CulpritGroup::new(&env.name);
            for commit in &commits[..end] {
                group.add_commit(commit, directory);
            }
            group
        })
        .collect()
}
