//! People who author and commit changes, and a login-keyed directory of them.

use std::collections::HashMap;

use octocat::models::{User, UserKind};
use serde::{Deserialize, Serialize};

use crate::commit::Commit;

/// Whether a person is a human account or an automation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PersonKind {
    /// A human account.
    #[default]
    User,

    /// A bot account.
    Bot,
}

/// A Github account that appears on commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    /// Stable identity.
    pub login: String,

    /// Avatar image URL.
    pub avatar_url: String,

    /// Profile page URL.
    pub html_url: String,

    /// Account type.
    #[serde(rename = "type")]
    pub kind: PersonKind,
}

impl Person {
    /// A human account with the default github.com URLs.
    pub fn new(login: impl Into<String>) -> Self {
        let login = login.into();
        Self {
            avatar_url: format!("https://github.com/{login}.png"),
            html_url: format!("https://github.com/{login}"),
            login,
            kind: PersonKind::User,
        }
    }

    /// The same person, marked as a bot.
    pub fn bot(self) -> Self {
        Self {
            kind: PersonKind::Bot,
            ..self
        }
    }

    /// Whether this is a bot account.
    pub fn is_bot(&self) -> bool {
        self.kind == PersonKind::Bot
    }
}

impl From<User> for Person {
    fn from(user: User) -> Self {
        Self {
            login: user.login,
            avatar_url: user.avatar_url,
            html_url: user.html_url,
            kind: match user.kind {
                UserKind::Bot => PersonKind::Bot,
                UserKind::User | UserKind::Organization => PersonKind::User,
            },
        }
    }
}

/// People keyed by login, in the order they were first seen.
///
/// The first record seen for a login wins; later records with the same login
/// are ignored.
#[derive(Debug, Clone, Default)]
pub struct PersonDirectory {
    people: Vec<Person>,
    index: HashMap<String, usize>,
}

impl PersonDirectory {
    /// An empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everyone who authored or committed one of `commits`, newest first.
    pub fn from_commits<'c>(commits: impl IntoIterator<Item = &'c Commit>) -> Self {
        let mut directory = Self::new();
        for commit in commits {
            for person in [&commit.author, &commit.committer].into_iter().flatten() {
                directory.insert(person.clone());
            }
        }
        directory
    }

    /// Add a person, unless their login is already known. Returns whether they were added.
    pub fn insert(&mut self, person: Person) -> bool {
        if self.index.contains_key(&person.login) {
            return false;
        }
        self.index.insert(person.login.clone(), self.people.len());
        self.people.push(person);
        true
    }

    /// Look up a person by login.
    pub fn get(&self, login: &str) -> Option<&Person> {
        self.index.get(login).map(|&idx| &self.people[idx])
    }

    /// Whether a login is known.
    pub fn contains(&self, login: &str) -> bool {
        self.index.contains_key(login)
    }

    /// Number of people.
    pub fn len(&self) -> usize {
        self.people.len()
    }

    /// Whether the directory is empty.
    pub fn is_empty(&self) -> bool {
        self.people.is_empty()
    }

    /// People in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = &Person> {
        self.people.iter()
    }
}

impl FromIterator<Person> for PersonDirectory {
    fn from_iter<T: IntoIterator<Item = Person>>(iter: T) -> Self {
        let mut directory = Self::new();
        for person in iter {
            directory.insert(person);
        }
        directory
    }
}
