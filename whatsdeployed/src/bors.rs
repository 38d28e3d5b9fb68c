//! Recover the real description and contributors from merge-queue bot commits.
//!
//! A bors merge commit looks like this:
//!
//! ```text
//! Merge #1520
//!
//! 1520: Update python:3.6 Docker digest to 7eced2 r=mythmon a=renovate[bot]
//!
//! This Pull Request updates Docker base image ...
//! ```
//!
//! The `1520: ...` paragraphs are the merged pull requests, and `a=` names
//! their author.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::commit::{title, Commit};
use crate::person::{Person, PersonDirectory};

/// Login of the merge-queue bot.
pub const MERGE_BOT_LOGIN: &str = "bors[bot]";

static SUMMARY_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+: ").expect("Invalid summary line regex"));

static AUTHOR_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s)a=(\S+)").expect("Invalid author marker regex"));

/// Bot logins that appear under a different login on commits.
const ALIASES: &[(&str, &str)] = &[("renovate[bot]", "renovate-bot")];

/// Description and contributors recovered from a merge commit message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeInfo {
    /// Merged pull request summaries, joined with `"; "`.
    pub description: String,

    /// Known authors of the merged pull requests, in message order.
    pub contributors: Vec<Person>,
}

/// Whether a commit was made by the merge-queue bot.
pub fn is_merge_bot_commit(commit: &Commit) -> bool {
    commit
        .author
        .as_ref()
        .is_some_and(|author| author.login == MERGE_BOT_LOGIN && author.is_bot())
}

fn canonical_login(login: &str) -> &str {
    ALIASES
        .iter()
        .find_map(|&(from, to)| (from == login).then_some(to))
        .unwrap_or(login)
}

/// Extract merged pull request summaries and their authors from a bors message.
///
/// Authors not present in `directory` are dropped. Messages without summary
/// paragraphs fall back to the first paragraph and no contributors.
pub fn extract_merge_info(message: &str, directory: &PersonDirectory) -> MergeInfo {
    let summaries: Vec<&str> = message
        .split("\n\n")
        .map(str::trim)
        .filter(|paragraph| SUMMARY_LINE.is_match(paragraph))
        .collect();

    if summaries.is_empty() {
        return MergeInfo {
            description: title(message).to_owned(),
            contributors: Vec::new(),
        };
    }

    let mut contributors: Vec<Person> = Vec::new();
    for summary in &summaries {
        let Some(captures) = AUTHOR_MARKER.captures(summary) else {
            continue;
        };
        let login = canonical_login(&captures[1]);
        match directory.get(login) {
            Some(person) if !contributors.iter().any(|c| c.login == person.login) => {
                contributors.push(person.clone());
            }
            Some(_) => {}
            None => tracing::trace!(%login, "dropping unknown merge contributor"),
        }
    }

    MergeInfo {
        description: summaries.join("; "),
        contributors,
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;

    fn directory() -> PersonDirectory {
        [Person::new("bob"), Person::new("renovate-bot").bot()]
            .into_iter()
            .collect()
    }

    #[test]
    fn single_summary() {
        let info = extract_merge_info(
            "Merge #12\n\n12: fix bug r=alice a=bob\n\nbody",
            &directory(),
        );
        assert_eq!(info.description, "12: fix bug r=alice a=bob");
        assert_eq!(info.contributors, vec![Person::new("bob")]);
    }

    #[test]
    fn unknown_authors_are_dropped() {
        let info = extract_merge_info(
            "Merge #12\n\n12: fix bug r=alice a=bob\n\nbody",
            &PersonDirectory::new(),
        );
        assert_eq!(info.description, "12: fix bug r=alice a=bob");
        assert!(info.contributors.is_empty());
    }

    #[test]
    fn batched_merge_with_renovate() {
        let message = indoc! {"
            Merge #1520 #1523

            1520: Update python:3.6 Docker digest to 7eced2 r=mythmon a=renovate[bot]

            <p>This Pull Request updates Docker base image</p>

            1523: Add a favicon r=peterbe a=bob

            Co-authored-by: Renovate Bot <bot@renovateapp.com>
        "};

        let info = extract_merge_info(message, &directory());
        assert_eq!(
            info.description,
            "1520: Update python:3.6 Docker digest to 7eced2 r=mythmon a=renovate[bot]; \
             1523: Add a favicon r=peterbe a=bob"
        );
        let logins: Vec<_> = info.contributors.iter().map(|p| p.login.as_str()).collect();
        assert_eq!(logins, vec!["renovate-bot", "bob"]);
    }

    #[test]
    fn plain_messages_use_first_paragraph() {
        let info = extract_merge_info("Just a commit\n\nwith a body a=bob", &directory());
        assert_eq!(info.description, "Just a commit");
        assert!(info.contributors.is_empty());

        assert_eq!(extract_merge_info("", &directory()), MergeInfo::default());
    }

    #[test]
    fn author_marker_needs_a_word_boundary() {
        let info = extract_merge_info("Merge #3\n\n3: set data=1 r=x", &directory());
        assert!(info.contributors.is_empty());
    }

    #[test]
    fn merge_bot_detection() {
        let bot = Commit::new("a", "Merge #1").with_author(Person::new(MERGE_BOT_LOGIN).bot());
        assert!(is_merge_bot_commit(&bot));

        let impostor = Commit::new("b", "Merge #1").with_author(Person::new(MERGE_BOT_LOGIN));
        assert!(!is_merge_bot_commit(&impostor));
        assert!(!is_merge_bot_commit(&Commit::new("c", "x")));
    }
}
