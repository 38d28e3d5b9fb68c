//! The deploy table and repository summary shown for one view.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::bors::{extract_merge_info, is_merge_bot_commit, MERGE_BOT_LOGIN};
use crate::commit::Commit;
use crate::environment::{Environment, Repository};
use crate::person::{Person, PersonDirectory};
use crate::reconcile::Reconciliation;
use crate::resolve::Tags;
use crate::sha::Sha;

/// One commit line in the table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Row {
    /// Full SHA.
    pub sha: Sha,

    /// Title shown for the commit.
    pub title: String,

    /// Link to the commit.
    pub html_url: String,

    /// Tag pointing at the commit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,

    /// People involved, shown as avatars.
    pub people: Vec<Person>,

    /// Commit date.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,

    /// One flag per environment: whether the environment contains this commit.
    pub checked: Vec<bool>,
}

/// The commits-by-environment table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    /// Column headings.
    pub environments: Vec<String>,

    /// Visible rows, newest first.
    pub rows: Vec<Row>,

    /// Whether the merge bot made any of the scanned commits.
    pub has_merge_bot: bool,

    /// Whether only merge bot rows are shown.
    pub bors_mode: bool,

    /// Whether a commit common to every environment was found.
    pub converged: bool,

    /// Number of commits compared.
    pub scanned: usize,
}

impl Table {
    /// Lay out the scanned commits.
    ///
    /// Bors mode is only applied when a merge bot commit is present. It hides
    /// every other row and shows merged pull request summaries instead of the
    /// merge commit title.
    pub fn build(
        commits: &[Commit],
        environments: &[Environment],
        reconciliation: &Reconciliation,
        tags: &Tags,
        directory: &PersonDirectory,
        bors_mode: bool,
    ) -> Self {
        let scanned = &commits[..reconciliation.scanned().min(commits.len())];
        let has_merge_bot = scanned.iter().any(is_merge_bot_commit);
        let bors_mode = bors_mode && has_merge_bot;

        let rows = scanned
            .iter()
            .zip(&reconciliation.rows)
            .filter(|(commit, _)| !bors_mode || is_merge_bot_commit(commit))
            .map(|(commit, state)| {
                let mut people: Vec<Person> = commit.author.iter().cloned().collect();
                let title = if bors_mode {
                    let info = extract_merge_info(&commit.message, directory);
                    let mut involved: Vec<Person> = info
                        .contributors
                        .into_iter()
                        .filter(|c| !people.iter().any(|p| p.login == c.login))
                        .collect();
                    involved.append(&mut people);
                    people = involved;
                    info.description
                } else {
                    commit.title().to_owned()
                };

                Row {
                    sha: commit.sha.clone(),
                    title,
                    html_url: commit.html_url.clone(),
                    tag: tags.get(&commit.sha).map(str::to_owned),
                    people,
                    date: commit.date,
                    checked: state.as_slice().to_vec(),
                }
            })
            .collect();

        Self {
            environments: environments.iter().map(|env| env.name.clone()).collect(),
            rows,
            has_merge_bot,
            bors_mode,
            converged: reconciliation.convergence.is_converged(),
            scanned: reconciliation.scanned(),
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<7}", "")?;
        for name in &self.environments {
            write!(f, " {name}")?;
        }
        writeln!(f)?;

        for row in &self.rows {
            write!(f, "{}", row.sha.short())?;
            for (name, checked) in self.environments.iter().zip(&row.checked) {
                let mark = if *checked { "x" } else { "." };
                write!(f, " {mark:^width$}", width = name.chars().count())?;
            }
            write!(f, "  {}", row.title)?;
            if let Some(tag) = &row.tag {
                write!(f, " [{tag}]")?;
            }
            if !row.people.is_empty() {
                let logins: Vec<_> = row.people.iter().map(|p| p.login.as_str()).collect();
                write!(f, " ({})", logins.join(", "))?;
            }
            writeln!(f)?;
        }

        if self.has_merge_bot && !self.bors_mode {
            writeln!(f, "There are commits here by {MERGE_BOT_LOGIN}; bors mode is available.")?;
        }
        if self.converged {
            writeln!(f, "Stopped at the first commit common to all environments.")
        } else {
            writeln!(
                f,
                "No common commit in the last {} commits. The difference is too big; compare directly on Github.",
                self.scanned
            )
        }
    }
}

/// One environment in the repository summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryEnvironment {
    /// Environment name.
    pub name: String,

    /// Where the revision was read from.
    pub url: String,

    /// Deployed SHA.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha: Option<Sha>,

    /// Link to the deployed commit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_url: Option<String>,

    /// Tag on the deployed commit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,

    /// Why the revision could not be read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A link comparing what two environments have deployed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompareLink {
    /// Environment on the left.
    pub base: String,

    /// Environment on the right.
    pub head: String,

    /// Github compare page.
    pub url: String,
}

/// Repository links, deployed commits and comparisons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Repository page.
    pub repository_url: String,

    /// Per-environment deployed commit.
    pub environments: Vec<SummaryEnvironment>,

    /// One link per ordered pair of distinct pinned environments.
    pub compare: Vec<CompareLink>,
}

impl Summary {
    /// Summarize what each environment runs.
    pub fn build(repository: &Repository, environments: &[Environment], tags: &Tags) -> Self {
        let summaries = environments
            .iter()
            .map(|env| SummaryEnvironment {
                name: env.name.clone(),
                url: env.url.clone(),
                sha: env.sha().cloned(),
                commit_url: env.sha().map(|sha| repository.commit_url(sha)),
                tag: env.sha().and_then(|sha| tags.get(sha)).map(str::to_owned),
                error: env.error().map(str::to_owned),
            })
            .collect();

        let mut compare = Vec::new();
        for (i, base) in environments.iter().enumerate() {
            for (j, head) in environments.iter().enumerate() {
                if i == j {
                    continue;
                }
                if let (Some(a), Some(b)) = (base.sha(), head.sha()) {
                    compare.push(CompareLink {
                        base: base.name.clone(),
                        head: head.name.clone(),
                        url: repository.compare_url(a, b),
                    });
                }
            }
        }

        Self {
            repository_url: repository.html_url(),
            environments: summaries,
            compare,
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.repository_url)?;
        for env in &self.environments {
            match (&env.sha, &env.error) {
                (Some(sha), _) => {
                    write!(f, "  {}: {}", env.name, sha.short())?;
                    if let Some(tag) = &env.tag {
                        write!(f, " [{tag}]")?;
                    }
                    writeln!(f)?;
                }
                (None, Some(error)) => writeln!(f, "  {}: unknown ({error})", env.name)?,
                (None, None) => writeln!(f, "  {}: unknown", env.name)?,
            }
        }
        for link in &self.compare {
            writeln!(f, "  {} <> {}: {}", link.base, link.head, link.url)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::reconcile;

    const BORS: &str = "Merge #7 #8\n\n7: Add thing r=alice a=erin\n\n8: Fix other r=alice a=frank";

    fn history() -> Vec<Commit> {
        vec![
            Commit::new("d4d4d4d", "Fourth\n\ndetails").with_author(Person::new("alice")),
            Commit::new("b3b3b3b", BORS).with_author(Person::new(MERGE_BOT_LOGIN).bot()),
            Commit::new("f2f2f2f", "Fix other").with_author(Person::new("frank")),
            Commit::new("e1e1e1e", "Add thing").with_author(Person::new("erin")),
            Commit::new("a0a0a0a", "Base").with_author(Person::new("alice")),
        ]
    }

    fn envs() -> Vec<Environment> {
        vec![
            Environment::pinned("prod", "e1e1e1e"),
            Environment::pinned("dev", "d4d4d4d"),
        ]
    }

    fn table(bors_mode: bool) -> Table {
        let commits = history();
        let envs = envs();
        let reconciliation = reconcile(&commits, &envs).unwrap();
        let tags: Tags = [(Sha::new("b3b3b3b"), "v1.2".to_owned())].into_iter().collect();
        Table::build(
            &commits,
            &envs,
            &reconciliation,
            &tags,
            &PersonDirectory::from_commits(&commits),
            bors_mode,
        )
    }

    #[test]
    fn rows_stop_at_convergence() {
        let table = table(false);
        assert!(table.converged);
        assert!(table.has_merge_bot);
        assert!(!table.bors_mode);

        let shas: Vec<_> = table.rows.iter().map(|row| row.sha.short()).collect();
        assert_eq!(shas, vec!["d4d4d4d", "b3b3b3b", "f2f2f2f", "e1e1e1e"]);
        assert_eq!(table.rows[0].title, "Fourth");
        assert_eq!(table.rows[1].tag.as_deref(), Some("v1.2"));
        assert_eq!(table.rows[0].checked, vec![false, true]);
        assert_eq!(table.rows[3].checked, vec![true, true]);
    }

    #[test]
    fn bors_mode_shows_merges_only() {
        let table = table(true);
        assert!(table.bors_mode);
        assert_eq!(table.rows.len(), 1);

        let row = &table.rows[0];
        assert_eq!(row.title, "7: Add thing r=alice a=erin; 8: Fix other r=alice a=frank");
        let logins: Vec<_> = row.people.iter().map(|p| p.login.as_str()).collect();
        assert_eq!(logins, vec!["erin", "frank", MERGE_BOT_LOGIN]);
    }

    #[test]
    fn bors_mode_pinned_to_a_hidden_commit() {
        let commits = history();
        let envs = vec![
            Environment::pinned("prod", "f2f2f2f"),
            Environment::pinned("dev", "d4d4d4d"),
        ];
        let reconciliation = reconcile(&commits, &envs).unwrap();
        let directory = PersonDirectory::from_commits(&commits);
        let build = |bors_mode| {
            Table::build(&commits, &envs, &reconciliation, &Tags::new(), &directory, bors_mode)
        };

        let all = build(false);
        let merges = build(true);
        assert!(merges.bors_mode);
        assert!(merges.converged);
        assert_eq!(merges.converged, all.converged);
        assert_eq!(merges.scanned, all.scanned);
        assert_eq!(merges.scanned, 3);

        let shas: Vec<_> = merges.rows.iter().map(|row| row.sha.short()).collect();
        assert_eq!(shas, vec!["b3b3b3b"]);
        let bot_row = all
            .rows
            .iter()
            .find(|row| row.sha.short() == "b3b3b3b")
            .unwrap();
        assert_eq!(merges.rows[0].checked, bot_row.checked);
        assert_eq!(merges.rows[0].checked, vec![false, true]);
    }

    #[test]
    fn bors_mode_needs_a_merge_bot() {
        let commits = vec![Commit::new("a0a0a0a", "Base").with_author(Person::new("alice"))];
        let envs = vec![Environment::pinned("prod", "a0a0a0a")];
        let reconciliation = reconcile(&commits, &envs).unwrap();
        let table = Table::build(
            &commits,
            &envs,
            &reconciliation,
            &Tags::new(),
            &PersonDirectory::new(),
            true,
        );
        assert!(!table.bors_mode);
        assert_eq!(table.rows.len(), 1);
    }

    #[test]
    fn summary_compares_every_ordered_pair() {
        let repo = Repository::new("mozilla", "kitsune");
        let mut envs = envs();
        envs.push(Environment::unresolved("stage", "https://stage.example.com/", "HTTP 502"));
        let tags: Tags = [(Sha::new("e1e1e1e"), "v1.1".to_owned())].into_iter().collect();

        let summary = Summary::build(&repo, &envs, &tags);
        assert_eq!(summary.repository_url, "https://github.com/mozilla/kitsune");
        assert_eq!(summary.environments[0].tag.as_deref(), Some("v1.1"));
        assert_eq!(
            summary.environments[1].commit_url.as_deref(),
            Some("https://github.com/mozilla/kitsune/commit/d4d4d4d")
        );
        assert_eq!(summary.environments[2].error.as_deref(), Some("HTTP 502"));

        let urls: Vec<_> = summary.compare.iter().map(|link| link.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://github.com/mozilla/kitsune/compare/e1e1e1e...d4d4d4d",
                "https://github.com/mozilla/kitsune/compare/d4d4d4d...e1e1e1e",
            ]
        );
    }

    #[test]
    fn text_rendering() {
        let rendered = table(false).to_string();
        let lines: Vec<_> = rendered.lines().collect();
        assert_eq!(lines[0], "        prod dev");
        assert_eq!(lines[1], "d4d4d4d  .    x   Fourth (alice)");
        assert!(rendered.contains("bors mode is available"));
        assert!(rendered.ends_with("common to all environments.\n"));
    }
}
