//! Line up commits against the revisions deployed to each environment.
//!
//! Commits are scanned newest first. Each environment is satisfied once its
//! pinned commit has been seen, and the scan stops at the first commit where
//! every environment is satisfied: the newest commit deployed everywhere.

use serde::Serialize;
use thiserror::Error;

use crate::commit::Commit;
use crate::environment::{Environment, Revision};

/// Errors from [`reconcile`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    /// There is nothing to compare against.
    #[error("at least one environment is required")]
    NoEnvironments,
}

/// Which environments have been satisfied so far, indexed like the environment list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MatchState(Vec<bool>);

impl MatchState {
    /// Nothing satisfied yet.
    pub fn new(environments: usize) -> Self {
        MatchState(vec![false; environments])
    }

    /// Mark an environment satisfied. Satisfaction is never undone.
    pub fn satisfy(&mut self, environment: usize) {
        if let Some(slot) = self.0.get_mut(environment) {
            *slot = true;
        }
    }

    /// Whether one environment is satisfied.
    pub fn is_satisfied(&self, environment: usize) -> bool {
        self.0.get(environment).copied().unwrap_or(false)
    }

    /// Whether every environment is satisfied.
    pub fn all_satisfied(&self) -> bool {
        self.0.iter().all(|&satisfied| satisfied)
    }

    /// Per-environment flags.
    pub fn as_slice(&self) -> &[bool] {
        &self.0
    }
}

/// Where the scan ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Convergence {
    /// Every environment contains the commit at `index`.
    Converged {
        /// Index into the commit list.
        index: usize,
    },

    /// The commit list ran out first. The difference is too big to show and
    /// callers should point at a manual comparison instead.
    NotFound {
        /// How many commits were scanned.
        scanned: usize,
    },
}

impl Convergence {
    /// The convergence index, if found.
    pub fn index(&self) -> Option<usize> {
        match self {
            Convergence::Converged { index } => Some(*index),
            Convergence::NotFound { .. } => None,
        }
    }

    /// Whether a common commit was found.
    pub fn is_converged(&self) -> bool {
        matches!(self, Convergence::Converged { .. })
    }
}

/// The outcome for one environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "index", rename_all = "snake_case")]
pub enum EnvironmentStatus {
    /// The pinned commit is at this index.
    SatisfiedAt(usize),

    /// The pinned commit was not among the scanned commits.
    NotInWindow,

    /// The environment has no pinned commit.
    Unresolved,
}

impl EnvironmentStatus {
    /// The index where the environment was satisfied.
    pub fn index(&self) -> Option<usize> {
        match self {
            EnvironmentStatus::SatisfiedAt(index) => Some(*index),
            _ => None,
        }
    }
}

/// Result of scanning commits against environments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    /// One state per scanned commit, cumulative.
    pub rows: Vec<MatchState>,

    /// One status per environment, in input order.
    pub statuses: Vec<EnvironmentStatus>,

    /// Where the scan stopped.
    pub convergence: Convergence,
}

impl Reconciliation {
    /// Number of commits scanned.
    pub fn scanned(&self) -> usize {
        self.rows.len()
    }

    /// Index at which an environment was satisfied.
    pub fn satisfied_at(&self, environment: usize) -> Option<usize> {
        self.statuses.get(environment).and_then(EnvironmentStatus::index)
    }
}

/// Scan `commits` (newest first) until every environment's pinned commit has been seen.
pub fn reconcile(
    commits: &[Commit],
    environments: &[Environment],
) -> Result<Reconciliation, ReconcileError> {
    if environments.is_empty() {
        return Err(ReconcileError::NoEnvironments);
    }

    let mut state = MatchState::new(environments.len());
    let mut statuses: Vec<EnvironmentStatus> = environments
        .iter()
        .map(|env| match env.revision {
            Revision::Pinned(_) => EnvironmentStatus::NotInWindow,
            Revision::Unresolved { .. } => EnvironmentStatus::Unresolved,
        })
        .collect();
    let mut rows = Vec::new();
    let mut convergence = None;

    for (index, commit) in commits.iter().enumerate() {
        for (env_idx, env) in environments.iter().enumerate() {
            if state.is_satisfied(env_idx) {
                continue;
            }
            if env.sha().is_some_and(|sha| sha.matches(&commit.sha)) {
                state.satisfy(env_idx);
                statuses[env_idx] = EnvironmentStatus::SatisfiedAt(index);
            }
        }

        rows.push(state.clone());

        if state.all_satisfied() {
            convergence = Some(Convergence::Converged { index });
            break;
        }
    }

    let convergence = convergence.unwrap_or(Convergence::NotFound {
        scanned: rows.len(),
    });

    tracing::trace!(?convergence, scanned = rows.len(), "reconciled");

    Ok(Reconciliation {
        rows,
        statuses,
        convergence,
    })
}
