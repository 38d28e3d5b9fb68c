use storage::StorageError;
use thiserror::Error;

use crate::reconcile::ReconcileError;
use crate::scope::Cancelled;
use crate::source::SourceError;

/// Errors from building a view or managing short links.
#[derive(Debug, Error)]
pub enum Error {
    /// Commits, tags or revisions could not be read.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// The request can't be reconciled.
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    /// The page load was abandoned.
    #[error("request was cancelled")]
    Cancelled(#[from] Cancelled),

    /// Short link or history storage failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// A long URL is missing parts.
    #[error("invalid long URL: {0}")]
    LongUrl(String),

    /// Every generated code was already taken.
    #[error("no unused short link code after {0} attempts")]
    CodesExhausted(usize),
}
