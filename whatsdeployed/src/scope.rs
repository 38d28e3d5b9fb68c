//! Cancellation scopes for page loads.

use std::future::Future;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// The scope was cancelled before the work finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cancelled")]
pub struct Cancelled;

/// Work started on behalf of one page load.
///
/// Cancelling or dropping the scope abandons anything still running inside
/// it, and results that arrive afterwards are discarded.
#[derive(Debug, Default)]
pub struct Scope {
    token: CancellationToken,
}

impl Scope {
    /// A fresh, live scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// A scope that is cancelled along with this one.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
        }
    }

    /// Cancel everything in the scope.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether the scope has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// A token observing this scope, for tasks that outlive the borrow.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Run `work` until it completes or the scope is cancelled.
    pub async fn run<F>(&self, work: F) -> Result<F::Output, Cancelled>
    where
        F: Future,
    {
        if self.token.is_cancelled() {
            return Err(Cancelled);
        }

        tokio::select! {
            biased;
            _ = self.token.cancelled() => {
                tracing::debug!("scope cancelled, discarding in-flight work");
                Err(Cancelled)
            }
            output = work => Ok(output),
        }
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn completes_when_live() {
        let scope = Scope::new();
        assert_eq!(scope.run(async { 7 }).await, Ok(7));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_abandons_work() {
        let scope = Scope::new();
        let token = scope.token();

        let canceller = async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            scope.cancel();
        };
        let slow = scope.run(async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            "late"
        });

        let (result, ()) = tokio::join!(slow, canceller);
        assert_eq!(result, Err(Cancelled));
        assert!(token.is_cancelled());
        assert_eq!(scope.run(async { "after" }).await, Err(Cancelled));
    }

    #[test]
    fn drop_cancels_children() {
        let parent = Scope::new();
        let child = parent.child();
        let observer = child.token();
        drop(parent);
        assert!(child.is_cancelled());
        assert!(observer.is_cancelled());
    }
}
