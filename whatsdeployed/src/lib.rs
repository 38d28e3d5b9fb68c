//! Which commits on a repository's main branch have reached each deployment environment.
//!
//! Each environment publishes its deployed revision at a URL, either as a bare
//! SHA or as a Dockerflow `version.json`. Those revisions are lined up against
//! the branch history from Github to show which commits are live where, who
//! has changes waiting, and where all environments agree.
//!
//! ```
//! use whatsdeployed::{reconcile, Commit, Convergence, Environment};
//!
//! let commits = vec![
//!     Commit::new("c3c3c3c", "Third"),
//!     Commit::new("c2c2c2c", "Second"),
//!     Commit::new("c1c1c1c", "First"),
//! ];
//! let environments = vec![
//!     Environment::pinned("prod", "c1c1c1c"),
//!     Environment::pinned("dev", "c3c3c3c"),
//! ];
//!
//! let result = reconcile(&commits, &environments).unwrap();
//! assert_eq!(result.convergence, Convergence::Converged { index: 2 });
//! ```

pub mod badge;
pub mod bors;
mod commit;
pub mod config;
pub mod culprits;
pub mod deploy;
mod environment;
mod error;
pub mod history;
mod person;
pub mod pulls;
pub mod reconcile;
pub mod resolve;
pub mod scope;
pub mod server;
mod sha;
pub mod shortlink;
pub mod source;
pub mod table;

pub use crate::commit::Commit;
pub use crate::config::Config;
pub use crate::culprits::{culprits, Culprit, CulpritGroup, Role};
pub use crate::deploy::{DeployReport, DeployRequest, Deployer};
pub use crate::environment::{Deployment, Environment, Repository, Revision};
pub use crate::error::Error;
pub use crate::person::{Person, PersonDirectory, PersonKind};
pub use crate::reconcile::{reconcile, Convergence, EnvironmentStatus, MatchState, Reconciliation};
pub use crate::scope::{Cancelled, Scope};
pub use crate::sha::Sha;
