//! Build the full "what's deployed" view for a repository.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::commit::Commit;
use crate::culprits::{culprits, CulpritGroup};
use crate::environment::{Deployment, Environment, Repository};
use crate::error::Error;
use crate::person::PersonDirectory;
use crate::pulls::{merged_pulls, MergedPull};
use crate::reconcile::{reconcile, Convergence};
use crate::resolve::{load_tags, resolve_environments, Tags};
use crate::scope::Scope;
use crate::source::{
    CommitSource, GithubSource, HttpRevisionFetcher, PullSource, RevisionFetcher, TagSource,
};
use crate::table::{Summary, Table};

/// Commits requested per view, unless configured otherwise.
pub const DEFAULT_PER_PAGE: u32 = octocat::DEFAULT_PER_PAGE;

/// What to show: a repository and the environments to compare.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployRequest {
    /// The repository.
    #[serde(flatten)]
    pub repository: Repository,

    /// Environments, in column order.
    pub deployments: Vec<Deployment>,

    /// How many commits to compare.
    #[serde(default = "default_per_page")]
    pub per_page: u32,

    /// Only show merge bot commits, when there are any.
    #[serde(default)]
    pub bors_mode: bool,
}

fn default_per_page() -> u32 {
    DEFAULT_PER_PAGE
}

impl DeployRequest {
    /// Compare `deployments` on `repository`.
    pub fn new(repository: Repository, deployments: Vec<Deployment>) -> Self {
        Self {
            repository,
            deployments,
            per_page: DEFAULT_PER_PAGE,
            bors_mode: false,
        }
    }
}

/// Everything shown for one view.
#[derive(Debug, Clone, Serialize)]
pub struct DeployReport {
    /// The repository.
    pub repository: Repository,

    /// Environments with their resolved revisions.
    pub environments: Vec<Environment>,

    /// Tag names by SHA.
    pub tags: Tags,

    /// Commits against environments.
    pub table: Table,

    /// Deployed commits and comparison links.
    pub summary: Summary,

    /// Who has changes waiting in each environment.
    pub culprits: Vec<CulpritGroup>,

    /// Where the commits and environments met.
    pub convergence: Convergence,
}

fn with_pulls(mut groups: Vec<CulpritGroup>, pulls: &[Option<MergedPull>]) -> Vec<CulpritGroup> {
    for (group, pull) in groups.iter_mut().zip(pulls) {
        if let Some(pull) = pull {
            group.add_pull(pull);
        }
    }
    groups
}

/// Loads views from Github-like sources and a revision fetcher.
#[derive(Debug, Clone)]
pub struct Deployer {
    commits: Arc<dyn CommitSource>,
    tags: Arc<dyn TagSource>,
    pulls: Arc<dyn PullSource>,
    revisions: Arc<dyn RevisionFetcher>,
}

impl Deployer {
    /// A deployer over explicit sources.
    pub fn new(
        commits: Arc<dyn CommitSource>,
        tags: Arc<dyn TagSource>,
        pulls: Arc<dyn PullSource>,
        revisions: Arc<dyn RevisionFetcher>,
    ) -> Self {
        Self {
            commits,
            tags,
            pulls,
            revisions,
        }
    }

    /// Commits, tags and pull requests from Github, revisions over plain HTTP.
    pub fn github(github: GithubSource, revisions: HttpRevisionFetcher) -> Self {
        let github = Arc::new(github);
        Self::new(github.clone(), github.clone(), github, Arc::new(revisions))
    }

    /// Resolve each deployment's revision and load the repository's tags.
    pub async fn shas(
        &self,
        repository: &Repository,
        deployments: &[Deployment],
    ) -> (Vec<Environment>, Tags) {
        tokio::join!(
            resolve_environments(self.revisions.as_ref(), deployments),
            load_tags(self.tags.as_ref(), repository),
        )
    }

    /// Recent commits, newest first.
    pub async fn commits(&self, repository: &Repository, per_page: u32) -> Result<Vec<Commit>, Error> {
        Ok(self.commits.commits(repository, per_page).await?)
    }

    /// Culprits for environments whose revisions are already known.
    #[tracing::instrument(skip(self, environments), fields(%repository))]
    pub async fn culprits_for(
        &self,
        repository: &Repository,
        environments: &[Environment],
        per_page: u32,
    ) -> Result<Vec<CulpritGroup>, Error> {
        let (commits, pulls) = tokio::join!(
            self.commits(repository, per_page),
            merged_pulls(self.pulls.as_ref(), repository, environments),
        );
        let commits = commits?;
        let reconciliation = reconcile(&commits, environments)?;
        let directory = PersonDirectory::from_commits(&commits);

        let groups = culprits(&commits, environments, &reconciliation, &directory);
        Ok(with_pulls(groups, &pulls))
    }

    /// Load a complete view.
    ///
    /// Commits, revisions and tags are fetched concurrently inside `scope`;
    /// if the scope is cancelled first the results are discarded.
    #[tracing::instrument(skip_all, fields(repository = %request.repository))]
    pub async fn load(&self, scope: &Scope, request: &DeployRequest) -> Result<DeployReport, Error> {
        let repository = &request.repository;
        let (commits, (environments, tags)) = scope
            .run(async {
                tokio::join!(
                    self.commits(repository, request.per_page),
                    self.shas(repository, &request.deployments),
                )
            })
            .await?;
        let commits = commits?;

        let reconciliation = reconcile(&commits, &environments)?;
        let directory = PersonDirectory::from_commits(&commits);

        let table = Table::build(
            &commits,
            &environments,
            &reconciliation,
            &tags,
            &directory,
            request.bors_mode,
        );
        let summary = Summary::build(repository, &environments, &tags);
        let pulls = scope
            .run(merged_pulls(self.pulls.as_ref(), repository, &environments))
            .await?;
        let culprits = with_pulls(
            culprits(&commits, &environments, &reconciliation, &directory),
            &pulls,
        );

        tracing::debug!(
            commits = commits.len(),
            convergence = ?reconciliation.convergence,
            "loaded view"
        );

        Ok(DeployReport {
            repository: repository.clone(),
            environments,
            tags,
            table,
            summary,
            culprits,
            convergence: reconciliation.convergence,
        })
    }
}
