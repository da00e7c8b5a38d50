//! Remote Services
//!
//! Narrow async interfaces to the source host and the catalog, with the
//! HTTP adapters that implement them. Strategies and the onboard command
//! only see the traits.

pub mod catalog;
pub mod filter;
pub mod github;

#[cfg(test)]
pub mod fake;

use async_trait::async_trait;
use std::sync::Arc;

use crate::types::{CatalogEntity, PullRequestRef, Repository, Result, WriteOutcome};

pub use catalog::CatalogClient;
pub use filter::RepositoryFilter;
pub use github::GitHubClient;

/// Repository listing on the source host
#[async_trait]
pub trait RepositoryDirectory: Send + Sync {
    /// List repositories of `organization`; a non-empty `include` list of
    /// plain names is fetched directly instead of listing everything
    async fn discover(&self, organization: &str, include: &[String]) -> Result<Vec<Repository>>;

    /// Fill in code owners and repository signals
    async fn enrich(&self, repo: Repository) -> Result<Repository>;
}

/// File access and pull requests on the source host
#[async_trait]
pub trait ManifestRemote: Send + Sync {
    /// Content of `path` on the default branch, `None` if absent
    async fn read_file(&self, repo: &Repository, path: &str) -> Result<Option<String>>;

    /// Propose `content` as the repository's manifest at `path`
    async fn write_manifest(
        &self,
        repo: &Repository,
        path: &str,
        content: &str,
    ) -> Result<WriteOutcome>;

    /// An open pull request that already onboards this repository
    async fn find_open_onboarding_pr(&self, repo: &Repository) -> Result<Option<PullRequestRef>>;
}

/// Catalog entity API
#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn create_entity(&self, entity: &CatalogEntity) -> Result<()>;

    async fn entity_exists(&self, identifier: &str) -> Result<bool>;

    /// Import the manifest stored at `path` on `branch`
    async fn register_manifest_location(
        &self,
        repo: &Repository,
        branch: &str,
        path: &str,
        content: &str,
    ) -> Result<()>;
}

pub type SharedRepositoryDirectory = Arc<dyn RepositoryDirectory>;
pub type SharedManifestRemote = Arc<dyn ManifestRemote>;
pub type SharedCatalogApi = Arc<dyn CatalogApi>;
