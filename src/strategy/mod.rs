//! Onboarding Strategies
//!
//! Interchangeable per-repository actions. A strategy never fails past its
//! boundary: every outcome, including errors, comes back as a
//! [`ProcessingResult`].

pub mod create;
pub mod generate;
pub mod manifest;
pub mod register;

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::OnboardingMode;
use crate::constants::manifest::CANDIDATE_PATHS;
use crate::pipeline::ProcessingResult;
use crate::remote::{ManifestRemote, SharedCatalogApi, SharedManifestRemote};
use crate::types::{Repository, Result};

pub use create::CreateEntityStrategy;
pub use generate::GenerateManifestStrategy;
pub use manifest::ManifestBuilder;
pub use register::RegisterManifestStrategy;

#[async_trait]
pub trait OnboardingStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn process(&self, repo: &Repository) -> ProcessingResult;
}

pub type SharedStrategy = Arc<dyn OnboardingStrategy>;

/// Strategy for the selected mode
pub fn build_strategy(
    mode: OnboardingMode,
    remote: SharedManifestRemote,
    catalog: SharedCatalogApi,
    builder: ManifestBuilder,
) -> SharedStrategy {
    match mode {
        OnboardingMode::Yaml => Arc::new(GenerateManifestStrategy::new(remote, catalog, builder)),
        OnboardingMode::Api => Arc::new(CreateEntityStrategy::new(catalog, builder)),
        OnboardingMode::Register => Arc::new(RegisterManifestStrategy::new(remote, catalog)),
    }
}

/// Manifest found in a repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestFile {
    pub path: String,
    pub content: String,
}

/// Probe the candidate manifest paths in order. Not-found answers move on
/// to the next path; any other failure is returned.
pub async fn locate_manifest(
    remote: &dyn ManifestRemote,
    repo: &Repository,
) -> Result<Option<ManifestFile>> {
    for path in CANDIDATE_PATHS {
        match remote.read_file(repo, path).await {
            Ok(Some(content)) => {
                return Ok(Some(ManifestFile {
                    path: path.to_string(),
                    content,
                }));
            }
            Ok(None) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }
    }
    Ok(None)
}
