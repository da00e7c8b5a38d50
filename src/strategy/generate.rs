//! Generate-manifest strategy: propose a `catalog-info.yaml` through a pull
//! request on the source host.

use async_trait::async_trait;
use tracing::{debug, instrument};

use super::manifest::extract_identifier;
use super::{ManifestBuilder, ManifestFile, OnboardingStrategy, locate_manifest};
use crate::constants::manifest::DEFAULT_PATH;
use crate::pipeline::{ErrorClassifier, ProcessingResult};
use crate::remote::{SharedCatalogApi, SharedManifestRemote};
use crate::types::{ErrorType, ProcessingError, Repository, WriteOutcome};

pub struct GenerateManifestStrategy {
    remote: SharedManifestRemote,
    catalog: SharedCatalogApi,
    builder: ManifestBuilder,
}

impl GenerateManifestStrategy {
    pub fn new(
        remote: SharedManifestRemote,
        catalog: SharedCatalogApi,
        builder: ManifestBuilder,
    ) -> Self {
        Self {
            remote,
            catalog,
            builder,
        }
    }

    /// Manifest already in the repository. Lookup failures count as none.
    async fn existing_manifest(&self, repo: &Repository) -> Option<ManifestFile> {
        match locate_manifest(self.remote.as_ref(), repo).await {
            Ok(manifest) => manifest,
            Err(e) => {
                debug!("Manifest lookup failed for {}: {}", repo.full_name, e);
                None
            }
        }
    }

    /// Whether the manifest's entity is in the catalog. Lookup failures
    /// count as "no".
    async fn is_registered(&self, manifest: &ManifestFile, fallback_identifier: &str) -> bool {
        let identifier = extract_identifier(&manifest.content)
            .ok()
            .flatten()
            .unwrap_or_else(|| fallback_identifier.to_string());

        match self.catalog.entity_exists(&identifier).await {
            Ok(exists) => exists,
            Err(e) => {
                debug!("Entity lookup failed for {}: {}", identifier, e);
                false
            }
        }
    }
}

#[async_trait]
impl OnboardingStrategy for GenerateManifestStrategy {
    fn name(&self) -> &'static str {
        "generate-manifest"
    }

    #[instrument(skip_all, fields(repo = %repo.full_name))]
    async fn process(&self, repo: &Repository) -> ProcessingResult {
        let id = repo.full_name.as_str();

        match self.remote.find_open_onboarding_pr(repo).await {
            Ok(Some(pr)) => {
                return ProcessingResult::skipped(
                    id,
                    format!("Onboarding PR #{} is already open: {}", pr.number, pr.url),
                );
            }
            Ok(None) => {}
            Err(e) => debug!("Pull request lookup failed for {}: {}", id, e),
        }

        let entity = self.builder.build(repo);

        let existing = self.existing_manifest(repo).await;
        if let Some(manifest) = &existing
            && self.is_registered(manifest, &entity.identifier).await
        {
            return ProcessingResult::skipped(id, "Already onboarded: manifest and entity exist");
        }
        let path = existing.map_or_else(|| DEFAULT_PATH.to_string(), |m| m.path);

        let content = match entity.to_yaml() {
            Ok(content) => content,
            Err(e) => {
                let err = ProcessingError::manifest_render_failed(id, &e.to_string());
                return ProcessingResult::failed(id, "Failed to render catalog-info.yaml", err);
            }
        };

        match self.remote.write_manifest(repo, &path, &content).await {
            Ok(WriteOutcome::Created(pr)) => ProcessingResult::created(
                id,
                format!("Opened PR #{} adding {}: {}", pr.number, path, pr.url),
            ),
            Ok(WriteOutcome::Updated(pr)) => ProcessingResult::updated(
                id,
                format!("Opened PR #{} updating {}: {}", pr.number, path, pr.url),
            ),
            Ok(WriteOutcome::Unchanged) => {
                ProcessingResult::skipped(id, format!("{} is already up to date", path))
            }
            Err(e) => {
                let err = ErrorClassifier::classify(&e, id);
                if err.error_type == ErrorType::PrExists {
                    ProcessingResult::skipped_with(id, "Onboarding PR already exists", err)
                } else {
                    ProcessingResult::failed(
                        id,
                        format!("Failed to propose catalog-info.yaml: {}", err.message),
                        err,
                    )
                }
            }
        }
    }
}
