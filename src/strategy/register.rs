//! Register-manifest strategy: import a `catalog-info.yaml` that already
//! lives in the repository.

use async_trait::async_trait;
use tracing::{debug, instrument};

use super::manifest::{extract_identifier, sanitize_identifiers};
use super::{OnboardingStrategy, locate_manifest};
use crate::pipeline::{ErrorClassifier, ProcessingResult};
use crate::remote::{SharedCatalogApi, SharedManifestRemote};
use crate::types::{ErrorType, ProcessingError, Repository};

pub struct RegisterManifestStrategy {
    remote: SharedManifestRemote,
    catalog: SharedCatalogApi,
}

impl RegisterManifestStrategy {
    pub fn new(remote: SharedManifestRemote, catalog: SharedCatalogApi) -> Self {
        Self { remote, catalog }
    }
}

#[async_trait]
impl OnboardingStrategy for RegisterManifestStrategy {
    fn name(&self) -> &'static str {
        "register-manifest"
    }

    #[instrument(skip_all, fields(repo = %repo.full_name))]
    async fn process(&self, repo: &Repository) -> ProcessingResult {
        let id = repo.full_name.as_str();

        let manifest = match locate_manifest(self.remote.as_ref(), repo).await {
            Ok(Some(manifest)) => manifest,
            Ok(None) => return ProcessingResult::skipped(id, "No catalog-info.yaml found"),
            Err(e) => {
                let err = ErrorClassifier::classify(&e, id);
                return ProcessingResult::failed(
                    id,
                    format!("Failed to read catalog-info.yaml: {}", err.message),
                    err,
                );
            }
        };

        let content = sanitize_identifiers(&manifest.content);
        let identifier = match extract_identifier(&content) {
            Ok(Some(identifier)) => identifier,
            Ok(None) => {
                let err = ProcessingError::catalog_file_invalid(
                    id,
                    "no identifier or metadata.name field",
                );
                return ProcessingResult::failed(id, format!("Invalid {}", manifest.path), err);
            }
            Err(e) => {
                let err = ProcessingError::catalog_file_invalid(id, &e.to_string());
                return ProcessingResult::failed(id, format!("Invalid {}", manifest.path), err);
            }
        };
        debug!("Registering {} from {}", identifier, manifest.path);

        match self
            .catalog
            .register_manifest_location(repo, repo.branch(), &manifest.path, &content)
            .await
        {
            Ok(()) => ProcessingResult::registered(
                id,
                format!("Registered '{}' from {}", identifier, manifest.path),
            ),
            Err(e) => {
                let err = ErrorClassifier::classify(&e, id);
                if err.error_type == ErrorType::EntityAlreadyRegistered {
                    ProcessingResult::skipped_with(id, "Already registered", err)
                } else {
                    ProcessingResult::failed(
                        id,
                        format!("Failed to register {}: {}", manifest.path, err.message),
                        err,
                    )
                }
            }
        }
    }
}
