//! Create-entity strategy: submit the entity straight to the catalog API.

use async_trait::async_trait;
use tracing::{debug, instrument};

use super::{ManifestBuilder, OnboardingStrategy};
use crate::pipeline::{ErrorClassifier, ProcessingResult};
use crate::remote::SharedCatalogApi;
use crate::types::{ErrorType, ProcessingError, Repository};

pub struct CreateEntityStrategy {
    catalog: SharedCatalogApi,
    builder: ManifestBuilder,
}

impl CreateEntityStrategy {
    pub fn new(catalog: SharedCatalogApi, builder: ManifestBuilder) -> Self {
        Self { catalog, builder }
    }
}

#[async_trait]
impl OnboardingStrategy for CreateEntityStrategy {
    fn name(&self) -> &'static str {
        "create-entity"
    }

    #[instrument(skip_all, fields(repo = %repo.full_name))]
    async fn process(&self, repo: &Repository) -> ProcessingResult {
        let id = repo.full_name.as_str();
        let entity = self.builder.build(repo);

        if let Err(detail) = entity.validate() {
            let err = ProcessingError::validation_failed(id, &detail);
            return ProcessingResult::failed(id, format!("Invalid entity: {}", detail), err);
        }

        match self.catalog.create_entity(&entity).await {
            Ok(()) => {
                debug!("Created entity {}", entity.identifier);
                ProcessingResult::created(id, format!("Created component '{}'", entity.identifier))
            }
            Err(e) => {
                let err = ErrorClassifier::classify(&e, id);
                if err.error_type == ErrorType::EntityExists {
                    ProcessingResult::skipped_with(
                        id,
                        format!("Component '{}' already exists", entity.identifier),
                        err,
                    )
                } else {
                    ProcessingResult::failed(
                        id,
                        format!("Failed to create component: {}", err.message),
                        err,
                    )
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DefaultsConfig;
    use crate::pipeline::Action;
    use crate::remote::fake::FakeCatalog;
    use std::sync::Arc;

    fn strategy(catalog: Arc<FakeCatalog>, owner: &str) -> CreateEntityStrategy {
        let defaults = DefaultsConfig {
            owner: owner.to_string(),
            ..Default::default()
        };
        CreateEntityStrategy::new(catalog, ManifestBuilder::new(defaults, "default", "idp"))
    }

    #[tokio::test]
    async fn test_creates_entity() {
        let catalog = Arc::new(FakeCatalog::default());
        let result = strategy(Arc::clone(&catalog), "team")
            .process(&Repository::new("acme/billing-api"))
            .await;

        assert_eq!(result.action, Action::Created);
        assert!(result.success);
        assert!(catalog.entities.lock().unwrap().contains("billing_api"));
    }

    #[tokio::test]
    async fn test_existing_entity_is_graceful_skip() {
        let mut fake = FakeCatalog::default();
        fake.conflicts.insert("billing_api".to_string());
        let result = strategy(Arc::new(fake), "team")
            .process(&Repository::new("acme/billing-api"))
            .await;

        assert_eq!(result.action, Action::Skipped);
        assert!(result.skipped && !result.success);
        assert_eq!(result.error.unwrap().error_type, ErrorType::EntityExists);
    }

    #[tokio::test]
    async fn test_missing_owner_fails_validation() {
        let catalog = Arc::new(FakeCatalog::default());
        let result = strategy(Arc::clone(&catalog), "")
            .process(&Repository::new("acme/billing-api"))
            .await;

        assert_eq!(result.action, Action::Failed);
        let err = result.error.unwrap();
        assert_eq!(err.error_type, ErrorType::EntityValidationFailed);
        assert!(err.message.contains("owner"));
        assert!(catalog.entities.lock().unwrap().is_empty());
    }
}
