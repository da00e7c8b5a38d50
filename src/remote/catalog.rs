//! Catalog Entity API Adapter
//!
//! Implements [`CatalogApi`] against the IDP entity endpoints. Entity
//! creation posts the rendered YAML; existence is probed with a dry-run
//! create; manifest registration uses the import endpoint.

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use super::CatalogApi;
use crate::config::CatalogConfig;
use crate::constants::manifest::{API_VERSION, KIND};
use crate::constants::network::{DEFAULT_CONNECTOR_REF, REQUEST_TIMEOUT_SECS, USER_AGENT};
use crate::strategy::manifest::extract_identifier;
use crate::types::{
    CatalogEntity, EntityMetadata, EntitySpec, OnboardError, ProcessingError, Repository, Result,
};

const SERVICE: &str = "catalog";
const ENTITIES_PATH: &str = "/gateway/v1/entities";
const IMPORT_PATH: &str = "/gateway/v1/entities/import";

/// Body of an import request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportRequest {
    pub branch_name: String,
    pub connector_ref: String,
    pub repo_name: String,
    pub is_harness_code_repo: bool,
    pub file_path: String,
    pub identifier: String,
    #[serde(rename = "accountIdentifier")]
    pub account_identifier: String,
    #[serde(rename = "orgIdentifier")]
    pub org_identifier: String,
    #[serde(rename = "projectIdentifier")]
    pub project_identifier: String,
}

pub struct CatalogClient {
    base_url: Url,
    api_key: SecretString,
    account_id: String,
    org_id: String,
    project_id: String,
    connector_ref: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for CatalogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogClient")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &"[REDACTED]")
            .field("account_id", &self.account_id)
            .field("org_id", &self.org_id)
            .field("project_id", &self.project_id)
            .finish()
    }
}

impl CatalogClient {
    pub fn new(config: &CatalogConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            OnboardError::Config(format!("catalog.base_url is not a valid URL: {}", e))
        })?;

        let api_key = config.api_key.clone().ok_or_else(|| {
            OnboardError::Config(
                "Catalog API key not found. Set ONBOARDER_CATALOG__API_KEY or catalog.api_key"
                    .to_string(),
            )
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| OnboardError::Config(format!("Failed to create HTTP client: {}", e)))?;

        let connector_ref = if config.connector_ref.is_empty() {
            DEFAULT_CONNECTOR_REF.to_string()
        } else {
            config.connector_ref.clone()
        };

        Ok(Self {
            base_url,
            api_key: SecretString::from(api_key),
            account_id: config.account_id.clone(),
            org_id: config.org_id.clone(),
            project_id: config.project_id.clone(),
            connector_ref,
            client,
        })
    }

    /// Absolute endpoint URL with the scope identifiers as query parameters
    fn endpoint(&self, path: &str, extra: &[(&str, &str)]) -> Result<Url> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|e| OnboardError::Config(format!("Invalid catalog endpoint {}: {}", path, e)))?;
        {
            let mut query = url.query_pairs_mut();
            for (key, value) in extra {
                query.append_pair(key, value);
            }
            query
                .append_pair("accountIdentifier", &self.account_id)
                .append_pair("orgIdentifier", &self.org_id)
                .append_pair("projectIdentifier", &self.project_id);
        }
        Ok(url)
    }

    fn entities_url(&self, dry_run: bool) -> Result<Url> {
        self.endpoint(
            ENTITIES_PATH,
            &[
                ("convert", "false"),
                ("dry_run", if dry_run { "true" } else { "false" }),
            ],
        )
    }

    /// POST an entity document; returns status and body without judging them
    async fn post_entity(&self, yaml: String, dry_run: bool) -> Result<(StatusCode, String)> {
        let url = self.entities_url(dry_run)?;
        debug!("POST {}", url);
        let response = self
            .client
            .post(url)
            .header("x-api-key", self.api_key.expose_secret())
            .header("harness-account", &self.account_id)
            .header("harness-org", &self.org_id)
            .header("harness-project", &self.project_id)
            .json(&json!({ "yaml": yaml }))
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Ok((status, body))
    }

    /// Minimal entity used to probe for an identifier
    fn probe_entity(identifier: &str) -> CatalogEntity {
        CatalogEntity {
            api_version: API_VERSION.to_string(),
            identifier: identifier.to_string(),
            name: identifier.to_string(),
            kind: KIND.to_string(),
            entity_type: "service".to_string(),
            project_identifier: String::new(),
            org_identifier: String::new(),
            owner: "test".to_string(),
            metadata: EntityMetadata::default(),
            spec: EntitySpec {
                lifecycle: "production".to_string(),
                system: None,
            },
        }
    }

    fn import_request(
        &self,
        repo: &Repository,
        branch: &str,
        path: &str,
        identifier: &str,
    ) -> ImportRequest {
        ImportRequest {
            branch_name: branch.to_string(),
            connector_ref: self.connector_ref.clone(),
            repo_name: repo.name.clone(),
            is_harness_code_repo: false,
            file_path: path.to_string(),
            identifier: identifier.to_string(),
            account_identifier: self.account_id.clone(),
            org_identifier: self.org_id.clone(),
            project_identifier: self.project_id.clone(),
        }
    }
}

// =============================================================================
// Response Interpretation
// =============================================================================

fn is_already_exists(status: StatusCode, body: &str) -> bool {
    status == StatusCode::CONFLICT || body.to_lowercase().contains("already exists")
}

fn create_error(status: StatusCode, body: String, identifier: &str) -> OnboardError {
    if is_already_exists(status, &body) {
        return ProcessingError::entity_exists("", identifier)
            .with_cause(body)
            .into();
    }
    match status {
        StatusCode::UNAUTHORIZED => ProcessingError::unauthorized("")
            .with_user_message("Catalog API authentication failed. Check the catalog API key.")
            .with_cause(body)
            .into(),
        StatusCode::FORBIDDEN => ProcessingError::forbidden("")
            .with_user_message("Access forbidden. Check your catalog API key permissions.")
            .with_cause(body)
            .into(),
        _ => OnboardError::remote(SERVICE, status.as_u16(), body),
    }
}

/// Interpret a dry-run create: a conflict means the entity exists
fn probe_outcome(status: StatusCode, body: String) -> Result<bool> {
    if is_already_exists(status, &body) {
        return Ok(true);
    }
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(OnboardError::remote(SERVICE, status.as_u16(), body))
        }
        _ => Ok(false),
    }
}

fn import_error(status: StatusCode, body: String, repo: &str, path: &str) -> OnboardError {
    let lowered = body.to_lowercase();
    if lowered.contains("duplicate_file_import") || lowered.contains("already been imported") {
        return ProcessingError::already_registered(repo).with_cause(body).into();
    }
    match status {
        StatusCode::NOT_FOUND => ProcessingError::repository_not_found(repo)
            .with_user_message(format!(
                "Repository '{}' or catalog file '{}' not found. Check repository access and file path.",
                repo, path
            ))
            .with_cause(body)
            .into(),
        StatusCode::UNAUTHORIZED => ProcessingError::unauthorized(repo)
            .with_user_message("Catalog API authentication failed. Check the catalog API key.")
            .with_cause(body)
            .into(),
        _ => OnboardError::remote(SERVICE, status.as_u16(), body),
    }
}

// =============================================================================
// Trait Implementation
// =============================================================================

#[async_trait]
impl CatalogApi for CatalogClient {
    async fn create_entity(&self, entity: &CatalogEntity) -> Result<()> {
        let (status, body) = self.post_entity(entity.to_yaml()?, false).await?;
        if !status.is_success() {
            return Err(create_error(status, body, &entity.identifier));
        }
        info!("Created entity {} ({})", entity.name, entity.identifier);
        Ok(())
    }

    async fn entity_exists(&self, identifier: &str) -> Result<bool> {
        let yaml = Self::probe_entity(identifier).to_yaml()?;
        let (status, body) = self.post_entity(yaml, true).await?;
        let exists = probe_outcome(status, body)?;
        debug!("Entity {} exists: {}", identifier, exists);
        Ok(exists)
    }

    async fn register_manifest_location(
        &self,
        repo: &Repository,
        branch: &str,
        path: &str,
        content: &str,
    ) -> Result<()> {
        repo.owner_and_name()?;
        let identifier = match extract_identifier(content) {
            Ok(Some(identifier)) => identifier.replace('-', "_"),
            Ok(None) => {
                return Err(ProcessingError::catalog_file_invalid(
                    &repo.full_name,
                    "entity identifier not found in catalog",
                )
                .into());
            }
            Err(e) => {
                return Err(
                    ProcessingError::catalog_file_invalid(&repo.full_name, &e.to_string()).into(),
                );
            }
        };

        let request = self.import_request(repo, branch, path, &identifier);
        let url = self.endpoint(IMPORT_PATH, &[])?;
        debug!("POST {} ({})", url, identifier);

        let mut builder = self
            .client
            .post(url)
            .header("Accept", "*/*")
            .header("harness-account", &self.account_id)
            .json(&request);
        let key = self.api_key.expose_secret();
        builder = if key.starts_with("pat.") {
            builder.header("x-api-key", key)
        } else {
            builder.bearer_auth(key)
        };

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(import_error(status, body, &repo.full_name, path));
        }

        info!("Imported {} from {}:{}", identifier, repo.full_name, path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::ErrorClassifier;
    use crate::types::{ErrorCategory, ErrorType};

    fn config() -> CatalogConfig {
        CatalogConfig {
            api_key: Some("pat.abc.def".to_string()),
            account_id: "acct".to_string(),
            org_id: "default".to_string(),
            project_id: "idp".to_string(),
            base_url: "https://catalog.example.test/".to_string(),
            connector_ref: String::new(),
        }
    }

    fn classify(err: OnboardError) -> ProcessingError {
        ErrorClassifier::classify(&err, "acme/api")
    }

    #[test]
    fn test_entities_url_carries_scope() {
        let client = CatalogClient::new(&config()).unwrap();
        let url = client.entities_url(true).unwrap();
        assert_eq!(url.path(), "/gateway/v1/entities");
        let query = url.query().unwrap();
        assert!(query.contains("dry_run=true"));
        assert!(query.contains("convert=false"));
        assert!(query.contains("accountIdentifier=acct"));
        assert!(query.contains("projectIdentifier=idp"));
    }

    #[test]
    fn test_import_request_uses_short_repo_name() {
        let client = CatalogClient::new(&config()).unwrap();
        let req = client.import_request(
            &Repository::new("acme/orders"),
            "main",
            "catalog-info.yaml",
            "orders",
        );
        assert_eq!(req.repo_name, "orders");
        assert_eq!(req.connector_ref, DEFAULT_CONNECTOR_REF);

        let body = serde_json::to_value(&req).unwrap();
        assert_eq!(body["branch_name"], "main");
        assert_eq!(body["accountIdentifier"], "acct");
        assert_eq!(body["is_harness_code_repo"], false);
    }

    #[test]
    fn test_missing_api_key_is_config_error() {
        let mut cfg = config();
        cfg.api_key = None;
        assert!(matches!(
            CatalogClient::new(&cfg),
            Err(OnboardError::Config(_))
        ));
    }

    #[test]
    fn test_create_conflict_is_entity_exists() {
        let err = classify(create_error(StatusCode::CONFLICT, "conflict".to_string(), "orders"));
        assert_eq!(err.error_type, ErrorType::EntityExists);
        assert_eq!(err.repository, "acme/api");

        let err = classify(create_error(
            StatusCode::BAD_REQUEST,
            "Entity ALREADY EXISTS".to_string(),
            "orders",
        ));
        assert_eq!(err.error_type, ErrorType::EntityExists);
    }

    #[test]
    fn test_create_auth_failures() {
        let err = classify(create_error(StatusCode::FORBIDDEN, String::new(), "orders"));
        assert_eq!(err.error_type, ErrorType::Forbidden);
        assert_eq!(err.category, ErrorCategory::Authentication);

        let err = classify(create_error(StatusCode::UNAUTHORIZED, String::new(), "orders"));
        assert_eq!(err.error_type, ErrorType::Unauthorized);
    }

    #[test]
    fn test_probe_outcome() {
        assert!(probe_outcome(StatusCode::CONFLICT, String::new()).unwrap());
        assert!(!probe_outcome(StatusCode::OK, String::new()).unwrap());
        assert!(!probe_outcome(StatusCode::BAD_REQUEST, "bad yaml".to_string()).unwrap());
        assert!(probe_outcome(StatusCode::UNAUTHORIZED, String::new()).is_err());
    }

    #[test]
    fn test_import_errors() {
        let err = classify(import_error(
            StatusCode::BAD_REQUEST,
            "{\"code\":\"DUPLICATE_FILE_IMPORT\"}".to_string(),
            "acme/api",
            "catalog-info.yaml",
        ));
        assert_eq!(err.error_type, ErrorType::EntityAlreadyRegistered);
        assert_eq!(err.category, ErrorCategory::Entity);

        let err = classify(import_error(
            StatusCode::NOT_FOUND,
            String::new(),
            "acme/api",
            "catalog-info.yaml",
        ));
        assert_eq!(err.error_type, ErrorType::RepositoryNotFound);
        assert!(err.user_message().contains("catalog-info.yaml"));

        let err = import_error(StatusCode::BAD_GATEWAY, "upstream".to_string(), "acme/api", "x");
        assert_eq!(err.status(), Some(502));
    }
}
