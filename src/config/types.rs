//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Supports global (~/.config/catalog-onboarder/) and project (.onboarder/)
//! level configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::constants::ledger::DEFAULT_STATE_FILE;
use crate::constants::network::{DEFAULT_CATALOG_URL, DEFAULT_CONNECTOR_REF, DEFAULT_SOURCE_API};
use crate::constants::scheduler::{DEFAULT_CONCURRENCY, DEFAULT_RATE_LIMIT_MS};
use crate::types::{OnboardError, Result};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// Source host (repositories to onboard)
    pub source: SourceConfig,

    /// Catalog service
    pub catalog: CatalogConfig,

    /// Values applied to every generated entity
    pub defaults: DefaultsConfig,

    /// Run behaviour
    pub runtime: RuntimeConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            source: SourceConfig::default(),
            catalog: CatalogConfig::default(),
            defaults: DefaultsConfig::default(),
            runtime: RuntimeConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `OnboardError::Config` on validation failure.
    pub fn validate(&self) -> Result<()> {
        if self.runtime.concurrency == 0 {
            return Err(OnboardError::Config(
                "runtime.concurrency must be greater than 0".to_string(),
            ));
        }

        for (name, url) in [
            ("source.api_base", &self.source.api_base),
            ("catalog.base_url", &self.catalog.base_url),
        ] {
            url::Url::parse(url)
                .map_err(|e| OnboardError::Config(format!("{} is not a valid URL: {}", name, e)))?;
        }

        for pattern in self
            .runtime
            .include_repos
            .iter()
            .chain(&self.runtime.exclude_repos)
        {
            glob::Pattern::new(pattern).map_err(|e| {
                OnboardError::Config(format!("Invalid repository pattern '{}': {}", pattern, e))
            })?;
        }

        Ok(())
    }

    /// Check that everything an onboarding run needs is present
    pub fn validate_for_run(&self) -> Result<()> {
        self.validate()?;

        let mut missing = Vec::new();
        if self.source.organization.trim().is_empty() {
            missing.push("source.organization");
        }
        if self.defaults.owner.trim().is_empty() {
            missing.push("defaults.owner");
        }
        if !self.runtime.dry_run {
            let catalog = [
                ("catalog.account_id", &self.catalog.account_id),
                ("catalog.org_id", &self.catalog.org_id),
                ("catalog.project_id", &self.catalog.project_id),
            ];
            missing.extend(
                catalog
                    .into_iter()
                    .filter(|(_, v)| v.trim().is_empty())
                    .map(|(k, _)| k),
            );
            if self.catalog.api_key.as_deref().is_none_or(|k| k.trim().is_empty()) {
                missing.push("catalog.api_key");
            }
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(OnboardError::Config(format!(
                "Missing required settings: {}",
                missing.join(", ")
            )))
        }
    }
}

// =============================================================================
// Source Configuration
// =============================================================================

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Organization or user whose repositories are onboarded
    pub organization: String,

    /// REST API base URL
    pub api_base: String,

    /// Access token (never written back out)
    #[serde(skip_serializing)]
    pub token: Option<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            organization: String::new(),
            api_base: DEFAULT_SOURCE_API.to_string(),
            token: None,
        }
    }
}

impl std::fmt::Debug for SourceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceConfig")
            .field("organization", &self.organization)
            .field("api_base", &self.api_base)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

// =============================================================================
// Catalog Configuration
// =============================================================================

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// API key (never written back out)
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    pub account_id: String,
    pub org_id: String,
    pub project_id: String,

    /// Service base URL
    pub base_url: String,

    /// Source-host connector used when importing manifests
    pub connector_ref: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            account_id: String::new(),
            org_id: String::new(),
            project_id: String::new(),
            base_url: DEFAULT_CATALOG_URL.to_string(),
            connector_ref: DEFAULT_CONNECTOR_REF.to_string(),
        }
    }
}

impl std::fmt::Debug for CatalogConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("account_id", &self.account_id)
            .field("org_id", &self.org_id)
            .field("project_id", &self.project_id)
            .field("base_url", &self.base_url)
            .field("connector_ref", &self.connector_ref)
            .finish()
    }
}

// =============================================================================
// Entity Defaults
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Owner used when a repository has no code owners
    pub owner: String,

    #[serde(rename = "type")]
    pub component_type: String,

    pub lifecycle: String,

    pub system: Option<String>,

    /// Extra tags added to every entity
    pub tags: Vec<String>,

    /// Extra annotations added to every entity
    pub annotations: BTreeMap<String, String>,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            owner: String::new(),
            component_type: "service".to_string(),
            lifecycle: "production".to_string(),
            system: None,
            tags: Vec::new(),
            annotations: BTreeMap::new(),
        }
    }
}

// =============================================================================
// Runtime Configuration
// =============================================================================

/// Onboarding mode selecting the per-repository strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OnboardingMode {
    /// Open a pull request adding catalog-info.yaml
    #[default]
    Yaml,
    /// Create the entity directly through the catalog API
    Api,
    /// Import an existing catalog-info.yaml
    Register,
}

impl OnboardingMode {
    /// Whether the strategy reads code owners and repository signals
    pub fn needs_enrichment(&self) -> bool {
        matches!(self, OnboardingMode::Yaml | OnboardingMode::Api)
    }
}

impl std::fmt::Display for OnboardingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OnboardingMode::Yaml => write!(f, "yaml"),
            OnboardingMode::Api => write!(f, "api"),
            OnboardingMode::Register => write!(f, "register"),
        }
    }
}

impl std::str::FromStr for OnboardingMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "yaml" => Ok(OnboardingMode::Yaml),
            "api" => Ok(OnboardingMode::Api),
            "register" => Ok(OnboardingMode::Register),
            _ => Err(format!(
                "Unknown onboarding mode: {}. Valid values: yaml, api, register",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub mode: OnboardingMode,

    /// Concurrent workers
    pub concurrency: usize,

    /// Delay before each dispatch (milliseconds)
    pub rate_limit_ms: u64,

    /// Discover and filter only
    pub dry_run: bool,

    /// Log level used when RUST_LOG is not set
    pub log_level: String,

    /// Repository name patterns to keep (empty keeps all)
    pub include_repos: Vec<String>,

    /// Repository name patterns to drop
    pub exclude_repos: Vec<String>,

    /// Processing ledger location
    pub state_file: PathBuf,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            mode: OnboardingMode::default(),
            concurrency: DEFAULT_CONCURRENCY,
            rate_limit_ms: DEFAULT_RATE_LIMIT_MS,
            dry_run: false,
            log_level: "info".to_string(),
            include_repos: Vec::new(),
            exclude_repos: Vec::new(),
            state_file: PathBuf::from(DEFAULT_STATE_FILE),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
