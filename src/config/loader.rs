//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources using Figment:
//! 1. Built-in defaults (Serialized)
//! 2. Global config (~/.config/catalog-onboarder/config.toml)
//! 3. Project config (.onboarder/config.toml, or an explicit path)
//! 4. Environment variables (ONBOARDER_* prefix, `__` between sections)

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::types::Config;
use crate::types::{OnboardError, Result};

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with full resolution chain using Figment:
    /// defaults → global → project (or `explicit`) → env vars
    pub fn load(explicit: Option<&Path>) -> Result<Config> {
        let config: Config = Self::figment(explicit)?
            .extract()
            .map_err(|e| OnboardError::Config(format!("Configuration error: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    fn figment(explicit: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            debug!("Loading global config from: {}", global_path.display());
            figment = figment.merge(Toml::file(&global_path));
        }

        match explicit {
            Some(path) if !path.exists() => {
                return Err(OnboardError::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            Some(path) => {
                debug!("Loading config from: {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
            None => {
                let project_path = Self::project_config_path();
                if project_path.exists() {
                    debug!("Loading project config from: {}", project_path.display());
                    figment = figment.merge(Toml::file(&project_path));
                }
            }
        }

        // e.g. ONBOARDER_CATALOG__API_KEY -> catalog.api_key
        figment = figment
            .merge(Env::prefixed("ONBOARDER_").split("__").lowercase(true))
            .merge(
                Env::raw()
                    .only(&["GITHUB_TOKEN"])
                    .map(|_| "source.token".into()),
            );

        Ok(figment)
    }

    /// Load configuration from a specific file only
    pub fn load_from_file(path: &Path) -> Result<Config> {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| OnboardError::Config(format!("Configuration error: {}", e)))
    }

    // =========================================================================
    // Path Management
    // =========================================================================

    /// Get path to global config directory (~/.config/catalog-onboarder/)
    pub fn global_dir() -> Option<PathBuf> {
        env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                env::var("HOME")
                    .ok()
                    .map(|home| PathBuf::from(home).join(".config"))
            })
            .map(|p| p.join("catalog-onboarder"))
    }

    /// Get path to global config file
    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_dir().map(|dir| dir.join("config.toml"))
    }

    /// Get project data directory
    pub fn project_dir() -> PathBuf {
        PathBuf::from(".onboarder")
    }

    /// Get path to project config file
    pub fn project_config_path() -> PathBuf {
        Self::project_dir().join("config.toml")
    }

    // =========================================================================
    // Config Commands
    // =========================================================================

    /// Show config file paths
    pub fn show_path(explicit: Option<&Path>) {
        println!("Configuration paths:");
        println!();

        if let Some(global) = Self::global_config_path() {
            let exists = if global.exists() { "✓" } else { "✗" };
            println!("  Global:  {} {}", exists, global.display());
        } else {
            println!("  Global:  (not available)");
        }

        let project = explicit
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::project_config_path);
        let exists = if project.exists() { "✓" } else { "✗" };
        println!("  Project: {} {}", exists, project.display());
    }

    /// Show current effective configuration (secrets omitted)
    pub fn show_config(explicit: Option<&Path>, as_json: bool) -> Result<()> {
        let config = Self::load(explicit)?;

        if as_json {
            println!("{}", serde_json::to_string_pretty(&config)?);
        } else {
            println!(
                "{}",
                toml::to_string_pretty(&config).map_err(|e| OnboardError::Config(e.to_string()))?
            );
        }

        Ok(())
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Initialize global configuration
    pub fn init_global(force: bool) -> Result<PathBuf> {
        let global_dir = Self::global_dir().ok_or_else(|| {
            OnboardError::Config("Cannot determine global config directory".to_string())
        })?;
        fs::create_dir_all(&global_dir)?;

        let config_path = global_dir.join("config.toml");
        Self::write_template(&config_path, &Self::default_global_config(), force)?;
        Ok(config_path)
    }

    /// Initialize project configuration in `dir`
    pub fn init_project(dir: &Path, organization: Option<&str>, force: bool) -> Result<PathBuf> {
        let project_dir = dir.join(Self::project_dir());
        fs::create_dir_all(&project_dir)?;

        let config_path = project_dir.join("config.toml");
        Self::write_template(
            &config_path,
            &Self::default_project_config(organization),
            force,
        )?;
        Ok(config_path)
    }

    fn write_template(path: &Path, content: &str, force: bool) -> Result<()> {
        if !path.exists() || force {
            fs::write(path, content)?;
            info!("Created config: {}", path.display());
        } else {
            info!("Config exists: {}", path.display());
        }
        Ok(())
    }

    // =========================================================================
    // Internal
    // =========================================================================

    /// Generate default global config content (TOML)
    fn default_global_config() -> String {
        r#"# catalog-onboarder global configuration
# User-wide defaults. Settings in .onboarder/config.toml override these.
# Secrets are best supplied via environment:
#   GITHUB_TOKEN, ONBOARDER_CATALOG__API_KEY

version = "1.0"

[catalog]
base_url = "https://app.harness.io"
account_id = ""

[runtime]
concurrency = 5
rate_limit_ms = 100
log_level = "info"
"#
        .to_string()
    }

    /// Generate default project config content (TOML)
    fn default_project_config(organization: Option<&str>) -> String {
        format!(
            r#"# catalog-onboarder project configuration

version = "1.0"

[source]
organization = "{}"

[catalog]
org_id = "default"
project_id = ""
connector_ref = "account.Gihubapp"

[defaults]
owner = ""
type = "service"
lifecycle = "production"
tags = []

[runtime]
# yaml: open a PR adding catalog-info.yaml
# api: create entities directly
# register: import existing catalog-info.yaml files
mode = "yaml"
include_repos = []
exclude_repos = []
state_file = ".onboarder/state.json"
"#,
            organization.unwrap_or("")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OnboardingMode;
    use tempfile::TempDir;

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[source]
organization = "acme"

[catalog]
api_key = "pat.abc"

[runtime]
mode = "register"
concurrency = 2
"#,
        )
        .unwrap();

        let config = ConfigLoader::load_from_file(&path).unwrap();
        assert_eq!(config.source.organization, "acme");
        assert_eq!(config.catalog.api_key.as_deref(), Some("pat.abc"));
        assert_eq!(config.runtime.mode, OnboardingMode::Register);
        assert_eq!(config.runtime.concurrency, 2);
        // Untouched sections keep their defaults
        assert_eq!(config.runtime.rate_limit_ms, 100);
        assert_eq!(config.defaults.lifecycle, "production");
    }

    #[test]
    fn test_init_project_template_parses() {
        let temp_dir = TempDir::new().unwrap();
        let path = ConfigLoader::init_project(temp_dir.path(), Some("acme"), false).unwrap();
        assert!(path.ends_with(".onboarder/config.toml"));

        let config = ConfigLoader::load_from_file(&path).unwrap();
        assert_eq!(config.source.organization, "acme");
        assert_eq!(config.runtime.mode, OnboardingMode::Yaml);
    }

    #[test]
    fn test_init_project_respects_force() {
        let temp_dir = TempDir::new().unwrap();
        let path = ConfigLoader::init_project(temp_dir.path(), Some("first"), false).unwrap();
        ConfigLoader::init_project(temp_dir.path(), Some("second"), false).unwrap();
        assert!(fs::read_to_string(&path).unwrap().contains("\"first\""));

        ConfigLoader::init_project(temp_dir.path(), Some("second"), true).unwrap();
        assert!(fs::read_to_string(&path).unwrap().contains("\"second\""));
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let err = ConfigLoader::load(Some(Path::new("/nonexistent/onboarder.toml"))).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_global_template_parses() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("global.toml");
        fs::write(&path, ConfigLoader::default_global_config()).unwrap();
        let config = ConfigLoader::load_from_file(&path).unwrap();
        assert_eq!(config.runtime.concurrency, 5);
    }
}
