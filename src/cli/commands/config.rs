//! Config Command
//!
//! Manage catalog-onboarder configuration.
//!
//! Usage:
//!   catalog-onboarder config show [-f json]
//!   catalog-onboarder config path
//!   catalog-onboarder config init [-g] [--org ORG] [--force]

use std::path::Path;

use crate::cli::Output;
use crate::config::ConfigLoader;
use crate::types::Result;

/// Show the merged effective configuration (secrets omitted)
pub fn show(config_path: Option<&Path>, format: &str) -> Result<()> {
    ConfigLoader::show_config(config_path, format == "json")
}

/// Show configuration paths
pub fn path(config_path: Option<&Path>) -> Result<()> {
    ConfigLoader::show_path(config_path);
    Ok(())
}

/// Write a global or project configuration template
pub fn init(global: bool, organization: Option<&str>, force: bool, out: Output) -> Result<()> {
    let config_path = if global {
        ConfigLoader::init_global(force)?
    } else {
        let root = std::env::current_dir()?;
        ConfigLoader::init_project(&root, organization, force)?
    };

    out.success(&format!(
        "Initialized {} configuration",
        if global { "global" } else { "project" }
    ));
    out.field("Config", config_path.display());
    if !global {
        out.info("Set GITHUB_TOKEN and ONBOARDER_CATALOG__API_KEY before running onboard");
    }
    Ok(())
}
