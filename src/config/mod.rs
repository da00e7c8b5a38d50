//! Configuration Management
//!
//! Unified configuration system with hierarchical resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/catalog-onboarder/config.toml)
//! 3. Project config (.onboarder/config.toml)
//! 4. Environment variables (ONBOARDER_*, GITHUB_TOKEN)
//! 5. CLI arguments (highest priority)

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::*;
