//! catalog-onboarder - Concurrent Repository Onboarding for a Developer Catalog
//!
//! Discovers repositories on a source host and registers each one with a
//! catalog service, either by proposing a `catalog-info.yaml` pull request,
//! by creating the entity directly, or by importing a manifest that already
//! exists in the repository.
//!
//! ## Core Features
//!
//! - **Bounded Worker Pool**: fixed concurrency with a per-dispatch delay
//! - **Idempotency Ledger**: skips repositories processed recently
//! - **Error Taxonomy**: every failure classified into category and type
//! - **Graceful Shutdown**: interrupts stop dispatch, in-flight work finishes
//!
//! ## Quick Start
//!
//! ```ignore
//! use catalog_onboarder::{Scheduler, SchedulerConfig, StateStore};
//! use catalog_onboarder::strategy::{build_strategy, ManifestBuilder};
//!
//! let strategy = build_strategy(mode, remote, catalog, ManifestBuilder::from_config(&config));
//! let store = Arc::new(StateStore::open(".onboarder/state.json"));
//! let report = Scheduler::new(strategy, store, SchedulerConfig::default())
//!     .run(repos)
//!     .await;
//! println!("{}", report.summary().render());
//! ```
//!
//! ## Modules
//!
//! - [`pipeline`]: scheduler, results, classifier and summary
//! - [`strategy`]: the three onboarding modes and manifest mapping
//! - [`remote`]: source host and catalog interfaces with HTTP adapters
//! - [`state`]: persistent processing ledger
//! - [`config`]: layered configuration

pub mod cli;
pub mod config;
pub mod constants;
pub mod pipeline;
pub mod remote;
pub mod state;
pub mod strategy;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

// Configuration
pub use config::{Config, ConfigLoader, OnboardingMode};

// Error Types
pub use types::{ErrorCategory, ErrorType, OnboardError, ProcessingError, Result, ResultExt};

// Pipeline
pub use pipeline::{
    Action, ErrorClassifier, ErrorSummary, ProcessingResult, RunReport, Scheduler,
    SchedulerConfig, ShutdownSignal,
};

// State
pub use state::{SharedStateStore, StateStore};

// Strategies
pub use strategy::{OnboardingStrategy, SharedStrategy};
