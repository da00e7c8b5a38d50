//! Processing State
//!
//! Persistent idempotency ledger shared by all workers of a run.

pub mod ledger;

use std::sync::Arc;

pub use ledger::{Ledger, LedgerStats, RepoState, RepoStatus, SkipDecision, StateStore};

/// Thread-safe shared ledger
pub type SharedStateStore = Arc<StateStore>;
