//! Onboarding Pipeline
//!
//! Fans a filtered repository list out over a bounded worker pool, records
//! each outcome in the ledger and aggregates failures into a summary.
//!
//! ```text
//! repositories ─► Scheduler ─► worker × C ─► Strategy::process
//!                     │             │
//!                     │             └─► StateStore (skip check, outcome)
//!                     ▼
//!                 RunReport ─► ErrorSummary ─► render / JSON
//! ```

pub mod classifier;
pub mod result;
pub mod scheduler;
pub mod summary;

pub use classifier::{ClassificationRule, ErrorClassifier};
pub use result::{Action, ProcessingResult};
pub use scheduler::{RunReport, Scheduler, SchedulerConfig, ShutdownSignal};
pub use summary::ErrorSummary;
