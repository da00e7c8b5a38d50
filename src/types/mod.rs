pub mod entity;
pub mod error;
pub mod processing;
pub mod repository;

pub use entity::{CatalogEntity, EntityLink, EntityMetadata, EntitySpec};
pub use error::{OnboardError, Result, ResultExt};
pub use processing::{ErrorCategory, ErrorType, ProcessingError};
pub use repository::{PullRequestRef, Repository, RepositorySignals, WriteOutcome};
