//! Unified Error Type System
//!
//! Centralized error type for the entire application.
//!
//! Remote failures keep their HTTP status and response body in the display
//! text so the onboarding classifier can route them by message. Failures a
//! collaborator already understands travel as a structured
//! [`ProcessingError`] and bypass text matching entirely.

use thiserror::Error;

use super::processing::ProcessingError;

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum OnboardError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // -------------------------------------------------------------------------
    // Remote Service Errors
    // -------------------------------------------------------------------------
    /// Non-success response from the source host or the catalog
    #[error("{service} API error ({status} {reason}): {message}", reason = status_reason(.status))]
    Remote {
        service: String,
        status: u16,
        message: String,
    },

    /// Already classified onboarding failure
    #[error("{0}")]
    Processing(ProcessingError),

    // -------------------------------------------------------------------------
    // Domain Errors
    // -------------------------------------------------------------------------
    #[error("Config error: {0}")]
    Config(String),

    #[error("State error: {0}")]
    State(String),

    #[error("Invalid repository name '{0}': expected owner/name")]
    InvalidRepository(String),
}

impl From<ProcessingError> for OnboardError {
    fn from(err: ProcessingError) -> Self {
        OnboardError::Processing(err)
    }
}

pub type Result<T> = std::result::Result<T, OnboardError>;

fn status_reason(status: &u16) -> &'static str {
    reqwest::StatusCode::from_u16(*status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown Status")
}

// =============================================================================
// Helper Functions
// =============================================================================

impl OnboardError {
    /// Create a remote service error
    pub fn remote(service: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self::Remote {
            service: service.into(),
            status,
            message: message.into(),
        }
    }

    /// HTTP status carried by this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Remote { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// True for a remote 404
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

/// Context extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn with_context<C: Into<String>>(self, context: C) -> Result<T>;

    /// Add context using a closure (lazy evaluation)
    fn with_context_fn<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>;
}

impl<T, E: std::error::Error + Send + Sync + 'static> ResultExt<T> for std::result::Result<T, E> {
    fn with_context<C: Into<String>>(self, context: C) -> Result<T> {
        self.map_err(|e| OnboardError::State(format!("{}: {}", context.into(), e)))
    }

    fn with_context_fn<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>,
    {
        self.map_err(|e| OnboardError::State(format!("{}: {}", f().into(), e)))
    }
}

// =============================================================================
// Tests
// =============================================================================
