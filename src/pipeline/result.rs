//! Per-repository outcome record.

use serde::Serialize;
use std::fmt;

use crate::types::ProcessingError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Created,
    Updated,
    Registered,
    Skipped,
    Failed,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Created => write!(f, "created"),
            Action::Updated => write!(f, "updated"),
            Action::Registered => write!(f, "registered"),
            Action::Skipped => write!(f, "skipped"),
            Action::Failed => write!(f, "failed"),
        }
    }
}

/// Result of processing one repository with one strategy
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessingResult {
    pub repository: String,
    pub success: bool,
    pub skipped: bool,
    pub action: Action,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ProcessingError>,
}

impl ProcessingResult {
    fn completed(repo: &str, action: Action, message: impl Into<String>) -> Self {
        Self {
            repository: repo.to_string(),
            success: true,
            skipped: false,
            action,
            message: message.into(),
            error: None,
        }
    }

    pub fn created(repo: &str, message: impl Into<String>) -> Self {
        Self::completed(repo, Action::Created, message)
    }

    pub fn updated(repo: &str, message: impl Into<String>) -> Self {
        Self::completed(repo, Action::Updated, message)
    }

    pub fn registered(repo: &str, message: impl Into<String>) -> Self {
        Self::completed(repo, Action::Registered, message)
    }

    /// Nothing to do; counts as success
    pub fn skipped(repo: &str, message: impl Into<String>) -> Self {
        Self {
            skipped: true,
            ..Self::completed(repo, Action::Skipped, message)
        }
    }

    /// Known, benign condition; the classified error is kept for reporting
    pub fn skipped_with(repo: &str, message: impl Into<String>, error: ProcessingError) -> Self {
        Self {
            repository: repo.to_string(),
            success: false,
            skipped: true,
            action: Action::Skipped,
            message: message.into(),
            error: Some(error),
        }
    }

    pub fn failed(repo: &str, message: impl Into<String>, error: ProcessingError) -> Self {
        Self {
            repository: repo.to_string(),
            success: false,
            skipped: false,
            action: Action::Failed,
            message: message.into(),
            error: Some(error),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.action == Action::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        let ok = ProcessingResult::registered("acme/a", "done");
        assert!(ok.success && !ok.skipped && ok.error.is_none());

        let skip = ProcessingResult::skipped("acme/a", "nothing to do");
        assert!(skip.success && skip.skipped);

        let graceful = ProcessingResult::skipped_with(
            "acme/a",
            "already registered",
            ProcessingError::already_registered("acme/a"),
        );
        assert!(!graceful.success && graceful.skipped && !graceful.is_failure());

        let failed =
            ProcessingResult::failed("acme/a", "boom", ProcessingError::unknown("acme/a", "boom"));
        assert!(failed.is_failure());
    }

    #[test]
    fn test_action_serializes_lowercase() {
        let json = serde_json::to_value(ProcessingResult::created("acme/a", "pr")).unwrap();
        assert_eq!(json["action"], "created");
        assert!(json.get("error").is_none());
    }
}
