//! Onboarding Error Taxonomy
//!
//! Closed set of categories and types every per-repository failure is
//! mapped into, plus the structured [`ProcessingError`] record carried in
//! results and summaries.

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Error Categories
// =============================================================================

/// Top-level failure category
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    Repository,
    Entity,
    Authentication,
    Validation,
    Network,
    PullRequest,
    Unknown,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Repository => write!(f, "REPOSITORY"),
            Self::Entity => write!(f, "ENTITY"),
            Self::Authentication => write!(f, "AUTHENTICATION"),
            Self::Validation => write!(f, "VALIDATION"),
            Self::Network => write!(f, "NETWORK"),
            Self::PullRequest => write!(f, "PULL_REQUEST"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

// =============================================================================
// Error Types
// =============================================================================

/// Specific failure type within a category
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorType {
    // Repository
    RepositoryNotFound,
    RepositoryAccessDenied,
    CatalogFileNotFound,
    CatalogFileInvalid,
    // Entity
    EntityExists,
    EntityAlreadyRegistered,
    EntityNotFound,
    EntityValidationFailed,
    // Authentication
    Unauthorized,
    Forbidden,
    ApiKeyInvalid,
    // Validation
    InvalidIdentifier,
    MissingField,
    InvalidValue,
    // Network
    RateLimit,
    Timeout,
    ConnectionFailed,
    // Pull request
    PrExists,
    PrConflict,
    PrCreateFailed,
    Unknown,
}

impl ErrorType {
    /// Category this type belongs to
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::RepositoryNotFound
            | Self::RepositoryAccessDenied
            | Self::CatalogFileNotFound
            | Self::CatalogFileInvalid => ErrorCategory::Repository,
            Self::EntityExists
            | Self::EntityAlreadyRegistered
            | Self::EntityNotFound
            | Self::EntityValidationFailed => ErrorCategory::Entity,
            Self::Unauthorized | Self::Forbidden | Self::ApiKeyInvalid => {
                ErrorCategory::Authentication
            }
            Self::InvalidIdentifier | Self::MissingField | Self::InvalidValue => {
                ErrorCategory::Validation
            }
            Self::RateLimit | Self::Timeout | Self::ConnectionFailed => ErrorCategory::Network,
            Self::PrExists | Self::PrConflict | Self::PrCreateFailed => ErrorCategory::PullRequest,
            Self::Unknown => ErrorCategory::Unknown,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Self::RepositoryNotFound => "REPOSITORY_NOT_FOUND",
            Self::RepositoryAccessDenied => "REPOSITORY_ACCESS_DENIED",
            Self::CatalogFileNotFound => "CATALOG_FILE_NOT_FOUND",
            Self::CatalogFileInvalid => "CATALOG_FILE_INVALID",
            Self::EntityExists => "ENTITY_EXISTS",
            Self::EntityAlreadyRegistered => "ENTITY_ALREADY_REGISTERED",
            Self::EntityNotFound => "ENTITY_NOT_FOUND",
            Self::EntityValidationFailed => "ENTITY_VALIDATION_FAILED",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::ApiKeyInvalid => "API_KEY_INVALID",
            Self::InvalidIdentifier => "INVALID_IDENTIFIER",
            Self::MissingField => "MISSING_FIELD",
            Self::InvalidValue => "INVALID_VALUE",
            Self::RateLimit => "RATE_LIMIT",
            Self::Timeout => "TIMEOUT",
            Self::ConnectionFailed => "CONNECTION_FAILED",
            Self::PrExists => "PR_EXISTS",
            Self::PrConflict => "PR_CONFLICT",
            Self::PrCreateFailed => "PR_CREATE_FAILED",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Processing Error
// =============================================================================

/// Classified per-repository failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingError {
    pub category: ErrorCategory,
    #[serde(rename = "type")]
    pub error_type: ErrorType,
    pub message: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub repository: String,
    pub recoverable: bool,
    pub user_friendly: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

impl fmt::Display for ProcessingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}:{}] {}", self.category, self.error_type, self.message)?;
        if !self.repository.is_empty() {
            write!(f, " (repo: {})", self.repository)?;
        }
        Ok(())
    }
}

impl std::error::Error for ProcessingError {}

impl ProcessingError {
    /// Create an error of the given type; category follows from the type
    pub fn new(error_type: ErrorType, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            category: error_type.category(),
            error_type,
            user_friendly: message.clone(),
            message,
            repository: String::new(),
            recoverable: error_type == ErrorType::RateLimit,
            cause: None,
        }
    }

    pub fn with_repository(mut self, repository: impl Into<String>) -> Self {
        self.repository = repository.into();
        self
    }

    /// Override the category implied by the type
    pub fn in_category(mut self, category: ErrorCategory) -> Self {
        self.category = category;
        self
    }

    pub fn with_user_message(mut self, user_friendly: impl Into<String>) -> Self {
        self.user_friendly = user_friendly.into();
        self
    }

    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// Message shown to operators
    pub fn user_message(&self) -> &str {
        if self.user_friendly.is_empty() {
            &self.message
        } else {
            &self.user_friendly
        }
    }

    /// Whether a later run may succeed without operator action
    pub fn is_recoverable(&self) -> bool {
        self.recoverable
    }

    // -------------------------------------------------------------------------
    // Constructors used by strategies and adapters
    // -------------------------------------------------------------------------

    pub fn repository_not_found(repo: &str) -> Self {
        Self::new(ErrorType::RepositoryNotFound, "repository not found or inaccessible")
            .with_repository(repo)
            .with_user_message(format!(
                "Repository '{}' was not found or you don't have access to it. \
                 Please check the repository name and your permissions.",
                repo
            ))
    }

    pub fn forbidden(repo: &str) -> Self {
        Self::new(ErrorType::Forbidden, "access forbidden")
            .with_repository(repo)
            .with_user_message(format!(
                "Access to repository '{}' is forbidden. Check the source host token permissions.",
                repo
            ))
    }

    pub fn unauthorized(repo: &str) -> Self {
        Self::new(ErrorType::Unauthorized, "authentication failed")
            .with_repository(repo)
            .with_user_message(
                "Authentication failed. Please check your API keys and permissions.",
            )
    }

    pub fn rate_limited(repo: &str) -> Self {
        Self::new(ErrorType::RateLimit, "rate limit exceeded")
            .with_repository(repo)
            .with_user_message(
                "API rate limit exceeded. Please wait a few minutes before trying again, \
                 or lower the concurrency.",
            )
    }

    pub fn entity_exists(repo: &str, identifier: &str) -> Self {
        Self::new(
            ErrorType::EntityExists,
            format!("entity with identifier '{}' already exists", identifier),
        )
        .with_repository(repo)
        .with_user_message(format!(
            "Component '{}' already exists in the catalog. \
             Use a different identifier or update the existing entity.",
            identifier
        ))
    }

    pub fn already_registered(repo: &str) -> Self {
        Self::new(ErrorType::EntityAlreadyRegistered, "entity already registered")
            .with_repository(repo)
            .with_user_message(format!(
                "Repository '{}' has already been imported into the catalog. No action needed.",
                repo
            ))
    }

    pub fn catalog_file_not_found(repo: &str) -> Self {
        Self::new(ErrorType::CatalogFileNotFound, "catalog-info.yaml file not found")
            .with_repository(repo)
            .with_user_message(format!(
                "Repository '{}' doesn't have a catalog-info.yaml file. \
                 Use generate mode to create one first.",
                repo
            ))
    }

    pub fn catalog_file_invalid(repo: &str, detail: &str) -> Self {
        Self::new(
            ErrorType::CatalogFileInvalid,
            format!("catalog-info.yaml is invalid: {}", detail),
        )
        .with_repository(repo)
        .with_user_message(format!(
            "The catalog-info.yaml in '{}' could not be used: {}",
            repo, detail
        ))
    }

    pub fn pr_exists(repo: &str, number: Option<u64>, title: Option<&str>) -> Self {
        let message = match number {
            Some(number) => format!("pull request #{} already exists", number),
            None => "pull request already exists".to_string(),
        };
        let user_friendly = match (number, title) {
            (Some(number), Some(title)) => format!(
                "Repository '{}' already has an open pull request for catalog onboarding \
                 (PR #{}: {}). Review and merge it before re-running.",
                repo, number, title
            ),
            (Some(number), None) => format!(
                "Repository '{}' already has an open pull request for catalog onboarding (PR #{}).",
                repo, number
            ),
            _ => format!(
                "Repository '{}' already has an open pull request for catalog onboarding.",
                repo
            ),
        };
        Self::new(ErrorType::PrExists, message)
            .with_repository(repo)
            .with_user_message(user_friendly)
    }

    pub fn validation_failed(repo: &str, detail: &str) -> Self {
        Self::new(
            ErrorType::EntityValidationFailed,
            format!("entity validation failed: {}", detail),
        )
        .in_category(ErrorCategory::Validation)
        .with_repository(repo)
        .with_user_message(format!(
            "The catalog entity built for '{}' is incomplete: {}. \
             Check the defaults section of the configuration.",
            repo, detail
        ))
    }

    /// The generated manifest could not be rendered
    pub fn manifest_render_failed(repo: &str, detail: &str) -> Self {
        Self::new(
            ErrorType::CatalogFileInvalid,
            format!("failed to render catalog-info.yaml: {}", detail),
        )
        .in_category(ErrorCategory::Validation)
        .with_repository(repo)
        .with_user_message(format!(
            "Failed to generate catalog-info.yaml for '{}'. \
             The repository metadata may be invalid.",
            repo
        ))
    }

    pub fn unknown(repo: &str, cause: &str) -> Self {
        Self::new(ErrorType::Unknown, cause)
            .with_repository(repo)
            .with_user_message(format!(
                "An unexpected error occurred while processing '{}': {}",
                repo, cause
            ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_and_without_repository() {
        let err = ProcessingError::repository_not_found("acme/api");
        assert_eq!(
            err.to_string(),
            "[REPOSITORY:REPOSITORY_NOT_FOUND] repository not found or inaccessible (repo: acme/api)"
        );

        let bare = ProcessingError::new(ErrorType::Timeout, "timed out");
        assert_eq!(bare.to_string(), "[NETWORK:TIMEOUT] timed out");
    }

    #[test]
    fn test_every_type_maps_to_its_category() {
        assert_eq!(ErrorType::CatalogFileInvalid.category(), ErrorCategory::Repository);
        assert_eq!(ErrorType::EntityAlreadyRegistered.category(), ErrorCategory::Entity);
        assert_eq!(ErrorType::ApiKeyInvalid.category(), ErrorCategory::Authentication);
        assert_eq!(ErrorType::MissingField.category(), ErrorCategory::Validation);
        assert_eq!(ErrorType::ConnectionFailed.category(), ErrorCategory::Network);
        assert_eq!(ErrorType::PrConflict.category(), ErrorCategory::PullRequest);
        assert_eq!(ErrorType::Unknown.category(), ErrorCategory::Unknown);
    }

    #[test]
    fn test_only_rate_limit_is_recoverable() {
        assert!(ProcessingError::rate_limited("a/b").is_recoverable());
        assert!(!ProcessingError::unauthorized("a/b").is_recoverable());
        assert!(!ProcessingError::entity_exists("a/b", "b").is_recoverable());
    }

    #[test]
    fn test_validation_errors_use_validation_category() {
        let err = ProcessingError::validation_failed("a/b", "missing owner");
        assert_eq!(err.category, ErrorCategory::Validation);
        assert_eq!(err.error_type, ErrorType::EntityValidationFailed);

        let err = ProcessingError::manifest_render_failed("a/b", "bad");
        assert_eq!(err.category, ErrorCategory::Validation);
        assert_eq!(err.error_type, ErrorType::CatalogFileInvalid);
    }

    #[test]
    fn test_pr_exists_message_includes_number_and_title() {
        let err = ProcessingError::pr_exists("acme/web", Some(42), Some("Add catalog-info.yaml"));
        assert_eq!(err.error_type, ErrorType::PrExists);
        assert!(err.user_message().contains("PR #42"));
        assert!(err.user_message().contains("Add catalog-info.yaml"));
    }

    #[test]
    fn test_serialized_shape() {
        let err = ProcessingError::already_registered("acme/api");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["category"], "ENTITY");
        assert_eq!(json["type"], "ENTITY_ALREADY_REGISTERED");
        assert_eq!(json["repository"], "acme/api");
        assert!(json.get("cause").is_none());
    }
}
