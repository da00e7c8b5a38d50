//! Error Classifier
//!
//! Maps any failure raised while onboarding a repository into the closed
//! [`ErrorCategory`]/[`ErrorType`] taxonomy. Structured errors pass through;
//! everything else is routed by an ordered substring rule table over the
//! lowercased message (first match wins).

use crate::types::{ErrorType, OnboardError, ProcessingError};

/// One entry of the classification table
pub struct ClassificationRule {
    /// Name used in logs and tests
    pub name: &'static str,
    /// Predicate over the lowercased message
    pub matches: fn(&str) -> bool,
    /// Type assigned on match; category and recoverability follow from it
    pub error_type: ErrorType,
    build: fn(&str) -> ProcessingError,
}

impl ClassificationRule {
    fn apply(&self, repo: &str, raw: &str) -> ProcessingError {
        (self.build)(repo).with_cause(raw)
    }
}

static RULES: &[ClassificationRule] = &[
    ClassificationRule {
        name: "not-found",
        matches: |m| m.contains("404") && m.contains("not found"),
        error_type: ErrorType::RepositoryNotFound,
        build: ProcessingError::repository_not_found,
    },
    ClassificationRule {
        name: "forbidden",
        matches: |m| m.contains("403") && m.contains("forbidden"),
        error_type: ErrorType::Forbidden,
        build: ProcessingError::forbidden,
    },
    ClassificationRule {
        name: "unauthorized",
        matches: |m| m.contains("401") && m.contains("unauthorized"),
        error_type: ErrorType::Unauthorized,
        build: ProcessingError::unauthorized,
    },
    ClassificationRule {
        name: "rate-limit",
        matches: |m| m.contains("429") || m.contains("rate limit"),
        error_type: ErrorType::RateLimit,
        build: ProcessingError::rate_limited,
    },
    ClassificationRule {
        name: "already-registered",
        matches: |m| m.contains("duplicate_file_import") || m.contains("already been imported"),
        error_type: ErrorType::EntityAlreadyRegistered,
        build: ProcessingError::already_registered,
    },
    ClassificationRule {
        name: "entity-exists",
        matches: |m| m.contains("already exists") || m.contains("duplicate"),
        error_type: ErrorType::EntityExists,
        build: |repo| ProcessingError::entity_exists(repo, "unknown"),
    },
    ClassificationRule {
        name: "catalog-file-missing",
        matches: |m| m.contains("catalog-info.yaml") && m.contains("not found"),
        error_type: ErrorType::CatalogFileNotFound,
        build: ProcessingError::catalog_file_not_found,
    },
    ClassificationRule {
        name: "pr-exists",
        matches: |m| m.contains("pull request") && m.contains("already"),
        error_type: ErrorType::PrExists,
        build: |repo| ProcessingError::pr_exists(repo, None, None),
    },
];

/// Stateless classifier over [`OnboardError`]
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// Classify a failure for the given repository
    pub fn classify(err: &OnboardError, repo: &str) -> ProcessingError {
        match err {
            OnboardError::Processing(structured) => {
                let mut structured = structured.clone();
                if structured.repository.is_empty() {
                    structured.repository = repo.to_string();
                }
                structured
            }
            other => Self::classify_message(&other.to_string(), repo),
        }
    }

    /// Classify a raw error message
    pub fn classify_message(message: &str, repo: &str) -> ProcessingError {
        let lower = message.to_lowercase();
        RULES
            .iter()
            .find(|rule| (rule.matches)(&lower))
            .map(|rule| rule.apply(repo, message))
            .unwrap_or_else(|| ProcessingError::unknown(repo, message).with_cause(message))
    }

    /// The ordered rule table
    pub fn rules() -> &'static [ClassificationRule] {
        RULES
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ErrorCategory;
    use proptest::prelude::*;

    fn classify(msg: &str) -> ProcessingError {
        ErrorClassifier::classify_message(msg, "acme/api")
    }

    #[test]
    fn test_each_rule_matches() {
        let cases = [
            ("GET /repos: 404 Not Found", ErrorType::RepositoryNotFound),
            ("github API error (403 Forbidden): nope", ErrorType::Forbidden),
            ("catalog API error (401 Unauthorized): bad key", ErrorType::Unauthorized),
            ("HTTP 429 slow down", ErrorType::RateLimit),
            ("secondary Rate Limit hit", ErrorType::RateLimit),
            ("code DUPLICATE_FILE_IMPORT", ErrorType::EntityAlreadyRegistered),
            ("file has already been imported", ErrorType::EntityAlreadyRegistered),
            ("entity already exists", ErrorType::EntityExists),
            ("duplicate key value", ErrorType::EntityExists),
            ("catalog-info.yaml was not found", ErrorType::CatalogFileNotFound),
            ("a pull request already open", ErrorType::PrExists),
            ("connection reset by peer", ErrorType::Unknown),
        ];
        for (msg, expected) in cases {
            let err = classify(msg);
            assert_eq!(err.error_type, expected, "message: {}", msg);
            assert_eq!(err.category, expected.category());
            assert_eq!(err.repository, "acme/api");
        }
    }

    #[test]
    fn test_order_is_respected() {
        // Both 404 and catalog-info.yaml match; the earlier rule wins.
        let err = classify("404 catalog-info.yaml not found");
        assert_eq!(err.error_type, ErrorType::RepositoryNotFound);

        // "already been imported" precedes the broader "duplicate" rule.
        let err = classify("duplicate_file_import: already exists");
        assert_eq!(err.error_type, ErrorType::EntityAlreadyRegistered);
    }

    #[test]
    fn test_404_without_not_found_text_is_unknown() {
        assert_eq!(classify("status 404").error_type, ErrorType::Unknown);
    }

    #[test]
    fn test_only_rate_limit_recoverable() {
        assert!(classify("429").recoverable);
        assert!(!classify("404 not found").recoverable);
        assert!(!classify("weird").recoverable);
    }

    #[test]
    fn test_user_message_interpolates_repository() {
        let err = classify("404 not found");
        assert!(err.user_friendly.contains("acme/api"));

        let err = classify("kaboom");
        assert_eq!(
            err.user_friendly,
            "An unexpected error occurred while processing 'acme/api': kaboom"
        );
        assert_eq!(err.cause.as_deref(), Some("kaboom"));
    }

    #[test]
    fn test_structured_error_passes_through() {
        let original = ProcessingError::pr_exists("", Some(7), Some("Onboard"));
        let err = OnboardError::Processing(original.clone());
        let classified = ErrorClassifier::classify(&err, "acme/web");
        assert_eq!(classified.error_type, original.error_type);
        assert_eq!(classified.message, original.message);
        assert_eq!(classified.repository, "acme/web");

        let tagged = OnboardError::Processing(original.with_repository("acme/other"));
        assert_eq!(ErrorClassifier::classify(&tagged, "acme/web").repository, "acme/other");
    }

    #[test]
    fn test_remote_error_routed_by_display_text() {
        let err = OnboardError::remote("github", 404, "{\"message\":\"Not Found\"}");
        let classified = ErrorClassifier::classify(&err, "acme/api");
        assert_eq!(classified.category, ErrorCategory::Repository);
        assert_eq!(classified.error_type, ErrorType::RepositoryNotFound);

        let err = OnboardError::remote("catalog", 401, "invalid token");
        assert_eq!(
            ErrorClassifier::classify(&err, "acme/api").error_type,
            ErrorType::Unauthorized
        );
    }

    #[test]
    fn test_rule_table_types_are_distinct() {
        let rules = ErrorClassifier::rules();
        assert_eq!(rules.len(), 8);
        for (i, a) in rules.iter().enumerate() {
            for b in &rules[i + 1..] {
                assert_ne!(a.error_type, b.error_type, "{} vs {}", a.name, b.name);
            }
        }
    }

    proptest! {
        #[test]
        fn prop_classification_is_total_and_deterministic(msg in ".{0,120}") {
            let a = classify(&msg);
            let b = classify(&msg);
            prop_assert_eq!(&a, &b);
            prop_assert_eq!(a.category, a.error_type.category());
            prop_assert_eq!(a.recoverable, a.error_type == ErrorType::RateLimit);
        }
    }
}
