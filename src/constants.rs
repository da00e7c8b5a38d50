//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// Processing ledger constants
pub mod ledger {
    /// Failed repositories are not retried until this many hours have passed
    pub const ERROR_RETRY_WINDOW_HOURS: i64 = 24;

    /// Successful repositories are re-checked after this many days
    pub const SUCCESS_RECHECK_DAYS: i64 = 7;

    /// Stored error messages are cut to this many characters
    pub const MAX_ERROR_MESSAGE_CHARS: usize = 500;

    /// Default ledger location (relative to the working directory)
    pub const DEFAULT_STATE_FILE: &str = ".onboarder/state.json";
}

/// Worker pool constants
pub mod scheduler {
    /// Default number of concurrent workers
    pub const DEFAULT_CONCURRENCY: usize = 5;

    /// Default delay before each dispatch (milliseconds)
    pub const DEFAULT_RATE_LIMIT_MS: u64 = 100;
}

/// Catalog manifest constants
pub mod manifest {
    /// Locations probed for an existing manifest, in order
    pub const CANDIDATE_PATHS: [&str; 4] = [
        "catalog-info.yaml",
        "catalog-info.yml",
        ".harness/catalog-info.yaml",
        ".harness/catalog-info.yml",
    ];

    /// Path written by the generate strategy
    pub const DEFAULT_PATH: &str = "catalog-info.yaml";

    /// Descriptor API version
    pub const API_VERSION: &str = "harness.io/v1";

    /// Descriptor kind
    pub const KIND: &str = "Component";

    /// Prefix for onboarding branches (suffixed with a unix timestamp)
    pub const BRANCH_PREFIX: &str = "harness-onboarding";

    /// Title/body keywords that mark a pull request as an onboarding PR
    pub const ONBOARDING_PR_KEYWORDS: &[&str] = &[
        "harness",
        "catalog-info",
        "catalog info",
        "idp",
        "service catalog",
        "developer portal",
        "onboard",
    ];

    /// Locations probed for code owners, in order
    pub const CODEOWNERS_PATHS: [&str; 3] = ["CODEOWNERS", ".github/CODEOWNERS", "docs/CODEOWNERS"];
}

/// Remote service constants
pub mod network {
    /// Per-request timeout (seconds)
    pub const REQUEST_TIMEOUT_SECS: u64 = 30;

    /// User agent sent to both services
    pub const USER_AGENT: &str = concat!("catalog-onboarder/", env!("CARGO_PKG_VERSION"));

    /// Default source host API base
    pub const DEFAULT_SOURCE_API: &str = "https://api.github.com";

    /// Default catalog service base URL
    pub const DEFAULT_CATALOG_URL: &str = "https://app.harness.io";

    /// Default connector used for manifest imports
    pub const DEFAULT_CONNECTOR_REF: &str = "account.Gihubapp";

    /// Page size for repository listing
    pub const PAGE_SIZE: usize = 100;

    /// Concurrent enrichment requests during discovery
    pub const ENRICH_CONCURRENCY: usize = 4;
}
