//! Repository Types
//!
//! Source-host repository as seen by the pipeline. Identity is `full_name`;
//! `pushed_at` is the freshness signal the ledger compares against.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::{OnboardError, Result};

/// Repository discovered on the source host
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Repository {
    pub id: u64,
    pub name: String,
    /// `owner/name`
    pub full_name: String,
    pub description: String,
    pub html_url: String,
    pub language: Option<String>,
    pub topics: Vec<String>,
    pub default_branch: String,
    pub code_owners: Vec<String>,
    pub archived: bool,
    pub private: bool,
    pub stars: u64,
    pub forks: u64,
    pub open_issues: u64,
    pub license: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub pushed_at: Option<DateTime<Utc>>,
    pub signals: RepositorySignals,
}

/// Build/deploy hints detected during enrichment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositorySignals {
    pub has_dockerfile: bool,
    pub has_kubernetes: bool,
    pub has_ci: bool,
}

impl Repository {
    /// Minimal repository from an `owner/name` identity
    pub fn new(full_name: impl Into<String>) -> Self {
        let full_name = full_name.into();
        let name = full_name
            .rsplit_once('/')
            .map(|(_, name)| name.to_string())
            .unwrap_or_else(|| full_name.clone());
        Self {
            name,
            full_name,
            default_branch: "main".to_string(),
            ..Default::default()
        }
    }

    /// Split `full_name` into owner and name
    pub fn owner_and_name(&self) -> Result<(&str, &str)> {
        match self.full_name.split_once('/') {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
                Ok((owner, name))
            }
            _ => Err(OnboardError::InvalidRepository(self.full_name.clone())),
        }
    }

    /// Freshness signal compared against the ledger
    pub fn freshness(&self) -> Option<DateTime<Utc>> {
        self.pushed_at
    }

    /// Branch manifests are read from and written against
    pub fn branch(&self) -> &str {
        if self.default_branch.is_empty() {
            "main"
        } else {
            &self.default_branch
        }
    }
}

/// Reference to an open pull request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestRef {
    pub number: u64,
    pub title: String,
    pub url: String,
}

/// Outcome of writing a manifest to the source host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Manifest did not exist; a pull request adds it
    Created(PullRequestRef),
    /// Manifest existed with different content; a pull request updates it
    Updated(PullRequestRef),
    /// Manifest already has the desired content
    Unchanged,
}
