//! Repository Filtering
//!
//! Drops archived repositories, then applies include and exclude name
//! patterns. Patterns are globs; a plain name matches only itself.

use glob::Pattern;
use tracing::debug;

use crate::types::{OnboardError, Repository, Result};

#[derive(Debug, Clone, Default)]
pub struct RepositoryFilter {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

fn compile(patterns: &[String]) -> Result<Vec<Pattern>> {
    patterns
        .iter()
        .map(|p| {
            Pattern::new(p).map_err(|e| {
                OnboardError::Config(format!("Invalid repository pattern '{}': {}", p, e))
            })
        })
        .collect()
}

/// True when every pattern is a literal name
pub fn all_literal(patterns: &[String]) -> bool {
    patterns
        .iter()
        .all(|p| !p.contains(['*', '?', '[', ']']))
}

impl RepositoryFilter {
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self> {
        Ok(Self {
            include: compile(include)?,
            exclude: compile(exclude)?,
        })
    }

    /// Patterns match the short name or `owner/name`
    fn matches(patterns: &[Pattern], repo: &Repository) -> bool {
        patterns
            .iter()
            .any(|p| p.matches(&repo.name) || p.matches(&repo.full_name))
    }

    pub fn keep(&self, repo: &Repository) -> bool {
        if repo.archived {
            debug!("Skipping archived repository {}", repo.full_name);
            return false;
        }
        if !self.include.is_empty() && !Self::matches(&self.include, repo) {
            return false;
        }
        if Self::matches(&self.exclude, repo) {
            debug!("Excluding repository {}", repo.full_name);
            return false;
        }
        true
    }

    pub fn apply(&self, repos: Vec<Repository>) -> Vec<Repository> {
        repos.into_iter().filter(|r| self.keep(r)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(repos: &[Repository]) -> Vec<&str> {
        repos.iter().map(|r| r.name.as_str()).collect()
    }

    fn sample() -> Vec<Repository> {
        let mut archived = Repository::new("acme/legacy");
        archived.archived = true;
        vec![
            Repository::new("acme/api"),
            Repository::new("acme/api-gateway"),
            Repository::new("acme/web"),
            archived,
        ]
    }

    #[test]
    fn test_archived_always_dropped() {
        let filter = RepositoryFilter::default();
        assert_eq!(names(&filter.apply(sample())), vec!["api", "api-gateway", "web"]);
    }

    #[test]
    fn test_include_exact_and_glob() {
        let filter = RepositoryFilter::new(&["api".to_string()], &[]).unwrap();
        assert_eq!(names(&filter.apply(sample())), vec!["api"]);

        let filter = RepositoryFilter::new(&["api*".to_string(), "legacy".to_string()], &[]).unwrap();
        assert_eq!(names(&filter.apply(sample())), vec!["api", "api-gateway"]);
    }

    #[test]
    fn test_exclude_after_include() {
        let filter =
            RepositoryFilter::new(&["api*".to_string()], &["acme/api-gateway".to_string()])
                .unwrap();
        assert_eq!(names(&filter.apply(sample())), vec!["api"]);
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(RepositoryFilter::new(&["[".to_string()], &[]).is_err());
    }

    #[test]
    fn test_all_literal() {
        assert!(all_literal(&["api".to_string(), "web".to_string()]));
        assert!(!all_literal(&["api-*".to_string()]));
    }
}
