//! Result Aggregation
//!
//! Folds per-repository results into counters and renders the end-of-run
//! report. Only results that carry an error are counted; a run succeeds iff
//! none did.

use console::style;
use serde::Serialize;
use std::collections::BTreeMap;

use super::result::{Action, ProcessingResult};
use crate::types::{ErrorCategory, ErrorType};

#[derive(Debug, Clone, Default, Serialize)]
pub struct ErrorSummary {
    pub total: usize,
    pub by_category: BTreeMap<ErrorCategory, usize>,
    pub by_type: BTreeMap<ErrorType, usize>,
    pub recoverable: usize,
    pub results: Vec<ProcessingResult>,
}

impl ErrorSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_result(&mut self, result: ProcessingResult) {
        if let Some(err) = &result.error {
            self.total += 1;
            *self.by_category.entry(err.category).or_default() += 1;
            *self.by_type.entry(err.error_type).or_default() += 1;
            if err.recoverable {
                self.recoverable += 1;
            }
        }
        self.results.push(result);
    }

    pub fn is_success(&self) -> bool {
        self.total == 0
    }

    pub fn processed(&self) -> usize {
        self.results.len()
    }

    pub fn successful(&self) -> usize {
        self.results.len() - self.total
    }

    pub fn count_action(&self, action: Action) -> usize {
        self.results.iter().filter(|r| r.action == action).count()
    }

    /// Human-readable report
    pub fn render(&self) -> String {
        let mut lines: Vec<String> = Vec::new();

        if self.is_success() {
            lines.push(format!(
                "{} All {} repositories processed successfully",
                style("✓").green(),
                self.results.len()
            ));
        } else {
            lines.push(style("Processing Summary").bold().to_string());
            lines.push(format!("  Total repositories: {}", self.results.len()));
            lines.push(format!("  Successful:         {}", self.successful()));
            lines.push(format!("  Failed:             {}", self.total));
            lines.push(format!("  Recoverable:        {}", self.recoverable));
            lines.push(String::new());
            lines.push(style("Errors by category").bold().to_string());
            let mut categories: Vec<(String, usize)> = self
                .by_category
                .iter()
                .map(|(category, count)| (category.to_string(), *count))
                .collect();
            categories.sort();
            for (category, count) in categories {
                lines.push(format!("  {:<16} {}", category, count));
            }
        }

        if !self.results.is_empty() {
            lines.push(String::new());
            lines.push(style("Results").bold().to_string());
            for result in &self.results {
                lines.push(format!(
                    "  {} {}: {}",
                    marker(result),
                    result.repository,
                    result.message
                ));
                if let Some(err) = &result.error {
                    lines.push(format!("      {}", style(err.user_message()).dim()));
                }
            }
        }

        let mut out = lines.join("\n");
        out.push('\n');
        out
    }
}

fn marker(result: &ProcessingResult) -> console::StyledObject<&'static str> {
    match &result.error {
        None if result.skipped => style("⏭").cyan(),
        None => style("✓").green(),
        Some(_) if result.skipped => style("⏭").cyan(),
        Some(err) if err.recoverable => style("⚠").yellow(),
        Some(_) => style("✗").red(),
    }
}

impl FromIterator<ProcessingResult> for ErrorSummary {
    fn from_iter<I: IntoIterator<Item = ProcessingResult>>(iter: I) -> Self {
        let mut summary = Self::new();
        for result in iter {
            summary.add_result(result);
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProcessingError;

    fn sample() -> ErrorSummary {
        vec![
            ProcessingResult::created("acme/a", "PR #1 opened"),
            ProcessingResult::skipped("acme/b", "no manifest"),
            ProcessingResult::skipped_with(
                "acme/c",
                "component exists",
                ProcessingError::entity_exists("acme/c", "c"),
            ),
            ProcessingResult::failed(
                "acme/d",
                "rate limited",
                ProcessingError::rate_limited("acme/d"),
            ),
            ProcessingResult::failed(
                "acme/e",
                "missing",
                ProcessingError::repository_not_found("acme/e"),
            ),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_counts_only_results_with_errors() {
        let summary = sample();
        assert_eq!(summary.processed(), 5);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.successful(), 2);
        assert_eq!(summary.recoverable, 1);
        assert_eq!(summary.by_category[&ErrorCategory::Entity], 1);
        assert_eq!(summary.by_category[&ErrorCategory::Network], 1);
        assert_eq!(summary.by_type[&ErrorType::RepositoryNotFound], 1);
        assert_eq!(summary.count_action(Action::Failed), 2);
        assert!(!summary.is_success());
    }

    #[test]
    fn test_empty_summary_succeeds() {
        let summary: ErrorSummary = vec![ProcessingResult::skipped("acme/a", "nothing")]
            .into_iter()
            .collect();
        assert!(summary.is_success());
        assert!(summary.render().contains("processed successfully"));
    }

    #[test]
    fn test_render_lists_categories_in_order() {
        let text = sample().render();
        let entity = text.find("ENTITY").unwrap();
        let network = text.find("NETWORK").unwrap();
        let repo = text.find("REPOSITORY").unwrap();
        assert!(entity < network && network < repo);
        assert!(text.contains("acme/e: missing"));
        assert!(text.contains("was not found"));
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["total"], 3);
        assert_eq!(json["by_category"]["ENTITY"], 1);
        assert_eq!(json["by_type"]["RATE_LIMIT"], 1);
        assert_eq!(json["results"].as_array().unwrap().len(), 5);
    }
}
