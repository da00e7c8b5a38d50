//! State Command
//!
//! Inspect and maintain the processing ledger.
//!
//! Usage:
//!   catalog-onboarder state stats [-f json]
//!   catalog-onboarder state list [--status success|error|in_progress]
//!   catalog-onboarder state reset <repo>
//!   catalog-onboarder state reset-all
//!   catalog-onboarder state cleanup --older-than-days N
//!   catalog-onboarder state export <path>
//!   catalog-onboarder state import <path>

use std::path::Path;

use crate::cli::Output;
use crate::config::ConfigLoader;
use crate::state::{RepoStatus, StateStore};
use crate::types::{OnboardError, Result};

/// Open the ledger named by the effective configuration
pub fn open_store(config_path: Option<&Path>) -> Result<StateStore> {
    let config = ConfigLoader::load(config_path)?;
    Ok(StateStore::open(&config.runtime.state_file))
}

pub fn stats(store: &StateStore, json: bool, out: Output) -> Result<()> {
    let stats = store.stats();
    if json {
        out.raw(&serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    out.header("Processing Ledger");
    if let Some(path) = store.path() {
        out.field("File", path.display());
    }
    out.field("Repositories", stats.total);
    out.field("Successful", stats.successful);
    out.field("Failed", stats.failed);
    out.field("In progress", stats.in_progress);
    out.field(
        "Last run",
        stats
            .last_run
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "never".to_string()),
    );
    Ok(())
}

pub fn list(store: &StateStore, status: Option<RepoStatus>, json: bool, out: Output) -> Result<()> {
    let entries: Vec<_> = store
        .list_all()
        .into_iter()
        .filter(|(_, state)| status.is_none_or(|s| state.status == s))
        .collect();

    if json {
        let map: std::collections::BTreeMap<_, _> = entries.into_iter().collect();
        out.raw(&serde_json::to_string_pretty(&map)?);
        return Ok(());
    }

    if entries.is_empty() {
        out.info("No ledger entries");
        return Ok(());
    }
    for (repo, state) in entries {
        let line = format!(
            "{:<40} {:<12} {}",
            repo,
            state.status.to_string(),
            state.last_processed.format("%Y-%m-%d %H:%M:%S")
        );
        match &state.error {
            Some(error) => out.raw(&format!("{}  {}", line, error)),
            None => out.raw(&line),
        }
    }
    Ok(())
}

pub fn reset(store: &StateStore, repo: &str, out: Output) -> Result<()> {
    if store.reset(repo) {
        out.success(&format!("Reset {}", repo));
        Ok(())
    } else {
        Err(OnboardError::State(format!("No ledger entry for {}", repo)))
    }
}

pub fn reset_all(store: &StateStore, out: Output) -> Result<()> {
    let removed = store.reset_all();
    out.success(&format!("Removed {} ledger entries", removed));
    Ok(())
}

pub fn cleanup(store: &StateStore, older_than_days: i64, out: Output) -> Result<()> {
    if older_than_days < 0 {
        return Err(OnboardError::State(
            "--older-than-days must not be negative".to_string(),
        ));
    }
    let max_age = chrono::Duration::try_days(older_than_days).ok_or_else(|| {
        OnboardError::State(format!("--older-than-days {} is too large", older_than_days))
    })?;
    let removed = store.cleanup_older_than(max_age)?;
    out.success(&format!(
        "Removed {} entries older than {} days",
        removed, older_than_days
    ));
    Ok(())
}

pub fn export(store: &StateStore, path: &Path, out: Output) -> Result<()> {
    store.export_to(path)?;
    out.success(&format!("Exported ledger to {}", path.display()));
    Ok(())
}

pub fn import(store: &StateStore, path: &Path, out: Output) -> Result<()> {
    let count = store.import_from(path)?;
    out.success(&format!(
        "Imported {} entries from {}",
        count,
        path.display()
    ));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn quiet() -> Output {
        Output::new(true)
    }

    #[test]
    fn test_reset_unknown_repo_errors() {
        let store = StateStore::in_memory();
        assert!(reset(&store, "acme/missing", quiet()).is_err());

        store.record_success("acme/api", None);
        assert!(reset(&store, "acme/api", quiet()).is_ok());
        assert!(store.get("acme/api").is_none());
    }

    #[test]
    fn test_cleanup_rejects_negative_age() {
        let store = StateStore::in_memory();
        assert!(cleanup(&store, -1, quiet()).is_err());
        assert!(cleanup(&store, 0, quiet()).is_ok());
    }

    #[test]
    fn test_cleanup_rejects_huge_age() {
        let store = StateStore::in_memory();
        store.record_success("acme/api", None);
        assert!(cleanup(&store, 100_000_000, quiet()).is_err());
        assert!(cleanup(&store, i64::MAX, quiet()).is_err());
        assert!(store.get("acme/api").is_some());
    }

    #[test]
    fn test_export_then_import_into_other_store() {
        let dir = TempDir::new().unwrap();
        let source = StateStore::open(dir.path().join("a.json"));
        source.record_success("acme/api", None);
        source.record_error("acme/web", "boom");

        let exported = dir.path().join("export.json");
        export(&source, &exported, quiet()).unwrap();

        let target = StateStore::open(dir.path().join("b.json"));
        import(&target, &exported, quiet()).unwrap();
        assert_eq!(target.stats().total, 2);
        assert_eq!(target.get("acme/web").unwrap().status, RepoStatus::Error);
    }
}
