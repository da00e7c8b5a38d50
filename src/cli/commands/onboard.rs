//! Onboard Command
//!
//! Discover repositories, filter them, optionally enrich them, then run the
//! selected strategy over the worker pool and report.
//!
//! Usage:
//!   catalog-onboarder onboard [--org ORG] [--mode yaml|api|register]
//!                             [--concurrency N] [--rate-limit-ms MS]
//!                             [--include PAT]... [--exclude PAT]...
//!                             [--dry-run] [--format text|json]

use futures::{StreamExt, stream};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::cli::Output;
use crate::config::{Config, ConfigLoader, OnboardingMode};
use crate::constants::network::ENRICH_CONCURRENCY;
use crate::pipeline::{Action, ErrorSummary, RunReport, Scheduler, SchedulerConfig};
use crate::remote::{
    CatalogClient, GitHubClient, RepositoryFilter, SharedCatalogApi, SharedManifestRemote,
    SharedRepositoryDirectory,
};
use crate::state::{SharedStateStore, StateStore};
use crate::strategy::{ManifestBuilder, build_strategy};
use crate::types::{Repository, Result};

/// Command-line overrides for one run
#[derive(Debug, Clone, Default)]
pub struct OnboardOptions {
    pub organization: Option<String>,
    pub mode: Option<OnboardingMode>,
    pub concurrency: Option<usize>,
    pub rate_limit_ms: Option<u64>,
    pub dry_run: bool,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub json: bool,
}

impl OnboardOptions {
    /// Layer the flags over the loaded configuration
    pub fn apply(&self, config: &mut Config) {
        if let Some(org) = &self.organization {
            config.source.organization = org.clone();
        }
        if let Some(mode) = self.mode {
            config.runtime.mode = mode;
        }
        if let Some(concurrency) = self.concurrency {
            config.runtime.concurrency = concurrency;
        }
        if let Some(rate_limit_ms) = self.rate_limit_ms {
            config.runtime.rate_limit_ms = rate_limit_ms;
        }
        if self.dry_run {
            config.runtime.dry_run = true;
        }
        if !self.include.is_empty() {
            config.runtime.include_repos = self.include.clone();
        }
        if !self.exclude.is_empty() {
            config.runtime.exclude_repos = self.exclude.clone();
        }
    }
}

/// Machine-readable run report
#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    mode: String,
    processed: usize,
    created: usize,
    updated: usize,
    registered: usize,
    skipped: usize,
    failed: usize,
    undispatched: usize,
    elapsed_ms: u128,
    summary: &'a ErrorSummary,
}

/// Discover, filter and (for modes that use repository metadata) enrich
pub async fn collect_repositories(
    config: &Config,
    directory: SharedRepositoryDirectory,
) -> Result<Vec<Repository>> {
    let runtime = &config.runtime;
    let filter = RepositoryFilter::new(&runtime.include_repos, &runtime.exclude_repos)?;

    let discovered = directory
        .discover(&config.source.organization, &runtime.include_repos)
        .await?;
    let discovered_count = discovered.len();
    let repos = filter.apply(discovered);
    info!(
        "{} of {} repositories selected",
        repos.len(),
        discovered_count
    );

    if !runtime.mode.needs_enrichment() {
        return Ok(repos);
    }

    let enriched: Vec<Repository> = stream::iter(repos)
        .map(|repo| {
            let directory = Arc::clone(&directory);
            async move {
                let name = repo.full_name.clone();
                match directory.enrich(repo).await {
                    Ok(repo) => Some(repo),
                    Err(e) => {
                        warn!("Failed to enrich {}: {}", name, e);
                        None
                    }
                }
            }
        })
        .buffer_unordered(ENRICH_CONCURRENCY)
        .filter_map(|repo| async move { repo })
        .collect()
        .await;

    Ok(enriched)
}

/// Run the configured strategy over `repos` and return the report
pub async fn execute(
    config: &Config,
    repos: Vec<Repository>,
    remote: SharedManifestRemote,
    catalog: SharedCatalogApi,
    store: SharedStateStore,
) -> RunReport {
    let strategy = build_strategy(
        config.runtime.mode,
        remote,
        catalog,
        ManifestBuilder::from_config(config),
    );
    let scheduler = Scheduler::new(
        strategy,
        store,
        SchedulerConfig {
            concurrency: config.runtime.concurrency,
            rate_limit: Duration::from_millis(config.runtime.rate_limit_ms),
        },
    );

    let shutdown = scheduler.shutdown_signal();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received; finishing in-flight repositories");
            shutdown.trigger();
        }
    });

    let report = scheduler.run(repos).await;
    interrupt.abort();
    report
}

/// Entry point. Returns whether the run finished without counted errors.
pub async fn run(config_path: Option<&Path>, options: OnboardOptions, out: Output) -> Result<bool> {
    let mut config = ConfigLoader::load(config_path)?;
    options.apply(&mut config);
    config.validate_for_run()?;

    let github = Arc::new(GitHubClient::new(&config.source)?);
    let repos = collect_repositories(&config, github.clone()).await?;

    if config.runtime.dry_run {
        print_dry_run(&config, &repos, out);
        return Ok(true);
    }
    if repos.is_empty() {
        out.warning("No repositories matched; nothing to do");
        return Ok(true);
    }

    let catalog: SharedCatalogApi = Arc::new(CatalogClient::new(&config.catalog)?);
    let store = Arc::new(StateStore::open(&config.runtime.state_file));

    out.info(&format!(
        "Onboarding {} repositories from {} (mode: {})",
        repos.len(),
        config.source.organization,
        config.runtime.mode
    ));
    let report = execute(&config, repos, github, catalog, Arc::clone(&store)).await;
    close_ledger(&store);

    print_report(&config, &report, options.json, out)?;
    Ok(report.summary().is_success())
}

/// Final ledger flush. Failures are logged; the run's outcome stands.
fn close_ledger(store: &StateStore) {
    if let Err(e) = store.close() {
        warn!("Failed to save processing ledger: {}", e);
    }
}

fn print_report(config: &Config, report: &RunReport, json: bool, out: Output) -> Result<()> {
    let summary = report.summary();
    if json {
        let json = JsonReport {
            mode: config.runtime.mode.to_string(),
            processed: summary.processed(),
            created: summary.count_action(Action::Created),
            updated: summary.count_action(Action::Updated),
            registered: summary.count_action(Action::Registered),
            skipped: summary.count_action(Action::Skipped),
            failed: summary.count_action(Action::Failed),
            undispatched: report.undispatched,
            elapsed_ms: report.elapsed.as_millis(),
            summary: &summary,
        };
        out.raw(&serde_json::to_string_pretty(&json)?);
        return Ok(());
    }

    out.raw(&summary.render());
    out.field("Created", summary.count_action(Action::Created));
    out.field("Updated", summary.count_action(Action::Updated));
    out.field("Registered", summary.count_action(Action::Registered));
    out.field("Skipped", summary.count_action(Action::Skipped));
    out.field("Failed", summary.count_action(Action::Failed));
    out.field("Elapsed", format!("{:.1}s", report.elapsed.as_secs_f64()));
    if report.undispatched > 0 {
        out.warning(&format!(
            "Interrupted: {} repositories were not processed",
            report.undispatched
        ));
    }
    Ok(())
}

fn print_dry_run(config: &Config, repos: &[Repository], out: Output) {
    out.header(&format!(
        "Dry run: {} repositories would be onboarded (mode: {})",
        repos.len(),
        config.runtime.mode
    ));
    for repo in repos {
        let language = repo.language.as_deref().unwrap_or("-");
        if repo.code_owners.is_empty() {
            out.raw(&format!("  {} ({})", repo.full_name, language));
        } else {
            out.raw(&format!(
                "  {} ({}) owners: {}",
                repo.full_name,
                language,
                repo.code_owners.join(", ")
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::fake::{FakeCatalog, FakeSource};
    use crate::state::RepoStatus;
    use crate::types::{ErrorCategory, ErrorType};

    fn config(mode: OnboardingMode) -> Config {
        let mut config = Config::default();
        config.source.organization = "acme".to_string();
        config.defaults.owner = "platform".to_string();
        config.runtime.mode = mode;
        config.runtime.concurrency = 3;
        config.runtime.rate_limit_ms = 1;
        config
    }

    fn source(names: &[&str]) -> FakeSource {
        FakeSource {
            repos: names
                .iter()
                .map(|n| Repository::new(format!("acme/{}", n)))
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_options_override_config() {
        let mut config = config(OnboardingMode::Yaml);
        OnboardOptions {
            organization: Some("globex".to_string()),
            mode: Some(OnboardingMode::Register),
            concurrency: Some(9),
            include: vec!["api*".to_string()],
            dry_run: true,
            ..Default::default()
        }
        .apply(&mut config);

        assert_eq!(config.source.organization, "globex");
        assert_eq!(config.runtime.mode, OnboardingMode::Register);
        assert_eq!(config.runtime.concurrency, 9);
        assert_eq!(config.runtime.rate_limit_ms, 1);
        assert_eq!(config.runtime.include_repos, vec!["api*"]);
        assert!(config.runtime.dry_run);
    }

    #[tokio::test]
    async fn test_collect_filters_and_enriches() {
        let mut fake = source(&["api", "web", "legacy"]);
        fake.repos[2].archived = true;
        let mut config = config(OnboardingMode::Api);
        config.runtime.exclude_repos = vec!["web".to_string()];

        let repos = collect_repositories(&config, Arc::new(fake)).await.unwrap();
        assert_eq!(repos.len(), 1);
        assert_eq!(repos[0].full_name, "acme/api");
        assert_eq!(repos[0].code_owners, vec!["platform-team"]);
    }

    #[tokio::test]
    async fn test_collect_skips_enrichment_for_register() {
        let config = config(OnboardingMode::Register);
        let repos = collect_repositories(&config, Arc::new(source(&["api"])))
            .await
            .unwrap();
        assert!(repos[0].code_owners.is_empty());
    }

    #[tokio::test]
    async fn test_create_entity_run_with_one_conflict() {
        let config = config(OnboardingMode::Api);
        let fake = Arc::new(source(&["orders", "billing", "search"]));
        let mut catalog = FakeCatalog::default();
        catalog.conflicts.insert("billing".to_string());
        let catalog = Arc::new(catalog);
        let store = Arc::new(StateStore::in_memory());

        let repos = collect_repositories(&config, fake.clone()).await.unwrap();
        let report = execute(&config, repos, fake, catalog.clone(), store.clone()).await;
        let summary = report.summary();

        assert_eq!(summary.processed(), 3);
        assert_eq!(summary.count_action(Action::Created), 2);
        assert_eq!(summary.count_action(Action::Skipped), 1);
        assert_eq!(summary.total, 1);
        assert_eq!(summary.by_category.get(&ErrorCategory::Entity), Some(&1));
        assert_eq!(summary.by_type.get(&ErrorType::EntityExists), Some(&1));
        assert_eq!(report.undispatched, 0);

        assert_eq!(catalog.entities.lock().unwrap().len(), 2);
        for repo in ["acme/orders", "acme/billing", "acme/search"] {
            assert_eq!(store.get(repo).unwrap().status, RepoStatus::Success);
        }
    }

    #[tokio::test]
    async fn test_unwritable_ledger_still_reports() {
        let dir = tempfile::TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();
        let store = Arc::new(StateStore::open(blocker.join("state.json")));

        let config = config(OnboardingMode::Api);
        let fake = Arc::new(source(&["orders", "billing"]));
        let catalog = Arc::new(FakeCatalog::default());
        let repos = collect_repositories(&config, fake.clone()).await.unwrap();
        let report = execute(&config, repos, fake, catalog, store.clone()).await;

        assert!(store.close().is_err());
        close_ledger(&store);
        assert!(print_report(&config, &report, true, Output::new(true)).is_ok());
        assert!(print_report(&config, &report, false, Output::new(true)).is_ok());

        let summary = report.summary();
        assert_eq!(summary.count_action(Action::Created), 2);
        assert!(summary.is_success());
        assert_eq!(store.get("acme/orders").unwrap().status, RepoStatus::Success);
    }

    #[tokio::test]
    async fn test_second_run_skips_recent_successes() {
        let config = config(OnboardingMode::Api);
        let fake = Arc::new(source(&["orders"]));
        let catalog = Arc::new(FakeCatalog::default());
        let store = Arc::new(StateStore::in_memory());

        let repos = collect_repositories(&config, fake.clone()).await.unwrap();
        let first = execute(&config, repos.clone(), fake.clone(), catalog.clone(), store.clone()).await;
        assert_eq!(first.summary().count_action(Action::Created), 1);

        let second = execute(&config, repos, fake, catalog, store).await;
        let summary = second.summary();
        assert_eq!(summary.count_action(Action::Skipped), 1);
        assert!(summary.is_success());
    }
}
