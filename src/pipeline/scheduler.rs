//! Worker Pool
//!
//! Runs a strategy over a repository list with a bounded number of
//! long-lived workers pulling from one shared queue. Each worker waits the
//! configured delay before every item, consults the ledger, invokes the
//! strategy and records the outcome. Results arrive in completion order.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn};

use super::result::{Action, ProcessingResult};
use super::summary::ErrorSummary;
use crate::constants::scheduler::{DEFAULT_CONCURRENCY, DEFAULT_RATE_LIMIT_MS};
use crate::state::{SharedStateStore, StateStore};
use crate::strategy::SharedStrategy;
use crate::types::{ProcessingError, Repository};

#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    /// Maximum repositories processed at once (values below 1 act as 1)
    pub concurrency: usize,
    /// Delay before each dispatch, per worker
    pub rate_limit: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            rate_limit: Duration::from_millis(DEFAULT_RATE_LIMIT_MS),
        }
    }
}

/// Cooperative stop flag; workers finish their current item and exit
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal(Arc<AtomicBool>);

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Outcome of one scheduler run
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Results in completion order
    pub results: Vec<ProcessingResult>,
    /// Repositories never handed to a worker (shutdown)
    pub undispatched: usize,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn summary(&self) -> ErrorSummary {
        self.results.iter().cloned().collect()
    }
}

pub struct Scheduler {
    strategy: SharedStrategy,
    store: SharedStateStore,
    config: SchedulerConfig,
    shutdown: ShutdownSignal,
}

impl Scheduler {
    pub fn new(strategy: SharedStrategy, store: SharedStateStore, config: SchedulerConfig) -> Self {
        Self {
            strategy,
            store,
            config,
            shutdown: ShutdownSignal::new(),
        }
    }

    /// Handle that stops further dispatches when triggered
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    #[instrument(skip_all, fields(repos = repos.len(), strategy = self.strategy.name()))]
    pub async fn run(&self, repos: Vec<Repository>) -> RunReport {
        let start = Instant::now();
        let total = repos.len();
        if total == 0 {
            return RunReport::default();
        }

        let workers = self.config.concurrency.clamp(1, total);
        info!(
            "Processing {} repositories with {} workers ({}ms delay)",
            total,
            workers,
            self.config.rate_limit.as_millis()
        );

        let queue = Arc::new(Mutex::new(VecDeque::from(repos)));
        let (tx, mut rx) = mpsc::channel::<ProcessingResult>(total);
        let mut pool = JoinSet::new();

        for worker_id in 0..workers {
            let queue = Arc::clone(&queue);
            let tx = tx.clone();
            let strategy = Arc::clone(&self.strategy);
            let store = Arc::clone(&self.store);
            let shutdown = self.shutdown.clone();
            let delay = self.config.rate_limit;

            pool.spawn(async move {
                loop {
                    if shutdown.is_triggered() {
                        debug!(worker_id, "Shutdown requested, worker stopping");
                        break;
                    }
                    let next = queue
                        .lock()
                        .unwrap_or_else(|poisoned| poisoned.into_inner())
                        .pop_front();
                    let Some(repo) = next else { break };

                    tokio::time::sleep(delay).await;
                    let result = process_one(&strategy, &store, repo).await;
                    if tx.send(result).await.is_err() {
                        break;
                    }
                }
            });
        }
        drop(tx);

        let mut results = Vec::with_capacity(total);
        while let Some(result) = rx.recv().await {
            results.push(result);
        }
        while let Some(joined) = pool.join_next().await {
            if let Err(e) = joined {
                warn!("Worker terminated abnormally: {}", e);
            }
        }

        let undispatched = queue
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len();
        if undispatched > 0 {
            warn!("{} repositories were not dispatched", undispatched);
        }

        RunReport {
            results,
            undispatched,
            elapsed: start.elapsed(),
        }
    }
}

/// Ledger check, strategy call and ledger update for one repository.
/// The strategy runs in its own task; a panic becomes a failed result.
async fn process_one(
    strategy: &SharedStrategy,
    store: &StateStore,
    repo: Repository,
) -> ProcessingResult {
    let freshness = repo.freshness();
    let id = repo.full_name.clone();
    if store.should_skip(&id, freshness) {
        return ProcessingResult::skipped(&id, "Skipped: recently processed");
    }

    store.record_in_progress(&id);
    let task = {
        let strategy = Arc::clone(strategy);
        tokio::spawn(async move { strategy.process(&repo).await })
    };
    let result = match task.await {
        Ok(result) => result,
        Err(e) => {
            error!(repo = %id, "Strategy task failed: {}", e);
            ProcessingResult::failed(
                &id,
                "Strategy aborted unexpectedly",
                ProcessingError::unknown(&id, &e.to_string()),
            )
        }
    };
    let id = id.as_str();

    if result.action == Action::Failed {
        let message = result
            .error
            .as_ref()
            .map(|e| e.to_string())
            .unwrap_or_else(|| result.message.clone());
        store.record_error(id, &message);
    } else {
        store.record_success(id, freshness);
    }

    debug!(repo = id, action = %result.action, "Repository processed");
    result
}
