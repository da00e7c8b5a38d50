//! Processing Ledger
//!
//! Durable record of the last outcome per repository. Decides whether a
//! repository can be skipped on this run:
//!
//! - failed less than 24 hours ago: skip
//! - succeeded less than 7 days ago and not pushed since: skip
//! - anything else: process
//!
//! Every mutation is written through to disk while the write lock is held.
//! A failed write is logged and the in-memory ledger stays authoritative.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, info, warn};

use crate::constants::ledger::{
    ERROR_RETRY_WINDOW_HOURS, MAX_ERROR_MESSAGE_CHARS, SUCCESS_RECHECK_DAYS,
};
use crate::types::{OnboardError, Result, ResultExt};

// =============================================================================
// Ledger Records
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepoStatus {
    Success,
    Error,
    InProgress,
}

impl std::fmt::Display for RepoStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RepoStatus::Success => write!(f, "success"),
            RepoStatus::Error => write!(f, "error"),
            RepoStatus::InProgress => write!(f, "in_progress"),
        }
    }
}

/// Last known outcome for one repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoState {
    pub last_processed: DateTime<Utc>,
    #[serde(default)]
    pub last_commit: String,
    pub status: RepoStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Why a repository was or was not skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipDecision {
    /// No prior record
    New,
    /// Failed inside the retry window
    RecentError,
    /// Failed long enough ago to retry
    ErrorExpired,
    /// Pushed after the last successful run
    ChangedSinceSuccess,
    /// Succeeded inside the recheck window
    RecentSuccess,
    /// Succeeded long enough ago to recheck
    SuccessExpired,
    /// Interrupted run; treated like an unknown record
    InProgress,
}

impl SkipDecision {
    pub fn should_skip(self) -> bool {
        matches!(self, Self::RecentError | Self::RecentSuccess)
    }
}

impl RepoState {
    /// Evaluate the skip rules against `now`
    pub fn skip_decision(
        &self,
        freshness: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> SkipDecision {
        let age = now - self.last_processed;
        match self.status {
            RepoStatus::Error => {
                if age < Duration::hours(ERROR_RETRY_WINDOW_HOURS) {
                    SkipDecision::RecentError
                } else {
                    SkipDecision::ErrorExpired
                }
            }
            RepoStatus::Success => {
                if freshness.is_some_and(|pushed| pushed > self.last_processed) {
                    SkipDecision::ChangedSinceSuccess
                } else if age < Duration::days(SUCCESS_RECHECK_DAYS) {
                    SkipDecision::RecentSuccess
                } else {
                    SkipDecision::SuccessExpired
                }
            }
            RepoStatus::InProgress => SkipDecision::InProgress,
        }
    }
}

/// On-disk ledger document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ledger {
    pub last_run: Option<DateTime<Utc>>,
    pub processed_repos: BTreeMap<String, RepoState>,
}

/// Lenient view used when reading: `processed_repos` may be absent or null
#[derive(Debug, Deserialize)]
struct LedgerFile {
    #[serde(default)]
    last_run: Option<DateTime<Utc>>,
    #[serde(default)]
    processed_repos: Option<BTreeMap<String, RepoState>>,
}

/// Ledger counters
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LedgerStats {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub in_progress: usize,
    pub last_run: Option<DateTime<Utc>>,
}

fn truncate_message(message: &str) -> String {
    if message.chars().count() > MAX_ERROR_MESSAGE_CHARS {
        let mut cut: String = message.chars().take(MAX_ERROR_MESSAGE_CHARS).collect();
        cut.push_str("...");
        cut
    } else {
        message.to_string()
    }
}

// =============================================================================
// State Store
// =============================================================================

/// Thread-safe ledger with write-through persistence
pub struct StateStore {
    path: Option<PathBuf>,
    ledger: RwLock<Ledger>,
}

impl std::fmt::Debug for StateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateStore")
            .field("path", &self.path)
            .field("entries", &self.read().processed_repos.len())
            .finish()
    }
}

impl StateStore {
    /// Open the ledger at `path`. A missing or unreadable file yields an
    /// empty ledger.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let ledger = match Self::load(&path) {
            Ok(Some(ledger)) => {
                debug!(
                    "Loaded ledger with {} entries from {}",
                    ledger.processed_repos.len(),
                    path.display()
                );
                ledger
            }
            Ok(None) => {
                debug!("No ledger at {}, starting fresh", path.display());
                Ledger::default()
            }
            Err(e) => {
                warn!("Failed to load ledger {}: {}. Starting fresh", path.display(), e);
                Ledger::default()
            }
        };

        Self {
            path: Some(path),
            ledger: RwLock::new(ledger),
        }
    }

    /// Ledger that never touches disk
    pub fn in_memory() -> Self {
        Self {
            path: None,
            ledger: RwLock::new(Ledger::default()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn load(path: &Path) -> Result<Option<Ledger>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)
            .with_context_fn(|| format!("Failed to read {}", path.display()))?;
        let file: LedgerFile = serde_json::from_str(&content)?;
        Ok(Some(Ledger {
            last_run: file.last_run,
            processed_repos: file.processed_repos.unwrap_or_default(),
        }))
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Ledger> {
        self.ledger.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Ledger> {
        self.ledger.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Write the ledger to a sibling temp file, then rename over the target
    fn persist(path: &Path, ledger: &mut Ledger) -> Result<()> {
        ledger.last_run = Some(Utc::now());
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(&*ledger)?;
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, data).with_context_fn(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, path)
            .with_context_fn(|| format!("Failed to replace {}", path.display()))?;
        Ok(())
    }

    /// Apply `mutate` and persist while still holding the write lock
    fn mutate<R>(&self, mutate: impl FnOnce(&mut Ledger) -> R) -> R {
        let mut ledger = self.write();
        let out = mutate(&mut *ledger);
        if let Some(path) = &self.path
            && let Err(e) = Self::persist(path, &mut *ledger)
        {
            warn!("Failed to persist ledger {}: {}", path.display(), e);
        }
        out
    }

    // =========================================================================
    // Pipeline Operations
    // =========================================================================

    /// Whether `repo` can be skipped this run
    pub fn should_skip(&self, repo: &str, freshness: Option<DateTime<Utc>>) -> bool {
        self.skip_decision(repo, freshness, Utc::now()).should_skip()
    }

    /// Skip decision at an explicit point in time
    pub fn skip_decision(
        &self,
        repo: &str,
        freshness: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> SkipDecision {
        let ledger = self.read();
        let decision = ledger
            .processed_repos
            .get(repo)
            .map(|state| state.skip_decision(freshness, now))
            .unwrap_or(SkipDecision::New);
        debug!(repo, ?decision, "Ledger skip decision");
        decision
    }

    /// Mark `repo` as being processed; keeps the commit and clears the error
    pub fn record_in_progress(&self, repo: &str) {
        self.mutate(|ledger| {
            let now = Utc::now();
            let entry = ledger
                .processed_repos
                .entry(repo.to_string())
                .or_insert_with(|| RepoState {
                    last_processed: now,
                    last_commit: String::new(),
                    status: RepoStatus::InProgress,
                    error: None,
                });
            entry.last_processed = now;
            entry.status = RepoStatus::InProgress;
            entry.error = None;
        });
    }

    /// Record a successful (or gracefully skipped) outcome.
    ///
    /// The timestamp never precedes `freshness`, so a push observed during
    /// this run does not trigger reprocessing on the next one.
    pub fn record_success(&self, repo: &str, freshness: Option<DateTime<Utc>>) {
        let now = Utc::now();
        let last_processed = freshness.map_or(now, |pushed| pushed.max(now));
        self.mutate(|ledger| {
            ledger.processed_repos.insert(
                repo.to_string(),
                RepoState {
                    last_processed,
                    last_commit: String::new(),
                    status: RepoStatus::Success,
                    error: None,
                },
            );
        });
    }

    /// Record a failed outcome; long messages are truncated
    pub fn record_error(&self, repo: &str, message: &str) {
        let error = truncate_message(message);
        self.mutate(|ledger| {
            ledger.processed_repos.insert(
                repo.to_string(),
                RepoState {
                    last_processed: Utc::now(),
                    last_commit: String::new(),
                    status: RepoStatus::Error,
                    error: Some(error),
                },
            );
        });
    }

    // =========================================================================
    // Administration
    // =========================================================================

    pub fn stats(&self) -> LedgerStats {
        let ledger = self.read();
        let mut stats = LedgerStats {
            total: ledger.processed_repos.len(),
            last_run: ledger.last_run,
            ..Default::default()
        };
        for state in ledger.processed_repos.values() {
            match state.status {
                RepoStatus::Success => stats.successful += 1,
                RepoStatus::Error => stats.failed += 1,
                RepoStatus::InProgress => stats.in_progress += 1,
            }
        }
        stats
    }

    pub fn get(&self, repo: &str) -> Option<RepoState> {
        self.read().processed_repos.get(repo).cloned()
    }

    pub fn list_all(&self) -> BTreeMap<String, RepoState> {
        self.read().processed_repos.clone()
    }

    /// Forget one repository; returns whether it was present
    pub fn reset(&self, repo: &str) -> bool {
        let removed = self.mutate(|ledger| ledger.processed_repos.remove(repo).is_some());
        if removed {
            info!("Reset ledger entry for {}", repo);
        }
        removed
    }

    /// Forget every repository; returns how many were removed
    pub fn reset_all(&self) -> usize {
        let removed = self.mutate(|ledger| {
            let count = ledger.processed_repos.len();
            ledger.processed_repos.clear();
            count
        });
        info!("Reset {} ledger entries", removed);
        removed
    }

    /// Drop entries last processed more than `max_age` ago
    pub fn cleanup_older_than(&self, max_age: Duration) -> Result<usize> {
        let cutoff = Utc::now().checked_sub_signed(max_age).ok_or_else(|| {
            OnboardError::State(format!("Cleanup age of {} is out of range", max_age))
        })?;
        let removed = self.mutate(|ledger| {
            let before = ledger.processed_repos.len();
            ledger
                .processed_repos
                .retain(|_, state| state.last_processed >= cutoff);
            before - ledger.processed_repos.len()
        });
        info!("Removed {} ledger entries older than {}", removed, cutoff);
        Ok(removed)
    }

    /// Write a copy of the ledger to `path`
    pub fn export_to(&self, path: &Path) -> Result<()> {
        let ledger = self.read();
        let data = serde_json::to_vec_pretty(&*ledger)?;
        fs::write(path, data)
            .with_context_fn(|| format!("Failed to export ledger to {}", path.display()))?;
        info!(
            "Exported {} ledger entries to {}",
            ledger.processed_repos.len(),
            path.display()
        );
        Ok(())
    }

    /// Replace the ledger with the contents of `path`
    pub fn import_from(&self, path: &Path) -> Result<usize> {
        let content = fs::read_to_string(path)
            .with_context_fn(|| format!("Failed to read {}", path.display()))?;
        let file: LedgerFile = serde_json::from_str(&content)?;
        let processed_repos = file.processed_repos.ok_or_else(|| {
            OnboardError::State(format!(
                "Invalid ledger file {}: missing processed_repos",
                path.display()
            ))
        })?;
        let count = processed_repos.len();
        self.mutate(|ledger| {
            ledger.last_run = file.last_run;
            ledger.processed_repos = processed_repos;
        });
        info!("Imported {} ledger entries from {}", count, path.display());
        Ok(count)
    }

    /// Final flush
    pub fn close(&self) -> Result<()> {
        if let Some(path) = &self.path {
            let mut ledger = self.write();
            Self::persist(path, &mut *ledger)?;
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
