//! Background catalog synchronization
//!
//! One coordinator per derived dataset ([`ExpansionSync`], [`DimensionSync`]),
//! each constructed once at startup and shared through `AppState`.
//!
//! **Lifecycle:** `Idle -> Running -> Idle`
//! - A start request while `Running` is a silent no-op
//! - On start: load the cache, compute `needed = requested - cached`; nothing
//!   needed means straight back to `Idle`
//! - The run is spawned detached; results are merged and flushed after every
//!   batch so a crash loses at most one batch
//! - However the run ends (completion, early stop, panic) the cache is flushed
//!   once more and the coordinator returns to `Idle`
//!
//! Failures never reach the caller that started the run; they are logged and
//! show up only as missing cache entries.

pub mod dimensions;
pub mod expansions;

pub use dimensions::{DimensionSync, DEFAULT_BOX_VOLUME};
pub use expansions::ExpansionSync;

use crate::catalog::default_retry_ladder;
use crate::store::{CacheMap, CacheStore};
use bgcull_common::collection::ItemId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// How the data of the current (or last) run was obtained
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncMethod {
    /// Authorized catalog path
    Api,
    /// Name-based heuristic fallback
    NameMatch,
    #[default]
    None,
}

/// Point-in-time progress snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub in_progress: bool,
    /// Identifiers processed so far in the current run
    pub fetched: usize,
    /// Identifiers the current run set out to resolve
    pub total: usize,
    /// Identifiers resolved in the cache
    pub cached: usize,
    pub method: SyncMethod,
}

/// Result of a start request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum StartOutcome {
    /// A background run was spawned for `total` identifiers
    Started { total: usize },
    /// A run is already active; nothing changed
    AlreadyRunning,
    /// Every requested identifier is already cached
    UpToDate,
}

/// Delays used by the coordinators and the catalog client
#[derive(Debug, Clone, PartialEq)]
pub struct SyncTiming {
    /// Backoff steps for "still preparing" responses
    pub retry_ladder: Vec<Duration>,
    /// Pause between expansion batches
    pub expansion_pacing: Duration,
    /// Pause between dimension batches
    pub dimension_pacing: Duration,
}

impl Default for SyncTiming {
    fn default() -> Self {
        Self {
            retry_ladder: default_retry_ladder(),
            expansion_pacing: Duration::from_millis(2500),
            dimension_pacing: Duration::from_secs(2),
        }
    }
}

impl SyncTiming {
    /// No delays at all (tests, local stubs)
    pub fn immediate() -> Self {
        Self {
            retry_ladder: vec![Duration::ZERO; 3],
            expansion_pacing: Duration::ZERO,
            dimension_pacing: Duration::ZERO,
        }
    }
}

#[derive(Debug, Default)]
struct Progress {
    fetched: usize,
    total: usize,
    method: SyncMethod,
}

/// State shared by both coordinators: cache, progress, single-flight guard
pub(crate) struct SyncCore<V> {
    dataset: &'static str,
    store: Mutex<CacheStore<V>>,
    progress: RwLock<Progress>,
    running: AtomicBool,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<V> SyncCore<V>
where
    V: Serialize + DeserializeOwned + Clone + Send + 'static,
{
    pub(crate) fn new(dataset: &'static str, cache_path: PathBuf) -> Self {
        Self {
            dataset,
            store: Mutex::new(CacheStore::new(cache_path)),
            progress: RwLock::new(Progress::default()),
            running: AtomicBool::new(false),
            task: Mutex::new(None),
        }
    }

    /// Enter `Running` and compute the identifiers still needed
    ///
    /// Returns the outcome to report instead when nothing should run.
    pub(crate) async fn try_begin(&self, requested: &[ItemId]) -> Result<Vec<ItemId>, StartOutcome> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            info!(dataset = self.dataset, "Sync already running, ignoring start request");
            return Err(StartOutcome::AlreadyRunning);
        }

        let needed: Vec<ItemId> = {
            let mut store = self.store.lock().await;
            let cached = store.get();
            let mut seen = HashSet::new();
            requested
                .iter()
                .copied()
                .filter(|id| !cached.contains_key(id) && seen.insert(*id))
                .collect()
        };

        if needed.is_empty() {
            self.running.store(false, Ordering::Release);
            info!(dataset = self.dataset, requested = requested.len(), "All requested identifiers already cached");
            return Err(StartOutcome::UpToDate);
        }

        *self.progress.write().await = Progress {
            fetched: 0,
            total: needed.len(),
            method: SyncMethod::None,
        };

        info!(
            dataset = self.dataset,
            requested = requested.len(),
            needed = needed.len(),
            "Starting background sync"
        );
        Ok(needed)
    }

    /// Spawn `run` detached, supervised so that `finish` always runs
    pub(crate) async fn spawn_supervised<F>(core: &Arc<Self>, run: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut slot = core.task.lock().await;
        let core = Arc::clone(core);
        *slot = Some(tokio::spawn(async move {
            if let Err(e) = tokio::spawn(run).await {
                error!(dataset = core.dataset, error = %e, "Background sync aborted");
            }
            core.finish().await;
        }));
    }

    /// Final flush and return to `Idle`
    async fn finish(&self) {
        self.flush().await;
        self.running.store(false, Ordering::Release);

        let progress = self.progress.read().await;
        info!(
            dataset = self.dataset,
            fetched = progress.fetched,
            total = progress.total,
            method = ?progress.method,
            "Background sync finished"
        );
    }

    /// Merge one batch and persist it immediately
    pub(crate) async fn merge_and_flush<I>(&self, partial: I)
    where
        I: IntoIterator<Item = (ItemId, V)>,
    {
        let mut store = self.store.lock().await;
        store.merge(partial);
        if let Err(e) = store.flush() {
            // In-memory state stays ahead of disk until the next successful flush
            warn!(dataset = self.dataset, error = %e, "Cache flush failed");
        }
    }

    async fn flush(&self) {
        if let Err(e) = self.store.lock().await.flush() {
            warn!(dataset = self.dataset, error = %e, "Cache flush failed");
        }
    }

    /// Count `n` more identifiers as processed (never exceeds `total`)
    pub(crate) async fn advance(&self, n: usize) {
        let mut progress = self.progress.write().await;
        progress.fetched = (progress.fetched + n).min(progress.total);
    }

    pub(crate) async fn set_method(&self, method: SyncMethod) {
        self.progress.write().await.method = method;
    }

    pub(crate) fn dataset(&self) -> &'static str {
        self.dataset
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub(crate) async fn status(&self) -> SyncStatus {
        let cached = self.store.lock().await.len();
        let progress = self.progress.read().await;
        SyncStatus {
            in_progress: self.is_running(),
            fetched: progress.fetched,
            total: progress.total,
            cached,
            method: progress.method,
        }
    }

    /// Copy of the cache contents plus status
    pub(crate) async fn snapshot(&self) -> (CacheMap<V>, SyncStatus) {
        let data = self.store.lock().await.get().clone();
        (data, self.status().await)
    }

    /// Wait for the current background run, if any, to finish
    pub(crate) async fn wait_until_idle(&self) {
        let handle = self.task.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!(dataset = self.dataset, error = %e, "Sync supervisor task failed");
            }
        }
    }
}
