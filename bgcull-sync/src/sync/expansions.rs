//! Expansion-link synchronization
//!
//! **Two paths:**
//! 1. A single trial batch goes to the catalog
//! 2. If the catalog denies it, the run switches to name matching for every
//!    needed identifier in one pass and ends (`method = name-match`)
//! 3. Otherwise the run stays on the catalog path (`method = api`), batching
//!    through the rest with a fixed pause between batches
//!
//! A denial after catalog data has started flowing ends the run early with the
//! partial results kept; the name matcher is not brought in mid-run so one run
//! never mixes coverage semantics.

use super::{StartOutcome, SyncCore, SyncMethod, SyncStatus, SyncTiming};
use crate::catalog::{CatalogClient, MAX_BATCH_SIZE};
use crate::matcher::match_by_name;
use crate::store::CacheMap;
use bgcull_common::collection::{ExpansionLink, ItemId, NamedItem};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Cache document name under the cache directory
pub const EXPANSIONS_FILE: &str = "expansions.json";

/// Coordinator for the "is an expansion of" dataset
#[derive(Clone)]
pub struct ExpansionSync {
    core: Arc<SyncCore<Vec<ExpansionLink>>>,
    catalog: CatalogClient,
    pacing: Duration,
}

impl ExpansionSync {
    pub fn new(cache_path: PathBuf, catalog: CatalogClient, timing: &SyncTiming) -> Self {
        Self {
            core: Arc::new(SyncCore::new("expansions", cache_path)),
            catalog,
            pacing: timing.expansion_pacing,
        }
    }

    /// Start a background run for `requested` unless one is active
    ///
    /// `items` (names) are only consulted if the catalog denies access.
    pub async fn start(&self, requested: &[ItemId], items: Vec<NamedItem>) -> StartOutcome {
        let needed = match self.core.try_begin(requested).await {
            Ok(needed) => needed,
            Err(outcome) => return outcome,
        };
        let total = needed.len();

        let this = self.clone();
        SyncCore::spawn_supervised(&self.core, async move {
            this.run(needed, items).await;
        })
        .await;

        StartOutcome::Started { total }
    }

    pub async fn status(&self) -> SyncStatus {
        self.core.status().await
    }

    /// Cache contents plus status, as served to pollers
    pub async fn snapshot(&self) -> (CacheMap<Vec<ExpansionLink>>, SyncStatus) {
        self.core.snapshot().await
    }

    pub fn is_running(&self) -> bool {
        self.core.is_running()
    }

    pub async fn wait_until_idle(&self) {
        self.core.wait_until_idle().await
    }

    async fn run(&self, needed: Vec<ItemId>, items: Vec<NamedItem>) {
        let mut batches = needed.chunks(MAX_BATCH_SIZE);
        let Some(trial) = batches.next() else {
            return;
        };

        match self.catalog.fetch_expansions(trial).await {
            Err(e) if e.is_unauthorized() => {
                warn!(error = %e, "Catalog denied expansion lookups, falling back to name matching");
                self.run_name_match(&needed, &items).await;
                return;
            }
            Ok(found) => {
                self.core.set_method(SyncMethod::Api).await;
                debug!(requested = trial.len(), resolved = found.len(), "Trial batch succeeded");
                self.core.merge_and_flush(found).await;
            }
            Err(e) => {
                // Not a denial: this batch just yields nothing this round
                self.core.set_method(SyncMethod::Api).await;
                warn!(error = %e, count = trial.len(), "Trial batch failed, continuing on catalog path");
            }
        }
        self.core.advance(trial.len()).await;

        for (index, batch) in batches.enumerate() {
            tokio::time::sleep(self.pacing).await;

            match self.catalog.fetch_expansions(batch).await {
                Ok(found) => {
                    debug!(batch = index + 1, resolved = found.len(), "Expansion batch merged");
                    self.core.merge_and_flush(found).await;
                }
                Err(e) if e.is_unauthorized() => {
                    warn!(
                        dataset = self.core.dataset(),
                        error = %e,
                        batch = index + 1,
                        "Catalog denied access mid-run, stopping with partial results"
                    );
                    break;
                }
                Err(e) => {
                    warn!(error = %e, batch = index + 1, count = batch.len(), "Expansion batch failed, skipping");
                }
            }
            self.core.advance(batch.len()).await;
        }
    }

    /// Resolve every needed identifier from item names in one pass
    async fn run_name_match(&self, needed: &[ItemId], items: &[NamedItem]) {
        if items.is_empty() {
            warn!(
                needed = needed.len(),
                "No item names supplied, cannot fall back to name matching; leaving entries unresolved"
            );
            return;
        }

        let mut matched = match_by_name(items);
        let linked = matched.values().filter(|links| !links.is_empty()).count();

        self.core.set_method(SyncMethod::NameMatch).await;
        self.core
            .merge_and_flush(
                needed
                    .iter()
                    .map(|id| (*id, matched.remove(id).unwrap_or_default())),
            )
            .await;
        self.core.advance(needed.len()).await;

        info!(
            needed = needed.len(),
            items = items.len(),
            linked,
            "Name matching resolved expansion links"
        );
    }
}
