//! Box-dimension synchronization
//!
//! Single path: batch through every needed identifier with a fixed pause between
//! batches. There is no fallback; a catalog denial stops the run with whatever
//! was cached so far. `method` turns to `api` only once the catalog has answered
//! a batch. Identifiers the catalog has no usable data for stay absent, and
//! readers substitute [`DEFAULT_BOX_VOLUME`].

use super::{StartOutcome, SyncCore, SyncMethod, SyncStatus, SyncTiming};
use crate::catalog::{CatalogClient, MAX_BATCH_SIZE};
use crate::store::CacheMap;
use bgcull_common::collection::{BoxDimensions, ItemId};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Cache document name under the cache directory
pub const DIMENSIONS_FILE: &str = "dimensions.json";

/// Volume (cubic inches) assumed for items without cached dimensions: a 12x12x3 box
pub const DEFAULT_BOX_VOLUME: f64 = 432.0;

/// Coordinator for the box-dimension dataset
#[derive(Clone)]
pub struct DimensionSync {
    core: Arc<SyncCore<BoxDimensions>>,
    catalog: CatalogClient,
    pacing: Duration,
}

impl DimensionSync {
    pub fn new(cache_path: PathBuf, catalog: CatalogClient, timing: &SyncTiming) -> Self {
        Self {
            core: Arc::new(SyncCore::new("dimensions", cache_path)),
            catalog,
            pacing: timing.dimension_pacing,
        }
    }

    /// Start a background run for `requested` unless one is active
    pub async fn start(&self, requested: &[ItemId]) -> StartOutcome {
        let needed = match self.core.try_begin(requested).await {
            Ok(needed) => needed,
            Err(outcome) => return outcome,
        };
        let total = needed.len();

        let this = self.clone();
        SyncCore::spawn_supervised(&self.core, async move {
            this.run(needed).await;
        })
        .await;

        StartOutcome::Started { total }
    }

    pub async fn status(&self) -> SyncStatus {
        self.core.status().await
    }

    pub async fn snapshot(&self) -> (CacheMap<BoxDimensions>, SyncStatus) {
        self.core.snapshot().await
    }

    pub fn is_running(&self) -> bool {
        self.core.is_running()
    }

    pub async fn wait_until_idle(&self) {
        self.core.wait_until_idle().await
    }

    async fn run(&self, needed: Vec<ItemId>) {
        let mut catalog_answered = false;

        for (index, batch) in needed.chunks(MAX_BATCH_SIZE).enumerate() {
            if index > 0 {
                tokio::time::sleep(self.pacing).await;
            }

            match self.catalog.fetch_dimensions(batch).await {
                Ok(found) => {
                    if !catalog_answered {
                        catalog_answered = true;
                        self.core.set_method(SyncMethod::Api).await;
                    }
                    debug!(batch = index, requested = batch.len(), resolved = found.len(), "Dimension batch merged");
                    self.core.merge_and_flush(found).await;
                }
                Err(e) if e.is_unauthorized() => {
                    warn!(
                        dataset = self.core.dataset(),
                        error = %e,
                        batch = index,
                        "Catalog denied dimension lookups, stopping with partial results"
                    );
                    break;
                }
                Err(e) => {
                    warn!(error = %e, batch = index, count = batch.len(), "Dimension batch failed, skipping");
                }
            }
            self.core.advance(batch.len()).await;
        }
    }
}
