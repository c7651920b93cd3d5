//! Catalog service client
//!
//! One call covers one batch of at most [`MAX_BATCH_SIZE`] identifiers. The
//! service may answer "still preparing" (retried on a fixed backoff ladder),
//! deny the endpoint outright (surfaced as [`CatalogError::AuthorizationDenied`]
//! so the caller can end the run), or fail in any other way.
//!
//! Network access sits behind [`CatalogTransport`] so coordinators can be driven
//! by scripted transports in tests.

pub mod http;
pub mod parser;

pub use http::HttpCatalog;

use async_trait::async_trait;
use bgcull_common::collection::{BoxDimensions, ExpansionLink, ItemId};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Service's documented per-request identifier ceiling
pub const MAX_BATCH_SIZE: usize = 15;

/// Catalog client errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// Service is busy or still preparing the response; worth retrying
    #[error("Catalog temporarily unavailable (HTTP {0})")]
    TransientUnavailable(u16),

    /// Service denies this endpoint; no batch in this run will succeed
    #[error("Catalog denied access (HTTP {0})")]
    AuthorizationDenied(u16),

    /// Any other non-success status
    #[error("Catalog HTTP error {0}")]
    Http(u16),

    /// Request never produced a response
    #[error("Network error: {0}")]
    Network(String),

    /// Caller passed more identifiers than one request may carry
    #[error("Batch of {0} identifiers exceeds the limit of {MAX_BATCH_SIZE}")]
    BatchTooLarge(usize),
}

impl CatalogError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, CatalogError::AuthorizationDenied(_))
    }
}

/// Which facts a catalog request asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogQuery {
    /// Item records with their cross-reference links
    Expansions,
    /// Item records with physical version data
    Dimensions,
}

/// Raw access to the catalog service: one request, one payload
#[async_trait]
pub trait CatalogTransport: Send + Sync {
    async fn fetch(&self, ids: &[ItemId], query: CatalogQuery) -> Result<String, CatalogError>;
}

/// Default backoff ladder for "still preparing" responses
pub fn default_retry_ladder() -> Vec<Duration> {
    vec![
        Duration::from_secs(2),
        Duration::from_secs(4),
        Duration::from_secs(8),
    ]
}

/// Batched catalog reads with retry and parsing
#[derive(Clone)]
pub struct CatalogClient {
    transport: Arc<dyn CatalogTransport>,
    retry_ladder: Vec<Duration>,
}

impl CatalogClient {
    pub fn new(transport: Arc<dyn CatalogTransport>) -> Self {
        Self::with_retry_ladder(transport, default_retry_ladder())
    }

    pub fn with_retry_ladder(transport: Arc<dyn CatalogTransport>, retry_ladder: Vec<Duration>) -> Self {
        Self {
            transport,
            retry_ladder,
        }
    }

    /// Expansion links for one batch
    ///
    /// Every item present in the response maps to its (possibly empty) link list.
    pub async fn fetch_expansions(
        &self,
        ids: &[ItemId],
    ) -> Result<HashMap<ItemId, Vec<ExpansionLink>>, CatalogError> {
        match self.fetch_payload(ids, CatalogQuery::Expansions).await? {
            Some(payload) => Ok(parser::parse_expansions(&payload)),
            None => Ok(HashMap::new()),
        }
    }

    /// Box dimensions for one batch; items without usable data are absent
    pub async fn fetch_dimensions(
        &self,
        ids: &[ItemId],
    ) -> Result<HashMap<ItemId, BoxDimensions>, CatalogError> {
        match self.fetch_payload(ids, CatalogQuery::Dimensions).await? {
            Some(payload) => Ok(parser::parse_dimensions(&payload)),
            None => Ok(HashMap::new()),
        }
    }

    /// Issue the request, retrying transient failures along the ladder
    ///
    /// Returns `Ok(None)` once the ladder is exhausted: a batch that never became
    /// ready yields no data this round rather than failing the run.
    async fn fetch_payload(
        &self,
        ids: &[ItemId],
        query: CatalogQuery,
    ) -> Result<Option<String>, CatalogError> {
        if ids.len() > MAX_BATCH_SIZE {
            return Err(CatalogError::BatchTooLarge(ids.len()));
        }
        if ids.is_empty() {
            return Ok(None);
        }

        let mut attempt = 0;
        loop {
            match self.transport.fetch(ids, query).await {
                Ok(payload) => {
                    if attempt > 0 {
                        debug!(?query, attempt, "Catalog batch ready after retry");
                    }
                    return Ok(Some(payload));
                }
                Err(CatalogError::TransientUnavailable(status)) => {
                    let Some(delay) = self.retry_ladder.get(attempt) else {
                        warn!(
                            ?query,
                            status,
                            attempts = attempt + 1,
                            first_id = ids[0],
                            "Catalog batch still unavailable after retries, skipping"
                        );
                        return Ok(None);
                    };
                    debug!(?query, status, delay_ms = delay.as_millis() as u64, "Catalog busy, backing off");
                    tokio::time::sleep(*delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
