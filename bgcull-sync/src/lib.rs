//! bgcull-sync library interface
//!
//! Exposes the catalog client, cache store, sync coordinators and queue
//! ordering for the binary and for integration testing.

pub mod api;
pub mod catalog;
pub mod config;
pub mod error;
pub mod matcher;
pub mod queue;
pub mod store;
pub mod sync;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use tower_http::trace::TraceLayer;

use crate::sync::{DimensionSync, ExpansionSync};

/// Application state shared across handlers
///
/// Both coordinators are constructed once at startup; clones share the same
/// cache and single-flight guard.
#[derive(Clone)]
pub struct AppState {
    pub expansions: ExpansionSync,
    pub dimensions: DimensionSync,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(expansions: ExpansionSync, dimensions: DimensionSync) -> Self {
        Self {
            expansions,
            dimensions,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::expansion_routes())
        .merge(api::dimension_routes())
        .merge(api::queue_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
