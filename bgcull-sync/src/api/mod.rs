//! HTTP API handlers for bgcull-sync
//!
//! Per dataset: `GET /<dataset>/status` returns the live cache plus progress,
//! `POST /<dataset>/start` triggers a background sync if none is running.

pub mod dimensions;
pub mod expansions;
pub mod health;
pub mod queue;

pub use dimensions::dimension_routes;
pub use expansions::expansion_routes;
pub use health::health_routes;
pub use queue::queue_routes;

use axum::http::StatusCode;
use serde::Serialize;

use crate::error::{ApiError, ApiResult};
use crate::sync::{StartOutcome, SyncStatus};
use bgcull_common::collection::ItemId;

/// POST /<dataset>/start response
#[derive(Debug, Serialize)]
pub struct StartSyncResponse {
    pub outcome: StartOutcome,
    pub status: SyncStatus,
}

/// 202 when a run was spawned, 200 when the request changed nothing
pub(crate) fn start_status_code(outcome: &StartOutcome) -> StatusCode {
    match outcome {
        StartOutcome::Started { .. } => StatusCode::ACCEPTED,
        StartOutcome::AlreadyRunning | StartOutcome::UpToDate => StatusCode::OK,
    }
}

pub(crate) fn require_identifiers(identifiers: &[ItemId]) -> ApiResult<()> {
    if identifiers.is_empty() {
        return Err(ApiError::BadRequest("identifiers must not be empty".to_string()));
    }
    Ok(())
}
