//! Expansion-link sync endpoints
//!
//! GET /expansions/status, POST /expansions/start

use axum::{extract::State, http::StatusCode, routing::{get, post}, Json, Router};
use serde::{Deserialize, Serialize};

use super::{require_identifiers, start_status_code, StartSyncResponse};
use crate::error::ApiResult;
use crate::store::CacheMap;
use crate::sync::SyncStatus;
use crate::AppState;
use bgcull_common::collection::{ExpansionLink, ItemId, NamedItem};

/// GET /expansions/status response
#[derive(Debug, Serialize)]
pub struct ExpansionStatusResponse {
    pub data: CacheMap<Vec<ExpansionLink>>,
    pub status: SyncStatus,
}

/// POST /expansions/start request
#[derive(Debug, Deserialize)]
pub struct StartExpansionRequest {
    pub identifiers: Vec<ItemId>,
    /// Item names, needed only if the catalog denies access and name matching runs
    #[serde(default)]
    pub items: Vec<NamedItem>,
}

/// GET /expansions/status
pub async fn expansion_status(State(state): State<AppState>) -> Json<ExpansionStatusResponse> {
    let (data, status) = state.expansions.snapshot().await;
    Json(ExpansionStatusResponse { data, status })
}

/// POST /expansions/start
///
/// Returns 202 Accepted when a background run was spawned.
pub async fn start_expansion_sync(
    State(state): State<AppState>,
    Json(request): Json<StartExpansionRequest>,
) -> ApiResult<(StatusCode, Json<StartSyncResponse>)> {
    require_identifiers(&request.identifiers)?;

    let outcome = state
        .expansions
        .start(&request.identifiers, request.items)
        .await;
    let status = state.expansions.status().await;

    tracing::info!(
        requested = request.identifiers.len(),
        outcome = ?outcome,
        "Expansion sync start requested"
    );

    Ok((start_status_code(&outcome), Json(StartSyncResponse { outcome, status })))
}

/// Build expansion sync routes
pub fn expansion_routes() -> Router<AppState> {
    Router::new()
        .route("/expansions/status", get(expansion_status))
        .route("/expansions/start", post(start_expansion_sync))
}
