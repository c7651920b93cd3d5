//! Box-dimension sync endpoints
//!
//! GET /dimensions/status, POST /dimensions/start

use axum::{extract::State, http::StatusCode, routing::{get, post}, Json, Router};
use serde::{Deserialize, Serialize};

use super::{require_identifiers, start_status_code, StartSyncResponse};
use crate::error::ApiResult;
use crate::store::CacheMap;
use crate::sync::{SyncStatus, DEFAULT_BOX_VOLUME};
use crate::AppState;
use bgcull_common::collection::{BoxDimensions, ItemId};

/// GET /dimensions/status response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionStatusResponse {
    pub data: CacheMap<BoxDimensions>,
    pub status: SyncStatus,
    /// Volume to assume for items absent from `data`
    pub default_volume: f64,
}

/// POST /dimensions/start request
#[derive(Debug, Deserialize)]
pub struct StartDimensionRequest {
    pub identifiers: Vec<ItemId>,
}

/// GET /dimensions/status
pub async fn dimension_status(State(state): State<AppState>) -> Json<DimensionStatusResponse> {
    let (data, status) = state.dimensions.snapshot().await;
    Json(DimensionStatusResponse {
        data,
        status,
        default_volume: DEFAULT_BOX_VOLUME,
    })
}

/// POST /dimensions/start
pub async fn start_dimension_sync(
    State(state): State<AppState>,
    Json(request): Json<StartDimensionRequest>,
) -> ApiResult<(StatusCode, Json<StartSyncResponse>)> {
    require_identifiers(&request.identifiers)?;

    let outcome = state.dimensions.start(&request.identifiers).await;
    let status = state.dimensions.status().await;

    tracing::info!(
        requested = request.identifiers.len(),
        outcome = ?outcome,
        "Dimension sync start requested"
    );

    Ok((start_status_code(&outcome), Json(StartSyncResponse { outcome, status })))
}

/// Build dimension sync routes
pub fn dimension_routes() -> Router<AppState> {
    Router::new()
        .route("/dimensions/status", get(dimension_status))
        .route("/dimensions/start", post(start_dimension_sync))
}
