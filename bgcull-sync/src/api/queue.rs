//! Interview queue endpoint
//!
//! POST /queue orders the undecided items using the live expansion cache.

use axum::{extract::State, routing::post, Json, Router};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::queue::{build_queue, OrderMode};
use crate::AppState;
use bgcull_common::collection::{Item, ItemId};

/// POST /queue request
#[derive(Debug, Deserialize)]
pub struct BuildQueueRequest {
    pub items: Vec<Item>,
    #[serde(default)]
    pub decided: Vec<ItemId>,
    #[serde(default)]
    pub mode: OrderMode,
    /// Reference date for grace period and recency; defaults to today (UTC)
    #[serde(default)]
    pub today: Option<NaiveDate>,
}

/// POST /queue response
#[derive(Debug, Serialize)]
pub struct BuildQueueResponse {
    pub mode: OrderMode,
    pub queue: Vec<ItemId>,
}

/// POST /queue
pub async fn build_interview_queue(
    State(state): State<AppState>,
    Json(request): Json<BuildQueueRequest>,
) -> Json<BuildQueueResponse> {
    let (expansions, _) = state.expansions.snapshot().await;
    let decided: HashSet<ItemId> = request.decided.into_iter().collect();
    let today = request.today.unwrap_or_else(|| Utc::now().date_naive());

    let queue = build_queue(&request.items, &decided, &expansions, request.mode, today);
    tracing::debug!(
        items = request.items.len(),
        decided = decided.len(),
        queued = queue.len(),
        mode = ?request.mode,
        "Built interview queue"
    );

    Json(BuildQueueResponse {
        mode: request.mode,
        queue,
    })
}

/// Build queue routes
pub fn queue_routes() -> Router<AppState> {
    Router::new().route("/queue", post(build_interview_queue))
}
