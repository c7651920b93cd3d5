//! HTTP routing integration tests
//!
//! Requests go through `build_router` with `tower::ServiceExt::oneshot`; the
//! catalog is an in-process stub.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use bgcull_common::collection::ItemId;
use bgcull_sync::catalog::{CatalogClient, CatalogError, CatalogQuery, CatalogTransport};
use bgcull_sync::sync::{DimensionSync, ExpansionSync, SyncTiming};
use bgcull_sync::{build_router, AppState};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

/// Every item is an expansion of item 1000; every box is 10x10x2
struct FixedCatalog;

#[async_trait]
impl CatalogTransport for FixedCatalog {
    async fn fetch(&self, ids: &[ItemId], query: CatalogQuery) -> Result<String, CatalogError> {
        let items: String = ids
            .iter()
            .map(|id| match query {
                CatalogQuery::Expansions => format!(
                    r#"<item id="{}"><link type="boardgameexpansion" id="1000" value="Base" inbound="true"/></item>"#,
                    id
                ),
                CatalogQuery::Dimensions => format!(
                    r#"<item id="{}"><versions><item id="1"><width value="10"/><length value="10"/><depth value="2"/></item></versions></item>"#,
                    id
                ),
            })
            .collect();
        Ok(format!("<items>{}</items>", items))
    }
}

fn test_app_state(dir: &TempDir) -> AppState {
    let timing = SyncTiming::immediate();
    let catalog = CatalogClient::with_retry_ladder(Arc::new(FixedCatalog), timing.retry_ladder.clone());
    AppState::new(
        ExpansionSync::new(dir.path().join("expansions.json"), catalog.clone(), &timing),
        DimensionSync::new(dir.path().join("dimensions.json"), catalog, &timing),
    )
}

async fn send(state: &AppState, request: Request<Body>) -> (StatusCode, Value) {
    let response = build_router(state.clone()).oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let dir = TempDir::new().unwrap();
    let state = test_app_state(&dir);

    let (status, json) = send(&state, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["module"], "bgcull-sync");
    assert_eq!(json["expansion_sync_running"], false);
}

#[tokio::test]
async fn test_expansion_status_before_any_sync() {
    let dir = TempDir::new().unwrap();
    let state = test_app_state(&dir);

    let (status, json) = send(&state, get("/expansions/status")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"], json!({}));
    assert_eq!(json["status"]["inProgress"], false);
    assert_eq!(json["status"]["cached"], 0);
    assert_eq!(json["status"]["method"], "none");
}

#[tokio::test]
async fn test_expansion_start_then_status() {
    let dir = TempDir::new().unwrap();
    let state = test_app_state(&dir);

    let (status, json) = send(
        &state,
        post_json("/expansions/start", json!({"identifiers": [1, 2, 3]})),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(json["outcome"], json!({"kind": "started", "total": 3}));

    state.expansions.wait_until_idle().await;

    let (_, json) = send(&state, get("/expansions/status")).await;
    assert_eq!(json["status"]["cached"], 3);
    assert_eq!(json["status"]["fetched"], 3);
    assert_eq!(json["status"]["method"], "api");
    assert_eq!(json["data"]["2"], json!([{"baseId": 1000, "baseName": "Base"}]));

    // Same request again: nothing left to do
    let (status, json) = send(
        &state,
        post_json("/expansions/start", json!({"identifiers": [3, 2, 1]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["outcome"]["kind"], "up-to-date");
}

#[tokio::test]
async fn test_start_rejects_empty_identifiers() {
    let dir = TempDir::new().unwrap();
    let state = test_app_state(&dir);

    let (status, json) = send(&state, post_json("/dimensions/start", json!({"identifiers": []}))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_dimension_status_reports_default_volume() {
    let dir = TempDir::new().unwrap();
    let state = test_app_state(&dir);

    let (status, _) = send(&state, post_json("/dimensions/start", json!({"identifiers": [7]}))).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    state.dimensions.wait_until_idle().await;

    let (status, json) = send(&state, get("/dimensions/status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["defaultVolume"], 432.0);
    assert_eq!(json["data"]["7"]["volume"], 200.0);
    assert_eq!(json["status"]["cached"], 1);
}

#[tokio::test]
async fn test_queue_defers_expansions_of_owned_base() {
    let dir = TempDir::new().unwrap();
    let state = test_app_state(&dir);

    send(&state, post_json("/expansions/start", json!({"identifiers": [2]}))).await;
    state.expansions.wait_until_idle().await;

    let body = json!({
        "items": [
            {"id": 1000, "name": "Base", "acquiredOn": "2015-01-01", "lastPlayed": "2026-09-01", "rating": 8.0},
            {"id": 2, "name": "Base: More", "acquiredOn": "2016-01-01", "lastPlayed": "2026-09-01", "rating": 7.0},
            {"id": 3, "name": "Solo Game", "acquiredOn": "2014-01-01", "lastPlayed": "2026-08-01", "rating": 6.0}
        ],
        "decided": [],
        "mode": "default",
        "today": "2026-10-17"
    });
    let (status, json) = send(&state, post_json("/queue", body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["mode"], "default");
    assert_eq!(json["queue"], json!([3, 1000, 2]));
}

#[tokio::test]
async fn test_queue_excludes_decided_items() {
    let dir = TempDir::new().unwrap();
    let state = test_app_state(&dir);

    let body = json!({
        "items": [
            {"id": 1, "name": "Brass"},
            {"id": 2, "name": "Azul"},
            {"id": 3, "name": "Concordia"}
        ],
        "decided": [2],
        "mode": "alphabetical"
    });
    let (status, json) = send(&state, post_json("/queue", body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["queue"], json!([1, 3]));
}
