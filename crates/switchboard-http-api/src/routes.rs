//! HTTP routes
//!
//! The minimal surface the core exposes to collaborators: node catalog,
//! ad-hoc node execution, event intake, direct workflow invocation,
//! execution polling, and event-source lifecycle control.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value;
use tower_http::cors::CorsLayer;

use switchboard_trigger_service::ProcessOutcome;

use crate::error::ApiError;
use crate::state::AppState;

/// Build the API router over the shared state
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/nodes", get(list_nodes))
        .route("/api/nodes/:node_type/execute", post(execute_node))
        .route("/api/events/process", post(process_event))
        .route("/api/workflows/:id/execute", post(execute_workflow))
        .route("/api/executions/:id", get(get_execution))
        .route("/api/sources", get(list_sources))
        .route("/api/sources/:id/start", post(start_source))
        .route("/api/sources/:id/stop", post(stop_source))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn list_nodes(State(state): State<AppState>) -> Json<Value> {
    Json(serde_json::json!({ "nodes": state.plugins.node_catalog() }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExecuteNodeRequest {
    #[serde(default)]
    inputs: serde_json::Map<String, Value>,
    #[serde(default)]
    config: Value,
}

async fn execute_node(
    State(state): State<AppState>,
    Path(node_type): Path<String>,
    Json(request): Json<ExecuteNodeRequest>,
) -> Result<Json<Value>, ApiError> {
    let outputs = state
        .service
        .execute_node(&node_type, &request.inputs, request.config)
        .await
        .map_err(ApiError::Trigger)?;
    Ok(Json(serde_json::json!({ "outputs": outputs })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProcessEventRequest {
    event_type: String,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    data: Value,
}

async fn process_event(
    State(state): State<AppState>,
    Json(request): Json<ProcessEventRequest>,
) -> Result<Json<Value>, ApiError> {
    let outcome = state
        .service
        .process_event_auto(
            &request.event_type,
            request.source.as_deref(),
            &request.data,
        )
        .await
        .map_err(ApiError::Trigger)?;

    let body = match outcome {
        // Distinguishes "nothing matched" from "something matched and
        // failed"; both are 200-level outcomes here
        ProcessOutcome::NoTriggers => serde_json::json!({
            "status": "no_triggers",
            "executionIds": [],
        }),
        ProcessOutcome::Dispatched(ids) => serde_json::json!({
            "status": "dispatched",
            "executionIds": ids,
        }),
        ProcessOutcome::Completed(result) => serde_json::json!({
            "status": "completed",
            "result": result,
        }),
    };
    Ok(Json(body))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExecuteWorkflowRequest {
    #[serde(default)]
    inputs: Value,
}

async fn execute_workflow(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ExecuteWorkflowRequest>,
) -> Result<Json<Value>, ApiError> {
    let result = state
        .service
        .run_workflow(&id, &request.inputs)
        .await
        .map_err(ApiError::Trigger)?;
    Ok(Json(serde_json::json!({ "status": "completed", "result": result })))
}

async fn get_execution(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let record = state
        .service
        .executions()
        .get(&id)
        .await
        .ok_or_else(|| ApiError::UnknownExecution(id))?;
    Ok(Json(serde_json::json!({ "execution": record })))
}

async fn list_sources(State(state): State<AppState>) -> Json<Value> {
    Json(serde_json::json!({ "sources": state.sources.statuses() }))
}

#[derive(Deserialize, Default)]
struct StartSourceRequest {
    #[serde(default)]
    config: Value,
}

async fn start_source(
    State(state): State<AppState>,
    Path(id): Path<String>,
    request: Option<Json<StartSourceRequest>>,
) -> Result<Json<Value>, ApiError> {
    let config = request.map(|Json(r)| r.config).unwrap_or(Value::Null);
    state.sources.start_source(&id, config).await?;
    Ok(Json(serde_json::json!({ "status": state.sources.status(&id)? })))
}

async fn stop_source(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.sources.stop_source(&id).await?;
    Ok(Json(serde_json::json!({ "status": state.sources.status(&id)? })))
}
