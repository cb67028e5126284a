//! HTTP error mapping
//!
//! Runtime failures reach callers as structured `{status, error}` JSON with
//! a meaningful status code; a fire-and-wait timeout maps to 504 and keeps
//! the execution id so the caller can poll for the eventual result.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use switchboard_event_sources::SourceError;
use switchboard_trigger_service::TriggerError;
use workflow_engine::EngineError;

/// Error surfaced by the HTTP adapter
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Trigger(#[from] TriggerError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("Unknown execution '{0}'")]
    UnknownExecution(String),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Trigger(TriggerError::WorkflowTimeout { .. }) => StatusCode::GATEWAY_TIMEOUT,
            Self::Trigger(TriggerError::UnknownWorkflow(_)) => StatusCode::NOT_FOUND,
            Self::Trigger(TriggerError::Engine(EngineError::MissingProcessor(_))) => {
                StatusCode::NOT_FOUND
            }
            Self::Trigger(TriggerError::Engine(EngineError::WorkflowDefinition(_))) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::Trigger(TriggerError::Engine(EngineError::MissingInput { .. })) => {
                StatusCode::BAD_REQUEST
            }
            Self::Trigger(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Source(SourceError::UnknownSource(_)) => StatusCode::NOT_FOUND,
            Self::Source(SourceError::InvalidTransition { .. }) => StatusCode::CONFLICT,
            Self::Source(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::UnknownExecution(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            ApiError::Trigger(TriggerError::WorkflowTimeout { execution_id, timeout_secs }) => {
                serde_json::json!({
                    "status": "timeout",
                    "error": self.to_string(),
                    "executionId": execution_id,
                    "timeoutSecs": timeout_secs,
                })
            }
            _ => serde_json::json!({
                "status": "error",
                "error": self.to_string(),
            }),
        };
        (status, Json(body)).into_response()
    }
}
