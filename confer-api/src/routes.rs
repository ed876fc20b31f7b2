//! HTTP route handlers

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::AppState;

/// Thread used when a request does not name one
pub const DEFAULT_THREAD_ID: &str = "default_thread";

fn default_thread_id() -> String {
    DEFAULT_THREAD_ID.to_string()
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Chat request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default = "default_thread_id")]
    pub thread_id: String,
}

/// Chat response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}

/// Failed turn
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, Json(self)).into_response()
    }
}

/// Run one turn on the requested thread
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ErrorResponse> {
    info!(
        thread_id = %request.thread_id,
        preview = %request.message.chars().take(50).collect::<String>(),
        "Received chat message"
    );

    let response = state
        .orchestrator
        .chat(&request.thread_id, &request.message)
        .await
        .map_err(|e| {
            error!(thread_id = %request.thread_id, error = %e, "Chat turn failed");
            ErrorResponse {
                detail: e.to_string(),
            }
        })?;

    Ok(Json(ChatResponse { response }))
}
