//! HTTP interface for Confer
//!
//! # Endpoints
//!
//! - `POST /chat` - Run one conversation turn: `{message, thread_id?}` → `{response}`
//! - `GET /health` - Liveness check

pub mod routes;
pub mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;
use tracing::info;

pub use routes::{ChatRequest, ChatResponse, ErrorResponse, DEFAULT_THREAD_ID};
pub use state::AppState;

/// Create the API router with all routes configured
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/chat", post(routes::chat))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the API server on the given address
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> anyhow::Result<()> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "Starting Confer API server");

    axum::serve(listener, router).await?;

    Ok(())
}
