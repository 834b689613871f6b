//! HTTP route handlers for the optional status server.
//!
//! The server is read-only: it reports liveness and the bot's progress and
//! never triggers API calls.

use axum::{extract::State, response::Json, routing::get, Router};
use log::info;
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::status::{BotStatus, StatusHandle};

/// Builds the status router with all routes and middleware.
pub fn status_router(status: StatusHandle) -> Router {
    Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .route("/status", get(handle_status))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(status)
}

/// Handles GET requests to `/`.
pub async fn handle_root() -> &'static str {
    info!("Status root requested");
    "spinbot is polling for mentions"
}

/// Handles GET requests to the `/health` endpoint.
///
/// # Example Response
///
/// ```json
/// {
///   "status": "healthy",
///   "service": "spinbot"
/// }
/// ```
pub async fn handle_health() -> Json<Value> {
    Json(json!({"status": "healthy", "service": "spinbot"}))
}

/// Handles GET requests to the `/status` endpoint with the current [`BotStatus`].
pub async fn handle_status(State(status): State<StatusHandle>) -> Json<BotStatus> {
    Json(status.snapshot().await)
}
