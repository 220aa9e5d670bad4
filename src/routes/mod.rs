use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::error::AppError;
use crate::state::AppState;

pub mod events;
pub mod messages;
pub mod stream;

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "live_connections": state.registry.connected_users().await,
    }))
}

// Prometheus text exposition; pull-style gauges refreshed on scrape
async fn metrics(State(state): State<AppState>) -> Result<String, AppError> {
    state
        .metrics
        .live_connections
        .set(state.registry.connected_users().await as i64);
    crate::metrics::encode()
}

pub fn build_router() -> Router<AppState> {
    // Service introspection endpoints (no API version prefix, no auth)
    let introspection = Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics));

    let api_v1 = Router::new()
        .route("/messages", post(messages::send_message))
        .route("/messages/thread/:user_id", get(messages::get_thread))
        .route("/messages/recent", get(messages::recent_messages))
        .route("/stream", get(stream::connect_stream))
        .route(
            "/events/connection-request-created",
            post(events::connection_request_created),
        );

    let router = introspection.merge(Router::new().nest("/api/v1", api_v1));

    crate::middleware::with_defaults(router)
}
