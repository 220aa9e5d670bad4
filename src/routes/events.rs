use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;
use crate::workflow::CONNECTION_REQUEST_REMINDER;

#[derive(Debug, Deserialize)]
pub struct ConnectionRequestCreated {
    pub connection_request_id: Uuid,
}

/// Event intake from the connection-graph service. Accepting the event means
/// the run is durably recorded; notification outcomes are the workflow's
/// business, not the caller's.
pub async fn connection_request_created(
    State(state): State<AppState>,
    Json(body): Json<ConnectionRequestCreated>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let run = state
        .scheduler
        .trigger(
            CONNECTION_REQUEST_REMINDER,
            body.connection_request_id,
            json!({ "connection_request_id": body.connection_request_id }),
        )
        .await?;
    Ok((StatusCode::ACCEPTED, Json(json!({ "run_id": run.id }))))
}
