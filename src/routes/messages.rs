use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::Message;
use crate::services::NewMessage;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub to_user_id: Uuid,
    pub text: Option<String>,
    pub media_url: Option<String>,
}

/// The response acknowledges persistence only; whether the recipient was live
/// never changes the outcome here.
pub async fn send_message(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Json(body): Json<SendMessageRequest>,
) -> Result<Json<Message>, AppError> {
    let message = state
        .messages
        .send(
            user_id,
            body.to_user_id,
            NewMessage {
                text: body.text,
                media_url: body.media_url,
            },
        )
        .await?;
    state.metrics.messages_sent.inc();
    Ok(Json(message))
}

pub async fn get_thread(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Path(other_id): Path<Uuid>,
) -> Result<Json<Vec<Message>>, AppError> {
    let messages = state.messages.thread(user_id, other_id).await?;
    Ok(Json(messages))
}

pub async fn recent_messages(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
) -> Result<Json<Vec<Message>>, AppError> {
    let messages = state.messages.recent(user_id).await?;
    Ok(Json(messages))
}
