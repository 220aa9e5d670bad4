use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Message, MessageKind};
use crate::repository::{MessageRepository, UserRepository};
use crate::sse::{ConnectionRegistry, StreamEvent};

#[derive(Debug, Clone, Default)]
pub struct NewMessage {
    pub text: Option<String>,
    pub media_url: Option<String>,
}

/// Classify an outgoing message. Blank strings count as absent; a message
/// needs text or an attachment, and an attachment makes it an image message.
pub fn validate(new_message: NewMessage) -> Result<(Option<String>, Option<String>, MessageKind), AppError> {
    let text = new_message.text.filter(|t| !t.trim().is_empty());
    let media_url = new_message.media_url.filter(|u| !u.trim().is_empty());
    if text.is_none() && media_url.is_none() {
        return Err(AppError::Validation(
            "message requires text or an attachment".into(),
        ));
    }
    let kind = if media_url.is_some() {
        MessageKind::Image
    } else {
        MessageKind::Text
    };
    Ok((text, media_url, kind))
}

/// Validates, persists and fans out direct messages. The persisted row is the
/// durable source of truth; pushing to a live recipient is an optimization
/// whose outcome is logged, never surfaced to the sender.
pub struct MessageService {
    messages: Arc<dyn MessageRepository>,
    users: Arc<dyn UserRepository>,
    registry: ConnectionRegistry,
}

impl MessageService {
    pub fn new(
        messages: Arc<dyn MessageRepository>,
        users: Arc<dyn UserRepository>,
        registry: ConnectionRegistry,
    ) -> Self {
        Self {
            messages,
            users,
            registry,
        }
    }

    pub async fn send(
        &self,
        from_user_id: Uuid,
        to_user_id: Uuid,
        new_message: NewMessage,
    ) -> Result<Message, AppError> {
        let (text, media_url, kind) = validate(new_message)?;
        let message = Message {
            id: Uuid::new_v4(),
            from_user_id,
            to_user_id,
            text,
            media_url,
            message_type: kind,
            seen: false,
            created_at: Utc::now(),
        };
        self.messages.create(&message).await?;

        // Denormalize the sender into the pushed frame; a failed lookup only
        // skips live delivery, the message itself is already persisted.
        match self.users.find(from_user_id).await {
            Ok(Some(from_user)) => {
                let status = self
                    .registry
                    .deliver(to_user_id, StreamEvent::message(message.clone(), from_user))
                    .await;
                info!(
                    message_id = %message.id,
                    %to_user_id,
                    delivery = ?status,
                    "message persisted"
                );
            }
            Ok(None) => {
                warn!(%from_user_id, message_id = %message.id, "sender profile missing, skipping live delivery");
            }
            Err(e) => {
                warn!(%from_user_id, message_id = %message.id, error = %e, "sender lookup failed, skipping live delivery");
            }
        }

        Ok(message)
    }

    /// Thread between two users, newest first. Fetching the thread is what
    /// marks the counterparty's messages as seen; there is no separate
    /// read-acknowledgment call.
    pub async fn thread(&self, user_id: Uuid, other_id: Uuid) -> Result<Vec<Message>, AppError> {
        let messages = self.messages.thread_between(user_id, other_id).await?;
        let marked = self.messages.mark_seen(other_id, user_id).await?;
        if marked > 0 {
            debug!(%user_id, %other_id, marked, "marked thread messages seen");
        }
        Ok(messages)
    }

    pub async fn recent(&self, user_id: Uuid) -> Result<Vec<Message>, AppError> {
        self.messages.recent_for(user_id).await
    }
}
