use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Message, UserProfile};

/// One frame on a client's event stream. The `connected` frame is emitted once
/// when the stream is registered; every delivered message rides in its own
/// `message` frame carrying the sender's profile so clients need no follow-up
/// fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Connected {
        connected_at: DateTime<Utc>,
    },
    Message {
        message: Message,
        from_user: UserProfile,
    },
}

impl StreamEvent {
    pub fn connected() -> Self {
        StreamEvent::Connected {
            connected_at: Utc::now(),
        }
    }

    pub fn message(message: Message, from_user: UserProfile) -> Self {
        StreamEvent::Message { message, from_user }
    }
}
