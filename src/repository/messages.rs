use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::Message;

/// Single-row message storage. No cross-document transactions are assumed;
/// each operation stands alone.
#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn create(&self, message: &Message) -> Result<(), AppError>;

    /// Every message between the two users, either direction, newest first.
    async fn thread_between(&self, a: Uuid, b: Uuid) -> Result<Vec<Message>, AppError>;

    /// Flip `seen` on all unseen messages from -> to. Returns rows updated.
    async fn mark_seen(&self, from_user_id: Uuid, to_user_id: Uuid) -> Result<u64, AppError>;

    /// Messages addressed to the user, newest first.
    async fn recent_for(&self, user_id: Uuid) -> Result<Vec<Message>, AppError>;
}

pub struct PgMessageRepository {
    pool: PgPool,
}

impl PgMessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn message_from_row(row: &PgRow) -> Result<Message, AppError> {
    let kind: String = row.try_get("message_type")?;
    Ok(Message {
        id: row.try_get("id")?,
        from_user_id: row.try_get("from_user_id")?,
        to_user_id: row.try_get("to_user_id")?,
        text: row.try_get("text")?,
        media_url: row.try_get("media_url")?,
        message_type: kind.parse()?,
        seen: row.try_get("seen")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn create(&self, message: &Message) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO messages (id, from_user_id, to_user_id, text, media_url, message_type, seen, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(message.id)
        .bind(message.from_user_id)
        .bind(message.to_user_id)
        .bind(&message.text)
        .bind(&message.media_url)
        .bind(message.message_type.as_str())
        .bind(message.seen)
        .bind(message.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn thread_between(&self, a: Uuid, b: Uuid) -> Result<Vec<Message>, AppError> {
        let rows = sqlx::query(
            "SELECT id, from_user_id, to_user_id, text, media_url, message_type, seen, created_at \
             FROM messages \
             WHERE (from_user_id = $1 AND to_user_id = $2) \
                OR (from_user_id = $2 AND to_user_id = $1) \
             ORDER BY created_at DESC",
        )
        .bind(a)
        .bind(b)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(message_from_row).collect()
    }

    async fn mark_seen(&self, from_user_id: Uuid, to_user_id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE messages SET seen = TRUE \
             WHERE from_user_id = $1 AND to_user_id = $2 AND seen = FALSE",
        )
        .bind(from_user_id)
        .bind(to_user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn recent_for(&self, user_id: Uuid) -> Result<Vec<Message>, AppError> {
        let rows = sqlx::query(
            "SELECT id, from_user_id, to_user_id, text, media_url, message_type, seen, created_at \
             FROM messages \
             WHERE to_user_id = $1 \
             ORDER BY created_at DESC \
             LIMIT 200",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(message_from_row).collect()
    }
}
