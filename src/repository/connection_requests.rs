use async_trait::async_trait;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::ConnectionRequest;

/// Read-only view of connection requests; the connection-graph service owns
/// the rows and flips their status.
#[async_trait]
pub trait ConnectionRequestRepository: Send + Sync {
    async fn find(&self, id: Uuid) -> Result<Option<ConnectionRequest>, AppError>;
}

pub struct PgConnectionRequestRepository {
    pool: PgPool,
}

impl PgConnectionRequestRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConnectionRequestRepository for PgConnectionRequestRepository {
    async fn find(&self, id: Uuid) -> Result<Option<ConnectionRequest>, AppError> {
        let row = sqlx::query(
            "SELECT id, from_user_id, to_user_id, status, created_at \
             FROM connection_requests WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| {
            let status: String = r.try_get("status")?;
            Ok(ConnectionRequest {
                id: r.try_get("id")?,
                from_user_id: r.try_get("from_user_id")?,
                to_user_id: r.try_get("to_user_id")?,
                status: status.parse()?,
                created_at: r.try_get("created_at")?,
            })
        })
        .transpose()
    }
}
