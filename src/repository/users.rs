use async_trait::async_trait;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::UserProfile;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find(&self, id: Uuid) -> Result<Option<UserProfile>, AppError>;
}

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find(&self, id: Uuid) -> Result<Option<UserProfile>, AppError> {
        let row = sqlx::query(
            "SELECT id, username, full_name, email, profile_picture FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| {
            Ok(UserProfile {
                id: r.try_get("id")?,
                username: r.try_get("username")?,
                full_name: r.try_get("full_name")?,
                email: r.try_get("email")?,
                profile_picture: r.try_get("profile_picture")?,
            })
        })
        .transpose()
    }
}
