use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Display metadata denormalized into pushed frames and notification copy.
/// Profile rows are owned by the identity subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub profile_picture: Option<String>,
}
