use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("server start failure: {0}")]
    StartServer(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("not found")]
    NotFound,

    #[error("database error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("notification delivery failed: {0}")]
    Notification(String),

    #[error("workflow error: {0}")]
    Workflow(String),

    #[error("internal server error")]
    Internal,
}

impl AppError {
    /// Whether a retry has a chance of succeeding (e.g. pool timeout, provider outage)
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Storage(e) => {
                matches!(
                    e,
                    sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
                )
            }
            AppError::Notification(_) => true,
            _ => false,
        }
    }

    /// Returns HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::Validation(_) => 400,
            AppError::Unauthorized => 401,
            AppError::NotFound => 404,
            AppError::Notification(_) => 502,
            _ => 500,
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation_error",
            AppError::Unauthorized => "authentication_error",
            AppError::NotFound => "not_found_error",
            AppError::Notification(_) => "notification_error",
            _ => "server_error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = Json(serde_json::json!({
            "error": {
                "type": self.error_type(),
                "message": self.to_string(),
            }
        }));
        (status, body).into_response()
    }
}
