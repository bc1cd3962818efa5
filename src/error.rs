use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Application-level errors
///
/// Storage backends must map their own failures into one of these kinds
/// before returning; no driver error type crosses the storage boundary.
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    /// A referenced entity (user/film/review/genre/MPA rating) does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The request violates a business rule (self-friending, double-voting,
    /// dangling reference on a new film or review)
    #[error("Invalid input: {0}")]
    Validation(String),

    /// A concurrent operation raced on the same (entity, voter) pair and
    /// this one lost. Retryable by the caller, unlike `Validation`.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The underlying store could not be reached or failed unexpectedly
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Unavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, self.to_string()),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
