use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Error types for promotion operations
///
/// Evaluation failures are not errors: an inapplicable promotion yields a
/// zero discount. Only infrastructure failures surface here.
#[derive(Debug, thiserror::Error)]
pub enum PromotionError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl From<sqlx::Error> for PromotionError {
    fn from(err: sqlx::Error) -> Self {
        PromotionError::DatabaseError(err.to_string())
    }
}

impl IntoResponse for PromotionError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            PromotionError::DatabaseError(msg) => {
                tracing::error!("Database error in promotions: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A database error occurred".to_string(),
                )
            }
            PromotionError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        let body = Json(json!({
            "message": message,
        }));

        (status, body).into_response()
    }
}
