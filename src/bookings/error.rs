use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::promotions::PromotionError;

/// Error types for booking operations
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Booking not found")]
    NotFound,

    #[error("Homestay not found: {0}")]
    HomestayNotFound(i32),

    #[error("Customer not found: {0}")]
    CustomerNotFound(i32),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid status: {0}")]
    InvalidStatusTarget(String),
}

impl From<sqlx::Error> for BookingError {
    fn from(err: sqlx::Error) -> Self {
        BookingError::DatabaseError(err.to_string())
    }
}

impl From<PromotionError> for BookingError {
    fn from(err: PromotionError) -> Self {
        match err {
            PromotionError::DatabaseError(msg) => BookingError::DatabaseError(msg),
            PromotionError::ValidationError(msg) => BookingError::ValidationError(msg),
        }
    }
}

impl IntoResponse for BookingError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            BookingError::DatabaseError(msg) => {
                tracing::error!("Database error in bookings: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A database error occurred".to_string(),
                )
            }
            BookingError::NotFound => (StatusCode::NOT_FOUND, "Booking not found".to_string()),
            BookingError::HomestayNotFound(id) => (
                StatusCode::NOT_FOUND,
                format!("Homestay with id {} not found", id),
            ),
            BookingError::CustomerNotFound(id) => (
                StatusCode::NOT_FOUND,
                format!("Customer with id {} not found", id),
            ),
            BookingError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            BookingError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            BookingError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            BookingError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            BookingError::InvalidStatusTarget(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
        };

        let body = Json(json!({
            "message": message,
        }));

        (status, body).into_response()
    }
}
