use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

/// Service-level errors for the review system
#[derive(Debug)]
pub enum ReviewError {
    /// Review not found
    NotFound,

    /// Booking referenced by the review not found
    BookingNotFound,

    /// Reply not found for the review
    ReplyNotFound,

    /// The booking already has a review
    DuplicateReview,

    /// The booking belongs to a different customer
    NotYourBooking,

    /// Actor lacks permission for this action
    Forbidden(String),

    /// The 48 hour edit window has lapsed
    EditWindowLapsed,

    /// The booking is not in a reviewable state
    NotEligible(String),

    /// Validation error with details
    ValidationError(String),

    /// Database error
    DatabaseError(sqlx::Error),
}

impl fmt::Display for ReviewError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReviewError::NotFound => write!(f, "Review not found"),
            ReviewError::BookingNotFound => write!(f, "Booking not found"),
            ReviewError::ReplyNotFound => write!(f, "Reply not found"),
            ReviewError::DuplicateReview => {
                write!(f, "This booking has already been reviewed")
            }
            ReviewError::NotYourBooking => {
                write!(f, "Booking does not belong to you")
            }
            ReviewError::Forbidden(msg) => write!(f, "{}", msg),
            ReviewError::EditWindowLapsed => {
                write!(f, "The edit window for this review has lapsed")
            }
            ReviewError::NotEligible(msg) => write!(f, "{}", msg),
            ReviewError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            ReviewError::DatabaseError(e) => write!(f, "Database error: {}", e),
        }
    }
}

impl std::error::Error for ReviewError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReviewError::DatabaseError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for ReviewError {
    fn from(err: sqlx::Error) -> Self {
        // The unique index on reviews.booking_id resolves concurrent
        // submissions; the loser surfaces as a conflict
        if let sqlx::Error::Database(db) = &err {
            if matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation) {
                return ReviewError::DuplicateReview;
            }
        }

        ReviewError::DatabaseError(err)
    }
}

impl IntoResponse for ReviewError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ReviewError::NotFound
            | ReviewError::BookingNotFound
            | ReviewError::ReplyNotFound => (StatusCode::NOT_FOUND, self.to_string()),
            ReviewError::DuplicateReview => (StatusCode::CONFLICT, self.to_string()),
            ReviewError::NotYourBooking
            | ReviewError::Forbidden(_)
            | ReviewError::EditWindowLapsed => (StatusCode::FORBIDDEN, self.to_string()),
            ReviewError::NotEligible(_) | ReviewError::ValidationError(_) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            ReviewError::DatabaseError(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
        };

        (status, Json(json!({ "message": message }))).into_response()
    }
}
