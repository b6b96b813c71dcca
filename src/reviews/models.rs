use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Domain model representing a review in the database
///
/// A review is tied to exactly one booking (the stay being reviewed);
/// `reviews.booking_id` carries a unique index so concurrent submissions
/// for the same booking resolve in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Review {
    pub id: i32,
    pub booking_id: Uuid,
    pub homestay_id: i32,
    pub customer_id: i32,
    pub rating: i32,
    pub content: String,
    pub is_visible: bool,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Photo attached to a review, at most six per review
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ReviewImage {
    pub id: i32,
    pub review_id: i32,
    pub url: String,
    pub sort_order: i32,
}

/// Host reply to a review, at most one per review
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ReviewReply {
    pub id: i32,
    pub review_id: i32,
    pub owner_id: i32,
    pub homestay_id: i32,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request DTO for creating a new review
#[derive(Debug, Deserialize, Validate, Clone)]
pub struct CreateReviewRequest {
    pub booking_id: Uuid,
    pub homestay_id: i32,
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i32,
    #[validate(length(max = 2000, message = "Content must not exceed 2000 characters"))]
    pub content: String,
    #[validate(length(max = 6, message = "At most 6 images are allowed"))]
    #[serde(default)]
    pub images: Vec<String>,
}

/// Request DTO for updating an existing review
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateReviewRequest {
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: Option<i32>,
    #[validate(length(max = 2000, message = "Content must not exceed 2000 characters"))]
    pub content: Option<String>,
}

/// Request DTO for the admin visibility toggle
#[derive(Debug, Deserialize)]
pub struct VisibilityRequest {
    pub visible: bool,
}

/// Request DTO for creating or editing a host reply
#[derive(Debug, Deserialize, Validate)]
pub struct ReplyRequest {
    #[validate(length(min = 1, max = 2000, message = "Content must be 1 to 2000 characters"))]
    pub content: String,
}

/// Eligibility pre-check result for the review form
///
/// `homestay_id` names the stay's homestay when the booking is reviewable,
/// so the client knows which homestay the review will attach to.
#[derive(Debug, Serialize)]
pub struct CanReviewResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub homestay_id: Option<i32>,
}

/// Response DTO for a review with its attachments
#[derive(Debug, Serialize)]
pub struct ReviewResponse {
    pub id: i32,
    pub booking_id: Uuid,
    pub homestay_id: i32,
    pub customer_id: i32,
    pub author: String,
    pub rating: i32,
    pub content: String,
    pub is_visible: bool,
    pub is_verified: bool,
    pub images: Vec<ReviewImage>,
    pub reply: Option<ReviewReply>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReviewResponse {
    /// Assemble the response from a review and its fetched attachments
    pub fn from_parts(
        review: Review,
        author: String,
        images: Vec<ReviewImage>,
        reply: Option<ReviewReply>,
    ) -> Self {
        Self {
            id: review.id,
            booking_id: review.booking_id,
            homestay_id: review.homestay_id,
            customer_id: review.customer_id,
            author,
            rating: review.rating,
            content: review.content,
            is_visible: review.is_visible,
            is_verified: review.is_verified,
            images,
            reply,
            created_at: review.created_at,
            updated_at: review.updated_at,
        }
    }
}
