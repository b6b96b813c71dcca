use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::response::{created, success, ApiSuccess};
use crate::reviews::{
    CanReviewResponse, CreateReviewRequest, ReplyRequest, ReviewError, ReviewReply,
    ReviewResponse, UpdateReviewRequest, VisibilityRequest,
};

/// Handler for POST /api/reviews
pub async fn create_review_handler(
    State(state): State<crate::AppState>,
    user: AuthUser,
    Json(request): Json<CreateReviewRequest>,
) -> Result<(StatusCode, ApiSuccess<ReviewResponse>), ReviewError> {
    request
        .validate()
        .map_err(|e| ReviewError::ValidationError(e.to_string()))?;

    let review = state.review_service.create_review(&user, request).await?;

    Ok(created(review))
}

/// Handler for GET /api/reviews/mine
pub async fn my_reviews_handler(
    State(state): State<crate::AppState>,
    user: AuthUser,
) -> Result<ApiSuccess<Vec<ReviewResponse>>, ReviewError> {
    let reviews = state.review_service.my_reviews(&user).await?;

    Ok(success(reviews))
}

/// Handler for GET /api/reviews/can-review/:booking_id
pub async fn can_review_handler(
    State(state): State<crate::AppState>,
    user: AuthUser,
    Path(booking_id): Path<Uuid>,
) -> Result<ApiSuccess<CanReviewResponse>, ReviewError> {
    let verdict = state.review_service.can_review(&user, booking_id).await?;

    Ok(success(verdict))
}

/// Handler for GET /api/reviews/homestay/:id
///
/// Public listing, no authentication required.
pub async fn homestay_reviews_handler(
    State(state): State<crate::AppState>,
    Path(homestay_id): Path<i32>,
) -> Result<ApiSuccess<Vec<ReviewResponse>>, ReviewError> {
    let reviews = state.review_service.homestay_reviews(homestay_id).await?;

    Ok(success(reviews))
}

/// Handler for PATCH /api/reviews/:id
pub async fn update_review_handler(
    State(state): State<crate::AppState>,
    user: AuthUser,
    Path(review_id): Path<i32>,
    Json(request): Json<UpdateReviewRequest>,
) -> Result<ApiSuccess<ReviewResponse>, ReviewError> {
    request
        .validate()
        .map_err(|e| ReviewError::ValidationError(e.to_string()))?;

    let review = state
        .review_service
        .update_review(&user, review_id, request)
        .await?;

    Ok(success(review))
}

/// Handler for DELETE /api/reviews/:id
pub async fn delete_review_handler(
    State(state): State<crate::AppState>,
    user: AuthUser,
    Path(review_id): Path<i32>,
) -> Result<StatusCode, ReviewError> {
    state.review_service.delete_review(&user, review_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Handler for PATCH /api/reviews/:id/visibility
pub async fn set_visibility_handler(
    State(state): State<crate::AppState>,
    user: AuthUser,
    Path(review_id): Path<i32>,
    Json(request): Json<VisibilityRequest>,
) -> Result<ApiSuccess<ReviewResponse>, ReviewError> {
    let review = state
        .review_service
        .set_visibility(&user, review_id, request.visible)
        .await?;

    Ok(success(review))
}

/// Handler for POST /api/reviews/:id/reply
pub async fn upsert_reply_handler(
    State(state): State<crate::AppState>,
    user: AuthUser,
    Path(review_id): Path<i32>,
    Json(request): Json<ReplyRequest>,
) -> Result<ApiSuccess<ReviewReply>, ReviewError> {
    request
        .validate()
        .map_err(|e| ReviewError::ValidationError(e.to_string()))?;

    let reply = state
        .review_service
        .upsert_reply(&user, review_id, &request.content)
        .await?;

    Ok(success(reply))
}

/// Handler for DELETE /api/reviews/:id/reply
pub async fn delete_reply_handler(
    State(state): State<crate::AppState>,
    user: AuthUser,
    Path(review_id): Path<i32>,
) -> Result<StatusCode, ReviewError> {
    state.review_service.delete_reply(&user, review_id).await?;

    Ok(StatusCode::NO_CONTENT)
}
