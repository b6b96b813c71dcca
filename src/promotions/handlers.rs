// HTTP handlers for promotion endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::promotions::{
    PromotionError, PromotionQuote, PromotionResponse, ValidatePromotionRequest,
};
use crate::response::{success, ApiSuccess};

/// Handler for GET /api/promotions/active/{homestay_id}
/// Lists promotions currently applicable to a homestay (public)
pub async fn list_active_promotions_handler(
    State(state): State<crate::AppState>,
    Path(homestay_id): Path<i32>,
) -> Result<ApiSuccess<Vec<PromotionResponse>>, PromotionError> {
    let promotions = state
        .promotion_service
        .list_active_for_homestay(homestay_id)
        .await?;

    Ok(success(
        promotions.into_iter().map(PromotionResponse::from).collect(),
    ))
}

/// Handler for POST /api/promotions/validate
/// Previews the discount a code would yield for a prospective booking
pub async fn validate_promotion_handler(
    State(state): State<crate::AppState>,
    _user: AuthUser,
    Json(request): Json<ValidatePromotionRequest>,
) -> Result<ApiSuccess<PromotionQuote>, PromotionError> {
    // Validate request
    request
        .validate()
        .map_err(|e| PromotionError::ValidationError(e.to_string()))?;

    let quote = state
        .promotion_service
        .quote(&request.code, request.homestay_id, request.subtotal)
        .await?;

    Ok(success(quote))
}
