// HTTP handlers for booking endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::{AuthUser, Caller};
use crate::bookings::{
    BookingDetailResponse, BookingError, BookingResponse, CreateBookingRequest, RevenueSummary,
    UpdateNoteRequest, UpdateStatusRequest,
};
use crate::response::{created, success, ApiSuccess};

/// Handler for POST /api/bookings
/// Creates a booking for the authenticated customer, or for a named
/// customer when called by the trusted service
pub async fn create_booking_handler(
    State(state): State<crate::AppState>,
    caller: Caller,
    Json(request): Json<CreateBookingRequest>,
) -> Result<(StatusCode, ApiSuccess<BookingResponse>), BookingError> {
    // Validate request
    request
        .validate()
        .map_err(|e| BookingError::ValidationError(e.to_string()))?;

    let booking = state
        .booking_service
        .create_booking(&caller, request)
        .await?;

    Ok(created(booking))
}

/// Handler for GET /api/bookings/{booking_id}
/// Returns the booking header with its line items
pub async fn get_booking_handler(
    State(state): State<crate::AppState>,
    caller: Caller,
    Path(booking_id): Path<Uuid>,
) -> Result<ApiSuccess<BookingDetailResponse>, BookingError> {
    let detail = state.booking_service.get_booking(&caller, booking_id).await?;

    Ok(success(detail))
}

/// Handler for GET /api/bookings/mine
/// Lists the authenticated customer's bookings, newest first
pub async fn get_my_bookings_handler(
    State(state): State<crate::AppState>,
    user: AuthUser,
) -> Result<ApiSuccess<Vec<BookingResponse>>, BookingError> {
    let bookings = state.booking_service.get_my_bookings(&user).await?;

    Ok(success(bookings))
}

/// Handler for GET /api/bookings/owner
/// Lists bookings touching the host's homestays
pub async fn get_owner_bookings_handler(
    State(state): State<crate::AppState>,
    user: AuthUser,
) -> Result<ApiSuccess<Vec<BookingResponse>>, BookingError> {
    let bookings = state.booking_service.get_owner_bookings(&user).await?;

    Ok(success(bookings))
}

/// Handler for GET /api/bookings/admin
/// Lists every booking (admin only; authorization in the service layer)
pub async fn get_all_bookings_handler(
    State(state): State<crate::AppState>,
    user: AuthUser,
) -> Result<ApiSuccess<Vec<BookingResponse>>, BookingError> {
    let bookings = state.booking_service.get_all_bookings(&user).await?;

    Ok(success(bookings))
}

/// Handler for GET /api/bookings/admin/revenue
/// Revenue totals and per-status counts for the admin dashboard
pub async fn revenue_summary_handler(
    State(state): State<crate::AppState>,
    user: AuthUser,
) -> Result<ApiSuccess<RevenueSummary>, BookingError> {
    let summary = state.booking_service.revenue_summary(&user).await?;

    Ok(success(summary))
}

/// Handler for PATCH /api/bookings/{booking_id}/status
/// Moves a booking to a new status and emails the customer
pub async fn update_status_handler(
    State(state): State<crate::AppState>,
    user: AuthUser,
    Path(booking_id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<ApiSuccess<BookingResponse>, BookingError> {
    let booking = state
        .booking_service
        .update_status(&user, booking_id, request)
        .await?;

    Ok(success(booking))
}

/// Handler for PATCH /api/bookings/{booking_id}/note
/// Updates the customer note on a booking
pub async fn update_note_handler(
    State(state): State<crate::AppState>,
    user: AuthUser,
    Path(booking_id): Path<Uuid>,
    Json(request): Json<UpdateNoteRequest>,
) -> Result<ApiSuccess<BookingResponse>, BookingError> {
    // Validate request
    request
        .validate()
        .map_err(|e| BookingError::ValidationError(e.to_string()))?;

    let booking = state
        .booking_service
        .update_note(&user, booking_id, &request.note)
        .await?;

    Ok(success(booking))
}

/// Handler for POST /api/bookings/{booking_id}/send-confirmation
/// Re-sends the status email for the booking's current state
pub async fn send_confirmation_handler(
    State(state): State<crate::AppState>,
    caller: Caller,
    Path(booking_id): Path<Uuid>,
) -> Result<ApiSuccess<serde_json::Value>, BookingError> {
    state
        .booking_service
        .send_confirmation(&caller, booking_id)
        .await?;

    Ok(success(json!({ "message": "Confirmation email queued" })))
}

/// Handler for DELETE /api/bookings/{booking_id}
/// Removes a booking with its line items and promotion usage rows
pub async fn delete_booking_handler(
    State(state): State<crate::AppState>,
    user: AuthUser,
    Path(booking_id): Path<Uuid>,
) -> Result<StatusCode, BookingError> {
    state
        .booking_service
        .delete_booking(&user, booking_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
