use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::validation::validate_non_negative_amount;

/// Booking status enum representing the lifecycle of a booking
///
/// Initial state is `pending` (cash on delivery) or `pending_payment`
/// (any other payment method). `completed` and `cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    PendingPayment,
    Confirmed,
    Paid,
    Completed,
    Cancelled,
}

impl BookingStatus {
    /// Convert status to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::PendingPayment => "pending_payment",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Paid => "paid",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    /// Parse status from string
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(BookingStatus::Pending),
            "pending_payment" => Ok(BookingStatus::PendingPayment),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "paid" => Ok(BookingStatus::Paid),
            "completed" => Ok(BookingStatus::Completed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            _ => Err(format!("Invalid booking status: {}", s)),
        }
    }

    /// Terminal states admit no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Cancelled)
    }

    /// Blocking states reserve a homestay's calendar against new bookings
    pub fn is_blocking(&self) -> bool {
        matches!(
            self,
            BookingStatus::Pending
                | BookingStatus::PendingPayment
                | BookingStatus::Paid
                | BookingStatus::Confirmed
        )
    }
}

impl Default for BookingStatus {
    fn default() -> Self {
        BookingStatus::Pending
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Domain model representing a booking header in the database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Booking {
    pub id: Uuid,
    pub customer_id: i32,
    pub status: BookingStatus,
    pub note: Option<String>,
    pub payment_method: Option<String>,
    pub promotion_code: Option<String>,
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub total_price: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Domain model representing a line item within a booking
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BookingItem {
    pub id: i32,
    pub booking_id: Uuid,
    pub homestay_id: i32,
    pub checkin_date: NaiveDate,
    pub checkout_date: NaiveDate,
    pub guests: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

/// A line item prepared for insertion (prices already snapshotted)
#[derive(Debug, Clone)]
pub struct NewBookingItem {
    pub homestay_id: i32,
    pub checkin_date: NaiveDate,
    pub checkout_date: NaiveDate,
    pub guests: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

/// Request DTO for one line item of a new booking
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BookingItemRequest {
    pub homestay_id: i32,
    pub checkin_date: NaiveDate,
    pub checkout_date: NaiveDate,
    /// Defaults to 1 and is floored at 1
    pub guests: Option<i32>,
}

/// Request DTO for creating a new booking
#[derive(Debug, Deserialize, Validate)]
pub struct CreateBookingRequest {
    #[validate(length(min = 1, message = "Booking must contain at least one item"))]
    pub items: Vec<BookingItemRequest>,
    pub payment_method: Option<String>,
    pub note: Option<String>,
    pub promotion_code: Option<String>,
    #[validate(custom = "validate_non_negative_amount")]
    pub subtotal: Decimal,
    /// Accepted from the trusted service caller only; ignored for user
    /// sessions, whose identity comes from the token
    pub customer_id: Option<i32>,
}

/// Request DTO for updating booking status
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateStatusRequest {
    pub status: BookingStatus,
    /// Free-text cancellation reason (customers and admins)
    pub reason: Option<String>,
    /// Admin-only flag selecting the host-rejection reason
    pub as_host: Option<bool>,
}

/// Request DTO for updating the booking note
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateNoteRequest {
    #[validate(length(max = 1000, message = "Note must be at most 1000 characters"))]
    pub note: String,
}

/// Response DTO for a booking with its line items
#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub id: Uuid,
    pub customer_id: i32,
    pub status: BookingStatus,
    pub note: Option<String>,
    pub payment_method: Option<String>,
    pub promotion_code: Option<String>,
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub total_price: Decimal,
    pub items: Vec<BookingItemResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BookingResponse {
    pub fn from_parts(booking: Booking, items: Vec<BookingItem>) -> Self {
        Self {
            id: booking.id,
            customer_id: booking.customer_id,
            status: booking.status,
            note: booking.note,
            payment_method: booking.payment_method,
            promotion_code: booking.promotion_code,
            subtotal: booking.subtotal,
            discount_amount: booking.discount_amount,
            total_price: booking.total_price,
            items: items.into_iter().map(|item| item.into()).collect(),
            created_at: booking.created_at,
            updated_at: booking.updated_at,
        }
    }
}

/// Response DTO for a booking line item
#[derive(Debug, Serialize)]
pub struct BookingItemResponse {
    pub id: i32,
    pub homestay_id: i32,
    pub checkin_date: NaiveDate,
    pub checkout_date: NaiveDate,
    pub guests: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

impl From<BookingItem> for BookingItemResponse {
    fn from(item: BookingItem) -> Self {
        Self {
            id: item.id,
            homestay_id: item.homestay_id,
            checkin_date: item.checkin_date,
            checkout_date: item.checkout_date,
            guests: item.guests,
            unit_price: item.unit_price,
            line_total: item.line_total,
        }
    }
}

/// Response DTO for the single-booking read: `{header, details}`
///
/// The automated caller consumes this exact shape; keep the field names
/// stable.
#[derive(Debug, Serialize)]
pub struct BookingDetailResponse {
    pub header: Booking,
    pub details: Vec<BookingItemResponse>,
}

impl BookingDetailResponse {
    pub fn from_parts(booking: Booking, items: Vec<BookingItem>) -> Self {
        Self {
            header: booking,
            details: items.into_iter().map(|item| item.into()).collect(),
        }
    }
}

/// Per-status booking count for the revenue summary
#[derive(Debug, Serialize, FromRow)]
pub struct StatusCount {
    pub status: BookingStatus,
    pub count: i64,
}

/// Per-month revenue over paid and completed bookings
#[derive(Debug, Serialize, FromRow)]
pub struct MonthlyRevenue {
    pub month: String,
    pub revenue: Decimal,
    pub bookings: i64,
}

/// Response DTO for GET /api/bookings/admin/revenue
#[derive(Debug, Serialize)]
pub struct RevenueSummary {
    pub total_revenue: Decimal,
    pub total_bookings: i64,
    pub by_status: Vec<StatusCount>,
    pub monthly: Vec<MonthlyRevenue>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_with_snake_case() {
        assert_eq!(
            serde_json::to_string(&BookingStatus::PendingPayment).unwrap(),
            "\"pending_payment\""
        );
        assert_eq!(
            serde_json::from_str::<BookingStatus>("\"pending_payment\"").unwrap(),
            BookingStatus::PendingPayment
        );
    }

    #[test]
    fn unknown_status_fails_deserialization() {
        assert!(serde_json::from_str::<BookingStatus>("\"archived\"").is_err());
    }

    #[test]
    fn blocking_set_excludes_terminal_states() {
        assert!(BookingStatus::Pending.is_blocking());
        assert!(BookingStatus::PendingPayment.is_blocking());
        assert!(BookingStatus::Paid.is_blocking());
        assert!(BookingStatus::Confirmed.is_blocking());
        assert!(!BookingStatus::Completed.is_blocking());
        assert!(!BookingStatus::Cancelled.is_blocking());
    }

    #[test]
    fn terminal_states() {
        assert!(BookingStatus::Completed.is_terminal());
        assert!(BookingStatus::Cancelled.is_terminal());
        assert!(!BookingStatus::Pending.is_terminal());
        assert!(!BookingStatus::PendingPayment.is_terminal());
        assert!(!BookingStatus::Confirmed.is_terminal());
        assert!(!BookingStatus::Paid.is_terminal());
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            BookingStatus::Pending,
            BookingStatus::PendingPayment,
            BookingStatus::Confirmed,
            BookingStatus::Paid,
            BookingStatus::Completed,
            BookingStatus::Cancelled,
        ] {
            assert_eq!(BookingStatus::from_str(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn create_request_deserializes_frontend_payload() {
        let json = r#"{
            "items": [
                {"homestay_id": 3, "checkin_date": "2024-06-01", "checkout_date": "2024-06-03", "guests": 2}
            ],
            "payment_method": "cod",
            "note": "late arrival",
            "promotion_code": "SUMMER20",
            "subtotal": "1000000"
        }"#;

        let request: CreateBookingRequest =
            serde_json::from_str(json).expect("Failed to deserialize CreateBookingRequest");

        assert_eq!(request.items.len(), 1);
        assert_eq!(request.items[0].homestay_id, 3);
        assert_eq!(request.items[0].guests, Some(2));
        assert_eq!(request.payment_method.as_deref(), Some("cod"));
        assert_eq!(request.promotion_code.as_deref(), Some("SUMMER20"));
        assert!(request.customer_id.is_none());
    }

    #[test]
    fn guests_may_be_omitted() {
        let json = r#"{
            "items": [
                {"homestay_id": 1, "checkin_date": "2024-06-01", "checkout_date": "2024-06-02"}
            ],
            "subtotal": "500000"
        }"#;

        let request: CreateBookingRequest =
            serde_json::from_str(json).expect("Failed to deserialize CreateBookingRequest");

        assert_eq!(request.items[0].guests, None);
        assert!(request.payment_method.is_none());
    }
}
