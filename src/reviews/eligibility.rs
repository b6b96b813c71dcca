use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::bookings::{Booking, BookingItem, BookingStatus};

/// Hours after creation during which the author may edit or delete
pub const EDIT_WINDOW_HOURS: i64 = 48;

/// Whether a booking can be reviewed by a customer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Eligibility {
    Eligible { homestay_id: i32 },
    NotEligible(IneligibilityReason),
}

/// Why a booking cannot be reviewed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IneligibilityReason {
    NotYourBooking,
    StayNotOver,
    StatusNotReviewable(BookingStatus),
    AlreadyReviewed,
}

impl IneligibilityReason {
    pub fn message(&self) -> String {
        match self {
            IneligibilityReason::NotYourBooking => "Booking does not belong to you".to_string(),
            IneligibilityReason::StayNotOver => {
                "A stay can only be reviewed after checkout".to_string()
            }
            IneligibilityReason::StatusNotReviewable(status) => {
                format!("A {} booking cannot be reviewed", status)
            }
            IneligibilityReason::AlreadyReviewed => {
                "This booking has already been reviewed".to_string()
            }
        }
    }
}

/// Decide whether `customer_id` may review the booking
///
/// Checks run in order: the booking must belong to the customer, the
/// latest checkout across its line items must be on or before `today`,
/// the status must be one of `confirmed`, `paid` or `completed`, and no
/// review may exist yet. When eligible, the first line item's homestay
/// is the one the review attaches to.
pub fn assess(
    booking: &Booking,
    items: &[BookingItem],
    customer_id: i32,
    has_review: bool,
    today: NaiveDate,
) -> Eligibility {
    if booking.customer_id != customer_id {
        return Eligibility::NotEligible(IneligibilityReason::NotYourBooking);
    }

    // A booking with no line items has no checkout to wait for, so it is
    // never reviewable
    match items.iter().map(|item| item.checkout_date).max() {
        Some(last_checkout) if last_checkout <= today => {}
        _ => return Eligibility::NotEligible(IneligibilityReason::StayNotOver),
    }

    if !matches!(
        booking.status,
        BookingStatus::Confirmed | BookingStatus::Paid | BookingStatus::Completed
    ) {
        return Eligibility::NotEligible(IneligibilityReason::StatusNotReviewable(booking.status));
    }

    if has_review {
        return Eligibility::NotEligible(IneligibilityReason::AlreadyReviewed);
    }

    Eligibility::Eligible {
        homestay_id: items[0].homestay_id,
    }
}

/// Whether `now` still falls inside the author edit window
///
/// The boundary is inclusive: a review is still editable at exactly 48
/// hours after creation.
pub fn within_edit_window(created_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now - created_at <= Duration::hours(EDIT_WINDOW_HOURS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn booking(customer_id: i32, status: BookingStatus) -> Booking {
        Booking {
            id: Uuid::new_v4(),
            customer_id,
            status,
            note: None,
            payment_method: Some("cod".to_string()),
            promotion_code: None,
            subtotal: dec!(1000000),
            discount_amount: dec!(0),
            total_price: dec!(1000000),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn item(booking_id: Uuid, homestay_id: i32, checkout: NaiveDate) -> BookingItem {
        BookingItem {
            id: 1,
            booking_id,
            homestay_id,
            checkin_date: checkout - Duration::days(2),
            checkout_date: checkout,
            guests: 2,
            unit_price: dec!(500000),
            line_total: dec!(1000000),
        }
    }

    #[test]
    fn test_eligible_booking_names_first_homestay() {
        let booking = booking(7, BookingStatus::Paid);
        let items = vec![
            item(booking.id, 31, date(2024, 6, 3)),
            item(booking.id, 44, date(2024, 6, 5)),
        ];

        let result = assess(&booking, &items, 7, false, date(2024, 6, 5));
        assert_eq!(result, Eligibility::Eligible { homestay_id: 31 });
    }

    #[test]
    fn test_someone_elses_booking_is_not_yours() {
        let booking = booking(7, BookingStatus::Paid);
        let items = vec![item(booking.id, 31, date(2024, 6, 3))];

        let result = assess(&booking, &items, 8, false, date(2024, 6, 10));
        assert_eq!(
            result,
            Eligibility::NotEligible(IneligibilityReason::NotYourBooking)
        );
    }

    #[test]
    fn test_future_checkout_blocks_review() {
        let booking = booking(7, BookingStatus::Paid);
        let items = vec![item(booking.id, 31, date(2024, 6, 10))];

        let result = assess(&booking, &items, 7, false, date(2024, 6, 5));
        assert_eq!(
            result,
            Eligibility::NotEligible(IneligibilityReason::StayNotOver)
        );
    }

    #[test]
    fn test_checkout_day_itself_is_reviewable() {
        let booking = booking(7, BookingStatus::Completed);
        let items = vec![item(booking.id, 31, date(2024, 6, 5))];

        let result = assess(&booking, &items, 7, false, date(2024, 6, 5));
        assert_eq!(result, Eligibility::Eligible { homestay_id: 31 });
    }

    #[test]
    fn test_latest_checkout_governs_multi_item_bookings() {
        let booking = booking(7, BookingStatus::Paid);
        let items = vec![
            item(booking.id, 31, date(2024, 6, 3)),
            item(booking.id, 44, date(2024, 6, 9)),
        ];

        // First stay is over but the second is not
        let result = assess(&booking, &items, 7, false, date(2024, 6, 5));
        assert_eq!(
            result,
            Eligibility::NotEligible(IneligibilityReason::StayNotOver)
        );
    }

    #[test]
    fn test_booking_without_items_is_not_reviewable() {
        let booking = booking(7, BookingStatus::Paid);

        let result = assess(&booking, &[], 7, false, date(2024, 6, 5));
        assert_eq!(
            result,
            Eligibility::NotEligible(IneligibilityReason::StayNotOver)
        );
    }

    #[test]
    fn test_unreviewable_statuses() {
        for status in [
            BookingStatus::Pending,
            BookingStatus::PendingPayment,
            BookingStatus::Cancelled,
        ] {
            let booking = booking(7, status);
            let items = vec![item(booking.id, 31, date(2024, 6, 3))];

            let result = assess(&booking, &items, 7, false, date(2024, 6, 10));
            assert_eq!(
                result,
                Eligibility::NotEligible(IneligibilityReason::StatusNotReviewable(status))
            );
        }
    }

    #[test]
    fn test_reviewable_statuses() {
        for status in [
            BookingStatus::Confirmed,
            BookingStatus::Paid,
            BookingStatus::Completed,
        ] {
            let booking = booking(7, status);
            let items = vec![item(booking.id, 31, date(2024, 6, 3))];

            let result = assess(&booking, &items, 7, false, date(2024, 6, 10));
            assert_eq!(result, Eligibility::Eligible { homestay_id: 31 });
        }
    }

    #[test]
    fn test_existing_review_blocks_another() {
        let booking = booking(7, BookingStatus::Completed);
        let items = vec![item(booking.id, 31, date(2024, 6, 3))];

        let result = assess(&booking, &items, 7, true, date(2024, 6, 10));
        assert_eq!(
            result,
            Eligibility::NotEligible(IneligibilityReason::AlreadyReviewed)
        );
    }

    #[test]
    fn test_edit_window_boundary() {
        let created = Utc::now();

        assert!(within_edit_window(created, created));
        assert!(within_edit_window(created, created + Duration::hours(47)));
        // Inclusive at exactly 48 hours
        assert!(within_edit_window(created, created + Duration::hours(48)));
        assert!(!within_edit_window(
            created,
            created + Duration::hours(48) + Duration::seconds(1)
        ));
    }
}
