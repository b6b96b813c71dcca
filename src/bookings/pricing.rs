use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::bookings::models::BookingStatus;

/// Service for deriving booking prices and the initial payment status
pub struct PricingEngine;

impl PricingEngine {
    /// Number of nights between check-in and check-out
    ///
    /// # Arguments
    /// * `checkin` - Arrival date
    /// * `checkout` - Departure date
    ///
    /// # Returns
    /// Nights as i64; a same-day pair yields 0
    pub fn nights(checkin: NaiveDate, checkout: NaiveDate) -> i64 {
        (checkout - checkin).num_days()
    }

    /// Calculate the line total for one stay
    ///
    /// # Arguments
    /// * `checkin` - Arrival date
    /// * `checkout` - Departure date
    /// * `unit_price` - Nightly price snapshot taken at booking time
    ///
    /// # Returns
    /// Line total as Decimal (nights * unit_price)
    pub fn line_total(checkin: NaiveDate, checkout: NaiveDate, unit_price: Decimal) -> Decimal {
        Decimal::from(Self::nights(checkin, checkout)) * unit_price
    }

    /// Calculate a booking subtotal from its line totals
    ///
    /// # Arguments
    /// * `line_totals` - Slice of line totals for all booking items
    ///
    /// # Returns
    /// Subtotal as Decimal (sum of all line totals)
    pub fn sum_line_totals(line_totals: &[Decimal]) -> Decimal {
        line_totals.iter().sum()
    }

    /// Derive the initial booking status from the payment method
    ///
    /// Cash on delivery starts the booking at `pending`; an absent or blank
    /// method is treated the same way. Any other method parks the booking in
    /// `pending_payment` until the payment callback moves it forward.
    pub fn initial_status(payment_method: Option<&str>) -> BookingStatus {
        match payment_method.map(str::trim) {
            Some(method) if !method.is_empty() && !method.eq_ignore_ascii_case("cod") => {
                BookingStatus::PendingPayment
            }
            _ => BookingStatus::Pending,
        }
    }

    /// Final charge after a discount, floored at zero
    ///
    /// # Arguments
    /// * `subtotal` - Booking subtotal before discount
    /// * `discount` - Discount amount to subtract
    ///
    /// # Returns
    /// Total as Decimal (max(subtotal - discount, 0))
    pub fn total_after_discount(subtotal: Decimal, discount: Decimal) -> Decimal {
        (subtotal - discount).max(Decimal::ZERO)
    }
}
