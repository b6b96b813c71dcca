use chrono::NaiveDate;

use crate::auth::Role;
use crate::bookings::error::BookingError;
use crate::bookings::models::BookingStatus;

/// Reason attached when a host (or an admin acting as one) rejects a booking
pub const HOST_CANCELLATION_REASON: &str = "cancelled by host rejection";

/// Fallback reason when a customer cancels without giving one
pub const CUSTOMER_CANCELLATION_REASON: &str = "cancelled by customer request";

/// The acting user's relationship to a booking, resolved before validation
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    pub role: Role,
    /// Actor is the booking's customer of record
    pub is_customer: bool,
    /// Actor owns at least one homestay among the booking's line items
    pub owns_item: bool,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Service for validating booking status transitions
///
/// Transitions are flat rather than a step-by-step pipeline: payment
/// callbacks, hosts, and admins all move bookings between states directly,
/// so the machine only enforces who may request which target and that
/// terminal states stay terminal.
pub struct StatusMachine;

impl StatusMachine {
    /// Check that the requested target is one a client may ask for
    ///
    /// `pending` is an initial state only; it can never be re-entered.
    pub fn validate_target(target: BookingStatus) -> Result<(), BookingError> {
        match target {
            BookingStatus::Confirmed
            | BookingStatus::Cancelled
            | BookingStatus::Completed
            | BookingStatus::Paid
            | BookingStatus::PendingPayment => Ok(()),
            BookingStatus::Pending => Err(BookingError::InvalidStatusTarget(format!(
                "{} is not a valid target status",
                target
            ))),
        }
    }

    /// Check that the booking can still move at all
    pub fn check_source(current: BookingStatus) -> Result<(), BookingError> {
        if current.is_terminal() {
            return Err(BookingError::Conflict(format!(
                "Booking is already {} and cannot change status",
                current
            )));
        }
        Ok(())
    }

    /// Check who may request the transition
    ///
    /// Every transition requires the actor to be the booking's customer, a
    /// host of one of its homestays, or an admin. Completion is further
    /// restricted to hosts and admins.
    pub fn authorize(actor: &Actor, target: BookingStatus) -> Result<(), BookingError> {
        if !(actor.is_customer || actor.owns_item || actor.is_admin()) {
            return Err(BookingError::Forbidden(
                "You do not have access to this booking".to_string(),
            ));
        }

        if target == BookingStatus::Completed && !(actor.owns_item || actor.is_admin()) {
            return Err(BookingError::Forbidden(
                "Only the host or an admin can complete a booking".to_string(),
            ));
        }

        Ok(())
    }

    /// Check that every stay in the booking has ended
    ///
    /// # Arguments
    /// * `last_checkout` - Latest checkout date across the booking's items
    /// * `today` - Current date
    pub fn completion_guard(
        last_checkout: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<(), BookingError> {
        match last_checkout {
            Some(checkout) if today >= checkout => Ok(()),
            Some(checkout) => Err(BookingError::Conflict(format!(
                "Booking cannot be completed before checkout on {}",
                checkout
            ))),
            None => Err(BookingError::Conflict(
                "Booking has no line items to complete".to_string(),
            )),
        }
    }

    /// Resolve the reason text attached to a cancellation notification
    ///
    /// Hosts always cancel with the fixed rejection text, whatever they
    /// typed. Customers may supply free text, defaulted when blank. Admins
    /// pick a side with `as_host`.
    pub fn cancellation_reason(role: Role, supplied: Option<&str>, as_host: bool) -> String {
        if role == Role::Owner || (role == Role::Admin && as_host) {
            return HOST_CANCELLATION_REASON.to_string();
        }

        match supplied.map(str::trim) {
            Some(text) if !text.is_empty() => text.to_string(),
            _ => CUSTOMER_CANCELLATION_REASON.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn customer_of_record() -> Actor {
        Actor {
            role: Role::Customer,
            is_customer: true,
            owns_item: false,
        }
    }

    fn host_of_item() -> Actor {
        Actor {
            role: Role::Owner,
            is_customer: false,
            owns_item: true,
        }
    }

    fn unrelated_admin() -> Actor {
        Actor {
            role: Role::Admin,
            is_customer: false,
            owns_item: false,
        }
    }

    fn stranger() -> Actor {
        Actor {
            role: Role::Customer,
            is_customer: false,
            owns_item: false,
        }
    }

    // Target whitelist

    #[test]
    fn test_valid_targets_accepted() {
        for target in [
            BookingStatus::Confirmed,
            BookingStatus::Cancelled,
            BookingStatus::Completed,
            BookingStatus::Paid,
            BookingStatus::PendingPayment,
        ] {
            assert!(StatusMachine::validate_target(target).is_ok());
        }
    }

    #[test]
    fn test_pending_is_not_a_valid_target() {
        let result = StatusMachine::validate_target(BookingStatus::Pending);
        assert!(matches!(
            result,
            Err(BookingError::InvalidStatusTarget(_))
        ));
    }

    // Terminal source guard

    #[test]
    fn test_non_terminal_sources_can_move() {
        for current in [
            BookingStatus::Pending,
            BookingStatus::PendingPayment,
            BookingStatus::Confirmed,
            BookingStatus::Paid,
        ] {
            assert!(StatusMachine::check_source(current).is_ok());
        }
    }

    #[test]
    fn test_completed_source_is_terminal() {
        let result = StatusMachine::check_source(BookingStatus::Completed);
        assert!(matches!(result, Err(BookingError::Conflict(_))));
    }

    #[test]
    fn test_cancelled_source_is_terminal() {
        let result = StatusMachine::check_source(BookingStatus::Cancelled);
        assert!(matches!(result, Err(BookingError::Conflict(_))));
    }

    // Actor gates

    #[test]
    fn test_customer_can_cancel_own_booking() {
        let result = StatusMachine::authorize(&customer_of_record(), BookingStatus::Cancelled);
        assert!(result.is_ok());
    }

    #[test]
    fn test_customer_can_mark_paid() {
        let result = StatusMachine::authorize(&customer_of_record(), BookingStatus::Paid);
        assert!(result.is_ok());
    }

    #[test]
    fn test_host_can_confirm() {
        let result = StatusMachine::authorize(&host_of_item(), BookingStatus::Confirmed);
        assert!(result.is_ok());
    }

    #[test]
    fn test_stranger_is_forbidden() {
        let result = StatusMachine::authorize(&stranger(), BookingStatus::Cancelled);
        assert!(matches!(result, Err(BookingError::Forbidden(_))));
    }

    #[test]
    fn test_customer_cannot_complete() {
        let result = StatusMachine::authorize(&customer_of_record(), BookingStatus::Completed);
        assert!(matches!(result, Err(BookingError::Forbidden(_))));
    }

    #[test]
    fn test_host_can_complete() {
        let result = StatusMachine::authorize(&host_of_item(), BookingStatus::Completed);
        assert!(result.is_ok());
    }

    #[test]
    fn test_admin_can_complete_without_relationship() {
        let result = StatusMachine::authorize(&unrelated_admin(), BookingStatus::Completed);
        assert!(result.is_ok());
    }

    // Completion date guard

    #[test]
    fn test_completion_blocked_before_checkout() {
        let result = StatusMachine::completion_guard(
            Some(date(2024, 6, 10)),
            date(2024, 6, 9),
        );
        assert!(matches!(result, Err(BookingError::Conflict(_))));
    }

    #[test]
    fn test_completion_allowed_on_checkout_day() {
        let result = StatusMachine::completion_guard(
            Some(date(2024, 6, 10)),
            date(2024, 6, 10),
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_completion_allowed_after_checkout() {
        let result = StatusMachine::completion_guard(
            Some(date(2024, 6, 10)),
            date(2024, 7, 1),
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_completion_blocked_without_items() {
        let result = StatusMachine::completion_guard(None, date(2024, 6, 10));
        assert!(matches!(result, Err(BookingError::Conflict(_))));
    }

    // Cancellation reasons

    #[test]
    fn test_owner_reason_is_fixed() {
        let reason =
            StatusMachine::cancellation_reason(Role::Owner, Some("guest was rude"), false);
        assert_eq!(reason, HOST_CANCELLATION_REASON);
    }

    #[test]
    fn test_customer_reason_is_trimmed_free_text() {
        let reason =
            StatusMachine::cancellation_reason(Role::Customer, Some("  change of plans  "), false);
        assert_eq!(reason, "change of plans");
    }

    #[test]
    fn test_customer_blank_reason_defaults() {
        let reason = StatusMachine::cancellation_reason(Role::Customer, Some("   "), false);
        assert_eq!(reason, CUSTOMER_CANCELLATION_REASON);

        let reason = StatusMachine::cancellation_reason(Role::Customer, None, false);
        assert_eq!(reason, CUSTOMER_CANCELLATION_REASON);
    }

    #[test]
    fn test_admin_as_host_uses_rejection_text() {
        let reason = StatusMachine::cancellation_reason(Role::Admin, Some("fraud"), true);
        assert_eq!(reason, HOST_CANCELLATION_REASON);
    }

    #[test]
    fn test_admin_free_text_without_as_host() {
        let reason = StatusMachine::cancellation_reason(Role::Admin, Some("fraud"), false);
        assert_eq!(reason, "fraud");

        let reason = StatusMachine::cancellation_reason(Role::Admin, None, false);
        assert_eq!(reason, CUSTOMER_CANCELLATION_REASON);
    }
}
