use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::auth::{AuthUser, Caller, Role};
use crate::bookings::availability::{find_conflict, DateRange, OverlapPolicy};
use crate::bookings::error::BookingError;
use crate::bookings::models::{
    Booking, BookingDetailResponse, BookingItem, BookingResponse, BookingStatus,
    CreateBookingRequest, NewBookingItem, RevenueSummary, UpdateStatusRequest,
};
use crate::bookings::pricing::PricingEngine;
use crate::bookings::repository::{BookingsRepository, CustomerContact, HomestaysRepository};
use crate::bookings::status_machine::{Actor, StatusMachine};
use crate::notifications::{spawn_dispatch, EmailLineItem, Notifier, StatusEmail};
use crate::promotions::PromotionService;

/// Service for booking business logic
#[derive(Clone)]
pub struct BookingService {
    bookings_repo: BookingsRepository,
    homestays_repo: HomestaysRepository,
    promotions: PromotionService,
    notifier: Arc<dyn Notifier>,
    overlap_policy: OverlapPolicy,
}

impl BookingService {
    /// Create a new BookingService
    pub fn new(
        bookings_repo: BookingsRepository,
        homestays_repo: HomestaysRepository,
        promotions: PromotionService,
        notifier: Arc<dyn Notifier>,
        overlap_policy: OverlapPolicy,
    ) -> Self {
        Self {
            bookings_repo,
            homestays_repo,
            promotions,
            notifier,
            overlap_policy,
        }
    }

    /// Create a new booking
    ///
    /// # Arguments
    /// * `caller` - Authenticated user or the trusted service caller
    /// * `request` - Booking creation request
    ///
    /// # Returns
    /// Created booking with its line items, or an error
    ///
    /// # Validation
    /// - At least one item; check-in on or before check-out per item
    /// - Every homestay must exist; its nightly price is snapshotted
    /// - Requested stays must not collide with blocking bookings (policy)
    /// - Initial status derives from the payment method
    /// - A promotion code is evaluated against the first item's homestay
    ///   and the caller-supplied subtotal; failures mean zero discount
    pub async fn create_booking(
        &self,
        caller: &Caller,
        request: CreateBookingRequest,
    ) -> Result<BookingResponse, BookingError> {
        // 1. Resolve who the booking is for. The trusted service books on
        //    behalf of a customer it names; users book as themselves.
        let customer_id = match caller {
            Caller::User(user) => user.user_id,
            Caller::Service => request.customer_id.ok_or_else(|| {
                BookingError::ValidationError(
                    "customer_id is required for service bookings".to_string(),
                )
            })?,
        };

        if request.items.is_empty() {
            return Err(BookingError::ValidationError(
                "Booking must contain at least one item".to_string(),
            ));
        }

        if caller.is_service()
            && self
                .bookings_repo
                .customer_contact(customer_id)
                .await?
                .is_none()
        {
            return Err(BookingError::CustomerNotFound(customer_id));
        }

        // 2. Validate item dates
        for item in &request.items {
            if item.checkin_date > item.checkout_date {
                return Err(BookingError::ValidationError(format!(
                    "Check-in {} is after check-out {} for homestay {}",
                    item.checkin_date, item.checkout_date, item.homestay_id
                )));
            }
        }

        // 3. Fetch homestays for price snapshots
        let homestay_ids: Vec<i32> = request.items.iter().map(|item| item.homestay_id).collect();
        let homestays = self.homestays_repo.find_by_ids(&homestay_ids).await?;
        let price_map: HashMap<i32, Decimal> = homestays
            .into_iter()
            .map(|homestay| (homestay.id, homestay.price_per_day))
            .collect();

        let mut new_items = Vec::with_capacity(request.items.len());
        for item in &request.items {
            let unit_price = *price_map
                .get(&item.homestay_id)
                .ok_or(BookingError::HomestayNotFound(item.homestay_id))?;

            new_items.push(NewBookingItem {
                homestay_id: item.homestay_id,
                checkin_date: item.checkin_date,
                checkout_date: item.checkout_date,
                guests: item.guests.unwrap_or(1).max(1),
                unit_price,
                line_total: PricingEngine::line_total(
                    item.checkin_date,
                    item.checkout_date,
                    unit_price,
                ),
            });
        }

        // 4. Reject calendar collisions unless the policy allows them
        if self.overlap_policy.rejects() {
            for item in &new_items {
                let requested = DateRange::new(item.checkin_date, item.checkout_date);
                let booked = self
                    .bookings_repo
                    .unavailable_ranges(item.homestay_id)
                    .await?;

                if let Some(conflict) = find_conflict(&requested, &booked) {
                    return Err(BookingError::Conflict(format!(
                        "Homestay {} is already booked from {} to {}",
                        item.homestay_id, conflict.start, conflict.end
                    )));
                }
            }
        }

        // 5. Derive the initial status and the discounted total
        let status = PricingEngine::initial_status(request.payment_method.as_deref());

        let applied = match request.promotion_code.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => {
                self.promotions
                    .evaluate_code(code, request.items[0].homestay_id, request.subtotal)
                    .await?
            }
            _ => None,
        };

        let discount = applied
            .as_ref()
            .map(|applied| applied.discount)
            .unwrap_or(Decimal::ZERO);
        let total = PricingEngine::total_after_discount(request.subtotal, discount);

        // 6. Persist header, items, and the usage ledger row in one transaction
        let (booking, items) = self
            .bookings_repo
            .create(
                customer_id,
                status,
                request.payment_method.as_deref(),
                request.note.as_deref(),
                applied.as_ref().map(|applied| applied.code.as_str()),
                request.subtotal,
                discount,
                total,
                new_items,
                applied
                    .as_ref()
                    .map(|applied| (applied.promotion_id, applied.discount)),
            )
            .await?;

        tracing::info!(
            "Booking {} created for customer {} ({} items, total {})",
            booking.id,
            customer_id,
            items.len(),
            booking.total_price
        );

        Ok(BookingResponse::from_parts(booking, items))
    }

    /// Get a single booking as the `{header, details}` shape
    ///
    /// Visible to the booking's customer, a host of one of its homestays,
    /// an admin, or the trusted service caller.
    pub async fn get_booking(
        &self,
        caller: &Caller,
        booking_id: Uuid,
    ) -> Result<BookingDetailResponse, BookingError> {
        let booking = self
            .bookings_repo
            .find_by_id(booking_id)
            .await?
            .ok_or(BookingError::NotFound)?;

        self.assert_can_view(caller, &booking).await?;

        let items = self.bookings_repo.find_items(booking_id).await?;
        Ok(BookingDetailResponse::from_parts(booking, items))
    }

    /// Get the authenticated customer's bookings, newest first
    pub async fn get_my_bookings(
        &self,
        user: &AuthUser,
    ) -> Result<Vec<BookingResponse>, BookingError> {
        let bookings = self.bookings_repo.find_by_customer(user.user_id).await?;
        self.with_items(bookings).await
    }

    /// Get bookings that touch the host's homestays
    ///
    /// Admins see every booking through the same endpoint.
    pub async fn get_owner_bookings(
        &self,
        user: &AuthUser,
    ) -> Result<Vec<BookingResponse>, BookingError> {
        let bookings = match user.role {
            Role::Admin => self.bookings_repo.find_all().await?,
            Role::Owner => self.bookings_repo.find_by_owner(user.user_id).await?,
            Role::Customer => {
                return Err(BookingError::Forbidden(
                    "Host access required".to_string(),
                ))
            }
        };

        self.with_items(bookings).await
    }

    /// Get every booking (admin only)
    pub async fn get_all_bookings(
        &self,
        user: &AuthUser,
    ) -> Result<Vec<BookingResponse>, BookingError> {
        if !user.is_admin() {
            return Err(BookingError::Forbidden("Admin access required".to_string()));
        }

        let bookings = self.bookings_repo.find_all().await?;
        self.with_items(bookings).await
    }

    /// Revenue summary for the admin dashboard
    pub async fn revenue_summary(&self, user: &AuthUser) -> Result<RevenueSummary, BookingError> {
        if !user.is_admin() {
            return Err(BookingError::Forbidden("Admin access required".to_string()));
        }

        self.bookings_repo.revenue_summary().await
    }

    /// Move a booking to a new status
    ///
    /// # Arguments
    /// * `user` - Acting user (the service caller may not transition)
    /// * `booking_id` - Booking to move
    /// * `request` - Target status plus optional cancellation fields
    ///
    /// # Validation
    /// - Target must be a requestable status (`pending` is initial only)
    /// - Actor must be the customer, an item host, or an admin
    /// - Terminal bookings reject every transition
    /// - Completion needs a host or admin, after the last checkout
    ///
    /// The read, guards, and write run inside one transaction; the status
    /// email is dispatched only after it commits.
    pub async fn update_status(
        &self,
        user: &AuthUser,
        booking_id: Uuid,
        request: UpdateStatusRequest,
    ) -> Result<BookingResponse, BookingError> {
        // 1. The target whitelist needs no database state
        StatusMachine::validate_target(request.status)?;

        let target = request.status;
        let actor_id = user.user_id;
        let actor_role = user.role;
        let today = Utc::now().date_naive();

        // 2. Read, validate, and write inside one transaction
        let (updated, items, contact) = self
            .bookings_repo
            .transition_status(booking_id, Some(actor_id), target, |snapshot| {
                let actor = Actor {
                    role: actor_role,
                    is_customer: snapshot.booking.customer_id == actor_id,
                    owns_item: snapshot.actor_owns_item,
                };

                StatusMachine::authorize(&actor, target)?;
                StatusMachine::check_source(snapshot.booking.status)?;

                if target == BookingStatus::Completed {
                    let last_checkout =
                        snapshot.items.iter().map(|item| item.checkout_date).max();
                    StatusMachine::completion_guard(last_checkout, today)?;
                }

                Ok(())
            })
            .await?;

        // 3. Cancellation reasons ride the notification only and are never
        //    persisted
        let reason = (target == BookingStatus::Cancelled).then(|| {
            StatusMachine::cancellation_reason(
                actor_role,
                request.reason.as_deref(),
                request.as_host.unwrap_or(false),
            )
        });

        // 4. Dispatch the status email after commit
        match contact {
            Some(contact) => self.dispatch_status_email(&updated, &items, &contact, reason),
            None => tracing::warn!(
                "Booking {} has no customer contact, skipping status email",
                updated.id
            ),
        }

        tracing::info!(
            "Booking {} moved to {} by user {}",
            updated.id,
            updated.status,
            actor_id
        );

        Ok(BookingResponse::from_parts(updated, items))
    }

    /// Update the customer note on a booking
    ///
    /// Only the booking's customer may edit the note.
    pub async fn update_note(
        &self,
        user: &AuthUser,
        booking_id: Uuid,
        note: &str,
    ) -> Result<BookingResponse, BookingError> {
        let booking = self
            .bookings_repo
            .find_by_id(booking_id)
            .await?
            .ok_or(BookingError::NotFound)?;

        if booking.customer_id != user.user_id {
            return Err(BookingError::Forbidden(
                "Only the booking's customer can edit its note".to_string(),
            ));
        }

        let updated = self.bookings_repo.update_note(booking_id, note).await?;
        let items = self.bookings_repo.find_items(booking_id).await?;

        Ok(BookingResponse::from_parts(updated, items))
    }

    /// Re-send the status email for a booking's current state
    ///
    /// Same visibility rules as the single-booking read.
    pub async fn send_confirmation(
        &self,
        caller: &Caller,
        booking_id: Uuid,
    ) -> Result<(), BookingError> {
        let booking = self
            .bookings_repo
            .find_by_id(booking_id)
            .await?
            .ok_or(BookingError::NotFound)?;

        self.assert_can_view(caller, &booking).await?;

        let items = self.bookings_repo.find_items(booking_id).await?;
        let contact = self
            .bookings_repo
            .customer_contact(booking.customer_id)
            .await?
            .ok_or(BookingError::CustomerNotFound(booking.customer_id))?;

        self.dispatch_status_email(&booking, &items, &contact, None);

        Ok(())
    }

    /// Delete a booking with its items and usage rows
    ///
    /// Customers may delete their own bookings while they are pending or
    /// cancelled; admins may delete anything.
    pub async fn delete_booking(
        &self,
        user: &AuthUser,
        booking_id: Uuid,
    ) -> Result<(), BookingError> {
        let actor_id = user.user_id;
        let is_admin = user.is_admin();

        self.bookings_repo
            .delete_with_guard(booking_id, |booking| {
                if booking.customer_id != actor_id && !is_admin {
                    return Err(BookingError::Forbidden(
                        "Only the booking's customer or an admin can delete it".to_string(),
                    ));
                }

                if !is_admin
                    && !matches!(
                        booking.status,
                        BookingStatus::Pending | BookingStatus::Cancelled
                    )
                {
                    return Err(BookingError::Conflict(format!(
                        "A {} booking cannot be deleted",
                        booking.status
                    )));
                }

                Ok(())
            })
            .await?;

        tracing::info!("Booking {} deleted by user {}", booking_id, actor_id);

        Ok(())
    }

    /// Rebuild a booking's subtotal from its line items and re-derive the
    /// total (admin only)
    ///
    /// Creation trusts the caller-supplied subtotal; this entry point
    /// reconciles the header whenever line items are adjusted operationally.
    pub async fn recompute_total(
        &self,
        user: &AuthUser,
        booking_id: Uuid,
    ) -> Result<BookingResponse, BookingError> {
        if !user.is_admin() {
            return Err(BookingError::Forbidden("Admin access required".to_string()));
        }

        let booking = self.bookings_repo.recompute_total(booking_id).await?;
        let items = self.bookings_repo.find_items(booking_id).await?;

        Ok(BookingResponse::from_parts(booking, items))
    }

    /// Date ranges currently blocking a homestay's calendar
    pub async fn unavailable_dates(
        &self,
        homestay_id: i32,
    ) -> Result<Vec<DateRange>, BookingError> {
        if self.homestays_repo.find_by_id(homestay_id).await?.is_none() {
            return Err(BookingError::HomestayNotFound(homestay_id));
        }

        self.bookings_repo.unavailable_ranges(homestay_id).await
    }

    /// Visibility rule shared by the single read and the confirmation resend
    async fn assert_can_view(
        &self,
        caller: &Caller,
        booking: &Booking,
    ) -> Result<(), BookingError> {
        if let Caller::User(user) = caller {
            let allowed = booking.customer_id == user.user_id
                || user.is_admin()
                || self
                    .bookings_repo
                    .actor_owns_item(booking.id, user.user_id)
                    .await?;

            if !allowed {
                return Err(BookingError::Forbidden(
                    "You do not have access to this booking".to_string(),
                ));
            }
        }

        Ok(())
    }

    async fn with_items(
        &self,
        bookings: Vec<Booking>,
    ) -> Result<Vec<BookingResponse>, BookingError> {
        let mut responses = Vec::with_capacity(bookings.len());
        for booking in bookings {
            let items = self.bookings_repo.find_items(booking.id).await?;
            responses.push(BookingResponse::from_parts(booking, items));
        }

        Ok(responses)
    }

    fn dispatch_status_email(
        &self,
        booking: &Booking,
        items: &[BookingItem],
        contact: &CustomerContact,
        reason: Option<String>,
    ) {
        let email = StatusEmail {
            booking_id: booking.id,
            status: booking.status.as_str().to_string(),
            to_email: contact.email.clone(),
            to_name: contact.name.clone(),
            total: booking.total_price,
            line_items: items
                .iter()
                .map(|item| EmailLineItem {
                    homestay_id: item.homestay_id,
                    checkin_date: item.checkin_date,
                    checkout_date: item.checkout_date,
                    guests: item.guests,
                    line_total: item.line_total,
                })
                .collect(),
            reason,
        };

        spawn_dispatch(Arc::clone(&self.notifier), email);
    }
}
