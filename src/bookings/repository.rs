use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::bookings::availability::DateRange;
use crate::bookings::error::BookingError;
use crate::bookings::models::{
    Booking, BookingItem, BookingStatus, MonthlyRevenue, NewBookingItem, RevenueSummary,
    StatusCount,
};
use crate::models::Homestay;

/// Customer row read back for notification payloads
#[derive(Debug, Clone, FromRow)]
pub struct CustomerContact {
    pub email: String,
    pub name: String,
}

/// Everything a transition guard needs, read inside the transaction
pub struct TransitionSnapshot {
    pub booking: Booking,
    pub items: Vec<BookingItem>,
    /// Acting user owns at least one of the line-item homestays
    pub actor_owns_item: bool,
}

/// Repository for homestay reads
#[derive(Clone)]
pub struct HomestaysRepository {
    pool: PgPool,
}

impl HomestaysRepository {
    /// Create a new HomestaysRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a homestay by ID
    pub async fn find_by_id(&self, id: i32) -> Result<Option<Homestay>, BookingError> {
        let homestay = sqlx::query_as::<_, Homestay>(
            r#"
            SELECT id, name, address, city, price_per_day, status, owner_id,
                   rating_avg, rating_count, created_at
            FROM homestays
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(homestay)
    }

    /// Find multiple homestays by IDs
    pub async fn find_by_ids(&self, ids: &[i32]) -> Result<Vec<Homestay>, BookingError> {
        let homestays = sqlx::query_as::<_, Homestay>(
            r#"
            SELECT id, name, address, city, price_per_day, status, owner_id,
                   rating_avg, rating_count, created_at
            FROM homestays
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(homestays)
    }
}

/// Repository for booking operations
#[derive(Clone)]
pub struct BookingsRepository {
    pool: PgPool,
}

impl BookingsRepository {
    /// Create a new BookingsRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a booking with its line items in a transaction
    ///
    /// When a promotion applied, `usage` carries (promotion_id, used_amount)
    /// and a ledger row is appended in the same transaction.
    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        customer_id: i32,
        status: BookingStatus,
        payment_method: Option<&str>,
        note: Option<&str>,
        promotion_code: Option<&str>,
        subtotal: Decimal,
        discount_amount: Decimal,
        total_price: Decimal,
        items: Vec<NewBookingItem>,
        usage: Option<(i32, Decimal)>,
    ) -> Result<(Booking, Vec<BookingItem>), BookingError> {
        let mut tx = self.pool.begin().await?;

        // Insert booking header
        let booking = sqlx::query_as::<_, Booking>(
            r#"
            INSERT INTO bookings (customer_id, status, payment_method, note, promotion_code,
                                  subtotal, discount_amount, total_price)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, customer_id, status, note, payment_method, promotion_code,
                      subtotal, discount_amount, total_price, created_at, updated_at
            "#,
        )
        .bind(customer_id)
        .bind(status)
        .bind(payment_method)
        .bind(note)
        .bind(promotion_code)
        .bind(subtotal)
        .bind(discount_amount)
        .bind(total_price)
        .fetch_one(&mut *tx)
        .await?;

        // Insert line items
        let mut inserted_items = Vec::with_capacity(items.len());
        for item in items {
            let row = sqlx::query_as::<_, BookingItem>(
                r#"
                INSERT INTO booking_items (booking_id, homestay_id, checkin_date, checkout_date,
                                           guests, unit_price, line_total)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING id, booking_id, homestay_id, checkin_date, checkout_date,
                          guests, unit_price, line_total
                "#,
            )
            .bind(booking.id)
            .bind(item.homestay_id)
            .bind(item.checkin_date)
            .bind(item.checkout_date)
            .bind(item.guests)
            .bind(item.unit_price)
            .bind(item.line_total)
            .fetch_one(&mut *tx)
            .await?;

            inserted_items.push(row);
        }

        // Append usage ledger row when a promotion applied
        if let Some((promotion_id, used_amount)) = usage {
            sqlx::query(
                r#"
                INSERT INTO promotion_usages (promotion_id, booking_id, customer_id, used_amount)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(promotion_id)
            .bind(booking.id)
            .bind(customer_id)
            .bind(used_amount)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok((booking, inserted_items))
    }

    /// Find a booking by ID
    pub async fn find_by_id(&self, booking_id: Uuid) -> Result<Option<Booking>, BookingError> {
        let booking = sqlx::query_as::<_, Booking>(
            r#"
            SELECT id, customer_id, status, note, payment_method, promotion_code,
                   subtotal, discount_amount, total_price, created_at, updated_at
            FROM bookings
            WHERE id = $1
            "#,
        )
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(booking)
    }

    /// Find all line items for a booking
    pub async fn find_items(&self, booking_id: Uuid) -> Result<Vec<BookingItem>, BookingError> {
        let items = sqlx::query_as::<_, BookingItem>(
            r#"
            SELECT id, booking_id, homestay_id, checkin_date, checkout_date,
                   guests, unit_price, line_total
            FROM booking_items
            WHERE booking_id = $1
            ORDER BY id
            "#,
        )
        .bind(booking_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Find a customer's bookings, newest first
    pub async fn find_by_customer(&self, customer_id: i32) -> Result<Vec<Booking>, BookingError> {
        let bookings = sqlx::query_as::<_, Booking>(
            r#"
            SELECT id, customer_id, status, note, payment_method, promotion_code,
                   subtotal, discount_amount, total_price, created_at, updated_at
            FROM bookings
            WHERE customer_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(bookings)
    }

    /// Find bookings containing at least one homestay owned by `owner_id`
    pub async fn find_by_owner(&self, owner_id: i32) -> Result<Vec<Booking>, BookingError> {
        let bookings = sqlx::query_as::<_, Booking>(
            r#"
            SELECT DISTINCT b.id, b.customer_id, b.status, b.note, b.payment_method,
                   b.promotion_code, b.subtotal, b.discount_amount, b.total_price,
                   b.created_at, b.updated_at
            FROM bookings b
            JOIN booking_items bi ON bi.booking_id = b.id
            JOIN homestays h ON h.id = bi.homestay_id
            WHERE h.owner_id = $1
            ORDER BY b.created_at DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(bookings)
    }

    /// Find every booking, newest first
    pub async fn find_all(&self) -> Result<Vec<Booking>, BookingError> {
        let bookings = sqlx::query_as::<_, Booking>(
            r#"
            SELECT id, customer_id, status, note, payment_method, promotion_code,
                   subtotal, discount_amount, total_price, created_at, updated_at
            FROM bookings
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(bookings)
    }

    /// Check whether a user owns any homestay among the booking's items
    pub async fn actor_owns_item(
        &self,
        booking_id: Uuid,
        user_id: i32,
    ) -> Result<bool, BookingError> {
        let owns: Option<bool> = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1
                FROM booking_items bi
                JOIN homestays h ON h.id = bi.homestay_id
                WHERE bi.booking_id = $1 AND h.owner_id = $2
            )
            "#,
        )
        .bind(booking_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(owns.unwrap_or(false))
    }

    /// Apply a status transition inside one transaction
    ///
    /// Reads the booking, its items, and the actor's item ownership, runs
    /// the guard against that snapshot, then writes the new status and reads
    /// back the customer contact for the notification. A guard error rolls
    /// the transaction back with nothing written.
    pub async fn transition_status<F>(
        &self,
        booking_id: Uuid,
        actor_id: Option<i32>,
        new_status: BookingStatus,
        guard: F,
    ) -> Result<(Booking, Vec<BookingItem>, Option<CustomerContact>), BookingError>
    where
        F: FnOnce(&TransitionSnapshot) -> Result<(), BookingError>,
    {
        let mut tx = self.pool.begin().await?;

        let booking = sqlx::query_as::<_, Booking>(
            r#"
            SELECT id, customer_id, status, note, payment_method, promotion_code,
                   subtotal, discount_amount, total_price, created_at, updated_at
            FROM bookings
            WHERE id = $1
            "#,
        )
        .bind(booking_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(BookingError::NotFound)?;

        let items = sqlx::query_as::<_, BookingItem>(
            r#"
            SELECT id, booking_id, homestay_id, checkin_date, checkout_date,
                   guests, unit_price, line_total
            FROM booking_items
            WHERE booking_id = $1
            ORDER BY id
            "#,
        )
        .bind(booking_id)
        .fetch_all(&mut *tx)
        .await?;

        let actor_owns_item = match actor_id {
            Some(user_id) => {
                let owns: Option<bool> = sqlx::query_scalar(
                    r#"
                    SELECT EXISTS(
                        SELECT 1
                        FROM booking_items bi
                        JOIN homestays h ON h.id = bi.homestay_id
                        WHERE bi.booking_id = $1 AND h.owner_id = $2
                    )
                    "#,
                )
                .bind(booking_id)
                .bind(user_id)
                .fetch_one(&mut *tx)
                .await?;
                owns.unwrap_or(false)
            }
            None => false,
        };

        let snapshot = TransitionSnapshot {
            booking,
            items,
            actor_owns_item,
        };
        guard(&snapshot)?;

        let updated = sqlx::query_as::<_, Booking>(
            r#"
            UPDATE bookings
            SET status = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING id, customer_id, status, note, payment_method, promotion_code,
                      subtotal, discount_amount, total_price, created_at, updated_at
            "#,
        )
        .bind(new_status)
        .bind(booking_id)
        .fetch_one(&mut *tx)
        .await?;

        let contact = sqlx::query_as::<_, CustomerContact>(
            "SELECT email, name FROM users WHERE id = $1",
        )
        .bind(updated.customer_id)
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok((updated, snapshot.items, contact))
    }

    /// Update the customer note on a booking
    pub async fn update_note(
        &self,
        booking_id: Uuid,
        note: &str,
    ) -> Result<Booking, BookingError> {
        let booking = sqlx::query_as::<_, Booking>(
            r#"
            UPDATE bookings
            SET note = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING id, customer_id, status, note, payment_method, promotion_code,
                      subtotal, discount_amount, total_price, created_at, updated_at
            "#,
        )
        .bind(note)
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(BookingError::NotFound)?;

        Ok(booking)
    }

    /// Rebuild the header subtotal from line items and re-derive the total
    ///
    /// The stored discount is kept as is; the total is floored at zero.
    pub async fn recompute_total(&self, booking_id: Uuid) -> Result<Booking, BookingError> {
        let mut tx = self.pool.begin().await?;

        let line_sum: Decimal = sqlx::query_scalar(
            "SELECT COALESCE(SUM(line_total), 0) FROM booking_items WHERE booking_id = $1",
        )
        .bind(booking_id)
        .fetch_one(&mut *tx)
        .await?;

        let booking = sqlx::query_as::<_, Booking>(
            r#"
            UPDATE bookings
            SET subtotal = $1,
                total_price = GREATEST($1 - discount_amount, 0),
                updated_at = NOW()
            WHERE id = $2
            RETURNING id, customer_id, status, note, payment_method, promotion_code,
                      subtotal, discount_amount, total_price, created_at, updated_at
            "#,
        )
        .bind(line_sum)
        .bind(booking_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(BookingError::NotFound)?;

        tx.commit().await?;

        Ok(booking)
    }

    /// Delete a booking, its items, and its usage rows in one transaction
    ///
    /// The guard runs against the header read inside the transaction; a
    /// guard error rolls everything back.
    pub async fn delete_with_guard<F>(
        &self,
        booking_id: Uuid,
        guard: F,
    ) -> Result<(), BookingError>
    where
        F: FnOnce(&Booking) -> Result<(), BookingError>,
    {
        let mut tx = self.pool.begin().await?;

        let booking = sqlx::query_as::<_, Booking>(
            r#"
            SELECT id, customer_id, status, note, payment_method, promotion_code,
                   subtotal, discount_amount, total_price, created_at, updated_at
            FROM bookings
            WHERE id = $1
            "#,
        )
        .bind(booking_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(BookingError::NotFound)?;

        guard(&booking)?;

        sqlx::query("DELETE FROM promotion_usages WHERE booking_id = $1")
            .bind(booking_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM booking_items WHERE booking_id = $1")
            .bind(booking_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM bookings WHERE id = $1")
            .bind(booking_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(())
    }

    /// Date ranges held against a homestay's calendar
    ///
    /// The status list mirrors `BookingStatus::is_blocking`: cancelled and
    /// completed bookings release their dates.
    pub async fn unavailable_ranges(
        &self,
        homestay_id: i32,
    ) -> Result<Vec<DateRange>, BookingError> {
        let ranges = sqlx::query_as::<_, DateRange>(
            r#"
            SELECT bi.checkin_date AS "start", bi.checkout_date AS "end"
            FROM booking_items bi
            JOIN bookings b ON b.id = bi.booking_id
            WHERE bi.homestay_id = $1
              AND b.status IN ('pending', 'pending_payment', 'confirmed', 'paid')
            ORDER BY bi.checkin_date
            "#,
        )
        .bind(homestay_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ranges)
    }

    /// Read a customer's contact fields for notification payloads
    pub async fn customer_contact(
        &self,
        customer_id: i32,
    ) -> Result<Option<CustomerContact>, BookingError> {
        let contact = sqlx::query_as::<_, CustomerContact>(
            "SELECT email, name FROM users WHERE id = $1",
        )
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(contact)
    }

    /// Aggregate revenue for the admin dashboard
    ///
    /// Only paid and completed bookings count as revenue; the per-status
    /// breakdown covers everything.
    pub async fn revenue_summary(&self) -> Result<RevenueSummary, BookingError> {
        let (total_revenue, total_bookings): (Decimal, i64) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(total_price), 0), COUNT(*)
            FROM bookings
            WHERE status IN ('paid', 'completed')
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let by_status = sqlx::query_as::<_, StatusCount>(
            r#"
            SELECT status, COUNT(*) AS count
            FROM bookings
            GROUP BY status
            ORDER BY status
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let monthly = sqlx::query_as::<_, MonthlyRevenue>(
            r#"
            SELECT TO_CHAR(created_at, 'YYYY-MM') AS month,
                   COALESCE(SUM(total_price), 0) AS revenue,
                   COUNT(*) AS bookings
            FROM bookings
            WHERE status IN ('paid', 'completed')
            GROUP BY TO_CHAR(created_at, 'YYYY-MM')
            ORDER BY month
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(RevenueSummary {
            total_revenue,
            total_bookings,
            by_status,
            monthly,
        })
    }
}
