use std::collections::HashMap;

use sqlx::PgPool;
use uuid::Uuid;

use crate::bookings::{Booking, BookingItem};
use crate::reviews::rating_calculator::RatingCalculator;
use crate::reviews::{Review, ReviewError, ReviewImage, ReviewReply};

/// Repository for database operations on reviews
///
/// Every mutation that can change a homestay's rating runs the cache
/// recompute inside the same transaction.
#[derive(Clone)]
pub struct ReviewsRepository {
    pool: PgPool,
}

impl ReviewsRepository {
    /// Create a new ReviewsRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a review with its images and refresh the rating cache
    ///
    /// The unique index on `booking_id` stops a second review for the same
    /// booking; the violation converts to a conflict via `From<sqlx::Error>`.
    pub async fn create(
        &self,
        booking_id: Uuid,
        homestay_id: i32,
        customer_id: i32,
        rating: i32,
        content: &str,
        images: &[String],
    ) -> Result<(Review, Vec<ReviewImage>), ReviewError> {
        let mut tx = self.pool.begin().await?;

        let review = sqlx::query_as::<_, Review>(
            r#"
            INSERT INTO reviews (booking_id, homestay_id, customer_id, rating, content)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, booking_id, homestay_id, customer_id, rating, content,
                      is_visible, is_verified, created_at, updated_at
            "#,
        )
        .bind(booking_id)
        .bind(homestay_id)
        .bind(customer_id)
        .bind(rating)
        .bind(content)
        .fetch_one(&mut *tx)
        .await?;

        let mut inserted_images = Vec::with_capacity(images.len());
        for (sort_order, url) in images.iter().enumerate() {
            let image = sqlx::query_as::<_, ReviewImage>(
                r#"
                INSERT INTO review_images (review_id, url, sort_order)
                VALUES ($1, $2, $3)
                RETURNING id, review_id, url, sort_order
                "#,
            )
            .bind(review.id)
            .bind(url)
            .bind(sort_order as i32)
            .fetch_one(&mut *tx)
            .await?;

            inserted_images.push(image);
        }

        RatingCalculator::recalc(&mut *tx, homestay_id).await?;

        tx.commit().await?;

        Ok((review, inserted_images))
    }

    /// Find a review by ID
    pub async fn find_by_id(&self, review_id: i32) -> Result<Option<Review>, ReviewError> {
        let review = sqlx::query_as::<_, Review>(
            r#"
            SELECT id, booking_id, homestay_id, customer_id, rating, content,
                   is_visible, is_verified, created_at, updated_at
            FROM reviews
            WHERE id = $1
            "#,
        )
        .bind(review_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(review)
    }

    /// Whether a booking already has a review
    pub async fn exists_for_booking(&self, booking_id: Uuid) -> Result<bool, ReviewError> {
        let exists: Option<bool> =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM reviews WHERE booking_id = $1)")
                .bind(booking_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists.unwrap_or(false))
    }

    /// Visible and verified reviews for a homestay, newest first
    pub async fn find_visible_by_homestay(
        &self,
        homestay_id: i32,
    ) -> Result<Vec<Review>, ReviewError> {
        let reviews = sqlx::query_as::<_, Review>(
            r#"
            SELECT id, booking_id, homestay_id, customer_id, rating, content,
                   is_visible, is_verified, created_at, updated_at
            FROM reviews
            WHERE homestay_id = $1 AND is_visible AND is_verified
            ORDER BY id DESC
            "#,
        )
        .bind(homestay_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(reviews)
    }

    /// All reviews written by a customer, newest first
    pub async fn find_by_customer(&self, customer_id: i32) -> Result<Vec<Review>, ReviewError> {
        let reviews = sqlx::query_as::<_, Review>(
            r#"
            SELECT id, booking_id, homestay_id, customer_id, rating, content,
                   is_visible, is_verified, created_at, updated_at
            FROM reviews
            WHERE customer_id = $1
            ORDER BY id DESC
            "#,
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(reviews)
    }

    /// Update rating and/or content and refresh the rating cache
    pub async fn update(
        &self,
        review_id: i32,
        homestay_id: i32,
        rating: Option<i32>,
        content: Option<&str>,
    ) -> Result<Review, ReviewError> {
        let mut tx = self.pool.begin().await?;

        let review = sqlx::query_as::<_, Review>(
            r#"
            UPDATE reviews
            SET rating = COALESCE($1, rating),
                content = COALESCE($2, content),
                updated_at = NOW()
            WHERE id = $3
            RETURNING id, booking_id, homestay_id, customer_id, rating, content,
                      is_visible, is_verified, created_at, updated_at
            "#,
        )
        .bind(rating)
        .bind(content)
        .bind(review_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(ReviewError::NotFound)?;

        RatingCalculator::recalc(&mut *tx, homestay_id).await?;

        tx.commit().await?;

        Ok(review)
    }

    /// Delete a review with its images and reply, refreshing the cache
    pub async fn delete(&self, review_id: i32, homestay_id: i32) -> Result<(), ReviewError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM review_images WHERE review_id = $1")
            .bind(review_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM review_replies WHERE review_id = $1")
            .bind(review_id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(review_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ReviewError::NotFound);
        }

        RatingCalculator::recalc(&mut *tx, homestay_id).await?;

        tx.commit().await?;

        Ok(())
    }

    /// Set the moderation visibility flag and refresh the rating cache
    pub async fn set_visibility(
        &self,
        review_id: i32,
        visible: bool,
    ) -> Result<Review, ReviewError> {
        let mut tx = self.pool.begin().await?;

        let review = sqlx::query_as::<_, Review>(
            r#"
            UPDATE reviews
            SET is_visible = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING id, booking_id, homestay_id, customer_id, rating, content,
                      is_visible, is_verified, created_at, updated_at
            "#,
        )
        .bind(visible)
        .bind(review_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(ReviewError::NotFound)?;

        RatingCalculator::recalc(&mut *tx, review.homestay_id).await?;

        tx.commit().await?;

        Ok(review)
    }

    /// Images for a set of reviews, in display order
    pub async fn images_for(&self, review_ids: &[i32]) -> Result<Vec<ReviewImage>, ReviewError> {
        let images = sqlx::query_as::<_, ReviewImage>(
            r#"
            SELECT id, review_id, url, sort_order
            FROM review_images
            WHERE review_id = ANY($1)
            ORDER BY review_id, sort_order
            "#,
        )
        .bind(review_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(images)
    }

    /// Host replies for a set of reviews
    pub async fn replies_for(&self, review_ids: &[i32]) -> Result<Vec<ReviewReply>, ReviewError> {
        let replies = sqlx::query_as::<_, ReviewReply>(
            r#"
            SELECT id, review_id, owner_id, homestay_id, content, created_at, updated_at
            FROM review_replies
            WHERE review_id = ANY($1)
            "#,
        )
        .bind(review_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(replies)
    }

    /// The host reply for one review, if any
    pub async fn find_reply(&self, review_id: i32) -> Result<Option<ReviewReply>, ReviewError> {
        let reply = sqlx::query_as::<_, ReviewReply>(
            r#"
            SELECT id, review_id, owner_id, homestay_id, content, created_at, updated_at
            FROM review_replies
            WHERE review_id = $1
            "#,
        )
        .bind(review_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(reply)
    }

    /// Create or replace the host reply for a review
    pub async fn upsert_reply(
        &self,
        review_id: i32,
        owner_id: i32,
        homestay_id: i32,
        content: &str,
    ) -> Result<ReviewReply, ReviewError> {
        let reply = sqlx::query_as::<_, ReviewReply>(
            r#"
            INSERT INTO review_replies (review_id, owner_id, homestay_id, content)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (review_id)
            DO UPDATE SET content = EXCLUDED.content, updated_at = NOW()
            RETURNING id, review_id, owner_id, homestay_id, content, created_at, updated_at
            "#,
        )
        .bind(review_id)
        .bind(owner_id)
        .bind(homestay_id)
        .bind(content)
        .fetch_one(&self.pool)
        .await?;

        Ok(reply)
    }

    /// Remove the host reply for a review
    pub async fn delete_reply(&self, review_id: i32) -> Result<(), ReviewError> {
        let result = sqlx::query("DELETE FROM review_replies WHERE review_id = $1")
            .bind(review_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ReviewError::ReplyNotFound);
        }

        Ok(())
    }

    /// Whether the user owns the homestay, checked live against the
    /// homestays table
    pub async fn user_owns_homestay(
        &self,
        user_id: i32,
        homestay_id: i32,
    ) -> Result<bool, ReviewError> {
        let exists: Option<bool> = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM homestays WHERE id = $1 AND owner_id = $2)",
        )
        .bind(homestay_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists.unwrap_or(false))
    }

    /// Booking header and line items for the eligibility check
    pub async fn booking_facts(
        &self,
        booking_id: Uuid,
    ) -> Result<Option<(Booking, Vec<BookingItem>)>, ReviewError> {
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

        let Some(booking) = booking else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, BookingItem>(
            r#"
            SELECT id, booking_id, homestay_id, checkin_date, checkout_date, guests,
                   unit_price, line_total
            FROM booking_items
            WHERE booking_id = $1
            ORDER BY id
            "#,
        )
        .bind(booking_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some((booking, items)))
    }

    /// Display names for a set of customers, falling back to `User #id`
    pub async fn author_names(
        &self,
        customer_ids: &[i32],
    ) -> Result<HashMap<i32, String>, ReviewError> {
        let rows: Vec<(i32, String)> = sqlx::query_as(
            r#"
            SELECT id, COALESCE(NULLIF(TRIM(name), ''), 'User #' || id)
            FROM users
            WHERE id = ANY($1)
            "#,
        )
        .bind(customer_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().collect())
    }
}
