use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection};

/// Snapshot of a homestay's cached rating columns
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct RatingSnapshot {
    pub rating_avg: Option<Decimal>,
    pub rating_count: i32,
}

/// Recompute entry point for the homestay rating cache
///
/// `homestays.rating_avg` and `homestays.rating_count` are derived values;
/// nothing else in the crate writes them. Callers pass their transaction's
/// connection so the cache moves atomically with the review mutation that
/// invalidated it.
pub struct RatingCalculator;

impl RatingCalculator {
    /// Recalculate the cached average and count for a homestay
    ///
    /// The average is `AVG(rating)` rounded to 2 decimals over reviews that
    /// are both visible and verified; with no matching reviews the average
    /// becomes NULL and the count 0.
    pub async fn recalc(
        conn: &mut PgConnection,
        homestay_id: i32,
    ) -> Result<RatingSnapshot, sqlx::Error> {
        let snapshot = sqlx::query_as::<_, RatingSnapshot>(
            r#"
            UPDATE homestays h
            SET rating_avg = s.avg_rating,
                rating_count = s.review_count
            FROM (
                SELECT ROUND(AVG(rating), 2) AS avg_rating,
                       COUNT(*)::int AS review_count
                FROM reviews
                WHERE homestay_id = $1 AND is_visible AND is_verified
            ) s
            WHERE h.id = $1
            RETURNING h.rating_avg, h.rating_count
            "#,
        )
        .bind(homestay_id)
        .fetch_one(conn)
        .await?;

        Ok(snapshot)
    }
}
