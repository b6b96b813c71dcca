use chrono::NaiveDate;
use sqlx::PgPool;

use crate::promotions::error::PromotionError;
use crate::promotions::models::Promotion;

/// Repository for promotion lookups
///
/// Usage ledger rows are inserted by the booking creation transaction,
/// not here; this repository is read-only.
#[derive(Clone)]
pub struct PromotionsRepository {
    pool: PgPool,
}

impl PromotionsRepository {
    /// Create a new PromotionsRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a promotion by code, case-insensitively
    ///
    /// Inactive promotions are returned too; the evaluator owns the
    /// activation rule.
    pub async fn find_by_code(&self, code: &str) -> Result<Option<Promotion>, PromotionError> {
        let promotion = sqlx::query_as::<_, Promotion>(
            r#"
            SELECT id, code, name, discount, discount_type, start_date, end_date,
                   max_discount, min_order_amount, status, created_at
            FROM promotions
            WHERE UPPER(code) = UPPER($1)
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(promotion)
    }

    /// Homestay ids explicitly associated with a promotion
    pub async fn scoped_homestay_ids(&self, promotion_id: i32) -> Result<Vec<i32>, PromotionError> {
        let ids: Vec<i32> = sqlx::query_scalar(
            "SELECT homestay_id FROM promotion_homestays WHERE promotion_id = $1",
        )
        .bind(promotion_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    /// Promotions currently applicable to a homestay: active, inside their
    /// validity window, and explicitly associated
    pub async fn list_active_for_homestay(
        &self,
        homestay_id: i32,
        today: NaiveDate,
    ) -> Result<Vec<Promotion>, PromotionError> {
        let promotions = sqlx::query_as::<_, Promotion>(
            r#"
            SELECT p.id, p.code, p.name, p.discount, p.discount_type, p.start_date, p.end_date,
                   p.max_discount, p.min_order_amount, p.status, p.created_at
            FROM promotions p
            JOIN promotion_homestays ph ON ph.promotion_id = p.id
            WHERE ph.homestay_id = $1
              AND p.status = 'active'
              AND p.start_date <= $2
              AND p.end_date >= $2
            ORDER BY p.end_date, p.id
            "#,
        )
        .bind(homestay_id)
        .bind(today)
        .fetch_all(&self.pool)
        .await?;

        Ok(promotions)
    }
}
