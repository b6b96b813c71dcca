use chrono::Utc;
use rust_decimal::Decimal;

use crate::promotions::error::PromotionError;
use crate::promotions::evaluator::PromotionEvaluator;
use crate::promotions::models::{AppliedPromotion, Promotion, PromotionQuote};
use crate::promotions::repository::PromotionsRepository;

/// Service for promotion evaluation
#[derive(Clone)]
pub struct PromotionService {
    repository: PromotionsRepository,
}

impl PromotionService {
    /// Create a new PromotionService
    pub fn new(repository: PromotionsRepository) -> Self {
        Self { repository }
    }

    /// Evaluate a promotion code against one homestay and subtotal
    ///
    /// # Arguments
    /// * `code` - Caller-supplied promotion code
    /// * `homestay_id` - Target homestay (the booking's first line item)
    /// * `subtotal` - Caller-supplied booking subtotal
    ///
    /// # Returns
    /// `Some(AppliedPromotion)` when a nonzero discount applies, `None`
    /// otherwise. Unknown codes and failed rules are not errors.
    pub async fn evaluate_code(
        &self,
        code: &str,
        homestay_id: i32,
        subtotal: Decimal,
    ) -> Result<Option<AppliedPromotion>, PromotionError> {
        let promotion = match self.repository.find_by_code(code).await? {
            Some(promotion) => promotion,
            None => {
                tracing::debug!("Promotion code {} does not resolve", code);
                return Ok(None);
            }
        };

        let scoped = self.repository.scoped_homestay_ids(promotion.id).await?;
        let today = Utc::now().date_naive();

        let discount =
            PromotionEvaluator::evaluate(&promotion, &scoped, homestay_id, subtotal, today);

        if discount.is_zero() {
            tracing::debug!(
                "Promotion {} evaluated to zero for homestay {} (subtotal {})",
                promotion.code,
                homestay_id,
                subtotal
            );
            return Ok(None);
        }

        Ok(Some(AppliedPromotion {
            promotion_id: promotion.id,
            code: promotion.code,
            discount,
        }))
    }

    /// Preview a code for the checkout UI
    pub async fn quote(
        &self,
        code: &str,
        homestay_id: i32,
        subtotal: Decimal,
    ) -> Result<PromotionQuote, PromotionError> {
        let applied = self.evaluate_code(code, homestay_id, subtotal).await?;

        Ok(match applied {
            Some(applied) => PromotionQuote {
                code: applied.code,
                applicable: true,
                discount: applied.discount,
                promotion_id: Some(applied.promotion_id),
            },
            None => PromotionQuote {
                code: code.to_string(),
                applicable: false,
                discount: Decimal::ZERO,
                promotion_id: None,
            },
        })
    }

    /// Promotions currently applicable to a homestay
    pub async fn list_active_for_homestay(
        &self,
        homestay_id: i32,
    ) -> Result<Vec<Promotion>, PromotionError> {
        let today = Utc::now().date_naive();
        self.repository
            .list_active_for_homestay(homestay_id, today)
            .await
    }
}
