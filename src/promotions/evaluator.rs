// Promotion evaluator
//
// Pure decision function: promotion data in, discount amount out. No side
// effects, safe to call speculatively. The usage ledger write is performed
// by the booking creation path, never here.

use crate::promotions::models::{DiscountType, Promotion, PromotionStatus};
use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};

/// Evaluates whether a promotion applies to a booking and computes the
/// discount amount.
///
/// Rules apply in order and short-circuit to zero on the first failure:
/// 1. Promotion must be active.
/// 2. `today` must fall within the validity window (inclusive).
/// 3. The target homestay must be explicitly associated.
/// 4. The subtotal must meet `min_order_amount` when set.
/// 5. Percent discounts are rounded to whole units and capped at
///    `max_discount`; fixed discounts apply as-is.
/// 6. The result is clamped to `[0, subtotal]`.
pub struct PromotionEvaluator;

impl PromotionEvaluator {
    /// Compute the discount a promotion yields for one homestay and subtotal
    ///
    /// # Arguments
    /// * `promotion` - The promotion row resolved from the code
    /// * `scoped_homestays` - Homestay ids explicitly associated with it
    /// * `homestay_id` - The booking's target homestay (first line item)
    /// * `subtotal` - Caller-supplied booking subtotal
    /// * `today` - Evaluation date
    ///
    /// # Returns
    /// The discount amount, zero when the promotion does not apply
    pub fn evaluate(
        promotion: &Promotion,
        scoped_homestays: &[i32],
        homestay_id: i32,
        subtotal: Decimal,
        today: NaiveDate,
    ) -> Decimal {
        // 1. Must be active
        if promotion.status != PromotionStatus::Active {
            return Decimal::ZERO;
        }

        // 2. Must be within the validity window, boundaries included
        if today < promotion.start_date || today > promotion.end_date {
            return Decimal::ZERO;
        }

        // 3. Must be explicitly associated with the target homestay
        if !scoped_homestays.contains(&homestay_id) {
            return Decimal::ZERO;
        }

        // 4. Subtotal must meet the minimum order amount when one is set
        if let Some(min_order) = promotion.min_order_amount {
            if subtotal < min_order {
                return Decimal::ZERO;
            }
        }

        // 5. Raw discount by type
        let raw = match promotion.discount_type {
            DiscountType::Percent => {
                let pct = (subtotal * promotion.discount / Decimal::ONE_HUNDRED)
                    .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
                match promotion.max_discount {
                    Some(cap) => pct.min(cap),
                    None => pct,
                }
            }
            DiscountType::Fixed => promotion.discount,
        };

        // 6. Clamp to [0, subtotal]
        raw.max(Decimal::ZERO).min(subtotal)
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn arb_promotion() -> impl Strategy<Value = Promotion> {
        (
            1i64..10_000_000,
            prop_oneof![Just(DiscountType::Percent), Just(DiscountType::Fixed)],
            prop_oneof![Just(PromotionStatus::Active), Just(PromotionStatus::Inactive)],
            proptest::option::of(1i64..1_000_000),
            proptest::option::of(1i64..10_000_000),
        )
            .prop_map(|(discount, discount_type, status, max_discount, min_order)| Promotion {
                id: 1,
                code: "PROP".to_string(),
                name: "prop".to_string(),
                discount: Decimal::from(discount),
                discount_type,
                start_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
                end_date: NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
                max_discount: max_discount.map(Decimal::from),
                min_order_amount: min_order.map(Decimal::from),
                status,
                created_at: Utc::now(),
            })
    }

    proptest! {
        // The discount never leaves [0, subtotal], whatever the inputs
        #[test]
        fn prop_discount_is_clamped(
            promo in arb_promotion(),
            subtotal in 0i64..100_000_000,
            day in 1u32..=30,
        ) {
            let subtotal = Decimal::from(subtotal);
            let today = NaiveDate::from_ymd_opt(2024, 6, day).unwrap();
            let discount = PromotionEvaluator::evaluate(&promo, &[1], 1, subtotal, today);

            prop_assert!(discount >= Decimal::ZERO);
            prop_assert!(discount <= subtotal);
        }

        // Inactive promotions never discount
        #[test]
        fn prop_inactive_never_discounts(
            mut promo in arb_promotion(),
            subtotal in 0i64..100_000_000,
        ) {
            promo.status = PromotionStatus::Inactive;
            let subtotal = Decimal::from(subtotal);
            let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();

            prop_assert_eq!(
                PromotionEvaluator::evaluate(&promo, &[1], 1, subtotal, today),
                Decimal::ZERO
            );
        }

        // A percent cap is never exceeded
        #[test]
        fn prop_cap_is_never_exceeded(
            discount in 1i64..=100,
            cap in 1i64..1_000_000,
            subtotal in 0i64..100_000_000,
        ) {
            let promo = Promotion {
                id: 1,
                code: "CAP".to_string(),
                name: "cap".to_string(),
                discount: Decimal::from(discount),
                discount_type: DiscountType::Percent,
                start_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
                end_date: NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
                max_discount: Some(Decimal::from(cap)),
                min_order_amount: None,
                status: PromotionStatus::Active,
                created_at: Utc::now(),
            };
            let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();

            let result = PromotionEvaluator::evaluate(&promo, &[1], 1, Decimal::from(subtotal), today);
            prop_assert!(result <= Decimal::from(cap));
        }

        // Evaluation ignores homestays outside the association set
        #[test]
        fn prop_unassociated_never_discounts(
            promo in arb_promotion(),
            subtotal in 0i64..100_000_000,
            homestay_id in 100i32..200,
        ) {
            let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
            let scoped = vec![1, 2, 3];

            prop_assert_eq!(
                PromotionEvaluator::evaluate(&promo, &scoped, homestay_id, Decimal::from(subtotal), today),
                Decimal::ZERO
            );
        }
    }

    #[test]
    fn percent_and_fixed_agree_on_clamping() {
        // Sanity anchor for the strategies above
        let mut promo = Promotion {
            id: 1,
            code: "X".to_string(),
            name: "x".to_string(),
            discount: dec!(150),
            discount_type: DiscountType::Fixed,
            start_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
            max_discount: None,
            min_order_amount: None,
            status: PromotionStatus::Active,
            created_at: Utc::now(),
        };
        let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();

        assert_eq!(
            PromotionEvaluator::evaluate(&promo, &[1], 1, dec!(100), today),
            dec!(100)
        );

        promo.discount_type = DiscountType::Percent;
        promo.discount = dec!(200);
        assert_eq!(
            PromotionEvaluator::evaluate(&promo, &[1], 1, dec!(100), today),
            dec!(100)
        );
    }
}
