use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::validation::validate_non_negative_amount;

/// Discount shape of a promotion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    /// Percentage of the subtotal, optionally capped
    Percent,
    /// Flat amount
    Fixed,
}

impl DiscountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountType::Percent => "percent",
            DiscountType::Fixed => "fixed",
        }
    }
}

impl std::fmt::Display for DiscountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Activation state of a promotion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PromotionStatus {
    Active,
    Inactive,
}

impl PromotionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromotionStatus::Active => "active",
            PromotionStatus::Inactive => "inactive",
        }
    }
}

impl std::fmt::Display for PromotionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Domain model representing a promotion in the database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Promotion {
    pub id: i32,
    pub code: String,
    pub name: String,
    pub discount: Decimal,
    pub discount_type: DiscountType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub max_discount: Option<Decimal>,
    pub min_order_amount: Option<Decimal>,
    pub status: PromotionStatus,
    pub created_at: DateTime<Utc>,
}

/// A promotion that evaluated to a nonzero discount for a booking
#[derive(Debug, Clone, Serialize)]
pub struct AppliedPromotion {
    pub promotion_id: i32,
    pub code: String,
    pub discount: Decimal,
}

/// Request DTO for previewing a promotion against a prospective booking
#[derive(Debug, Deserialize, Validate)]
pub struct ValidatePromotionRequest {
    #[validate(length(min = 1, message = "Promotion code must not be empty"))]
    pub code: String,
    pub homestay_id: i32,
    #[validate(custom = "validate_non_negative_amount")]
    pub subtotal: Decimal,
}

/// Response DTO for the promotion preview endpoint
///
/// `applicable` is false whenever the evaluator short-circuits to zero, so
/// the checkout UI can show why-agnostic feedback without a distinct error.
#[derive(Debug, Serialize)]
pub struct PromotionQuote {
    pub code: String,
    pub applicable: bool,
    pub discount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promotion_id: Option<i32>,
}

/// Response DTO for promotion listings
#[derive(Debug, Serialize)]
pub struct PromotionResponse {
    pub id: i32,
    pub code: String,
    pub name: String,
    pub discount: Decimal,
    pub discount_type: DiscountType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub max_discount: Option<Decimal>,
    pub min_order_amount: Option<Decimal>,
}

impl From<Promotion> for PromotionResponse {
    fn from(promotion: Promotion) -> Self {
        Self {
            id: promotion.id,
            code: promotion.code,
            name: promotion.name,
            discount: promotion.discount,
            discount_type: promotion.discount_type,
            start_date: promotion.start_date,
            end_date: promotion.end_date,
            max_discount: promotion.max_discount,
            min_order_amount: promotion.min_order_amount,
        }
    }
}
