use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// A homestay listing as stored in the database
///
/// This service treats listings as read-only except for the two rating
/// cache columns (`rating_avg`, `rating_count`), which are derived values
/// written exclusively by the review rating recompute.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Homestay {
    #[schema(example = 1)]
    pub id: i32,
    #[schema(example = "Lakeside Bamboo House")]
    pub name: String,
    #[schema(example = "12 Tran Phu")]
    pub address: String,
    #[schema(example = "Da Lat")]
    pub city: String,
    /// Nightly price; snapshotted onto booking line items at creation
    #[schema(value_type = f64, example = 500000.0)]
    pub price_per_day: Decimal,
    #[schema(example = "active", pattern = "active|inactive")]
    pub status: String,
    #[schema(example = 2)]
    pub owner_id: i32,
    /// Cached average over visible+verified reviews; None until first review
    #[schema(value_type = Option<f64>, example = 4.5)]
    pub rating_avg: Option<Decimal>,
    #[schema(example = 12)]
    pub rating_count: i32,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_homestay_serialization() {
        let homestay = Homestay {
            id: 1,
            name: "Lakeside Bamboo House".to_string(),
            address: "12 Tran Phu".to_string(),
            city: "Da Lat".to_string(),
            price_per_day: dec!(500000),
            status: "active".to_string(),
            owner_id: 2,
            rating_avg: Some(dec!(4.50)),
            rating_count: 12,
            created_at: Utc::now(),
        };

        let json = serde_json::to_string(&homestay).expect("Failed to serialize Homestay");

        assert!(json.contains("\"id\":1"));
        assert!(json.contains("\"name\":\"Lakeside Bamboo House\""));
        assert!(json.contains("\"city\":\"Da Lat\""));
        assert!(json.contains("\"price_per_day\":\"500000\""));
        assert!(json.contains("\"rating_avg\":\"4.50\""));
        assert!(json.contains("\"rating_count\":12"));
        assert!(json.contains("\"created_at\""));
    }

    #[test]
    fn test_homestay_without_ratings() {
        let homestay = Homestay {
            id: 3,
            name: "Hillside Cabin".to_string(),
            address: "5 Nguyen Du".to_string(),
            city: "Sa Pa".to_string(),
            price_per_day: dec!(350000),
            status: "active".to_string(),
            owner_id: 7,
            rating_avg: None,
            rating_count: 0,
            created_at: Utc::now(),
        };

        let json = serde_json::to_string(&homestay).expect("Failed to serialize Homestay");

        assert!(json.contains("\"rating_avg\":null"));
        assert!(json.contains("\"rating_count\":0"));
    }
}
