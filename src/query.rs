use chrono::NaiveDate;
use serde::Deserialize;

/// SQL query builder for the public homestay search
/// Builds a single parameterized query with filters, sorting, and pagination
pub struct SQLQueryBuilder {
    base_query: String,
    where_clauses: Vec<String>,
    params: Vec<String>,
    order_clause: Option<String>,
}

impl SQLQueryBuilder {
    /// Creates a new SQLQueryBuilder with default values
    pub fn new() -> Self {
        Self {
            base_query: "SELECT id, name, address, city, price_per_day, status, owner_id, \
                         rating_avg, rating_count, created_at FROM homestays"
                .to_string(),
            where_clauses: vec!["LOWER(TRIM(status)) IN ('active', 'available')".to_string()],
            params: Vec::new(),
            order_clause: None,
        }
    }

    /// Adds a free-text filter matching name, address, or city
    /// (case-insensitive)
    pub fn add_search_filter(&mut self, search: &str) {
        let param_index = self.params.len() + 1;
        self.where_clauses.push(format!(
            "(name ILIKE ${i} OR address ILIKE ${i} OR city ILIKE ${i})",
            i = param_index
        ));
        self.params.push(format!("%{}%", search));
    }

    /// Adds a city filter (case-insensitive partial match)
    pub fn add_city_filter(&mut self, city: &str) {
        let param_index = self.params.len() + 1;
        self.where_clauses
            .push(format!("city ILIKE ${}", param_index));
        self.params.push(format!("%{}%", city));
    }

    /// Adds nightly price range filters (min and/or max, both inclusive)
    ///
    /// Parameters travel as text, so the comparison casts explicitly.
    pub fn add_price_range(&mut self, min: Option<f64>, max: Option<f64>) {
        if let Some(min_price) = min {
            let param_index = self.params.len() + 1;
            self.where_clauses
                .push(format!("price_per_day >= ${}::numeric", param_index));
            self.params.push(min_price.to_string());
        }

        if let Some(max_price) = max {
            let param_index = self.params.len() + 1;
            self.where_clauses
                .push(format!("price_per_day <= ${}::numeric", param_index));
            self.params.push(max_price.to_string());
        }
    }

    /// Excludes homestays with a blocking booking overlapping the stay
    ///
    /// Overlap is half-open, the same predicate the create-path guard uses:
    /// an item blocks when `item.checkin < checkout AND item.checkout > checkin`.
    /// The status list mirrors `BookingStatus::is_blocking`.
    pub fn add_availability_window(&mut self, checkin: NaiveDate, checkout: NaiveDate) {
        let checkin_index = self.params.len() + 1;
        let checkout_index = self.params.len() + 2;

        self.where_clauses.push(format!(
            "NOT EXISTS (SELECT 1 FROM booking_items d \
             JOIN bookings b ON b.id = d.booking_id \
             WHERE d.homestay_id = homestays.id \
             AND d.checkin_date < ${}::date \
             AND d.checkout_date > ${}::date \
             AND b.status IN ('pending', 'pending_payment', 'confirmed', 'paid'))",
            checkout_index, checkin_index
        ));
        self.params.push(checkin.to_string());
        self.params.push(checkout.to_string());
    }

    /// Sets the sort order for the query
    pub fn set_sort(&mut self, field: SortField, order: SortOrder) {
        let order_str = match order {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };

        // Unrated listings always sort after rated ones.
        let clause = match field {
            SortField::Price => format!("price_per_day {}", order_str),
            SortField::Rating => format!("rating_avg {} NULLS LAST", order_str),
        };

        self.order_clause = Some(clause);
    }

    /// Builds the final SQL query string with all parameters
    /// Returns a tuple of (query_string, parameters)
    ///
    /// `page` is 1-indexed; LIMIT/OFFSET are emitted inline because
    /// PostgreSQL requires integers there, not text parameters.
    pub fn build(&self, page: u32, limit: u32) -> (String, Vec<String>) {
        let mut query = self.base_query.clone();

        query.push_str(" WHERE ");
        query.push_str(&self.where_clauses.join(" AND "));

        query.push_str(" ORDER BY ");
        query.push_str(self.order_clause.as_deref().unwrap_or("id DESC"));

        query.push_str(&format!(" LIMIT {}", limit));
        query.push_str(&format!(" OFFSET {}", (page - 1) * limit));

        (query, self.params.clone())
    }
}

/// Query parameters for GET /api/homestays
/// All fields are optional to support flexible querying
#[derive(Debug, Deserialize)]
pub struct QueryParams {
    /// Free-text search over name, address, and city
    pub q: Option<String>,
    /// Filter by city (case-insensitive partial match)
    pub city: Option<String>,
    /// Minimum nightly price filter (inclusive)
    pub min_price: Option<f64>,
    /// Maximum nightly price filter (inclusive)
    pub max_price: Option<f64>,
    /// Start of the desired stay (ISO date); requires `checkout`
    pub checkin: Option<NaiveDate>,
    /// End of the desired stay (ISO date); requires `checkin`
    pub checkout: Option<NaiveDate>,
    /// Sort field: "price" or "rating"
    pub sort: Option<String>,
    /// Sort order: "asc" or "desc"
    pub order: Option<String>,
    /// Page number (1-indexed, defaults to 1)
    pub page: Option<u32>,
    /// Items per page (defaults to 10)
    pub limit: Option<u32>,
}

/// Sort field options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Price,
    Rating,
}

/// Sort order options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Validated and normalized query parameters
#[derive(Debug)]
pub struct ValidatedQuery {
    /// Normalized search term (trimmed, None if empty)
    pub q: Option<String>,
    /// Normalized city filter (trimmed, None if empty)
    pub city: Option<String>,
    /// Minimum price filter (validated as positive)
    pub min_price: Option<f64>,
    /// Maximum price filter (validated as positive and >= min_price)
    pub max_price: Option<f64>,
    /// Desired stay window (checkin strictly before checkout)
    pub stay: Option<(NaiveDate, NaiveDate)>,
    /// Sort field (None means newest first)
    pub sort_field: Option<SortField>,
    /// Sort order (defaults based on sort field)
    pub sort_order: SortOrder,
    /// Page number (validated as positive, defaults to 1)
    pub page: u32,
    /// Items per page (validated as positive, defaults to 10)
    pub limit: u32,
}

/// Validation error type
#[derive(Debug)]
pub struct QueryValidationError {
    pub message: String,
}

impl std::fmt::Display for QueryValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for QueryValidationError {}

/// Query parameter validator
pub struct QueryValidator;

impl QueryValidator {
    /// Validates and normalizes query parameters
    pub fn validate(params: QueryParams) -> Result<ValidatedQuery, QueryValidationError> {
        let q = Self::normalize_string(params.q);
        let city = Self::normalize_string(params.city);

        let min_price = if let Some(price) = params.min_price {
            Self::validate_price(price, "min_price")?;
            Some(price)
        } else {
            None
        };

        let max_price = if let Some(price) = params.max_price {
            Self::validate_price(price, "max_price")?;
            Some(price)
        } else {
            None
        };

        if let (Some(min), Some(max)) = (min_price, max_price) {
            if min > max {
                return Err(QueryValidationError {
                    message: "min_price cannot be greater than max_price".to_string(),
                });
            }
        }

        let stay = match (params.checkin, params.checkout) {
            (Some(checkin), Some(checkout)) => {
                if checkin >= checkout {
                    return Err(QueryValidationError {
                        message: "checkin must be before checkout".to_string(),
                    });
                }
                Some((checkin, checkout))
            }
            (None, None) => None,
            _ => {
                return Err(QueryValidationError {
                    message: "checkin and checkout must be provided together".to_string(),
                })
            }
        };

        let sort_field = if let Some(sort_str) = params.sort {
            Some(Self::parse_sort_field(&sort_str)?)
        } else {
            None
        };

        let sort_order = if let Some(order_str) = params.order {
            Self::parse_sort_order(&order_str)?
        } else {
            // Cheapest first when browsing by price, best first by rating
            match sort_field {
                Some(SortField::Price) => SortOrder::Asc,
                Some(SortField::Rating) => SortOrder::Desc,
                None => SortOrder::Desc,
            }
        };

        let page = if let Some(p) = params.page {
            Self::validate_pagination_param(p, "page")?;
            p
        } else {
            1
        };

        let limit = if let Some(l) = params.limit {
            Self::validate_pagination_param(l, "limit")?;
            l
        } else {
            10
        };

        Ok(ValidatedQuery {
            q,
            city,
            min_price,
            max_price,
            stay,
            sort_field,
            sort_order,
            page,
            limit,
        })
    }

    /// Normalizes string parameters by trimming whitespace
    /// Returns None if the string is empty or whitespace-only
    fn normalize_string(s: Option<String>) -> Option<String> {
        s.and_then(|s| {
            let trimmed = s.trim().to_string();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed)
            }
        })
    }

    /// Validates that a price is a positive finite number
    fn validate_price(price: f64, param_name: &str) -> Result<(), QueryValidationError> {
        if price <= 0.0 {
            return Err(QueryValidationError {
                message: format!("{} must be a positive number", param_name),
            });
        }
        if price.is_nan() || price.is_infinite() {
            return Err(QueryValidationError {
                message: format!("{} must be a valid number", param_name),
            });
        }
        Ok(())
    }

    /// Parses sort field string to SortField enum
    fn parse_sort_field(s: &str) -> Result<SortField, QueryValidationError> {
        match s.to_lowercase().as_str() {
            "price" => Ok(SortField::Price),
            "rating" => Ok(SortField::Rating),
            _ => Err(QueryValidationError {
                message: format!("Invalid sort field '{}'. Must be 'price' or 'rating'", s),
            }),
        }
    }

    /// Parses sort order string to SortOrder enum
    fn parse_sort_order(s: &str) -> Result<SortOrder, QueryValidationError> {
        match s.to_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(QueryValidationError {
                message: format!("Invalid sort order '{}'. Must be 'asc' or 'desc'", s),
            }),
        }
    }

    /// Validates pagination parameters (page and limit)
    fn validate_pagination_param(value: u32, param_name: &str) -> Result<(), QueryValidationError> {
        if value == 0 {
            return Err(QueryValidationError {
                message: format!("{} must be a positive number (greater than 0)", param_name),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn empty_params() -> QueryParams {
        QueryParams {
            q: None,
            city: None,
            min_price: None,
            max_price: None,
            checkin: None,
            checkout: None,
            sort: None,
            order: None,
            page: None,
            limit: None,
        }
    }

    #[test]
    fn test_sql_builder_basic_query() {
        let builder = SQLQueryBuilder::new();
        let (query, params) = builder.build(1, 10);

        assert!(query.contains("FROM homestays"));
        assert!(query.contains("LOWER(TRIM(status)) IN ('active', 'available')"));
        assert!(query.contains("ORDER BY id DESC"));
        assert!(query.contains("LIMIT 10"));
        assert!(query.contains("OFFSET 0"));
        assert_eq!(params.len(), 0);
    }

    #[test]
    fn test_sql_builder_with_search() {
        let mut builder = SQLQueryBuilder::new();
        builder.add_search_filter("bamboo");
        let (query, params) = builder.build(1, 10);

        assert!(query.contains("(name ILIKE $1 OR address ILIKE $1 OR city ILIKE $1)"));
        assert_eq!(params, vec!["%bamboo%"]);
    }

    #[test]
    fn test_sql_builder_with_city_filter() {
        let mut builder = SQLQueryBuilder::new();
        builder.add_city_filter("Da Lat");
        let (query, params) = builder.build(1, 10);

        assert!(query.contains("city ILIKE $1"));
        assert_eq!(params, vec!["%Da Lat%"]);
    }

    #[test]
    fn test_sql_builder_with_price_range() {
        let mut builder = SQLQueryBuilder::new();
        builder.add_price_range(Some(300000.0), Some(800000.0));
        let (query, params) = builder.build(1, 10);

        assert!(query.contains("price_per_day >= $1::numeric"));
        assert!(query.contains("price_per_day <= $2::numeric"));
        assert_eq!(params[0], "300000");
        assert_eq!(params[1], "800000");
    }

    #[test]
    fn test_sql_builder_with_availability_window() {
        let mut builder = SQLQueryBuilder::new();
        builder.add_availability_window(date(2024, 12, 1), date(2024, 12, 5));
        let (query, params) = builder.build(1, 10);

        assert!(query.contains("NOT EXISTS"));
        assert!(query.contains("d.checkin_date < $2::date"));
        assert!(query.contains("d.checkout_date > $1::date"));
        assert!(query.contains("'pending'"));
        assert!(query.contains("'pending_payment'"));
        assert!(query.contains("'confirmed'"));
        assert!(query.contains("'paid'"));
        assert!(!query.contains("'cancelled'"));
        assert!(!query.contains("'completed'"));
        assert_eq!(params, vec!["2024-12-01", "2024-12-05"]);
    }

    #[test]
    fn test_sql_builder_with_sorting() {
        let mut builder = SQLQueryBuilder::new();
        builder.set_sort(SortField::Price, SortOrder::Asc);
        let (query, _) = builder.build(1, 10);
        assert!(query.contains("ORDER BY price_per_day ASC"));

        let mut builder = SQLQueryBuilder::new();
        builder.set_sort(SortField::Rating, SortOrder::Desc);
        let (query, _) = builder.build(1, 10);
        assert!(query.contains("ORDER BY rating_avg DESC NULLS LAST"));
    }

    #[test]
    fn test_sql_builder_with_pagination() {
        let builder = SQLQueryBuilder::new();
        let (query, _params) = builder.build(3, 20);

        assert!(query.contains("LIMIT 20"));
        assert!(query.contains("OFFSET 40"));
    }

    #[test]
    fn test_sql_builder_combined_filters() {
        let mut builder = SQLQueryBuilder::new();
        builder.add_search_filter("lakeside");
        builder.add_city_filter("Hue");
        builder.add_price_range(Some(200000.0), None);
        builder.add_availability_window(date(2025, 1, 10), date(2025, 1, 12));
        builder.set_sort(SortField::Rating, SortOrder::Desc);

        let (query, params) = builder.build(1, 10);

        assert!(query.contains("(name ILIKE $1 OR address ILIKE $1 OR city ILIKE $1)"));
        assert!(query.contains("city ILIKE $2"));
        assert!(query.contains("price_per_day >= $3::numeric"));
        assert!(query.contains("d.checkin_date < $5::date"));
        assert!(query.contains("d.checkout_date > $4::date"));
        assert!(query.contains("ORDER BY rating_avg DESC NULLS LAST"));

        assert_eq!(
            params,
            vec![
                "%lakeside%",
                "%Hue%",
                "200000",
                "2025-01-10",
                "2025-01-12"
            ]
        );
    }

    #[test]
    fn test_normalize_string_with_whitespace() {
        assert_eq!(
            QueryValidator::normalize_string(Some("  Hoi An  ".to_string())),
            Some("Hoi An".to_string())
        );
        assert_eq!(
            QueryValidator::normalize_string(Some("   ".to_string())),
            None
        );
        assert_eq!(QueryValidator::normalize_string(None), None);
    }

    #[test]
    fn test_validate_price_bounds() {
        assert!(QueryValidator::validate_price(100000.0, "price").is_ok());
        assert!(QueryValidator::validate_price(0.0, "price").is_err());
        assert!(QueryValidator::validate_price(-5.0, "price").is_err());
        assert!(QueryValidator::validate_price(f64::NAN, "price").is_err());
    }

    #[test]
    fn test_parse_sort_field() {
        assert_eq!(
            QueryValidator::parse_sort_field("price").unwrap(),
            SortField::Price
        );
        assert_eq!(
            QueryValidator::parse_sort_field("RATING").unwrap(),
            SortField::Rating
        );
        assert!(QueryValidator::parse_sort_field("invalid").is_err());
    }

    #[test]
    fn test_parse_sort_order() {
        assert_eq!(
            QueryValidator::parse_sort_order("asc").unwrap(),
            SortOrder::Asc
        );
        assert_eq!(
            QueryValidator::parse_sort_order("DESC").unwrap(),
            SortOrder::Desc
        );
        assert!(QueryValidator::parse_sort_order("invalid").is_err());
    }

    #[test]
    fn test_validate_pagination_param() {
        assert!(QueryValidator::validate_pagination_param(1, "page").is_ok());
        assert!(QueryValidator::validate_pagination_param(100, "limit").is_ok());
        assert!(QueryValidator::validate_pagination_param(0, "page").is_err());
    }

    #[test]
    fn test_validate_full_query_with_defaults() {
        let validated = QueryValidator::validate(empty_params()).unwrap();

        assert_eq!(validated.page, 1);
        assert_eq!(validated.limit, 10);
        assert_eq!(validated.sort_field, None);
        assert_eq!(validated.sort_order, SortOrder::Desc);
        assert!(validated.stay.is_none());
    }

    #[test]
    fn test_validate_price_range() {
        let mut params = empty_params();
        params.min_price = Some(100000.0);
        params.max_price = Some(500000.0);
        let validated = QueryValidator::validate(params).unwrap();
        assert_eq!(validated.min_price, Some(100000.0));
        assert_eq!(validated.max_price, Some(500000.0));

        let mut params = empty_params();
        params.min_price = Some(500000.0);
        params.max_price = Some(100000.0);
        assert!(QueryValidator::validate(params).is_err());
    }

    #[test]
    fn test_validate_stay_window() {
        let mut params = empty_params();
        params.checkin = Some(date(2025, 1, 10));
        params.checkout = Some(date(2025, 1, 12));
        let validated = QueryValidator::validate(params).unwrap();
        assert_eq!(validated.stay, Some((date(2025, 1, 10), date(2025, 1, 12))));

        // Reversed or zero-night windows are rejected
        let mut params = empty_params();
        params.checkin = Some(date(2025, 1, 12));
        params.checkout = Some(date(2025, 1, 12));
        assert!(QueryValidator::validate(params).is_err());

        // One-sided windows are rejected
        let mut params = empty_params();
        params.checkin = Some(date(2025, 1, 10));
        assert!(QueryValidator::validate(params).is_err());
    }

    #[test]
    fn test_validate_sort_defaults() {
        let mut params = empty_params();
        params.sort = Some("price".to_string());
        let validated = QueryValidator::validate(params).unwrap();
        assert_eq!(validated.sort_field, Some(SortField::Price));
        assert_eq!(validated.sort_order, SortOrder::Asc);

        let mut params = empty_params();
        params.sort = Some("rating".to_string());
        let validated = QueryValidator::validate(params).unwrap();
        assert_eq!(validated.sort_field, Some(SortField::Rating));
        assert_eq!(validated.sort_order, SortOrder::Desc);
    }
}
