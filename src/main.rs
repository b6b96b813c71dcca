mod auth;
mod bookings;
mod db;
mod error;
mod models;
mod notifications;
mod promotions;
mod query;
mod response;
mod reviews;
mod validation;

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, patch, post},
    Router,
};
use sqlx::PgPool;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use bookings::{
    BookingService, BookingsRepository, DateRange, HomestaysRepository, OverlapPolicy,
};
use error::ApiError;
use models::Homestay;
use notifications::WebhookNotifier;
use promotions::{PromotionService, PromotionsRepository};
use query::{QueryParams, QueryValidator, SQLQueryBuilder};
use response::{success, ApiSuccess};
use reviews::{ReviewService, ReviewsRepository};

/// OpenAPI documentation structure
///
/// Booking, promotion, and review routes carry identity extractors and
/// are documented by their module handlers' doc comments; the generated
/// document covers the public catalog surface.
#[derive(OpenApi)]
#[openapi(
    paths(
        get_homestays,
        get_homestay_by_id,
        get_unavailable_dates,
    ),
    components(
        schemas(Homestay, DateRange)
    ),
    tags(
        (name = "homestays", description = "Public homestay catalog endpoints")
    ),
    info(
        title = "GreenStay API",
        version = "1.0.0",
        description = "RESTful API for the GreenStay homestay booking marketplace",
        contact(
            name = "API Support",
            email = "support@greenstay.vn"
        )
    )
)]
struct ApiDoc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub booking_service: BookingService,
    pub promotion_service: PromotionService,
    pub review_service: ReviewService,
}

/// Handler for GET /api/homestays
/// Public homestay search with filtering, sorting, and pagination
#[utoipa::path(
    get,
    path = "/api/homestays",
    params(
        ("q" = Option<String>, Query, description = "Free-text search over name, address, and city"),
        ("city" = Option<String>, Query, description = "Filter by city (partial match)"),
        ("min_price" = Option<f64>, Query, description = "Minimum nightly price (inclusive)"),
        ("max_price" = Option<f64>, Query, description = "Maximum nightly price (inclusive)"),
        ("checkin" = Option<String>, Query, description = "Desired check-in date (ISO); requires checkout"),
        ("checkout" = Option<String>, Query, description = "Desired check-out date (ISO); requires checkin"),
        ("sort" = Option<String>, Query, description = "Sort field: price or rating"),
        ("order" = Option<String>, Query, description = "Sort order: asc or desc"),
        ("page" = Option<u32>, Query, description = "Page number (1-indexed)"),
        ("limit" = Option<u32>, Query, description = "Items per page")
    ),
    responses(
        (status = 200, description = "Matching homestays", body = Vec<Homestay>),
        (status = 400, description = "Invalid query parameters", body = String, example = json!({"message": "min_price cannot be greater than max_price"})),
        (status = 500, description = "Internal server error", body = String, example = json!({"message": "A database error occurred"}))
    ),
    tag = "homestays"
)]
async fn get_homestays(
    Query(params): Query<QueryParams>,
    State(state): State<AppState>,
) -> Result<ApiSuccess<Vec<Homestay>>, ApiError> {
    tracing::debug!("Searching homestays: {:?}", params);

    let validated =
        QueryValidator::validate(params).map_err(|e| ApiError::BadRequest(e.message))?;

    let mut builder = SQLQueryBuilder::new();

    if let Some(q) = validated.q {
        builder.add_search_filter(&q);
    }
    if let Some(city) = validated.city {
        builder.add_city_filter(&city);
    }
    builder.add_price_range(validated.min_price, validated.max_price);
    if let Some((checkin, checkout)) = validated.stay {
        builder.add_availability_window(checkin, checkout);
    }
    if let Some(sort_field) = validated.sort_field {
        builder.set_sort(sort_field, validated.sort_order);
    }

    let (query_str, params) = builder.build(validated.page, validated.limit);

    let mut query = sqlx::query_as::<_, Homestay>(&query_str);
    for param in params {
        query = query.bind(param);
    }

    let homestays = query.fetch_all(&state.db).await?;

    tracing::debug!("Search returned {} homestays", homestays.len());
    Ok(success(homestays))
}

/// Handler for GET /api/homestays/:id
/// Retrieves a single homestay listing
#[utoipa::path(
    get,
    path = "/api/homestays/{id}",
    params(
        ("id" = i32, Path, description = "Homestay ID")
    ),
    responses(
        (status = 200, description = "Homestay found", body = Homestay),
        (status = 404, description = "Homestay not found", body = String, example = json!({"message": "Homestay with id 1 not found"})),
        (status = 500, description = "Internal server error", body = String, example = json!({"message": "A database error occurred"}))
    ),
    tag = "homestays"
)]
async fn get_homestay_by_id(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<ApiSuccess<Homestay>, ApiError> {
    let homestay = sqlx::query_as::<_, Homestay>(
        r#"
        SELECT id, name, address, city, price_per_day, status, owner_id,
               rating_avg, rating_count, created_at
        FROM homestays
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::NotFound {
        resource: "Homestay".to_string(),
        id: id.to_string(),
    })?;

    Ok(success(homestay))
}

/// Handler for GET /api/homestays/:id/unavailable-dates
/// Date ranges currently blocking a homestay's calendar
#[utoipa::path(
    get,
    path = "/api/homestays/{id}/unavailable-dates",
    params(
        ("id" = i32, Path, description = "Homestay ID")
    ),
    responses(
        (status = 200, description = "Blocked date ranges", body = Vec<DateRange>),
        (status = 404, description = "Homestay not found", body = String, example = json!({"message": "Homestay 1 not found"})),
        (status = 500, description = "Internal server error", body = String, example = json!({"message": "A database error occurred"}))
    ),
    tag = "homestays"
)]
async fn get_unavailable_dates(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<ApiSuccess<Vec<DateRange>>, bookings::BookingError> {
    let ranges = state.booking_service.unavailable_dates(id).await?;

    Ok(success(ranges))
}

/// Creates and configures the application router
/// Maps all API endpoints to their handlers and adds CORS middleware
fn create_router(db: PgPool) -> Router {
    use tower_http::cors::{Any, CorsLayer};

    let promotion_service = PromotionService::new(PromotionsRepository::new(db.clone()));
    let booking_service = BookingService::new(
        BookingsRepository::new(db.clone()),
        HomestaysRepository::new(db.clone()),
        promotion_service.clone(),
        Arc::new(WebhookNotifier::from_env()),
        OverlapPolicy::from_env(),
    );
    let review_service = ReviewService::new(ReviewsRepository::new(db.clone()));

    let state = AppState {
        db,
        booking_service,
        promotion_service,
        review_service,
    };

    // Configure CORS to allow all origins, methods, and headers
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Homestay catalog (public)
        .route("/api/homestays", get(get_homestays))
        .route("/api/homestays/:id", get(get_homestay_by_id))
        .route(
            "/api/homestays/:id/unavailable-dates",
            get(get_unavailable_dates),
        )
        // Bookings
        .route("/api/bookings", post(bookings::create_booking_handler))
        .route("/api/bookings/mine", get(bookings::get_my_bookings_handler))
        .route(
            "/api/bookings/owner",
            get(bookings::get_owner_bookings_handler),
        )
        .route(
            "/api/bookings/admin",
            get(bookings::get_all_bookings_handler),
        )
        .route(
            "/api/bookings/admin/revenue",
            get(bookings::revenue_summary_handler),
        )
        .route("/api/bookings/:id", get(bookings::get_booking_handler))
        .route("/api/bookings/:id", delete(bookings::delete_booking_handler))
        .route(
            "/api/bookings/:id/status",
            patch(bookings::update_status_handler),
        )
        .route(
            "/api/bookings/:id/note",
            patch(bookings::update_note_handler),
        )
        .route(
            "/api/bookings/:id/send-confirmation",
            post(bookings::send_confirmation_handler),
        )
        // Promotions
        .route(
            "/api/promotions/active/:homestay_id",
            get(promotions::list_active_promotions_handler),
        )
        .route(
            "/api/promotions/validate",
            post(promotions::validate_promotion_handler),
        )
        // Reviews
        .route("/api/reviews", post(reviews::create_review_handler))
        .route("/api/reviews/mine", get(reviews::my_reviews_handler))
        .route(
            "/api/reviews/can-review/:booking_id",
            get(reviews::can_review_handler),
        )
        .route(
            "/api/reviews/homestay/:id",
            get(reviews::homestay_reviews_handler),
        )
        .route("/api/reviews/:id", patch(reviews::update_review_handler))
        .route("/api/reviews/:id", delete(reviews::delete_review_handler))
        .route(
            "/api/reviews/:id/visibility",
            patch(reviews::set_visibility_handler),
        )
        .route("/api/reviews/:id/reply", post(reviews::upsert_reply_handler))
        .route(
            "/api/reviews/:id/reply",
            delete(reviews::delete_reply_handler),
        )
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    tracing::info!("GreenStay API - Starting...");

    // Get configuration from environment variables
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set in environment");
    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = std::env::var("PORT").unwrap_or_else(|_| "8080".to_string());

    // Create database connection pool
    tracing::info!("Connecting to database...");
    let db_pool = db::create_pool(&database_url)
        .await
        .expect("Failed to create database pool");

    // Run SQLx migrations on startup
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Migrations completed successfully");

    // Create the application router
    let app = create_router(db_pool);

    // Start the Axum server
    let addr = format!("{}:{}", host, port);
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("GreenStay API is running on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui", addr);

    axum::serve(listener, app)
        .await
        .expect("Server error");
}
