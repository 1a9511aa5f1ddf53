//! # Barbershop API
//!
//! The web server of the barbershop booking service: accounts with role
//! tiers, the service catalog, and appointment booking kept in sync with the
//! shop's external calendar.
//!
//! ## Architecture
//!
//! - **Routes**: Define API endpoints and URL structure
//! - **Handlers**: Implement request processing logic
//! - **Middleware**: Authentication, role guards and error mapping
//! - **Calendar sync**: Calendar side effects run inside booking transactions
//! - **Config**: Environment configuration
//!
//! The API uses Axum as the web framework and SQLx for database interactions.

/// Calendar side effects of appointment writes
pub mod calendar_sync;
/// Configuration module for API settings
pub mod config;
/// Request handlers that implement business logic
pub mod handlers;
/// Authentication, authorization and error handling
pub mod middleware;
/// Route definitions and API endpoint structure
pub mod routes;

use std::{sync::Arc, time::Duration};

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    Router,
};
use barbershop_calendar::CalendarClient;
use barbershop_core::scheduling::BookingRules;
use eyre::Result;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer, services::ServeDir, timeout::TimeoutLayer, trace::TraceLayer,
};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Shared application state that is accessible to all request handlers
pub struct ApiState {
    /// PostgreSQL connection pool for database operations
    pub db_pool: PgPool,
    pub config: config::ApiConfig,
    /// Business hours and lead time applied to bookings
    pub rules: BookingRules,
    /// `None` when calendar sync is not configured
    pub calendar: Option<Arc<dyn CalendarClient>>,
}

impl ApiState {
    pub fn new(
        config: config::ApiConfig,
        db_pool: PgPool,
        calendar: Option<Arc<dyn CalendarClient>>,
    ) -> Result<Self> {
        let rules = config.booking_rules()?;
        Ok(Self {
            db_pool,
            config,
            rules,
            calendar,
        })
    }
}

/// Installs the global `tracing` subscriber.
pub fn init_tracing(level: Level) -> Result<()> {
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .allow_origin(origins)
        .allow_credentials(true)
}

/// Builds the application router with all routes and layers.
pub fn app(state: Arc<ApiState>) -> Router {
    let config = &state.config;

    let app = Router::new()
        // Health check endpoints
        .merge(routes::health::routes())
        // Registration, login and staff accounts
        .merge(routes::auth::routes())
        // Profile management
        .merge(routes::account::routes())
        // Service catalog
        .merge(routes::services::routes())
        // Booking
        .merge(routes::appointments::routes())
        // Uploaded files
        .nest_service("/media", ServeDir::new(&config.media_root))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes));

    let app = match &config.cors_origins {
        Some(origins) => app.layer(cors_layer(origins)),
        None => app,
    };

    app.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout))),
    )
    .with_state(state.clone())
}

/// Starts the API server
pub async fn start_server(state: Arc<ApiState>) -> Result<()> {
    let addr = state.config.server_addr();
    let app = app(state);

    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
