//! bravework-offers server entry point.
//!
//! Starts the Axum HTTP server after connecting to PostgreSQL and
//! applying migrations.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use bravework_offers::api;
use bravework_offers::app_state::AppState;
use bravework_offers::config::ServiceConfig;
use bravework_offers::domain::TokenCodec;
use bravework_offers::persistence::postgres::PostgresStore;
use bravework_offers::service::{OfferService, RentalService};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = ServiceConfig::from_env()?;
    tracing::info!(addr = %config.listen_addr, "starting bravework-offers");

    // Connect to PostgreSQL and apply migrations
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .min_connections(config.database_min_connections)
        .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    // Build service layer
    let store = PostgresStore::new(pool);
    let codec = TokenCodec::new(config.token_secret.clone());
    let offer_service = Arc::new(OfferService::new(
        store.clone(),
        codec,
        config.token_ttl_minutes,
    ));
    let rental_service = Arc::new(RentalService::new(store));

    // Build application state
    let app_state = AppState {
        offer_service,
        rental_service,
    };

    // Build router
    let app = Router::new()
        .merge(api::build_router())
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.request_timeout_secs,
        )))
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
