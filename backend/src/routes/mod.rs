pub mod users;
use axum::{
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use http::StatusCode;
use serde_json::json;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use std::{error::Error, str::FromStr, sync::Arc};
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt, Registry};
pub use users::profile_routes;

use crate::{
    handlers::{chat::chat_completion, news::get_agriculture_news, weather::get_weather},
    utils::{config::Config, profile_store::PgProfileStore, state::AppState},
};

pub fn init_tracing() {
    let log_level = std::env::var("LOG_LEVEL")
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase();

    let level = match log_level.as_str() {
        "error" => Level::ERROR,
        "warn" => Level::WARN,
        "info" => Level::INFO,
        "debug" => Level::DEBUG,
        "trace" => Level::TRACE,
        _ => Level::INFO,
    };

    let filter = filter::Targets::new()
        .with_target("tower_http::trace::on_response", Level::TRACE)
        .with_target("tower_http::trace::on_request", Level::TRACE)
        .with_target("tower_http::trace::make_span", Level::DEBUG)
        .with_target("axum::rejection", Level::TRACE)
        .with_target(env!("CARGO_PKG_NAME"), level)
        .with_default(Level::INFO);

    let tracing_layer = tracing_subscriber::fmt::layer();

    Registry::default().with(tracing_layer).with(filter).init();
}

/// Connects to the database and assembles the full application.
pub async fn make_app(config: Config) -> Result<Router, Box<dyn Error>> {
    info!("Initializing application...");
    let connect_options = PgConnectOptions::from_str(&config.db_url)?.statement_cache_capacity(0);
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .min_connections(1)
        .acquire_timeout(std::time::Duration::from_secs(10))
        .idle_timeout(Some(std::time::Duration::from_secs(60)))
        .connect_with(connect_options)
        .await?;

    info!("Database connection pool created successfully");
    let state = AppState::new(config, Arc::new(PgProfileStore::new(db_pool)))?;
    info!("External clients initialized successfully");

    let app = make_router(Arc::new(state));
    info!("Application initialized successfully");

    Ok(app)
}

pub fn make_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(health_check))
        .route("/api/news/agriculture", get(get_agriculture_news))
        .route("/api/weather", get(get_weather))
        .route("/api/chat", post(chat_completion))
        .nest("/api/user", profile_routes(state.clone()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"message": "AgriVision API"}))).into_response()
}
