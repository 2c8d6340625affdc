// Weather ETL API v0.1
use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod app;
mod config;
mod db;
mod domain;
mod errors;
mod routes;
mod services;

use config::AppConfig;
use db::queries::PgWeatherStore;
use routes::AppState;
use services::openweather::OpenWeatherClient;

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "weather_etl_api=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);

    if std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() {
    // A missing .env file is fine; real environment variables still apply.
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let pool = match db::connect(&config).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Failed to set up database: {}", e);
            std::process::exit(1);
        }
    };

    let client = match OpenWeatherClient::new(&config) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };

    let state = AppState {
        store: Arc::new(PgWeatherStore::new(pool)),
        client,
    };
    let router = app::build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("API server listening on {}", addr);
    tracing::info!(
        "Swagger UI available at http://localhost:{}/swagger-ui/",
        config.port
    );

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, router).await {
        tracing::error!("Server terminated unexpectedly: {}", e);
        std::process::exit(1);
    }
}
