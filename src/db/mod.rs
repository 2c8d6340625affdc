//! Record store: the only owner of persisted weather and forecast records.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::domain::{
    ForecastQuery, ForecastRecord, NewForecast, NewWeatherRecord, WeatherDeleteFilter,
    WeatherQuery, WeatherRecord,
};
use crate::errors::AppError;

#[cfg(test)]
pub mod memory;
pub mod models;
pub mod queries;

/// Maximum number of connections in the database pool.
const DB_POOL_MAX_CONNECTIONS: u32 = 5;
/// Minimum number of connections kept alive in the database pool.
const DB_POOL_MIN_CONNECTIONS: u32 = 2;

/// Open the connection pool and apply pending migrations.
pub async fn connect(config: &AppConfig) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(DB_POOL_MAX_CONNECTIONS)
        .min_connections(DB_POOL_MIN_CONNECTIONS)
        .connect(&config.database_url)
        .await?;

    sqlx::migrate!().run(&pool).await?;
    tracing::info!("Database migrations completed");

    Ok(pool)
}

/// Persistence operations for both record kinds.
///
/// Every write is atomic: it is either fully committed or leaves the store
/// untouched.
#[async_trait]
pub trait WeatherStore: Send + Sync {
    /// Persist a reading; the store assigns `id` and `recorded_at`.
    async fn insert_weather(&self, record: NewWeatherRecord) -> Result<WeatherRecord, AppError>;

    /// Filtered history, newest `recorded_at` first.
    async fn query_weather(&self, query: &WeatherQuery) -> Result<Vec<WeatherRecord>, AppError>;

    /// Returns the number of deleted rows (0 or 1).
    async fn delete_weather_by_id(&self, id: i64) -> Result<u64, AppError>;

    /// Fails with `InvalidFilter` when the filter has no criteria.
    async fn delete_weather_by_filter(&self, filter: &WeatherDeleteFilter)
        -> Result<u64, AppError>;

    /// Timestamps already stored for `city_name` (exact match).
    async fn forecast_dates(&self, city_name: &str) -> Result<Vec<NaiveDateTime>, AppError>;

    /// Persist a batch of forecasts in one transaction.
    async fn insert_forecasts(
        &self,
        forecasts: Vec<NewForecast>,
    ) -> Result<Vec<ForecastRecord>, AppError>;

    /// Filtered forecasts ordered by city, then date.
    async fn query_forecasts(&self, query: &ForecastQuery)
        -> Result<Vec<ForecastRecord>, AppError>;

    async fn delete_forecast_by_id(&self, id: Uuid) -> Result<u64, AppError>;

    /// Whether the backing store answers a trivial query.
    async fn ping(&self) -> bool;
}

pub(crate) fn no_filter_error() -> AppError {
    AppError::InvalidFilter("At least one filter must be provided".to_string())
}
