//! Extract → transform → load orchestration.
//!
//! A run either persists its record(s) or persists nothing; the error from
//! the failing stage is returned unchanged.

use std::collections::HashSet;
use std::fmt;

use chrono::NaiveDateTime;

use crate::db::WeatherStore;
use crate::domain::{ForecastRecord, NewForecast, WeatherRecord};
use crate::errors::AppError;
use crate::services::normalize::{normalize_current, normalize_forecast_entry};
use crate::services::openweather::OpenWeatherClient;

/// Pipeline stage, reported when a run fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EtlStage {
    Extract,
    Transform,
    Load,
}

impl fmt::Display for EtlStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EtlStage::Extract => "extract",
            EtlStage::Transform => "transform",
            EtlStage::Load => "load",
        })
    }
}

/// Result of a bulk forecast load.
#[derive(Debug)]
pub struct ForecastBatch {
    pub city_name: String,
    pub inserted: Vec<ForecastRecord>,
}

impl ForecastBatch {
    pub fn count(&self) -> usize {
        self.inserted.len()
    }
}

/// Request-scoped pipeline over a client and a store.
pub struct WeatherEtl<'a> {
    client: &'a OpenWeatherClient,
    store: &'a dyn WeatherStore,
}

fn failed(stage: EtlStage, city: &str) -> impl FnOnce(AppError) -> AppError + '_ {
    move |err| {
        tracing::warn!(stage = %stage, city = city, "ETL run failed: {}", err);
        err
    }
}

impl<'a> WeatherEtl<'a> {
    pub fn new(client: &'a OpenWeatherClient, store: &'a dyn WeatherStore) -> Self {
        Self { client, store }
    }

    /// Fetch, normalize and persist the current weather for one city.
    ///
    /// No duplicate check: two runs for the same city store two readings.
    pub async fn run(
        &self,
        city: &str,
        country_code: Option<&str>,
    ) -> Result<WeatherRecord, AppError> {
        let raw = self
            .client
            .fetch_current_weather(city, country_code)
            .await
            .map_err(failed(EtlStage::Extract, city))?;

        let record = normalize_current(&raw).map_err(failed(EtlStage::Transform, city))?;

        let stored = self
            .store
            .insert_weather(record)
            .await
            .map_err(failed(EtlStage::Load, city))?;

        tracing::info!(
            "Stored weather record {} for {} ({:.1}°C)",
            stored.id,
            stored.data.city,
            stored.data.temperature
        );
        Ok(stored)
    }

    /// Fetch the forecast for `city_name` and persist every bucket whose
    /// timestamp is not yet stored for that city.
    ///
    /// The existing-dates check and the insert are separate statements, so
    /// two concurrent runs for the same city can both insert a bucket.
    pub async fn run_forecast(&self, city_name: &str) -> Result<ForecastBatch, AppError> {
        let entries = self
            .client
            .fetch_forecast(city_name)
            .await
            .map_err(failed(EtlStage::Extract, city_name))?;

        let forecasts = entries
            .iter()
            .map(|entry| normalize_forecast_entry(city_name, entry))
            .collect::<Result<Vec<_>, _>>()
            .map_err(failed(EtlStage::Transform, city_name))?;

        let existing = self
            .store
            .forecast_dates(city_name)
            .await
            .map_err(failed(EtlStage::Load, city_name))?;
        let fresh = retain_unseen(existing, forecasts);

        let inserted = if fresh.is_empty() {
            Vec::new()
        } else {
            self.store
                .insert_forecasts(fresh)
                .await
                .map_err(failed(EtlStage::Load, city_name))?
        };

        tracing::info!(
            "Inserted {} forecast records for {} ({} upstream entries)",
            inserted.len(),
            city_name,
            entries.len()
        );
        Ok(ForecastBatch {
            city_name: city_name.to_string(),
            inserted,
        })
    }
}

/// Drop forecasts whose timestamp is already stored, or repeats an earlier
/// entry of the same batch. Order is preserved.
pub fn retain_unseen(
    existing: impl IntoIterator<Item = NaiveDateTime>,
    forecasts: Vec<NewForecast>,
) -> Vec<NewForecast> {
    let mut seen: HashSet<NaiveDateTime> = existing.into_iter().collect();
    forecasts
        .into_iter()
        .filter(|f| seen.insert(f.date))
        .collect()
}
