//! In-memory `WeatherStore` used by handler and ETL tests.

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use std::sync::Mutex;
use uuid::Uuid;

use super::{no_filter_error, WeatherStore};
use crate::domain::{
    contains_ignore_case, ForecastQuery, ForecastRecord, NewForecast, NewWeatherRecord,
    WeatherDeleteFilter, WeatherQuery, WeatherRecord,
};
use crate::errors::AppError;

#[derive(Default)]
struct Tables {
    weather: Vec<WeatherRecord>,
    forecasts: Vec<ForecastRecord>,
    next_weather_id: i64,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    fail_writes: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose inserts always fail, for rollback tests.
    pub fn failing_writes() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    pub fn weather_count(&self) -> usize {
        self.tables.lock().unwrap().weather.len()
    }

    pub fn forecast_count(&self) -> usize {
        self.tables.lock().unwrap().forecasts.len()
    }

    fn write_guard(&self) -> Result<(), AppError> {
        if self.fail_writes {
            return Err(AppError::DatabaseError(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

fn page<T: Clone>(items: Vec<T>, skip: i64, limit: Option<i64>) -> Vec<T> {
    let skipped = items.into_iter().skip(skip.max(0) as usize);
    match limit {
        Some(limit) => skipped.take(limit.max(0) as usize).collect(),
        None => skipped.collect(),
    }
}

#[async_trait]
impl WeatherStore for MemoryStore {
    async fn insert_weather(&self, record: NewWeatherRecord) -> Result<WeatherRecord, AppError> {
        self.write_guard()?;
        let mut tables = self.tables.lock().unwrap();
        tables.next_weather_id += 1;
        let stored = WeatherRecord {
            id: tables.next_weather_id,
            data: record,
            recorded_at: Utc::now(),
        };
        tables.weather.push(stored.clone());
        Ok(stored)
    }

    async fn query_weather(&self, query: &WeatherQuery) -> Result<Vec<WeatherRecord>, AppError> {
        let tables = self.tables.lock().unwrap();
        let mut matches: Vec<WeatherRecord> = tables
            .weather
            .iter()
            .filter(|r| {
                query
                    .city_contains
                    .as_deref()
                    .map_or(true, |c| contains_ignore_case(&r.data.city, c))
            })
            .filter(|r| query.date.map_or(true, |d| r.data.forecast_date.date() == d))
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at).then(b.id.cmp(&a.id)));
        Ok(page(matches, query.skip, query.limit))
    }

    async fn delete_weather_by_id(&self, id: i64) -> Result<u64, AppError> {
        let mut tables = self.tables.lock().unwrap();
        let before = tables.weather.len();
        tables.weather.retain(|r| r.id != id);
        Ok((before - tables.weather.len()) as u64)
    }

    async fn delete_weather_by_filter(
        &self,
        filter: &WeatherDeleteFilter,
    ) -> Result<u64, AppError> {
        if filter.is_empty() {
            return Err(no_filter_error());
        }
        let mut tables = self.tables.lock().unwrap();
        let before = tables.weather.len();
        tables.weather.retain(|r| {
            let day = r.data.forecast_date.date();
            let matches = filter
                .city_contains
                .as_deref()
                .map_or(true, |c| contains_ignore_case(&r.data.city, c))
                && filter.start_date.map_or(true, |s| day >= s)
                && filter.end_date.map_or(true, |e| day <= e);
            !matches
        });
        Ok((before - tables.weather.len()) as u64)
    }

    async fn forecast_dates(&self, city_name: &str) -> Result<Vec<NaiveDateTime>, AppError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .forecasts
            .iter()
            .filter(|f| f.city_name == city_name)
            .map(|f| f.date)
            .collect())
    }

    async fn insert_forecasts(
        &self,
        forecasts: Vec<NewForecast>,
    ) -> Result<Vec<ForecastRecord>, AppError> {
        self.write_guard()?;
        let mut tables = self.tables.lock().unwrap();
        let now = Utc::now();
        let inserted: Vec<ForecastRecord> = forecasts
            .into_iter()
            .map(|f| ForecastRecord {
                id: Uuid::new_v4(),
                city_name: f.city_name,
                temp: f.temp,
                description: f.description,
                date: f.date,
                recorded_at: now,
            })
            .collect();
        tables.forecasts.extend(inserted.iter().cloned());
        Ok(inserted)
    }

    async fn query_forecasts(
        &self,
        query: &ForecastQuery,
    ) -> Result<Vec<ForecastRecord>, AppError> {
        let tables = self.tables.lock().unwrap();
        let mut matches: Vec<ForecastRecord> = tables
            .forecasts
            .iter()
            .filter(|f| {
                query
                    .city_contains
                    .as_deref()
                    .map_or(true, |c| contains_ignore_case(&f.city_name, c))
            })
            .filter(|f| query.date.map_or(true, |d| f.date.date() == d))
            .cloned()
            .collect();
        matches.sort_by(|a, b| {
            a.city_name
                .cmp(&b.city_name)
                .then(a.date.cmp(&b.date))
                .then(a.id.cmp(&b.id))
        });
        Ok(page(matches, query.skip, query.limit))
    }

    async fn delete_forecast_by_id(&self, id: Uuid) -> Result<u64, AppError> {
        let mut tables = self.tables.lock().unwrap();
        let before = tables.forecasts.len();
        tables.forecasts.retain(|f| f.id != id);
        Ok((before - tables.forecasts.len()) as u64)
    }

    async fn ping(&self) -> bool {
        !self.fail_writes
    }
}
