//! Domain records and store filters.
//!
//! These are independent of both the HTTP wire shapes (`routes::*`) and the
//! database row mappings (`db::models`).

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use uuid::Uuid;

/// A normalized current-weather reading, ready to be persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewWeatherRecord {
    pub city: String,
    pub country: String,
    pub temperature: f64,
    pub feels_like: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub pressure: i32,
    pub humidity: i32,
    pub wind_speed: f64,
    pub wind_deg: i32,
    pub clouds: i32,
    pub weather_main: String,
    pub weather_description: String,
    pub sunrise: NaiveDateTime,
    pub sunset: NaiveDateTime,
    /// Offset from UTC in seconds, as reported by the provider.
    pub timezone: i32,
    pub forecast_date: NaiveDateTime,
}

/// A persisted current-weather reading.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherRecord {
    pub id: i64,
    pub data: NewWeatherRecord,
    pub recorded_at: DateTime<Utc>,
}

/// A normalized forecast bucket for one city.
#[derive(Debug, Clone, PartialEq)]
pub struct NewForecast {
    pub city_name: String,
    pub temp: i32,
    pub description: String,
    pub date: NaiveDateTime,
}

/// A persisted forecast bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastRecord {
    pub id: Uuid,
    pub city_name: String,
    pub temp: i32,
    pub description: String,
    pub date: NaiveDateTime,
    pub recorded_at: DateTime<Utc>,
}

/// Read filter for current-weather history.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeatherQuery {
    /// Case-insensitive substring of the city name.
    pub city_contains: Option<String>,
    /// Calendar date of `forecast_date`.
    pub date: Option<NaiveDate>,
    pub skip: i64,
    pub limit: Option<i64>,
}

/// Bulk delete filter for current-weather records. Date bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeatherDeleteFilter {
    pub city_contains: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl WeatherDeleteFilter {
    pub fn is_empty(&self) -> bool {
        self.city_contains.is_none() && self.start_date.is_none() && self.end_date.is_none()
    }
}

/// Read filter for forecasts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForecastQuery {
    pub city_contains: Option<String>,
    pub date: Option<NaiveDate>,
    pub skip: i64,
    pub limit: Option<i64>,
}

/// Case-insensitive substring test used by the in-memory store.
#[cfg(test)]
pub(crate) fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
