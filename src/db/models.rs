use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::domain::{ForecastRecord, NewWeatherRecord, WeatherRecord};

/// Row of the `weather_data` table.
#[derive(Debug, Clone, FromRow)]
pub struct WeatherRow {
    pub id: i64,
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
    pub timezone: i32,
    pub forecast_date: NaiveDateTime,
    pub recorded_at: DateTime<Utc>,
}

impl From<WeatherRow> for WeatherRecord {
    fn from(r: WeatherRow) -> Self {
        Self {
            id: r.id,
            data: NewWeatherRecord {
                city: r.city,
                country: r.country,
                temperature: r.temperature,
                feels_like: r.feels_like,
                temp_min: r.temp_min,
                temp_max: r.temp_max,
                pressure: r.pressure,
                humidity: r.humidity,
                wind_speed: r.wind_speed,
                wind_deg: r.wind_deg,
                clouds: r.clouds,
                weather_main: r.weather_main,
                weather_description: r.weather_description,
                sunrise: r.sunrise,
                sunset: r.sunset,
                timezone: r.timezone,
                forecast_date: r.forecast_date,
            },
            recorded_at: r.recorded_at,
        }
    }
}

/// Row of the `forecasts` table.
#[derive(Debug, Clone, FromRow)]
pub struct ForecastRow {
    pub id: Uuid,
    pub city_name: String,
    pub temp: i32,
    pub description: String,
    pub date: NaiveDateTime,
    pub recorded_at: DateTime<Utc>,
}

impl From<ForecastRow> for ForecastRecord {
    fn from(r: ForecastRow) -> Self {
        Self {
            id: r.id,
            city_name: r.city_name,
            temp: r.temp,
            description: r.description,
            date: r.date,
            recorded_at: r.recorded_at,
        }
    }
}
