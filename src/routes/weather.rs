//! Current-weather HTTP endpoints.
//!
//! - POST   /weather/:city?country_code=XX
//! - GET    /weather/:city?date=YYYY-MM-DD&skip=0&limit=100
//! - DELETE /weather/:id
//! - DELETE /weather/   (JSON filter body)

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::AppState;
use crate::domain::{WeatherDeleteFilter, WeatherQuery, WeatherRecord};
use crate::errors::{AppError, ErrorResponse};
use crate::services::etl::WeatherEtl;

/// Page size used when `limit` is not given.
const DEFAULT_HISTORY_LIMIT: i64 = 100;

pub(crate) const DATE_FORMAT_ERROR: &str = "Invalid date format. Use YYYY-MM-DD";

/// Parse an optional `YYYY-MM-DD` query value.
pub(crate) fn parse_date_param(raw: Option<&str>) -> Result<Option<NaiveDate>, AppError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| AppError::InvalidRequest(DATE_FORMAT_ERROR.to_string())),
    }
}

pub(crate) fn non_negative(name: &str, value: Option<i64>) -> Result<Option<i64>, AppError> {
    match value {
        Some(v) if v < 0 => Err(AppError::InvalidRequest(format!(
            "{} must be greater than or equal to 0",
            name
        ))),
        other => Ok(other),
    }
}

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CreateWeatherParams {
    /// ISO 3166 country code used to disambiguate the city (e.g. "GB")
    pub country_code: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct WeatherHistoryParams {
    /// Only records whose forecast date falls on this day (YYYY-MM-DD)
    pub date: Option<String>,
    /// Number of records to skip (default 0)
    pub skip: Option<i64>,
    /// Maximum number of records to return (default 100)
    pub limit: Option<i64>,
}

/// Body of DELETE /weather/. At least one field is required.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct WeatherDeleteRequest {
    /// Case-insensitive substring of the city name
    pub city: Option<String>,
    /// First forecast day to delete, inclusive (YYYY-MM-DD)
    pub start_date: Option<NaiveDate>,
    /// Last forecast day to delete, inclusive (YYYY-MM-DD)
    pub end_date: Option<NaiveDate>,
}

impl From<WeatherDeleteRequest> for WeatherDeleteFilter {
    fn from(r: WeatherDeleteRequest) -> Self {
        Self {
            city_contains: r.city.filter(|c| !c.trim().is_empty()),
            start_date: r.start_date,
            end_date: r.end_date,
        }
    }
}

/// A stored current-weather reading.
#[derive(Debug, Serialize, ToSchema)]
pub struct WeatherResponse {
    pub id: i64,
    pub city: String,
    /// ISO 3166 country code
    pub country: String,
    /// Temperature in °C
    pub temperature: f64,
    pub feels_like: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    /// Atmospheric pressure in hPa
    pub pressure: i32,
    /// Relative humidity in percent
    pub humidity: i32,
    /// Wind speed in m/s
    pub wind_speed: f64,
    /// Wind direction in degrees (0 when not reported)
    pub wind_deg: i32,
    /// Cloud cover in percent
    pub clouds: i32,
    /// Weather category (e.g. "Clouds")
    pub weather_main: String,
    pub weather_description: String,
    pub sunrise: NaiveDateTime,
    pub sunset: NaiveDateTime,
    /// Offset from UTC in seconds
    pub timezone: i32,
    /// When the measurement applies
    pub forecast_date: NaiveDateTime,
    /// When the record was stored
    pub recorded_at: DateTime<Utc>,
}

impl From<WeatherRecord> for WeatherResponse {
    fn from(r: WeatherRecord) -> Self {
        let d = r.data;
        Self {
            id: r.id,
            city: d.city,
            country: d.country,
            temperature: d.temperature,
            feels_like: d.feels_like,
            temp_min: d.temp_min,
            temp_max: d.temp_max,
            pressure: d.pressure,
            humidity: d.humidity,
            wind_speed: d.wind_speed,
            wind_deg: d.wind_deg,
            clouds: d.clouds,
            weather_main: d.weather_main,
            weather_description: d.weather_description,
            sunrise: d.sunrise,
            sunset: d.sunset,
            timezone: d.timezone,
            forecast_date: d.forecast_date,
            recorded_at: r.recorded_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteResponse {
    pub message: String,
    pub deleted_count: u64,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Fetch the current weather for a city from the provider and store it.
#[utoipa::path(
    post,
    path = "/weather/{city}",
    tag = "Weather",
    params(
        ("city" = String, Path, description = "City name"),
        CreateWeatherParams,
    ),
    responses(
        (status = 200, description = "Stored weather record", body = WeatherResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 502, description = "Weather provider unavailable or returned bad data", body = ErrorResponse),
    )
)]
pub async fn create_weather(
    State(state): State<AppState>,
    Path(city): Path<String>,
    params: Result<Query<CreateWeatherParams>, QueryRejection>,
) -> Result<Json<WeatherResponse>, AppError> {
    let Query(params) = params?;
    let record = WeatherEtl::new(&state.client, state.store.as_ref())
        .run(&city, params.country_code.as_deref())
        .await?;
    Ok(Json(record.into()))
}

/// List stored readings whose city contains the given text, newest first.
#[utoipa::path(
    get,
    path = "/weather/{city}",
    tag = "Weather",
    params(
        ("city" = String, Path, description = "Case-insensitive substring of the city name"),
        WeatherHistoryParams,
    ),
    responses(
        (status = 200, description = "Matching weather records", body = Vec<WeatherResponse>),
        (status = 400, description = "Invalid query parameters", body = ErrorResponse),
    )
)]
pub async fn get_weather_history(
    State(state): State<AppState>,
    Path(city): Path<String>,
    params: Result<Query<WeatherHistoryParams>, QueryRejection>,
) -> Result<Json<Vec<WeatherResponse>>, AppError> {
    let Query(params) = params?;
    let query = WeatherQuery {
        city_contains: Some(city),
        date: parse_date_param(params.date.as_deref())?,
        skip: non_negative("skip", params.skip)?.unwrap_or(0),
        limit: Some(non_negative("limit", params.limit)?.unwrap_or(DEFAULT_HISTORY_LIMIT)),
    };

    let records = state.store.query_weather(&query).await?;
    Ok(Json(records.into_iter().map(WeatherResponse::from).collect()))
}

/// Delete a single stored reading.
#[utoipa::path(
    delete,
    path = "/weather/{id}",
    tag = "Weather",
    params(
        ("id" = i64, Path, description = "Weather record id"),
    ),
    responses(
        (status = 200, description = "Record deleted", body = DeleteResponse),
        (status = 400, description = "Id is not an integer", body = ErrorResponse),
        (status = 404, description = "Record not found", body = ErrorResponse),
    )
)]
pub async fn delete_weather(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<DeleteResponse>, AppError> {
    let Path(id) = id?;
    let deleted = state.store.delete_weather_by_id(id).await?;
    if deleted == 0 {
        return Err(AppError::NotFound("Weather record not found".to_string()));
    }
    tracing::info!("Deleted weather record {}", id);
    Ok(Json(DeleteResponse {
        message: "Weather record deleted".to_string(),
        deleted_count: deleted,
    }))
}

/// Delete every stored reading matching all given criteria.
#[utoipa::path(
    delete,
    path = "/weather/",
    tag = "Weather",
    request_body = WeatherDeleteRequest,
    responses(
        (status = 200, description = "Records deleted", body = DeleteResponse),
        (status = 400, description = "No filter given or malformed body", body = ErrorResponse),
    )
)]
pub async fn bulk_delete_weather(
    State(state): State<AppState>,
    body: Result<Json<WeatherDeleteRequest>, JsonRejection>,
) -> Result<Json<DeleteResponse>, AppError> {
    let Json(body) = body?;
    let filter = WeatherDeleteFilter::from(body);
    let deleted = state.store.delete_weather_by_filter(&filter).await?;
    tracing::info!("Bulk-deleted {} weather records ({:?})", deleted, filter);
    Ok(Json(DeleteResponse {
        message: "Weather records deleted".to_string(),
        deleted_count: deleted,
    }))
}
