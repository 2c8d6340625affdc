//! Forecast HTTP endpoints.
//!
//! - POST   /previsao/            body: {"cidade": "..."}
//! - GET    /previsao/?cidade=&data=YYYY-MM-DD
//! - DELETE /previsao/:id

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::weather::{non_negative, parse_date_param};
use super::AppState;
use crate::domain::{ForecastQuery, ForecastRecord};
use crate::errors::{AppError, ErrorResponse};
use crate::services::etl::WeatherEtl;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CityPost {
    /// City to fetch the forecast for
    pub cidade: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ForecastListParams {
    /// Filter by city name (case-insensitive substring)
    pub cidade: Option<String>,
    /// Filter by date (YYYY-MM-DD)
    pub data: Option<String>,
    /// Number of records to skip (default 0)
    pub skip: Option<i64>,
    /// Maximum number of records to return (default unbounded)
    pub limit: Option<i64>,
}

/// A stored forecast bucket.
#[derive(Debug, Serialize, ToSchema)]
pub struct ForecastItem {
    pub id: Uuid,
    pub city_name: String,
    /// Temperature in whole °C
    pub temp: i32,
    pub description: String,
    /// Start of the forecast bucket
    pub date: NaiveDateTime,
    pub recorded_at: DateTime<Utc>,
}

impl From<ForecastRecord> for ForecastItem {
    fn from(f: ForecastRecord) -> Self {
        Self {
            id: f.id,
            city_name: f.city_name,
            temp: f.temp,
            description: f.description,
            date: f.date,
            recorded_at: f.recorded_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ForecastInsertResponse {
    pub message: String,
    /// Number of new records
    pub count: usize,
    pub data: Vec<ForecastItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ForecastListResponse {
    pub total: usize,
    pub forecasts: Vec<ForecastItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ForecastDeleteResponse {
    pub message: String,
}

/// Fetch the forecast for a city and store the buckets not stored yet.
#[utoipa::path(
    post,
    path = "/previsao/",
    tag = "Forecasts",
    request_body = CityPost,
    responses(
        (status = 200, description = "New forecast records", body = ForecastInsertResponse),
        (status = 400, description = "Malformed body", body = ErrorResponse),
        (status = 502, description = "Weather provider unreachable or returned bad data", body = ErrorResponse),
    )
)]
pub async fn create_forecasts(
    State(state): State<AppState>,
    payload: Result<Json<CityPost>, JsonRejection>,
) -> Result<Json<ForecastInsertResponse>, AppError> {
    let Json(payload) = payload?;
    let batch = WeatherEtl::new(&state.client, state.store.as_ref())
        .run_forecast(&payload.cidade)
        .await
        .map_err(AppError::forward_upstream_status)?;

    Ok(Json(ForecastInsertResponse {
        message: format!(
            "Inserted {} records for {}",
            batch.count(),
            batch.city_name
        ),
        count: batch.count(),
        data: batch.inserted.into_iter().map(ForecastItem::from).collect(),
    }))
}

/// List stored forecasts ordered by city, then date.
#[utoipa::path(
    get,
    path = "/previsao/",
    tag = "Forecasts",
    params(ForecastListParams),
    responses(
        (status = 200, description = "Matching forecasts", body = ForecastListResponse),
        (status = 400, description = "Invalid date format", body = ErrorResponse),
    )
)]
pub async fn list_forecasts(
    State(state): State<AppState>,
    params: Result<Query<ForecastListParams>, QueryRejection>,
) -> Result<Json<ForecastListResponse>, AppError> {
    let Query(params) = params?;
    let query = ForecastQuery {
        city_contains: params.cidade.filter(|c| !c.trim().is_empty()),
        date: parse_date_param(params.data.as_deref())?,
        skip: non_negative("skip", params.skip)?.unwrap_or(0),
        limit: non_negative("limit", params.limit)?,
    };

    let forecasts = state.store.query_forecasts(&query).await?;
    Ok(Json(ForecastListResponse {
        total: forecasts.len(),
        forecasts: forecasts.into_iter().map(ForecastItem::from).collect(),
    }))
}

/// Delete a single forecast.
#[utoipa::path(
    delete,
    path = "/previsao/{id}",
    tag = "Forecasts",
    params(
        ("id" = Uuid, Path, description = "Forecast UUID"),
    ),
    responses(
        (status = 200, description = "Forecast deleted", body = ForecastDeleteResponse),
        (status = 400, description = "Id is not a UUID", body = ErrorResponse),
        (status = 404, description = "Forecast not found", body = ErrorResponse),
    )
)]
pub async fn delete_forecast(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<ForecastDeleteResponse>, AppError> {
    let id: Uuid = raw_id
        .parse()
        .map_err(|e| AppError::InvalidRequest(format!("Invalid forecast id: {}", e)))?;

    if state.store.delete_forecast_by_id(id).await? == 0 {
        return Err(AppError::NotFound("Forecast not found".to_string()));
    }
    tracing::info!("Deleted forecast {}", id);
    Ok(Json(ForecastDeleteResponse {
        message: format!("Forecast with ID {} has been deleted", id),
    }))
}
