//! POST /webhook/weather: trigger a current-weather fetch from an external system.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::AppState;
use crate::domain::WeatherRecord;
use crate::errors::{AppError, ErrorResponse};
use crate::services::etl::WeatherEtl;

#[derive(Debug, Deserialize, ToSchema)]
pub struct WebhookPayload {
    /// City to fetch (required)
    pub city: Option<String>,
    /// Optional ISO 3166 country code
    pub country_code: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookData {
    pub city: String,
    pub temperature: f64,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookResponse {
    /// Always "success"
    pub status: String,
    pub data: WebhookData,
}

impl From<WeatherRecord> for WebhookResponse {
    fn from(r: WeatherRecord) -> Self {
        Self {
            status: "success".to_string(),
            data: WebhookData {
                city: r.data.city,
                temperature: r.data.temperature,
                recorded_at: r.recorded_at,
            },
        }
    }
}

/// Fetch and store the current weather for the city named in the payload.
#[utoipa::path(
    post,
    path = "/webhook/weather",
    tag = "Webhook",
    request_body = WebhookPayload,
    responses(
        (status = 200, description = "Weather fetched and stored", body = WebhookResponse),
        (status = 400, description = "Missing city or malformed body", body = ErrorResponse),
        (status = 502, description = "Weather provider unavailable or returned bad data", body = ErrorResponse),
    )
)]
pub async fn weather_webhook(
    State(state): State<AppState>,
    payload: Result<Json<WebhookPayload>, JsonRejection>,
) -> Result<Json<WebhookResponse>, AppError> {
    let Json(payload) = payload?;
    let city = payload
        .city
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| AppError::InvalidRequest("City parameter is required".to_string()))?;

    let record = WeatherEtl::new(&state.client, state.store.as_ref())
        .run(&city, payload.country_code.as_deref())
        .await?;
    Ok(Json(record.into()))
}
