use std::sync::Arc;

use crate::db::WeatherStore;
use crate::services::openweather::OpenWeatherClient;

pub mod forecasts;
pub mod health;
pub mod weather;
pub mod webhook;

/// Shared application state for all endpoints.
#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) store: Arc<dyn WeatherStore>,
    pub(crate) client: OpenWeatherClient,
}
