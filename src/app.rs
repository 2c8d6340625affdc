use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::errors;
use crate::routes::{self, AppState};

/// OpenAPI document for the Weather ETL API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Weather ETL API",
        version = "0.1.0",
        description = "Fetches current weather and forecasts from OpenWeatherMap, \
            normalizes them into flat records stored in Postgres, and exposes \
            filtered reads and deletes over them.",
        license(name = "MIT"),
    ),
    tags(
        (name = "Health", description = "Service health check"),
        (name = "Weather", description = "Current-weather readings"),
        (name = "Webhook", description = "Externally triggered fetches"),
        (name = "Forecasts", description = "Per-city forecast buckets"),
    ),
    paths(
        routes::health::health_check,
        routes::weather::create_weather,
        routes::weather::get_weather_history,
        routes::weather::delete_weather,
        routes::weather::bulk_delete_weather,
        routes::webhook::weather_webhook,
        routes::forecasts::create_forecasts,
        routes::forecasts::list_forecasts,
        routes::forecasts::delete_forecast,
    ),
    components(
        schemas(
            routes::health::HealthResponse,
            routes::weather::WeatherResponse,
            routes::weather::WeatherDeleteRequest,
            routes::weather::DeleteResponse,
            routes::webhook::WebhookPayload,
            routes::webhook::WebhookData,
            routes::webhook::WebhookResponse,
            routes::forecasts::CityPost,
            routes::forecasts::ForecastItem,
            routes::forecasts::ForecastInsertResponse,
            routes::forecasts::ForecastListResponse,
            routes::forecasts::ForecastDeleteResponse,
            errors::ErrorResponse,
        )
    )
)]
pub(crate) struct ApiDoc;

/// Assemble every route, the Swagger UI and the HTTP middleware.
pub(crate) fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/weather/", delete(routes::weather::bulk_delete_weather))
        .route(
            "/weather/:city",
            post(routes::weather::create_weather)
                .get(routes::weather::get_weather_history)
                .delete(routes::weather::delete_weather),
        )
        .route("/webhook/weather", post(routes::webhook::weather_webhook))
        .route(
            "/previsao/",
            post(routes::forecasts::create_forecasts).get(routes::forecasts::list_forecasts),
        )
        .route("/previsao/:id", delete(routes::forecasts::delete_forecast))
        .with_state(state);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(api)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
