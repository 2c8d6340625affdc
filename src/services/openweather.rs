//! OpenWeatherMap client (current weather and 5-day / 3-hour forecast).
//!
//! Returns the decoded JSON unmodified; field extraction lives in
//! `services::normalize`.

use std::time::Duration;

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::services::normalize::title_case;

/// Maximum number of body characters quoted in an upstream error.
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Client for the OpenWeatherMap REST API.
#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    forecast_lang: String,
}

impl OpenWeatherClient {
    pub fn new(config: &AppConfig) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.upstream_timeout_secs))
            .build()
            .map_err(|e| AppError::InternalError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: config.openweather_base_url.clone(),
            api_key: config.openweather_api_key.clone(),
            forecast_lang: config.forecast_lang.clone(),
        })
    }

    /// Fetch the current weather for `city`, optionally narrowed by an
    /// ISO 3166 country code (`q=city,CC`).
    pub async fn fetch_current_weather(
        &self,
        city: &str,
        country_code: Option<&str>,
    ) -> Result<serde_json::Value, AppError> {
        let city = require_city(city)?;
        let q = match country_code.map(str::trim).filter(|cc| !cc.is_empty()) {
            Some(cc) => format!("{},{}", city, cc),
            None => city.to_string(),
        };

        self.get_json(
            "weather",
            &[
                ("q", q.as_str()),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
            ],
        )
        .await
    }

    /// Fetch the forecast list for `city`. Each element is one time bucket.
    pub async fn fetch_forecast(&self, city: &str) -> Result<Vec<serde_json::Value>, AppError> {
        let city = require_city(city)?;
        let body = self
            .get_json(
                "forecast",
                &[
                    ("q", city),
                    ("appid", self.api_key.as_str()),
                    ("units", "metric"),
                    ("lang", self.forecast_lang.as_str()),
                ],
            )
            .await?;

        match body.get("list") {
            None => Ok(Vec::new()),
            Some(serde_json::Value::Array(entries)) => Ok(entries.clone()),
            Some(_) => Err(AppError::unexpected_type("list")),
        }
    }

    async fn get_json(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<serde_json::Value, AppError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        tracing::debug!("GET {} q={:?}", url, params.first().map(|(_, v)| *v));

        let response = self
            .client
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(|e| {
                // The request URL carries the API key.
                let e = e.without_url();
                tracing::warn!("request to {} failed: {:?}", endpoint, e);
                AppError::UpstreamUnavailable {
                    status: None,
                    message: format!("request to {} failed: {}", endpoint, e),
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    tracing::debug!(
                        "could not read {} error body ({}): {}",
                        endpoint,
                        status,
                        e.without_url()
                    );
                    String::new()
                }
            };
            return Err(AppError::UpstreamUnavailable {
                status: Some(status.as_u16()),
                message: upstream_error_message(&body),
            });
        }

        response.json().await.map_err(|e| {
            let e = e.without_url();
            tracing::warn!("{} JSON parse error: {:?}", endpoint, e);
            AppError::UpstreamUnavailable {
                status: None,
                message: format!("{} JSON parse error: {}", endpoint, e),
            }
        })
    }
}

fn require_city(city: &str) -> Result<&str, AppError> {
    let city = city.trim();
    if city.is_empty() {
        return Err(AppError::InvalidRequest(
            "City parameter is required".to_string(),
        ));
    }
    Ok(city)
}

/// Prefer the provider's `message` field; fall back to a truncated body.
fn upstream_error_message(body: &str) -> String {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from));

    match message {
        Some(m) if !m.is_empty() => title_case(&m),
        _ if body.trim().is_empty() => "An Unknown Error Occurred".to_string(),
        _ => body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(base_url: &str) -> OpenWeatherClient {
        let config = AppConfig {
            database_url: "postgres://unused".into(),
            openweather_api_key: "test-key".into(),
            openweather_base_url: base_url.into(),
            forecast_lang: "pt_br".into(),
            upstream_timeout_secs: 2,
            port: 0,
        };
        OpenWeatherClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_current_weather_sends_city_and_country() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .and(query_param("q", "London,GB"))
            .and(query_param("appid", "test-key"))
            .and(query_param("units", "metric"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "London"})))
            .expect(1)
            .mount(&server)
            .await;

        let body = client_for(&server.uri())
            .fetch_current_weather("London", Some("GB"))
            .await
            .unwrap();
        assert_eq!(body, json!({"name": "London"}));
    }

    #[tokio::test]
    async fn test_current_weather_without_country() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .and(query_param("q", "Lisbon"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "Lisbon"})))
            .expect(1)
            .mount(&server)
            .await;

        let body = client_for(&server.uri())
            .fetch_current_weather("Lisbon", Some("  "))
            .await
            .unwrap();
        assert_eq!(body["name"], "Lisbon");
    }

    #[tokio::test]
    async fn test_non_success_status_is_upstream_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(json!({"cod": "404", "message": "city not found"})),
            )
            .mount(&server)
            .await;

        let err = client_for(&server.uri())
            .fetch_current_weather("Atlantis", None)
            .await
            .unwrap_err();
        match err {
            AppError::UpstreamUnavailable { status, message } => {
                assert_eq!(status, Some(404));
                assert_eq!(message, "City Not Found");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_connection_failure_is_upstream_unavailable() {
        // Nothing listens on the discard port of localhost.
        let err = client_for("http://127.0.0.1:9")
            .fetch_current_weather("London", None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::UpstreamUnavailable { status: None, .. }
        ));
    }

    #[tokio::test]
    async fn test_invalid_json_is_upstream_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = client_for(&server.uri())
            .fetch_current_weather("London", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UpstreamUnavailable { .. }));
        assert!(!err.to_string().contains("test-key"));
    }

    #[tokio::test]
    async fn test_connection_failure_message_omits_request_url() {
        let err = client_for("http://127.0.0.1:9")
            .fetch_current_weather("London", None)
            .await
            .unwrap_err();
        match err {
            AppError::UpstreamUnavailable { status, message } => {
                assert_eq!(status, None);
                assert!(!message.contains("appid"));
                assert!(!message.contains("test-key"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_blank_city_is_rejected_without_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = client_for(&server.uri())
            .fetch_current_weather("   ", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_forecast_returns_list_entries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/forecast"))
            .and(query_param("q", "Paris"))
            .and(query_param("lang", "pt_br"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "cod": "200",
                "list": [{"dt": 1}, {"dt": 2}]
            })))
            .mount(&server)
            .await;

        let entries = client_for(&server.uri())
            .fetch_forecast("Paris")
            .await
            .unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1]["dt"], 2);
    }

    #[tokio::test]
    async fn test_forecast_without_list_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"cod": "200"})))
            .mount(&server)
            .await;

        let entries = client_for(&server.uri())
            .fetch_forecast("Paris")
            .await
            .unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn test_forecast_list_wrong_type_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"list": "nope"})))
            .mount(&server)
            .await;

        let err = client_for(&server.uri())
            .fetch_forecast("Paris")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::MalformedUpstreamPayload { .. }));
    }

    #[test]
    fn test_upstream_error_message_fallbacks() {
        assert_eq!(
            upstream_error_message(r#"{"message":"invalid api key"}"#),
            "Invalid Api Key"
        );
        assert_eq!(upstream_error_message(""), "An Unknown Error Occurred");
        assert_eq!(upstream_error_message("Bad Gateway"), "Bad Gateway");
    }
}
