/// Default OpenWeatherMap API root (current weather is `/weather`, forecasts `/forecast`).
const DEFAULT_OPENWEATHER_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Application configuration, parsed from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub openweather_api_key: String,
    pub openweather_base_url: String,
    /// Language requested for forecast descriptions.
    pub forecast_lang: String,
    /// Per-call timeout for upstream requests.
    pub upstream_timeout_secs: u64,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let database_url = match var("DATABASE_URL") {
            Some(url) => url,
            None => {
                let user = var("DATABASE_USER").ok_or(ConfigError::Missing("DATABASE_USER"))?;
                let password =
                    var("DATABASE_PASSWORD").ok_or(ConfigError::Missing("DATABASE_PASSWORD"))?;
                let name = var("DATABASE_NAME").ok_or(ConfigError::Missing("DATABASE_NAME"))?;
                let host = var("DATABASE_HOST").unwrap_or_else(|| "localhost".to_string());
                let port = var("DATABASE_PORT").unwrap_or_else(|| "5432".to_string());
                format!("postgres://{}:{}@{}:{}/{}", user, password, host, port, name)
            }
        };

        let openweather_api_key =
            var("OPENWEATHER_API_KEY").ok_or(ConfigError::Missing("OPENWEATHER_API_KEY"))?;

        let upstream_timeout_secs = match var("UPSTREAM_TIMEOUT_SECS") {
            Some(raw) => raw.parse().map_err(|e| ConfigError::Invalid {
                name: "UPSTREAM_TIMEOUT_SECS",
                reason: format!("{}", e),
            })?,
            None => 10,
        };

        let port = match var("PORT") {
            Some(raw) => raw.parse().map_err(|e| ConfigError::Invalid {
                name: "PORT",
                reason: format!("{}", e),
            })?,
            None => 8080,
        };

        Ok(Self {
            database_url,
            openweather_api_key,
            openweather_base_url: var("OPENWEATHER_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_OPENWEATHER_BASE_URL.to_string()),
            forecast_lang: var("OPENWEATHER_LANG").unwrap_or_else(|| "pt_br".to_string()),
            upstream_timeout_secs,
            port,
        })
    }
}
