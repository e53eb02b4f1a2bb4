use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} not set")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub db_url: String,
    pub jwt_secret: String,
    pub gnews_api_key: Option<String>,
    pub gnews_base_url: String,
    pub weather_base_url: String,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub openai_model: String,
    pub http_timeout: Duration,
}

impl Config {
    pub fn init() -> Result<Self, ConfigError> {
        let http_timeout = match std::env::var("HTTP_TIMEOUT_SECS") {
            Ok(raw) => raw
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| ConfigError::Invalid {
                    name: "HTTP_TIMEOUT_SECS",
                    value: raw,
                })?,
            Err(_) => Duration::from_secs(15),
        };

        Ok(Config {
            bind_addr: var_or("BIND_ADDR", "127.0.0.1:3000"),
            db_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            gnews_api_key: optional("GNEWS_API_KEY"),
            gnews_base_url: var_or("GNEWS_BASE_URL", "https://gnews.io/api/v4"),
            weather_base_url: var_or("WEATHER_BASE_URL", "https://api.open-meteo.com/v1"),
            openai_api_key: optional("OPENAI_API_KEY"),
            openai_base_url: var_or("OPENAI_BASE_URL", "https://api.openai.com/v1"),
            openai_model: var_or("OPENAI_MODEL", "gpt-4o-mini"),
            http_timeout,
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    optional(name).ok_or(ConfigError::Missing(name))
}

fn optional(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn var_or(name: &str, default: &str) -> String {
    optional(name).unwrap_or_else(|| default.to_string())
}
