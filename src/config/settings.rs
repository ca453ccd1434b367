use std::env;
use std::str::FromStr;

pub const DEFAULT_ACCESS_TOKEN_TTL_SECS: i64 = 60 * 60;
pub const DEFAULT_REFRESH_TOKEN_TTL_SECS: i64 = 30 * 24 * 60 * 60;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
    #[error("Production environment requires an https BASE_URL, got {0}")]
    InsecureBaseUrl(String),
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Public origin used to build links in account emails.
    pub base_url: String,
    pub environment: String,
    /// Comma-separated allowed origins, or `*`.
    pub cors_origins: String,
    pub access_token_ttl_secs: i64,
    pub refresh_token_ttl_secs: i64,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = env::var("BASE_URL")
            .unwrap_or_else(|_| "http://localhost:8080".to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Settings {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parse_var("PORT", 8080)?,
            database_url: env::var("DATABASE_URL")
                .map_err(|_| ConfigError::MissingEnvVar("DATABASE_URL"))?,
            base_url,
            environment: current_environment(),
            cors_origins: env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string()),
            access_token_ttl_secs: parse_positive("ACCESS_TOKEN_TTL_SECS", DEFAULT_ACCESS_TOKEN_TTL_SECS)?,
            refresh_token_ttl_secs: parse_positive(
                "REFRESH_TOKEN_TTL_SECS",
                DEFAULT_REFRESH_TOKEN_TTL_SECS,
            )?,
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Explicit origins, or `None` when every origin is allowed.
    pub fn allowed_origins(&self) -> Option<Vec<String>> {
        if self.cors_origins.trim() == "*" {
            return None;
        }
        Some(
            self.cors_origins
                .split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect(),
        )
    }

    pub fn validate_production_config(&self) -> Result<(), ConfigError> {
        if !self.is_production() {
            return Ok(());
        }

        if !self.base_url.starts_with("https://") {
            return Err(ConfigError::InsecureBaseUrl(self.base_url.clone()));
        }

        if self.allowed_origins().is_none() {
            tracing::warn!("CORS_ORIGINS allows any origin in production");
        }

        Ok(())
    }
}

fn current_environment() -> String {
    env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string())
}

fn parse_var<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key, value)),
        Err(_) => Ok(default),
    }
}

fn parse_positive(key: &'static str, default: i64) -> Result<i64, ConfigError> {
    let value = parse_var(key, default)?;
    if value <= 0 {
        return Err(ConfigError::InvalidValue(key, value.to_string()));
    }
    Ok(value)
}
