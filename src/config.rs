//! Configuration management for the weather gateway
//!
//! Handles loading configuration from files and environment variables,
//! and validates every setting before the core is constructed.

use crate::GatewayError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure for the weather gateway
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Cache TTLs and capacity
    pub cache: CacheConfig,
    /// Outbound request behaviour
    pub http: HttpConfig,
    /// Upstream base URLs
    pub providers: ProvidersConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Cache configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Freshness window for current-conditions entries
    pub ttl_current_seconds: u64,
    /// Freshness window for forecast entries
    pub ttl_forecast_seconds: u64,
    /// How long an expired entry may still be served while refreshing
    pub swr_window_seconds: u64,
    /// Maximum number of cached keys
    pub capacity: usize,
}

/// Outbound HTTP settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Deadline for one request attempt
    pub timeout_ms: u64,
    /// Retries after the first attempt
    pub retry_attempts: u32,
    pub retry_min_jitter_ms: u64,
    pub retry_max_jitter_ms: u64,
    /// Sent on every request; MET Norway rejects anonymous clients
    pub user_agent: String,
}

/// Upstream endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub open_meteo_base: String,
    pub met_no_base: String,
    pub geocoding_base: String,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Log format (pretty or json)
    pub format: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_current_seconds: 300,
            ttl_forecast_seconds: 900,
            swr_window_seconds: 60,
            capacity: 512,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 2000,
            retry_attempts: 1,
            retry_min_jitter_ms: 150,
            retry_max_jitter_ms: 400,
            user_agent: format!(
                "weather-gateway/{} (+https://github.com/weather-gateway)",
                crate::VERSION
            ),
        }
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            open_meteo_base: "https://api.open-meteo.com".to_string(),
            met_no_base: "https://api.met.no".to_string(),
            geocoding_base: "https://geocoding-api.open-meteo.com".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl CacheConfig {
    #[must_use]
    pub fn ttl_current(&self) -> Duration {
        Duration::from_secs(self.ttl_current_seconds)
    }

    #[must_use]
    pub fn ttl_forecast(&self) -> Duration {
        Duration::from_secs(self.ttl_forecast_seconds)
    }

    #[must_use]
    pub fn swr_window(&self) -> Duration {
        Duration::from_secs(self.swr_window_seconds)
    }
}

impl GatewayConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // e.g. WEATHER_GATEWAY_CACHE__TTL_CURRENT_SECONDS=120
        builder = builder.add_source(
            Environment::with_prefix("WEATHER_GATEWAY")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let config: GatewayConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("weather-gateway").join("config.toml"))
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_cache()?;
        self.validate_http()?;
        self.validate_string_values()?;
        Ok(())
    }

    fn validate_cache(&self) -> Result<()> {
        if self.cache.ttl_current_seconds < 60 {
            return Err(GatewayError::config("Current weather TTL must be at least 60 seconds").into());
        }

        if self.cache.ttl_forecast_seconds < 60 {
            return Err(GatewayError::config("Forecast TTL must be at least 60 seconds").into());
        }

        if self.cache.capacity == 0 {
            return Err(GatewayError::config("Cache capacity must be at least 1").into());
        }

        Ok(())
    }

    fn validate_http(&self) -> Result<()> {
        if self.http.timeout_ms < 500 {
            return Err(GatewayError::config("Request timeout must be at least 500 ms").into());
        }

        if self.http.retry_attempts > 3 {
            return Err(GatewayError::config("Retry attempts cannot exceed 3").into());
        }

        if self.http.retry_min_jitter_ms > self.http.retry_max_jitter_ms {
            return Err(GatewayError::config(format!(
                "Minimum retry jitter ({} ms) cannot exceed maximum retry jitter ({} ms)",
                self.http.retry_min_jitter_ms, self.http.retry_max_jitter_ms
            ))
            .into());
        }

        if self.http.user_agent.trim().is_empty() {
            return Err(GatewayError::config("User agent cannot be empty").into());
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(GatewayError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(GatewayError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        for (name, url) in [
            ("open_meteo_base", &self.providers.open_meteo_base),
            ("met_no_base", &self.providers.met_no_base),
            ("geocoding_base", &self.providers.geocoding_base),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(GatewayError::config(format!(
                    "Provider URL '{name}' must be a valid HTTP or HTTPS URL"
                ))
                .into());
            }
        }

        Ok(())
    }
}
