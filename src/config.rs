//! Configuration management for the `Solarwatch` service
//!
//! Handles loading configuration from an optional TOML file and environment
//! variables, and provides validation for all configuration settings.

use crate::SolarwatchError;
use crate::auth::UserCredential;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure for the `Solarwatch` service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolarwatchConfig {
    /// Gateway HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Key-value store configuration
    #[serde(default)]
    pub store: StoreConfig,
    /// Forecast feed configuration
    pub weather: WeatherConfig,
    /// Polling controller configuration
    #[serde(default)]
    pub poll: PollConfig,
    /// Login and session configuration
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Port the gateway listens on
    #[serde(default = "default_server_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store directory location
    #[serde(default = "default_store_location")]
    pub location: String,
}

/// Forecast feed configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// OpenWeatherMap API key
    pub api_key: String,
    /// Base URL for the forecast feed
    #[serde(default = "default_weather_base_url")]
    pub base_url: String,
    /// Latitude of the monitored site
    pub latitude: f64,
    /// Longitude of the monitored site
    pub longitude: f64,
}

/// Polling controller settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    /// Seconds between snapshot refreshes
    #[serde(default = "default_snapshot_interval")]
    pub snapshot_interval_secs: u64,
    /// Seconds between forecast refreshes
    #[serde(default = "default_forecast_interval")]
    pub forecast_interval_secs: u64,
    /// Base URL of the store gateway the poller reads through
    #[serde(default = "default_gateway_base_url")]
    pub gateway_base_url: String,
    /// Store key holding the latest snapshot
    #[serde(default = "default_snapshot_key")]
    pub snapshot_key: String,
    /// Store key holding the history array
    #[serde(default = "default_history_key")]
    pub history_key: String,
}

/// Login and session settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Secret used to sign session tokens
    pub secret: String,
    /// Minutes a session token stays valid
    #[serde(default = "default_session_ttl")]
    pub session_ttl_minutes: u32,
    /// Accepted logins
    #[serde(default)]
    pub users: Vec<UserCredential>,
}

// Default value functions
fn default_server_port() -> u16 {
    8080
}

fn default_store_location() -> String {
    "solarwatch-data".to_string()
}

fn default_weather_base_url() -> String {
    "https://api.openweathermap.org".to_string()
}

fn default_snapshot_interval() -> u64 {
    30
}

fn default_forecast_interval() -> u64 {
    600
}

fn default_gateway_base_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_snapshot_key() -> String {
    "sensor1".to_string()
}

fn default_history_key() -> String {
    "sensorHistory".to_string()
}

fn default_session_ttl() -> u32 {
    720
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_server_port(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            location: default_store_location(),
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            snapshot_interval_secs: default_snapshot_interval(),
            forecast_interval_secs: default_forecast_interval(),
            gateway_base_url: default_gateway_base_url(),
            snapshot_key: default_snapshot_key(),
            history_key: default_history_key(),
        }
    }
}

impl SolarwatchConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from a specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| PathBuf::from("solarwatch.toml"));
        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file)
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // Environment overrides, e.g. SOLARWATCH_WEATHER__API_KEY
        builder = builder.add_source(
            Environment::with_prefix("SOLARWATCH")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let config: SolarwatchConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(SolarwatchError::config("Server port cannot be 0").into());
        }

        if self.weather.api_key.is_empty() {
            return Err(SolarwatchError::config("Weather API key cannot be empty").into());
        }

        if !(-90.0..=90.0).contains(&self.weather.latitude) {
            return Err(
                SolarwatchError::config("Latitude must be between -90 and 90 degrees").into(),
            );
        }

        if !(-180.0..=180.0).contains(&self.weather.longitude) {
            return Err(
                SolarwatchError::config("Longitude must be between -180 and 180 degrees").into(),
            );
        }

        if self.poll.snapshot_interval_secs == 0 || self.poll.forecast_interval_secs == 0 {
            return Err(SolarwatchError::config("Poll intervals must be at least 1 second").into());
        }

        if self.auth.secret.len() < 16 {
            return Err(
                SolarwatchError::config("Auth secret must be at least 16 characters").into(),
            );
        }

        if self.auth.session_ttl_minutes == 0 {
            return Err(SolarwatchError::config("Session TTL cannot be 0").into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> SolarwatchConfig {
        SolarwatchConfig {
            server: ServerConfig::default(),
            store: StoreConfig::default(),
            weather: WeatherConfig {
                api_key: "test-api-key".to_string(),
                base_url: default_weather_base_url(),
                latitude: 24.99,
                longitude: 121.30,
            },
            poll: PollConfig::default(),
            auth: AuthConfig {
                secret: "0123456789abcdef".to_string(),
                session_ttl_minutes: default_session_ttl(),
                users: Vec::new(),
            },
        }
    }

    #[test]
    fn test_defaults() {
        let config = valid_config();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.poll.snapshot_interval_secs, 30);
        assert_eq!(config.poll.forecast_interval_secs, 600);
        assert_eq!(config.poll.snapshot_key, "sensor1");
        assert_eq!(config.poll.history_key, "sensorHistory");
    }

    #[test]
    fn test_valid_config_passes_validation() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_empty_api_key_fails_validation() {
        let mut config = valid_config();
        config.weather.api_key = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_out_of_range_coordinates_fail_validation() {
        let mut config = valid_config();
        config.weather.latitude = 91.0;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.weather.longitude = -181.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_short_secret_fails_validation() {
        let mut config = valid_config();
        config.auth.secret = "short".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_interval_fails_validation() {
        let mut config = valid_config();
        config.poll.snapshot_interval_secs = 0;
        assert!(config.validate().is_err());
    }
}
