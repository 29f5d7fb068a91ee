//! `Solarwatch` - headless monitoring service for an ESP32 environmental sensor
//!
//! This library provides the store gateway, the polling controller that keeps
//! the dashboard state fresh, and the forecast/history reduction logic.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod history;
pub mod models;
pub mod poller;
pub mod state;
pub mod store;
pub mod weather;
pub mod web;

// Re-export core types for public API
pub use api::AppContext;
pub use auth::{CredentialVerifier, SessionClaims, SessionKey, StaticCredentialVerifier};
pub use config::SolarwatchConfig;
pub use error::SolarwatchError;
pub use history::ChartSeries;
pub use models::{ForecastDay, HistoryEntry, Snapshot};
pub use poller::{PollingController, ScheduledTask, StoreClient};
pub use state::{DashboardState, DashboardView};
pub use store::SensorStore;
pub use weather::WeatherClient;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, SolarwatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
