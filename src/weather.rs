//! OpenWeatherMap forecast client and midday reduction.
//!
//! The upstream feed delivers 5 days of 3-hour entries; the dashboard only
//! wants one representative sample per day, taken at the midday slot.

use anyhow::{Context, Result};
use tracing::instrument;

use crate::config::WeatherConfig;
use crate::error::SolarwatchError;
use crate::models::ForecastDay;

/// The single 3-hour timestamp per day used to represent that day
pub const MIDDAY_SLOT: &str = "12:00:00";

/// Number of distinct calendar days kept from the feed
pub const FORECAST_DAYS: usize = 5;

/// HTTP client for the 5-day/3-hour forecast feed
#[derive(Clone)]
pub struct WeatherClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    latitude: f64,
    longitude: f64,
}

impl WeatherClient {
    #[must_use]
    pub fn new(config: &WeatherConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            latitude: config.latitude,
            longitude: config.longitude,
        }
    }

    /// Fetches the raw 3-hour forecast list for the configured coordinates.
    #[instrument(skip(self))]
    pub async fn fetch_forecast(&self) -> Result<Vec<openweather::ForecastEntry>> {
        let url = format!("{}/data/2.5/forecast", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("lat", self.latitude.to_string()),
                ("lon", self.longitude.to_string()),
                ("units", "metric".to_string()),
                ("appid", self.api_key.clone()),
            ])
            .send()
            .await
            .with_context(|| "Forecast request failed")?;

        let status = response.status();
        if !status.is_success() {
            return Err(
                SolarwatchError::upstream(format!("Forecast feed returned {status}")).into(),
            );
        }

        let feed: openweather::ForecastResponse = response
            .json()
            .await
            .with_context(|| "Failed to parse forecast feed")?;

        tracing::debug!(entries = feed.list.len(), "forecast feed fetched");
        Ok(feed.list)
    }
}

/// Reduces a 3-hour feed to at most [`FORECAST_DAYS`] midday samples, one per
/// calendar date, in feed order. The first midday entry per date wins.
#[must_use]
pub fn reduce_daily(entries: &[openweather::ForecastEntry]) -> Vec<ForecastDay> {
    let mut seen_dates: Vec<&str> = Vec::with_capacity(FORECAST_DAYS);
    let mut days = Vec::with_capacity(FORECAST_DAYS);

    for entry in entries {
        if !entry.dt_txt.ends_with(MIDDAY_SLOT) {
            continue;
        }
        let date = entry.dt_txt.split(' ').next().unwrap_or_default();
        if seen_dates.contains(&date) {
            continue;
        }
        seen_dates.push(date);
        days.push(ForecastDay {
            dt: entry.dt,
            temp: entry.main.temp,
            min_temp: entry.main.temp_min,
            max_temp: entry.main.temp_max,
            pop: pop_percent(entry.pop),
            weather_main: entry
                .weather
                .first()
                .map(|w| w.main.clone())
                .unwrap_or_default(),
        });
        if days.len() == FORECAST_DAYS {
            break;
        }
    }
    days
}

/// Converts a precipitation-probability fraction to an integer percentage,
/// rounding half away from zero. The feed carries at most three decimals, so
/// the fraction is snapped to a tenth of a percent first; a raw multiply
/// would leave 0.555 fractionally below 55.5.
fn pop_percent(fraction: f64) -> u8 {
    let tenths = (fraction * 1000.0).round();
    (tenths / 10.0).round().clamp(0.0, 100.0) as u8
}

/// `OpenWeatherMap` 5-day/3-hour forecast response structures
pub mod openweather {
    use serde::Deserialize;

    /// Forecast response, a flat list of 3-hour entries
    #[derive(Debug, Deserialize)]
    pub struct ForecastResponse {
        #[serde(default)]
        pub list: Vec<ForecastEntry>,
    }

    /// One 3-hour forecast entry
    #[derive(Debug, Clone, Deserialize)]
    pub struct ForecastEntry {
        /// Epoch seconds
        pub dt: i64,
        /// Text timestamp, e.g. "2025-06-12 12:00:00"
        pub dt_txt: String,
        pub main: MainReadings,
        /// Precipitation probability as a 0-1 fraction
        #[serde(default)]
        pub pop: f64,
        #[serde(default)]
        pub weather: Vec<WeatherCondition>,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct MainReadings {
        pub temp: f64,
        pub temp_min: f64,
        pub temp_max: f64,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct WeatherCondition {
        pub main: String,
    }
}
