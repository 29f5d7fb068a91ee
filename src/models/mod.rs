//! Data model types shared across the service

mod forecast;

pub use forecast::ForecastDay;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Epoch values at or above this are taken as milliseconds
const EPOCH_MILLIS_FLOOR: i64 = 1_000_000_000_000;

/// One instantaneous environmental reading published by the sensor.
///
/// Fields absent from the stored JSON default to 0, matching what the
/// device publishes while individual probes are still warming up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub temperature: f64,
    pub humidity: f64,
    pub pressure: f64,
    pub altitude: f64,
}

/// One historical reading, stamped by the store when it was written
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(rename = "serverTimestamp")]
    pub server_timestamp: Timestamp,
    pub environment: Snapshot,
}

/// A server timestamp as found in stored history: either an epoch number
/// (seconds or milliseconds) or a text datetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    Epoch(i64),
    Text(String),
}

impl Timestamp {
    /// Resolve to a UTC instant, or `None` when the value is unparseable
    #[must_use]
    pub fn instant(&self) -> Option<DateTime<Utc>> {
        match self {
            Timestamp::Epoch(n) if *n >= EPOCH_MILLIS_FLOOR => {
                Utc.timestamp_millis_opt(*n).single()
            }
            Timestamp::Epoch(n) => Utc.timestamp_opt(*n, 0).single(),
            Timestamp::Text(s) => DateTime::parse_from_rfc3339(s)
                .map(|t| t.with_timezone(&Utc))
                .ok()
                .or_else(|| {
                    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                        .map(|n| n.and_utc())
                        .ok()
                }),
        }
    }
}
