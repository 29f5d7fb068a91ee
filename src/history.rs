//! Reduction of history and live snapshots into chart-ready series.
//!
//! Two mutually exclusive paths feed the series: a full history from the
//! store is sorted and mapped wholesale, while a session with no stored
//! history accumulates a rolling window of live snapshots instead.

use chrono::{DateTime, Local, Timelike, Utc};
use serde::Serialize;

use crate::models::{HistoryEntry, Snapshot};

/// Capacity of the rolling window used when no stored history exists
pub const LIVE_WINDOW: usize = 20;

/// Label used for entries whose server timestamp cannot be parsed
const INVALID_TIME_LABEL: &str = "invalid time";

/// Parallel label/value sequences for the four measurement channels.
/// All arrays always have equal length.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub temperature: Vec<f64>,
    pub humidity: Vec<f64>,
    pub pressure: Vec<f64>,
    pub altitude: Vec<f64>,
}

impl ChartSeries {
    /// Builds a series from stored history, sorted ascending by server
    /// timestamp. Entries with unparseable timestamps sort first and keep
    /// their relative feed order. No length cap.
    #[must_use]
    pub fn from_history(entries: &[HistoryEntry]) -> Self {
        let mut sorted: Vec<&HistoryEntry> = entries.iter().collect();
        sorted.sort_by_key(|entry| {
            entry
                .server_timestamp
                .instant()
                .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
        });

        let mut series = Self::default();
        for entry in sorted {
            let label = entry
                .server_timestamp
                .instant()
                .map(|instant| format_time_label(&instant.with_timezone(&Local)))
                .unwrap_or_else(|| INVALID_TIME_LABEL.to_string());
            series.push(label, &entry.environment);
        }
        series
    }

    /// Appends one live snapshot and trims every array to the last
    /// [`LIVE_WINDOW`] points.
    pub fn push_live(&mut self, snapshot: &Snapshot, at: DateTime<Local>) {
        self.push(format_time_label(&at), snapshot);
        self.trim_to_window();
    }

    fn push(&mut self, label: String, snapshot: &Snapshot) {
        self.labels.push(label);
        self.temperature.push(snapshot.temperature);
        self.humidity.push(snapshot.humidity);
        self.pressure.push(snapshot.pressure);
        self.altitude.push(snapshot.altitude);
    }

    fn trim_to_window(&mut self) {
        let len = self.labels.len();
        if len <= LIVE_WINDOW {
            return;
        }
        let cut = len - LIVE_WINDOW;
        self.labels.drain(..cut);
        self.temperature.drain(..cut);
        self.humidity.drain(..cut);
        self.pressure.drain(..cut);
        self.altitude.drain(..cut);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Formats a wall-clock time as 12-hour civil time with an explicit
/// morning/noon/afternoon marker, e.g. `afternoon 01:05:09`.
pub fn format_time_label<T: Timelike>(at: &T) -> String {
    let hour = at.hour();
    let period = if hour >= 12 {
        if hour == 12 { "noon" } else { "afternoon" }
    } else {
        "morning"
    };
    let mut display_hour = hour % 12;
    if display_hour == 0 {
        display_hour = 12;
    }
    format!(
        "{period} {display_hour:02}:{:02}:{:02}",
        at.minute(),
        at.second()
    )
}
