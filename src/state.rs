//! Dashboard state owned by the polling controller.
//!
//! All shared mutable state lives here, mutated only through the update
//! methods below from poller completions. Readers get a cloned
//! [`DashboardView`] projection. Interleaved completions apply
//! last-completion-wins; no cross-channel mutual exclusion is attempted.

use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::history::ChartSeries;
use crate::models::{ForecastDay, HistoryEntry, Snapshot};

#[derive(Debug, Default)]
struct Inner {
    snapshot: Snapshot,
    connected: bool,
    series: ChartSeries,
    has_history: bool,
    history_loading: bool,
    history_error: Option<String>,
    forecast: Vec<ForecastDay>,
    weather_error: Option<String>,
    last_update: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
pub struct DashboardState {
    inner: RwLock<Inner>,
}

/// Read-only projection of the dashboard state
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub environment: Snapshot,
    pub is_connected: bool,
    pub series: ChartSeries,
    pub has_history: bool,
    pub is_loading_history: bool,
    pub history_error: Option<String>,
    pub forecast: Vec<ForecastDay>,
    pub weather_error: Option<String>,
    pub last_update: Option<DateTime<Utc>>,
}

impl DashboardState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a freshly read snapshot. While no stored history is loaded,
    /// the snapshot also becomes one point of the rolling chart window.
    pub async fn apply_snapshot(&self, snapshot: Snapshot, at: DateTime<Local>) {
        let mut inner = self.inner.write().await;
        if !inner.has_history {
            inner.series.push_live(&snapshot, at);
        }
        inner.snapshot = snapshot;
        inner.connected = true;
        inner.last_update = Some(at.with_timezone(&Utc));
    }

    /// Marks the sensor channel as unreachable
    pub async fn set_disconnected(&self) {
        self.inner.write().await.connected = false;
    }

    pub async fn set_history_loading(&self) {
        let mut inner = self.inner.write().await;
        inner.history_loading = true;
        inner.history_error = None;
    }

    /// Applies a history read. A non-empty history replaces any rolling live
    /// points wholesale; an empty one hands the series back to live appends.
    pub async fn apply_history(&self, entries: &[HistoryEntry]) {
        let mut inner = self.inner.write().await;
        inner.history_loading = false;
        inner.history_error = None;
        if entries.is_empty() {
            inner.has_history = false;
        } else {
            inner.series = ChartSeries::from_history(entries);
            inner.has_history = true;
        }
    }

    pub async fn set_history_error(&self, message: String) {
        let mut inner = self.inner.write().await;
        inner.history_loading = false;
        inner.history_error = Some(message);
    }

    /// Replaces the forecast; clears any previous forecast error
    pub async fn apply_forecast(&self, days: Vec<ForecastDay>) {
        let mut inner = self.inner.write().await;
        inner.forecast = days;
        inner.weather_error = None;
    }

    /// Records a forecast failure, leaving the prior forecast untouched
    pub async fn set_weather_error(&self, message: String) {
        self.inner.write().await.weather_error = Some(message);
    }

    pub async fn view(&self) -> DashboardView {
        let inner = self.inner.read().await;
        DashboardView {
            environment: inner.snapshot,
            is_connected: inner.connected,
            series: inner.series.clone(),
            has_history: inner.has_history,
            is_loading_history: inner.history_loading,
            history_error: inner.history_error.clone(),
            forecast: inner.forecast.clone(),
            weather_error: inner.weather_error.clone(),
            last_update: inner.last_update,
        }
    }
}
