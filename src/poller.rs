//! Polling controller: timer-driven refresh of snapshot, history and
//! forecast while a session is active.
//!
//! Cancellation is cooperative. A canceled task fires no further ticks, but a
//! fetch already dispatched runs to completion and may still apply stale data
//! (accepted race). No retry and no backoff; a failed fetch waits for the
//! next tick.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use serde::de::DeserializeOwned;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::instrument;

use crate::config::PollConfig;
use crate::error::SolarwatchError;
use crate::models::{HistoryEntry, Snapshot};
use crate::state::DashboardState;
use crate::weather::{self, WeatherClient};

/// A periodically scheduled task with an immediate first tick.
///
/// [`cancel`](Self::cancel) guarantees that no further tick is dispatched
/// after it returns; work already dispatched is not aborted.
pub struct ScheduledTask {
    cancel: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl ScheduledTask {
    pub fn spawn<F, Fut>(name: &'static str, period: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (cancel, mut cancelled) = watch::channel(false);
        let handle = tokio::spawn(async move {
            let mut timer = tokio::time::interval(period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = cancelled.changed() => break,
                    _ = timer.tick() => tick().await,
                }
            }
            tracing::debug!(task = name, "scheduled task stopped");
        });
        Self { cancel, handle }
    }

    /// Stops future ticks. In-flight work completes on its own.
    pub fn cancel(&self) {
        let _ = self.cancel.send(true);
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// HTTP client for the store gateway's read surface
#[derive(Clone)]
pub struct StoreClient {
    client: reqwest::Client,
    base_url: String,
}

impl StoreClient {
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Reads `key` and decodes the stored JSON string.
    /// Returns `None` when the key does not exist yet.
    #[instrument(skip(self))]
    pub async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let url = format!("{}/api/read", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("key", key)])
            .send()
            .await
            .with_context(|| format!("Store read for {key} failed"))?;

        let status = response.status();
        if status.as_u16() == 404 {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(
                SolarwatchError::upstream(format!("Store read for {key} returned {status}"))
                    .into(),
            );
        }

        let value = response
            .json()
            .await
            .with_context(|| format!("Failed to decode stored value for {key}"))?;
        Ok(Some(value))
    }
}

struct Timers {
    snapshot: ScheduledTask,
    forecast: ScheduledTask,
}

/// Owns the refresh timers and drives all dashboard state mutations
pub struct PollingController {
    state: Arc<DashboardState>,
    store: StoreClient,
    weather: WeatherClient,
    snapshot_period: Duration,
    forecast_period: Duration,
    snapshot_key: String,
    history_key: String,
    timers: Mutex<Option<Timers>>,
}

impl PollingController {
    #[must_use]
    pub fn new(
        state: Arc<DashboardState>,
        store: StoreClient,
        weather: WeatherClient,
        config: &PollConfig,
    ) -> Self {
        Self {
            state,
            store,
            weather,
            snapshot_period: Duration::from_secs(config.snapshot_interval_secs),
            forecast_period: Duration::from_secs(config.forecast_interval_secs),
            snapshot_key: config.snapshot_key.clone(),
            history_key: config.history_key.clone(),
            timers: Mutex::new(None),
        }
    }

    /// Whether the refresh timers are currently armed
    pub async fn is_running(&self) -> bool {
        self.timers.lock().await.is_some()
    }

    /// Arms the timers: an immediate snapshot/history/forecast fetch, then a
    /// snapshot tick every 30 s and a forecast tick every 10 min (as
    /// configured). A no-op while already running.
    pub async fn start(self: &Arc<Self>) {
        let mut timers = self.timers.lock().await;
        if timers.is_some() {
            return;
        }

        // History is loaded once per session; the button-style manual path
        // stays available through refresh_history().
        let controller = Arc::clone(self);
        tokio::spawn(async move {
            controller.refresh_history().await;
        });

        let controller = Arc::clone(self);
        let snapshot = ScheduledTask::spawn("snapshot", self.snapshot_period, move || {
            let controller = Arc::clone(&controller);
            async move {
                controller.refresh_snapshot().await;
            }
        });

        let controller = Arc::clone(self);
        let forecast = ScheduledTask::spawn("forecast", self.forecast_period, move || {
            let controller = Arc::clone(&controller);
            async move {
                controller.refresh_forecast().await;
            }
        });

        *timers = Some(Timers { snapshot, forecast });
        tracing::info!("polling started");
    }

    /// Cancels both timers. In-flight fetches complete and may still apply
    /// their result.
    pub async fn stop(&self) {
        if let Some(timers) = self.timers.lock().await.take() {
            timers.snapshot.cancel();
            timers.forecast.cancel();
            tracing::info!("polling stopped");
        }
    }

    /// Reads the latest snapshot through the gateway. A missing key means
    /// the device has not published yet and is ignored.
    pub async fn refresh_snapshot(&self) {
        match self.store.read_json::<Snapshot>(&self.snapshot_key).await {
            Ok(Some(snapshot)) => {
                self.state.apply_snapshot(snapshot, Local::now()).await;
            }
            Ok(None) => {
                tracing::debug!(key = %self.snapshot_key, "no sensor data yet");
            }
            Err(err) => {
                tracing::warn!(error = %err, "snapshot fetch failed");
                self.state.set_disconnected().await;
            }
        }
    }

    /// Reads stored history through the gateway. A missing key is an empty
    /// history.
    pub async fn refresh_history(&self) {
        self.state.set_history_loading().await;
        match self
            .store
            .read_json::<Vec<HistoryEntry>>(&self.history_key)
            .await
        {
            Ok(Some(entries)) => self.state.apply_history(&entries).await,
            Ok(None) => self.state.apply_history(&[]).await,
            Err(err) => {
                tracing::warn!(error = %err, "history fetch failed");
                self.state.set_history_error(err.to_string()).await;
            }
        }
    }

    /// Fetches the forecast feed and applies the midday reduction
    pub async fn refresh_forecast(&self) {
        match self.weather.fetch_forecast().await {
            Ok(entries) => {
                self.state
                    .apply_forecast(weather::reduce_daily(&entries))
                    .await;
            }
            Err(err) => {
                tracing::warn!(error = %err, "forecast fetch failed");
                self.state.set_weather_error(err.to_string()).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_scheduled_task_ticks_immediately_then_periodically() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let task = ScheduledTask::spawn("tick", Duration::from_secs(30), move || {
            let seen = Arc::clone(&seen);
            async move {
                seen.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_secs(95)).await;
        // Immediate first tick plus three 30 s periods
        assert_eq!(count.load(Ordering::SeqCst), 4);
        task.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_future_ticks() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let task = ScheduledTask::spawn("tick", Duration::from_secs(30), move || {
            let seen = Arc::clone(&seen);
            async move {
                seen.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_secs(35)).await;
        let before = count.load(Ordering::SeqCst);
        task.cancel();

        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(count.load(Ordering::SeqCst), before);
        assert!(task.is_finished());
    }
}
