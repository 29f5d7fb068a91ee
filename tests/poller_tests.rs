//! Polling controller tests against a live loopback gateway

use std::sync::Arc;

use axum::Router;
use tempfile::TempDir;

use solarwatch::api::{self, AppContext};
use solarwatch::auth::{CredentialVerifier, SessionKey, StaticCredentialVerifier};
use solarwatch::config::{PollConfig, WeatherConfig};
use solarwatch::poller::{PollingController, StoreClient};
use solarwatch::state::DashboardState;
use solarwatch::store::SensorStore;
use solarwatch::weather::WeatherClient;

const DEAD_UPSTREAM: &str = "http://127.0.0.1:9";

fn weather_client(base_url: &str) -> WeatherClient {
    WeatherClient::new(&WeatherConfig {
        api_key: "test-api-key".to_string(),
        base_url: base_url.to_string(),
        latitude: 24.99,
        longitude: 121.30,
    })
}

/// Serves the gateway on an ephemeral loopback port and returns its base URL
/// together with a handle on the backing store.
async fn spawn_gateway(temp_dir: &TempDir) -> (String, SensorStore) {
    let store = SensorStore::open(temp_dir.path()).unwrap();
    let state = Arc::new(DashboardState::new());
    let poll = PollConfig {
        gateway_base_url: DEAD_UPSTREAM.to_string(),
        ..PollConfig::default()
    };
    let poller = Arc::new(PollingController::new(
        Arc::clone(&state),
        StoreClient::new(&poll.gateway_base_url),
        weather_client(DEAD_UPSTREAM),
        &poll,
    ));
    let verifier: Arc<dyn CredentialVerifier> =
        Arc::new(StaticCredentialVerifier::new(Vec::new()));
    let ctx = AppContext {
        store: store.clone(),
        state,
        poller,
        verifier,
        sessions: SessionKey::new("0123456789abcdef", 30),
    };

    let app = Router::new().nest("/api", api::router(ctx));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), store)
}

fn controller(state: Arc<DashboardState>, gateway_url: &str) -> PollingController {
    let poll = PollConfig {
        gateway_base_url: gateway_url.to_string(),
        ..PollConfig::default()
    };
    PollingController::new(
        state,
        StoreClient::new(&poll.gateway_base_url),
        weather_client(DEAD_UPSTREAM),
        &poll,
    )
}

#[tokio::test]
async fn test_refresh_snapshot_applies_stored_reading() {
    let temp_dir = TempDir::new().unwrap();
    let (gateway_url, store) = spawn_gateway(&temp_dir).await;
    store
        .put("sensor1", r#"{"temperature":25.3,"humidity":60}"#)
        .await
        .unwrap();

    let state = Arc::new(DashboardState::new());
    let controller = controller(Arc::clone(&state), &gateway_url);
    controller.refresh_snapshot().await;

    let view = state.view().await;
    assert!(view.is_connected);
    assert_eq!(view.environment.temperature, 25.3);
    assert_eq!(view.environment.humidity, 60.0);
    // Missing channels default to zero
    assert_eq!(view.environment.pressure, 0.0);
    // With no stored history the snapshot became a rolling chart point
    assert_eq!(view.series.len(), 1);
}

#[tokio::test]
async fn test_refresh_snapshot_with_no_data_yet_is_silent() {
    let temp_dir = TempDir::new().unwrap();
    let (gateway_url, _store) = spawn_gateway(&temp_dir).await;

    let state = Arc::new(DashboardState::new());
    let controller = controller(Arc::clone(&state), &gateway_url);
    controller.refresh_snapshot().await;

    let view = state.view().await;
    assert!(!view.is_connected);
    assert!(view.series.is_empty());
}

#[tokio::test]
async fn test_refresh_snapshot_transport_failure_disconnects() {
    let state = Arc::new(DashboardState::new());
    let controller = controller(Arc::clone(&state), DEAD_UPSTREAM);

    // Pretend the device had been seen before
    state
        .apply_snapshot(
            solarwatch::Snapshot {
                temperature: 20.0,
                ..solarwatch::Snapshot::default()
            },
            chrono::Local::now(),
        )
        .await;
    assert!(state.view().await.is_connected);

    controller.refresh_snapshot().await;
    assert!(!state.view().await.is_connected);
}

#[tokio::test]
async fn test_refresh_history_builds_sorted_series() {
    let temp_dir = TempDir::new().unwrap();
    let (gateway_url, store) = spawn_gateway(&temp_dir).await;
    store
        .put(
            "sensorHistory",
            r#"[
                {"serverTimestamp":300,"environment":{"temperature":3.0}},
                {"serverTimestamp":100,"environment":{"temperature":1.0}},
                {"serverTimestamp":200,"environment":{"temperature":2.0}}
            ]"#,
        )
        .await
        .unwrap();

    let state = Arc::new(DashboardState::new());
    let controller = controller(Arc::clone(&state), &gateway_url);
    controller.refresh_history().await;

    let view = state.view().await;
    assert!(view.has_history);
    assert!(view.history_error.is_none());
    assert_eq!(view.series.temperature, vec![1.0, 2.0, 3.0]);
}

#[tokio::test]
async fn test_refresh_history_missing_key_is_empty_history() {
    let temp_dir = TempDir::new().unwrap();
    let (gateway_url, _store) = spawn_gateway(&temp_dir).await;

    let state = Arc::new(DashboardState::new());
    let controller = controller(Arc::clone(&state), &gateway_url);
    controller.refresh_history().await;

    let view = state.view().await;
    assert!(!view.has_history);
    assert!(view.history_error.is_none());
    assert!(!view.is_loading_history);
}

#[tokio::test]
async fn test_refresh_history_transport_failure_sets_channel_error() {
    let state = Arc::new(DashboardState::new());
    let controller = controller(Arc::clone(&state), DEAD_UPSTREAM);
    controller.refresh_history().await;

    let view = state.view().await;
    assert!(view.history_error.is_some());
    assert!(!view.is_loading_history);
}

#[tokio::test]
async fn test_refresh_forecast_failure_sets_weather_error_only() {
    let state = Arc::new(DashboardState::new());
    let controller = controller(Arc::clone(&state), DEAD_UPSTREAM);
    controller.refresh_forecast().await;

    let view = state.view().await;
    assert!(view.weather_error.is_some());
    assert!(view.forecast.is_empty());
    assert!(view.history_error.is_none());
}

#[tokio::test]
async fn test_start_is_idempotent_and_stop_rearms() {
    let temp_dir = TempDir::new().unwrap();
    let (gateway_url, _store) = spawn_gateway(&temp_dir).await;

    let state = Arc::new(DashboardState::new());
    let controller = Arc::new(controller(Arc::clone(&state), &gateway_url));

    controller.start().await;
    controller.start().await;
    assert!(controller.is_running().await);

    controller.stop().await;
    assert!(!controller.is_running().await);

    controller.start().await;
    assert!(controller.is_running().await);
    controller.stop().await;
}
