use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use solarwatch::api::AppContext;
use solarwatch::auth::{CredentialVerifier, SessionKey, StaticCredentialVerifier};
use solarwatch::config::SolarwatchConfig;
use solarwatch::poller::{PollingController, StoreClient};
use solarwatch::state::DashboardState;
use solarwatch::store::SensorStore;
use solarwatch::weather::WeatherClient;
use solarwatch::web;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = SolarwatchConfig::load()?;
    let store = SensorStore::open(&config.store.location)?;

    let state = Arc::new(DashboardState::new());
    let weather = WeatherClient::new(&config.weather);
    let gateway = StoreClient::new(&config.poll.gateway_base_url);
    let poller = Arc::new(PollingController::new(
        Arc::clone(&state),
        gateway,
        weather,
        &config.poll,
    ));
    let verifier: Arc<dyn CredentialVerifier> =
        Arc::new(StaticCredentialVerifier::new(config.auth.users.clone()));
    let sessions = SessionKey::new(&config.auth.secret, config.auth.session_ttl_minutes);

    let ctx = AppContext {
        store,
        state,
        poller,
        verifier,
        sessions,
    };

    web::run(ctx, config.server.port).await
}
