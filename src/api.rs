//! HTTP surface: the store gateway plus session and dashboard routes

use std::sync::Arc;

use axum::{
    Router,
    extract::{Query, State},
    http::{HeaderMap, header},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::auth::{CredentialVerifier, SessionClaims, SessionKey};
use crate::error::SolarwatchError;
use crate::poller::PollingController;
use crate::state::{DashboardState, DashboardView};
use crate::store::SensorStore;

/// Shared handler context
#[derive(Clone)]
pub struct AppContext {
    pub store: SensorStore,
    pub state: Arc<DashboardState>,
    pub poller: Arc<PollingController>,
    pub verifier: Arc<dyn CredentialVerifier>,
    pub sessions: SessionKey,
}

pub fn router(ctx: AppContext) -> Router {
    Router::new()
        .route("/read", get(read_key))
        .route("/write", post(write_key))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/dashboard", get(dashboard))
        .route("/history/refresh", post(refresh_history))
        .with_state(ctx)
}

#[derive(Deserialize)]
struct ReadParams {
    key: Option<String>,
}

/// `GET /api/read?key=<string>` - returns the raw stored JSON string
async fn read_key(
    State(ctx): State<AppContext>,
    Query(params): Query<ReadParams>,
) -> Result<Response, SolarwatchError> {
    let key = params
        .key
        .filter(|key| !key.is_empty())
        .ok_or_else(|| SolarwatchError::missing_parameter("key"))?;

    let stored = ctx
        .store
        .get(&key)
        .await
        .map_err(SolarwatchError::store)?
        .ok_or_else(|| SolarwatchError::not_found(key.as_str()))?;

    Ok(([(header::CONTENT_TYPE, "application/json")], stored).into_response())
}

#[derive(Serialize)]
struct WriteAck {
    success: bool,
}

/// `POST /api/write` with body `{key, value}` - serializes `value` and
/// stores it under `key`. Last write wins.
async fn write_key(
    State(ctx): State<AppContext>,
    body: String,
) -> Result<Json<WriteAck>, SolarwatchError> {
    let body: Value = serde_json::from_str(&body)
        .map_err(|_| SolarwatchError::invalid_body("Invalid JSON body"))?;

    let key = body
        .get("key")
        .and_then(Value::as_str)
        .filter(|key| !key.is_empty())
        .ok_or_else(|| SolarwatchError::invalid_body("Missing key or value"))?;
    let value = body
        .get("value")
        .ok_or_else(|| SolarwatchError::invalid_body("Missing key or value"))?;

    ctx.store
        .put(key, &value.to_string())
        .await
        .map_err(SolarwatchError::store)?;

    Ok(Json(WriteAck { success: true }))
}

#[derive(Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Serialize)]
struct LoginResponse {
    success: bool,
    token: String,
    username: String,
}

/// `POST /api/login` - verifies credentials, issues a session token and
/// starts the polling controller
async fn login(
    State(ctx): State<AppContext>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, SolarwatchError> {
    if !ctx
        .verifier
        .verify(&request.username, &request.password)
        .await
    {
        return Err(SolarwatchError::auth("Invalid username or password"));
    }

    let token = ctx.sessions.issue(&request.username)?;
    ctx.poller.start().await;
    tracing::info!(username = %request.username, "login");

    Ok(Json(LoginResponse {
        success: true,
        token,
        username: request.username,
    }))
}

#[derive(Serialize)]
struct LogoutResponse {
    success: bool,
}

/// `POST /api/logout` - stops the polling controller
async fn logout(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
) -> Result<Json<LogoutResponse>, SolarwatchError> {
    let claims = bearer_claims(&ctx, &headers)?;
    ctx.poller.stop().await;
    tracing::info!(username = %claims.sub, "logout");
    Ok(Json(LogoutResponse { success: true }))
}

/// `GET /api/dashboard` - read-only projection of the dashboard state
async fn dashboard(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
) -> Result<Json<DashboardView>, SolarwatchError> {
    bearer_claims(&ctx, &headers)?;
    Ok(Json(ctx.state.view().await))
}

/// `POST /api/history/refresh` - manual one-shot history refetch
async fn refresh_history(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
) -> Result<Json<DashboardView>, SolarwatchError> {
    bearer_claims(&ctx, &headers)?;
    ctx.poller.refresh_history().await;
    Ok(Json(ctx.state.view().await))
}

/// Extracts and verifies the bearer token; expiry and signature are checked
/// on every call
fn bearer_claims(ctx: &AppContext, headers: &HeaderMap) -> Result<SessionClaims, SolarwatchError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| SolarwatchError::auth("Missing bearer token"))?;
    ctx.sessions.verify(token)
}
