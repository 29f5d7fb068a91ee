//! Credential verification and signed session tokens.
//!
//! Login is a pluggable [`CredentialVerifier`]; successful logins receive an
//! HMAC-SHA256-signed token whose signature and expiry are checked on every
//! protected operation, not merely its presence.

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use rand::RngExt;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::Result;
use crate::error::SolarwatchError;

type HmacSha256 = Hmac<Sha256>;

/// Verifies a username/password pair at login
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify(&self, username: &str, password: &str) -> bool;
}

/// One configured login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserCredential {
    pub username: String,
    pub password: String,
}

/// Config-backed verifier over a fixed set of users
pub struct StaticCredentialVerifier {
    users: Vec<UserCredential>,
}

impl StaticCredentialVerifier {
    #[must_use]
    pub fn new(users: Vec<UserCredential>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl CredentialVerifier for StaticCredentialVerifier {
    async fn verify(&self, username: &str, password: &str) -> bool {
        self.users.iter().any(|user| {
            user.username == username
                && constant_time_eq(user.password.as_bytes(), password.as_bytes())
        })
    }
}

/// Claims carried inside a session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Username the session belongs to
    pub sub: String,
    /// Issued-at, epoch seconds
    pub iat: i64,
    /// Expiry, epoch seconds
    pub exp: i64,
    /// Random token id, keeps two same-second logins distinct
    pub jti: u64,
}

/// Issues and verifies signed session tokens.
///
/// Token format: `base64(claims JSON).base64(HMAC-SHA256 signature)`.
#[derive(Clone)]
pub struct SessionKey {
    secret: Vec<u8>,
    ttl: Duration,
}

impl SessionKey {
    #[must_use]
    pub fn new(secret: &str, ttl_minutes: u32) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
            ttl: Duration::minutes(i64::from(ttl_minutes)),
        }
    }

    /// Issues a fresh token for `username`
    pub fn issue(&self, username: &str) -> Result<String> {
        let now = Utc::now();
        let claims = SessionClaims {
            sub: username.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
            jti: rand::rng().random(),
        };
        let payload = BASE64.encode(
            serde_json::to_vec(&claims)
                .map_err(|e| SolarwatchError::auth(format!("Failed to encode claims: {e}")))?,
        );
        let signature = BASE64.encode(self.sign(payload.as_bytes()));
        Ok(format!("{payload}.{signature}"))
    }

    /// Verifies signature and expiry, returning the claims on success
    pub fn verify(&self, token: &str) -> Result<SessionClaims> {
        let (payload, signature) = token
            .split_once('.')
            .ok_or_else(|| SolarwatchError::auth("Malformed session token"))?;

        let signature = BASE64
            .decode(signature)
            .map_err(|_| SolarwatchError::auth("Malformed session token"))?;

        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .expect("HMAC can take key of any size");
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| SolarwatchError::auth("Invalid session signature"))?;

        let claims_bytes = BASE64
            .decode(payload)
            .map_err(|_| SolarwatchError::auth("Malformed session token"))?;
        let claims: SessionClaims = serde_json::from_slice(&claims_bytes)
            .map_err(|_| SolarwatchError::auth("Malformed session claims"))?;

        if claims.exp <= Utc::now().timestamp() {
            return Err(SolarwatchError::auth("Session expired"));
        }

        Ok(claims)
    }

    fn sign(&self, message: &[u8]) -> Vec<u8> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .expect("HMAC can take key of any size");
        mac.update(message);
        mac.finalize().into_bytes().to_vec()
    }
}

/// Constant-time comparison
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
