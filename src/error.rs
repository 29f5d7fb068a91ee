//! Error types and handling for the `Solarwatch` service

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Main error type for the `Solarwatch` service
#[derive(Error, Debug)]
pub enum SolarwatchError {
    /// A required request parameter was absent
    #[error("Missing {name}")]
    MissingParameter { name: String },

    /// The requested key does not exist in the store
    #[error("Key not found")]
    NotFound { key: String },

    /// The request body could not be used as submitted
    #[error("{message}")]
    InvalidBody { message: String },

    /// The store or an upstream feed answered with a failure
    #[error("{message}")]
    Upstream { message: String },

    /// Credential mismatch or an unusable session token
    #[error("{message}")]
    Auth { message: String },

    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Store operation errors
    #[error("Store error: {message}")]
    Store { message: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl SolarwatchError {
    /// Create a new missing-parameter error
    pub fn missing_parameter<S: Into<String>>(name: S) -> Self {
        Self::MissingParameter { name: name.into() }
    }

    /// Create a new not-found error for a store key
    pub fn not_found<S: Into<String>>(key: S) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Create a new invalid-body error
    pub fn invalid_body<S: Into<String>>(message: S) -> Self {
        Self::InvalidBody {
            message: message.into(),
        }
    }

    /// Create a new upstream error
    pub fn upstream<S: Into<String>>(message: S) -> Self {
        Self::Upstream {
            message: message.into(),
        }
    }

    /// Create a new auth error
    pub fn auth<S: Into<String>>(message: S) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new store error from any displayable source
    pub fn store<E: std::fmt::Display>(err: E) -> Self {
        Self::Store {
            message: err.to_string(),
        }
    }

    /// HTTP status this error maps to at the gateway boundary
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            SolarwatchError::MissingParameter { .. } | SolarwatchError::InvalidBody { .. } => {
                StatusCode::BAD_REQUEST
            }
            SolarwatchError::NotFound { .. } => StatusCode::NOT_FOUND,
            SolarwatchError::Auth { .. } => StatusCode::UNAUTHORIZED,
            SolarwatchError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            SolarwatchError::Config { .. }
            | SolarwatchError::Store { .. }
            | SolarwatchError::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for SolarwatchError {
    fn into_response(self) -> Response {
        if let SolarwatchError::NotFound { key } = &self {
            tracing::debug!(%key, "read miss");
        }
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let missing = SolarwatchError::missing_parameter("key");
        assert!(matches!(missing, SolarwatchError::MissingParameter { .. }));

        let auth = SolarwatchError::auth("invalid username or password");
        assert!(matches!(auth, SolarwatchError::Auth { .. }));

        let config = SolarwatchError::config("missing secret");
        assert!(matches!(config, SolarwatchError::Config { .. }));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            SolarwatchError::missing_parameter("key").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            SolarwatchError::not_found("sensor1").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            SolarwatchError::invalid_body("Invalid JSON body").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            SolarwatchError::auth("expired").status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            SolarwatchError::upstream("feed returned 500").status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_gateway_bodies_match_wire_contract() {
        assert_eq!(
            SolarwatchError::missing_parameter("key").to_string(),
            "Missing key"
        );
        assert_eq!(SolarwatchError::not_found("absent").to_string(), "Key not found");
        assert_eq!(
            SolarwatchError::invalid_body("Invalid JSON body").to_string(),
            "Invalid JSON body"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: SolarwatchError = io_err.into();
        assert!(matches!(err, SolarwatchError::Io { .. }));
    }
}
