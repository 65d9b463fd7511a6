//! Unified error types for the actuator.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Unified error type for the actuator.
#[derive(Error, Debug)]
pub enum ActuatorError {
    /// No route matched, or a metric dimension is unknown.
    #[error("not found: {path}")]
    NotFound {
        /// Request path that failed to resolve.
        path: String,
    },

    /// Environment settings failed to deserialize.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Environment settings deserialized but are not usable.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// JSON encoding error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ActuatorError {
    /// Build a not-found error for the given path.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// HTTP status this error maps to.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ActuatorError {
    fn into_response(self) -> Response {
        // Status only; not-found responses carry no body.
        self.status_code().into_response()
    }
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, ActuatorError>;
