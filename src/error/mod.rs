//! Request-level error taxonomy.
//!
//! Handlers return `Result<_, AppError>`. Turning an `AppError` into a
//! response does not render it: the error rides in the response extensions
//! until the error boundary (`http::middleware::error_boundary`) normalises
//! it once, with the request path and method at hand.

pub mod normalizer;

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::Value;
use thiserror::Error;

use crate::clock::rfc3339_now;

pub use normalizer::{ErrorNormalizer, NormalizedError, GENERIC_ERROR_MESSAGE, UPSTREAM_FAILURE_MESSAGE};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum AppError {
    /// Raised by our own code with a deliberate status and payload.
    #[error("{message}")]
    Domain {
        status: StatusCode,
        message: String,
        details: Value,
        timestamp: String,
    },

    /// The backing service rejected an operation.
    #[error("{message}")]
    Upstream { code: String, message: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{message}")]
    Internal {
        message: String,
        #[source]
        source: Option<BoxError>,
    },
}

impl AppError {
    pub fn domain(status: StatusCode, message: impl Into<String>) -> Self {
        Self::domain_with(status, message, Value::Null)
    }

    pub fn domain_with(status: StatusCode, message: impl Into<String>, details: Value) -> Self {
        Self::Domain {
            status,
            message: message.into(),
            details,
            timestamp: rfc3339_now(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::domain(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::domain(StatusCode::NOT_FOUND, message)
    }

    pub fn upstream(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Upstream {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    pub fn internal_from<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Internal {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Status the error will carry once normalised.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Domain { status, .. } => *status,
            Self::Upstream { .. } => StatusCode::BAD_REQUEST,
            _ if self.to_string().contains("Validation error") => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// An `AppError` waiting for the error boundary.
#[derive(Clone, Debug)]
pub struct PendingError(pub Arc<AppError>);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut response = self.status().into_response();
        response.extensions_mut().insert(PendingError(Arc::new(self)));
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_display_carries_marker() {
        let err = AppError::Validation("percentage out of range".into());
        assert_eq!(err.to_string(), "Validation error: percentage out of range");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_into_response_defers_rendering() {
        let response = AppError::not_found("Certificate not found").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let pending = response.extensions().get::<PendingError>().unwrap();
        assert_eq!(pending.0.to_string(), "Certificate not found");
    }

    #[test]
    fn test_internal_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        let err = AppError::internal_from("store failed", io);
        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "disk gone");
    }
}
