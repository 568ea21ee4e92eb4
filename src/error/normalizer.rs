//! Maps every `AppError` to one response shape.
//!
//! Classification, first match wins:
//! 1. domain errors pass through untouched
//! 2. upstream service errors become 400 with the upstream code and message
//! 3. anything whose message mentions "Validation error" becomes 400
//! 4. everything else is a 500, with the real message only in development

use axum::{
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};

use crate::clock::rfc3339_now;
use crate::error::AppError;

pub const UPSTREAM_FAILURE_MESSAGE: &str = "upstream service operation failed";
pub const GENERIC_ERROR_MESSAGE: &str = "An error occurred";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedError {
    pub status_code: u16,
    pub message: String,
    pub details: Value,
    pub timestamp: String,
}

impl NormalizedError {
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for NormalizedError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut body = json!({
            "error": status.canonical_reason().unwrap_or("Error"),
            "message": self.message,
            "timestamp": self.timestamp,
        });
        if !self.details.is_null() {
            body["details"] = self.details;
        }
        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorNormalizer {
    development: bool,
}

impl ErrorNormalizer {
    pub fn new(development: bool) -> Self {
        Self { development }
    }

    pub fn is_development(&self) -> bool {
        self.development
    }

    pub fn normalize(&self, error: &AppError, path: &str, method: &Method) -> NormalizedError {
        tracing::error!(
            error = %error,
            chain = %source_chain(error),
            path = %path,
            method = %method,
            "Request failed"
        );

        match error {
            AppError::Domain {
                status,
                message,
                details,
                timestamp,
            } => NormalizedError {
                status_code: status.as_u16(),
                message: message.clone(),
                details: details.clone(),
                timestamp: timestamp.clone(),
            },
            AppError::Upstream { code, message } => NormalizedError {
                status_code: StatusCode::BAD_REQUEST.as_u16(),
                message: UPSTREAM_FAILURE_MESSAGE.to_string(),
                details: json!({ "upstreamMessage": message, "code": code }),
                timestamp: rfc3339_now(),
            },
            other => {
                let message = other.to_string();
                if message.contains("Validation error") {
                    NormalizedError {
                        status_code: StatusCode::BAD_REQUEST.as_u16(),
                        message,
                        details: Value::Null,
                        timestamp: rfc3339_now(),
                    }
                } else {
                    NormalizedError {
                        status_code: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
                        message: if self.development {
                            message
                        } else {
                            GENERIC_ERROR_MESSAGE.to_string()
                        },
                        details: Value::Null,
                        timestamp: rfc3339_now(),
                    }
                }
            }
        }
    }
}

/// `outer: inner: innermost`, the closest thing to a stack we have.
fn source_chain(error: &AppError) -> String {
    let mut chain = Vec::new();
    let mut current = std::error::Error::source(error);
    while let Some(err) = current {
        chain.push(err.to_string());
        current = err.source();
    }
    chain.join(": ")
}
