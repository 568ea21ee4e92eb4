//! `Validated<T>`: the body extractor every write endpoint goes through.
//!
//! ```text
//! raw JSON → sanitize → schema lookup → validate → typed T
//! ```
//! A failing schema short-circuits with
//! `400 {"error": "Validation error", "validationErrors": {...}}`.
//! Operations without a registered schema skip validation.

use axum::{
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use crate::error::AppError;
use crate::http::server::AppState;
use crate::learning::Operation;
use crate::observability::metrics;
use crate::security::sanitize::sanitize;
use crate::validation::validate;

#[derive(Debug, Clone)]
pub struct Validated<T>(pub T);

impl<T: Operation> FromRequest<AppState> for Validated<T> {
    type Rejection = Response;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let Json(body) = Json::<Value>::from_request(req, state)
            .await
            .map_err(|rejection| {
                AppError::domain(rejection.status(), rejection.body_text()).into_response()
            })?;

        let record = sanitize(body);

        if let Some(schema) = state.registry.lookup(T::NAME) {
            let errors = validate(schema, &record);
            if !errors.is_empty() {
                tracing::debug!(
                    operation = T::NAME,
                    failed_fields = errors.len(),
                    "Request body failed validation"
                );
                metrics::record_validation_failure(T::NAME);
                return Err((
                    StatusCode::BAD_REQUEST,
                    Json(json!({
                        "error": "Validation error",
                        "validationErrors": errors,
                    })),
                )
                    .into_response());
            }
        }

        serde_json::from_value(record).map(Validated).map_err(|e| {
            AppError::bad_request(format!("Malformed {} request: {e}", T::NAME)).into_response()
        })
    }
}
