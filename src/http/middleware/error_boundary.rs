//! The single place where `AppError`s become response bodies.

use std::any::Any;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::{from_fn_with_state, Next},
    response::{IntoResponse, Response},
    Router,
};
use tower_http::catch_panic::CatchPanicLayer;

use crate::error::{AppError, ErrorNormalizer, PendingError};
use crate::observability::metrics;

/// Wrap `router` so panics become errors and every error is normalised.
///
/// The panic layer sits inside the boundary, so a caught panic is rendered
/// like any other unclassified error.
pub fn with_error_boundary<S>(router: Router<S>, normalizer: ErrorNormalizer) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(from_fn_with_state(normalizer, normalize_errors))
}

pub async fn normalize_errors(
    State(normalizer): State<ErrorNormalizer>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path().to_owned();
    let method = request.method().clone();

    let response = next.run(request).await;

    match response.extensions().get::<PendingError>().cloned() {
        Some(PendingError(error)) => {
            let normalized = normalizer.normalize(&error, &path, &method);
            metrics::record_error(normalized.status_code);
            normalized.into_response()
        }
        None => response,
    }
}

/// Turns a handler panic into an unclassified error for the boundary.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "handler panicked".to_string()
    };
    AppError::internal(message).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::to_bytes,
        http::{Method, StatusCode},
        routing::get,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    async fn fails() -> Result<&'static str, AppError> {
        Err(AppError::internal("db password leaked in message"))
    }

    async fn upstream() -> Result<&'static str, AppError> {
        Err(AppError::upstream("E42", "row locked"))
    }

    fn app(development: bool) -> Router {
        Router::new()
            .route("/fail", get(fails))
            .route("/upstream", get(upstream))
            .route("/ok", get(|| async { "fine" }))
            .layer(from_fn_with_state(
                ErrorNormalizer::new(development),
                normalize_errors,
            ))
    }

    async fn call(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().method(Method::GET).uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_production_hides_internal_message() {
        let (status, body) = call(app(false), "/fail").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "An error occurred");
        assert_eq!(body["error"], "Internal Server Error");
    }

    #[tokio::test]
    async fn test_development_shows_internal_message() {
        let (_, body) = call(app(true), "/fail").await;
        assert_eq!(body["message"], "db password leaked in message");
    }

    #[tokio::test]
    async fn test_upstream_errors_become_bad_request() {
        let (status, body) = call(app(false), "/upstream").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["details"]["code"], "E42");
    }

    #[tokio::test]
    async fn test_success_passes_through() {
        let response = app(false)
            .oneshot(Request::builder().uri("/ok").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    async fn explodes() -> &'static str {
        panic!("ledger invariant broken")
    }

    fn panicking_app(development: bool) -> Router {
        with_error_boundary(
            Router::new().route("/explode", get(explodes)),
            ErrorNormalizer::new(development),
        )
    }

    #[tokio::test]
    async fn test_panic_is_normalized_in_production() {
        let (status, body) = call(panicking_app(false), "/explode").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal Server Error");
        assert_eq!(body["message"], "An error occurred");
    }

    #[tokio::test]
    async fn test_panic_text_shown_in_development() {
        let (status, body) = call(panicking_app(true), "/explode").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "ledger invariant broken");
    }

    #[test]
    fn test_panic_payload_becomes_pending_error() {
        let response = panic_response(Box::new("boom"));
        let pending = response.extensions().get::<PendingError>().unwrap();
        assert_eq!(pending.0.to_string(), "boom");
    }
}
