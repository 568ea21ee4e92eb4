//! Admin API on its own listener.
//!
//! All routes sit behind bearer-token auth against `admin.api_key`.

pub mod auth;
pub mod handlers;

use std::sync::Arc;

use axum::{middleware, routing::get, Router};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::server::AppState;

pub fn router(state: AppState) -> Router {
    let api_key: Arc<str> = Arc::from(state.config.admin.api_key.as_str());

    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/analytics", get(get_analytics))
        .route("/admin/rate-limits", get(get_rate_limits))
        .layer(middleware::from_fn_with_state(api_key, admin_auth_middleware))
        .with_state(state)
}
