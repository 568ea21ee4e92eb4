use std::sync::atomic::Ordering;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::http::server::AppState;
use crate::learning::types::LearningSummary;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub development_mode: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    pub total_requests: u64,
    pub rate_limited_requests: u64,
    pub tracked_identities: usize,
    pub learning: LearningSummary,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitStatus {
    pub enabled: bool,
    pub window_ms: u64,
    pub max_requests: u32,
    pub tracked_identities: usize,
    pub rejected_total: u64,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        development_mode: state.normalizer.is_development(),
    })
}

pub async fn get_analytics(State(state): State<AppState>) -> Json<AnalyticsSummary> {
    Json(AnalyticsSummary {
        total_requests: state.requests_seen.load(Ordering::Relaxed),
        rate_limited_requests: state.rate_limiter.rejected_total(),
        tracked_identities: state.rate_limiter.tracked_identities(),
        learning: state.learning.summary(),
    })
}

pub async fn get_rate_limits(State(state): State<AppState>) -> Json<RateLimitStatus> {
    let limiter = &state.rate_limiter;
    Json(RateLimitStatus {
        enabled: state.config.rate_limit.enabled,
        window_ms: limiter.window_ms(),
        max_requests: limiter.max_requests(),
        tracked_identities: limiter.tracked_identities(),
        rejected_total: limiter.rejected_total(),
    })
}
