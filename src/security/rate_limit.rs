//! Sliding-window rate limiting per caller identity.
//!
//! Every identity owns the timestamps of its requests inside the trailing
//! window. A check prunes expired timestamps, then either rejects (window
//! full) or appends `now`. Prune and append happen under the store's
//! per-identity lock with no suspension point in between.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use dashmap::DashMap;
use serde_json::json;
use tokio::sync::broadcast;

use crate::clock::Clock;
use crate::config::RateLimitConfig;
use crate::observability::metrics;
use crate::security::identity::Identity;

/// Request timestamps (epoch ms) of one identity, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateWindow {
    timestamps: VecDeque<u64>,
}

impl RateWindow {
    /// Drop every timestamp that has left the window ending at `now_ms`.
    fn prune(&mut self, now_ms: u64, window_ms: u64) {
        while self
            .timestamps
            .front()
            .is_some_and(|&ts| ts.saturating_add(window_ms) <= now_ms)
        {
            self.timestamps.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn oldest(&self) -> Option<u64> {
        self.timestamps.front().copied()
    }

    pub fn newest(&self) -> Option<u64> {
        self.timestamps.back().copied()
    }

    pub fn timestamps(&self) -> impl Iterator<Item = u64> + '_ {
        self.timestamps.iter().copied()
    }
}

/// Outcome of one rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allow { remaining: u32 },
    Reject { retry_after_secs: u64 },
}

/// Identity → window storage.
///
/// The default `update` is a plain get-modify-put and is only atomic if the
/// implementation serialises callers itself; stores shared between threads
/// should override it.
pub trait WindowStore: Send + Sync {
    fn get(&self, identity: &str) -> Option<RateWindow>;

    fn put(&self, identity: &str, window: RateWindow);

    fn update(
        &self,
        identity: &str,
        f: &mut dyn FnMut(&mut RateWindow) -> RateDecision,
    ) -> RateDecision {
        let mut window = self.get(identity).unwrap_or_default();
        let decision = f(&mut window);
        self.put(identity, window);
        decision
    }

    /// Prune every window as of `now_ms` and drop the ones left empty.
    /// Returns how many identities were dropped.
    fn sweep(&self, now_ms: u64, window_ms: u64) -> usize;

    /// Number of identities currently tracked.
    fn len(&self) -> usize;
}

/// Process-local store backed by DashMap.
#[derive(Debug, Default)]
pub struct InMemoryWindowStore {
    windows: DashMap<String, RateWindow>,
}

impl InMemoryWindowStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WindowStore for InMemoryWindowStore {
    fn get(&self, identity: &str) -> Option<RateWindow> {
        self.windows.get(identity).map(|w| w.value().clone())
    }

    fn put(&self, identity: &str, window: RateWindow) {
        self.windows.insert(identity.to_owned(), window);
    }

    fn update(
        &self,
        identity: &str,
        f: &mut dyn FnMut(&mut RateWindow) -> RateDecision,
    ) -> RateDecision {
        // The entry guard holds the shard lock for the whole closure.
        let mut window = self.windows.entry(identity.to_owned()).or_default();
        f(window.value_mut())
    }

    fn sweep(&self, now_ms: u64, window_ms: u64) -> usize {
        let before = self.windows.len();
        self.windows.retain(|_, window| {
            window.prune(now_ms, window_ms);
            !window.is_empty()
        });
        before.saturating_sub(self.windows.len())
    }

    fn len(&self) -> usize {
        self.windows.len()
    }
}

/// Sliding-window limiter shared by every request.
pub struct RateLimiter {
    store: Arc<dyn WindowStore>,
    clock: Arc<dyn Clock>,
    window_ms: u64,
    max_requests: u32,
    rejected: AtomicU64,
}

impl RateLimiter {
    pub fn new(
        store: Arc<dyn WindowStore>,
        clock: Arc<dyn Clock>,
        window_ms: u64,
        max_requests: u32,
    ) -> Self {
        Self {
            store,
            clock,
            window_ms,
            max_requests,
            rejected: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self::new(
            Arc::new(InMemoryWindowStore::new()),
            clock,
            config.window_ms,
            config.max_requests,
        )
    }

    /// Count a request from `identity` at `now_ms`.
    pub fn check(&self, identity: &str, now_ms: u64) -> RateDecision {
        let window_ms = self.window_ms;
        let max = self.max_requests as usize;

        let decision = self.store.update(identity, &mut |window: &mut RateWindow| {
            // A wall clock stepping backwards must not break ordering.
            let now_ms = window.newest().map_or(now_ms, |newest| newest.max(now_ms));
            window.prune(now_ms, window_ms);

            if window.len() >= max {
                let oldest = window.oldest().unwrap_or(now_ms);
                let wait_ms = oldest.saturating_add(window_ms).saturating_sub(now_ms);
                return RateDecision::Reject {
                    retry_after_secs: wait_ms.div_ceil(1000),
                };
            }

            window.timestamps.push_back(now_ms);
            RateDecision::Allow {
                remaining: (max - window.len()) as u32,
            }
        });

        if matches!(decision, RateDecision::Reject { .. }) {
            self.rejected.fetch_add(1, Ordering::Relaxed);
        }
        decision
    }

    /// [`check`](Self::check) against the limiter's own clock.
    pub fn check_now(&self, identity: &str) -> RateDecision {
        self.check(identity, self.clock.now_ms())
    }

    /// Forget identities whose windows have fully expired.
    pub fn sweep(&self, now_ms: u64) -> usize {
        self.store.sweep(now_ms, self.window_ms)
    }

    pub fn tracked_identities(&self) -> usize {
        self.store.len()
    }

    pub fn rejected_total(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    /// Periodically drop idle identities until shutdown.
    pub async fn run_sweeper(
        self: Arc<Self>,
        interval: std::time::Duration,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let dropped = self.sweep(self.clock.now_ms());
                    if dropped > 0 {
                        tracing::debug!(dropped, tracked = self.tracked_identities(), "Swept idle rate limit windows");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Rate limit sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

/// Middleware function for per-identity rate limiting.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let identity = Identity::from_request(&request);

    match limiter.check_now(identity.key()) {
        RateDecision::Allow { .. } => next.run(request).await,
        RateDecision::Reject { retry_after_secs } => {
            tracing::warn!(client = %identity, retry_after_secs, "Rate limit exceeded");
            metrics::record_rate_limited();
            too_many_requests(retry_after_secs)
        }
    }
}

fn too_many_requests(retry_after_secs: u64) -> Response {
    let mut response = (
        StatusCode::TOO_MANY_REQUESTS,
        Json(json!({
            "error": "Too many requests",
            "retryAfter": retry_after_secs,
        })),
    )
        .into_response();
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
    response
}
