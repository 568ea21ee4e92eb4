//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, request ID, limits, identity, rate limit, error boundary)
//! - Bind server to listener
//! - Start background tasks (rate limit sweeper, admin listener)
//!
//! # Layer order (outermost first)
//! ```text
//! request id → trace → propagate id → timeout → body limit → metrics
//!     → error boundary → catch panic → identity → rate limit → handler
//! ```

use std::net::SocketAddr;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::{HeaderName, Request},
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin;
use crate::clock::{Clock, SystemClock};
use crate::config::GatewayConfig;
use crate::error::ErrorNormalizer;
use crate::http::handlers;
use crate::http::middleware::{track_requests, with_error_boundary};
use crate::http::request::{request_id, MakeRequestUuid, X_REQUEST_ID};
use crate::learning::LearningService;
use crate::observability::{AuditLogger, AuditSink, TracingAuditSink};
use crate::security::{authenticate, rate_limit_middleware, RateLimiter};
use crate::validation::{SchemaError, SchemaRegistry};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to build schema registry: {0}")]
    Schema(#[from] SchemaError),

    #[error("invalid user header name: {0}")]
    UserHeader(#[from] axum::http::header::InvalidHeaderName),

    #[error("invalid admin bind address '{0}'")]
    AdminAddress(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SchemaRegistry>,
    pub learning: Arc<LearningService>,
    pub audit: AuditLogger,
    pub normalizer: ErrorNormalizer,
    pub rate_limiter: Arc<RateLimiter>,
    pub config: Arc<GatewayConfig>,
    pub requests_seen: Arc<AtomicU64>,
}

/// HTTP server for the learning API.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Server on the system clock, auditing to the `audit` log target.
    ///
    /// Spawns the audit writer, so it must be called inside a tokio runtime.
    pub fn new(config: GatewayConfig) -> Result<Self, ServerError> {
        Self::with_parts(config, Arc::new(SystemClock), Arc::new(TracingAuditSink))
    }

    pub fn with_parts(
        config: GatewayConfig,
        clock: Arc<dyn Clock>,
        audit_sink: Arc<dyn AuditSink>,
    ) -> Result<Self, ServerError> {
        let user_header = HeaderName::try_from(config.security.user_header.as_str())?;

        let state = AppState {
            registry: Arc::new(SchemaRegistry::builtin()?),
            learning: Arc::new(LearningService::new()),
            audit: AuditLogger::spawn(audit_sink),
            normalizer: ErrorNormalizer::new(config.security.development_mode),
            rate_limiter: Arc::new(RateLimiter::from_config(&config.rate_limit, clock)),
            config: Arc::new(config),
            requests_seen: Arc::new(AtomicU64::new(0)),
        };

        let router = Self::build_router(state.clone(), user_header);
        Ok(Self { router, state })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(state: AppState, user_header: HeaderName) -> Router {
        let config = state.config.clone();

        let mut api = Router::new()
            .route("/api/progress", post(handlers::update_progress))
            .route("/api/assessments", post(handlers::create_assessment))
            .route("/api/assessments/submit", post(handlers::submit_assessment))
            .route("/api/certificates", post(handlers::generate_certificate))
            .route("/api/certificates/verify", post(handlers::verify_certificate))
            .route("/api/certificates/revoke", post(handlers::revoke_certificate))
            .route(
                "/api/certificates/eligibility/bulk",
                post(handlers::bulk_check_eligibility),
            )
            .route(
                "/api/courses/{courseId}/eligibility",
                get(handlers::course_eligibility),
            );

        if config.rate_limit.enabled {
            api = api.layer(from_fn_with_state(
                state.rate_limiter.clone(),
                rate_limit_middleware,
            ));
        }

        let app = Router::new()
            .route("/health", get(handlers::health))
            .merge(api)
            .layer(from_fn_with_state(user_header, authenticate));

        with_error_boundary(app, state.normalizer)
            .layer(from_fn_with_state(state.clone(), track_requests))
            .with_state(state)
            .layer(DefaultBodyLimit::max(config.security.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = %request_id(request),
                    )
                }),
            )
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
    }

    /// A clone of the fully layered router, for in-process callers.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        let config = self.state.config.clone();

        tracing::info!(
            address = %addr,
            rate_limit_enabled = config.rate_limit.enabled,
            development_mode = config.security.development_mode,
            "HTTP server starting"
        );

        if config.rate_limit.enabled {
            let sweeper = self.state.rate_limiter.clone();
            let interval = Duration::from_secs(config.rate_limit.sweep_interval_secs);
            tokio::spawn(sweeper.run_sweeper(interval, shutdown.resubscribe()));
        }

        if config.admin.enabled {
            let admin_addr: SocketAddr = config
                .admin
                .bind_address
                .parse()
                .map_err(|_| ServerError::AdminAddress(config.admin.bind_address.clone()))?;
            let admin_listener = TcpListener::bind(admin_addr).await?;
            let admin_router = admin::router(self.state.clone());
            let mut admin_shutdown = shutdown.resubscribe();

            tracing::info!(address = %admin_addr, "Admin API listening");
            tokio::spawn(async move {
                let served = axum::serve(admin_listener, admin_router)
                    .with_graceful_shutdown(async move {
                        let _ = admin_shutdown.recv().await;
                    })
                    .await;
                if let Err(e) = served {
                    tracing::error!(error = %e, "Admin server failed");
                }
            });
        }

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
