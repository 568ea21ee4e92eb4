//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{HeaderMap, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tokio::net::TcpListener;
use tower::ServiceExt;

use saakra_gateway::clock::ManualClock;
use saakra_gateway::observability::{AuditEvent, MemoryAuditSink};
use saakra_gateway::{GatewayConfig, HttpServer, Shutdown};

/// Config with rate limiting loose enough not to interfere.
pub fn test_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.rate_limit.max_requests = 1_000;
    config
}

/// An in-process gateway driven through `tower::ServiceExt::oneshot`.
pub struct TestGateway {
    pub server: HttpServer,
    pub router: Router,
    pub clock: Arc<ManualClock>,
    pub audit: Arc<MemoryAuditSink>,
}

impl TestGateway {
    pub fn new(config: GatewayConfig) -> Self {
        let clock = Arc::new(ManualClock::new(0));
        let audit = Arc::new(MemoryAuditSink::default());
        let server = HttpServer::with_parts(config, clock.clone(), audit.clone()).unwrap();
        let router = server.router();
        Self {
            server,
            router,
            clock,
            audit,
        }
    }

    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        user: Option<&str>,
        body: Option<Value>,
    ) -> Reply {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header("x-user-id", user);
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    pub async fn post(&self, uri: &str, user: Option<&str>, body: Value) -> Reply {
        self.call(Method::POST, uri, user, Some(body)).await
    }

    pub async fn get(&self, uri: &str, user: Option<&str>) -> Reply {
        self.call(Method::GET, uri, user, None).await
    }

    pub async fn send(&self, request: Request<Body>) -> Reply {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        Reply {
            status,
            headers,
            body,
        }
    }

    /// Audit events once the writer task has caught up.
    pub async fn audit_events(&self) -> Vec<AuditEvent> {
        tokio::time::sleep(Duration::from_millis(50)).await;
        self.audit.events()
    }
}

#[derive(Debug)]
pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

/// Start a real server on an ephemeral port.
pub async fn spawn_server(config: GatewayConfig) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = HttpServer::new(config).unwrap();
    let rx = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });

    // Wait for server to start
    tokio::time::sleep(Duration::from_millis(100)).await;
    (addr, shutdown)
}
