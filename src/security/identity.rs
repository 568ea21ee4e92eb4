//! Caller identity.
//!
//! Authentication happens upstream; the auth proxy in front of the gateway
//! forwards the verified user id in a header. This middleware lifts that
//! header into request extensions, and the rate limiter and handlers read it
//! from there.

use std::convert::Infallible;
use std::fmt;
use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, FromRequestParts, State},
    http::{request::Parts, HeaderName, Request, StatusCode},
    middleware::Next,
    response::Response,
    body::Body,
};

use crate::error::AppError;

/// Context attached to authenticated requests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthenticatedUser(pub String);

pub async fn authenticate(
    State(header): State<HeaderName>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let user = req
        .headers()
        .get(&header)
        .and_then(|val| val.to_str().ok())
        .map(str::trim)
        .filter(|uid| !uid.is_empty())
        .map(|uid| AuthenticatedUser(uid.to_owned()));

    if let Some(user) = user {
        req.extensions_mut().insert(user);
    }
    next.run(req).await
}

/// Key under which a caller's requests are counted.
///
/// Unauthenticated callers behind the same address share one key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Identity {
    User(String),
    Address(String),
}

impl Identity {
    pub fn resolve(user: Option<&AuthenticatedUser>, peer: Option<SocketAddr>) -> Self {
        match (user, peer) {
            (Some(user), _) => Self::User(user.0.clone()),
            (None, Some(addr)) => Self::Address(addr.ip().to_string()),
            (None, None) => Self::Address("unknown".to_string()),
        }
    }

    pub fn from_request<B>(req: &Request<B>) -> Self {
        let user = req.extensions().get::<AuthenticatedUser>();
        let peer = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Self::resolve(user, peer)
    }

    pub fn key(&self) -> &str {
        match self {
            Self::User(uid) => uid,
            Self::Address(ip) => ip,
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Handler-side view of the authenticated user, if any.
#[derive(Clone, Debug, Default)]
pub struct Caller(pub Option<AuthenticatedUser>);

impl Caller {
    pub fn user_id(&self) -> Option<&str> {
        self.0.as_ref().map(|u| u.0.as_str())
    }

    pub fn require(&self) -> Result<&str, AppError> {
        self.user_id().ok_or_else(|| {
            AppError::domain(StatusCode::UNAUTHORIZED, "Authentication required")
        })
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<AuthenticatedUser>().cloned()))
    }
}
