//! Saakra learning gateway library.
//!
//! Every write request passes identity, rate limiting, sanitisation and
//! schema validation before it reaches the learning service, and every
//! failure leaves through one error normaliser.

pub mod admin;
pub mod clock;
pub mod config;
pub mod error;
pub mod http;
pub mod learning;
pub mod lifecycle;
pub mod observability;
pub mod security;
pub mod validation;

pub use config::schema::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
