//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID)
//!     → security (identity, rate limit)
//!     → extract.rs (sanitize, validate, type the body)
//!     → handlers.rs (learning service, audit)
//!     → middleware/error_boundary.rs (normalise errors once)
//!     → Send to client
//! ```

pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod request;
pub mod server;

pub use extract::Validated;
pub use request::{MakeRequestUuid, X_REQUEST_ID};
pub use server::{AppState, HttpServer, ServerError};
