//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → identity.rs (lift authenticated user id into extensions)
//!     → rate_limit.rs (per-identity sliding window, 429 when full)
//!     → sanitize.rs (strip tag brackets, trim strings)
//!     → validation subsystem
//! ```
//!
//! # Design Decisions
//! - Rate limiting runs before any body parsing (early rejection)
//! - Identity falls back to the peer address; callers behind one NAT share a bucket
//! - No trust in client input

pub mod identity;
pub mod rate_limit;
pub mod sanitize;

pub use identity::{authenticate, AuthenticatedUser, Caller, Identity};
pub use rate_limit::{
    rate_limit_middleware, InMemoryWindowStore, RateDecision, RateLimiter, RateWindow, WindowStore,
};
pub use sanitize::sanitize;
