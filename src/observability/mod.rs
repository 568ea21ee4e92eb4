//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms)
//!     → audit.rs (user-attributable actions, `audit` target)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Request ID flows through all subsystems
//! - Audit writes are detached from the request path

pub mod audit;
pub mod logging;
pub mod metrics;

pub use audit::{AuditEvent, AuditLogger, AuditSink, AuditStatus, MemoryAuditSink, TracingAuditSink};
