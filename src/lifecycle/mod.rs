//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     Signal received → broadcast → API server, admin server, sweeper stop
//!
//! Signals (signals.rs):
//!     SIGINT / Ctrl-C → trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Every long-running task subscribes to one broadcast channel
//! - Servers stop accepting and drain in-flight requests before exiting

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::wait_for_signal;
