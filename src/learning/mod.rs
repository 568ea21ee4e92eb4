//! Learning domain behind the validated API.
//!
//! # Data Flow
//! ```text
//! Validated<T> (http/extract.rs)
//!     → types.rs (typed request)
//!     → service.rs (progress, assessments, certificates)
//!     → typed response → handler JSON
//! ```

pub mod service;
pub mod types;

pub use service::LearningService;
pub use types::Operation;
