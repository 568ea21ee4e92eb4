//! Cross-cutting HTTP middleware that needs application state.

pub mod error_boundary;
pub mod track;

pub use error_boundary::{normalize_errors, panic_response, with_error_boundary};
pub use track::track_requests;
