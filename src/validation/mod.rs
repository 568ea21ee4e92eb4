//! Request validation subsystem.
//!
//! # Data Flow
//! ```text
//! sanitized JSON body
//!     → registry.rs (operation name → Schema, absent = skip)
//!     → validator.rs (per field, schema order)
//!         → rules.rs (required → type → length/pattern → min/max → enum → custom)
//!     → ValidationErrors (empty = proceed, otherwise 400)
//! ```

pub mod registry;
pub mod rules;
pub mod schema;
pub mod validator;

pub use registry::{SchemaError, SchemaRegistry};
pub use rules::{FieldKind, FieldRule, RuleName, Violation};
pub use schema::Schema;
pub use validator::{validate, FieldError, ValidationErrors};
