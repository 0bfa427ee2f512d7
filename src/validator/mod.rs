//! # Validator Module
//!
//! Startup checks of handler types against the specification.
//!
//! - [`SchemaValidator`] decides whether one Rust type (through its
//!   [`crate::shape::Shape`]) and one schema are structurally compatible.
//! - [`validate_operation`] runs the schema validator over everything a
//!   handler chain declares for one operation and checks coverage.
//!
//! Both report into a [`crate::diagnostics::Diagnostics`] sink; the builder
//! fails iff any finding ended up at `Error`.

mod operation;
mod schema;

pub use operation::validate_operation;
pub use schema::{kind_matches, probe, SchemaValidator};
