//! # Spec Module
//!
//! Loads an OpenAPI 3 document and reduces it to what the router consumes: an
//! ordered list of `(path, method, Operation)` triples with parameters, request
//! body media types and response media types, every schema `$ref`-expanded.
//!
//! Documents are parsed with `oas3` from JSON or YAML. Schemas are kept twice:
//! as a typed [`Schema`] for the startup type check and as raw JSON for the
//! runtime parameter validator.
//!
//! ```rust,ignore
//! use oasrouter::spec::load_spec;
//!
//! let spec = load_spec("openapi.yaml")?;
//! for op in spec.operations() {
//!     println!("{} -> {:?}", op.label(), op.id());
//! }
//! ```

mod build;
mod load;
mod schema;
mod types;

pub use build::build_specification;
pub use load::load_spec;
pub use schema::{AdditionalProperties, Schema, SchemaType};
pub use types::*;
