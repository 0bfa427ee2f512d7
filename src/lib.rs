//! # oasrouter
//!
//! **oasrouter** is an HTTP router driven by an [OpenAPI 3](https://spec.openapis.org/oas/v3.1.0)
//! specification. Handlers are ordinary Rust functions over typed request
//! bodies, parameter structs and response envelopes; at startup the router
//! checks every handler's declared types against the schemas of the
//! operation it serves and refuses to build if they disagree.
//!
//! ## Overview
//!
//! ```text
//!   openapi.yaml ──► spec::Specification
//!                          │
//!   handlers ──► builder::RouterBuilder ──► validator (shape vs. schema)
//!                          │
//!                          ▼
//!               dispatcher::OasRouter ◄── server::RouterService ◄── may_minihttp
//! ```
//!
//! - **[`spec`]** loads the document and reduces it to operations.
//! - **[`shape`]** describes Rust types structurally; `#[derive(Reflect)]`
//!   and `#[derive(Envelope)]` generate the descriptions.
//! - **[`validator`]** compares shapes with schemas and chains with operations.
//! - **[`typed`]** builds terminal handlers and middlewares.
//! - **[`binding`]** decodes requests into handler types and encodes envelopes.
//! - **[`builder`]** assembles groups and operations, validates and compiles.
//! - **[`dispatcher`]** runs compiled chains per request.
//! - **[`middleware`]** ships an error handler and a request logger.
//! - **[`server`]** serves a router over `may_minihttp`.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use oasrouter::{handler, Envelope, Reflect, Request, Response, RouterBuilder, Specification};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Deserialize, Reflect)]
//! pub struct Greeting {
//!     pub name: String,
//! }
//!
//! #[derive(Serialize, Reflect)]
//! pub struct Reply {
//!     pub greeting: String,
//! }
//!
//! #[derive(Serialize, Reflect, Envelope)]
//! pub enum GreetResponse {
//!     #[oas(status = 200)]
//!     Ok(Reply),
//! }
//!
//! let spec = Specification::from_yaml_str(include_str!("openapi.yaml"))?;
//! let router = RouterBuilder::new(spec)
//!     .use_middleware(oasrouter::middleware::error_handler())
//!     .with_operation(
//!         "greet",
//!         handler(|_ctx, req: Request<Greeting>| {
//!             Ok(Response::send(GreetResponse::Ok(Reply {
//!                 greeting: format!("Hello {}!", req.body.name),
//!             })))
//!         }),
//!         vec![],
//!     )
//!     .build()?;
//! ```
//!
//! ## Failure model
//!
//! Build problems are collected into one [`BuildError`] listing every
//! diagnostic. At request time, binding failures travel up the chain as
//! [`Error::BadRequest`]; without a middleware translating them the client
//! sees a bare `500` and the details go to the log.

extern crate self as oasrouter;

pub mod binding;
pub mod builder;
pub mod codec;
pub mod config;
pub mod diagnostics;
pub mod dispatcher;
pub mod errors;
pub mod ids;
pub mod logging;
pub mod middleware;
pub mod router;
pub mod runtime_config;
pub mod server;
pub mod shape;
pub mod spec;
pub mod typed;
pub mod validator;

pub use builder::{Group, RouterBuilder};
pub use codec::{Codec, Codecs};
pub use config::{OperationValidation, OperationValidationOverrides, RouterOptions};
pub use diagnostics::{Diagnostic, DiagnosticKind, Severity};
pub use dispatcher::{Context, OasRouter, RawResponse};
pub use errors::{BadRequest, BindError, BindLocation, BuildError, Error};
pub use ids::RequestId;
pub use oasrouter_macros::{Envelope, Reflect};
pub use shape::{Base64Bytes, Nil, Reflect, Shape};
pub use spec::{load_spec, Specification};
pub use typed::{handler, middleware, ok, Envelope, Handler, OkEnvelope, Request, Response};

#[doc(hidden)]
pub mod __private {
    pub use serde;
    pub use serde_json;
}
