//! # Binding Module
//!
//! Per-handler request and response binders, compiled once per route.
//!
//! - [`RequestBinder`] decodes the body with the codec selected by the
//!   request's `Content-Type` (JSON when absent or `*/*`), binds path and
//!   query parameters into the handler's parameter structs and checks each
//!   parameter value against its schema. Every failure is a
//!   [`crate::errors::BadRequest`] naming the part of the request at fault.
//!   `Nil` parts are never read.
//! - [`ResponseBinder`] turns a typed [`crate::typed::Response`] into status,
//!   headers and body. It is idempotent: once any dispatcher in the chain has
//!   written a response, later envelopes are ignored, which lets middlewares
//!   both short-circuit and wrap.

mod params;
mod request;
mod response;

pub use request::RequestBinder;
pub use response::ResponseBinder;
