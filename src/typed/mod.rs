//! # Typed Module
//!
//! Typed handlers and the envelopes they answer with.
//!
//! ## Overview
//!
//! A route is served by a chain of handlers: zero or more middlewares
//! followed by one terminal handler. Both kinds implement [`Handler`], which
//! exposes the types they declare so the builder can check them against the
//! specification before any request is served.
//!
//! - [`handler`] builds a terminal handler over a body type `B`, a path
//!   parameter struct `P`, a query parameter struct `Q` and a response
//!   envelope `R`. Unused parts default to [`crate::Nil`].
//! - [`middleware`] builds a middleware over a response envelope `R`; it
//!   decides whether to run the rest of the chain through
//!   [`crate::dispatcher::Context::next`].
//!
//! ## Envelopes
//!
//! An [`Envelope`] is an enum whose variants are tagged with HTTP statuses:
//!
//! ```rust,ignore
//! use oasrouter::{Envelope, Reflect};
//!
//! #[derive(Serialize, Reflect, Envelope)]
//! enum GetPetResponse {
//!     #[oas(status = 200)]
//!     Ok(Pet),
//!     #[oas(status = 404)]
//!     NotFound,
//! }
//! ```
//!
//! [`Response::send`] picks the status of the populated variant;
//! [`Response::content_type`] and [`Response::header`] adjust the transport.
//! [`ok`] is the shortcut for a plain `200` body.

mod envelope;
mod handler;
mod request;

pub use envelope::{Envelope, OkEnvelope};
pub use handler::{
    handler, middleware, CompileContext, Handler, HandlerKind, MiddlewareHandler, NilMiddleware,
    TypedHandler,
};
pub use request::{ok, Request, Response};
