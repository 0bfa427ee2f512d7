//! # Dispatcher Module
//!
//! Runs matched requests through their compiled handler chains.
//!
//! ## Overview
//!
//! [`OasRouter::handle`] matches the request against the route table, builds
//! a [`Context`] and hands it to the head of the operation's chain. Each link
//! is a [`Dispatch`]; middlewares decide whether and when the rest of the
//! chain runs by calling [`Context::next`].
//!
//! Responses are accumulated on the context as a [`RawResponse`]. The first
//! write wins, so a middleware that short-circuits and one that wraps both
//! see a consistent picture after `next()` returns.
//!
//! ## Failure handling
//!
//! - No route for the path: `404`.
//! - Path known, method not: `405` with `Allow`.
//! - Chain returns an error, or finishes without writing: `500`.
//! - Handler panics: `500` when `recover_on_panic` is set, otherwise the panic
//!   propagates to the caller.

mod context;
mod core;

pub use self::core::{Dispatch, OasRouter};
pub(crate) use self::core::Route;
pub use context::{Context, RawResponse};
