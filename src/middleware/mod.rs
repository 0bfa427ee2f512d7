//! # Middleware Module
//!
//! Built-in middlewares. Both answer with the [`crate::Nil`] envelope, so they
//! add no response statuses to an operation's validation; anything they
//! write goes through [`crate::dispatcher::Context::respond`].
//!
//! - [`error_handler`] turns binding failures into `400 application/problem+json`.
//! - [`request_logger`] logs status and latency after the chain ran.
//!
//! Order matters: put `request_logger` outside `error_handler` to log the
//! translated status.

mod error_handler;
mod logger;

pub use error_handler::{error_handler, PROBLEM_JSON};
pub use logger::request_logger;
