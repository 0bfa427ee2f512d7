//! # Server Module
//!
//! Socket-facing adapter: [`RouterService`] plugs a built [`crate::OasRouter`]
//! into `may_minihttp`, and [`HttpServer`] starts it on a coroutine.
//!
//! ```rust,ignore
//! let service = RouterService::new(Arc::new(router));
//! let handle = HttpServer(service).start("0.0.0.0:8080")?;
//! handle.wait_ready()?;
//! handle.join().ok();
//! ```

mod http_server;
mod request;
mod response;
mod service;

pub use http_server::{HttpServer, ServerHandle};
pub use request::{build_request, convert_request, read_body, ConvertError};
pub use response::write_response;
pub use service::RouterService;
