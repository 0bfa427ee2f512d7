//! # Router Module
//!
//! The path-trie that maps `(method, path)` to a compiled handler chain.
//!
//! ## Overview
//!
//! Routes are registered once, at build time, under the specification's path
//! template converted to `:name` placeholder syntax. At request time the router
//! resolves the method and path to the stored value and the percent-decoded
//! placeholder values, or reports that the path exists under other methods
//! (`405`) or not at all (`404`).
//!
//! ## Example
//!
//! ```rust
//! use http::Method;
//! use oasrouter::router::{to_placeholder_syntax, PathRouter, RouteMatch};
//!
//! let mut router = PathRouter::new();
//! router.insert(Method::GET, &to_placeholder_syntax("/pets/{petId}"), "getPet");
//!
//! if let RouteMatch::Found { value, params } = router.lookup(&Method::GET, "/pets/42") {
//!     assert_eq!(*value, "getPet");
//!     assert_eq!(params[0], ("petId".to_string(), "42".to_string()));
//! }
//! ```

mod core;
mod radix;

pub use core::{partial_placeholder, to_placeholder_syntax, PathParams, PathRouter, RouteMatch, MAX_INLINE_PARAMS};
