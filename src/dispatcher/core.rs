use super::context::{Context, RawResponse};
use crate::errors::Error;
use crate::router::{PathRouter, RouteMatch};
use crate::spec::SpecOperation;
use http::header::{ALLOW, CONTENT_TYPE};
use http::{HeaderValue, StatusCode};
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info_span};

/// One compiled link of a handler chain.
///
/// Each dispatcher owns the next link it may run. Terminal dispatchers have
/// none; middlewares run theirs through [`Context::next`].
pub trait Dispatch: Send + Sync {
    fn dispatch(&self, ctx: &mut Context) -> Result<(), Error>;
}

/// A registered route: the operation it serves and the head of its chain.
pub(crate) struct Route {
    pub(crate) operation: Arc<SpecOperation>,
    pub(crate) chain: Arc<dyn Dispatch>,
}

/// The built router.
///
/// Immutable once built; share it across server coroutines behind an `Arc`.
pub struct OasRouter {
    routes: PathRouter<Route>,
    recover_on_panic: bool,
}

impl OasRouter {
    pub(crate) fn new(routes: PathRouter<Route>, recover_on_panic: bool) -> Self {
        Self {
            routes,
            recover_on_panic,
        }
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// Serve one request.
    ///
    /// Unknown paths get `404`, known paths with an unregistered method get
    /// `405` with an `Allow` header. A chain that fails or writes nothing
    /// yields `500`.
    pub fn handle(&self, request: http::Request<Vec<u8>>) -> http::Response<Vec<u8>> {
        let method = request.method().clone();
        let path = request.uri().path().to_string();

        let (route, params) = match self.routes.lookup(&method, &path) {
            RouteMatch::Found { value, params } => (value, params),
            RouteMatch::MethodNotAllowed { allowed } => {
                debug!(method = %method, path = %path, "method not allowed");
                return method_not_allowed(&allowed);
            }
            RouteMatch::NotFound => {
                debug!(method = %method, path = %path, "no route");
                return plain(StatusCode::NOT_FOUND);
            }
        };

        let mut ctx = Context::new(Arc::clone(&route.operation), request, params);
        let span = info_span!(
            "request",
            method = %method,
            path = %path,
            operation = ctx.operation_id().unwrap_or_default(),
            request_id = %ctx.request_id(),
        );
        let _entered = span.enter();
        let start = Instant::now();

        let outcome = catch_unwind(AssertUnwindSafe(|| route.chain.dispatch(&mut ctx)));
        let raw = match outcome {
            Ok(Ok(())) => ctx.into_raw_response(),
            Ok(Err(e)) => {
                error!(error = %e, "request failed");
                return internal_error();
            }
            Err(panic) if self.recover_on_panic => {
                error!(panic = %panic_message(&*panic), "handler panicked");
                return internal_error();
            }
            Err(panic) => resume_unwind(panic),
        };

        if !raw.is_written() {
            error!("chain completed without writing a response");
            return internal_error();
        }
        debug!(
            status = raw.status,
            latency_us = start.elapsed().as_micros() as u64,
            "request served"
        );
        raw.into_http()
    }
}

impl std::fmt::Debug for OasRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OasRouter")
            .field("routes", &self.routes.len())
            .field("recover_on_panic", &self.recover_on_panic)
            .finish()
    }
}

fn plain(status: StatusCode) -> http::Response<Vec<u8>> {
    let body = status.canonical_reason().unwrap_or_default().as_bytes().to_vec();
    let mut raw = RawResponse {
        status: status.as_u16(),
        body,
        ..RawResponse::default()
    };
    raw.headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    raw.into_http()
}

/// Failures surface as a bare `500`; the details stay in the server log.
fn internal_error() -> http::Response<Vec<u8>> {
    RawResponse {
        status: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
        ..RawResponse::default()
    }
    .into_http()
}

fn method_not_allowed(allowed: &[http::Method]) -> http::Response<Vec<u8>> {
    let mut response = plain(StatusCode::METHOD_NOT_ALLOWED);
    let list = allowed
        .iter()
        .map(http::Method::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    if let Ok(value) = HeaderValue::from_str(&list) {
        response.headers_mut().insert(ALLOW, value);
    }
    response
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
