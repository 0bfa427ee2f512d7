use crate::dispatcher::Context;
use crate::shape::Nil;
use crate::typed::{middleware, Handler};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Log the outcome of every request once the rest of the chain returns.
///
/// Runs inside the request span, so method, path and request id are already
/// attached to the event.
#[track_caller]
pub fn request_logger() -> Arc<dyn Handler> {
    middleware::<Nil, _>(|ctx: &mut Context| {
        let start = Instant::now();
        let result = ctx.next();
        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
        let status = ctx.raw_response().status;
        match &result {
            Ok(()) => info!(status, latency_ms, "request completed"),
            Err(e) => warn!(status, latency_ms, error = %e, "request failed"),
        }
        result.map(|()| None)
    })
}
