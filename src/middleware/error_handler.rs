use crate::dispatcher::Context;
use crate::errors::{BadRequest, Error};
use crate::shape::Nil;
use crate::typed::{middleware, Handler};
use http::StatusCode;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

pub const PROBLEM_JSON: &str = "application/problem+json";

/// Translate [`BadRequest`] errors from the rest of the chain into a `400`
/// problem document. Other errors propagate unchanged.
#[track_caller]
pub fn error_handler() -> Arc<dyn Handler> {
    middleware::<Nil, _>(|ctx: &mut Context| match ctx.next() {
        Err(Error::BadRequest(bad)) => {
            debug!(location = %bad.location, error = %bad, "rejecting bad request");
            ctx.respond(StatusCode::BAD_REQUEST, Some(PROBLEM_JSON), problem_body(&bad));
            Ok(None)
        }
        other => other.map(|()| None),
    })
}

/// `{"title", "status", "detail", "in"}`.
pub(crate) fn problem_body(bad: &BadRequest) -> Vec<u8> {
    let document = json!({
        "title": "Bad Request",
        "status": StatusCode::BAD_REQUEST.as_u16(),
        "detail": bad.cause.to_string(),
        "in": bad.location.to_string(),
    });
    serde_json::to_vec(&document).unwrap_or_default()
}
