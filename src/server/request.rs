use http::{HeaderName, HeaderValue, Method, Request};
use may_minihttp::Request as RawRequest;
use std::io::{self, Read};
use tracing::debug;

/// Why a wire request could not be handed to the router.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("cannot read request body: {0}")]
    Body(#[from] io::Error),
    #[error("malformed request: {0}")]
    Http(#[from] http::Error),
}

/// Convert a minihttp request into the `http` form the router consumes.
pub fn convert_request(req: RawRequest) -> Result<Request<Vec<u8>>, ConvertError> {
    let method = req.method().to_string();
    let target = req.path().to_string();
    let headers: Vec<(String, Vec<u8>)> = req
        .headers()
        .iter()
        .map(|h| (h.name.to_string(), h.value.to_vec()))
        .collect();

    let body = read_body(req.body())?;
    let request = build_request(
        &method,
        &target,
        headers.iter().map(|(n, v)| (n.as_str(), v.as_slice())),
        body,
    )?;
    Ok(request)
}

/// Read a request body to the end. A short read is an error, never an empty body.
pub fn read_body(mut reader: impl Read) -> Result<Vec<u8>, ConvertError> {
    let mut body = Vec::new();
    reader.read_to_end(&mut body)?;
    Ok(body)
}

/// Assemble an `http::Request` from its raw parts. Headers that are not
/// valid HTTP are dropped.
pub fn build_request<'h>(
    method: &str,
    target: &str,
    headers: impl IntoIterator<Item = (&'h str, &'h [u8])>,
    body: Vec<u8>,
) -> http::Result<Request<Vec<u8>>> {
    let method = Method::from_bytes(method.as_bytes())?;
    let mut builder = Request::builder().method(method).uri(target);
    let mut dropped = 0usize;
    for (name, value) in headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_bytes(value),
        ) {
            (Ok(name), Ok(value)) => builder = builder.header(name, value),
            _ => dropped += 1,
        }
    }
    if dropped > 0 {
        debug!(dropped, "ignored malformed request headers");
    }
    builder.body(body)
}
