use super::envelope::{Envelope, OkEnvelope};
use crate::codec::{APPLICATION_JSON, APPLICATION_OCTET_STREAM, TEXT_PLAIN};
use crate::shape::{Nil, Reflect};
use serde::Serialize;

/// The bound inputs of a terminal handler.
///
/// Any of the three parts may be [`Nil`]; a `Nil` part is never read from the
/// request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Request<B = Nil, P = Nil, Q = Nil> {
    pub body: B,
    pub path: P,
    pub query: Q,
}

/// A typed response: an envelope plus transport overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct Response<R> {
    pub(crate) envelope: R,
    pub(crate) status: Option<u16>,
    pub(crate) content_type: Option<String>,
    pub(crate) headers: Vec<(String, String)>,
}

impl<R: Envelope> Response<R> {
    /// Respond with `envelope` at the status of its populated variant.
    pub fn send(envelope: R) -> Self {
        Self {
            envelope,
            status: None,
            content_type: None,
            headers: Vec::new(),
        }
    }

    pub fn send_json(envelope: R) -> Self {
        Self::send(envelope).content_type(APPLICATION_JSON)
    }

    pub fn send_text(envelope: R) -> Self {
        Self::send(envelope).content_type(TEXT_PLAIN)
    }

    pub fn send_bytes(envelope: R) -> Self {
        Self::send(envelope).content_type(APPLICATION_OCTET_STREAM)
    }

    /// Override the status.
    ///
    /// The status must be the one tagged on the populated variant; any other
    /// status fails the request with
    /// [`Error::MismatchedResponseStatus`](crate::Error::MismatchedResponseStatus)
    /// or [`Error::UnsupportedResponseStatus`](crate::Error::UnsupportedResponseStatus).
    pub fn status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Encode with the codec registered for `mime` instead of the declared one.
    pub fn content_type(mut self, mime: impl Into<String>) -> Self {
        self.content_type = Some(mime.into());
        self
    }

    /// Add a response header.
    ///
    /// When served through [`HttpServer`](crate::server::HttpServer) each
    /// distinct `name: value` line is kept for the life of the process, so
    /// values unique to one request (ids, ETags, `Location` targets) grow
    /// memory with every new value.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn envelope(&self) -> &R {
        &self.envelope
    }

    /// The status the response will be written with.
    pub fn effective_status(&self) -> u16 {
        self.status.unwrap_or_else(|| self.envelope.status())
    }
}

/// `200 OK` with `value` as the body.
pub fn ok<T>(value: T) -> Response<OkEnvelope<T>>
where
    T: Serialize + Reflect + Send + 'static,
{
    Response::send(OkEnvelope(value))
}
