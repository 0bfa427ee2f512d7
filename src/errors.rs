//! Error types.
//!
//! Build-time problems are collected as [`Diagnostic`]s and surface as a single
//! [`BuildError`]. Request-time problems travel up the handler chain as
//! [`Error`] so that an error-handling middleware can translate them.

use crate::diagnostics::{Diagnostic, Severity};
use std::fmt;

/// The aggregated failure returned by [`crate::RouterBuilder::build`].
#[derive(Debug)]
pub struct BuildError {
    diagnostics: Vec<Diagnostic>,
}

impl BuildError {
    pub fn new(diagnostics: Vec<Diagnostic>) -> Self {
        Self { diagnostics }
    }

    /// Every finding of the pass, warnings included.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
    }
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.errors().count();
        write!(f, "router validation failed with {count} error(s)")?;
        for diagnostic in self.errors() {
            write!(f, "\n  - {diagnostic}")?;
        }
        Ok(())
    }
}

impl std::error::Error for BuildError {}

/// Failures of the built-in codecs.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("body is not valid UTF-8")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("{codec} cannot carry {kind} values")]
    Unsupported {
        codec: &'static str,
        kind: &'static str,
    },
}

/// Which part of the request failed to bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindLocation {
    Body,
    Path,
    Query,
}

impl fmt::Display for BindLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BindLocation::Body => "body",
            BindLocation::Path => "path",
            BindLocation::Query => "query",
        })
    }
}

/// The cause carried by a [`BadRequest`].
#[derive(Debug, thiserror::Error)]
pub enum BindError {
    #[error("cannot decode body: {0}")]
    Decode(#[source] CodecError),
    #[error("parameter '{name}' was given {count} values but accepts a single one")]
    MultipleValuesForScalar { name: String, count: usize },
    #[error("parameter '{name}' value {value:?} is not a valid {expected}")]
    Unparseable {
        name: String,
        value: String,
        expected: &'static str,
    },
    #[error("parameter '{name}' is invalid: {}", details.join("; "))]
    InvalidParameter { name: String, details: Vec<String> },
    #[error("{0}")]
    Deserialize(#[source] serde_json::Error),
}

/// A request that could not be bound to the handler's declared types.
#[derive(Debug, thiserror::Error)]
#[error("bad request ({location}): {cause}")]
pub struct BadRequest {
    pub location: BindLocation,
    #[source]
    pub cause: BindError,
}

impl BadRequest {
    pub fn new(location: BindLocation, cause: BindError) -> Self {
        Self { location, cause }
    }
}

/// Request-time errors returned by dispatchers and handlers.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    BadRequest(#[from] BadRequest),
    #[error("unsupported request content type '{0}'")]
    UnsupportedRequestContentType(String),
    #[error("no codec registered for response content type '{0}'")]
    UnsupportedResponseContentType(String),
    #[error("status {status} is not declared by response envelope {envelope}")]
    UnsupportedResponseStatus { status: u16, envelope: &'static str },
    #[error("status {status} does not belong to populated variant {envelope}::{variant}")]
    MismatchedResponseStatus {
        status: u16,
        variant: &'static str,
        envelope: &'static str,
    },
    #[error("invalid response header '{name}'")]
    InvalidResponseHeader { name: String },
    #[error("cannot encode response: {0}")]
    ResponseEncoding(#[source] CodecError),
    #[error(transparent)]
    Handler(#[from] anyhow::Error),
}

impl Error {
    pub fn as_bad_request(&self) -> Option<&BadRequest> {
        match self {
            Error::BadRequest(b) => Some(b),
            _ => None,
        }
    }
}
