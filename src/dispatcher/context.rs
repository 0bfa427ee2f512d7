use super::Dispatch;
use crate::errors::Error;
use crate::ids::RequestId;
use crate::router::PathParams;
use crate::spec::SpecOperation;
use http::{HeaderMap, HeaderValue, Method, Request, StatusCode, Uri};
use std::sync::Arc;

/// The response as written so far.
///
/// `status == 0` means nothing has been written. Once a dispatcher writes a
/// response, outer middlewares observe it here and further typed responses are
/// ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn is_written(&self) -> bool {
        self.status != 0
    }

    pub(crate) fn into_http(self) -> http::Response<Vec<u8>> {
        let mut response = http::Response::new(self.body);
        *response.status_mut() =
            StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        *response.headers_mut() = self.headers;
        response
    }
}

/// Per-request state handed down the chain.
pub struct Context {
    operation: Arc<SpecOperation>,
    request: Request<Vec<u8>>,
    path_params: PathParams,
    request_id: RequestId,
    raw: RawResponse,
    pub(crate) next: Option<Arc<dyn Dispatch>>,
}

impl Context {
    pub fn new(
        operation: Arc<SpecOperation>,
        request: Request<Vec<u8>>,
        path_params: PathParams,
    ) -> Self {
        let request_id = RequestId::from_headers(request.headers());
        Self {
            operation,
            request,
            path_params,
            request_id,
            raw: RawResponse::default(),
            next: None,
        }
    }

    /// The matched specification operation.
    pub fn operation(&self) -> &SpecOperation {
        &self.operation
    }

    pub fn operation_id(&self) -> Option<&str> {
        self.operation.id()
    }

    pub fn request(&self) -> &Request<Vec<u8>> {
        &self.request
    }

    pub fn method(&self) -> &Method {
        self.request.method()
    }

    pub fn uri(&self) -> &Uri {
        self.request.uri()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.request.headers()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.request.headers().get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> &[u8] {
        self.request.body()
    }

    pub fn path_params(&self) -> &[(String, String)] {
        &self.path_params
    }

    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rev()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    pub fn raw_response(&self) -> &RawResponse {
        &self.raw
    }

    /// Header set on the response regardless of who writes it.
    pub fn set_response_header(&mut self, name: http::HeaderName, value: HeaderValue) {
        self.raw.headers.insert(name, value);
    }

    /// Write a response directly, bypassing envelopes. Returns `false` and
    /// leaves the context untouched if a response was already written.
    pub fn respond(&mut self, status: StatusCode, content_type: Option<&str>, body: Vec<u8>) -> bool {
        if self.raw.is_written() {
            return false;
        }
        if let Some(value) = content_type.and_then(|ct| HeaderValue::from_str(ct).ok()) {
            self.raw.headers.insert(http::header::CONTENT_TYPE, value);
        }
        self.raw.status = status.as_u16();
        self.raw.body = body;
        true
    }

    pub(crate) fn write(&mut self, status: u16, headers: HeaderMap, body: Vec<u8>) {
        // Headers set earlier by middlewares survive unless overwritten.
        let mut current = None;
        for (name, value) in headers {
            if let Some(name) = name {
                self.raw.headers.remove(&name);
                current = Some(name);
            }
            if let Some(name) = &current {
                self.raw.headers.append(name.clone(), value);
            }
        }
        self.raw.status = status;
        self.raw.body = body;
    }

    /// Run the rest of the chain. A no-op past the terminal handler.
    pub fn next(&mut self) -> Result<(), Error> {
        match self.next.take() {
            Some(next) => {
                let result = next.dispatch(self);
                self.next = Some(next);
                result
            }
            None => Ok(()),
        }
    }

    /// Run `f` with `next` installed as the continuation, restoring the
    /// caller's continuation afterwards.
    pub(crate) fn with_next<T>(
        &mut self,
        next: Option<&Arc<dyn Dispatch>>,
        f: impl FnOnce(&mut Self) -> T,
    ) -> T {
        let saved = std::mem::replace(&mut self.next, next.map(Arc::clone));
        let out = f(self);
        self.next = saved;
        out
    }

    pub(crate) fn into_raw_response(self) -> RawResponse {
        self.raw
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("operation", &self.operation.label())
            .field("request_id", &self.request_id)
            .field("path_params", &self.path_params)
            .field("status", &self.raw.status)
            .finish()
    }
}
