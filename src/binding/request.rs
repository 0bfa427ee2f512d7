use super::params::{query_pairs, ParamBinder};
use crate::codec::{normalize_mime, Codecs};
use crate::dispatcher::Context;
use crate::errors::{BadRequest, BindError, BindLocation, Error};
use crate::shape::{ParamLocation, Reflect, Shape};
use crate::spec::SpecOperation;
use crate::typed::Request;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::marker::PhantomData;

/// Decodes the request body with the codec selected by `Content-Type`.
struct BodyBinder {
    /// `Nil` bodies are never read.
    nil: bool,
    codecs: Codecs,
}

impl BodyBinder {
    fn new(shape: &Shape, codecs: &Codecs) -> Self {
        Self {
            nil: shape.is_nil(),
            codecs: codecs.clone(),
        }
    }

    fn bind<B: DeserializeOwned>(&self, ctx: &Context) -> Result<B, Error> {
        let bad = |cause| Error::BadRequest(BadRequest::new(BindLocation::Body, cause));
        if self.nil {
            return serde_json::from_value(Value::Null).map_err(|e| bad(BindError::Deserialize(e)));
        }

        let mime = ctx
            .header(http::header::CONTENT_TYPE.as_str())
            .map(normalize_mime)
            .unwrap_or_default();
        let codec = if mime.is_empty() || mime == "*/*" {
            self.codecs.json()
        } else {
            self.codecs
                .get(&mime)
                .ok_or(Error::UnsupportedRequestContentType(mime))?
        };
        let value = codec
            .decode(ctx.body())
            .map_err(|e| bad(BindError::Decode(e)))?;
        serde_json::from_value(value).map_err(|e| bad(BindError::Deserialize(e)))
    }
}

/// Binds body, path parameters and query parameters of one handler.
pub struct RequestBinder<B, P, Q> {
    body: BodyBinder,
    path: ParamBinder,
    query: ParamBinder,
    _types: PhantomData<fn() -> (B, P, Q)>,
}

impl<B, P, Q> RequestBinder<B, P, Q>
where
    B: DeserializeOwned + Reflect,
    P: DeserializeOwned + Reflect,
    Q: DeserializeOwned + Reflect,
{
    pub fn new(operation: &SpecOperation, codecs: &Codecs) -> Self {
        Self {
            body: BodyBinder::new(&B::shape(), codecs),
            path: ParamBinder::new(ParamLocation::Path, &P::shape(), operation),
            query: ParamBinder::new(ParamLocation::Query, &Q::shape(), operation),
            _types: PhantomData,
        }
    }

    pub fn bind(&self, ctx: &Context) -> Result<Request<B, P, Q>, Error> {
        let body = self.body.bind(ctx)?;
        let path = self.path.bind(ctx.path_params())?;
        let query = if self.query.is_nil() {
            self.query.bind(&[])?
        } else {
            self.query.bind(&query_pairs(ctx.uri().query()))?
        };
        Ok(Request { body, path, query })
    }
}
