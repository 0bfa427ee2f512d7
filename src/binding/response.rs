use crate::codec::{Codec, Codecs};
use crate::dispatcher::Context;
use crate::errors::{CodecError, Error};
use crate::shape::{HandlerResponses, Reflect};
use crate::spec::SpecOperation;
use crate::typed::{Envelope, Response};
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderName, HeaderValue};
use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, warn};

/// Writes a typed response into the context.
pub struct ResponseBinder<R> {
    responses: HandlerResponses,
    envelope: &'static str,
    codecs: Codecs,
    /// Codec of the content type the specification declares per status.
    declared: BTreeMap<u16, Arc<dyn Codec>>,
    _envelope: PhantomData<fn() -> R>,
}

impl<R: Envelope> ResponseBinder<R> {
    pub fn new(operation: &SpecOperation, codecs: &Codecs) -> Self {
        let responses = HandlerResponses::from_shape(&<R as Reflect>::shape());
        let mut declared = BTreeMap::new();
        for status in responses.statuses() {
            let Some(mime) = operation.response_content_type(status) else {
                continue;
            };
            match codecs.get(mime) {
                Some(codec) => {
                    declared.insert(status, codec);
                }
                None => warn!(
                    operation = operation.id().unwrap_or_default(),
                    status,
                    content_type = mime,
                    "no codec for declared response content type, falling back to JSON"
                ),
            }
        }
        Self {
            envelope: responses.envelope.unwrap_or("Nil"),
            responses,
            codecs: codecs.clone(),
            declared,
            _envelope: PhantomData,
        }
    }

    /// Encode and record `response`, unless a response was already written.
    pub fn bind(&self, ctx: &mut Context, response: Response<R>) -> Result<(), Error> {
        if ctx.raw_response().is_written() {
            debug!(
                status = ctx.raw_response().status,
                envelope = self.envelope,
                "response already written, ignoring envelope"
            );
            return Ok(());
        }

        let status = response.effective_status();
        let Some(arm) = self.responses.get(status) else {
            return Err(Error::UnsupportedResponseStatus {
                status,
                envelope: self.envelope,
            });
        };

        let populated = response.envelope.status();
        if status != populated {
            return Err(Error::MismatchedResponseStatus {
                status,
                variant: self.responses.get(populated).map_or("?", |a| a.variant),
                envelope: self.envelope,
            });
        }

        let (codec, content_type) = match &response.content_type {
            Some(ct) => {
                let codec = self
                    .codecs
                    .get(ct)
                    .ok_or_else(|| Error::UnsupportedResponseContentType(ct.clone()))?;
                (codec, ct.clone())
            }
            None => {
                let codec = self
                    .declared
                    .get(&status)
                    .map(Arc::clone)
                    .unwrap_or_else(|| self.codecs.json());
                let mime = codec.mime().to_string();
                (codec, mime)
            }
        };

        let Response {
            envelope, headers, ..
        } = response;
        let mut header_map = HeaderMap::new();
        for (name, value) in headers {
            let invalid = || Error::InvalidResponseHeader { name: name.clone() };
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
            let header_value = HeaderValue::from_str(&value).map_err(|_| invalid())?;
            header_map.append(header_name, header_value);
        }

        let payload = if arm.is_nil() {
            None
        } else {
            envelope
                .into_payload()
                .map_err(|e| Error::ResponseEncoding(CodecError::Json(e)))?
        };
        let body = match payload {
            Some(value) => {
                let bytes = codec.encode(&value).map_err(Error::ResponseEncoding)?;
                if !header_map.contains_key(CONTENT_TYPE) {
                    let value = HeaderValue::from_str(&content_type).map_err(|_| {
                        Error::InvalidResponseHeader {
                            name: CONTENT_TYPE.to_string(),
                        }
                    })?;
                    header_map.insert(CONTENT_TYPE, value);
                }
                bytes
            }
            None => Vec::new(),
        };

        ctx.write(status, header_map, body);
        Ok(())
    }
}
