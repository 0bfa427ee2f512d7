//! # Codec Module
//!
//! Content-type codecs translate between body bytes and `serde_json::Value`,
//! the interchange format between the binders and the typed handlers.
//!
//! Three codecs ship with the router and are registered by default:
//!
//! | codec               | MIME                        | encodes                                  |
//! |---------------------|-----------------------------|------------------------------------------|
//! | [`JsonCodec`]       | `application/json`          | any value                                |
//! | [`TextCodec`]       | `text/plain`                | strings, numbers, booleans               |
//! | [`OctetStreamCodec`]| `application/octet-stream`  | byte arrays and strings, raw             |
//!
//! Structured-syntax suffixes such as `application/problem+json` resolve to the
//! JSON codec unless a codec is registered for the exact type.

use crate::errors::CodecError;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

pub const APPLICATION_JSON: &str = "application/json";
pub const TEXT_PLAIN: &str = "text/plain";
pub const APPLICATION_OCTET_STREAM: &str = "application/octet-stream";

/// A content-type codec.
pub trait Codec: Send + Sync {
    /// The MIME type this codec produces and accepts.
    fn mime(&self) -> &str;
    fn encode(&self, value: &Value) -> Result<Vec<u8>, CodecError>;
    fn decode(&self, bytes: &[u8]) -> Result<Value, CodecError>;
}

/// Lowercase the MIME and strip parameters such as `; charset=utf-8`.
pub fn normalize_mime(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn mime(&self) -> &str {
        APPLICATION_JSON
    }

    fn encode(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        Ok(serde_json::to_vec(value)?)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Value, CodecError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// `text/plain`: the body is one UTF-8 string.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextCodec;

impl Codec for TextCodec {
    fn mime(&self) -> &str {
        TEXT_PLAIN
    }

    fn encode(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        match value {
            Value::String(s) => Ok(s.as_bytes().to_vec()),
            Value::Number(n) => Ok(n.to_string().into_bytes()),
            Value::Bool(b) => Ok(b.to_string().into_bytes()),
            other => Err(CodecError::Unsupported {
                codec: TEXT_PLAIN,
                kind: kind_of(other),
            }),
        }
    }

    fn decode(&self, bytes: &[u8]) -> Result<Value, CodecError> {
        Ok(Value::String(std::str::from_utf8(bytes)?.to_string()))
    }
}

/// `application/octet-stream`: raw bytes.
///
/// Decodes into an array of byte values so the body deserializes into
/// `Vec<u8>` or [`crate::Base64Bytes`]. Encodes byte arrays and strings verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct OctetStreamCodec;

impl Codec for OctetStreamCodec {
    fn mime(&self) -> &str {
        APPLICATION_OCTET_STREAM
    }

    fn encode(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        let unsupported = || CodecError::Unsupported {
            codec: APPLICATION_OCTET_STREAM,
            kind: kind_of(value),
        };
        match value {
            Value::String(s) => Ok(s.as_bytes().to_vec()),
            Value::Array(items) => items
                .iter()
                .map(|v| {
                    v.as_u64()
                        .and_then(|n| u8::try_from(n).ok())
                        .ok_or_else(unsupported)
                })
                .collect(),
            _ => Err(unsupported()),
        }
    }

    fn decode(&self, bytes: &[u8]) -> Result<Value, CodecError> {
        Ok(Value::Array(bytes.iter().map(|b| Value::from(*b)).collect()))
    }
}

/// Codec registry keyed by normalized MIME.
#[derive(Clone)]
pub struct Codecs {
    by_mime: HashMap<String, Arc<dyn Codec>>,
    json: Arc<dyn Codec>,
}

impl Default for Codecs {
    fn default() -> Self {
        let json: Arc<dyn Codec> = Arc::new(JsonCodec);
        let mut codecs = Self {
            by_mime: HashMap::new(),
            json: Arc::clone(&json),
        };
        codecs.register(json);
        codecs.register(Arc::new(TextCodec));
        codecs.register(Arc::new(OctetStreamCodec));
        codecs
    }
}

impl Codecs {
    /// An empty registry; the JSON codec stays available as the default.
    pub fn empty() -> Self {
        Self {
            by_mime: HashMap::new(),
            json: Arc::new(JsonCodec),
        }
    }

    /// Register or replace the codec for its MIME type.
    pub fn register(&mut self, codec: Arc<dyn Codec>) {
        let mime = normalize_mime(codec.mime());
        if mime == APPLICATION_JSON {
            self.json = Arc::clone(&codec);
        }
        self.by_mime.insert(mime, codec);
    }

    /// Look up a codec; `+json` suffixed types fall back to JSON.
    pub fn get(&self, content_type: &str) -> Option<Arc<dyn Codec>> {
        let mime = normalize_mime(content_type);
        if let Some(codec) = self.by_mime.get(&mime) {
            return Some(Arc::clone(codec));
        }
        mime.ends_with("+json").then(|| Arc::clone(&self.json))
    }

    pub fn contains(&self, content_type: &str) -> bool {
        self.get(content_type).is_some()
    }

    /// The default codec used when no content type applies.
    pub fn json(&self) -> Arc<dyn Codec> {
        Arc::clone(&self.json)
    }

    pub fn mimes(&self) -> impl Iterator<Item = &str> {
        self.by_mime.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for Codecs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut mimes: Vec<&str> = self.mimes().collect();
        mimes.sort_unstable();
        f.debug_struct("Codecs").field("mimes", &mimes).finish()
    }
}
