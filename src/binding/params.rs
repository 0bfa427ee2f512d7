//! Path and query parameter binding.
//!
//! Raw string values are decoded according to the target field's shape,
//! checked against the parameter's schema and collected into a JSON object
//! keyed by serde key, which is then deserialized into the parameter struct.

use crate::errors::{BadRequest, BindError, BindLocation, Error};
use crate::shape::{ParamLocation, Shape};
use crate::spec::SpecOperation;
use jsonschema::Validator;
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde_json::{Map, Number, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::warn;

/// Compiled parameter schemas shared by every route, keyed by schema text.
static VALIDATORS: Lazy<Mutex<HashMap<String, Arc<Validator>>>> = Lazy::new(Default::default);

fn is_uuid(value: &str) -> bool {
    uuid::Uuid::parse_str(value).is_ok()
}

/// Compile (or reuse) the value validator for a raw parameter schema.
pub(crate) fn compile_validator(schema: &Value) -> Option<Arc<Validator>> {
    let key = schema.to_string();
    let mut cache = VALIDATORS.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(validator) = cache.get(&key) {
        return Some(Arc::clone(validator));
    }
    match jsonschema::options()
        .should_validate_formats(true)
        .with_format("uuid", is_uuid)
        .build(schema)
    {
        Ok(validator) => {
            let validator = Arc::new(validator);
            cache.insert(key, Arc::clone(&validator));
            Some(validator)
        }
        Err(err) => {
            warn!(error = %err, schema = %key, "parameter schema does not compile, values will not be checked");
            None
        }
    }
}

impl From<ParamLocation> for BindLocation {
    fn from(location: ParamLocation) -> Self {
        match location {
            ParamLocation::Path => BindLocation::Path,
            ParamLocation::Query => BindLocation::Query,
        }
    }
}

struct BoundParam {
    name: String,
    key: &'static str,
    shape: Shape,
    /// Set for non-exploded array parameters.
    separator: Option<char>,
    validator: Option<Arc<Validator>>,
}

enum Mode {
    Nil,
    /// Map targets take every value as a string.
    Map,
    Fields(Vec<BoundParam>),
}

pub(crate) struct ParamBinder {
    location: BindLocation,
    mode: Mode,
}

impl ParamBinder {
    pub(crate) fn new(location: ParamLocation, shape: &Shape, operation: &SpecOperation) -> Self {
        let mode = match shape.unwrap_optional() {
            Shape::Nil => Mode::Nil,
            Shape::Map { .. } => Mode::Map,
            Shape::Struct(s) => Mode::Fields(
                s.param_fields(location)
                    .into_iter()
                    .map(|field| {
                        let param = operation.operation.parameter(&field.name, location.into());
                        let separator = param
                            .filter(|p| !p.explode() && field.shape.is_sequence())
                            .map(|p| p.style.unwrap_or_else(|| p.default_style()).array_separator());
                        let validator = param
                            .and_then(|p| p.raw_schema.as_ref())
                            .and_then(compile_validator);
                        BoundParam {
                            name: field.name,
                            key: field.key,
                            shape: field.shape,
                            separator,
                            validator,
                        }
                    })
                    .collect(),
            ),
            _ => Mode::Fields(Vec::new()),
        };
        Self {
            location: location.into(),
            mode,
        }
    }

    pub(crate) fn is_nil(&self) -> bool {
        matches!(self.mode, Mode::Nil)
    }

    fn bad(&self, cause: BindError) -> Error {
        Error::BadRequest(BadRequest::new(self.location, cause))
    }

    pub(crate) fn bind<T: DeserializeOwned>(&self, pairs: &[(String, String)]) -> Result<T, Error> {
        let value = match &self.mode {
            Mode::Nil => Value::Null,
            Mode::Map => Value::Object(
                pairs
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect(),
            ),
            Mode::Fields(fields) => {
                let mut object = Map::new();
                for field in fields {
                    let raw: Vec<&str> = pairs
                        .iter()
                        .filter(|(k, _)| *k == field.name)
                        .map(|(_, v)| v.as_str())
                        .collect();
                    if raw.is_empty() {
                        continue;
                    }
                    let value = field.decode(&raw).map_err(|c| self.bad(c))?;
                    field.check(&value).map_err(|c| self.bad(c))?;
                    object.insert(field.key.to_string(), value);
                }
                Value::Object(object)
            }
        };
        serde_json::from_value(value).map_err(|e| self.bad(BindError::Deserialize(e)))
    }
}

impl BoundParam {
    fn decode(&self, raw: &[&str]) -> Result<Value, BindError> {
        if self.shape.is_sequence() {
            let elem = match self.shape.unwrap_optional() {
                Shape::Seq(elem) | Shape::Array(elem, _) => elem.as_ref(),
                other => other,
            };
            let mut items = Vec::new();
            for value in raw {
                match self.separator {
                    Some(sep) => {
                        for part in value.split(sep).filter(|p| !p.is_empty()) {
                            items.push(coerce(&self.name, part, elem)?);
                        }
                    }
                    None => items.push(coerce(&self.name, value, elem)?),
                }
            }
            return Ok(Value::Array(items));
        }
        match raw {
            [single] => coerce(&self.name, single, &self.shape),
            _ => Err(BindError::MultipleValuesForScalar {
                name: self.name.clone(),
                count: raw.len(),
            }),
        }
    }

    fn check(&self, value: &Value) -> Result<(), BindError> {
        let Some(validator) = &self.validator else {
            return Ok(());
        };
        let details: Vec<String> = validator.iter_errors(value).map(|e| e.to_string()).collect();
        if details.is_empty() {
            Ok(())
        } else {
            Err(BindError::InvalidParameter {
                name: self.name.clone(),
                details,
            })
        }
    }
}

/// Decode one raw value for a scalar shape.
fn coerce(name: &str, raw: &str, shape: &Shape) -> Result<Value, BindError> {
    let unparseable = |expected: &'static str| BindError::Unparseable {
        name: name.to_string(),
        value: raw.to_string(),
        expected,
    };
    match shape.unwrap_optional() {
        Shape::Bool => match raw {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(unparseable("boolean")),
        },
        Shape::Int { signed: true, .. } => raw
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| unparseable("integer")),
        Shape::Int { signed: false, .. } => raw
            .parse::<u64>()
            .map(Value::from)
            .map_err(|_| unparseable("unsigned integer")),
        Shape::Float { .. } => raw
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| unparseable("number")),
        _ => Ok(Value::String(raw.to_string())),
    }
}

/// Split a raw query string into decoded pairs.
pub(crate) fn query_pairs(query: Option<&str>) -> Vec<(String, String)> {
    query
        .map(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .into_owned()
                .collect()
        })
        .unwrap_or_default()
}
