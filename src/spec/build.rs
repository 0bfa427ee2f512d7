use super::schema::Schema;
use super::types::{
    MediaType, Operation, Parameter, ParameterLocation, ParameterStyle, RequestBody, Response,
    SpecOperation, Specification,
};
use oas3::spec::{ObjectOrReference, ObjectSchema};
use oas3::OpenApiV3Spec;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

const SCHEMA_REF_PREFIX: &str = "#/components/schemas/";

/// Resolves local `$ref` pointers against the serialized document.
///
/// Any `#/...` JSON pointer is accepted, so references to parameters, request
/// bodies and responses resolve the same way as schema references.
pub(crate) struct RefResolver {
    root: Value,
}

impl RefResolver {
    pub(crate) fn new(spec: &OpenApiV3Spec) -> anyhow::Result<Self> {
        Ok(Self {
            root: serde_json::to_value(spec)?,
        })
    }

    fn lookup(&self, ref_path: &str) -> Option<&Value> {
        ref_path
            .strip_prefix('#')
            .and_then(|pointer| self.root.pointer(pointer))
    }

    /// Resolve a referenced component into its oas3 type.
    fn resolve<T: DeserializeOwned>(&self, ref_path: &str) -> Option<T> {
        let value = self.lookup(ref_path)?;
        match serde_json::from_value(value.clone()) {
            Ok(resolved) => Some(resolved),
            Err(err) => {
                warn!(ref_path, error = %err, "unresolvable $ref");
                None
            }
        }
    }

    fn to_json<T: Serialize>(&self, item: &ObjectOrReference<T>) -> Option<Value> {
        match item {
            ObjectOrReference::Object(obj) => serde_json::to_value(obj).ok(),
            ObjectOrReference::Ref { ref_path, .. } => {
                let mut value = serde_json::json!({ "$ref": ref_path });
                self.expand(&mut value);
                Some(value)
            }
        }
    }

    /// Expand every `$ref` in place, tagging expanded schemas with `x-ref-name`.
    ///
    /// A reference already being expanded further up the tree is left as-is, so
    /// recursive schemas stop after one level and validate as the empty schema.
    pub(crate) fn expand(&self, value: &mut Value) {
        let mut stack = Vec::new();
        self.expand_inner(value, &mut stack);
    }

    fn expand_inner(&self, value: &mut Value, stack: &mut Vec<String>) {
        match value {
            Value::Object(obj) => {
                if let Some(ref_path) = obj.get("$ref").and_then(Value::as_str) {
                    let ref_path = ref_path.to_string();
                    if stack.contains(&ref_path) {
                        debug!(ref_path = %ref_path, "recursive $ref left unexpanded");
                        return;
                    }
                    if let Some(target) = self.lookup(&ref_path) {
                        let mut expanded = target.clone();
                        stack.push(ref_path.clone());
                        self.expand_inner(&mut expanded, stack);
                        stack.pop();
                        if let (Some(name), Value::Object(o)) =
                            (ref_path.strip_prefix(SCHEMA_REF_PREFIX), &mut expanded)
                        {
                            o.insert("x-ref-name".to_string(), Value::String(name.to_string()));
                        }
                        *value = expanded;
                        return;
                    }
                    warn!(ref_path = %ref_path, "dangling $ref");
                }
                for v in obj.values_mut() {
                    self.expand_inner(v, stack);
                }
            }
            Value::Array(arr) => {
                for v in arr.iter_mut() {
                    self.expand_inner(v, stack);
                }
            }
            _ => {}
        }
    }

    fn schema(
        &self,
        item: Option<&ObjectOrReference<ObjectSchema>>,
    ) -> (Option<Schema>, Option<Value>) {
        let Some(item) = item else {
            return (None, None);
        };
        match self.to_json(item) {
            Some(mut raw) => {
                self.expand(&mut raw);
                (Some(Schema::from_value(&raw)), Some(raw))
            }
            None => (None, None),
        }
    }

    fn media_types<'a>(
        &self,
        content: impl IntoIterator<Item = (&'a String, &'a oas3::spec::MediaType)>,
    ) -> BTreeMap<String, MediaType> {
        content
            .into_iter()
            .map(|(mime, media)| {
                let (schema, raw_schema) = self.schema(media.schema.as_ref());
                (mime.clone(), MediaType { schema, raw_schema })
            })
            .collect()
    }

    fn parameter(&self, param: &oas3::spec::Parameter) -> Parameter {
        let (schema, raw_schema) = self.schema(param.schema.as_ref());
        Parameter {
            name: param.name.clone(),
            location: ParameterLocation::from(param.location),
            required: param.required.unwrap_or(false),
            schema,
            raw_schema,
            style: param.style.map(ParameterStyle::from),
            explode: param.explode,
        }
    }

    fn parameters(&self, params: &[ObjectOrReference<oas3::spec::Parameter>]) -> Vec<Parameter> {
        params
            .iter()
            .filter_map(|p| match p {
                ObjectOrReference::Object(obj) => Some(self.parameter(obj)),
                ObjectOrReference::Ref { ref_path, .. } => self
                    .resolve::<oas3::spec::Parameter>(ref_path)
                    .map(|obj| self.parameter(&obj)),
            })
            .collect()
    }

    fn request_body(&self, operation: &oas3::spec::Operation) -> Option<RequestBody> {
        let build = |body: &oas3::spec::RequestBody| RequestBody {
            required: body.required.unwrap_or(false),
            content: self.media_types(&body.content),
        };
        match operation.request_body.as_ref()? {
            ObjectOrReference::Object(body) => Some(build(body)),
            ObjectOrReference::Ref { ref_path, .. } => self
                .resolve::<oas3::spec::RequestBody>(ref_path)
                .map(|body| build(&body)),
        }
    }

    fn responses(&self, operation: &oas3::spec::Operation) -> BTreeMap<u16, Response> {
        let mut out = BTreeMap::new();
        let Some(responses) = operation.responses.as_ref() else {
            return out;
        };
        for (status_str, resp_ref) in responses {
            let status: u16 = match status_str.parse() {
                Ok(v) => v,
                Err(_) => continue,
            };
            let response = match resp_ref {
                ObjectOrReference::Object(resp) => Response {
                    content: self.media_types(&resp.content),
                },
                ObjectOrReference::Ref { ref_path, .. } => {
                    match self.resolve::<oas3::spec::Response>(ref_path) {
                        Some(resp) => Response {
                            content: self.media_types(&resp.content),
                        },
                        None => Response::default(),
                    }
                }
            };
            out.insert(status, response);
        }
        out
    }
}

/// Merge path-item and operation parameters; the operation wins on `(name, in)` clashes.
fn merge_parameters(item_level: Vec<Parameter>, op_level: Vec<Parameter>) -> Vec<Parameter> {
    let mut merged: Vec<Parameter> = item_level
        .into_iter()
        .filter(|p| {
            !op_level
                .iter()
                .any(|o| o.name == p.name && o.location == p.location)
        })
        .collect();
    merged.extend(op_level);
    merged
}

/// Build a [`Specification`] from an already parsed document.
///
/// Operations keep document order. Duplicate `operationId`s resolve to the first
/// occurrence and are logged.
pub fn build_specification(spec: &OpenApiV3Spec) -> anyhow::Result<Specification> {
    let resolver = RefResolver::new(spec)?;
    let mut operations = Vec::new();
    let mut index = HashMap::new();

    if let Some(paths_map) = spec.paths.as_ref() {
        for (path, item) in paths_map {
            let item_params = resolver.parameters(&item.parameters);
            for (method, operation) in item.methods() {
                let parameters = merge_parameters(
                    item_params.clone(),
                    resolver.parameters(&operation.parameters),
                );
                let op = SpecOperation {
                    path: path.clone(),
                    method,
                    operation: Operation {
                        id: operation.operation_id.clone(),
                        parameters,
                        request_body: resolver.request_body(operation),
                        responses: resolver.responses(operation),
                    },
                };
                if let Some(id) = op.id() {
                    if index.contains_key(id) {
                        warn!(operation_id = id, path = %op.path, "duplicate operationId in specification");
                    } else {
                        index.insert(id.to_string(), operations.len());
                    }
                }
                operations.push(op);
            }
        }
    }

    debug!(
        title = %spec.info.title,
        operations = operations.len(),
        "specification built"
    );

    Ok(Specification {
        title: spec.info.title.clone(),
        version: spec.info.version.clone(),
        operations,
        index,
    })
}
