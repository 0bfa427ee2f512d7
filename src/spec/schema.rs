use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// The `type` keyword values the validator understands. `null` is tracked
/// separately through [`Schema::nullable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaType {
    Boolean,
    Integer,
    Number,
    String,
    Array,
    Object,
}

impl SchemaType {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "boolean" => Some(SchemaType::Boolean),
            "integer" => Some(SchemaType::Integer),
            "number" => Some(SchemaType::Number),
            "string" => Some(SchemaType::String),
            "array" => Some(SchemaType::Array),
            "object" => Some(SchemaType::Object),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaType::Boolean => "boolean",
            SchemaType::Integer => "integer",
            SchemaType::Number => "number",
            SchemaType::String => "string",
            SchemaType::Array => "array",
            SchemaType::Object => "object",
        }
    }
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `additionalProperties`: a boolean or a schema. Absent is `None` on [`Schema`].
#[derive(Debug, Clone, PartialEq)]
pub enum AdditionalProperties {
    Allowed(bool),
    Schema(Box<Schema>),
}

/// The structural subset of a JSON Schema the type validator reasons about.
///
/// Built from an already `$ref`-expanded JSON value. Keywords outside this
/// subset (bounds, patterns, examples) only matter for runtime value checks and
/// stay in the raw JSON kept next to it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    pub types: Vec<SchemaType>,
    pub nullable: bool,
    pub format: Option<String>,
    pub properties: BTreeMap<String, Schema>,
    pub additional_properties: Option<AdditionalProperties>,
    pub items: Option<Box<Schema>>,
    pub all_of: Vec<Schema>,
    pub one_of: Vec<Schema>,
    pub any_of: Vec<Schema>,
    pub not: Option<Box<Schema>>,
    pub required: Vec<String>,
    pub enum_values: Vec<Value>,
    /// Name of the `#/components/schemas` entry this schema was expanded from.
    pub ref_name: Option<String>,
}

impl Schema {
    /// Build from JSON. Boolean schemas map to the empty schema (`true`) and to
    /// `not: {}` (`false`).
    pub fn from_value(value: &Value) -> Self {
        let obj = match value {
            Value::Object(obj) => obj,
            Value::Bool(false) => {
                return Schema {
                    not: Some(Box::new(Schema::default())),
                    ..Schema::default()
                }
            }
            _ => return Schema::default(),
        };

        let mut schema = Schema::default();
        match obj.get("type") {
            Some(Value::String(t)) => {
                if t == "null" {
                    schema.nullable = true;
                } else if let Some(t) = SchemaType::parse(t) {
                    schema.types.push(t);
                }
            }
            Some(Value::Array(list)) => {
                for t in list.iter().filter_map(Value::as_str) {
                    if t == "null" {
                        schema.nullable = true;
                    } else if let Some(t) = SchemaType::parse(t) {
                        if !schema.types.contains(&t) {
                            schema.types.push(t);
                        }
                    }
                }
            }
            _ => {}
        }
        if obj.get("nullable").and_then(Value::as_bool) == Some(true) {
            schema.nullable = true;
        }
        schema.format = obj
            .get("format")
            .and_then(Value::as_str)
            .map(str::to_string);
        if let Some(Value::Object(props)) = obj.get("properties") {
            schema.properties = props
                .iter()
                .map(|(k, v)| (k.clone(), Schema::from_value(v)))
                .collect();
        }
        schema.additional_properties = match obj.get("additionalProperties") {
            Some(Value::Bool(b)) => Some(AdditionalProperties::Allowed(*b)),
            Some(v @ Value::Object(_)) => {
                Some(AdditionalProperties::Schema(Box::new(Schema::from_value(v))))
            }
            _ => None,
        };
        schema.items = obj
            .get("items")
            .filter(|v| v.is_object() || v.is_boolean())
            .map(|v| Box::new(Schema::from_value(v)));
        schema.all_of = schema_list(obj.get("allOf"));
        schema.one_of = schema_list(obj.get("oneOf"));
        schema.any_of = schema_list(obj.get("anyOf"));
        schema.not = obj.get("not").map(|v| Box::new(Schema::from_value(v)));
        if let Some(Value::Array(req)) = obj.get("required") {
            schema.required = req
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect();
        }
        if let Some(Value::Array(values)) = obj.get("enum") {
            schema.enum_values = values.clone();
        }
        schema.ref_name = obj
            .get("x-ref-name")
            .and_then(Value::as_str)
            .map(str::to_string);
        schema
    }

    /// The empty schema accepts everything.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
            && self.properties.is_empty()
            && self.additional_properties.is_none()
            && self.items.is_none()
            && !self.has_combinators()
    }

    pub fn has_combinators(&self) -> bool {
        !self.all_of.is_empty()
            || !self.one_of.is_empty()
            || !self.any_of.is_empty()
            || self.not.is_some()
    }

    /// Object keywords without an explicit `type`, as used by `allOf` mixins.
    pub fn has_object_keywords(&self) -> bool {
        !self.properties.is_empty() || self.additional_properties.is_some()
    }

    /// Compact description for diagnostics, e.g. `string (uuid)` or `integer | string`.
    pub fn describe(&self) -> String {
        if self.types.is_empty() {
            return match &self.ref_name {
                Some(name) => format!("schema {name}"),
                None => "untyped schema".to_string(),
            };
        }
        let types: Vec<&str> = self.types.iter().map(SchemaType::as_str).collect();
        match &self.format {
            Some(format) => format!("{} ({format})", types.join(" | ")),
            None => types.join(" | "),
        }
    }
}

fn schema_list(value: Option<&Value>) -> Vec<Schema> {
    match value {
        Some(Value::Array(list)) => list.iter().map(Schema::from_value).collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_type_list_ignores_null() {
        let schema = Schema::from_value(&json!({"type": ["string", "null"], "format": "uuid"}));
        assert_eq!(schema.types, vec![SchemaType::String]);
        assert!(schema.nullable);
        assert_eq!(schema.describe(), "string (uuid)");
    }

    #[test]
    fn test_object_keywords() {
        let schema = Schema::from_value(&json!({
            "type": "object",
            "properties": {"name": {"type": "string"}},
            "additionalProperties": {"type": "integer"},
            "required": ["name"]
        }));
        assert_eq!(schema.properties["name"].types, vec![SchemaType::String]);
        assert!(matches!(
            schema.additional_properties,
            Some(AdditionalProperties::Schema(ref s)) if s.types == vec![SchemaType::Integer]
        ));
        assert_eq!(schema.required, vec!["name".to_string()]);
    }

    #[test]
    fn test_combinators_and_empty() {
        let schema = Schema::from_value(&json!({
            "oneOf": [{"type": "string"}, {"type": "integer"}],
            "not": {"type": "boolean"}
        }));
        assert_eq!(schema.one_of.len(), 2);
        assert!(schema.not.is_some());
        assert!(schema.has_combinators());
        assert!(Schema::from_value(&json!({"description": "anything"})).is_empty());
        assert!(Schema::from_value(&json!(false)).not.is_some());
    }
}
