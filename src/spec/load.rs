use super::build::build_specification;
use super::types::Specification;
use anyhow::Context;
use oas3::OpenApiV3Spec;
use serde_json::Value;
use std::path::Path;

/// Drop path-item keys that are neither verbs nor known fields so that
/// documents using vendor verbs still parse.
fn strip_unknown_verbs(val: &mut Value) {
    const METHODS: [&str; 8] = ["get", "post", "put", "delete", "patch", "options", "head", "trace"];

    let Some(Value::Object(paths_map)) = val.get_mut("paths") else {
        return;
    };
    for item in paths_map.values_mut() {
        if let Value::Object(obj) = item {
            obj.retain(|k, _| {
                let lk = k.to_ascii_lowercase();
                match lk.as_str() {
                    "summary" | "description" | "servers" | "parameters" | "$ref" => true,
                    m if METHODS.contains(&m) => true,
                    _ => k.starts_with("x-"),
                }
            });
        }
    }
}

/// Load a specification from a `.yaml`, `.yml` or `.json` file.
pub fn load_spec(file_path: impl AsRef<Path>) -> anyhow::Result<Specification> {
    let file_path = file_path.as_ref();
    let content = std::fs::read(file_path)
        .with_context(|| format!("failed to read {}", file_path.display()))?;
    let is_yaml = matches!(
        file_path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    let value: Value = if is_yaml {
        serde_yaml::from_slice(&content)
            .with_context(|| format!("invalid YAML in {}", file_path.display()))?
    } else {
        serde_json::from_slice(&content)
            .with_context(|| format!("invalid JSON in {}", file_path.display()))?
    };
    Specification::from_value(value)
}

impl Specification {
    /// Parse JSON or YAML bytes; JSON is detected by a leading `{`.
    pub fn from_slice(bytes: &[u8]) -> anyhow::Result<Self> {
        let first = bytes.iter().find(|b| !b.is_ascii_whitespace());
        let value: Value = if first == Some(&b'{') {
            serde_json::from_slice(bytes).context("invalid JSON specification")?
        } else {
            serde_yaml::from_slice(bytes).context("invalid YAML specification")?
        };
        Self::from_value(value)
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let value: Value = serde_yaml::from_str(yaml).context("invalid YAML specification")?;
        Self::from_value(value)
    }

    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        let value: Value = serde_json::from_str(json).context("invalid JSON specification")?;
        Self::from_value(value)
    }

    pub fn from_value(mut value: Value) -> anyhow::Result<Self> {
        strip_unknown_verbs(&mut value);
        let spec: OpenApiV3Spec =
            serde_json::from_value(value).context("document is not an OpenAPI 3 specification")?;
        build_specification(&spec)
    }

    /// Build from a document parsed elsewhere.
    pub fn from_openapi(spec: &OpenApiV3Spec) -> anyhow::Result<Self> {
        build_specification(spec)
    }
}
