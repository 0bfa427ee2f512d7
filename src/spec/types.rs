use super::schema::Schema;
use http::Method;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Cookie,
}

impl From<oas3::spec::ParameterIn> for ParameterLocation {
    fn from(loc: oas3::spec::ParameterIn) -> Self {
        match loc {
            oas3::spec::ParameterIn::Path => ParameterLocation::Path,
            oas3::spec::ParameterIn::Query => ParameterLocation::Query,
            oas3::spec::ParameterIn::Header => ParameterLocation::Header,
            oas3::spec::ParameterIn::Cookie => ParameterLocation::Cookie,
        }
    }
}

impl std::fmt::Display for ParameterLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParameterLocation::Path => write!(f, "path"),
            ParameterLocation::Query => write!(f, "query"),
            ParameterLocation::Header => write!(f, "header"),
            ParameterLocation::Cookie => write!(f, "cookie"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterStyle {
    Matrix,
    Label,
    Form,
    Simple,
    SpaceDelimited,
    PipeDelimited,
    DeepObject,
}

impl From<oas3::spec::ParameterStyle> for ParameterStyle {
    fn from(style: oas3::spec::ParameterStyle) -> Self {
        use oas3::spec::ParameterStyle as PS;
        match style {
            PS::Matrix => ParameterStyle::Matrix,
            PS::Label => ParameterStyle::Label,
            PS::Form => ParameterStyle::Form,
            PS::Simple => ParameterStyle::Simple,
            PS::SpaceDelimited => ParameterStyle::SpaceDelimited,
            PS::PipeDelimited => ParameterStyle::PipeDelimited,
            PS::DeepObject => ParameterStyle::DeepObject,
        }
    }
}

impl ParameterStyle {
    /// Separator used by the non-exploded form of an array parameter.
    pub fn array_separator(&self) -> char {
        match self {
            ParameterStyle::SpaceDelimited => ' ',
            ParameterStyle::PipeDelimited => '|',
            _ => ',',
        }
    }
}

/// A schema in both typed and raw form.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaType {
    pub schema: Option<Schema>,
    /// The `$ref`-expanded JSON schema, handed to the runtime value validator.
    pub raw_schema: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub location: ParameterLocation,
    pub required: bool,
    pub schema: Option<Schema>,
    pub raw_schema: Option<Value>,
    pub style: Option<ParameterStyle>,
    pub explode: Option<bool>,
}

impl Parameter {
    /// OpenAPI defaults `explode` to true for `form` style only.
    pub fn explode(&self) -> bool {
        self.explode.unwrap_or(matches!(
            self.style.unwrap_or(self.default_style()),
            ParameterStyle::Form
        ))
    }

    pub fn default_style(&self) -> ParameterStyle {
        match self.location {
            ParameterLocation::Query | ParameterLocation::Cookie => ParameterStyle::Form,
            ParameterLocation::Path | ParameterLocation::Header => ParameterStyle::Simple,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RequestBody {
    pub required: bool,
    pub content: BTreeMap<String, MediaType>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Response {
    pub content: BTreeMap<String, MediaType>,
}

/// One operation as the router needs it.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub id: Option<String>,
    /// Path-item and operation level parameters; operation entries override.
    pub parameters: Vec<Parameter>,
    pub request_body: Option<RequestBody>,
    /// Keyed by numeric status; `default` and range keys are not tracked.
    pub responses: BTreeMap<u16, Response>,
}

impl Operation {
    pub fn parameter(&self, name: &str, location: ParameterLocation) -> Option<&Parameter> {
        self.parameters
            .iter()
            .find(|p| p.location == location && p.name == name)
    }

    pub fn parameters_in(&self, location: ParameterLocation) -> impl Iterator<Item = &Parameter> {
        self.parameters.iter().filter(move |p| p.location == location)
    }
}

/// The `(path, method, Operation)` triple.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecOperation {
    pub path: String,
    pub method: Method,
    pub operation: Operation,
}

impl SpecOperation {
    pub fn id(&self) -> Option<&str> {
        self.operation.id.as_deref()
    }

    /// `GET /pets/{id}` style label for logs and diagnostics.
    pub fn label(&self) -> String {
        format!("{} {}", self.method, self.path)
    }

    /// Every media type named by the request body or a response.
    pub fn content_types(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        if let Some(body) = &self.operation.request_body {
            out.extend(body.content.keys().cloned());
        }
        for response in self.operation.responses.values() {
            out.extend(response.content.keys().cloned());
        }
        out
    }

    /// First media type declared for a response status.
    pub fn response_content_type(&self, status: u16) -> Option<&str> {
        self.operation
            .responses
            .get(&status)
            .and_then(|r| r.content.keys().next())
            .map(String::as_str)
    }
}

/// A parsed OpenAPI document reduced to its operations, in document order.
#[derive(Debug, Clone, Default)]
pub struct Specification {
    pub(crate) title: String,
    pub(crate) version: String,
    pub(crate) operations: Vec<SpecOperation>,
    pub(crate) index: HashMap<String, usize>,
}

impl Specification {
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn operations(&self) -> &[SpecOperation] {
        &self.operations
    }

    pub fn operation(&self, id: &str) -> Option<&SpecOperation> {
        self.index.get(id).map(|&i| &self.operations[i])
    }

    pub fn operation_ids(&self) -> impl Iterator<Item = &str> {
        self.operations.iter().filter_map(SpecOperation::id)
    }

    /// Media types of one operation.
    pub fn content_types(&self, operation: &SpecOperation) -> BTreeSet<String> {
        operation.content_types()
    }
}
