//! Structural compatibility between a [`Shape`] and a [`Schema`].
//!
//! The question answered is: can values described by the schema be decoded into
//! the type and encoded back without loss? The rules, in evaluation order:
//!
//! 1. `Any` and `Nil` targets are always compatible; `Option<T>` unwraps to `T`.
//! 2. Combinators: every `allOf` entry must match; `oneOf` and `anyOf` are
//!    matched against the whole type, or variant by variant for sum types;
//!    `not` is strict negation.
//! 3. When `type` is set, the type must satisfy one of the listed types (see
//!    [`kind_matches`]); arrays recurse into `items`, objects into properties.
//!
//! Failures are reported into a [`Diagnostics`] sink with a JSON pointer into
//! the schema. Combinator matching runs silent probes so only the combinator's
//! own verdict is reported.

use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics, Severity};
use crate::shape::{Shape, StructShape, UnionShape};
use crate::spec::{AdditionalProperties, Schema, SchemaType};
use std::panic::Location;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    OneOf,
    AnyOf,
}

impl Combinator {
    fn keyword(&self) -> &'static str {
        match self {
            Combinator::OneOf => "oneOf",
            Combinator::AnyOf => "anyOf",
        }
    }
}

/// Checks one type against one schema, reporting findings at a fixed severity.
pub struct SchemaValidator<'a> {
    sink: &'a mut Diagnostics,
    severity: Severity,
    operation: Option<String>,
    context: String,
    source: Option<&'static Location<'static>>,
}

impl<'a> SchemaValidator<'a> {
    pub fn new(sink: &'a mut Diagnostics, severity: Severity) -> Self {
        Self {
            sink,
            severity,
            operation: None,
            context: String::new(),
            source: None,
        }
    }

    pub fn operation(mut self, id: impl Into<String>) -> Self {
        self.operation = Some(id.into());
        self
    }

    /// Prefix for diagnostic locations, e.g. `request body application/json`.
    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    pub fn source(mut self, source: Option<&'static Location<'static>>) -> Self {
        self.source = source;
        self
    }

    /// Validate and report. Returns whether the pair is compatible, independent
    /// of the severity findings are reported at.
    pub fn check(&mut self, shape: &Shape, schema: &Schema) -> bool {
        self.validate(shape, schema, "#")
    }

    fn report(&mut self, kind: DiagnosticKind, ptr: &str, subject: String, message: String) {
        let location = if self.context.is_empty() {
            ptr.to_string()
        } else {
            format!("{} {ptr}", self.context)
        };
        let mut diagnostic = Diagnostic::new(self.severity, kind, message)
            .location(location)
            .subject(subject)
            .source(self.source);
        if let Some(op) = &self.operation {
            diagnostic = diagnostic.operation(op.clone());
        }
        self.sink.report(diagnostic);
    }

    fn validate(&mut self, shape: &Shape, schema: &Schema, ptr: &str) -> bool {
        let shape = shape.unwrap_optional();
        if matches!(shape, Shape::Any | Shape::Nil) {
            return true;
        }

        let mut ok = true;
        for (i, sub) in schema.all_of.iter().enumerate() {
            ok &= self.validate(shape, sub, &format!("{ptr}/allOf/{i}"));
        }
        if !schema.one_of.is_empty() {
            ok &= self.alternatives(shape, &schema.one_of, ptr, Combinator::OneOf);
        }
        if !schema.any_of.is_empty() {
            ok &= self.alternatives(shape, &schema.any_of, ptr, Combinator::AnyOf);
        }
        if let Some(not) = &schema.not {
            if probe(shape, not) {
                self.report(
                    DiagnosticKind::NegatedSchemaMatch,
                    &format!("{ptr}/not"),
                    shape.to_string(),
                    format!("{shape} is compatible with the schema under `not`"),
                );
                ok = false;
            }
        }

        if !schema.types.is_empty() {
            ok &= self.typed(shape, schema, ptr);
        } else if schema.has_object_keywords()
            && matches!(shape, Shape::Struct(_) | Shape::Map { .. })
        {
            ok &= self.object(shape, schema, ptr);
        }
        ok
    }

    fn typed(&mut self, shape: &Shape, schema: &Schema, ptr: &str) -> bool {
        let shape = shape.unwrap_optional();
        match shape {
            Shape::Any | Shape::Nil => return true,
            // Every arm of a sum type must fit the declared type.
            Shape::Union(union) => {
                let mut ok = true;
                for variant in union.variants() {
                    ok &= self.typed(&variant.shape, schema, ptr);
                }
                return ok;
            }
            _ => {}
        }

        let format = schema.format.as_deref();
        let matched = schema
            .types
            .iter()
            .copied()
            .find(|t| kind_matches(shape, *t, format));
        match matched {
            None => {
                self.report(
                    DiagnosticKind::IncompatibleType,
                    ptr,
                    shape.to_string(),
                    format!("{shape} is not compatible with {}", schema.describe()),
                );
                false
            }
            Some(SchemaType::Array) => self.array(shape, schema, ptr),
            Some(SchemaType::Object) => self.object(shape, schema, ptr),
            Some(_) => true,
        }
    }

    fn array(&mut self, shape: &Shape, schema: &Schema, ptr: &str) -> bool {
        let elem = match shape {
            Shape::Seq(elem) | Shape::Array(elem, _) => elem,
            _ => return true,
        };
        match &schema.items {
            Some(items) => self.validate(elem, items, &format!("{ptr}/items")),
            None => true,
        }
    }

    fn object(&mut self, shape: &Shape, schema: &Schema, ptr: &str) -> bool {
        match shape {
            Shape::Struct(s) => self.struct_object(s, schema, ptr),
            Shape::Map { key, value } => self.map_object(key, value, schema, ptr),
            _ => true,
        }
    }

    fn struct_object(&mut self, s: &StructShape, schema: &Schema, ptr: &str) -> bool {
        let fields = s.json_fields();
        let mut ok = true;

        for (name, sub) in &schema.properties {
            let child = format!("{ptr}/properties/{}", escape_pointer(name));
            match fields.iter().find(|f| f.key == name) {
                Some(field) => ok &= self.validate(&field.shape, sub, &child),
                None => {
                    self.report(
                        DiagnosticKind::UnmappedProperty,
                        &child,
                        s.short_name().to_string(),
                        format!("property '{name}' has no field in {}", s.short_name()),
                    );
                    ok = false;
                }
            }
        }

        for field in fields
            .iter()
            .filter(|f| !schema.properties.contains_key(f.key))
        {
            match &schema.additional_properties {
                None | Some(AdditionalProperties::Allowed(true)) => {}
                Some(AdditionalProperties::Schema(sub)) => {
                    ok &= self.validate(&field.shape, sub, &format!("{ptr}/additionalProperties"));
                }
                Some(AdditionalProperties::Allowed(false)) => {
                    self.report(
                        DiagnosticKind::UnexpectedField,
                        ptr,
                        format!("{}.{}", s.short_name(), field.ident),
                        format!(
                            "field '{}' of {} is not a declared property and additionalProperties is false",
                            field.key,
                            s.short_name()
                        ),
                    );
                    ok = false;
                }
            }
        }
        ok
    }

    fn map_object(&mut self, key: &Shape, value: &Shape, schema: &Schema, ptr: &str) -> bool {
        let key = key.unwrap_optional();
        if !matches!(
            key,
            Shape::String | Shape::Int { .. } | Shape::Text(_) | Shape::Uuid
        ) {
            self.report(
                DiagnosticKind::UnsupportedMapKey,
                ptr,
                key.to_string(),
                format!("map key type {key} cannot represent JSON object keys"),
            );
            return false;
        }

        let mut ok = true;
        for (name, sub) in &schema.properties {
            let child = format!("{ptr}/properties/{}", escape_pointer(name));
            if !key_accepts(key, name) {
                self.report(
                    DiagnosticKind::UnsupportedMapKey,
                    &child,
                    key.to_string(),
                    format!("property '{name}' cannot be represented as map key type {key}"),
                );
                ok = false;
                continue;
            }
            ok &= self.validate(value, sub, &child);
        }
        if let Some(AdditionalProperties::Schema(sub)) = &schema.additional_properties {
            ok &= self.validate(value, sub, &format!("{ptr}/additionalProperties"));
        }
        ok
    }

    fn alternatives(
        &mut self,
        shape: &Shape,
        alts: &[Schema],
        ptr: &str,
        combinator: Combinator,
    ) -> bool {
        let keyword = combinator.keyword();
        let ptr = format!("{ptr}/{keyword}");
        match shape {
            Shape::Union(union) => self.union_alternatives(union, alts, &ptr, combinator),
            _ => {
                let hits = alts.iter().filter(|alt| probe(shape, alt)).count();
                match (hits, combinator) {
                    (0, _) => {
                        self.report(
                            DiagnosticKind::NoMatchingAlternative,
                            &ptr,
                            shape.to_string(),
                            format!(
                                "{shape} matches none of the {} {keyword} alternatives",
                                alts.len()
                            ),
                        );
                        false
                    }
                    (1, _) | (_, Combinator::AnyOf) => true,
                    (n, Combinator::OneOf) => {
                        self.report(
                            DiagnosticKind::AmbiguousAlternative,
                            &ptr,
                            shape.to_string(),
                            format!("{shape} matches {n} oneOf alternatives, expected exactly one"),
                        );
                        false
                    }
                }
            }
        }
    }

    fn union_alternatives(
        &mut self,
        union: &UnionShape,
        alts: &[Schema],
        ptr: &str,
        combinator: Combinator,
    ) -> bool {
        let keyword = combinator.keyword();
        let name = union.short_name();
        // Payload-less arms carry no value and take no part in matching.
        let variants: Vec<_> = union
            .variants()
            .into_iter()
            .filter(|v| !v.shape.is_nil())
            .collect();
        let mut covered = vec![false; variants.len()];
        let mut ok = true;

        for (j, alt) in alts.iter().enumerate() {
            let hits: Vec<usize> = variants
                .iter()
                .enumerate()
                .filter(|(_, v)| probe(&v.shape, alt))
                .map(|(i, _)| i)
                .collect();
            for &i in &hits {
                covered[i] = true;
            }
            let alt_ptr = format!("{ptr}/{j}");
            match (hits.len(), combinator) {
                (0, _) => {
                    self.report(
                        DiagnosticKind::NoMatchingAlternative,
                        &alt_ptr,
                        name.to_string(),
                        format!("{} matches no variant of {name}", alt.describe()),
                    );
                    ok = false;
                }
                (1, _) | (_, Combinator::AnyOf) => {}
                (n, Combinator::OneOf) => {
                    let names: Vec<&str> = hits.iter().map(|&i| variants[i].name).collect();
                    self.report(
                        DiagnosticKind::AmbiguousAlternative,
                        &alt_ptr,
                        name.to_string(),
                        format!(
                            "{} matches {n} variants of {name} ({}), expected exactly one",
                            alt.describe(),
                            names.join(", ")
                        ),
                    );
                    ok = false;
                }
            }
        }

        for (variant, _) in variants.iter().zip(&covered).filter(|(_, c)| !**c) {
            self.report(
                DiagnosticKind::UncoveredVariant,
                ptr,
                format!("{name}::{}", variant.name),
                format!(
                    "variant {} ({}) of {name} matches no {keyword} alternative",
                    variant.name, variant.shape
                ),
            );
            ok = false;
        }
        ok
    }
}

/// Silent compatibility check.
pub fn probe(shape: &Shape, schema: &Schema) -> bool {
    let mut sink = Diagnostics::silent();
    SchemaValidator::new(&mut sink, Severity::Error).check(shape, schema)
}

/// Whether a type satisfies one `type`/`format` combination.
///
/// | type / format                  | accepted shapes                          |
/// |--------------------------------|------------------------------------------|
/// | boolean                        | `bool`                                   |
/// | integer                        | any integer                              |
/// | integer int32 / int64          | 32-bit / 64-bit integers                 |
/// | number                         | any integer or float                     |
/// | number float / double          | `f32` / `f64`                            |
/// | string                         | `String`, text types                     |
/// | string uuid                    | also `Uuid`, `[u8; 16]`                  |
/// | string date-time / time        | also chrono date-times                   |
/// | string byte / binary           | also byte sequences                      |
/// | array                          | sequences and fixed arrays               |
/// | object                         | structs and maps                         |
pub fn kind_matches(shape: &Shape, ty: SchemaType, format: Option<&str>) -> bool {
    match ty {
        SchemaType::Boolean => matches!(shape, Shape::Bool),
        SchemaType::Integer => match (shape, format) {
            (Shape::Int { bits, .. }, Some("int32")) => *bits == 32,
            (Shape::Int { bits, .. }, Some("int64")) => *bits == 64,
            (Shape::Int { .. }, _) => true,
            _ => false,
        },
        SchemaType::Number => match (shape, format) {
            (Shape::Float { bits }, Some("float")) => *bits == 32,
            (Shape::Float { bits }, Some("double")) => *bits == 64,
            (Shape::Int { .. }, Some("float" | "double")) => false,
            (Shape::Int { .. } | Shape::Float { .. }, _) => true,
            _ => false,
        },
        SchemaType::String => match shape {
            Shape::String | Shape::Text(_) => true,
            _ => match format {
                Some("uuid") => shape.is_uuid_like(),
                Some("date-time" | "time") => matches!(shape, Shape::Time),
                Some("byte" | "binary") => shape.is_byte_sequence(),
                _ => false,
            },
        },
        SchemaType::Array => matches!(shape, Shape::Seq(_) | Shape::Array(..)),
        SchemaType::Object => matches!(shape, Shape::Struct(_) | Shape::Map { .. }),
    }
}

fn key_accepts(key: &Shape, name: &str) -> bool {
    match key {
        Shape::String | Shape::Text(_) => true,
        Shape::Int { signed: true, .. } => name.parse::<i128>().is_ok(),
        Shape::Int { signed: false, .. } => name.parse::<u128>().is_ok(),
        Shape::Uuid => uuid::Uuid::parse_str(name).is_ok(),
        _ => false,
    }
}

fn escape_pointer(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}
