//! # Shape Module
//!
//! Compile-time descriptions of the wire shape of handler types.
//!
//! ## Overview
//!
//! Rust has no runtime reflection, so every type that crosses the router boundary
//! (request bodies, parameter structs, response envelopes) describes itself through
//! the [`Reflect`] trait. The description is a [`Shape`]: a closed tree of
//! primitives, sequences, maps, structs and unions that mirrors how `serde_json`
//! serializes the type.
//!
//! Shapes are produced by `#[derive(Reflect)]` for user types and by the
//! implementations in this module for std, `uuid` and `chrono` types. Struct and
//! union members are evaluated lazily so recursive types are representable.
//!
//! ## Parameter Tags
//!
//! Parameter structs mark their fields with `#[oas(path = "...")]` or
//! `#[oas(query = "...")]`. A field takes part in binding when it is `pub` and its
//! tag is not `"-"`; a missing tag falls back to the field's serde key. Fields
//! marked `#[serde(flatten)]` whose type is a struct are expanded recursively.
//!
//! ## Response Envelopes
//!
//! A response envelope is an enum whose variants carry `#[oas(status = N)]`.
//! [`HandlerResponses::from_shape`] turns its union shape into the
//! status→variant table and collects malformed or duplicate status tags.

mod reflect;

use std::collections::BTreeMap;
use std::fmt;

pub use reflect::{Base64Bytes, Nil};

/// Types that can describe their own wire shape.
///
/// Implemented for common std types; derive it for your own types with
/// `#[derive(oasrouter::Reflect)]`.
pub trait Reflect {
    fn shape() -> Shape;
}

/// The wire shape of a Rust type as seen through `serde_json`.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// The "no body / no parameters / no payload" sentinel.
    Nil,
    /// Accepts any JSON value (`serde_json::Value`).
    Any,
    Bool,
    Int {
        bits: u8,
        signed: bool,
    },
    Float {
        bits: u8,
    },
    String,
    /// A type that marshals itself as text (string enums, `IpAddr`, dates).
    Text(&'static str),
    /// The canonical UUID type.
    Uuid,
    /// The canonical date-time type.
    Time,
    /// A base64 encoded byte sequence.
    Bytes,
    Seq(Box<Shape>),
    Array(Box<Shape>, usize),
    Map {
        key: Box<Shape>,
        value: Box<Shape>,
    },
    /// `Option<T>`: the pointer equivalent, unwrapped before validation.
    Optional(Box<Shape>),
    Struct(StructShape),
    Union(UnionShape),
}

/// A struct with named fields.
#[derive(Clone, Copy)]
pub struct StructShape {
    pub name: &'static str,
    pub fields: fn() -> Vec<Field>,
}

/// A sum type: either an untagged enum or a response envelope.
#[derive(Clone, Copy)]
pub struct UnionShape {
    pub name: &'static str,
    pub variants: fn() -> Vec<Variant>,
}

/// One named struct field.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Rust identifier of the field.
    pub ident: &'static str,
    /// JSON key, `None` when serde skips the field.
    pub json: Option<&'static str>,
    pub flatten: bool,
    /// Whether the field is `pub`.
    pub public: bool,
    pub path: Option<&'static str>,
    pub query: Option<&'static str>,
    pub shape: Shape,
}

/// One enum variant.
#[derive(Debug, Clone, PartialEq)]
pub struct Variant {
    pub name: &'static str,
    /// Raw `#[oas(status)]` tag, validated by [`parse_status`].
    pub status: Option<&'static str>,
    pub shape: Shape,
}

impl StructShape {
    pub fn fields(&self) -> Vec<Field> {
        (self.fields)()
    }

    /// JSON-visible fields with flattened structs expanded in place.
    pub fn json_fields(&self) -> Vec<JsonField> {
        let mut out = Vec::new();
        collect_json_fields(self, &mut out, 0);
        out
    }

    /// Fields taking part in path or query binding.
    pub fn param_fields(&self, location: ParamLocation) -> Vec<ParamField> {
        let mut out = Vec::new();
        collect_param_fields(self, location, &mut out, 0);
        out
    }

    /// Short type name without the module path.
    pub fn short_name(&self) -> &'static str {
        short_type_name(self.name)
    }
}

impl UnionShape {
    pub fn variants(&self) -> Vec<Variant> {
        (self.variants)()
    }

    pub fn short_name(&self) -> &'static str {
        short_type_name(self.name)
    }
}

impl PartialEq for StructShape {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl PartialEq for UnionShape {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl fmt::Debug for StructShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StructShape").field(&self.name).finish()
    }
}

impl fmt::Debug for UnionShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("UnionShape").field(&self.name).finish()
    }
}

// Flatten chains deeper than this are treated as a recursive type and cut.
const MAX_FLATTEN_DEPTH: usize = 16;

/// A JSON-visible struct member after flattening.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonField {
    pub key: &'static str,
    pub ident: &'static str,
    pub shape: Shape,
}

fn collect_json_fields(shape: &StructShape, out: &mut Vec<JsonField>, depth: usize) {
    if depth > MAX_FLATTEN_DEPTH {
        return;
    }
    for field in shape.fields() {
        let Some(key) = field.json else {
            continue;
        };
        if field.flatten {
            if let Shape::Struct(inner) = field.shape.unwrap_optional() {
                collect_json_fields(inner, out, depth + 1);
                continue;
            }
        }
        out.push(JsonField {
            key,
            ident: field.ident,
            shape: field.shape,
        });
    }
}

/// Where a parameter struct is bound from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamLocation {
    Path,
    Query,
}

impl fmt::Display for ParamLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamLocation::Path => write!(f, "path"),
            ParamLocation::Query => write!(f, "query"),
        }
    }
}

/// A parameter-bound struct field.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamField {
    /// Parameter name as it appears in the specification.
    pub name: String,
    /// Key the value is stored under when deserializing the struct.
    pub key: &'static str,
    pub ident: &'static str,
    pub shape: Shape,
}

fn collect_param_fields(
    shape: &StructShape,
    location: ParamLocation,
    out: &mut Vec<ParamField>,
    depth: usize,
) {
    if depth > MAX_FLATTEN_DEPTH {
        return;
    }
    for field in shape.fields() {
        if !field.public {
            continue;
        }
        let Some(key) = field.json else {
            continue;
        };
        if field.flatten {
            // Embedded structs contribute their own tagged fields; collisions are
            // kept so each field binds independently.
            if let Shape::Struct(inner) = field.shape.unwrap_optional() {
                collect_param_fields(inner, location, out, depth + 1);
            }
            continue;
        }
        let tag = match location {
            ParamLocation::Path => field.path,
            ParamLocation::Query => field.query,
        };
        let name = match tag {
            Some("-") => continue,
            Some(tag) => tag,
            None => key,
        };
        out.push(ParamField {
            name: name.to_string(),
            key,
            ident: field.ident,
            shape: field.shape,
        });
    }
}

impl Shape {
    pub fn is_nil(&self) -> bool {
        matches!(self, Shape::Nil)
    }

    /// Strip every `Optional` layer.
    pub fn unwrap_optional(&self) -> &Shape {
        let mut shape = self;
        while let Shape::Optional(inner) = shape {
            shape = inner;
        }
        shape
    }

    /// Sequence-like shapes bind repeated query values.
    pub fn is_sequence(&self) -> bool {
        matches!(self.unwrap_optional(), Shape::Seq(_) | Shape::Array(..))
    }

    /// `Vec<u8>`, `[u8; N]` and [`Base64Bytes`].
    pub fn is_byte_sequence(&self) -> bool {
        match self {
            Shape::Bytes => true,
            Shape::Seq(elem) => matches!(**elem, Shape::Int { bits: 8, signed: false }),
            _ => false,
        }
    }

    /// `[u8; 16]` converts losslessly into the canonical UUID type.
    pub fn is_uuid_like(&self) -> bool {
        match self {
            Shape::Uuid => true,
            Shape::Array(elem, 16) => matches!(**elem, Shape::Int { bits: 8, signed: false }),
            _ => false,
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Nil => write!(f, "Nil"),
            Shape::Any => write!(f, "any"),
            Shape::Bool => write!(f, "bool"),
            Shape::Int { bits, signed } => {
                write!(f, "{}{}", if *signed { "i" } else { "u" }, bits)
            }
            Shape::Float { bits } => write!(f, "f{bits}"),
            Shape::String => write!(f, "String"),
            Shape::Text(name) => write!(f, "{}", short_type_name(name)),
            Shape::Uuid => write!(f, "Uuid"),
            Shape::Time => write!(f, "DateTime"),
            Shape::Bytes => write!(f, "bytes"),
            Shape::Seq(elem) => write!(f, "Vec<{elem}>"),
            Shape::Array(elem, len) => write!(f, "[{elem}; {len}]"),
            Shape::Map { key, value } => write!(f, "Map<{key}, {value}>"),
            Shape::Optional(inner) => write!(f, "Option<{inner}>"),
            Shape::Struct(s) => write!(f, "{}", s.short_name()),
            Shape::Union(u) => write!(f, "{}", u.short_name()),
        }
    }
}

/// Drop module paths from a `std::any::type_name` string, keeping generics readable.
pub fn short_type_name(full: &str) -> &str {
    let head = full.split('<').next().unwrap_or(full);
    match head.rfind("::") {
        Some(idx) => &full[idx + 2..],
        None => full,
    }
}

/// Parse a status tag: a decimal integer in `[100, 600)`.
pub fn parse_status(tag: &str) -> Option<u16> {
    let tag = tag.trim();
    if tag.is_empty() || !tag.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let status: u16 = tag.parse().ok()?;
    (100..600).contains(&status).then_some(status)
}

/// Declared body and parameter types of one handler.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestTypes {
    pub body: Shape,
    pub path: Shape,
    pub query: Shape,
}

impl RequestTypes {
    pub fn nil() -> Self {
        Self {
            body: Shape::Nil,
            path: Shape::Nil,
            query: Shape::Nil,
        }
    }

    /// Parameter fields for one location; empty for `Nil` or non-struct shapes.
    pub fn param_fields(&self, location: ParamLocation) -> Vec<ParamField> {
        let shape = match location {
            ParamLocation::Path => &self.path,
            ParamLocation::Query => &self.query,
        };
        match shape.unwrap_optional() {
            Shape::Struct(s) => s.param_fields(location),
            _ => Vec::new(),
        }
    }
}

/// One status-tagged envelope variant.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseArm {
    pub status: u16,
    pub variant: &'static str,
    pub shape: Shape,
}

impl ResponseArm {
    pub fn is_nil(&self) -> bool {
        self.shape.is_nil()
    }
}

/// A status tag that could not be turned into a table entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusTagProblem {
    Invalid {
        variant: &'static str,
        tag: &'static str,
    },
    Duplicate {
        variant: &'static str,
        first: &'static str,
        status: u16,
    },
    Missing {
        variant: &'static str,
    },
}

impl fmt::Display for StatusTagProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusTagProblem::Invalid { variant, tag } => write!(
                f,
                "variant {variant} has status tag {tag:?}, expected a decimal integer in [100, 600)"
            ),
            StatusTagProblem::Duplicate {
                variant,
                first,
                status,
            } => write!(
                f,
                "variant {variant} reuses status {status} already taken by {first}"
            ),
            StatusTagProblem::Missing { variant } => {
                write!(f, "variant {variant} has no status tag")
            }
        }
    }
}

/// The status→variant table of a response envelope.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HandlerResponses {
    pub envelope: Option<&'static str>,
    pub arms: BTreeMap<u16, ResponseArm>,
    pub problems: Vec<StatusTagProblem>,
}

impl HandlerResponses {
    /// Build the table from an envelope shape. `Nil` and non-union shapes have no arms.
    pub fn from_shape(shape: &Shape) -> Self {
        let Shape::Union(union) = shape else {
            return Self::default();
        };
        let mut out = Self {
            envelope: Some(union.short_name()),
            ..Self::default()
        };
        for variant in union.variants() {
            let Some(tag) = variant.status else {
                out.problems.push(StatusTagProblem::Missing {
                    variant: variant.name,
                });
                continue;
            };
            let Some(status) = parse_status(tag) else {
                out.problems.push(StatusTagProblem::Invalid {
                    variant: variant.name,
                    tag,
                });
                continue;
            };
            if let Some(existing) = out.arms.get(&status) {
                out.problems.push(StatusTagProblem::Duplicate {
                    variant: variant.name,
                    first: existing.variant,
                    status,
                });
                continue;
            }
            out.arms.insert(
                status,
                ResponseArm {
                    status,
                    variant: variant.name,
                    shape: variant.shape,
                },
            );
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.arms.is_empty()
    }

    pub fn get(&self, status: u16) -> Option<&ResponseArm> {
        self.arms.get(&status)
    }

    pub fn statuses(&self) -> impl Iterator<Item = u16> + '_ {
        self.arms.keys().copied()
    }
}
