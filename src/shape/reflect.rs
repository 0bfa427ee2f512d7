use super::{Reflect, Shape};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::rc::Rc;
use std::sync::Arc;

/// The Nil sentinel: no body, no parameters, or no response payload.
///
/// Validation and binding skip every position typed as `Nil`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Nil;

impl Reflect for Nil {
    fn shape() -> Shape {
        Shape::Nil
    }
}

impl Reflect for () {
    fn shape() -> Shape {
        Shape::Nil
    }
}

/// Bytes carried as a base64 string (`type: string, format: byte`).
///
/// Deserializes from a base64 string or from a sequence of integers, the latter
/// being what the octet-stream codec produces.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Base64Bytes(pub Vec<u8>);

impl From<Vec<u8>> for Base64Bytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl Reflect for Base64Bytes {
    fn shape() -> Shape {
        Shape::Bytes
    }
}

impl Serialize for Base64Bytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for Base64Bytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Text(String),
            Raw(Vec<u8>),
        }
        match Repr::deserialize(deserializer)? {
            Repr::Text(s) => STANDARD
                .decode(s.as_bytes())
                .map(Base64Bytes)
                .map_err(serde::de::Error::custom),
            Repr::Raw(bytes) => Ok(Base64Bytes(bytes)),
        }
    }
}

macro_rules! reflect_ints {
    ($($ty:ty => $bits:expr, $signed:expr;)*) => {
        $(
            impl Reflect for $ty {
                fn shape() -> Shape {
                    Shape::Int { bits: $bits, signed: $signed }
                }
            }
        )*
    };
}

reflect_ints! {
    i8 => 8, true;
    i16 => 16, true;
    i32 => 32, true;
    i64 => 64, true;
    i128 => 128, true;
    isize => 64, true;
    u8 => 8, false;
    u16 => 16, false;
    u32 => 32, false;
    u64 => 64, false;
    u128 => 128, false;
    usize => 64, false;
}

impl Reflect for f32 {
    fn shape() -> Shape {
        Shape::Float { bits: 32 }
    }
}

impl Reflect for f64 {
    fn shape() -> Shape {
        Shape::Float { bits: 64 }
    }
}

impl Reflect for bool {
    fn shape() -> Shape {
        Shape::Bool
    }
}

impl Reflect for String {
    fn shape() -> Shape {
        Shape::String
    }
}

impl Reflect for str {
    fn shape() -> Shape {
        Shape::String
    }
}

impl Reflect for char {
    fn shape() -> Shape {
        Shape::String
    }
}

impl Reflect for std::borrow::Cow<'_, str> {
    fn shape() -> Shape {
        Shape::String
    }
}

impl<T: Reflect + ?Sized> Reflect for &T {
    fn shape() -> Shape {
        T::shape()
    }
}

impl<T: Reflect + ?Sized> Reflect for Box<T> {
    fn shape() -> Shape {
        T::shape()
    }
}

impl<T: Reflect + ?Sized> Reflect for Arc<T> {
    fn shape() -> Shape {
        T::shape()
    }
}

impl<T: Reflect + ?Sized> Reflect for Rc<T> {
    fn shape() -> Shape {
        T::shape()
    }
}

impl<T: Reflect> Reflect for Option<T> {
    fn shape() -> Shape {
        Shape::Optional(Box::new(T::shape()))
    }
}

impl<T: Reflect> Reflect for Vec<T> {
    fn shape() -> Shape {
        Shape::Seq(Box::new(T::shape()))
    }
}

impl<T: Reflect> Reflect for [T] {
    fn shape() -> Shape {
        Shape::Seq(Box::new(T::shape()))
    }
}

impl<T: Reflect> Reflect for VecDeque<T> {
    fn shape() -> Shape {
        Shape::Seq(Box::new(T::shape()))
    }
}

impl<T: Reflect, S> Reflect for HashSet<T, S> {
    fn shape() -> Shape {
        Shape::Seq(Box::new(T::shape()))
    }
}

impl<T: Reflect> Reflect for BTreeSet<T> {
    fn shape() -> Shape {
        Shape::Seq(Box::new(T::shape()))
    }
}

impl<T: Reflect, const N: usize> Reflect for [T; N] {
    fn shape() -> Shape {
        Shape::Array(Box::new(T::shape()), N)
    }
}

impl<K: Reflect, V: Reflect, S> Reflect for HashMap<K, V, S> {
    fn shape() -> Shape {
        Shape::Map {
            key: Box::new(K::shape()),
            value: Box::new(V::shape()),
        }
    }
}

impl<K: Reflect, V: Reflect> Reflect for BTreeMap<K, V> {
    fn shape() -> Shape {
        Shape::Map {
            key: Box::new(K::shape()),
            value: Box::new(V::shape()),
        }
    }
}

impl Reflect for serde_json::Value {
    fn shape() -> Shape {
        Shape::Any
    }
}

impl Reflect for serde_json::Map<String, serde_json::Value> {
    fn shape() -> Shape {
        Shape::Map {
            key: Box::new(Shape::String),
            value: Box::new(Shape::Any),
        }
    }
}

impl Reflect for uuid::Uuid {
    fn shape() -> Shape {
        Shape::Uuid
    }
}

impl<Tz: chrono::TimeZone> Reflect for chrono::DateTime<Tz> {
    fn shape() -> Shape {
        Shape::Time
    }
}

impl Reflect for chrono::NaiveDateTime {
    fn shape() -> Shape {
        Shape::Time
    }
}

impl Reflect for chrono::NaiveTime {
    fn shape() -> Shape {
        Shape::Time
    }
}

impl Reflect for chrono::NaiveDate {
    fn shape() -> Shape {
        Shape::Text(std::any::type_name::<Self>())
    }
}

macro_rules! reflect_text {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Reflect for $ty {
                fn shape() -> Shape {
                    Shape::Text(std::any::type_name::<Self>())
                }
            }
        )*
    };
}

reflect_text!(IpAddr, Ipv4Addr, Ipv6Addr, crate::ids::RequestId);
