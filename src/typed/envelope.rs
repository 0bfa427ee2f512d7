use crate::shape::{Nil, Reflect, Shape, UnionShape, Variant};
use serde::Serialize;
use serde_json::Value;

/// A response envelope: a value that knows its HTTP status.
///
/// Derive it on an enum whose variants carry `#[oas(status = N)]`:
///
/// ```rust,ignore
/// #[derive(Serialize, Reflect, Envelope)]
/// enum GetPetResponse {
///     #[oas(status = 200)]
///     Ok(Pet),
///     #[oas(status = 404)]
///     NotFound,
/// }
/// ```
///
/// Exactly one variant is populated per response; payload-less variants
/// produce an empty body.
pub trait Envelope: Reflect + Send + 'static {
    /// Status of the populated variant, `0` when its tag is malformed.
    fn status(&self) -> u16;

    /// The populated variant's payload, `None` for payload-less variants.
    fn into_payload(self) -> Result<Option<Value>, serde_json::Error>;
}

/// The envelope of middlewares that never produce a typed response.
impl Envelope for Nil {
    fn status(&self) -> u16 {
        0
    }

    fn into_payload(self) -> Result<Option<Value>, serde_json::Error> {
        Ok(None)
    }
}

/// Single-variant envelope answering `200 OK` with `T`.
#[derive(Debug, Clone, PartialEq)]
pub struct OkEnvelope<T>(pub T);

fn ok_variants<T: Reflect>() -> Vec<Variant> {
    vec![Variant {
        name: "Ok",
        status: Some("200"),
        shape: T::shape(),
    }]
}

impl<T: Reflect> Reflect for OkEnvelope<T> {
    fn shape() -> Shape {
        Shape::Union(UnionShape {
            name: std::any::type_name::<Self>(),
            variants: ok_variants::<T>,
        })
    }
}

impl<T> Envelope for OkEnvelope<T>
where
    T: Serialize + Reflect + Send + 'static,
{
    fn status(&self) -> u16 {
        200
    }

    fn into_payload(self) -> Result<Option<Value>, serde_json::Error> {
        serde_json::to_value(self.0).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::HandlerResponses;

    #[test]
    fn test_ok_envelope_table() {
        let table = HandlerResponses::from_shape(&OkEnvelope::<String>::shape());
        assert!(table.problems.is_empty());
        assert_eq!(table.statuses().collect::<Vec<_>>(), vec![200]);
        assert_eq!(table.get(200).map(|a| a.shape.clone()), Some(Shape::String));
    }

    #[test]
    fn test_nil_envelope_is_empty() {
        assert!(HandlerResponses::from_shape(&Nil::shape()).is_empty());
        assert_eq!(Nil.into_payload().unwrap(), None);
    }
}
