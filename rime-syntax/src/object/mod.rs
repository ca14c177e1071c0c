//! The PDF object model.
//!
//! Unlike a zero-copy reader, all objects here own their data. Dictionaries,
//! arrays and stream payloads are shared behind an `Arc`, so cloning an object
//! is cheap and the object graph can be handed to several threads at once.

use log::debug;
use std::fmt;
use std::sync::Arc;

pub mod dict;
mod name;
pub mod stream;
pub mod string;

pub use dict::Dict;
pub use name::Name;
pub use stream::Stream;
pub use string::{HexString, LiteralString, PdfString};

/// The identifier of an indirect object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjRef {
    /// The object number.
    pub obj_num: i32,
    /// The generation number.
    pub gen_num: i32,
}

impl ObjRef {
    /// Create a new object reference.
    pub const fn new(obj_num: i32, gen_num: i32) -> Self {
        Self { obj_num, gen_num }
    }
}

impl fmt::Display for ObjRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} R", self.obj_num, self.gen_num)
    }
}

/// A PDF number.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Number {
    /// An integer.
    Integer(i64),
    /// A real number.
    Real(f64),
}

impl Number {
    /// Returns the number as a f64.
    pub fn as_f64(&self) -> f64 {
        match *self {
            Self::Integer(i) => i as f64,
            Self::Real(r) => r,
        }
    }

    /// Returns the number as a f32.
    pub fn as_f32(&self) -> f32 {
        self.as_f64() as f32
    }

    /// Returns the number as an i64, truncating real numbers.
    pub fn as_i64(&self) -> i64 {
        match *self {
            Self::Integer(i) => i,
            Self::Real(r) => {
                let res = r as i64;

                if r.trunc() != r {
                    debug!("float {r} was truncated to {res}");
                }

                res
            }
        }
    }
}

/// A PDF array.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Array(Arc<[Object]>);

impl Array {
    /// Create a new array.
    pub fn new(items: Vec<Object>) -> Self {
        Self(items.into())
    }

    /// The number of elements.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the array has no elements.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get the raw element at the given index.
    pub fn get_raw(&self, index: usize) -> Option<&Object> {
        self.0.get(index)
    }

    /// Get the element at the given index, converted to `T`.
    ///
    /// References are not resolved, use [`crate::XRef::resolve`] for that.
    pub fn get<T: FromObject>(&self, index: usize) -> Option<T> {
        T::from_object(self.0.get(index)?)
    }

    /// Iterate over the raw elements.
    pub fn iter(&self) -> impl Iterator<Item = &Object> {
        self.0.iter()
    }

    /// Iterate over all elements that can be converted to `T`.
    pub fn iter_as<'a, T: FromObject + 'a>(&'a self) -> impl Iterator<Item = T> + 'a {
        self.0.iter().filter_map(T::from_object)
    }

    /// Returns the elements as a slice.
    pub fn as_slice(&self) -> &[Object] {
        &self.0
    }
}

impl FromIterator<Object> for Array {
    fn from_iter<I: IntoIterator<Item = Object>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<Vec<Name>> for Array {
    fn from(value: Vec<Name>) -> Self {
        value.into_iter().map(Object::Name).collect()
    }
}

/// A PDF object.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum Object {
    /// The null object.
    #[default]
    Null,
    /// A boolean.
    Boolean(bool),
    /// A number.
    Number(Number),
    /// A string.
    String(PdfString),
    /// A name.
    Name(Name),
    /// An array.
    Array(Array),
    /// A dictionary.
    Dict(Dict),
    /// A stream.
    Stream(Stream),
    /// A reference to an indirect object.
    Reference(ObjRef),
}

impl Object {
    /// Try to convert the object into `T`.
    pub fn cast<T: FromObject>(&self) -> Option<T> {
        T::from_object(self)
    }

    /// Returns the object as a dictionary, also accepting the dictionary of a stream.
    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            Self::Dict(d) => Some(d),
            Self::Stream(s) => Some(s.dict()),
            _ => None,
        }
    }

    /// Returns the object as an array.
    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Returns the object as a number.
    pub fn as_number(&self) -> Option<Number> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the object as a name.
    pub fn as_name(&self) -> Option<&Name> {
        match self {
            Self::Name(n) => Some(n),
            _ => None,
        }
    }

    /// Returns the object as a string.
    pub fn as_string(&self) -> Option<&PdfString> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Whether the object is the null object.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

/// Conversion from a PDF object into a Rust type.
pub trait FromObject: Sized {
    /// Try to convert the object.
    fn from_object(object: &Object) -> Option<Self>;
}

impl FromObject for Object {
    fn from_object(object: &Object) -> Option<Self> {
        Some(object.clone())
    }
}

impl FromObject for bool {
    fn from_object(object: &Object) -> Option<Self> {
        match object {
            Object::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

impl FromObject for Number {
    fn from_object(object: &Object) -> Option<Self> {
        object.as_number()
    }
}

impl FromObject for f64 {
    fn from_object(object: &Object) -> Option<Self> {
        Some(object.as_number()?.as_f64())
    }
}

impl FromObject for f32 {
    fn from_object(object: &Object) -> Option<Self> {
        Some(object.as_number()?.as_f32())
    }
}

macro_rules! int_from_object {
    ($($t:ty),*) => {
        $(
            impl FromObject for $t {
                fn from_object(object: &Object) -> Option<Self> {
                    object.as_number()?.as_i64().try_into().ok()
                }
            }
        )*
    };
}

int_from_object!(i64, i32, u32, u16, u8, usize);

impl FromObject for Name {
    fn from_object(object: &Object) -> Option<Self> {
        object.as_name().cloned()
    }
}

impl FromObject for PdfString {
    fn from_object(object: &Object) -> Option<Self> {
        object.as_string().cloned()
    }
}

impl FromObject for Array {
    fn from_object(object: &Object) -> Option<Self> {
        object.as_array().cloned()
    }
}

impl FromObject for Dict {
    fn from_object(object: &Object) -> Option<Self> {
        match object {
            Object::Dict(d) => Some(d.clone()),
            _ => None,
        }
    }
}

impl FromObject for Stream {
    fn from_object(object: &Object) -> Option<Self> {
        match object {
            Object::Stream(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl FromObject for ObjRef {
    fn from_object(object: &Object) -> Option<Self> {
        match object {
            Object::Reference(r) => Some(*r),
            _ => None,
        }
    }
}

macro_rules! object_from {
    ($t:ty, $variant:ident) => {
        impl From<$t> for Object {
            fn from(value: $t) -> Self {
                Self::$variant(value)
            }
        }
    };
}

object_from!(bool, Boolean);
object_from!(Number, Number);
object_from!(PdfString, String);
object_from!(Name, Name);
object_from!(Array, Array);
object_from!(Dict, Dict);
object_from!(Stream, Stream);
object_from!(ObjRef, Reference);

impl From<i64> for Object {
    fn from(value: i64) -> Self {
        Self::Number(Number::Integer(value))
    }
}

impl From<i32> for Object {
    fn from(value: i32) -> Self {
        Self::Number(Number::Integer(value as i64))
    }
}

impl From<f64> for Object {
    fn from(value: f64) -> Self {
        Self::Number(Number::Real(value))
    }
}

impl From<f32> for Object {
    fn from(value: f32) -> Self {
        Self::Number(Number::Real(value as f64))
    }
}

impl From<Vec<Object>> for Object {
    fn from(value: Vec<Object>) -> Self {
        Self::Array(Array::new(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_conversions() {
        let o = Object::from(3.0_f64);
        assert_eq!(o.cast::<i32>(), Some(3));
        assert_eq!(Object::from(-1).cast::<u8>(), None);
        assert_eq!(Object::from(300).cast::<u8>(), None);
        assert_eq!(Object::from(7).cast::<f32>(), Some(7.0));
    }

    #[test]
    fn array_iter_as_skips_mismatches() {
        let arr = Array::new(vec![1.into(), Name::new(b"X").into(), 2.5_f64.into()]);
        let nums = arr.iter_as::<f32>().collect::<Vec<_>>();
        assert_eq!(nums, vec![1.0, 2.5]);
        assert_eq!(arr.get::<Name>(1), Some(Name::new(b"X")));
    }

    #[test]
    fn obj_ref_display() {
        assert_eq!(ObjRef::new(12, 0).to_string(), "12 0 R");
    }
}
