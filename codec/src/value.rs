//! Dynamic values produced and consumed by layouts.
//!
//! Every integer, regardless of its encoded width, is held as a [BigInt]. Native integers enter
//! through the `From` implementations and leave through [Value::as_u64], [Value::as_i64] and
//! [Value::as_usize], which is the only place where precision can be lost (and is reported).

use bytes::Bytes;
use num_bigint::BigInt;
use std::{collections::BTreeMap, fmt};

/// Named fields of an object value.
pub type Object = BTreeMap<String, Value>;

/// A value conforming to some layout.
#[derive(Clone, PartialEq, Eq)]
pub enum Value {
    Int(BigInt),
    Bool(bool),
    Str(String),
    Bytes(Bytes),
    Array(Vec<Value>),
    Object(Object),
}

impl Value {
    /// Creates an empty object value.
    pub fn object() -> Self {
        Value::Object(Object::new())
    }

    /// Adds a field to an object value, returning the object.
    ///
    /// # Panics
    ///
    /// Panics if `self` is not an object.
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        match &mut self {
            Value::Object(fields) => {
                fields.insert(name.to_string(), value.into());
            }
            _ => panic!("with() called on a non-object value"),
        }
        self
    }

    /// Returns the field `name` of an object value.
    pub fn get(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Object(fields) => fields.get(name),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<&BigInt> {
        match self {
            Value::Int(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        u64::try_from(self.as_int()?).ok()
    }

    pub fn as_i64(&self) -> Option<i64> {
        i64::try_from(self.as_int()?).ok()
    }

    pub fn as_usize(&self) -> Option<usize> {
        usize::try_from(self.as_int()?).ok()
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Value::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(fields) => Some(fields),
            _ => None,
        }
    }

    /// Short description of the value's kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Bool(_) => "bool",
            Value::Str(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(value) => write!(f, "{value}"),
            Value::Bool(value) => write!(f, "{value}"),
            Value::Str(value) => write!(f, "{value:?}"),
            Value::Bytes(value) => write!(f, "0x{}", binlayout_utils::hex(value)),
            Value::Array(items) => f.debug_list().entries(items).finish(),
            Value::Object(fields) => f.debug_map().entries(fields).finish(),
        }
    }
}

macro_rules! impl_from_int {
    ($($type:ty),*) => {
        $(
            impl From<$type> for Value {
                fn from(value: $type) -> Self {
                    Value::Int(BigInt::from(value))
                }
            }
        )*
    };
}

impl_from_int!(u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128);

impl From<BigInt> for Value {
    fn from(value: BigInt) -> Self {
        Value::Int(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<Bytes> for Value {
    fn from(value: Bytes) -> Self {
        Value::Bytes(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Bytes(Bytes::from(value))
    }
}

impl From<&[u8]> for Value {
    fn from(value: &[u8]) -> Self {
        Value::Bytes(Bytes::copy_from_slice(value))
    }
}

impl<const N: usize> From<[u8; N]> for Value {
    fn from(value: [u8; N]) -> Self {
        Value::Bytes(Bytes::copy_from_slice(&value))
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::Array(value)
    }
}

impl From<Object> for Value {
    fn from(value: Object) -> Self {
        Value::Object(value)
    }
}
