use crate::{AsValue, Error, Result};
use std::{
    hash::{Hash, Hasher},
    mem,
};
use uuid::Uuid;

/// Ordered member list of an enumeration, shared by every value of that enumeration.
#[derive(Debug, PartialEq, Eq)]
pub struct EnumType {
    pub name: &'static str,
    pub members: &'static [&'static str],
}

impl EnumType {
    pub fn member(&self, ordinal: u32) -> Option<&'static str> {
        self.members.get(ordinal as usize).copied()
    }
}

/// Dynamically typed value moved between entities, literals and rows.
///
/// A `None` payload is a typed NULL and is also how a column declares its kind
/// (`Value::Int32(None)` is the prototype of a 32-bit integer column).
#[derive(Default, Debug, Clone)]
pub enum Value {
    #[default]
    Null,
    Boolean(Option<bool>),
    Int8(Option<i8>),
    Int16(Option<i16>),
    Int32(Option<i32>),
    Int64(Option<i64>),
    Float32(Option<f32>),
    Float64(Option<f64>),
    Char(Option<char>),
    Varchar(Option<String>),
    Blob(Option<Box<[u8]>>),
    Uuid(Option<Uuid>),
    Enum(Option<u32>, /* type: */ &'static EnumType),
    Array(Option<Box<[Value]>>, /* type: */ Box<Value>),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Boolean(l), Self::Boolean(r)) => l == r,
            (Self::Int8(l), Self::Int8(r)) => l == r,
            (Self::Int16(l), Self::Int16(r)) => l == r,
            (Self::Int32(l), Self::Int32(r)) => l == r,
            (Self::Int64(l), Self::Int64(r)) => l == r,
            (Self::Float32(l), Self::Float32(r)) => l.map(f32::to_bits) == r.map(f32::to_bits),
            (Self::Float64(l), Self::Float64(r)) => l.map(f64::to_bits) == r.map(f64::to_bits),
            (Self::Char(l), Self::Char(r)) => l == r,
            (Self::Varchar(l), Self::Varchar(r)) => l == r,
            (Self::Blob(l), Self::Blob(r)) => l == r,
            (Self::Uuid(l), Self::Uuid(r)) => l == r,
            (Self::Enum(l, ..), Self::Enum(r, ..)) => l == r && self.same_type(other),
            (Self::Array(l, ..), Self::Array(r, ..)) => l == r && self.same_type(other),
            _ => mem::discriminant(self) == mem::discriminant(other),
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Boolean(v) => v.hash(state),
            Value::Int8(v) => v.hash(state),
            Value::Int16(v) => v.hash(state),
            Value::Int32(v) => v.hash(state),
            Value::Int64(v) => v.hash(state),
            Value::Float32(v) => v.map(f32::to_bits).hash(state),
            Value::Float64(v) => v.map(f64::to_bits).hash(state),
            Value::Char(v) => v.hash(state),
            Value::Varchar(v) => v.hash(state),
            Value::Blob(v) => v.hash(state),
            Value::Uuid(v) => v.hash(state),
            Value::Enum(v, ty) => {
                v.hash(state);
                ty.name.hash(state);
            }
            Value::Array(v, ..) => v.hash(state),
        }
    }
}

impl Value {
    pub fn is_null(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Boolean(v) => v.is_none(),
            Value::Int8(v) => v.is_none(),
            Value::Int16(v) => v.is_none(),
            Value::Int32(v) => v.is_none(),
            Value::Int64(v) => v.is_none(),
            Value::Float32(v) => v.is_none(),
            Value::Float64(v) => v.is_none(),
            Value::Char(v) => v.is_none(),
            Value::Varchar(v) => v.is_none(),
            Value::Blob(v) => v.is_none(),
            Value::Uuid(v) => v.is_none(),
            Value::Enum(v, ..) => v.is_none(),
            Value::Array(v, ..) => v.is_none(),
        }
    }

    /// Kind equality, payloads are ignored.
    pub fn same_type(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Enum(.., l), Self::Enum(.., r)) => std::ptr::eq(*l, *r) || l == r,
            (Self::Array(.., l), Self::Array(.., r)) => l.same_type(r),
            _ => mem::discriminant(self) == mem::discriminant(other),
        }
    }

    /// The NULL of the same kind.
    pub fn as_null(&self) -> Value {
        match self {
            Value::Null => Value::Null,
            Value::Boolean(..) => Value::Boolean(None),
            Value::Int8(..) => Value::Int8(None),
            Value::Int16(..) => Value::Int16(None),
            Value::Int32(..) => Value::Int32(None),
            Value::Int64(..) => Value::Int64(None),
            Value::Float32(..) => Value::Float32(None),
            Value::Float64(..) => Value::Float64(None),
            Value::Char(..) => Value::Char(None),
            Value::Varchar(..) => Value::Varchar(None),
            Value::Blob(..) => Value::Blob(None),
            Value::Uuid(..) => Value::Uuid(None),
            Value::Enum(.., ty) => Value::Enum(None, ty),
            Value::Array(.., ty) => Value::Array(None, ty.clone()),
        }
    }

    /// Boolean, integer, floating point and character kinds.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Value::Boolean(..)
                | Value::Int8(..)
                | Value::Int16(..)
                | Value::Int32(..)
                | Value::Int64(..)
                | Value::Float32(..)
                | Value::Float64(..)
                | Value::Char(..)
        )
    }

    /// Number of bytes one element of this kind takes inside a packed array.
    pub fn packed_width(&self) -> Option<usize> {
        Some(match self {
            Value::Boolean(..) | Value::Int8(..) => 1,
            Value::Int16(..) => 2,
            Value::Int32(..) | Value::Float32(..) | Value::Char(..) => 4,
            Value::Int64(..) | Value::Float64(..) => 8,
            _ => return None,
        })
    }

    /// Converts a scalar into the scalar kind of `prototype`, checking ranges.
    pub fn coerce_to(self, prototype: &Value) -> Result<Value> {
        if self.is_null() {
            return Ok(prototype.as_null());
        }
        Ok(match prototype {
            Value::Boolean(..) => bool::try_from_value(self)?.as_value(),
            Value::Int8(..) => i8::try_from_value(self)?.as_value(),
            Value::Int16(..) => i16::try_from_value(self)?.as_value(),
            Value::Int32(..) => i32::try_from_value(self)?.as_value(),
            Value::Int64(..) => i64::try_from_value(self)?.as_value(),
            Value::Float32(..) => f32::try_from_value(self)?.as_value(),
            Value::Float64(..) => f64::try_from_value(self)?.as_value(),
            Value::Char(..) => char::try_from_value(self)?.as_value(),
            _ => {
                return Err(Error::msg(format!(
                    "Cannot coerce {:?} into {:?}, the target is not a scalar",
                    self, prototype
                )));
            }
        })
    }
}
