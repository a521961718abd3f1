use crate::{EnumType, Error, Result, Value};
use std::any;
use uuid::Uuid;

/// Conversion between host types and the dynamically typed [`Value`].
///
/// Entity fields, literals bound into clauses and decoded rows all travel as
/// [`Value`]. Numeric conversions accept other widths as long as the value fits,
/// so a row read back as `Int64` still fills an `i16` field.
///
/// # Examples
/// ```rust
/// use keel_core::{AsValue, Value};
/// let v = 42i32.as_value();
/// assert!(matches!(v, Value::Int32(Some(42))));
/// let n: i64 = AsValue::try_from_value(v).unwrap();
/// assert_eq!(n, 42);
/// ```
pub trait AsValue {
    /// Typed NULL describing the kind of this type.
    fn as_empty_value() -> Value;
    fn as_value(self) -> Value;
    fn try_from_value(value: Value) -> Result<Self>
    where
        Self: Sized;
}

impl<T: AsValue> From<T> for Value {
    fn from(value: T) -> Self {
        value.as_value()
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Varchar(Some(value.into()))
    }
}

fn cannot_convert<T>(value: &Value) -> Error {
    Error::msg(format!(
        "Cannot convert {:?} to {}",
        value,
        any::type_name::<T>()
    ))
}

macro_rules! impl_as_value {
    ($source:ty, $destination:path $(, $pat_rest:pat => $expr_rest:expr)* $(,)?) => {
        impl AsValue for $source {
            fn as_empty_value() -> Value {
                $destination(None)
            }
            fn as_value(self) -> Value {
                $destination(Some(self))
            }
            fn try_from_value(value: Value) -> Result<Self> {
                match value {
                    $destination(Some(v)) => Ok(v),
                    $($pat_rest => $expr_rest,)*
                    #[allow(unreachable_patterns)]
                    _ => Err(cannot_convert::<Self>(&value)),
                }
            }
        }
    };
}

macro_rules! narrow {
    ($v:expr, $from:ty, $to:ty) => {
        <$to>::try_from($v).map_err(|_| {
            Error::msg(format!(
                "Value {}: {} is out of range for {}",
                $v,
                stringify!($from),
                stringify!($to)
            ))
        })
    };
}

impl_as_value!(
    bool,
    Value::Boolean,
    Value::Int8(Some(v)) => Ok(v != 0),
    Value::Int16(Some(v)) => Ok(v != 0),
    Value::Int32(Some(v)) => Ok(v != 0),
    Value::Int64(Some(v)) => Ok(v != 0),
);
impl_as_value!(
    i8,
    Value::Int8,
    Value::Boolean(Some(v)) => Ok(v as _),
    Value::Int16(Some(v)) => narrow!(v, i16, i8),
    Value::Int32(Some(v)) => narrow!(v, i32, i8),
    Value::Int64(Some(v)) => narrow!(v, i64, i8),
);
impl_as_value!(
    i16,
    Value::Int16,
    Value::Boolean(Some(v)) => Ok(v as _),
    Value::Int8(Some(v)) => Ok(v as _),
    Value::Int32(Some(v)) => narrow!(v, i32, i16),
    Value::Int64(Some(v)) => narrow!(v, i64, i16),
);
impl_as_value!(
    i32,
    Value::Int32,
    Value::Boolean(Some(v)) => Ok(v as _),
    Value::Int8(Some(v)) => Ok(v as _),
    Value::Int16(Some(v)) => Ok(v as _),
    Value::Int64(Some(v)) => narrow!(v, i64, i32),
    Value::Char(Some(v)) => Ok(v as u32 as _),
);
impl_as_value!(
    i64,
    Value::Int64,
    Value::Boolean(Some(v)) => Ok(v as _),
    Value::Int8(Some(v)) => Ok(v as _),
    Value::Int16(Some(v)) => Ok(v as _),
    Value::Int32(Some(v)) => Ok(v as _),
    Value::Char(Some(v)) => Ok(v as u32 as _),
);
impl_as_value!(
    f32,
    Value::Float32,
    Value::Float64(Some(v)) => Ok(v as _),
    Value::Int32(Some(v)) => Ok(v as _),
    Value::Int64(Some(v)) => Ok(v as _),
);
impl_as_value!(
    f64,
    Value::Float64,
    Value::Float32(Some(v)) => Ok(v as _),
    Value::Int32(Some(v)) => Ok(v as _),
    Value::Int64(Some(v)) => Ok(v as _),
);
impl AsValue for char {
    fn as_empty_value() -> Value {
        Value::Char(None)
    }
    fn as_value(self) -> Value {
        Value::Char(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        let code = match value {
            Value::Char(Some(v)) => return Ok(v),
            Value::Int32(Some(v)) => i64::from(v),
            Value::Int64(Some(v)) => v,
            Value::Varchar(Some(ref v)) => {
                let mut chars = v.chars();
                return match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(c),
                    _ => Err(cannot_convert::<Self>(&value)),
                };
            }
            _ => return Err(cannot_convert::<Self>(&value)),
        };
        u32::try_from(code)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| Error::msg(format!("Value {code} is not a valid char")))
    }
}
impl_as_value!(String, Value::Varchar);
impl_as_value!(Box<[u8]>, Value::Blob);
impl_as_value!(
    Uuid,
    Value::Uuid,
    Value::Varchar(Some(ref v)) => Uuid::parse_str(v)
        .map_err(|e| Error::new(e).context(format!("Cannot parse `{v}` as Uuid"))),
);

/// Fixed-width kinds that can be packed into a blob as array elements.
pub trait ArrayElement: AsValue {}
impl ArrayElement for bool {}
impl ArrayElement for i8 {}
impl ArrayElement for i16 {}
impl ArrayElement for i32 {}
impl ArrayElement for i64 {}
impl ArrayElement for f32 {}
impl ArrayElement for f64 {}
impl ArrayElement for char {}

impl<T: ArrayElement> AsValue for Vec<T> {
    fn as_empty_value() -> Value {
        Value::Array(None, Box::new(T::as_empty_value()))
    }

    fn as_value(self) -> Value {
        Value::Array(
            Some(self.into_iter().map(AsValue::as_value).collect()),
            Box::new(T::as_empty_value()),
        )
    }

    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Array(Some(v), ..) => v.into_vec().into_iter().map(T::try_from_value).collect(),
            _ => Err(cannot_convert::<Self>(&value)),
        }
    }
}

impl<T: AsValue> AsValue for Option<T> {
    fn as_empty_value() -> Value {
        T::as_empty_value()
    }

    fn as_value(self) -> Value {
        match self {
            Some(v) => v.as_value(),
            None => T::as_empty_value(),
        }
    }

    fn try_from_value(value: Value) -> Result<Self> {
        if value.is_null() {
            return Ok(None);
        }
        Ok(Some(T::try_from_value(value)?))
    }
}

/// Enumeration with a fixed, ordered list of unit members.
///
/// Implemented through [`enumeration!`](crate::enumeration).
pub trait Enumeration: Sized {
    fn enum_type() -> &'static EnumType;
    fn ordinal(&self) -> u32;
    fn from_ordinal(ordinal: u32) -> Option<Self>;
    fn name(&self) -> &'static str {
        Self::enum_type()
            .member(self.ordinal())
            .unwrap_or_default()
    }
}

/// Declares an enumeration usable as a column type.
///
/// ```rust
/// #[derive(Debug, PartialEq)]
/// enum Color {
///     Red,
///     Green,
/// }
/// keel_core::enumeration!(Color { Red, Green });
///
/// use keel_core::{AsValue, Enumeration, Value};
/// assert_eq!(Color::Green.name(), "Green");
/// assert!(matches!(Color::Green.as_value(), Value::Enum(Some(1), _)));
/// ```
#[macro_export]
macro_rules! enumeration {
    ($ty:ident { $($member:ident),+ $(,)? }) => {
        impl $crate::Enumeration for $ty {
            fn enum_type() -> &'static $crate::EnumType {
                static TYPE: $crate::EnumType = $crate::EnumType {
                    name: stringify!($ty),
                    members: &[$(stringify!($member)),+],
                };
                &TYPE
            }
            fn ordinal(&self) -> u32 {
                let name = match self {
                    $($ty::$member => stringify!($member),)+
                };
                Self::enum_type()
                    .members
                    .iter()
                    .position(|v| *v == name)
                    .unwrap_or_default() as u32
            }
            fn from_ordinal(ordinal: u32) -> Option<Self> {
                [$($ty::$member),+].into_iter().nth(ordinal as usize)
            }
        }
        impl $crate::AsValue for $ty {
            fn as_empty_value() -> $crate::Value {
                $crate::Value::Enum(None, <$ty as $crate::Enumeration>::enum_type())
            }
            fn as_value(self) -> $crate::Value {
                $crate::Value::Enum(
                    Some($crate::Enumeration::ordinal(&self)),
                    <$ty as $crate::Enumeration>::enum_type(),
                )
            }
            fn try_from_value(value: $crate::Value) -> $crate::Result<Self> {
                match value {
                    $crate::Value::Enum(Some(ordinal), ty)
                        if ::std::ptr::eq(ty, <$ty as $crate::Enumeration>::enum_type()) =>
                    {
                        <$ty as $crate::Enumeration>::from_ordinal(ordinal).ok_or_else(|| {
                            $crate::Error::msg(format!(
                                "Ordinal {} is out of range for {}",
                                ordinal,
                                stringify!($ty)
                            ))
                        })
                    }
                    _ => Err($crate::Error::msg(format!(
                        "Cannot convert {:?} to {}",
                        value,
                        stringify!($ty)
                    ))),
                }
            }
        }
    };
}
