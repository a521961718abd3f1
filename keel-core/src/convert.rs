use crate::{AsValue, ColumnDef, EnumType, Error, KeelError, Result, Value, util::lock};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};
use uuid::Uuid;

/// Translates host values of a column into the stored representation and back.
///
/// The `supports_*` predicates are asked in priority order, the first converter
/// answering `true` performs the conversion.
pub trait Converter: Send + Sync {
    fn supports_to_storage(&self, column: &ColumnDef, value: &Value) -> bool;
    fn to_storage(&self, column: &ColumnDef, value: Value) -> Result<Value>;
    fn supports_from_storage(&self, column: &ColumnDef, stored: &Value) -> bool;
    fn from_storage(&self, column: &ColumnDef, stored: Value) -> Result<Value>;
}

/// Ordered list of converters owned by a database.
pub struct Converters {
    converters: Vec<Box<dyn Converter>>,
}

impl Default for Converters {
    fn default() -> Self {
        Self {
            converters: vec![
                Box::new(ArrayConverter),
                Box::new(UuidConverter),
                Box::new(EnumConverter::default()),
            ],
        }
    }
}

impl Converters {
    /// Registry without the built-in converters.
    pub fn empty() -> Self {
        Self {
            converters: Vec::new(),
        }
    }

    /// Appends a converter with the lowest priority.
    pub fn push(&mut self, converter: impl Converter + 'static) {
        self.converters.push(Box::new(converter));
    }

    pub fn to_storage(&self, column: &ColumnDef, value: Value) -> Result<Value> {
        if value.is_null() {
            return Ok(column.storage.as_null());
        }
        if value.same_type(&column.storage) {
            return Ok(value);
        }
        match (&value, &column.storage) {
            (Value::Int32(Some(v)), Value::Int64(..)) => return Ok(Value::Int64(Some(*v as i64))),
            (Value::Float32(Some(v)), Value::Float64(..)) => {
                return Ok(Value::Float64(Some(*v as f64)));
            }
            _ => {}
        }
        if let Some(converter) = self
            .converters
            .iter()
            .find(|c| c.supports_to_storage(column, &value))
        {
            return converter
                .to_storage(column, value)
                .map_err(|e| conversion_failed(column, e));
        }
        if value.is_scalar() && column.storage.is_scalar() {
            return value
                .coerce_to(&column.storage)
                .map_err(|e| conversion_failed(column, e));
        }
        Err(cannot_convert(column, &value))
    }

    pub fn from_storage(&self, column: &ColumnDef, stored: Value) -> Result<Value> {
        if stored.is_null() {
            return Ok(column.value.as_null());
        }
        if stored.same_type(&column.value) {
            return Ok(stored);
        }
        if let Some(converter) = self
            .converters
            .iter()
            .find(|c| c.supports_from_storage(column, &stored))
        {
            return converter
                .from_storage(column, stored)
                .map_err(|e| conversion_failed(column, e));
        }
        if column.value.is_scalar() && stored.is_scalar() {
            return stored
                .coerce_to(&column.value)
                .map_err(|e| conversion_failed(column, e));
        }
        Err(cannot_convert(column, &stored))
    }
}

fn cannot_convert(column: &ColumnDef, value: &Value) -> Error {
    KeelError::CannotConvert {
        column: column.qualified_name(),
        value: format!("{:?}", value),
    }
    .into()
}

fn conversion_failed(column: &ColumnDef, error: Error) -> Error {
    error.context(KeelError::State(format!(
        "Conversion failed for column {}",
        column.qualified_name()
    )))
}

/// Packs fixed-width arrays into big-endian byte blobs.
pub struct ArrayConverter;

impl ArrayConverter {
    pub fn pack(elements: &[Value]) -> Result<Box<[u8]>> {
        let width = elements.first().and_then(Value::packed_width).unwrap_or(0);
        let mut out = Vec::with_capacity(elements.len() * width);
        for element in elements {
            match element {
                Value::Boolean(Some(v)) => out.push(*v as u8),
                Value::Int8(Some(v)) => out.extend_from_slice(&v.to_be_bytes()),
                Value::Int16(Some(v)) => out.extend_from_slice(&v.to_be_bytes()),
                Value::Int32(Some(v)) => out.extend_from_slice(&v.to_be_bytes()),
                Value::Int64(Some(v)) => out.extend_from_slice(&v.to_be_bytes()),
                Value::Float32(Some(v)) => out.extend_from_slice(&v.to_bits().to_be_bytes()),
                Value::Float64(Some(v)) => out.extend_from_slice(&v.to_bits().to_be_bytes()),
                Value::Char(Some(v)) => out.extend_from_slice(&(*v as u32).to_be_bytes()),
                _ => {
                    return Err(Error::msg(format!(
                        "Array element {:?} cannot be packed",
                        element
                    )));
                }
            }
        }
        Ok(out.into())
    }

    pub fn unpack(bytes: &[u8], element: &Value) -> Result<Box<[Value]>> {
        let Some(width) = element.packed_width() else {
            return Err(Error::msg(format!(
                "Array element {:?} cannot be unpacked",
                element
            )));
        };
        if bytes.len() % width != 0 {
            return Err(Error::msg(format!(
                "Blob of {} bytes is not a sequence of {} bytes elements",
                bytes.len(),
                width
            )));
        }
        bytes
            .chunks_exact(width)
            .map(|chunk| -> Result<Value> {
                Ok(match element {
                    Value::Boolean(..) => Value::Boolean(Some(chunk[0] != 0)),
                    Value::Int8(..) => Value::Int8(Some(i8::from_be_bytes([chunk[0]]))),
                    Value::Int16(..) => Value::Int16(Some(i16::from_be_bytes(chunk.try_into()?))),
                    Value::Int32(..) => Value::Int32(Some(i32::from_be_bytes(chunk.try_into()?))),
                    Value::Int64(..) => Value::Int64(Some(i64::from_be_bytes(chunk.try_into()?))),
                    Value::Float32(..) => Value::Float32(Some(f32::from_bits(
                        u32::from_be_bytes(chunk.try_into()?),
                    ))),
                    Value::Float64(..) => Value::Float64(Some(f64::from_bits(
                        u64::from_be_bytes(chunk.try_into()?),
                    ))),
                    Value::Char(..) => {
                        let code = u32::from_be_bytes(chunk.try_into()?);
                        Value::Char(Some(char::from_u32(code).ok_or_else(|| {
                            Error::msg(format!("{code:#x} is not a valid char"))
                        })?))
                    }
                    _ => return Err(Error::msg(format!("Cannot unpack {:?}", element))),
                })
            })
            .collect()
    }
}

impl Converter for ArrayConverter {
    fn supports_to_storage(&self, column: &ColumnDef, value: &Value) -> bool {
        matches!(column.storage, Value::Blob(..))
            && matches!(value, Value::Array(_, element) if element.packed_width().is_some())
    }

    fn to_storage(&self, _column: &ColumnDef, value: Value) -> Result<Value> {
        match value {
            Value::Array(Some(elements), ..) => Ok(Value::Blob(Some(Self::pack(&elements)?))),
            _ => Ok(Value::Blob(None)),
        }
    }

    fn supports_from_storage(&self, column: &ColumnDef, stored: &Value) -> bool {
        matches!(stored, Value::Blob(..))
            && matches!(&column.value, Value::Array(_, element) if element.packed_width().is_some())
    }

    fn from_storage(&self, column: &ColumnDef, stored: Value) -> Result<Value> {
        let (Value::Blob(Some(bytes)), Value::Array(_, element)) = (stored, &column.value) else {
            return Ok(column.value.as_null());
        };
        Ok(Value::Array(
            Some(Self::unpack(&bytes, element)?),
            element.clone(),
        ))
    }
}

/// 128-bit identifiers as hyphenated text or as 16 bytes, most significant half first.
pub struct UuidConverter;

impl Converter for UuidConverter {
    fn supports_to_storage(&self, column: &ColumnDef, value: &Value) -> bool {
        matches!(value, Value::Uuid(..))
            && matches!(column.storage, Value::Varchar(..) | Value::Blob(..))
    }

    fn to_storage(&self, column: &ColumnDef, value: Value) -> Result<Value> {
        let Value::Uuid(Some(uuid)) = value else {
            return Ok(column.storage.as_null());
        };
        Ok(match column.storage {
            Value::Blob(..) => {
                let (most, least) = uuid.as_u64_pair();
                let mut bytes = Vec::with_capacity(16);
                bytes.extend_from_slice(&most.to_be_bytes());
                bytes.extend_from_slice(&least.to_be_bytes());
                Value::Blob(Some(bytes.into()))
            }
            _ => Value::Varchar(Some(uuid.hyphenated().to_string())),
        })
    }

    fn supports_from_storage(&self, column: &ColumnDef, stored: &Value) -> bool {
        matches!(column.value, Value::Uuid(..))
            && matches!(stored, Value::Varchar(..) | Value::Blob(..))
    }

    fn from_storage(&self, column: &ColumnDef, stored: Value) -> Result<Value> {
        Ok(match stored {
            Value::Varchar(Some(v)) => Value::Uuid(Some(
                Uuid::parse_str(v.trim())
                    .map_err(|e| Error::new(e).context(format!("Cannot parse `{v}` as Uuid")))?,
            )),
            Value::Blob(Some(v)) => {
                let bytes: [u8; 16] = v.as_ref().try_into().map_err(|_| {
                    Error::msg(format!("Expected 16 bytes for a Uuid, got {}", v.len()))
                })?;
                let most = u64::from_be_bytes(bytes[..8].try_into()?);
                let least = u64::from_be_bytes(bytes[8..].try_into()?);
                Value::Uuid(Some(Uuid::from_u64_pair(most, least)))
            }
            _ => column.value.as_null(),
        })
    }
}

/// Enumerations stored by member name (text) or by ordinal (integer).
#[derive(Default)]
pub struct EnumConverter {
    names: Mutex<HashMap<usize, Arc<HashMap<&'static str, u32>>>>,
}

impl EnumConverter {
    fn ordinal_of(&self, ty: &'static EnumType, name: &str) -> Option<u32> {
        let names = {
            let mut cache = lock(&self.names);
            cache
                .entry(ty as *const EnumType as usize)
                .or_insert_with(|| {
                    Arc::new(
                        ty.members
                            .iter()
                            .enumerate()
                            .map(|(i, v)| (*v, i as u32))
                            .collect(),
                    )
                })
                .clone()
        };
        names.get(name).copied()
    }
}

fn is_integer(value: &Value) -> bool {
    matches!(
        value,
        Value::Int8(..) | Value::Int16(..) | Value::Int32(..) | Value::Int64(..)
    )
}

impl Converter for EnumConverter {
    fn supports_to_storage(&self, column: &ColumnDef, value: &Value) -> bool {
        matches!(value, Value::Enum(..))
            && (matches!(column.storage, Value::Varchar(..)) || is_integer(&column.storage))
    }

    fn to_storage(&self, column: &ColumnDef, value: Value) -> Result<Value> {
        let Value::Enum(Some(ordinal), ty) = value else {
            return Ok(column.storage.as_null());
        };
        if let Value::Varchar(..) = column.storage {
            let name = ty.member(ordinal).ok_or_else(|| {
                Error::msg(format!("Ordinal {ordinal} is out of range for {}", ty.name))
            })?;
            return Ok(Value::Varchar(Some(name.into())));
        }
        Value::Int64(Some(ordinal as i64)).coerce_to(&column.storage)
    }

    fn supports_from_storage(&self, column: &ColumnDef, stored: &Value) -> bool {
        matches!(column.value, Value::Enum(..))
            && (matches!(stored, Value::Varchar(..)) || is_integer(stored))
    }

    fn from_storage(&self, column: &ColumnDef, stored: Value) -> Result<Value> {
        let Value::Enum(_, ty) = column.value else {
            return Ok(column.value.as_null());
        };
        let ordinal = match stored {
            Value::Varchar(Some(name)) => self.ordinal_of(ty, &name).ok_or_else(|| {
                Error::msg(format!("`{name}` is not a member of {}", ty.name))
            })?,
            other => {
                let ordinal = i64::try_from_value(other)?;
                u32::try_from(ordinal)
                    .ok()
                    .filter(|v| ty.member(*v).is_some())
                    .ok_or_else(|| {
                        Error::msg(format!("Ordinal {ordinal} is out of range for {}", ty.name))
                    })?
            }
        };
        Ok(Value::Enum(Some(ordinal), ty))
    }
}
