use crate::{Dialect, KeelError, Result, Value};

/// Storage kind of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlType {
    Integer,
    BigInt,
    Float,
    Double,
    Blob,
    Varchar,
    /// Text form of a 128-bit identifier.
    UuidVarchar,
    Text,
}

impl SqlType {
    pub const fn name(&self) -> &'static str {
        match self {
            SqlType::Integer => "INTEGER",
            SqlType::BigInt => "BIGINT",
            SqlType::Float => "FLOAT",
            SqlType::Double => "DOUBLE",
            SqlType::Blob => "BLOB",
            SqlType::Varchar | SqlType::UuidVarchar => "VARCHAR",
            SqlType::Text => "TEXT",
        }
    }

    pub const fn has_length(&self) -> bool {
        matches!(
            self,
            SqlType::Blob | SqlType::Varchar | SqlType::UuidVarchar | SqlType::Text
        )
    }

    pub const fn default_length(&self) -> Option<u32> {
        match self {
            SqlType::Blob | SqlType::Text => Some(65535),
            SqlType::UuidVarchar => Some(36),
            _ => None,
        }
    }

    pub const fn is_indexable(&self, dialect: Dialect) -> bool {
        match (self, dialect) {
            (SqlType::Blob | SqlType::Text, Dialect::MySql) => false,
            _ => true,
        }
    }

    /// Resolves the storage kind of a column holding `value` and persisted as `storage`.
    ///
    /// `length` is the declared length, `0` when not declared.
    pub fn resolve(dialect: Dialect, value: &Value, storage: &Value, length: u32) -> Result<SqlType> {
        if let Value::Varchar(..) = storage {
            return Ok(match value {
                Value::Uuid(..) => SqlType::UuidVarchar,
                _ if length > 0 && length < 65536 => SqlType::Varchar,
                _ => SqlType::Text,
            });
        }
        Self::lookup(dialect, storage).ok_or_else(|| {
            KeelError::argument(format!(
                "There is no storage type for {:?} stored as {:?}",
                value, storage
            ))
        })
    }

    fn lookup(dialect: Dialect, storage: &Value) -> Option<SqlType> {
        Some(match storage {
            Value::Boolean(..)
            | Value::Int8(..)
            | Value::Int16(..)
            | Value::Int32(..)
            | Value::Char(..) => SqlType::Integer,
            Value::Int64(..) => match dialect {
                Dialect::MySql => SqlType::BigInt,
                Dialect::Sqlite => SqlType::Integer,
            },
            Value::Float32(..) => SqlType::Float,
            Value::Float64(..) => SqlType::Double,
            Value::Blob(..) | Value::Array(..) => SqlType::Blob,
            Value::Uuid(..) => SqlType::UuidVarchar,
            _ => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::SqlType;
    use crate::{Dialect, Value};

    #[test]
    fn strings() {
        let text = Value::Varchar(None);
        for dialect in [Dialect::Sqlite, Dialect::MySql] {
            assert_eq!(
                SqlType::resolve(dialect, &text, &text, 100).unwrap(),
                SqlType::Varchar
            );
            assert_eq!(
                SqlType::resolve(dialect, &text, &text, 65535).unwrap(),
                SqlType::Varchar
            );
            assert_eq!(
                SqlType::resolve(dialect, &text, &text, 65536).unwrap(),
                SqlType::Text
            );
            assert_eq!(
                SqlType::resolve(dialect, &text, &text, 0).unwrap(),
                SqlType::Text
            );
            assert_eq!(
                SqlType::resolve(dialect, &Value::Uuid(None), &text, 0).unwrap(),
                SqlType::UuidVarchar
            );
        }
    }

    #[test]
    fn per_dialect() {
        let long = Value::Int64(None);
        assert_eq!(
            SqlType::resolve(Dialect::MySql, &long, &long, 0).unwrap(),
            SqlType::BigInt
        );
        assert_eq!(
            SqlType::resolve(Dialect::Sqlite, &long, &long, 0).unwrap(),
            SqlType::Integer
        );
        let array = Value::Array(None, Box::new(Value::Float64(None)));
        assert_eq!(
            SqlType::resolve(Dialect::Sqlite, &array, &Value::Blob(None), 0).unwrap(),
            SqlType::Blob
        );
        assert!(SqlType::resolve(Dialect::Sqlite, &Value::Null, &Value::Null, 0).is_err());
    }

    #[test]
    fn attributes() {
        assert!(SqlType::Text.has_length());
        assert!(!SqlType::Integer.has_length());
        assert_eq!(SqlType::UuidVarchar.default_length(), Some(36));
        assert_eq!(SqlType::Varchar.default_length(), None);
        assert_eq!(SqlType::UuidVarchar.name(), "VARCHAR");
        assert!(SqlType::Blob.is_indexable(Dialect::Sqlite));
        assert!(!SqlType::Blob.is_indexable(Dialect::MySql));
        assert!(!SqlType::Text.is_indexable(Dialect::MySql));
        assert!(SqlType::Varchar.is_indexable(Dialect::MySql));
    }
}
