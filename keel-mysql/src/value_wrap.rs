use keel_core::{Context, Result, Value};
use mysql_async::{
    Column,
    consts::{ColumnFlags, ColumnType},
};
use std::str::FromStr;

/// Character set number the server reports for binary strings.
const BINARY_CHARSET: u16 = 63;

/// Decodes a value received from the server, the text protocol delivers everything
/// but NULL as bytes so the column metadata decides the resulting type.
pub(crate) fn decode_value(value: mysql_async::Value, column: &Column) -> Result<Value> {
    Ok(match value {
        mysql_async::Value::NULL => Value::Null,
        mysql_async::Value::Int(v) => Value::Int64(Some(v)),
        mysql_async::Value::UInt(v) => Value::Int64(Some(i64::try_from(v).with_context(|| {
            format!("Column `{}` holds {} which is out of range", column.name_str(), v)
        })?)),
        mysql_async::Value::Float(v) => Value::Float32(Some(v)),
        mysql_async::Value::Double(v) => Value::Float64(Some(v)),
        mysql_async::Value::Bytes(v) => decode_bytes(v, column)?,
        v @ (mysql_async::Value::Date(..) | mysql_async::Value::Time(..)) => {
            Value::Varchar(Some(v.as_sql(true).trim_matches('\'').to_string()))
        }
    })
}

fn decode_bytes(bytes: Vec<u8>, column: &Column) -> Result<Value> {
    fn parse<T: FromStr>(bytes: &[u8], column: &Column) -> Result<T>
    where
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        let text = std::str::from_utf8(bytes)?;
        text.parse::<T>().with_context(|| {
            format!("Could not decode `{}` from column `{}`", text, column.name_str())
        })
    }
    Ok(match column.column_type() {
        ColumnType::MYSQL_TYPE_TINY
        | ColumnType::MYSQL_TYPE_SHORT
        | ColumnType::MYSQL_TYPE_INT24
        | ColumnType::MYSQL_TYPE_LONG
        | ColumnType::MYSQL_TYPE_LONGLONG
        | ColumnType::MYSQL_TYPE_YEAR => Value::Int64(Some(parse(&bytes, column)?)),
        ColumnType::MYSQL_TYPE_FLOAT => Value::Float32(Some(parse(&bytes, column)?)),
        ColumnType::MYSQL_TYPE_DOUBLE
        | ColumnType::MYSQL_TYPE_DECIMAL
        | ColumnType::MYSQL_TYPE_NEWDECIMAL => Value::Float64(Some(parse(&bytes, column)?)),
        ColumnType::MYSQL_TYPE_NULL => Value::Null,
        ColumnType::MYSQL_TYPE_BIT => Value::Blob(Some(bytes.into())),
        _ if column.character_set() == BINARY_CHARSET
            || (column.flags().contains(ColumnFlags::BINARY_FLAG)
                && column.flags().contains(ColumnFlags::BLOB_FLAG)) =>
        {
            Value::Blob(Some(bytes.into()))
        }
        _ => Value::Varchar(Some(String::from_utf8(bytes).with_context(|| {
            format!("Column `{}` does not hold valid UTF-8 text", column.name_str())
        })?)),
    })
}
