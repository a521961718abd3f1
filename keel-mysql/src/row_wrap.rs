use crate::decode_value;
use keel_core::{Result, RowLabeled};
use mysql_async::{Column, Row};
use std::sync::Arc;

/// Converts the rows of a result set sharing the same labels.
pub(crate) struct RowWrap {
    labels: Arc<[String]>,
    columns: Arc<[Column]>,
}

impl RowWrap {
    pub(crate) fn new(row: &Row) -> Self {
        let columns = row.columns();
        Self {
            labels: columns.iter().map(|v| v.name_str().into_owned()).collect(),
            columns,
        }
    }

    pub(crate) fn decode(&self, mut row: Row) -> Result<RowLabeled> {
        let values = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, column)| {
                let value = row.take::<mysql_async::Value, _>(i).unwrap_or(mysql_async::Value::NULL);
                decode_value(value, column)
            })
            .collect::<Result<Box<[_]>>>()?;
        Ok(RowLabeled {
            labels: self.labels.clone(),
            values,
        })
    }
}
