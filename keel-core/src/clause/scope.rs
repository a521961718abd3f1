use crate::{ColumnDef, KeelError, Result, TableDef};

/// Tables visible to the clauses of a statement, the first one is the driving table.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    tables: &'a [&'a TableDef],
}

impl<'a> Scope<'a> {
    pub fn new(tables: &'a [&'a TableDef]) -> Self {
        Self { tables }
    }

    pub fn tables(&self) -> &'a [&'a TableDef] {
        self.tables
    }

    pub fn table(&self) -> &'a TableDef {
        self.tables[0]
    }

    /// Resolves `column` or `table.column`, unqualified names search the tables in order.
    pub fn resolve(&self, column: &str) -> Result<&'a ColumnDef> {
        if let Some((table, name)) = column.split_once('.') {
            let Some(table) = self
                .tables
                .iter()
                .find(|t| t.name.eq_ignore_ascii_case(table))
            else {
                return Err(KeelError::argument(format!(
                    "Unknown table `{table}` in column reference `{column}`"
                )));
            };
            return table.require_column(name);
        }
        self.tables
            .iter()
            .find_map(|t| t.column(column))
            .ok_or_else(|| {
                KeelError::argument(format!(
                    "Unknown column `{column}` in table `{}`",
                    self.table().name
                ))
            })
    }
}
