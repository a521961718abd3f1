use keel_core::{
    ColumnDef, ColumnInfo, Converters, Dialect, IndexStatement, InsertStatement, Result,
    RowLabeled, SqlWriter, TableDef, Value, separated_by, split_type,
    writer::{Context, Fragment},
};

/// Embedded dialect printer.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteSqlWriter;

impl SqlWriter for SqliteSqlWriter {
    fn as_dyn(&self) -> &dyn SqlWriter {
        self
    }

    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn write_random(&self, out: &mut String) {
        out.push_str("RANDOM()");
    }

    /// An upsert replaces the conflicting row.
    fn write_insert_into(&self, out: &mut String, ignore: bool, upsert: bool) {
        out.push_str("INSERT ");
        if ignore {
            out.push_str(self.dialect().insert_ignore());
            out.push(' ');
        } else if upsert {
            out.push_str("OR REPLACE ");
        }
        out.push_str("INTO ");
    }

    fn write_insert_defaults(&self, out: &mut String) {
        out.push_str(" DEFAULT VALUES");
    }

    fn write_upsert(&self, _context: &Context, _out: &mut String, _statement: &InsertStatement) {}

    fn write_create_index(
        &self,
        out: &mut String,
        converters: &Converters,
        statement: &IndexStatement,
    ) -> Result<()> {
        out.push_str("CREATE ");
        if statement.unique {
            out.push_str("UNIQUE ");
        }
        out.push_str("INDEX IF NOT EXISTS ");
        let context = Context::new(converters, Fragment::SqlCreateIndex, false);
        self.write_identifier(&context, out, &statement.name);
        out.push_str(" ON ");
        self.write_table_ref(&context, out, statement.table);
        out.push('(');
        separated_by(
            out,
            &statement.columns,
            |out, column| self.write_column_ref(&context, out, column),
            ", ",
        );
        out.push(')');
        Ok(())
    }

    fn write_describe_columns(&self, out: &mut String, converters: &Converters, table: &str) {
        let context = Context::new(converters, Fragment::None, false);
        out.push_str("PRAGMA table_info(");
        self.write_identifier(&context, out, table);
        out.push(')');
    }

    /// Decodes a `PRAGMA table_info` row: cid, name, type, notnull, dflt_value, pk.
    fn column_info(&self, table: &str, row: RowLabeled) -> Result<ColumnInfo> {
        let text = |label: &str| match row.get_column(label) {
            Some(Value::Varchar(Some(v))) => v.clone(),
            _ => String::new(),
        };
        let (data_type, length) = split_type(&text("type"));
        Ok(ColumnInfo {
            table: table.into(),
            name: text("name").to_lowercase(),
            data_type,
            length,
        })
    }

    /// One statement per column, SQLite cannot add several columns at once nor choose
    /// their position. Columns are appended without UNIQUE and NOT NULL constraints.
    fn add_columns(
        &self,
        converters: &Converters,
        table: &TableDef,
        columns: &[(&ColumnDef, Option<&ColumnDef>)],
    ) -> Vec<String> {
        let context = Context::new(converters, Fragment::SqlAlterTable, false);
        columns
            .iter()
            .map(|(column, _)| {
                if column.unique || column.not_null {
                    log::warn!(
                        "Column `{}` is added to the existing table `{}` without its constraints",
                        column.name,
                        table.name
                    );
                }
                let mut out = String::from("ALTER TABLE ");
                self.write_table_ref(&context, &mut out, table);
                out.push_str(" ADD COLUMN ");
                self.write_identifier(&context, &mut out, &column.name);
                out.push(' ');
                self.write_column_type(&mut out, column);
                out
            })
            .collect()
    }

    fn drop_columns(&self, converters: &Converters, table: &str, columns: &[String]) -> Vec<String> {
        let context = Context::new(converters, Fragment::SqlAlterTable, false);
        columns
            .iter()
            .map(|column| {
                let mut out = String::from("ALTER TABLE ");
                self.write_identifier(&context, &mut out, table);
                out.push_str(" DROP COLUMN ");
                self.write_identifier(&context, &mut out, column);
                out
            })
            .collect()
    }
}
