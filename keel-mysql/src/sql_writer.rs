use keel_core::{
    Converters, Dialect, IndexStatement, SqlWriter,
    writer::{Context, Fragment},
};

/// Networked dialect printer.
#[derive(Debug, Default, Clone, Copy)]
pub struct MySqlSqlWriter;

impl SqlWriter for MySqlSqlWriter {
    fn as_dyn(&self) -> &dyn SqlWriter {
        self
    }

    fn dialect(&self) -> Dialect {
        Dialect::MySql
    }

    /// Backslash is an escape character inside MySQL string literals.
    fn write_value_string(&self, _context: &Context, out: &mut String, value: &str) {
        out.push('\'');
        for c in value.chars() {
            match c {
                '\'' => out.push_str("''"),
                '\\' => out.push_str("\\\\"),
                _ => out.push(c),
            }
        }
        out.push('\'');
    }

    /// MySQL has no `CREATE INDEX IF NOT EXISTS`, the catalog is asked first.
    fn write_index_lookup(&self, out: &mut String, statement: &IndexStatement) -> bool {
        let converters = Converters::default();
        let context = Context::new(&converters, Fragment::None, false);
        out.push_str(
            "SELECT COUNT(1) FROM information_schema.statistics WHERE table_schema = DATABASE() AND table_name = ",
        );
        self.write_value_string(&context, out, &statement.table.name);
        out.push_str(" AND index_name = ");
        self.write_value_string(&context, out, &statement.name);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::MySqlSqlWriter;
    use keel_core::{
        Converters, Dialect, IndexStatement, SqlWriter, TableDef,
        writer::{Context, Fragment},
    };

    #[test]
    fn string_escapes() {
        let converters = Converters::default();
        let context = Context::new(&converters, Fragment::None, false);
        let mut out = String::new();
        MySqlSqlWriter.write_value_string(&context, &mut out, r"it's C:\temp");
        assert_eq!(out, r"'it''s C:\\temp'");
    }

    #[test]
    fn index_lookup_escapes() {
        let table = TableDef {
            database: 0,
            name: r"shop\items".into(),
            columns: Vec::new(),
            key: None,
            allow_unsafe_operations: false,
            cache_size: 0,
            dialect: Dialect::MySql,
            indexes: Vec::new(),
        };
        let statement = IndexStatement {
            table: &table,
            name: r"o'brien\_ormm_idx".into(),
            columns: Vec::new(),
            unique: false,
        };
        let mut out = String::new();
        assert!(MySqlSqlWriter.write_index_lookup(&mut out, &statement));
        assert!(out.ends_with(
            r"AND table_name = 'shop\\items' AND index_name = 'o''brien\\_ormm_idx'"
        ));
    }
}
