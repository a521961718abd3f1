use crate::{
    Aggregate, Argument, ArrayConverter, ColumnDef, ColumnInfo, Converters, DeleteStatement,
    Dialect, Error, IndexStatement, InsertStatement, JoinStatement, JoinType, KeelError, Order,
    Projection, Result, RowLabeled, Scope, SelectStatement, TableDef, UpdateStatement, Value,
    Where, separated_by, try_separated_by,
    writer::{Context, Fragment},
};
use std::fmt::Write;

macro_rules! write_integer {
    ($out:ident, $value:expr) => {{
        let mut buffer = itoa::Buffer::new();
        $out.push_str(buffer.format($value));
    }};
}
macro_rules! write_float {
    ($this:ident, $out:ident, $value:expr) => {{
        if $value.is_infinite() {
            $this.write_value_infinity($out, $value.is_sign_negative());
        } else if $value.is_nan() {
            $this.write_value_nan($out);
        } else {
            let mut buffer = ryu::Buffer::new();
            $out.push_str(buffer.format($value));
        }
    }};
}

/// Dialect printer turning resolved statements into SQL text.
///
/// The provided methods render the networked dialect, the embedded dialect
/// overrides the handful of places where it differs.
pub trait SqlWriter: Send + Sync {
    fn as_dyn(&self) -> &dyn SqlWriter;

    fn dialect(&self) -> Dialect;

    /// Escape occurrences of `search` char with `replace` while copying into buffer.
    fn write_escaped(&self, out: &mut String, value: &str, search: char, replace: &str) {
        let mut position = 0;
        for (i, c) in value.char_indices() {
            if c == search {
                out.push_str(&value[position..i]);
                out.push_str(replace);
                position = i + c.len_utf8();
            }
        }
        out.push_str(&value[position..]);
    }

    /// Identifiers are validated at registration and written verbatim.
    fn write_identifier(&self, _context: &Context, out: &mut String, value: &str) {
        out.push_str(value);
    }

    fn write_table_ref(&self, context: &Context, out: &mut String, table: &TableDef) {
        self.write_identifier(context, out, &table.name);
    }

    /// Render a column reference, qualified with its table when the context asks for it.
    fn write_column_ref(&self, context: &Context, out: &mut String, column: &ColumnDef) {
        if context.qualify_columns {
            self.write_identifier(context, out, &column.table);
            out.push('.');
        }
        self.write_identifier(context, out, &column.name);
    }

    /// Render a stored value.
    fn write_value(&self, context: &Context, out: &mut String, value: &Value) -> Result<()> {
        match value {
            v if v.is_null() => self.write_value_none(out),
            Value::Boolean(Some(v)) => self.write_value_bool(out, *v),
            Value::Int8(Some(v)) => write_integer!(out, *v),
            Value::Int16(Some(v)) => write_integer!(out, *v),
            Value::Int32(Some(v)) => write_integer!(out, *v),
            Value::Int64(Some(v)) => write_integer!(out, *v),
            Value::Float32(Some(v)) => write_float!(self, out, *v),
            Value::Float64(Some(v)) => write_float!(self, out, *v),
            Value::Char(Some(v)) => write_integer!(out, *v as u32),
            Value::Varchar(Some(v)) => self.write_value_string(context, out, v),
            Value::Blob(Some(v)) => self.write_value_blob(out, v),
            _ => {
                return Err(Error::msg(format!(
                    "Cannot write {:?} as a literal, it must be converted to a stored value first",
                    value
                )));
            }
        };
        Ok(())
    }

    fn write_value_none(&self, out: &mut String) {
        out.push_str("NULL");
    }

    fn write_value_bool(&self, out: &mut String, value: bool) {
        out.push(['0', '1'][value as usize]);
    }

    /// Out of range literal, parsed as infinity by the engines that support it.
    fn write_value_infinity(&self, out: &mut String, negative: bool) {
        out.push_str(if negative { "-9e999" } else { "9e999" });
    }

    fn write_value_nan(&self, out: &mut String) {
        self.write_value_none(out);
    }

    /// Render and escape a string literal using single quotes.
    fn write_value_string(&self, _context: &Context, out: &mut String, value: &str) {
        out.push('\'');
        self.write_escaped(out, value, '\'', "''");
        out.push('\'');
    }

    fn write_value_blob(&self, out: &mut String, value: &[u8]) {
        out.push_str("X'");
        out.push_str(&hex::encode_upper(value));
        out.push('\'');
    }

    /// Render an operand bound to `column`.
    ///
    /// Scalars and strings are written as they are, arrays are packed into a
    /// blob, anything else goes through the converters first.
    fn write_literal(
        &self,
        context: &Context,
        out: &mut String,
        column: &ColumnDef,
        argument: &Argument,
    ) -> Result<()> {
        match argument {
            Argument::Select(select) => {
                out.push('(');
                out.push_str(select.0.trim_end_matches(';'));
                out.push(')');
                Ok(())
            }
            Argument::Value(value)
                if value.is_null() || value.is_scalar() || matches!(value, Value::Varchar(..)) =>
            {
                self.write_value(context, out, value)
            }
            Argument::Value(Value::Array(Some(elements), ..)) => {
                self.write_value_blob(out, &ArrayConverter::pack(elements)?);
                Ok(())
            }
            Argument::Value(value) => {
                let stored = context.converters.to_storage(column, value.clone())?;
                self.write_value(context, out, &stored)
            }
        }
    }

    fn write_where(
        &self,
        context: &Context,
        out: &mut String,
        scope: &Scope,
        clause: &Where,
    ) -> Result<()> {
        match clause {
            Where::Compare { column, op, value } => {
                let column = scope.resolve(column)?;
                self.write_column_ref(context, out, column);
                let _ = write!(out, " {} ", op);
                self.write_literal(context, out, column, value)?;
            }
            Where::Like { column, pattern } => {
                let column = scope.resolve(column)?;
                self.write_column_ref(context, out, column);
                out.push_str(" LIKE ");
                self.write_literal(context, out, column, pattern)?;
            }
            Where::In { column, values } => {
                if values.len() < 2 {
                    return Err(KeelError::argument(format!(
                        "IN on `{column}` requires two or more values, got {}",
                        values.len()
                    )));
                }
                let column = scope.resolve(column)?;
                self.write_column_ref(context, out, column);
                out.push_str(" IN (");
                try_separated_by(
                    out,
                    values,
                    |out, v| self.write_literal(context, out, column, v),
                    ", ",
                )?;
                out.push(')');
            }
            Where::IsNull(column) => {
                self.write_column_ref(context, out, scope.resolve(column)?);
                out.push_str(" IS NULL");
            }
            Where::IsNotNull(column) => {
                self.write_column_ref(context, out, scope.resolve(column)?);
                out.push_str(" IS NOT NULL");
            }
            Where::And(clauses) | Where::Or(clauses) => {
                let (what, separator) = if matches!(clause, Where::And(..)) {
                    ("AND", ") AND (")
                } else {
                    ("OR", ") OR (")
                };
                if clauses.len() < 2 {
                    return Err(KeelError::argument(format!(
                        "{what} requires two or more clauses, got {}",
                        clauses.len()
                    )));
                }
                out.push('(');
                try_separated_by(
                    out,
                    clauses,
                    |out, v| self.write_where(context, out, scope, v),
                    separator,
                )?;
                out.push(')');
            }
            Where::Not(clause) => {
                out.push_str("NOT (");
                self.write_where(context, out, scope, clause)?;
                out.push(')');
            }
        }
        Ok(())
    }

    fn write_order(
        &self,
        context: &Context,
        out: &mut String,
        scope: &Scope,
        order: &Order,
    ) -> Result<()> {
        match order {
            Order::Asc(column) => {
                self.write_column_ref(context, out, scope.resolve(column)?);
                out.push_str(" ASC");
            }
            Order::Desc(column) => {
                self.write_column_ref(context, out, scope.resolve(column)?);
                out.push_str(" DESC");
            }
            Order::Rand => self.write_random(out),
            Order::Combine(orders) => try_separated_by(
                out,
                orders,
                |out, v| self.write_order(context, out, scope, v),
                ", ",
            )?,
        }
        Ok(())
    }

    fn write_random(&self, out: &mut String) {
        out.push_str("RAND()");
    }

    fn write_join_type(&self, out: &mut String, join_type: JoinType) {
        out.push_str(match join_type {
            JoinType::Inner => "INNER JOIN",
            JoinType::Left => "LEFT JOIN",
            JoinType::Right => "RIGHT JOIN",
        });
    }

    /// Render a join, `scope` holds the tables preceding it.
    fn write_join(
        &self,
        context: &Context,
        out: &mut String,
        scope: &Scope,
        join: &JoinStatement,
    ) -> Result<()> {
        let column = scope.resolve(&join.on.column)?;
        let joined = join.table.require_column(&join.on.joined_column)?;
        self.write_join_type(out, join.kind);
        out.push(' ');
        self.write_table_ref(context, out, join.table);
        out.push_str(" ON ");
        self.write_column_ref(context, out, column);
        let _ = write!(out, " {} ", join.on.op);
        self.write_column_ref(context, out, joined);
        Ok(())
    }

    /// Emit SELECT statement (projection, FROM, joins, WHERE, GROUP BY, ORDER BY, LIMIT).
    fn write_select(
        &self,
        out: &mut String,
        converters: &Converters,
        statement: &SelectStatement,
    ) -> Result<()> {
        out.reserve(128);
        out.push_str("SELECT ");
        let context = Context::new(converters, Fragment::SqlSelect, true);
        match &statement.projection {
            Projection::Columns(columns) => separated_by(
                out,
                columns,
                |out, col| self.write_column_ref(&context, out, col),
                ", ",
            ),
            Projection::Aggregate(aggregate, column) => {
                out.push_str(aggregate.as_str());
                out.push('(');
                match column {
                    Some(column) => self.write_column_ref(&context, out, column),
                    None => out.push('*'),
                }
                out.push(')');
            }
        }
        out.push_str(" FROM ");
        let scope = statement.scope;
        self.write_table_ref(
            &context.switch_fragment(Fragment::SqlSelectFrom),
            out,
            scope.table(),
        );
        for (i, join) in statement.joins.iter().enumerate() {
            out.push(' ');
            let preceding = Scope::new(&scope.tables()[..=i]);
            self.write_join(&context.switch_fragment(Fragment::SqlJoin), out, &preceding, join)?;
        }
        if let Some(condition) = statement.condition {
            out.push_str(" WHERE ");
            self.write_where(
                &context.switch_fragment(Fragment::SqlSelectWhere),
                out,
                &scope,
                condition,
            )?;
        }
        if !statement.group_by.is_empty() {
            out.push_str(" GROUP BY ");
            let context = context.switch_fragment(Fragment::SqlSelectGroupBy);
            separated_by(
                out,
                &statement.group_by,
                |out, col| self.write_column_ref(&context, out, col),
                ", ",
            );
        }
        if let Some(order) = statement.order {
            out.push_str(" ORDER BY ");
            self.write_order(
                &context.switch_fragment(Fragment::SqlSelectOrderBy),
                out,
                &scope,
                order,
            )?;
        }
        if let Some(limit) = statement.limit {
            let _ = write!(out, " LIMIT {}", limit);
        }
        Ok(())
    }

    /// Everything before the table name of an INSERT.
    fn write_insert_into(&self, out: &mut String, ignore: bool, _upsert: bool) {
        out.push_str("INSERT ");
        if ignore {
            out.push_str(self.dialect().insert_ignore());
            out.push(' ');
        }
        out.push_str("INTO ");
    }

    /// Column and value lists of an INSERT without values.
    fn write_insert_defaults(&self, out: &mut String) {
        out.push_str(" () VALUES ()");
    }

    /// Emit INSERT of a single row.
    fn write_insert(
        &self,
        out: &mut String,
        converters: &Converters,
        statement: &InsertStatement,
    ) -> Result<()> {
        out.reserve(128 + statement.values.len() * 32);
        self.write_insert_into(out, statement.ignore, statement.upsert);
        let context = Context::new(converters, Fragment::SqlInsertInto, false);
        self.write_table_ref(&context, out, statement.table);
        if statement.values.is_empty() {
            self.write_insert_defaults(out);
            return Ok(());
        }
        out.push_str(" (");
        separated_by(
            out,
            &statement.values,
            |out, (column, _)| self.write_column_ref(&context, out, column),
            ", ",
        );
        out.push_str(") VALUES (");
        let values_context = context.switch_fragment(Fragment::SqlInsertIntoValues);
        try_separated_by(
            out,
            &statement.values,
            |out, (column, value)| {
                self.write_literal(&values_context, out, column, &Argument::Value((*value).clone()))
            },
            ", ",
        )?;
        out.push(')');
        if statement.upsert {
            self.write_upsert(
                &context.switch_fragment(Fragment::SqlInsertIntoOnConflict),
                out,
                statement,
            );
        }
        Ok(())
    }

    /// Update clause of an upsert, assigns every inserted non unique column.
    fn write_upsert(&self, context: &Context, out: &mut String, statement: &InsertStatement) {
        out.push_str(" ON DUPLICATE KEY UPDATE ");
        separated_by(
            out,
            statement.values.iter().filter(|(c, _)| !c.is_unique_key()),
            |out, (column, _)| {
                self.write_column_ref(context, out, column);
                out.push_str(" = VALUES(");
                self.write_column_ref(context, out, column);
                out.push(')');
            },
            ", ",
        );
    }

    /// Emit UPDATE statement, SET columns are never qualified.
    fn write_update(
        &self,
        out: &mut String,
        converters: &Converters,
        statement: &UpdateStatement,
    ) -> Result<()> {
        out.push_str("UPDATE ");
        let context = Context::new(converters, Fragment::SqlUpdateSet, true);
        self.write_table_ref(&context, out, statement.scope.table());
        out.push_str(" SET ");
        let set_context = context.unqualified();
        try_separated_by(
            out,
            &statement.set,
            |out, (column, value)| {
                self.write_column_ref(&set_context, out, column);
                out.push_str(" = ");
                self.write_literal(&set_context, out, column, &Argument::Value((*value).clone()))
            },
            ", ",
        )?;
        if let Some(condition) = statement.condition {
            out.push_str(" WHERE ");
            self.write_where(
                &context.switch_fragment(Fragment::SqlUpdateWhere),
                out,
                &statement.scope,
                condition,
            )?;
        }
        if let Some(limit) = statement.limit {
            let _ = write!(out, " LIMIT {}", limit);
        }
        Ok(())
    }

    /// Emit DELETE statement.
    fn write_delete(
        &self,
        out: &mut String,
        converters: &Converters,
        statement: &DeleteStatement,
    ) -> Result<()> {
        out.push_str("DELETE FROM ");
        let context = Context::new(converters, Fragment::SqlDeleteFrom, true);
        self.write_table_ref(&context, out, statement.scope.table());
        if let Some(condition) = statement.condition {
            out.push_str(" WHERE ");
            self.write_where(
                &context.switch_fragment(Fragment::SqlDeleteFromWhere),
                out,
                &statement.scope,
                condition,
            )?;
        }
        if let Some(limit) = statement.limit {
            let _ = write!(out, " LIMIT {}", limit);
        }
        Ok(())
    }

    fn write_column_type(&self, out: &mut String, column: &ColumnDef) {
        out.push_str(column.sql_type.name());
        if column.sql_type.has_length() {
            let _ = write!(out, "({})", column.length);
        }
    }

    /// Column definition as used by CREATE TABLE and ALTER TABLE ADD.
    fn write_column_definition(&self, context: &Context, out: &mut String, column: &ColumnDef) {
        self.write_identifier(context, out, &column.name);
        out.push(' ');
        self.write_column_type(out, column);
        if column.unique && !column.primary_key {
            out.push_str(" UNIQUE");
        }
        if column.primary_key {
            out.push_str(" PRIMARY KEY");
            if column.auto_increment {
                out.push(' ');
                out.push_str(self.dialect().auto_increment());
            }
        }
        if column.not_null && !column.primary_key {
            out.push_str(" NOT NULL");
        }
    }

    fn write_create_table(&self, out: &mut String, converters: &Converters, table: &TableDef) {
        out.reserve(64 + table.columns.len() * 32);
        out.push_str("CREATE TABLE IF NOT EXISTS ");
        let context = Context::new(converters, Fragment::SqlCreateTable, false);
        self.write_table_ref(&context, out, table);
        out.push_str(" (");
        separated_by(
            out,
            &table.columns,
            |out, column| self.write_column_definition(&context, out, column),
            ", ",
        );
        for column in &table.columns {
            let Some(reference) = column.references.as_ref().filter(|r| r.constraint) else {
                continue;
            };
            out.push_str(", FOREIGN KEY(");
            self.write_identifier(&context, out, &column.name);
            out.push_str(") REFERENCES ");
            self.write_identifier(&context, out, &reference.table);
            out.push('(');
            self.write_identifier(&context, out, &reference.column);
            out.push(')');
        }
        out.push(')');
    }

    /// Query returning a positive count when the index already exists.
    ///
    /// Returns `false` when the dialect checks existence in the CREATE INDEX itself.
    fn write_index_lookup(&self, _out: &mut String, _statement: &IndexStatement) -> bool {
        false
    }

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
        out.push_str("INDEX ");
        let context = Context::new(converters, Fragment::SqlCreateIndex, false);
        self.write_identifier(&context, out, &statement.name);
        out.push_str(" ON ");
        self.write_table_ref(&context, out, statement.table);
        out.push('(');
        separated_by(
            out,
            &statement.columns,
            |out, column| {
                self.write_column_ref(&context, out, column);
                if column.sql_type.has_length() {
                    let _ = write!(out, "({})", column.length.min(256));
                }
            },
            ", ",
        );
        out.push(')');
        Ok(())
    }

    /// Query listing the columns of `table`, decoded by [`SqlWriter::column_info`].
    fn write_describe_columns(&self, out: &mut String, converters: &Converters, table: &str) {
        let context = Context::new(converters, Fragment::None, false);
        out.push_str(
            "SELECT table_name, column_name, data_type, character_maximum_length \
             FROM information_schema.columns \
             WHERE table_schema = DATABASE() AND table_name = ",
        );
        self.write_value_string(&context, out, table);
        out.push_str(" ORDER BY ordinal_position");
    }

    fn column_info(&self, table: &str, row: RowLabeled) -> Result<ColumnInfo> {
        let mut values = row.values.into_vec().into_iter();
        let _table_name = values.next();
        let name = values.next().unwrap_or_default();
        let data_type = values.next().unwrap_or_default();
        let length = values.next().unwrap_or_default();
        Ok(ColumnInfo {
            table: table.into(),
            name: String::try_from_stored(name)?.to_lowercase(),
            data_type: String::try_from_stored(data_type)?.to_uppercase(),
            length: Option::<i64>::try_from_stored(length)?
                .and_then(|v| u32::try_from(v).ok()),
        })
    }

    /// Statements adding `columns` to `table`, each paired with the column it follows.
    fn add_columns(
        &self,
        converters: &Converters,
        table: &TableDef,
        columns: &[(&ColumnDef, Option<&ColumnDef>)],
    ) -> Vec<String> {
        let context = Context::new(converters, Fragment::SqlAlterTable, false);
        let mut out = String::from("ALTER TABLE ");
        self.write_table_ref(&context, &mut out, table);
        out.push(' ');
        separated_by(
            &mut out,
            columns,
            |out, (column, previous)| {
                out.push_str("ADD COLUMN ");
                self.write_column_definition(&context, out, column);
                match previous {
                    Some(previous) => {
                        out.push_str(" AFTER ");
                        self.write_identifier(&context, out, &previous.name);
                    }
                    None => out.push_str(" FIRST"),
                }
            },
            ", ",
        );
        vec![out]
    }

    fn drop_columns(&self, converters: &Converters, table: &str, columns: &[String]) -> Vec<String> {
        let context = Context::new(converters, Fragment::SqlAlterTable, false);
        let mut out = String::from("ALTER TABLE ");
        self.write_identifier(&context, &mut out, table);
        out.push(' ');
        separated_by(
            &mut out,
            columns,
            |out, column| {
                out.push_str("DROP COLUMN ");
                self.write_identifier(&context, out, column);
            },
            ", ",
        );
        vec![out]
    }
}

/// Lenient extraction of text and integers from catalog rows.
pub(crate) trait FromStored: Sized {
    fn try_from_stored(value: Value) -> Result<Self>;
}

impl FromStored for String {
    fn try_from_stored(value: Value) -> Result<Self> {
        match value {
            Value::Varchar(Some(v)) => Ok(v),
            Value::Blob(Some(v)) => Ok(String::from_utf8_lossy(&v).into_owned()),
            v if v.is_null() => Ok(String::new()),
            v => Err(Error::msg(format!("Expected text, got {:?}", v))),
        }
    }
}

impl FromStored for Option<i64> {
    fn try_from_stored(value: Value) -> Result<Self> {
        match value {
            v if v.is_null() => Ok(None),
            Value::Varchar(Some(v)) => Ok(v.trim().parse().ok()),
            v => Ok(Some(<i64 as crate::AsValue>::try_from_value(v)?)),
        }
    }
}

/// Splits a declared type such as `VARCHAR(100)` into name and length.
pub fn split_type(declared: &str) -> (String, Option<u32>) {
    match declared.split_once('(') {
        Some((name, rest)) => (
            name.trim().to_uppercase(),
            rest.trim_end_matches(')').trim().parse().ok(),
        ),
        None => (declared.trim().to_uppercase(), None),
    }
}
