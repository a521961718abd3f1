use crate::{
    AsValue, ColumnDef, ColumnInfo, CompositeIndex, Database, Driver, IndexStatement, Job,
    KeelError, Query, Result, SqlWriter, TableDef,
};
use std::sync::Arc;

/// `CREATE TABLE IF NOT EXISTS` for a table definition.
#[derive(Debug)]
pub struct CreateTableQuery<D: Driver> {
    database: Database<D>,
    table: Arc<TableDef>,
}

impl<D: Driver> CreateTableQuery<D> {
    pub fn new(database: Database<D>, table: Arc<TableDef>) -> Self {
        Self { database, table }
    }

    pub fn sql(&self) -> String {
        let shared = &self.database.shared;
        let mut sql = String::new();
        shared
            .writer
            .write_create_table(&mut sql, &shared.converters, &self.table);
        sql
    }
}

impl<D: Driver> Query for CreateTableQuery<D> {
    type Output = ();

    fn into_job(self) -> Result<Job<Self::Output>> {
        Ok(self
            .database
            .job(self.sql(), |shared, sql| shared.execute(sql).map(|_| ())))
    }
}

/// Columns of a table as the database reports them, in table order.
#[derive(Debug)]
pub struct DescribeColumnsQuery<D: Driver> {
    database: Database<D>,
    table: String,
}

impl<D: Driver> DescribeColumnsQuery<D> {
    pub fn new(database: Database<D>, table: impl Into<String>) -> Self {
        Self {
            database,
            table: table.into(),
        }
    }

    pub fn sql(&self) -> String {
        let shared = &self.database.shared;
        let mut sql = String::new();
        shared
            .writer
            .write_describe_columns(&mut sql, &shared.converters, &self.table);
        sql
    }
}

impl<D: Driver> Query for DescribeColumnsQuery<D> {
    type Output = Vec<ColumnInfo>;

    fn into_job(self) -> Result<Job<Self::Output>> {
        let sql = self.sql();
        let table = self.table;
        Ok(self.database.job(sql, move |shared, sql| {
            shared.fetch(sql, |rows| {
                rows.map(|row| shared.writer.column_info(&table, row?))
                    .collect()
            })
        }))
    }
}

/// Adds columns of a definition to its table, each placed after its predecessor.
#[derive(Debug)]
pub struct AddColumnsQuery<D: Driver> {
    database: Database<D>,
    statements: Vec<String>,
}

impl<D: Driver> AddColumnsQuery<D> {
    /// `columns` pairs the index of each added column with the index of the column it follows.
    pub fn new(
        database: Database<D>,
        table: Arc<TableDef>,
        columns: Vec<(usize, Option<usize>)>,
    ) -> Result<Self> {
        if columns.is_empty() {
            return Err(KeelError::argument(format!(
                "No column to add to `{}`",
                table.name
            )));
        }
        let columns = columns
            .iter()
            .map(|&(column, previous)| {
                let column = table.columns.get(column).ok_or_else(|| {
                    KeelError::argument(format!("Table `{}` has no column {}", table.name, column))
                })?;
                Ok((column, previous.and_then(|i| table.columns.get(i))))
            })
            .collect::<Result<Vec<(&ColumnDef, Option<&ColumnDef>)>>>()?;
        let shared = &database.shared;
        let statements = shared
            .writer
            .add_columns(&shared.converters, &table, &columns);
        Ok(Self {
            database,
            statements,
        })
    }

    pub fn statements(&self) -> &[String] {
        &self.statements
    }
}

impl<D: Driver> Query for AddColumnsQuery<D> {
    type Output = ();

    fn into_job(self) -> Result<Job<Self::Output>> {
        Ok(execute_all(&self.database, self.statements))
    }
}

/// Drops columns from a table.
#[derive(Debug)]
pub struct DropColumnsQuery<D: Driver> {
    database: Database<D>,
    statements: Vec<String>,
}

impl<D: Driver> DropColumnsQuery<D> {
    pub fn new(database: Database<D>, table: Arc<TableDef>, columns: Vec<String>) -> Result<Self> {
        if columns.is_empty() {
            return Err(KeelError::argument(format!(
                "No column to drop from `{}`",
                table.name
            )));
        }
        let shared = &database.shared;
        let statements = shared
            .writer
            .drop_columns(&shared.converters, &table.name, &columns);
        Ok(Self {
            database,
            statements,
        })
    }

    pub fn statements(&self) -> &[String] {
        &self.statements
    }
}

impl<D: Driver> Query for DropColumnsQuery<D> {
    type Output = ();

    fn into_job(self) -> Result<Job<Self::Output>> {
        Ok(execute_all(&self.database, self.statements))
    }
}

#[derive(Debug)]
struct IndexStatements {
    /// Counts existing indexes with the same name, when the dialect needs it.
    lookup: Option<String>,
    create: String,
}

/// Creates indexes on a table, skipping the ones already present.
#[derive(Debug)]
pub struct CreateIndexesQuery<D: Driver> {
    database: Database<D>,
    indexes: Vec<IndexStatements>,
}

impl<D: Driver> CreateIndexesQuery<D> {
    pub fn new(
        database: Database<D>,
        table: Arc<TableDef>,
        indexes: Vec<CompositeIndex>,
    ) -> Result<Self> {
        let shared = &database.shared;
        let indexes = indexes
            .iter()
            .map(|index| {
                let statement = index_statement(&table, index)?;
                let mut lookup = String::new();
                let lookup = shared
                    .writer
                    .write_index_lookup(&mut lookup, &statement)
                    .then_some(lookup);
                let mut create = String::new();
                shared
                    .writer
                    .write_create_index(&mut create, &shared.converters, &statement)?;
                Ok(IndexStatements { lookup, create })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { database, indexes })
    }

    pub fn statements(&self) -> impl Iterator<Item = &str> {
        self.indexes.iter().map(|v| v.create.as_str())
    }
}

impl<D: Driver> Query for CreateIndexesQuery<D> {
    type Output = ();

    fn into_job(self) -> Result<Job<Self::Output>> {
        let sql = self
            .indexes
            .iter()
            .map(|v| v.create.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        let indexes = self.indexes;
        Ok(self.database.job(sql, move |shared, _| {
            for index in &indexes {
                if let Some(lookup) = &index.lookup {
                    let existing = shared.fetch(lookup, |mut rows| match rows.next() {
                        Some(row) => {
                            let value = row?.values.into_vec().into_iter().next();
                            Option::<i64>::try_from_value(value.unwrap_or_default())
                        }
                        None => Ok(None),
                    })?;
                    if existing.unwrap_or_default() > 0 {
                        log::debug!("Index already present, skipping `{}`", index.create);
                        continue;
                    }
                }
                shared.execute(&index.create)?;
            }
            Ok(())
        }))
    }
}

fn index_statement<'a>(table: &'a TableDef, index: &CompositeIndex) -> Result<IndexStatement<'a>> {
    if index.columns.is_empty() {
        return Err(KeelError::argument(format!(
            "An index on `{}` needs at least one column",
            table.name
        )));
    }
    let columns = index
        .columns
        .iter()
        .map(|name| {
            let column = table.require_column(name)?;
            if !column.sql_type.is_indexable(table.dialect) {
                return Err(KeelError::argument(format!(
                    "Column `{}` of type {} cannot be indexed",
                    column.qualified_name(),
                    column.sql_type.name()
                )));
            }
            Ok(column)
        })
        .collect::<Result<Vec<_>>>()?;
    let mut name = columns
        .iter()
        .map(|v| v.name.as_str())
        .collect::<Vec<_>>()
        .join("_");
    name.push_str("_ormm_idx");
    Ok(IndexStatement {
        table,
        name,
        columns,
        unique: index.unique,
    })
}

/// Runs `statements` one after the other on the same job.
fn execute_all<D: Driver>(database: &Database<D>, statements: Vec<String>) -> Job<()> {
    let sql = statements.join("; ");
    database.job(sql, move |shared, _| {
        for statement in &statements {
            shared.execute(statement)?;
        }
        Ok(())
    })
}
