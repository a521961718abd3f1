use crate::{
    Database, Driver, Entity, InsertStatement, Job, KeelError, Query, Result, SqlWriter, Table,
    TableDef, Value,
};
use std::fmt::{self, Debug};

/// INSERT of one row built from explicit column values.
///
/// Columns not given are left to the database default.
pub struct InsertQuery<D: Driver, E> {
    database: Database<D>,
    table: Table<E>,
    values: Vec<(usize, Value)>,
    ignore: bool,
    upsert: bool,
}

impl<D: Driver, E> Debug for InsertQuery<D, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InsertQuery")
            .field("table", &self.table.name())
            .field("values", &self.values)
            .field("ignore", &self.ignore)
            .field("upsert", &self.upsert)
            .finish_non_exhaustive()
    }
}

impl<D: Driver, E: Entity> InsertQuery<D, E> {
    pub(crate) fn new(database: Database<D>, table: Table<E>) -> Self {
        Self {
            database,
            table,
            values: Vec::new(),
            ignore: false,
            upsert: false,
        }
    }

    /// Host value of `column`, a second value for the same column replaces the first.
    pub fn value(mut self, column: &str, value: impl Into<Value>) -> Result<Self> {
        let index = self.table.def.require_column_index(column)?;
        let value = value.into();
        match self.values.iter_mut().find(|(i, _)| *i == index) {
            Some((_, current)) => *current = value,
            None => self.values.push((index, value)),
        }
        Ok(self)
    }

    /// Skips the row when it conflicts with an existing one.
    pub fn ignore(mut self) -> Self {
        self.ignore = true;
        self
    }

    /// Updates the conflicting row with the inserted values.
    pub fn on_duplicate_update(mut self) -> Self {
        self.upsert = true;
        self
    }

    pub fn sql(&self) -> Result<String> {
        render(&self.database, &self.table.def, &self.values, self.ignore, self.upsert)
    }
}

impl<D: Driver, E: Entity> Query for InsertQuery<D, E> {
    type Output = Option<E>;

    fn into_job(self) -> Result<Job<Self::Output>> {
        let mut entity = E::default();
        for (index, value) in &self.values {
            self.table.set(&mut entity, *index, value.clone())?;
        }
        insert_job(
            self.database,
            self.table,
            self.values,
            self.ignore,
            self.upsert,
            entity,
        )
    }
}

/// INSERT of every column of an entity.
///
/// An auto increment key still holding its default is left out and receives
/// the generated value.
pub struct InsertObjectQuery<D: Driver, E> {
    database: Database<D>,
    table: Table<E>,
    entity: E,
    ignore: bool,
    upsert: bool,
}

impl<D: Driver, E> Debug for InsertObjectQuery<D, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InsertObjectQuery")
            .field("table", &self.table.name())
            .field("ignore", &self.ignore)
            .field("upsert", &self.upsert)
            .finish_non_exhaustive()
    }
}

impl<D: Driver, E: Entity> InsertObjectQuery<D, E> {
    pub(crate) fn new(database: Database<D>, table: Table<E>, entity: E) -> Self {
        Self {
            database,
            table,
            entity,
            ignore: false,
            upsert: false,
        }
    }

    pub fn ignore(mut self) -> Self {
        self.ignore = true;
        self
    }

    pub fn on_duplicate_update(mut self) -> Self {
        self.upsert = true;
        self
    }

    pub fn sql(&self) -> Result<String> {
        let values = self.values();
        render(&self.database, &self.table.def, &values, self.ignore, self.upsert)
    }

    fn values(&self) -> Vec<(usize, Value)> {
        self.table
            .read(&self.entity)
            .into_iter()
            .enumerate()
            .filter(|(i, value)| {
                !(self.table.def.columns[*i].auto_increment && is_unset_key(value))
            })
            .collect()
    }
}

impl<D: Driver, E: Entity> Query for InsertObjectQuery<D, E> {
    type Output = Option<E>;

    fn into_job(self) -> Result<Job<Self::Output>> {
        let values = self.values();
        insert_job(
            self.database,
            self.table,
            values,
            self.ignore,
            self.upsert,
            self.entity,
        )
    }
}

fn is_unset_key(value: &Value) -> bool {
    value.is_null()
        || matches!(
            value,
            Value::Int8(Some(0))
                | Value::Int16(Some(0))
                | Value::Int32(Some(0))
                | Value::Int64(Some(0))
        )
}

fn render<D: Driver>(
    database: &Database<D>,
    def: &TableDef,
    values: &[(usize, Value)],
    ignore: bool,
    upsert: bool,
) -> Result<String> {
    if ignore && upsert {
        return Err(KeelError::argument(format!(
            "An insert into `{}` cannot both ignore conflicts and update on duplicate",
            def.name
        )));
    }
    if upsert {
        let keyed = values.iter().any(|(i, _)| def.columns[*i].is_unique_key());
        let updated = values.iter().any(|(i, _)| !def.columns[*i].is_unique_key());
        if !keyed || !updated {
            return Err(KeelError::argument(format!(
                "An update on duplicate into `{}` needs a unique column to detect the conflict \
                 and a non unique column to update",
                def.name
            )));
        }
    }
    let statement = InsertStatement {
        table: def,
        values: values
            .iter()
            .map(|(i, value)| (&def.columns[*i], value))
            .collect(),
        ignore,
        upsert,
    };
    let shared = &database.shared;
    let mut sql = String::new();
    shared
        .writer
        .write_insert(&mut sql, &shared.converters, &statement)?;
    Ok(sql)
}

fn insert_job<D: Driver, E: Entity>(
    database: Database<D>,
    table: Table<E>,
    values: Vec<(usize, Value)>,
    ignore: bool,
    upsert: bool,
    mut entity: E,
) -> Result<Job<Option<E>>> {
    let sql = render(&database, &table.def, &values, ignore, upsert)?;
    let generated = table
        .def
        .key
        .filter(|key| table.def.columns[*key].auto_increment)
        .filter(|key| !values.iter().any(|(i, _)| i == key));
    Ok(database.job(sql, move |shared, sql| {
        let result = shared.execute(sql)?;
        if result.rows_affected == 0 {
            return Ok(None);
        }
        if let (Some(key), Some(id)) = (generated, result.last_affected_id) {
            let value = Value::Int64(Some(id)).coerce_to(&table.def.columns[key].value)?;
            table.set(&mut entity, key, value)?;
        }
        Ok(Some(entity))
    }))
}
