use crate::{
    Database, Driver, Entity, Job, KeelError, Query, Result, Scope, SqlWriter, Table, TableDef,
    UpdateStatement, Value, Where,
};
use std::fmt::{self, Debug};

/// UPDATE of the rows matching a filter.
///
/// Without a filter the statement touches every row, which is refused unless
/// the table allows unsafe operations.
pub struct UpdateQuery<D: Driver, E> {
    database: Database<D>,
    table: Table<E>,
    set: Vec<(usize, Value)>,
    condition: Option<Where>,
    limit: Option<u32>,
}

impl<D: Driver, E> Debug for UpdateQuery<D, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateQuery")
            .field("table", &self.table.name())
            .field("set", &self.set)
            .field("condition", &self.condition)
            .field("limit", &self.limit)
            .finish_non_exhaustive()
    }
}

impl<D: Driver, E: Entity> UpdateQuery<D, E> {
    pub(crate) fn new(database: Database<D>, table: Table<E>) -> Self {
        Self {
            database,
            table,
            set: Vec::new(),
            condition: None,
            limit: None,
        }
    }

    /// Assigns a host value to `column`.
    pub fn set(mut self, column: &str, value: impl Into<Value>) -> Result<Self> {
        let index = self.table.def.require_column_index(column)?;
        let value = value.into();
        match self.set.iter_mut().find(|(i, _)| *i == index) {
            Some((_, current)) => *current = value,
            None => self.set.push((index, value)),
        }
        Ok(self)
    }

    pub fn filter(mut self, condition: Where) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn limit(mut self, limit: u32) -> Result<Self> {
        check_limit(&self.table.def)?;
        self.limit = Some(limit);
        Ok(self)
    }

    pub fn sql(&self) -> Result<String> {
        if self.set.is_empty() {
            return Err(KeelError::argument(format!(
                "An update of `{}` must set at least one column",
                self.table.name()
            )));
        }
        check_unsafe(&self.table.def, self.condition.as_ref(), "UPDATE")?;
        render(
            &self.database,
            &self.table.def,
            &self.set,
            self.condition.as_ref(),
            self.limit,
        )
    }
}

impl<D: Driver, E: Entity> Query for UpdateQuery<D, E> {
    type Output = u64;

    fn into_job(self) -> Result<Job<Self::Output>> {
        let sql = self.sql()?;
        Ok(self.database.job(sql, |shared, sql| {
            Ok(shared.execute(sql)?.rows_affected)
        }))
    }
}

/// UPDATE of the row of an entity, matched by its primary key.
pub struct UpdateObjectQuery<D: Driver, E> {
    database: Database<D>,
    table: Table<E>,
    entity: E,
}

impl<D: Driver, E> Debug for UpdateObjectQuery<D, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateObjectQuery")
            .field("table", &self.table.name())
            .finish_non_exhaustive()
    }
}

impl<D: Driver, E: Entity> UpdateObjectQuery<D, E> {
    pub(crate) fn new(database: Database<D>, table: Table<E>, entity: E) -> Result<Self> {
        if table.def.key.is_none() {
            return Err(KeelError::argument(format!(
                "Table `{}` has no primary key, its objects cannot be updated",
                table.name()
            )));
        }
        Ok(Self {
            database,
            table,
            entity,
        })
    }

    pub fn sql(&self) -> Result<String> {
        let def = &self.table.def;
        let Some(key) = def.key else {
            unreachable!("Checked when the query was created")
        };
        let mut set = Vec::with_capacity(def.columns.len());
        let mut key_value = Value::Null;
        for (i, value) in self.table.read(&self.entity).into_iter().enumerate() {
            if i == key {
                key_value = value;
            } else {
                set.push((i, value));
            }
        }
        if set.is_empty() {
            return Err(KeelError::argument(format!(
                "Table `{}` has no column to update besides its key",
                def.name
            )));
        }
        let condition = Where::eq(def.columns[key].name.clone(), key_value);
        let limit = def.dialect.supports_mutation_limit().then_some(1);
        render(&self.database, def, &set, Some(&condition), limit)
    }
}

impl<D: Driver, E: Entity> Query for UpdateObjectQuery<D, E> {
    type Output = E;

    fn into_job(self) -> Result<Job<Self::Output>> {
        let sql = self.sql()?;
        let entity = self.entity;
        Ok(self.database.job(sql, move |shared, sql| {
            shared.execute(sql)?;
            Ok(entity)
        }))
    }
}

pub(crate) fn check_limit(def: &TableDef) -> Result<()> {
    if def.dialect.supports_mutation_limit() {
        return Ok(());
    }
    Err(KeelError::state(format!(
        "LIMIT is not supported on UPDATE and DELETE by the {:?} dialect",
        def.dialect
    )))
}

pub(crate) fn check_unsafe(def: &TableDef, condition: Option<&Where>, statement: &str) -> Result<()> {
    if condition.is_some() || def.allow_unsafe_operations {
        return Ok(());
    }
    Err(KeelError::UnsafeQuery(format!(
        "{statement} without WHERE on `{}`, filter it or allow unsafe operations on the table",
        def.name
    ))
    .into())
}

fn render<D: Driver>(
    database: &Database<D>,
    def: &TableDef,
    set: &[(usize, Value)],
    condition: Option<&Where>,
    limit: Option<u32>,
) -> Result<String> {
    let tables = [def];
    let statement = UpdateStatement {
        scope: Scope::new(&tables),
        set: set.iter().map(|(i, value)| (&def.columns[*i], value)).collect(),
        condition,
        limit,
    };
    let shared = &database.shared;
    let mut sql = String::new();
    shared
        .writer
        .write_update(&mut sql, &shared.converters, &statement)?;
    Ok(sql)
}
