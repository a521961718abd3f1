use super::update::{check_limit, check_unsafe};
use crate::{
    Database, DeleteStatement, Driver, Entity, Job, Query, Result, Scope, SqlWriter, Table, Where,
};
use std::fmt::{self, Debug};

/// DELETE of the rows matching a filter, guarded like [`UpdateQuery`](crate::UpdateQuery).
pub struct DeleteQuery<D: Driver, E> {
    database: Database<D>,
    table: Table<E>,
    condition: Option<Where>,
    limit: Option<u32>,
}

impl<D: Driver, E> Debug for DeleteQuery<D, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeleteQuery")
            .field("table", &self.table.name())
            .field("condition", &self.condition)
            .field("limit", &self.limit)
            .finish_non_exhaustive()
    }
}

impl<D: Driver, E: Entity> DeleteQuery<D, E> {
    pub(crate) fn new(database: Database<D>, table: Table<E>) -> Self {
        Self {
            database,
            table,
            condition: None,
            limit: None,
        }
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
        let def = &*self.table.def;
        check_unsafe(def, self.condition.as_ref(), "DELETE")?;
        let tables = [def];
        let statement = DeleteStatement {
            scope: Scope::new(&tables),
            condition: self.condition.as_ref(),
            limit: self.limit,
        };
        let shared = &self.database.shared;
        let mut sql = String::new();
        shared
            .writer
            .write_delete(&mut sql, &shared.converters, &statement)?;
        Ok(sql)
    }
}

impl<D: Driver, E: Entity> Query for DeleteQuery<D, E> {
    type Output = u64;

    fn into_job(self) -> Result<Job<Self::Output>> {
        let sql = self.sql()?;
        Ok(self
            .database
            .job(sql, |shared, sql| Ok(shared.execute(sql)?.rows_affected)))
    }
}
