use crate::{
    Aggregate, AsValue, Cardinality, ColumnDef, Collapsed, Database, Driver, Entity, Group, Job,
    JoinOn, JoinStatement, JoinType, KeelError, Materializer, Order, Projection, Query, Result,
    Scope, SelectStatement, SqlWriter, Subquery, Table, TableDef, Value, Where, collapse,
};
use std::{
    any::type_name,
    fmt::{self, Debug},
    marker::PhantomData,
    sync::Arc,
};

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Rows {}
    impl Sealed for super::Single {}
    impl Sealed for super::Raw {}
    impl Sealed for super::RawSingle {}
}

/// Shape of the result of a [`SelectQuery`].
pub trait SelectMode: sealed::Sealed + Send + 'static {
    const SINGLE: bool;
}

/// Modes decoding whole entities, the only ones accepting joins.
pub trait EntityMode: SelectMode {}

/// Every matching entity.
#[derive(Debug)]
pub struct Rows;
/// The first matching entity.
#[derive(Debug)]
pub struct Single;
/// Values of selected columns, row by row.
#[derive(Debug)]
pub struct Raw;
/// Values of selected columns of the first matching row.
#[derive(Debug)]
pub struct RawSingle;

impl SelectMode for Rows {
    const SINGLE: bool = false;
}
impl SelectMode for Single {
    const SINGLE: bool = true;
}
impl SelectMode for Raw {
    const SINGLE: bool = false;
}
impl SelectMode for RawSingle {
    const SINGLE: bool = true;
}
impl EntityMode for Rows {}
impl EntityMode for Single {}

type Apply<E> = Box<dyn FnMut(&mut E, Collapsed) -> Result<()> + Send>;

struct JoinProjection<E> {
    column: usize,
    cardinality: Cardinality,
    apply: Apply<E>,
}

struct Join<E> {
    kind: JoinType,
    table: Arc<TableDef>,
    on: JoinOn,
    projections: Vec<JoinProjection<E>>,
}

/// SELECT over the table of `E`.
///
/// The mode parameter decides the output: [`Rows`] yields `Vec<E>`, [`Single`]
/// yields `Option<E>`, [`Raw`] and [`RawSingle`] yield the stored values of the
/// columns picked by [`SelectQuery::columns`].
///
/// # Examples
/// ```rust,ignore
/// let adults = database
///     .select::<Person>()?
///     .filter(Where::ge("age", 18))
///     .order(Order::asc("name"))
///     .limit(10)?
///     .complete()?;
/// ```
pub struct SelectQuery<D: Driver, E, M = Rows> {
    database: Database<D>,
    table: Table<E>,
    columns: Option<Vec<usize>>,
    condition: Option<Where>,
    order: Option<Order>,
    group_by: Vec<String>,
    limit: Option<u32>,
    joins: Vec<Join<E>>,
    mode: PhantomData<M>,
}

impl<D: Driver, E, M> Debug for SelectQuery<D, E, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectQuery")
            .field("table", &self.table.name())
            .field("mode", &type_name::<M>())
            .field("condition", &self.condition)
            .field("order", &self.order)
            .field("limit", &self.limit)
            .field("joins", &self.joins.len())
            .finish_non_exhaustive()
    }
}

impl<D: Driver, E: Entity> SelectQuery<D, E, Rows> {
    pub(crate) fn new(database: Database<D>, table: Table<E>) -> Self {
        Self {
            database,
            table,
            columns: None,
            condition: None,
            order: None,
            group_by: Vec::new(),
            limit: None,
            joins: Vec::new(),
            mode: PhantomData,
        }
    }

    /// Switches to the first matching entity, the limit becomes 1.
    pub fn single(self) -> Result<SelectQuery<D, E, Single>> {
        self.require_no_joins("single")?;
        let mut query = self.into_mode();
        query.limit = Some(1);
        Ok(query)
    }

    /// Switches to the raw values of `columns`, in the order given.
    pub fn columns<S: AsRef<str>>(
        self,
        columns: impl IntoIterator<Item = S>,
    ) -> Result<SelectQuery<D, E, Raw>> {
        self.require_no_joins("columns")?;
        let indices = columns
            .into_iter()
            .map(|name| self.table.def.require_column_index(name.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        if indices.is_empty() {
            return Err(KeelError::argument("At least one column must be selected"));
        }
        let mut query = self.into_mode();
        query.columns = Some(indices);
        Ok(query)
    }
}

impl<D: Driver, E: Entity> SelectQuery<D, E, Raw> {
    /// Switches to the values of the first matching row.
    pub fn single(self) -> Result<SelectQuery<D, E, RawSingle>> {
        let mut query = self.into_mode();
        query.limit = Some(1);
        Ok(query)
    }
}

impl<D: Driver, E: Entity, M: SelectMode> SelectQuery<D, E, M> {
    /// Replaces the filter.
    pub fn filter(mut self, condition: Where) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn order(mut self, order: Order) -> Self {
        self.order = Some(order);
        self
    }

    /// Columns of the GROUP BY clause, resolved when the query is rendered.
    pub fn group_by<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.group_by = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Caps the number of results, with joins it counts distinct driving rows.
    pub fn limit(mut self, limit: u32) -> Result<Self> {
        if M::SINGLE {
            return Err(KeelError::state(
                "A single row query has an implicit limit of 1",
            ));
        }
        self.limit = Some(limit);
        Ok(self)
    }

    pub fn sql(&self) -> Result<String> {
        self.render(None)
    }

    /// The rendered statement, to be nested in a filter of another query.
    pub fn into_subquery(self) -> Result<Subquery> {
        self.render(None).map(Subquery)
    }

    /// Smallest value of `column`, `T` must be the host type of the column.
    pub fn min<T: AsValue + Send + 'static>(
        self,
        column: &str,
    ) -> Result<AggregateQuery<D, E, T>> {
        self.aggregate(Aggregate::Min, Some(column))
    }

    /// Largest value of `column`, `T` must be the host type of the column.
    pub fn max<T: AsValue + Send + 'static>(
        self,
        column: &str,
    ) -> Result<AggregateQuery<D, E, T>> {
        self.aggregate(Aggregate::Max, Some(column))
    }

    /// Number of matching rows.
    pub fn count(self) -> Result<AggregateQuery<D, E, i64>> {
        self.aggregate(Aggregate::Count, None)
    }

    /// Number of matching rows where `column` is not NULL.
    pub fn count_column(self, column: &str) -> Result<AggregateQuery<D, E, i64>> {
        self.aggregate(Aggregate::Count, Some(column))
    }

    fn aggregate<T: AsValue + Send + 'static>(
        self,
        aggregate: Aggregate,
        column: Option<&str>,
    ) -> Result<AggregateQuery<D, E, T>> {
        if self.columns.is_some() {
            return Err(KeelError::state(format!(
                "{} cannot be applied to a query with selected columns",
                aggregate.as_str()
            )));
        }
        if self.joins.iter().any(|v| !v.projections.is_empty()) {
            return Err(KeelError::argument(format!(
                "{} cannot be applied to a query projecting joined columns",
                aggregate.as_str()
            )));
        }
        let column = column
            .map(|name| self.table.def.require_column_index(name))
            .transpose()?;
        if let (Aggregate::Min | Aggregate::Max, Some(index)) = (aggregate, column) {
            let def = &self.table.def.columns[index];
            if !T::as_empty_value().same_type(&def.value) {
                return Err(KeelError::argument(format!(
                    "{} of `{}` cannot be read as {}",
                    aggregate.as_str(),
                    def.qualified_name(),
                    type_name::<T>()
                )));
            }
        }
        Ok(AggregateQuery {
            select: self.into_mode(),
            aggregate,
            column,
            output: PhantomData,
        })
    }

    fn into_mode<N>(self) -> SelectQuery<D, E, N> {
        SelectQuery {
            database: self.database,
            table: self.table,
            columns: self.columns,
            condition: self.condition,
            order: self.order,
            group_by: self.group_by,
            limit: self.limit,
            joins: self.joins,
            mode: PhantomData,
        }
    }

    fn require_no_joins(&self, operation: &str) -> Result<()> {
        if self.joins.is_empty() {
            return Ok(());
        }
        Err(KeelError::state(format!(
            "`{operation}` must be called before joining other tables"
        )))
    }

    /// SQL LIMIT only when every joined projection yields one value per row,
    /// otherwise the limit applies to materialized entities.
    fn sql_limit(&self) -> Option<u32> {
        self.limit.filter(|_| {
            self.joins
                .iter()
                .flat_map(|v| &v.projections)
                .all(|v| v.cardinality == Cardinality::One)
        })
    }

    fn render(&self, aggregate: Option<(Aggregate, Option<usize>)>) -> Result<String> {
        let def = &*self.table.def;
        let mut tables: Vec<&TableDef> = Vec::with_capacity(1 + self.joins.len());
        tables.push(def);
        tables.extend(self.joins.iter().map(|v| &*v.table));
        let scope = Scope::new(&tables);
        let projection = match aggregate {
            Some((aggregate, column)) => {
                Projection::Aggregate(aggregate, column.map(|i| &def.columns[i]))
            }
            None => {
                let mut columns: Vec<&ColumnDef> = match &self.columns {
                    Some(indices) => indices.iter().map(|&i| &def.columns[i]).collect(),
                    None => def.columns.iter().collect(),
                };
                for join in &self.joins {
                    columns.extend(join.projections.iter().map(|v| &join.table.columns[v.column]));
                }
                Projection::Columns(columns)
            }
        };
        let group_by = self
            .group_by
            .iter()
            .map(|v| scope.resolve(v))
            .collect::<Result<Vec<_>>>()?;
        let statement = SelectStatement {
            scope,
            projection,
            joins: self
                .joins
                .iter()
                .map(|v| JoinStatement {
                    kind: v.kind,
                    table: &v.table,
                    on: &v.on,
                })
                .collect(),
            condition: self.condition.as_ref(),
            group_by,
            order: self.order.as_ref(),
            limit: match aggregate {
                Some(..) => self.limit,
                None => self.sql_limit(),
            },
        };
        let shared = &self.database.shared;
        let mut sql = String::new();
        shared
            .writer
            .write_select(&mut sql, &shared.converters, &statement)?;
        Ok(sql)
    }

    fn raw_job(self) -> Result<Job<Vec<Vec<Value>>>> {
        let sql = self.render(None)?;
        let Self {
            database,
            table,
            columns,
            limit,
            ..
        } = self;
        let indices = columns.unwrap_or_else(|| (0..table.def.columns.len()).collect());
        let limit = limit.map(|v| v as usize);
        let def = table.def;
        Ok(database.job(sql, move |shared, sql| {
            shared.fetch(sql, |rows| {
                let mut result = Vec::new();
                for row in rows {
                    if limit.is_some_and(|limit| result.len() >= limit) {
                        break;
                    }
                    let values = row?.values;
                    if values.len() != indices.len() {
                        return Err(KeelError::state(format!(
                            "Expected {} columns, the query returned {}",
                            indices.len(),
                            values.len()
                        )));
                    }
                    let values = values
                        .into_vec()
                        .into_iter()
                        .zip(&indices)
                        .map(|(value, &i)| shared.converters.from_storage(&def.columns[i], value))
                        .collect::<Result<Vec<_>>>()?;
                    result.push(values);
                }
                Ok(result)
            })
        }))
    }
}

impl<D: Driver, E: Entity, M: EntityMode> SelectQuery<D, E, M> {
    /// Starts a join with the table of `O`, completed by [`JoinBuilder::finish`].
    pub fn join<O: Entity>(self, kind: JoinType) -> Result<JoinBuilder<D, E, M>> {
        let joined = self.database.table::<O>()?.def.clone();
        if joined == self.table.def {
            return Err(KeelError::argument(format!(
                "Table `{}` cannot be joined with itself",
                joined.name
            )));
        }
        if self.joins.iter().any(|v| v.table == joined) {
            return Err(KeelError::argument(format!(
                "Table `{}` is already joined",
                joined.name
            )));
        }
        Ok(JoinBuilder {
            query: self,
            kind,
            table: joined,
            on: None,
            projections: Vec::new(),
        })
    }

    pub fn inner_join<O: Entity>(self) -> Result<JoinBuilder<D, E, M>> {
        self.join::<O>(JoinType::Inner)
    }

    pub fn left_join<O: Entity>(self) -> Result<JoinBuilder<D, E, M>> {
        self.join::<O>(JoinType::Left)
    }

    pub fn right_join<O: Entity>(self) -> Result<JoinBuilder<D, E, M>> {
        self.join::<O>(JoinType::Right)
    }

    fn entities_job(self) -> Result<Job<Vec<E>>> {
        let sql = self.render(None)?;
        let Self {
            database,
            table,
            joins,
            limit,
            ..
        } = self;
        let width = table.def.columns.len();
        let indices: Vec<usize> = (0..width).collect();
        // Without joins every row is its own entity.
        let key = if joins.is_empty() { None } else { table.def.key };
        let mut joined_columns = Vec::new();
        let mut projections = Vec::new();
        for join in joins {
            for projection in join.projections {
                joined_columns.push((join.table.clone(), projection.column));
                projections.push(projection);
            }
        }
        let limit = limit.map(|v| v as usize);
        Ok(database.job(sql, move |shared, sql| {
            shared.fetch(sql, |rows| {
                let mut materializer = Materializer::new(limit, projections.len());
                for row in rows {
                    let mut values = row?.values.into_vec();
                    if values.len() != width + joined_columns.len() {
                        return Err(KeelError::state(format!(
                            "Expected {} columns, the query returned {}",
                            width + joined_columns.len(),
                            values.len()
                        )));
                    }
                    let joined = values
                        .split_off(width)
                        .into_iter()
                        .zip(&joined_columns)
                        .map(|(value, (def, i))| shared.converters.from_storage(&def.columns[*i], value))
                        .collect::<Result<Vec<_>>>()?;
                    let key = key.map(|i| values[i].clone());
                    let decode = || table.decode(&shared.converters, &indices, values);
                    if !materializer.push(key, decode, joined)? {
                        break;
                    }
                }
                let mut entities = Vec::with_capacity(materializer.len());
                for Group { mut entity, joined } in materializer.finish() {
                    for ((projection, values), (def, i)) in
                        projections.iter_mut().zip(joined).zip(&joined_columns)
                    {
                        let name = def.columns[*i].qualified_name();
                        let collapsed = collapse(projection.cardinality, &name, values)?;
                        (projection.apply)(&mut entity, collapsed)?;
                    }
                    entities.push(entity);
                }
                Ok(entities)
            })
        }))
    }
}

/// Join being configured on a [`SelectQuery`].
///
/// The condition compares a column already in scope with a column of the joined
/// table. Each projection adds a column of the joined table to the result and
/// hands its value to a consumer once per driving entity.
pub struct JoinBuilder<D: Driver, E, M> {
    query: SelectQuery<D, E, M>,
    kind: JoinType,
    table: Arc<TableDef>,
    on: Option<JoinOn>,
    projections: Vec<JoinProjection<E>>,
}

impl<D: Driver, E, M> Debug for JoinBuilder<D, E, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JoinBuilder")
            .field("kind", &self.kind)
            .field("table", &self.table.name)
            .field("on", &self.on)
            .finish_non_exhaustive()
    }
}

impl<D: Driver, E: Entity, M: EntityMode> JoinBuilder<D, E, M> {
    pub fn on(mut self, on: JoinOn) -> Self {
        self.on = Some(on);
        self
    }

    /// Projects `column`, exactly one value is expected per driving entity.
    pub fn one<T: AsValue + 'static>(
        self,
        column: &str,
        mut consumer: impl FnMut(&mut E, T) + Send + 'static,
    ) -> Result<Self> {
        self.project(column, Cardinality::One, move |entity, collapsed| {
            let Collapsed::One(value) = collapsed else {
                unreachable!("A projection of cardinality one collapses into one value")
            };
            consumer(entity, T::try_from_value(value)?);
            Ok(())
        })
    }

    /// Projects `column`, at least one value is expected per driving entity.
    pub fn many<T: AsValue + 'static>(
        self,
        column: &str,
        mut consumer: impl FnMut(&mut E, Vec<T>) + Send + 'static,
    ) -> Result<Self> {
        self.project(column, Cardinality::Many, move |entity, collapsed| {
            let Collapsed::Many(values) = collapsed else {
                unreachable!("A projection of cardinality many collapses into a list")
            };
            let values = values
                .into_iter()
                .map(T::try_from_value)
                .collect::<Result<Vec<_>>>()?;
            consumer(entity, values);
            Ok(())
        })
    }

    fn project(
        mut self,
        column: &str,
        cardinality: Cardinality,
        apply: impl FnMut(&mut E, Collapsed) -> Result<()> + Send + 'static,
    ) -> Result<Self> {
        let index = self.table.require_column_index(column)?;
        self.projections.push(JoinProjection {
            column: index,
            cardinality,
            apply: Box::new(apply),
        });
        Ok(self)
    }

    /// Validates the condition and adds the join to the query.
    pub fn finish(self) -> Result<SelectQuery<D, E, M>> {
        let Self {
            mut query,
            kind,
            table,
            on,
            projections,
        } = self;
        let on = on.ok_or_else(|| {
            KeelError::argument(format!("The join with `{}` has no condition", table.name))
        })?;
        {
            let mut tables: Vec<&TableDef> = vec![&*query.table.def];
            tables.extend(query.joins.iter().map(|v| &*v.table));
            Scope::new(&tables).resolve(&on.column)?;
        }
        table.require_column(&on.joined_column)?;
        query.joins.push(Join {
            kind,
            table,
            on,
            projections,
        });
        Ok(query)
    }
}

impl<D: Driver, E: Entity> Query for SelectQuery<D, E, Rows> {
    type Output = Vec<E>;

    fn into_job(self) -> Result<Job<Self::Output>> {
        self.entities_job()
    }
}

impl<D: Driver, E: Entity> Query for SelectQuery<D, E, Single> {
    type Output = Option<E>;

    fn into_job(self) -> Result<Job<Self::Output>> {
        Ok(self.entities_job()?.map(|v| Ok(v.into_iter().next())))
    }
}

impl<D: Driver, E: Entity> Query for SelectQuery<D, E, Raw> {
    type Output = Vec<Vec<Value>>;

    fn into_job(self) -> Result<Job<Self::Output>> {
        self.raw_job()
    }
}

impl<D: Driver, E: Entity> Query for SelectQuery<D, E, RawSingle> {
    type Output = Option<Vec<Value>>;

    fn into_job(self) -> Result<Job<Self::Output>> {
        Ok(self.raw_job()?.map(|v| Ok(v.into_iter().next())))
    }
}

/// MIN, MAX or COUNT over the rows matched by a select, `None` when the
/// aggregate is NULL.
pub struct AggregateQuery<D: Driver, E, T> {
    select: SelectQuery<D, E, Rows>,
    aggregate: Aggregate,
    column: Option<usize>,
    output: PhantomData<fn() -> T>,
}

impl<D: Driver, E, T> Debug for AggregateQuery<D, E, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AggregateQuery")
            .field("aggregate", &self.aggregate)
            .field("select", &self.select)
            .finish_non_exhaustive()
    }
}

impl<D: Driver, E: Entity, T: AsValue + Send + 'static> AggregateQuery<D, E, T> {
    pub fn filter(mut self, condition: Where) -> Self {
        self.select.condition = Some(condition);
        self
    }

    pub fn sql(&self) -> Result<String> {
        self.select.render(Some((self.aggregate, self.column)))
    }
}

impl<D: Driver, E: Entity, T: AsValue + Send + 'static> Query for AggregateQuery<D, E, T> {
    type Output = Option<T>;

    fn into_job(self) -> Result<Job<Self::Output>> {
        let sql = self.sql()?;
        let Self {
            select,
            aggregate,
            column,
            ..
        } = self;
        let def = select.table.def;
        Ok(select.database.job(sql, move |shared, sql| {
            let value = shared.fetch(sql, |mut rows| match rows.next() {
                Some(row) => Ok(row?.values.into_vec().into_iter().next().unwrap_or_default()),
                None => Ok(Value::Null),
            })?;
            if value.is_null() {
                return Ok(None);
            }
            let value = match (aggregate, column) {
                (Aggregate::Min | Aggregate::Max, Some(i)) => {
                    shared.converters.from_storage(&def.columns[i], value)?
                }
                _ => value,
            };
            T::try_from_value(value).map(Some)
        }))
    }
}
