use crate::{
    AddColumnsQuery, CompositeIndex, Connection, ConnectionGuard, Connections, Connector, Context,
    Converters, CreateIndexesQuery, CreateTableQuery, DeleteQuery, DescribeColumnsQuery, Dialect,
    Driver, DropColumnsQuery, Entity, InsertObjectQuery, InsertQuery, Job, KeelError, Query, Result,
    RowCursor, RowLabeled, RowsAffected, SelectQuery, Settings, Table, TableDef, UpdateObjectQuery,
    UpdateQuery, truncate_long, util::lock,
};
use std::{
    any::{Any, TypeId, type_name},
    collections::HashMap,
    fmt::{self, Debug},
    sync::{
        Arc, Mutex,
        atomic::{AtomicU64, Ordering},
    },
};
use tokio::runtime::{Builder, Runtime};

static NEXT_DATABASE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Default)]
struct Tables {
    by_type: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
    by_name: HashMap<String, Arc<TableDef>>,
}

/// State shared by a database and the jobs it creates.
pub(crate) struct DatabaseShared<D: Driver> {
    pub(crate) id: u64,
    pub(crate) driver: D,
    pub(crate) writer: D::SqlWriter,
    pub(crate) settings: Settings,
    pub(crate) converters: Converters,
    connections: Connections<D::Connection>,
    tables: Mutex<Tables>,
}

impl<D: Driver> DatabaseShared<D> {
    fn log_query(&self, sql: &str) {
        if self.settings.log_queries {
            log::info!("{}", truncate_long!(sql));
        } else {
            log::trace!("{}", truncate_long!(sql));
        }
    }

    pub(crate) fn execute(&self, sql: &str) -> Result<RowsAffected> {
        self.log_query(sql);
        let mut connection = self.connections.acquire()?;
        connection
            .with(|c| c.execute(sql))
            .with_context(|| format!("While executing `{}`", truncate_long!(sql)))
    }

    /// Runs a query and hands its rows to `consume` while the connection is held.
    pub(crate) fn fetch<T>(
        &self,
        sql: &str,
        consume: impl FnOnce(RowCursor<'_>) -> Result<T>,
    ) -> Result<T> {
        self.log_query(sql);
        let mut connection = self.connections.acquire()?;
        connection
            .with(|c| c.fetch(sql).and_then(consume))
            .with_context(|| format!("While fetching `{}`", truncate_long!(sql)))
    }
}

/// Entry point of the library: owns the connections, the worker threads and
/// the registered tables.
///
/// Cloning is cheap, clones share everything.
pub struct Database<D: Driver> {
    pub(crate) shared: Arc<DatabaseShared<D>>,
    runtime: Arc<Runtime>,
}

impl<D: Driver> Clone for Database<D> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
            runtime: self.runtime.clone(),
        }
    }
}

impl<D: Driver> Debug for Database<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("id", &self.shared.id)
            .field("driver", &D::NAME)
            .finish_non_exhaustive()
    }
}

impl<D: Driver> Database<D> {
    /// Database with the built-in converters.
    pub fn open(driver: D, settings: Settings) -> Result<Self> {
        Self::with_converters(driver, settings, Converters::default())
    }

    /// Connections are opened on first use.
    pub fn with_converters(driver: D, settings: Settings, converters: Converters) -> Result<Self> {
        let url = driver.connection_url(&settings)?;
        let connector: Connector<D::Connection> = {
            let driver = driver.clone();
            Arc::new(move || driver.connect(&url))
        };
        let connections = Connections::new(
            settings.connection_pool_size,
            settings.connection_pool_timeout,
            connector,
        );
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(settings.thread_pool_size.max(1))
            .thread_name(format!("keel-{}", D::NAME))
            .build()
            .context("Could not start the worker threads")?;
        let id = NEXT_DATABASE_ID.fetch_add(1, Ordering::Relaxed);
        log::debug!(
            "Opened {} database {} with {} worker threads and {} connections",
            D::NAME,
            id,
            settings.thread_pool_size.max(1),
            settings.connection_pool_size.max(1)
        );
        Ok(Self {
            shared: Arc::new(DatabaseShared {
                id,
                writer: driver.sql_writer(),
                driver,
                settings,
                converters,
                connections,
                tables: Mutex::default(),
            }),
            runtime: Arc::new(runtime),
        })
    }

    pub fn id(&self) -> u64 {
        self.shared.id
    }

    pub fn driver(&self) -> &D {
        &self.shared.driver
    }

    pub fn dialect(&self) -> Dialect {
        self.shared.driver.dialect()
    }

    pub fn settings(&self) -> &Settings {
        &self.shared.settings
    }

    pub fn converters(&self) -> &Converters {
        &self.shared.converters
    }

    pub fn sql_writer(&self) -> &D::SqlWriter {
        &self.shared.writer
    }

    /// Exclusive access to a connection, following the acquisition policy of the database.
    ///
    /// A single shared connection left inside a transaction is committed on release.
    /// While the calling thread holds it, tasks started from that thread run inline
    /// on the same connection and take part in its transaction.
    pub fn connection(&self) -> Result<ConnectionGuard<'_, D::Connection>> {
        self.shared.connections.acquire()
    }

    /// Runs raw SQL on the calling thread.
    pub fn execute(&self, sql: &str) -> Result<RowsAffected> {
        self.shared.execute(sql)
    }

    /// Runs a raw query on the calling thread and collects its rows.
    pub fn fetch_all(&self, sql: &str) -> Result<Vec<RowLabeled>> {
        self.shared.fetch(sql, |rows| rows.collect())
    }

    /// Builds a job running `run` against the shared state.
    pub(crate) fn job<R, F>(&self, sql: String, run: F) -> Job<R>
    where
        R: Send + 'static,
        F: FnOnce(&DatabaseShared<D>, &str) -> Result<R> + Send + 'static,
    {
        let shared = self.shared.clone();
        let text = sql.clone();
        Job {
            sql,
            handle: self.runtime.handle().clone(),
            run: Box::new(move || run(&shared, &text)),
        }
    }

    /// Validates the schema of `E`, brings its table up to date and records it.
    ///
    /// The table is created when missing, columns no longer declared are dropped,
    /// missing columns are added after their predecessor and indexes are created.
    pub fn register<E: Entity>(&self) -> Result<Table<E>> {
        let mut tables = lock(&self.shared.tables);
        let table = self.build_table::<E>(&tables)?;
        log::debug!("Registering table `{}`", table.name());
        self.migrate(table.def())
            .with_context(|| format!("While registering table `{}`", table.name()))?;
        Self::record(&mut tables, &table);
        Ok(table)
    }

    /// Records the schema of `E` without touching the database.
    pub fn declare<E: Entity>(&self) -> Result<Table<E>> {
        let mut tables = lock(&self.shared.tables);
        let table = self.build_table::<E>(&tables)?;
        Self::record(&mut tables, &table);
        Ok(table)
    }

    /// Table of a registered entity.
    pub fn table<E: Entity>(&self) -> Result<Table<E>> {
        lock(&self.shared.tables)
            .by_type
            .get(&TypeId::of::<E>())
            .and_then(|v| v.downcast_ref::<Table<E>>())
            .cloned()
            .ok_or_else(|| {
                KeelError::argument(format!("Entity `{}` is not registered", type_name::<E>()))
            })
    }

    /// Definition of a registered table, by name.
    pub fn table_def(&self, name: &str) -> Option<Arc<TableDef>> {
        lock(&self.shared.tables).by_name.get(name).cloned()
    }

    pub fn select<E: Entity>(&self) -> Result<SelectQuery<D, E>> {
        Ok(SelectQuery::new(self.clone(), self.table::<E>()?))
    }

    pub fn insert<E: Entity>(&self) -> Result<InsertQuery<D, E>> {
        Ok(InsertQuery::new(self.clone(), self.table::<E>()?))
    }

    pub fn insert_object<E: Entity>(&self, entity: E) -> Result<InsertObjectQuery<D, E>> {
        Ok(InsertObjectQuery::new(self.clone(), self.table::<E>()?, entity))
    }

    pub fn update<E: Entity>(&self) -> Result<UpdateQuery<D, E>> {
        Ok(UpdateQuery::new(self.clone(), self.table::<E>()?))
    }

    /// Update of every column of `entity`, matched by its primary key.
    pub fn update_object<E: Entity>(&self, entity: E) -> Result<UpdateObjectQuery<D, E>> {
        UpdateObjectQuery::new(self.clone(), self.table::<E>()?, entity)
    }

    pub fn delete<E: Entity>(&self) -> Result<DeleteQuery<D, E>> {
        Ok(DeleteQuery::new(self.clone(), self.table::<E>()?))
    }

    fn build_table<E: Entity>(&self, tables: &Tables) -> Result<Table<E>> {
        if tables.by_type.contains_key(&TypeId::of::<E>()) {
            return Err(KeelError::state(format!(
                "Entity `{}` is already registered",
                type_name::<E>()
            )));
        }
        let table = Table::<E>::build(
            self.shared.id,
            self.dialect(),
            &self.shared.settings.table_name_prefix,
            |name| tables.by_name.get(name).cloned(),
        )?;
        if tables.by_name.contains_key(table.name()) {
            return Err(KeelError::state(format!(
                "A table named `{}` is already registered",
                table.name()
            )));
        }
        Ok(table)
    }

    fn record<E: Entity>(tables: &mut Tables, table: &Table<E>) {
        tables
            .by_name
            .insert(table.name().to_string(), table.def().clone());
        tables
            .by_type
            .insert(TypeId::of::<E>(), Arc::new(table.clone()));
    }

    fn migrate(&self, table: &Arc<TableDef>) -> Result<()> {
        CreateTableQuery::new(self.clone(), table.clone()).complete()?;
        let existing = DescribeColumnsQuery::new(self.clone(), &table.name).complete()?;
        let dropped = existing
            .iter()
            .filter(|v| table.column(&v.name).is_none())
            .map(|v| v.name.clone())
            .collect::<Vec<_>>();
        if !dropped.is_empty() {
            log::debug!("Dropping columns {:?} from `{}`", dropped, table.name);
            DropColumnsQuery::new(self.clone(), table.clone(), dropped)?.complete()?;
        }
        let added = table
            .columns
            .iter()
            .enumerate()
            .filter(|(_, column)| !existing.iter().any(|v| v.name == column.name))
            .map(|(i, _)| (i, i.checked_sub(1)))
            .collect::<Vec<_>>();
        if !added.is_empty() {
            AddColumnsQuery::new(self.clone(), table.clone(), added)?.complete()?;
        }
        let mut indexes = table
            .columns
            .iter()
            .filter(|v| v.indexed && !v.is_unique_key())
            .map(|v| CompositeIndex {
                columns: vec![v.name.clone()],
                unique: false,
            })
            .collect::<Vec<_>>();
        indexes.extend(table.indexes.iter().cloned());
        if !indexes.is_empty() {
            CreateIndexesQuery::new(self.clone(), table.clone(), indexes)?.complete()?;
        }
        Ok(())
    }
}
