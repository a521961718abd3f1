use crate::{Connection, KeelError, Result, RowCursor, RowsAffected, util::lock};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, bounded};
use std::{
    cell::Cell,
    marker::PhantomData,
    sync::{
        Arc, Condvar, Mutex, PoisonError,
        atomic::{AtomicUsize, Ordering},
    },
    thread::{self, ThreadId},
    time::Duration,
};

thread_local! {
    /// Single connections currently owned by this thread.
    static OWNED: Cell<usize> = const { Cell::new(0) };
}

/// True while the current thread owns a single shared connection.
pub(crate) fn owns_single_connection() -> bool {
    OWNED.with(Cell::get) > 0
}

/// Opens a new physical connection.
pub type Connector<C> = Arc<dyn Fn() -> Result<C> + Send + Sync>;

/// Acquisition policy of the physical connections of a database.
pub enum Connections<C: Connection> {
    /// One connection, callers are serialized by a lock.
    Single(SingleConnection<C>),
    /// Up to a fixed number of connections.
    Pool(ConnectionPool<C>),
}

impl<C: Connection> Connections<C> {
    /// Single connection when `size` is at most one, otherwise a pool of `size` connections.
    ///
    /// No connection is opened before the first acquisition.
    pub fn new(size: usize, timeout: Duration, connector: Connector<C>) -> Self {
        if size <= 1 {
            Connections::Single(SingleConnection::new(connector))
        } else {
            Connections::Pool(ConnectionPool::new(size, timeout, connector))
        }
    }

    pub fn acquire(&self) -> Result<ConnectionGuard<'_, C>> {
        match self {
            Connections::Single(v) => v.acquire(),
            Connections::Pool(v) => v.acquire(),
        }
    }
}

#[derive(Default)]
struct Owner {
    thread: Option<ThreadId>,
    depth: usize,
}

/// One shared connection, reentrant for the thread that owns it.
pub struct SingleConnection<C> {
    connection: Mutex<Option<C>>,
    owner: Mutex<Owner>,
    released: Condvar,
    connector: Connector<C>,
}

impl<C: Connection> SingleConnection<C> {
    /// The connection is opened by the first [`SingleConnection::acquire`].
    pub fn new(connector: Connector<C>) -> Self {
        Self {
            connection: Mutex::new(None),
            owner: Mutex::new(Owner::default()),
            released: Condvar::new(),
            connector,
        }
    }

    /// Blocks until no other thread owns the connection, reopening it when it was closed.
    ///
    /// The owning thread can acquire it again, the guards share the same connection.
    pub fn acquire(&self) -> Result<ConnectionGuard<'_, C>> {
        let current = thread::current().id();
        {
            let mut owner = lock(&self.owner);
            while owner.thread.is_some_and(|v| v != current) {
                owner = self
                    .released
                    .wait(owner)
                    .unwrap_or_else(PoisonError::into_inner);
            }
            owner.thread = Some(current);
            owner.depth += 1;
            if owner.depth == 1 {
                OWNED.with(|v| v.set(v.get() + 1));
            }
        }
        let guard = ConnectionGuard::Single(self, PhantomData);
        let mut connection = lock(&self.connection);
        match connection.as_ref().map(Connection::is_closed) {
            Some(false) => {}
            Some(true) => {
                log::warn!("The connection was closed, reopening it");
                *connection = Some((self.connector)()?);
            }
            None => *connection = Some((self.connector)()?),
        }
        drop(connection);
        Ok(guard)
    }

    fn release(&self) {
        let mut owner = lock(&self.owner);
        if owner.depth == 1 {
            if let Some(connection) = lock(&self.connection).as_mut() {
                if !connection.is_closed() && connection.in_transaction() {
                    log::warn!("Committing a transaction left open");
                    if let Err(e) = connection.commit() {
                        log::error!("{:#}", e);
                    }
                }
            }
        }
        owner.depth = owner.depth.saturating_sub(1);
        if owner.depth == 0 {
            owner.thread = None;
            OWNED.with(|v| v.set(v.get().saturating_sub(1)));
            self.released.notify_one();
        }
    }
}

pub struct ConnectionPool<C> {
    sender: Sender<C>,
    receiver: Receiver<C>,
    total: AtomicUsize,
    size: usize,
    timeout: Duration,
    connector: Connector<C>,
}

impl<C: Connection> ConnectionPool<C> {
    pub fn new(size: usize, timeout: Duration, connector: Connector<C>) -> Self {
        let (sender, receiver) = bounded(size);
        Self {
            sender,
            receiver,
            total: AtomicUsize::new(0),
            size,
            timeout,
            connector,
        }
    }

    /// Number of connections currently open.
    pub fn total(&self) -> usize {
        self.total.load(Ordering::Acquire)
    }

    /// Takes a free connection, opens a new one under the cap, or waits up to the timeout.
    pub fn acquire(&self) -> Result<ConnectionGuard<'_, C>> {
        let connection = match self.receiver.try_recv() {
            Ok(connection) => connection,
            Err(TryRecvError::Empty) => {
                let reserved = self
                    .total
                    .fetch_update(Ordering::AcqRel, Ordering::Acquire, |v| {
                        (v < self.size).then_some(v + 1)
                    })
                    .is_ok();
                if reserved {
                    match (self.connector)() {
                        Ok(connection) => connection,
                        Err(e) => {
                            self.total.fetch_sub(1, Ordering::AcqRel);
                            return Err(e);
                        }
                    }
                } else {
                    match self.receiver.recv_timeout(self.timeout) {
                        Ok(connection) => connection,
                        Err(RecvTimeoutError::Timeout) => {
                            return Err(KeelError::connection(format!(
                                "Timed out after {:?} waiting for one of {} connections",
                                self.timeout, self.size
                            )));
                        }
                        Err(RecvTimeoutError::Disconnected) => {
                            return Err(KeelError::connection(
                                "Interrupted while waiting for a connection",
                            ));
                        }
                    }
                }
            }
            Err(TryRecvError::Disconnected) => {
                return Err(KeelError::connection(
                    "Interrupted while waiting for a connection",
                ));
            }
        };
        Ok(ConnectionGuard::Pooled {
            pool: self,
            connection: Some(connection),
        })
    }

    fn release(&self, connection: C) {
        let connection = if connection.is_closed() {
            log::warn!("A pooled connection was closed, reopening it");
            match (self.connector)() {
                Ok(connection) => connection,
                Err(e) => {
                    log::error!("Could not reopen the connection: {:#}", e);
                    self.total.fetch_sub(1, Ordering::AcqRel);
                    return;
                }
            }
        } else {
            connection
        };
        if self.sender.try_send(connection).is_err() {
            self.total.fetch_sub(1, Ordering::AcqRel);
        }
    }
}

/// Exclusive access to a physical connection, released on drop.
///
/// Guards of a single shared connection taken by the same thread share the
/// connection, only the outermost one commits a transaction left open.
pub enum ConnectionGuard<'a, C: Connection> {
    Single(&'a SingleConnection<C>, PhantomData<*const ()>),
    Pooled {
        pool: &'a ConnectionPool<C>,
        connection: Option<C>,
    },
}

impl<C: Connection> ConnectionGuard<'_, C> {
    /// Runs `f` on the connection, the shared slot stays locked for the duration.
    pub fn with<R>(&mut self, f: impl FnOnce(&mut C) -> Result<R>) -> Result<R> {
        match self {
            ConnectionGuard::Single(single, ..) => match lock(&single.connection).as_mut() {
                Some(connection) => f(connection),
                None => Err(KeelError::connection("The connection is not open")),
            },
            ConnectionGuard::Pooled { connection, .. } => match connection.as_mut() {
                Some(connection) => f(connection),
                None => Err(KeelError::connection("The connection was released")),
            },
        }
    }

    fn peek<R>(&self, f: impl FnOnce(&C) -> R) -> Option<R> {
        match self {
            ConnectionGuard::Single(single, ..) => lock(&single.connection).as_ref().map(f),
            ConnectionGuard::Pooled { connection, .. } => connection.as_ref().map(f),
        }
    }

    pub fn execute(&mut self, sql: &str) -> Result<RowsAffected> {
        self.with(|c| c.execute(sql))
    }

    /// Runs a query, the rows are read before the connection is unlocked.
    pub fn fetch(&mut self, sql: &str) -> Result<RowCursor<'static>> {
        let rows = self.with(|c| Ok(c.fetch(sql)?.collect::<Vec<_>>()))?;
        Ok(Box::new(rows.into_iter()))
    }

    pub fn is_closed(&self) -> bool {
        self.peek(|c| c.is_closed()).unwrap_or(true)
    }

    pub fn in_transaction(&self) -> bool {
        self.peek(|c| c.in_transaction()).unwrap_or(false)
    }

    pub fn begin(&mut self) -> Result<()> {
        self.with(|c| c.begin())
    }

    pub fn commit(&mut self) -> Result<()> {
        self.with(|c| c.commit())
    }

    pub fn rollback(&mut self) -> Result<()> {
        self.with(|c| c.rollback())
    }
}

impl<C: Connection> Drop for ConnectionGuard<'_, C> {
    fn drop(&mut self) {
        match self {
            ConnectionGuard::Single(single, ..) => single.release(),
            ConnectionGuard::Pooled { pool, connection } => {
                if let Some(connection) = connection.take() {
                    pool.release(connection);
                }
            }
        }
    }
}
