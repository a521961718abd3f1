use crate::RowWrap;
use keel_core::{
    Connection, Context, Error, Result, RowCursor, RowsAffected, truncate_long,
};
use mysql_async::{Conn, Opts, Row, prelude::Queryable};
use tokio::runtime::{Builder, Runtime};

/// Connection to a MySQL server.
///
/// The protocol client is asynchronous, each connection drives it on its own
/// single threaded runtime so that calls block like any other [`Connection`].
pub struct MySqlConnection {
    runtime: Runtime,
    connection: Option<Conn>,
    transaction: bool,
}

impl MySqlConnection {
    pub fn open(url: &str) -> Result<Self> {
        let context = || format!("While trying to connect to `{}`", truncate_long!(url));
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .with_context(context)?;
        let opts = Opts::from_url(url).with_context(context)?;
        let connection = runtime.block_on(Conn::new(opts)).map_err(|e| {
            let error = Error::new(e).context(context());
            log::error!("{:#}", error);
            error
        })?;
        Ok(Self {
            runtime,
            connection: Some(connection),
            transaction: false,
        })
    }

    /// A broken socket makes the connection unusable, the pool will replace it.
    fn failed(&mut self, error: mysql_async::Error, context: String) -> Error {
        if matches!(error, mysql_async::Error::Io(..)) {
            self.connection = None;
            self.transaction = false;
        }
        let error = Error::new(error).context(context);
        log::error!("{:#}", error);
        error
    }

    fn track_transaction(&mut self, sql: &str) {
        let statement = sql.trim_start().to_ascii_uppercase();
        if statement.starts_with("BEGIN") || statement.starts_with("START TRANSACTION") {
            self.transaction = true;
        } else if statement.starts_with("COMMIT") || statement.starts_with("ROLLBACK") {
            self.transaction = false;
        }
    }
}

impl Connection for MySqlConnection {
    fn execute(&mut self, sql: &str) -> Result<RowsAffected> {
        let context = || format!("While executing the query:\n{}", truncate_long!(sql));
        let runtime = &self.runtime;
        let Some(connection) = self.connection.as_mut() else {
            return Err(Error::msg("The MySQL connection is closed").context(context()));
        };
        match runtime.block_on(connection.query_drop(sql)) {
            Ok(()) => {
                let result = RowsAffected {
                    rows_affected: connection.affected_rows(),
                    last_affected_id: connection
                        .last_insert_id()
                        .filter(|v| *v != 0)
                        .and_then(|v| i64::try_from(v).ok()),
                };
                self.track_transaction(sql);
                Ok(result)
            }
            Err(e) => Err(self.failed(e, context())),
        }
    }

    /// The whole result set is received before the first row is decoded.
    fn fetch<'s>(&'s mut self, sql: &str) -> Result<RowCursor<'s>> {
        let context = || format!("While fetching the query:\n{}", truncate_long!(sql));
        let runtime = &self.runtime;
        let Some(connection) = self.connection.as_mut() else {
            return Err(Error::msg("The MySQL connection is closed").context(context()));
        };
        let rows = match runtime.block_on(connection.query::<Row, _>(sql)) {
            Ok(rows) => rows,
            Err(e) => return Err(self.failed(e, context())),
        };
        let Some(first) = rows.first() else {
            return Ok(Box::new(std::iter::empty()));
        };
        let wrap = RowWrap::new(first);
        Ok(Box::new(rows.into_iter().map(move |row| wrap.decode(row))))
    }

    fn is_closed(&self) -> bool {
        self.connection.is_none()
    }

    fn in_transaction(&self) -> bool {
        self.transaction
    }
}

impl Drop for MySqlConnection {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.take() {
            if let Err(e) = self.runtime.block_on(connection.disconnect()) {
                log::warn!("Could not close the MySQL connection cleanly: {:#}", e);
            }
        }
    }
}
