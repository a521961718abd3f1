use crate::{
    CBox, error_message_from_ptr,
    extract::{extract_name, extract_value},
};
use keel_core::{
    Connection, Context, Error, Result, RowCursor, RowLabeled, RowsAffected, truncate_long,
};
use libsqlite3_sys::{
    SQLITE_DONE, SQLITE_OK, SQLITE_OPEN_CREATE, SQLITE_OPEN_NOMUTEX, SQLITE_OPEN_READWRITE,
    SQLITE_OPEN_URI, SQLITE_ROW, sqlite3, sqlite3_busy_timeout, sqlite3_close,
    sqlite3_column_count, sqlite3_errmsg, sqlite3_finalize, sqlite3_get_autocommit,
    sqlite3_last_insert_rowid, sqlite3_open_v2, sqlite3_prepare_v2, sqlite3_step, sqlite3_stmt,
    sqlite3_total_changes64,
};
use std::{
    ffi::{CString, c_char, c_int},
    marker::PhantomData,
    ptr,
    sync::Arc,
};

const BUSY_TIMEOUT_MS: c_int = 5_000;

/// Connection to a SQLite database file.
pub struct SqliteConnection {
    pub(crate) connection: CBox<sqlite3>,
}

impl SqliteConnection {
    /// Opens `path`, a `file:` URI accepting the SQLite query parameters (`mode`, `cache`, ...).
    pub fn open(path: &str) -> Result<Self> {
        let context = || format!("While opening the SQLite database `{}`", path);
        let path = CString::new(path).with_context(context)?;
        let mut connection = CBox::new(ptr::null_mut(), |p| unsafe {
            sqlite3_close(p);
        });
        unsafe {
            let rc = sqlite3_open_v2(
                path.as_ptr(),
                &mut *connection,
                SQLITE_OPEN_URI | SQLITE_OPEN_READWRITE | SQLITE_OPEN_CREATE | SQLITE_OPEN_NOMUTEX,
                ptr::null(),
            );
            if rc != SQLITE_OK {
                let message = if connection.is_null() {
                    "Out of memory".to_string()
                } else {
                    error_message_from_ptr(&sqlite3_errmsg(*connection)).to_string()
                };
                let error = Error::msg(message).context(context());
                log::error!("{:#}", error);
                return Err(error);
            }
            sqlite3_busy_timeout(*connection, BUSY_TIMEOUT_MS);
        }
        Ok(Self { connection })
    }

    fn last_error(&self) -> Error {
        unsafe { Error::msg(error_message_from_ptr(&sqlite3_errmsg(*self.connection)).to_string()) }
    }

    /// Prepares the first statement of `sql`, returns it with the offset of the remaining text.
    ///
    /// The statement is null when `sql` only holds whitespace or comments.
    fn prepare(&self, sql: &[u8]) -> Result<(CBox<sqlite3_stmt>, usize)> {
        let mut statement = CBox::new(ptr::null_mut(), |p| unsafe {
            sqlite3_finalize(p);
        });
        let mut tail: *const c_char = ptr::null();
        let head = sql.as_ptr() as *const c_char;
        let rc = unsafe {
            sqlite3_prepare_v2(
                *self.connection,
                head,
                sql.len() as c_int,
                &mut *statement,
                &mut tail,
            )
        };
        if rc != SQLITE_OK {
            return Err(self.last_error());
        }
        let consumed = if tail.is_null() {
            sql.len()
        } else {
            tail as usize - head as usize
        };
        Ok((statement, consumed))
    }
}

impl Connection for SqliteConnection {
    fn execute(&mut self, sql: &str) -> Result<RowsAffected> {
        let context = || format!("While executing the query:\n{}", truncate_long!(sql));
        let before = unsafe { sqlite3_total_changes64(*self.connection) };
        let mut remaining = sql.as_bytes();
        while !remaining.is_empty() {
            let (statement, consumed) = self.prepare(remaining).with_context(context)?;
            remaining = &remaining[consumed..];
            if statement.is_null() {
                break;
            }
            loop {
                match unsafe { sqlite3_step(*statement) } {
                    SQLITE_ROW => continue,
                    SQLITE_DONE => break,
                    _ => {
                        let error = self.last_error().context(context());
                        log::error!("{:#}", error);
                        return Err(error);
                    }
                }
            }
        }
        let (changes, rowid) = unsafe {
            (
                sqlite3_total_changes64(*self.connection) - before,
                sqlite3_last_insert_rowid(*self.connection),
            )
        };
        Ok(RowsAffected {
            rows_affected: changes.max(0) as u64,
            last_affected_id: (changes > 0 && rowid != 0).then_some(rowid),
        })
    }

    fn fetch<'s>(&'s mut self, sql: &str) -> Result<RowCursor<'s>> {
        let context = || format!("While fetching the query:\n{}", truncate_long!(sql));
        let (statement, consumed) = self.prepare(sql.as_bytes()).with_context(context)?;
        if statement.is_null() {
            return Ok(Box::new(std::iter::empty()));
        }
        if !sql[consumed..].trim().trim_matches(';').trim().is_empty() {
            return Err(Error::msg("Cannot fetch more than one statement at a time")
                .context(context()));
        }
        let count = unsafe { sqlite3_column_count(*statement) };
        let labels = (0..count)
            .map(|i| extract_name(*statement, i))
            .collect::<Result<Arc<[_]>>>()?;
        Ok(Box::new(Rows {
            connection: *self.connection,
            statement,
            labels,
            done: false,
            _connection: PhantomData,
        }))
    }

    fn is_closed(&self) -> bool {
        self.connection.is_null()
    }

    fn in_transaction(&self) -> bool {
        unsafe { sqlite3_get_autocommit(*self.connection) == 0 }
    }
}

/// Rows of a prepared statement, stepped on demand.
struct Rows<'c> {
    connection: *mut sqlite3,
    statement: CBox<sqlite3_stmt>,
    labels: Arc<[String]>,
    done: bool,
    _connection: PhantomData<&'c mut SqliteConnection>,
}

impl Iterator for Rows<'_> {
    type Item = Result<RowLabeled>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match unsafe { sqlite3_step(*self.statement) } {
            SQLITE_ROW => Some(
                (0..self.labels.len() as c_int)
                    .map(|i| extract_value(*self.statement, i))
                    .collect::<Result<Box<[_]>>>()
                    .map(|values| RowLabeled {
                        labels: self.labels.clone(),
                        values,
                    }),
            ),
            SQLITE_DONE => {
                self.done = true;
                None
            }
            _ => {
                self.done = true;
                let error = unsafe {
                    Error::msg(error_message_from_ptr(&sqlite3_errmsg(self.connection)).to_string())
                };
                log::error!("{:#}", error);
                Some(Err(error))
            }
        }
    }
}
