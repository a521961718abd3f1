use crate::{Connection, Dialect, Result, Settings, SqlWriter};

/// Database engine plugged into a [`Database`](crate::Database).
pub trait Driver: Clone + Send + Sync + 'static {
    type Connection: Connection;
    type SqlWriter: SqlWriter;

    const NAME: &'static str;

    fn dialect(&self) -> Dialect;

    fn sql_writer(&self) -> Self::SqlWriter;

    /// Connection URL derived from `settings`, `settings.url` takes precedence when set.
    fn connection_url(&self, settings: &Settings) -> Result<String>;

    /// Opens a physical connection, blocking until it is established.
    fn connect(&self, url: &str) -> Result<Self::Connection>;
}
