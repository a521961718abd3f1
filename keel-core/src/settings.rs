use std::time::Duration;

/// Connection and execution settings of a [`Database`](crate::Database).
///
/// # Examples
/// ```rust
/// use keel_core::Settings;
/// use std::time::Duration;
/// let settings = Settings::default()
///     .with_host("localhost")
///     .with_port(3306)
///     .with_database_name("shop")
///     .with_connection_pool_size(4)
///     .with_connection_pool_timeout(Duration::from_secs(5));
/// assert_eq!(settings.thread_pool_size, 1);
/// assert_eq!(settings.connection_pool_size, 4);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Connection URL used as it is, the other connection fields are ignored when present.
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    /// Database name, or file path for the embedded engine.
    pub database_name: String,
    pub user: String,
    pub password: String,
    /// Extra `key=value` pairs appended to the connection URL.
    pub connection_parameters: Vec<(String, String)>,
    pub table_name_prefix: String,
    /// Worker threads running queued tasks.
    pub thread_pool_size: usize,
    /// `1` shares a single connection, larger values open up to that many.
    pub connection_pool_size: usize,
    pub connection_pool_timeout: Duration,
    /// Log every query at info level instead of trace.
    pub log_queries: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            url: None,
            host: String::new(),
            port: 0,
            database_name: String::new(),
            user: String::new(),
            password: String::new(),
            connection_parameters: Vec::new(),
            table_name_prefix: String::new(),
            thread_pool_size: 1,
            connection_pool_size: 1,
            connection_pool_timeout: Duration::from_secs(30),
            log_queries: false,
        }
    }
}

impl Settings {
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_database_name(mut self, database_name: impl Into<String>) -> Self {
        self.database_name = database_name.into();
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    pub fn with_connection_parameter(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.connection_parameters.push((key.into(), value.into()));
        self
    }

    pub fn with_table_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.table_name_prefix = prefix.into();
        self
    }

    pub fn with_thread_pool_size(mut self, size: usize) -> Self {
        self.thread_pool_size = size;
        self
    }

    pub fn with_connection_pool_size(mut self, size: usize) -> Self {
        self.connection_pool_size = size;
        self
    }

    pub fn with_connection_pool_timeout(mut self, timeout: Duration) -> Self {
        self.connection_pool_timeout = timeout;
        self
    }

    pub fn with_log_queries(mut self, log_queries: bool) -> Self {
        self.log_queries = log_queries;
        self
    }
}
