use crate::{MySqlConnection, MySqlSqlWriter};
use keel_core::{Context, Dialect, Driver, Error, Result, Settings};
use url::Url;

const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 3306;

#[derive(Debug, Default, Clone, Copy)]
pub struct MySqlDriver;

impl MySqlDriver {
    pub const fn new() -> Self {
        Self
    }
}

impl Driver for MySqlDriver {
    type Connection = MySqlConnection;
    type SqlWriter = MySqlSqlWriter;

    const NAME: &'static str = "mysql";

    fn dialect(&self) -> Dialect {
        Dialect::MySql
    }

    fn sql_writer(&self) -> MySqlSqlWriter {
        MySqlSqlWriter
    }

    /// `mysql://<user>:<password>@<host>:<port>/<database_name>?<connection_parameters>`,
    /// unless `settings.url` is set.
    fn connection_url(&self, settings: &Settings) -> Result<String> {
        if let Some(url) = &settings.url {
            return Ok(url.clone());
        }
        let mut url = String::from(self.dialect().link_prefix());
        if !settings.user.is_empty() {
            url.push_str(&urlencoding::encode(&settings.user));
            if !settings.password.is_empty() {
                url.push(':');
                url.push_str(&urlencoding::encode(&settings.password));
            }
            url.push('@');
        }
        url.push_str(if settings.host.is_empty() {
            DEFAULT_HOST
        } else {
            &settings.host
        });
        url.push(':');
        url.push_str(&match settings.port {
            0 => DEFAULT_PORT,
            v => v,
        }
        .to_string());
        url.push('/');
        url.push_str(&urlencoding::encode(&settings.database_name));
        let mut url = Url::parse(&url).context("The MySQL settings do not form a valid url")?;
        if !settings.connection_parameters.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(settings.connection_parameters.iter());
        }
        Ok(url.into())
    }

    fn connect(&self, url: &str) -> Result<MySqlConnection> {
        let prefix = self.dialect().link_prefix();
        if !url.starts_with(prefix) {
            let error = Error::msg(format!(
                "MySQL connection url must start with `{}`",
                prefix
            ))
            .context(format!("While trying to connect to `{}`", url));
            log::error!("{:#}", error);
            return Err(error);
        }
        MySqlConnection::open(url)
    }
}
