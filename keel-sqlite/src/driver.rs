use crate::{SqliteConnection, SqliteSqlWriter};
use keel_core::{Context, Dialect, Driver, Error, Result, Settings};
use url::form_urlencoded;

#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteDriver;

impl SqliteDriver {
    pub const fn new() -> Self {
        Self
    }
}

impl Driver for SqliteDriver {
    type Connection = SqliteConnection;
    type SqlWriter = SqliteSqlWriter;

    const NAME: &'static str = "sqlite";

    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn sql_writer(&self) -> SqliteSqlWriter {
        SqliteSqlWriter
    }

    /// `sqlite://<database_name>?<connection_parameters>`, unless `settings.url` is set.
    fn connection_url(&self, settings: &Settings) -> Result<String> {
        if let Some(url) = &settings.url {
            return Ok(url.clone());
        }
        if settings.database_name.is_empty() {
            return Err(Error::msg(
                "The SQLite database needs a file path in `database_name`",
            ));
        }
        let mut url = format!(
            "{}{}",
            self.dialect().link_prefix(),
            urlencoding::encode(&settings.database_name)
        );
        for (i, (key, value)) in settings.connection_parameters.iter().enumerate() {
            url.push(if i == 0 { '?' } else { '&' });
            url.push_str(&urlencoding::encode(key));
            url.push('=');
            url.push_str(&urlencoding::encode(value));
        }
        Ok(url)
    }

    fn connect(&self, url: &str) -> Result<SqliteConnection> {
        let context = || format!("While trying to connect to `{}`", url);
        let prefix = self.dialect().link_prefix();
        let Some(rest) = url.strip_prefix(prefix) else {
            let error = Error::msg(format!(
                "SQLite connection url must start with `{}`",
                prefix
            ))
            .context(context());
            log::error!("{:#}", error);
            return Err(error);
        };
        let (path, query) = rest.split_once('?').unwrap_or((rest, ""));
        let path = urlencoding::decode(path).with_context(context)?;
        let mut uri = format!("file:{}", urlencoding::encode(&path));
        let parameters = form_urlencoded::parse(query.as_bytes()).collect::<Vec<_>>();
        if !parameters.is_empty() {
            uri.push('?');
            uri.push_str(
                &form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(parameters)
                    .finish(),
            );
        }
        SqliteConnection::open(&uri).with_context(context)
    }
}
