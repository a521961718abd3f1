/// The SQL back-ends supported by the query builders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// Embedded engine (SQLite).
    Sqlite,
    /// Networked server engine (MySQL).
    MySql,
}

impl Dialect {
    pub const fn link_prefix(&self) -> &'static str {
        match self {
            Dialect::Sqlite => "sqlite://",
            Dialect::MySql => "mysql://",
        }
    }

    pub const fn auto_increment(&self) -> &'static str {
        match self {
            Dialect::Sqlite => "AUTOINCREMENT",
            Dialect::MySql => "AUTO_INCREMENT",
        }
    }

    pub const fn insert_ignore(&self) -> &'static str {
        match self {
            Dialect::Sqlite => "OR IGNORE",
            Dialect::MySql => "IGNORE",
        }
    }

    /// Whether UPDATE and DELETE accept a LIMIT clause.
    pub const fn supports_mutation_limit(&self) -> bool {
        matches!(self, Dialect::MySql)
    }
}
