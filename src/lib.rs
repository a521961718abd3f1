//! Keel maps plain Rust structs to tables of SQLite and MySQL databases.
//!
//! An entity describes its columns with a [`Schema`], a [`Database`] registers
//! it and builds the queries. Queries complete on the caller's thread or are
//! queued as [`Task`]s running on the database thread pool.
//!
//! ```rust,ignore
//! use keel::{Column, Database, Entity, Query, Schema, Settings, Where};
//! use keel_sqlite::SqliteDriver;
//!
//! #[derive(Default)]
//! struct Person {
//!     id: i64,
//!     name: String,
//! }
//!
//! impl Entity for Person {
//!     fn schema() -> Schema<Self> {
//!         Schema::new("person")
//!             .column(Column::new("id", |v: &Person| &v.id, |v| &mut v.id).primary_key().auto_increment())
//!             .column(Column::new("name", |v: &Person| &v.name, |v| &mut v.name).length(100))
//!     }
//! }
//!
//! let database = Database::open(SqliteDriver::new(), Settings::default().with_database_name("people.sqlite"))?;
//! database.register::<Person>()?;
//! let person = database.insert::<Person>()?.value("name", "Ada")?.complete()?;
//! let found = database.select::<Person>()?.filter(Where::eq("name", "Ada")).complete()?;
//! ```

pub use keel_core::*;
