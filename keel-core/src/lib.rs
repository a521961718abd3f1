mod as_value;
mod clause;
mod column;
mod connection;
mod convert;
mod database;
mod dialect;
mod driver;
mod entity;
mod error;
mod join;
mod pool;
mod query;
mod settings;
mod sql_type;
mod table;
mod task;
mod util;
mod value;
pub mod writer;

pub use ::anyhow::Context;
pub use ::indoc;
pub use as_value::*;
pub use clause::*;
pub use column::*;
pub use connection::*;
pub use convert::*;
pub use database::*;
pub use dialect::*;
pub use driver::*;
pub use entity::*;
pub use error::*;
pub use join::*;
pub use pool::*;
pub use query::*;
pub use settings::*;
pub use sql_type::*;
pub use table::*;
pub use task::*;
pub use util::*;
pub use value::*;
pub use writer::*;

pub type Result<T> = anyhow::Result<T>;
pub type Error = anyhow::Error;
