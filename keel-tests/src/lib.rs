mod aggregates;
mod arrays1;
mod books;
mod limits;
mod multiple;
mod operations;
mod simple;
mod transaction1;

use crate::{
    aggregates::aggregates,
    arrays1::arrays1,
    books::books,
    limits::limits,
    multiple::multiple,
    operations::operations,
    simple::{simple, simple_fields},
    transaction1::transaction1,
};
use keel::{Database, Driver};
use log::LevelFilter;
use std::env;

pub fn init_logs() {
    let mut logger = env_logger::builder();
    logger
        .is_test(true)
        .format_file(true)
        .format_line_number(true);
    if env::var("RUST_LOG").is_err() {
        logger.filter_level(LevelFilter::Warn);
    }
    let _ = logger.try_init();
}

/// Runs every scenario against `database`, tables are dropped and registered again.
pub fn execute_tests<D: Driver>(database: &Database<D>) {
    simple(database);
    simple_fields(database);
    books(database);
    aggregates(database);
    limits(database);
    arrays1(database);
    operations(database);
    transaction1(database);
    multiple(database);
}

/// Drops `tables` in the given order, so that referencing tables come first.
pub(crate) fn drop_tables<D: Driver>(database: &Database<D>, tables: &[&str]) {
    let prefix = database.settings().table_name_prefix.to_lowercase();
    for table in tables {
        database
            .execute(&format!("DROP TABLE IF EXISTS {}{}", prefix, table))
            .unwrap_or_else(|e| panic!("Failed to drop table {}: {:#}", table, e));
    }
}

#[macro_export]
macro_rules! silent_logs {
    ($($code:tt)+) => {{
        let level = log::max_level();
        log::set_max_level(log::LevelFilter::Off);
        $($code)+
        log::set_max_level(level);
    }};
}
