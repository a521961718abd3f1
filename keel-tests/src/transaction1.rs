use crate::drop_tables;
use keel::{Column, Database, Driver, Entity, Query, Schema};

#[derive(Debug, Default, Clone, PartialEq)]
struct Ledger {
    id: i32,
    amount: i64,
}

impl Entity for Ledger {
    fn schema() -> Schema<Self> {
        Schema::new("ledger")
            .column(Column::new("id", |v: &Ledger| &v.id, |v| &mut v.id).primary_key())
            .column(Column::new("amount", |v: &Ledger| &v.amount, |v| &mut v.amount))
    }
}

fn count<D: Driver>(database: &Database<D>) -> i64 {
    database
        .select::<Ledger>()
        .and_then(|v| v.count())
        .and_then(Query::complete)
        .expect("Failed to count the ledger entries")
        .unwrap_or_default()
}

fn insert_sql<D: Driver>(database: &Database<D>, id: i32) -> String {
    database
        .insert_object(Ledger {
            id,
            amount: id as i64 * 100,
        })
        .and_then(|v| v.sql())
        .expect("Failed to render the ledger insert")
}

pub fn transaction1<D: Driver>(database: &Database<D>) {
    drop_tables(database, &["ledger"]);
    database
        .register::<Ledger>()
        .expect("Failed to register Ledger");

    {
        let mut connection = database.connection().expect("Failed to get a connection");
        connection.begin().expect("Failed to begin");
        assert!(connection.in_transaction());
        connection
            .execute(&insert_sql(database, 1))
            .expect("Failed to insert in the transaction");
        connection.rollback().expect("Failed to rollback");
        assert!(!connection.in_transaction());
    }
    assert_eq!(count(database), 0);

    {
        let mut connection = database.connection().expect("Failed to get a connection");
        connection.begin().expect("Failed to begin");
        let affected = connection
            .execute(&insert_sql(database, 2))
            .expect("Failed to insert in the transaction");
        assert_eq!(affected.rows_affected, 1);
        let sql = database
            .select::<Ledger>()
            .and_then(|v| v.count())
            .and_then(|v| v.sql())
            .expect("Failed to render the count");
        let rows = connection
            .fetch(&sql)
            .and_then(|rows| rows.collect::<keel::Result<Vec<_>>>())
            .expect("Failed to count inside the transaction");
        assert_eq!(rows.len(), 1);
        connection.commit().expect("Failed to commit");
    }
    assert_eq!(count(database), 1);

    // A shared connection left in a transaction is committed when released
    if database.settings().connection_pool_size <= 1 {
        {
            let mut connection = database.connection().expect("Failed to get a connection");
            connection.begin().expect("Failed to begin");
            connection
                .execute(&insert_sql(database, 3))
                .expect("Failed to insert in the transaction");
        }
        assert_eq!(count(database), 2);

        // Queries built while the connection is held join its transaction
        {
            let mut connection = database.connection().expect("Failed to get a connection");
            connection.begin().expect("Failed to begin");
            database
                .insert_object(Ledger {
                    id: 4,
                    amount: 400,
                })
                .and_then(Query::complete)
                .expect("Failed to insert while holding the connection");
            assert_eq!(count(database), 3);
            assert!(connection.in_transaction());
            connection.rollback().expect("Failed to rollback");
        }
        assert_eq!(count(database), 2);
    }
}
