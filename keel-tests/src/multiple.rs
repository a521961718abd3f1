use crate::{drop_tables, silent_logs};
use keel::{Column, Database, Driver, Entity, Query, Schema, TaskError, TaskLock, Where};
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicI64, Ordering},
};

#[derive(Debug, Default, Clone, PartialEq)]
struct Trade {
    id: i64,
    symbol: String,
    quantity: i32,
}

impl Entity for Trade {
    fn schema() -> Schema<Self> {
        Schema::new("trades")
            .column(Column::new("id", |v: &Trade| &v.id, |v| &mut v.id).primary_key())
            .column(
                Column::new("symbol", |v: &Trade| &v.symbol, |v| &mut v.symbol)
                    .length(8)
                    .not_null(),
            )
            .column(Column::new("quantity", |v: &Trade| &v.quantity, |v| &mut v.quantity))
            .index(["symbol", "quantity"])
    }
}

pub fn multiple<D: Driver>(database: &Database<D>) {
    drop_tables(database, &["trades"]);
    database
        .register::<Trade>()
        .expect("Failed to register Trade");

    let tasks = (1..=20)
        .map(|id| {
            database
                .insert_object(Trade {
                    id,
                    symbol: ["RUST", "SQL"][id as usize % 2].into(),
                    quantity: id as i32 * 10,
                })
                .and_then(Query::queue)
                .expect("Failed to queue an insert")
        })
        .collect::<Vec<_>>();
    for task in tasks {
        let inserted = task
            .into_result()
            .expect("A queued insert failed")
            .expect("A queued insert was ignored");
        assert!(inserted.id > 0);
    }

    // Consumers see the results, the lock serializes the tasks sharing it
    let total = Arc::new(AtomicI64::new(0));
    let lock: TaskLock = Arc::new(Mutex::new(()));
    let tasks = ["RUST", "SQL"]
        .into_iter()
        .map(|symbol| {
            let total = total.clone();
            database
                .select::<Trade>()
                .map(|v| v.filter(Where::eq("symbol", symbol)))
                .and_then(|v| {
                    v.queue_with(
                        move |trades: &Vec<Trade>| {
                            let sum = trades.iter().map(|v| v.quantity as i64).sum::<i64>();
                            total.fetch_add(sum, Ordering::SeqCst);
                        },
                        Some(lock.clone()),
                    )
                })
                .expect("Failed to queue a select")
        })
        .collect::<Vec<_>>();
    for task in &tasks {
        task.complete().expect("A queued select failed");
        assert!(task.is_done());
        assert_eq!(task.result().expect("Missing select result").len(), 10);
    }
    assert_eq!(total.load(Ordering::SeqCst), (1..=20).sum::<i64>() * 10);

    // Failures are kept by the task
    silent_logs! {
        let task = database
            .insert_object(Trade {
                id: 1,
                symbol: "DUP".into(),
                quantity: 0,
            })
            .and_then(|v| v.queue())
            .expect("Failed to queue the duplicate insert");
        let first = task.complete().err().expect("The duplicate insert succeeded");
        let second = task.complete().err().expect("The duplicate insert succeeded");
        let first = first.downcast_ref::<TaskError>().expect("Expected a task error");
        let second = second.downcast_ref::<TaskError>().expect("Expected a task error");
        assert!(Arc::ptr_eq(&first.cause, &second.cause));
        assert!(first.location.file().ends_with("multiple.rs"));
    }
}
