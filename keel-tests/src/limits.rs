use crate::drop_tables;
use keel::{Column, Database, Driver, Entity, KeelError, Order, Query, Schema, Where, error_kind};

#[derive(Debug, Default, Clone, PartialEq)]
struct Limited {
    id: i32,
}

impl Entity for Limited {
    fn schema() -> Schema<Self> {
        Schema::new("limits")
            .column(Column::new("id", |v: &Limited| &v.id, |v| &mut v.id).primary_key())
    }
}

pub fn limits<D: Driver>(database: &Database<D>) {
    drop_tables(database, &["limits"]);
    database
        .register::<Limited>()
        .expect("Failed to register the limits table");
    for id in 0..20 {
        database
            .insert_object(Limited { id })
            .and_then(Query::complete)
            .expect("Failed to insert a value");
    }

    let values = database
        .select::<Limited>()
        .map(|v| v.order(Order::desc("id")))
        .and_then(|v| v.limit(3))
        .and_then(Query::complete)
        .expect("Failed to select with a limit");
    assert_eq!(values, [Limited { id: 19 }, Limited { id: 18 }, Limited { id: 17 }]);

    let ids = database
        .select::<Limited>()
        .and_then(|v| v.columns(["id"]))
        .map(|v| v.filter(Where::ge("id", 15)).order(Order::asc("id")))
        .and_then(|v| v.limit(2))
        .and_then(Query::complete)
        .expect("Failed to select raw values with a limit");
    assert_eq!(ids, [vec![15.into()], vec![16.into()]]);

    let first = database
        .select::<Limited>()
        .map(|v| v.order(Order::asc("id")))
        .and_then(|v| v.single())
        .and_then(Query::complete)
        .expect("Failed to select one value");
    assert_eq!(first, Some(Limited { id: 0 }));
    let limited = database
        .select::<Limited>()
        .and_then(|v| v.single())
        .and_then(|v| v.limit(5));
    assert!(matches!(
        limited.as_ref().err().and_then(error_kind),
        Some(KeelError::State(..))
    ));

    // Mutations accept a limit only where the dialect does
    let update = database
        .update::<Limited>()
        .and_then(|v| v.set("id", 100))
        .map(|v| v.filter(Where::lt("id", 5)))
        .and_then(|v| v.limit(1));
    if database.dialect().supports_mutation_limit() {
        let updated = update
            .and_then(Query::complete)
            .expect("Failed to update with a limit");
        assert_eq!(updated, 1);
        let deleted = database
            .delete::<Limited>()
            .map(|v| v.filter(Where::ge("id", 10)))
            .and_then(|v| v.limit(3))
            .and_then(Query::complete)
            .expect("Failed to delete with a limit");
        assert_eq!(deleted, 3);
    } else {
        assert!(matches!(
            update.as_ref().err().and_then(error_kind),
            Some(KeelError::State(..))
        ));
    }
}
