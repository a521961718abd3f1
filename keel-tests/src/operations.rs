use crate::drop_tables;
use keel::{
    Column, Database, Driver, Entity, KeelError, Order, Query, Schema, Where, error_kind,
};

#[derive(Debug, Default, Clone, PartialEq)]
struct Account {
    name: String,
    balance: i64,
    frozen: bool,
}

impl Entity for Account {
    fn schema() -> Schema<Self> {
        Schema::new("accounts")
            .column(
                Column::new("name", |v: &Account| &v.name, |v| &mut v.name)
                    .length(20)
                    .primary_key(),
            )
            .column(Column::new("balance", |v: &Account| &v.balance, |v| &mut v.balance))
            .column(Column::new("frozen", |v: &Account| &v.frozen, |v| &mut v.frozen))
    }
}

fn names(accounts: &[Account]) -> Vec<&str> {
    accounts.iter().map(|v| v.name.as_str()).collect()
}

pub fn operations<D: Driver>(database: &Database<D>) {
    drop_tables(database, &["accounts"]);
    database
        .register::<Account>()
        .expect("Failed to register Account");
    for (name, balance) in [("alice", 120), ("bob", 40), ("carol", 0), ("dave", 75)] {
        database
            .insert::<Account>()
            .and_then(|v| v.value("name", name))
            .and_then(|v| v.value("balance", balance as i64))
            .and_then(|v| v.value("frozen", false))
            .and_then(Query::complete)
            .expect("Failed to insert an account");
    }

    // Unguarded mutations are rejected
    let update = database
        .update::<Account>()
        .and_then(|v| v.set("balance", 0i64))
        .and_then(Query::complete);
    assert!(matches!(
        update.as_ref().err().and_then(error_kind),
        Some(KeelError::UnsafeQuery(..))
    ));
    let delete = database.delete::<Account>().and_then(Query::complete);
    assert!(matches!(
        delete.as_ref().err().and_then(error_kind),
        Some(KeelError::UnsafeQuery(..))
    ));

    // Filters
    let select = |condition: Where| {
        database
            .select::<Account>()
            .map(|v| v.filter(condition).order(Order::asc("name")))
            .and_then(Query::complete)
            .expect("Failed to select the accounts")
    };
    assert_eq!(names(&select(Where::like("name", "%o%"))), ["bob", "carol"]);
    assert_eq!(
        names(&select(Where::is_in("name", ["alice", "dave"]).unwrap())),
        ["alice", "dave"]
    );
    assert_eq!(
        names(&select(
            Where::or([Where::gt("balance", 100i64), Where::eq("balance", 0i64)]).unwrap()
        )),
        ["alice", "carol"]
    );
    assert_eq!(
        names(&select(Where::not(
            Where::and([Where::ge("balance", 40i64), Where::le("balance", 100i64)]).unwrap()
        ))),
        ["alice", "carol"]
    );

    let updated = database
        .update::<Account>()
        .and_then(|v| v.set("frozen", true))
        .map(|v| v.filter(Where::lt("balance", 50i64)))
        .and_then(Query::complete)
        .expect("Failed to freeze the accounts");
    assert_eq!(updated, 2);
    assert_eq!(names(&select(Where::eq("frozen", true))), ["bob", "carol"]);

    // Upsert replaces the balance of an existing account
    let upserted = database
        .insert_object(Account {
            name: "bob".into(),
            balance: 55,
            frozen: false,
        })
        .map(|v| v.on_duplicate_update())
        .and_then(Query::complete)
        .expect("Failed to upsert bob");
    assert!(upserted.is_some());
    let bob = database
        .select::<Account>()
        .map(|v| v.filter(Where::eq("name", "bob")))
        .and_then(|v| v.single())
        .and_then(Query::complete)
        .expect("Failed to select bob");
    assert_eq!(
        bob,
        Some(Account {
            name: "bob".into(),
            balance: 55,
            frozen: false,
        })
    );
    let conflicting = database
        .insert::<Account>()
        .and_then(|v| v.value("name", "erin"))
        .map(|v| v.ignore().on_duplicate_update())
        .and_then(|v| v.sql());
    assert!(matches!(
        conflicting.as_ref().err().and_then(error_kind),
        Some(KeelError::Argument(..))
    ));

    let random = database
        .select::<Account>()
        .map(|v| v.order(Order::rand()))
        .and_then(Query::complete)
        .expect("Failed to select in random order");
    assert_eq!(random.len(), 4);

    let deleted = database
        .delete::<Account>()
        .map(|v| v.filter(Where::eq("frozen", true)))
        .and_then(Query::complete)
        .expect("Failed to delete the frozen accounts");
    assert_eq!(deleted, 1);
    assert_eq!(
        names(&select(Where::is_not_null("name"))),
        ["alice", "bob", "dave"]
    );
}
