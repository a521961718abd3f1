use crate::drop_tables;
use keel::{Column, Database, Driver, Entity, Query, Schema, Value, Where};
use uuid::Uuid;

#[derive(Debug, Default, Clone, PartialEq)]
struct Person {
    id: i64,
    name: String,
}

impl Entity for Person {
    fn schema() -> Schema<Self> {
        Schema::new("person")
            .column(
                Column::new("id", |v: &Person| &v.id, |v| &mut v.id)
                    .primary_key()
                    .auto_increment(),
            )
            .column(Column::new("name", |v: &Person| &v.name, |v| &mut v.name).length(100))
    }
}

pub fn simple<D: Driver>(database: &Database<D>) {
    drop_tables(database, &["person"]);
    database
        .register::<Person>()
        .expect("Failed to register Person");

    // Insert without the generated key
    let inserted = database
        .insert::<Person>()
        .and_then(|v| v.value("name", "X"))
        .and_then(Query::complete)
        .expect("Failed to insert X")
        .expect("X was not inserted");
    assert!(inserted.id > 0);
    assert_eq!(inserted.name, "X");

    let rows = database
        .select::<Person>()
        .and_then(|v| v.columns(["id", "name"]))
        .map(|v| v.filter(Where::eq("name", "X")))
        .and_then(Query::complete)
        .expect("Failed to select X");
    assert_eq!(
        rows,
        [vec![Value::Int64(Some(inserted.id)), Value::Varchar(Some("X".into()))]]
    );

    // Object round trip
    let created = database
        .insert_object(Person {
            id: 0,
            name: "Y".into(),
        })
        .and_then(Query::complete)
        .expect("Failed to insert Y")
        .expect("Y was not inserted");
    assert!(created.id > inserted.id);
    let updated = database
        .update_object(Person {
            name: "Z".into(),
            ..created.clone()
        })
        .and_then(Query::complete)
        .expect("Failed to update Y");
    assert_eq!(updated.id, created.id);
    let found = database
        .select::<Person>()
        .map(|v| v.filter(Where::eq("id", created.id)))
        .and_then(|v| v.single())
        .and_then(Query::complete)
        .expect("Failed to find Z");
    assert_eq!(found, Some(updated));
    let missing = database
        .select::<Person>()
        .map(|v| v.filter(Where::eq("name", "Y")))
        .and_then(|v| v.single())
        .and_then(Query::complete)
        .expect("Failed to look for Y");
    assert_eq!(missing, None);

    // All the rows in insertion order
    let people = database
        .select::<Person>()
        .map(|v| v.order(keel::Order::asc("id")))
        .and_then(Query::complete)
        .expect("Failed to select people");
    let names = people.iter().map(|v| v.name.as_str()).collect::<Vec<_>>();
    assert_eq!(names, ["X", "Z"]);

    // Pattern matched against an integer column
    let matched = database
        .select::<Person>()
        .map(|v| v.filter(Where::like("id", inserted.id.to_string())))
        .and_then(Query::complete)
        .expect("Failed to match the id pattern");
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].name, "X");

    let deleted = database
        .delete::<Person>()
        .map(|v| v.filter(Where::eq("name", "Z")))
        .and_then(Query::complete)
        .expect("Failed to delete Z");
    assert_eq!(deleted, 1);
    let count = database
        .select::<Person>()
        .and_then(|v| v.count())
        .and_then(Query::complete)
        .expect("Failed to count people");
    assert_eq!(count, Some(1));
}

#[derive(Debug, Default, Clone, PartialEq)]
struct SimpleFields {
    alpha: Option<i8>,
    bravo: Option<i32>,
    charlie: Option<i16>,
    delta: Option<i64>,
    echo: Option<Uuid>,
    foxtrot: Option<f64>,
    golf: Option<bool>,
    hotel: Option<String>,
    india: Option<char>,
}

impl Entity for SimpleFields {
    fn schema() -> Schema<Self> {
        Schema::new("simple_fields")
            .allow_unsafe_operations()
            .column(Column::new("alpha", |v: &Self| &v.alpha, |v| &mut v.alpha))
            .column(Column::new("bravo", |v: &Self| &v.bravo, |v| &mut v.bravo))
            .column(Column::new("charlie", |v: &Self| &v.charlie, |v| &mut v.charlie))
            .column(Column::new("delta", |v: &Self| &v.delta, |v| &mut v.delta))
            .column(Column::new("echo", |v: &Self| &v.echo, |v| &mut v.echo))
            .column(Column::new("foxtrot", |v: &Self| &v.foxtrot, |v| &mut v.foxtrot))
            .column(Column::new("golf", |v: &Self| &v.golf, |v| &mut v.golf))
            .column(Column::new("hotel", |v: &Self| &v.hotel, |v| &mut v.hotel).length(200))
            .column(Column::new("india", |v: &Self| &v.india, |v| &mut v.india))
    }
}

pub fn simple_fields<D: Driver>(database: &Database<D>) {
    drop_tables(database, &["simple_fields"]);
    database
        .register::<SimpleFields>()
        .expect("Failed to register SimpleFields");
    let entities = [
        SimpleFields {
            alpha: None,
            bravo: Some(777),
            charlie: Some(-2),
            delta: Some(9876543210),
            echo: None,
            foxtrot: Some(0.25),
            golf: Some(true),
            hotel: Some("Hello world!".into()),
            india: None,
        },
        SimpleFields {
            alpha: Some(-128),
            bravo: None,
            charlie: None,
            delta: Some(i64::MIN),
            echo: Some(Uuid::parse_str("5e915574-bb30-4430-98cf-c5854f61fbbd").unwrap()),
            foxtrot: Some(-1.5e300),
            golf: Some(false),
            hotel: Some("It's quoted".into()),
            india: Some('ℕ'),
        },
        SimpleFields::default(),
    ];
    for (i, entity) in entities.iter().enumerate() {
        database
            .delete::<SimpleFields>()
            .and_then(Query::complete)
            .expect("Failed to clear SimpleFields");
        let inserted = database
            .insert_object(entity.clone())
            .and_then(Query::complete)
            .unwrap_or_else(|e| panic!("Failed to insert simple {}: {:#}", i, e));
        assert_eq!(inserted.as_ref(), Some(entity));
        let found = database
            .select::<SimpleFields>()
            .and_then(|v| v.single())
            .and_then(Query::complete)
            .unwrap_or_else(|e| panic!("Failed to query simple {}: {:#}", i, e));
        assert_eq!(found.as_ref(), Some(entity));
    }

    // Literals bound through the converters
    let found = database
        .select::<SimpleFields>()
        .map(|v| {
            v.filter(Where::eq(
                "echo",
                Uuid::parse_str("5e915574-bb30-4430-98cf-c5854f61fbbd").unwrap(),
            ))
        })
        .and_then(Query::complete)
        .expect("Failed to filter by uuid");
    assert!(found.is_empty());
    let found = database
        .select::<SimpleFields>()
        .map(|v| v.filter(Where::is_null("hotel")))
        .and_then(Query::complete)
        .expect("Failed to filter by null");
    assert_eq!(found, [SimpleFields::default()]);
}
