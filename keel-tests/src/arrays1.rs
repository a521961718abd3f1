use crate::drop_tables;
use keel::{Column, Database, Driver, Entity, Query, Schema, Where, enumeration};
use uuid::Uuid;

#[derive(Debug, Default, Clone, Copy, PartialEq)]
enum Level {
    #[default]
    Low,
    Medium,
    High,
}
enumeration!(Level { Low, Medium, High });

#[derive(Debug, Default, Clone, PartialEq)]
struct Sensor {
    id: i32,
    token: Uuid,
    level: Level,
    readings: Vec<f32>,
    counters: Vec<i64>,
    flags: Vec<bool>,
    raw: Box<[u8]>,
}

impl Entity for Sensor {
    fn schema() -> Schema<Self> {
        Schema::new("sensors")
            .column(Column::new("id", |v: &Sensor| &v.id, |v| &mut v.id).primary_key())
            .column(
                Column::new("token", |v: &Sensor| &v.token, |v| &mut v.token)
                    .storage::<Box<[u8]>>()
                    .length(16),
            )
            .column(
                Column::new("level", |v: &Sensor| &v.level, |v| &mut v.level)
                    .storage::<i32>()
                    .index(),
            )
            .column(Column::new("readings", |v: &Sensor| &v.readings, |v| &mut v.readings))
            .column(Column::new("counters", |v: &Sensor| &v.counters, |v| &mut v.counters))
            .column(Column::new("flags", |v: &Sensor| &v.flags, |v| &mut v.flags))
            .column(Column::new("raw", |v: &Sensor| &v.raw, |v| &mut v.raw))
    }
}

pub fn arrays1<D: Driver>(database: &Database<D>) {
    drop_tables(database, &["sensors"]);
    database
        .register::<Sensor>()
        .expect("Failed to register Sensor");
    let sensors = [
        Sensor {
            id: 1,
            token: Uuid::parse_str("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap(),
            level: Level::High,
            readings: vec![0.5, -1.25, f32::MAX, f32::MIN_POSITIVE, f32::INFINITY],
            counters: vec![i64::MIN, 0, i64::MAX],
            flags: vec![true, false, true],
            raw: vec![0x00, 0x27, 0xff].into(),
        },
        Sensor {
            id: 2,
            token: Uuid::new_v4(),
            level: Level::Low,
            readings: Vec::new(),
            counters: vec![42],
            flags: Vec::new(),
            raw: Box::default(),
        },
    ];
    for sensor in &sensors {
        database
            .insert_object(sensor.clone())
            .and_then(Query::complete)
            .expect("Failed to insert a sensor");
    }

    let found = database
        .select::<Sensor>()
        .map(|v| v.filter(Where::eq("token", sensors[0].token)))
        .and_then(|v| v.single())
        .and_then(Query::complete)
        .expect("Failed to select a sensor by token");
    assert_eq!(found.as_ref(), Some(&sensors[0]));

    let found = database
        .select::<Sensor>()
        .map(|v| v.filter(Where::eq("level", Level::Low)))
        .and_then(Query::complete)
        .expect("Failed to select a sensor by level");
    assert_eq!(found, [sensors[1].clone()]);

    let found = database
        .select::<Sensor>()
        .map(|v| v.filter(Where::eq("counters", vec![i64::MIN, 0, i64::MAX])))
        .and_then(Query::complete)
        .expect("Failed to select a sensor by counters");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, sensors[0].id);

    // NaN survives the blob packing
    let nan = Sensor {
        id: 3,
        token: Uuid::new_v4(),
        readings: vec![f32::NAN],
        ..Default::default()
    };
    database
        .insert_object(nan.clone())
        .and_then(Query::complete)
        .expect("Failed to insert the NaN sensor");
    let found = database
        .select::<Sensor>()
        .map(|v| v.filter(Where::eq("id", nan.id)))
        .and_then(|v| v.single())
        .and_then(Query::complete)
        .expect("Failed to select the NaN sensor")
        .expect("The NaN sensor is missing");
    assert!(found.readings[0].is_nan());
}
