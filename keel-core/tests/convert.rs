#[cfg(test)]
mod tests {
    use keel_core::{
        AsValue, Column, Converters, Dialect, Entity, KeelError, Schema, Table, Value, enumeration,
        error_kind,
    };
    use uuid::Uuid;

    #[derive(Debug, Default, Clone, Copy, PartialEq)]
    enum Shape {
        #[default]
        Circle,
        Square,
    }
    enumeration!(Shape { Circle, Square });

    #[derive(Debug, Default, PartialEq)]
    struct Sample {
        id: i64,
        ratio: f64,
        shape: Shape,
        shape_ordinal: Shape,
        token: Option<Uuid>,
        token_bytes: Option<Uuid>,
        samples: Vec<f32>,
        letter: char,
    }

    impl Entity for Sample {
        fn schema() -> Schema<Self> {
            Schema::new("sample")
                .column(Column::new("id", |v: &Sample| &v.id, |v| &mut v.id).primary_key())
                .column(Column::new("ratio", |v: &Sample| &v.ratio, |v| &mut v.ratio))
                .column(Column::new("shape", |v: &Sample| &v.shape, |v| &mut v.shape).length(20))
                .column(
                    Column::new("shape_ordinal", |v: &Sample| &v.shape_ordinal, |v| {
                        &mut v.shape_ordinal
                    })
                    .storage::<i32>(),
                )
                .column(Column::new("token", |v: &Sample| &v.token, |v| &mut v.token))
                .column(
                    Column::new("token_bytes", |v: &Sample| &v.token_bytes, |v| {
                        &mut v.token_bytes
                    })
                    .storage::<Box<[u8]>>()
                    .length(16),
                )
                .column(Column::new("samples", |v: &Sample| &v.samples, |v| &mut v.samples))
                .column(Column::new("letter", |v: &Sample| &v.letter, |v| &mut v.letter))
        }
    }

    fn table() -> Table<Sample> {
        Table::build(1, Dialect::Sqlite, "", |_| None).unwrap()
    }

    fn round_trip(table: &Table<Sample>, converters: &Converters, sample: &Sample) -> Sample {
        let stored = table
            .read(sample)
            .into_iter()
            .zip(&table.def().columns)
            .map(|(value, column)| converters.to_storage(column, value).unwrap())
            .collect::<Vec<_>>();
        let indices = (0..stored.len()).collect::<Vec<_>>();
        table.decode(converters, &indices, stored).unwrap()
    }

    #[test]
    fn storage_forms() {
        let table = table();
        let converters = Converters::default();
        let columns = &table.def().columns;
        let column = |name: &str| columns.iter().find(|c| c.name == name).unwrap();
        assert_eq!(
            converters
                .to_storage(column("shape"), Shape::Square.as_value())
                .unwrap(),
            Value::Varchar(Some("Square".into()))
        );
        assert_eq!(
            converters
                .to_storage(column("shape_ordinal"), Shape::Square.as_value())
                .unwrap(),
            Value::Int32(Some(1))
        );
        assert_eq!(
            converters
                .from_storage(column("shape"), Value::Varchar(Some("Circle".into())))
                .unwrap(),
            Shape::Circle.as_value()
        );
        let uuid = Uuid::parse_str("00112233-4455-6677-8899-aabbccddeeff").unwrap();
        assert_eq!(
            converters
                .to_storage(column("token"), uuid.as_value())
                .unwrap(),
            Value::Varchar(Some("00112233-4455-6677-8899-aabbccddeeff".into()))
        );
        let Value::Blob(Some(bytes)) = converters
            .to_storage(column("token_bytes"), uuid.as_value())
            .unwrap()
        else {
            panic!("Expected a blob");
        };
        assert_eq!(bytes[0], 0x00);
        assert_eq!(bytes[15], 0xff);
        assert_eq!(
            converters
                .to_storage(column("samples"), vec![1.0f32].as_value())
                .unwrap(),
            Value::Blob(Some(vec![0x3f, 0x80, 0x00, 0x00].into()))
        );
        assert_eq!(
            converters
                .to_storage(column("token"), Value::Uuid(None))
                .unwrap(),
            Value::Varchar(None)
        );
    }

    #[test]
    fn round_trips() {
        let table = table();
        let converters = Converters::default();
        let sample = Sample {
            id: 42,
            ratio: 0.25,
            shape: Shape::Square,
            shape_ordinal: Shape::Square,
            token: Some(Uuid::parse_str("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap()),
            token_bytes: Some(Uuid::parse_str("00112233-4455-6677-8899-aabbccddeeff").unwrap()),
            samples: vec![0.5, -1.25, f32::MAX],
            letter: 'λ',
        };
        assert_eq!(round_trip(&table, &converters, &sample), sample);
        let empty = Sample::default();
        assert_eq!(round_trip(&table, &converters, &empty), empty);
    }

    #[test]
    fn special_floats() {
        let table = table();
        let converters = Converters::default();
        for ratio in [f64::INFINITY, f64::NEG_INFINITY, f64::MIN_POSITIVE, -0.0] {
            let sample = Sample {
                ratio,
                ..Default::default()
            };
            assert_eq!(round_trip(&table, &converters, &sample).ratio.to_bits(), ratio.to_bits());
        }
        let sample = Sample {
            ratio: f64::NAN,
            samples: vec![f32::NAN, f32::INFINITY],
            ..Default::default()
        };
        let decoded = round_trip(&table, &converters, &sample);
        assert!(decoded.ratio.is_nan());
        assert!(decoded.samples[0].is_nan());
        assert_eq!(decoded.samples[1], f32::INFINITY);
    }

    #[test]
    fn no_converter() {
        let table = table();
        let converters = Converters::empty();
        let column = table.def().column("shape").unwrap();
        let error = converters
            .to_storage(column, Shape::Circle.as_value())
            .unwrap_err();
        assert!(matches!(
            error_kind(&error),
            Some(KeelError::CannotConvert { column, .. }) if column == "sample.shape"
        ));
    }

    #[test]
    fn widening() {
        let table = table();
        let converters = Converters::default();
        let id = table.def().column("id").unwrap();
        assert_eq!(
            converters.to_storage(id, 7i32.as_value()).unwrap(),
            Value::Int64(Some(7))
        );
        assert_eq!(
            converters.from_storage(id, Value::Int32(Some(7))).unwrap(),
            Value::Int64(Some(7))
        );
        assert_eq!(
            converters.from_storage(id, Value::Null).unwrap(),
            Value::Int64(None)
        );
        let letter = table.def().column("letter").unwrap();
        assert_eq!(
            converters.from_storage(letter, Value::Int64(Some(97))).unwrap(),
            Value::Char(Some('a'))
        );
    }
}
