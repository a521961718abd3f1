#[cfg(test)]
mod tests {
    use keel_core::{AsValue, Enumeration, Value, enumeration};
    use uuid::Uuid;

    #[derive(Debug, Clone, PartialEq)]
    enum Level {
        Low,
        Medium,
        High,
    }
    enumeration!(Level { Low, Medium, High });

    #[test]
    fn value_none() {
        assert_eq!(Value::Null, Value::Null);
        assert_ne!(Value::Float32(Some(1.0)), Value::Null);
        assert!(Value::Int32(None).is_null());
        assert!(!Value::Int32(Some(0)).is_null());
        assert_eq!(Value::Varchar(Some("x".into())).as_null(), Value::Varchar(None));
    }

    #[test]
    fn value_bool() {
        let val: Value = true.into();
        assert_eq!(val, Value::Boolean(Some(true)));
        assert_ne!(val, Value::Boolean(Some(false)));
        assert_ne!(val, Value::Boolean(None));
        assert_ne!(val, Value::Varchar(Some("true".into())));
        assert!(bool::try_from_value(val).unwrap());
        assert!(bool::try_from_value(1i8.into()).unwrap());
        assert!(!bool::try_from_value(0i32.into()).unwrap());
        assert!(bool::try_from_value(9i64.into()).unwrap());
        assert!(bool::try_from_value(0.5f32.into()).is_err());
    }

    #[test]
    fn value_integers() {
        let val: Value = 127i8.into();
        assert_eq!(val, Value::Int8(Some(127)));
        assert_eq!(i8::try_from_value(val).unwrap(), 127);
        assert_eq!(i16::try_from_value(29i8.into()).unwrap(), 29);
        assert_eq!(i32::try_from_value(i16::MIN.into()).unwrap(), -32768);
        assert_eq!(i64::try_from_value(i32::MAX.into()).unwrap(), 2147483647);
        assert_eq!(i32::try_from_value('A'.into()).unwrap(), 65);
        assert!(i8::try_from_value(300i32.into()).is_err());
        assert!(i32::try_from_value(i64::MAX.into()).is_err());
        assert!(i32::try_from_value(0.1f64.into()).is_err());
        assert!(i64::try_from_value("1".into()).is_err());
    }

    #[test]
    fn value_floats() {
        let val: Value = 1.5f32.into();
        assert_eq!(val, Value::Float32(Some(1.5)));
        assert_eq!(f64::try_from_value(val).unwrap(), 1.5);
        assert_eq!(f32::try_from_value(3i32.into()).unwrap(), 3.0);
        assert_eq!(
            Value::Float64(Some(f64::NAN)),
            Value::Float64(Some(f64::NAN))
        );
        assert!(f64::try_from_value(f64::INFINITY.into()).unwrap().is_infinite());
    }

    #[test]
    fn value_char() {
        assert_eq!(char::try_from_value(97i32.into()).unwrap(), 'a');
        assert_eq!(char::try_from_value("z".into()).unwrap(), 'z');
        assert!(char::try_from_value("zz".into()).is_err());
        assert!(char::try_from_value((-1i64).into()).is_err());
    }

    #[test]
    fn value_string() {
        let val: Value = "hello".into();
        assert_eq!(val, Value::Varchar(Some("hello".into())));
        assert_eq!(String::try_from_value(val).unwrap(), "hello");
        assert!(String::try_from_value(1i32.into()).is_err());
    }

    #[test]
    fn value_option() {
        assert_eq!(Option::<i32>::as_empty_value(), Value::Int32(None));
        assert_eq!(None::<i32>.as_value(), Value::Int32(None));
        assert_eq!(Some(4i32).as_value(), Value::Int32(Some(4)));
        assert_eq!(Option::<i32>::try_from_value(Value::Null).unwrap(), None);
        assert_eq!(Option::<i32>::try_from_value(Value::Int64(None)).unwrap(), None);
        assert_eq!(
            Option::<i32>::try_from_value(Value::Int64(Some(8))).unwrap(),
            Some(8)
        );
    }

    #[test]
    fn value_uuid() {
        let uuid = Uuid::parse_str("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap();
        assert_eq!(uuid.as_value(), Value::Uuid(Some(uuid)));
        assert_eq!(
            Uuid::try_from_value("67e55044-10b1-426f-9247-bb680e5fe0c8".into()).unwrap(),
            uuid
        );
        assert!(Uuid::try_from_value("not a uuid".into()).is_err());
    }

    #[test]
    fn value_array() {
        let val = vec![1i32, 2, 3].as_value();
        assert!(val.same_type(&Vec::<i32>::as_empty_value()));
        assert!(!val.same_type(&Vec::<i64>::as_empty_value()));
        assert_eq!(Vec::<i32>::try_from_value(val).unwrap(), vec![1, 2, 3]);
        assert!(Vec::<i32>::try_from_value(1i32.into()).is_err());
    }

    #[test]
    fn value_enum() {
        assert_eq!(Level::enum_type().members, &["Low", "Medium", "High"]);
        assert_eq!(Level::High.name(), "High");
        assert_eq!(Level::Medium.ordinal(), 1);
        let val = Level::High.as_value();
        assert!(matches!(val, Value::Enum(Some(2), _)));
        assert!(val.same_type(&Level::as_empty_value()));
        assert_eq!(Level::try_from_value(val).unwrap(), Level::High);
        assert!(Level::try_from_value(Value::Enum(Some(7), Level::enum_type())).is_err());
        assert!(Level::try_from_value(2i32.into()).is_err());
    }

    #[test]
    fn coerce() {
        assert_eq!(
            Value::Int64(Some(5)).coerce_to(&Value::Int16(None)).unwrap(),
            Value::Int16(Some(5))
        );
        assert_eq!(
            Value::Int64(None).coerce_to(&Value::Int32(None)).unwrap(),
            Value::Int32(None)
        );
        assert!(Value::Int64(Some(1 << 40)).coerce_to(&Value::Int32(None)).is_err());
        assert!(Value::Int32(Some(1)).coerce_to(&Value::Varchar(None)).is_err());
    }
}
