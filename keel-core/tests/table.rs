#[cfg(test)]
mod tests {
    use keel_core::{
        Column, Dialect, Entity, KeelError, Result, Schema, SqlType, Table, TableDef, Value,
        error_kind,
    };
    use std::sync::Arc;

    fn is_argument<T>(result: Result<T>) -> bool {
        matches!(
            result.as_ref().err().and_then(error_kind),
            Some(KeelError::Argument(..))
        )
    }

    #[derive(Default)]
    struct Author {
        id: i32,
        name: String,
        bio: String,
    }
    impl Entity for Author {
        fn schema() -> Schema<Self> {
            Schema::new("Author")
                .column(
                    Column::new("ID", |v: &Author| &v.id, |v| &mut v.id)
                        .primary_key()
                        .auto_increment(),
                )
                .column(
                    Column::new("name", |v: &Author| &v.name, |v| &mut v.name)
                        .length(80)
                        .not_null(),
                )
                .column(Column::new("bio", |v: &Author| &v.bio, |v| &mut v.bio))
                .unique_index(["name", "id"])
        }
    }

    #[derive(Default)]
    struct Book {
        id: i64,
        author: i32,
    }
    impl Entity for Book {
        fn schema() -> Schema<Self> {
            Schema::new("book")
                .column(Column::new("id", |v: &Book| &v.id, |v| &mut v.id).primary_key())
                .column(
                    Column::new("author", |v: &Book| &v.author, |v| &mut v.author)
                        .references("author", "id"),
                )
        }
    }

    #[derive(Default)]
    struct BadReference {
        author: i64,
    }
    impl Entity for BadReference {
        fn schema() -> Schema<Self> {
            Schema::new("bad").column(
                Column::new("author", |v: &BadReference| &v.author, |v| &mut v.author)
                    .references("author", "id"),
            )
        }
    }

    #[derive(Default)]
    struct TwoKeys {
        a: i32,
        b: i32,
    }
    impl Entity for TwoKeys {
        fn schema() -> Schema<Self> {
            Schema::new("two_keys")
                .column(Column::new("a", |v: &TwoKeys| &v.a, |v| &mut v.a).primary_key())
                .column(Column::new("b", |v: &TwoKeys| &v.b, |v| &mut v.b).primary_key())
        }
    }

    #[derive(Default)]
    struct Duplicate {
        a: i32,
    }
    impl Entity for Duplicate {
        fn schema() -> Schema<Self> {
            Schema::new("duplicate")
                .column(Column::new("a", |v: &Duplicate| &v.a, |v| &mut v.a))
                .column(Column::new("A", |v: &Duplicate| &v.a, |v| &mut v.a))
        }
    }

    #[derive(Default)]
    struct TextKey {
        key: String,
    }
    impl Entity for TextKey {
        fn schema() -> Schema<Self> {
            Schema::new("text_key").column(
                Column::new("key", |v: &TextKey| &v.key, |v| &mut v.key)
                    .length(10)
                    .primary_key()
                    .auto_increment(),
            )
        }
    }

    #[derive(Default)]
    struct LengthOnInteger {
        a: i32,
    }
    impl Entity for LengthOnInteger {
        fn schema() -> Schema<Self> {
            Schema::new("length_on_integer")
                .column(Column::new("a", |v: &LengthOnInteger| &v.a, |v| &mut v.a).length(4))
        }
    }

    #[derive(Default)]
    struct BadName {
        a: i32,
    }
    impl Entity for BadName {
        fn schema() -> Schema<Self> {
            Schema::new("bad name").column(Column::new("a", |v: &BadName| &v.a, |v| &mut v.a))
        }
    }

    #[derive(Default)]
    struct Empty;
    impl Entity for Empty {
        fn schema() -> Schema<Self> {
            Schema::new("empty")
        }
    }

    fn author(dialect: Dialect) -> Arc<TableDef> {
        Table::<Author>::build(1, dialect, "", |_| None)
            .unwrap()
            .def()
            .clone()
    }

    #[test]
    fn table_author() {
        let def = author(Dialect::MySql);
        assert_eq!(def.name, "author");
        assert_eq!(def.key, Some(0));
        assert_eq!(def.key_column().unwrap().name, "id");
        assert_eq!(def.column_index("NAME"), Some(1));
        let name = def.column("name").unwrap();
        assert_eq!(name.sql_type, SqlType::Varchar);
        assert_eq!(name.length, 80);
        assert!(name.not_null);
        let bio = def.column("bio").unwrap();
        assert_eq!(bio.sql_type, SqlType::Text);
        assert_eq!(bio.length, 65535);
        assert_eq!(def.indexes.len(), 1);
        assert_eq!(def.indexes[0].columns, ["name", "id"]);
        assert!(def.indexes[0].unique);
        assert!(def.require_column("missing").is_err());
    }

    #[test]
    fn table_prefix() {
        let table = Table::<Author>::build(1, Dialect::Sqlite, "App_", |_| None).unwrap();
        assert_eq!(table.name(), "app_author");
        assert_eq!(table.def().columns[1].qualified_name(), "app_author.name");
    }

    #[test]
    fn table_identity() {
        assert_eq!(*author(Dialect::MySql), *author(Dialect::MySql));
        let other = Table::<Author>::build(2, Dialect::MySql, "", |_| None).unwrap();
        assert_ne!(*author(Dialect::MySql), **other.def());
    }

    #[test]
    fn table_references() {
        let author = author(Dialect::Sqlite);
        let lookup = |name: &str| (name == "author").then(|| author.clone());
        let book = Table::<Book>::build(1, Dialect::Sqlite, "", lookup).unwrap();
        let reference = book.def().columns[1].references.as_ref().unwrap();
        assert_eq!(reference.table, "author");
        assert_eq!(reference.column, "id");
        assert!(reference.constraint);
        assert!(is_argument(Table::<Book>::build(1, Dialect::Sqlite, "", |_| None)));
        // INTEGER referencing INTEGER on one engine, BIGINT against INTEGER on the other.
        assert!(Table::<BadReference>::build(1, Dialect::Sqlite, "", lookup).is_ok());
        let author = self::author(Dialect::MySql);
        let lookup = |name: &str| (name == "author").then(|| author.clone());
        assert!(is_argument(Table::<BadReference>::build(
            1,
            Dialect::MySql,
            "",
            lookup
        )));
    }

    #[test]
    fn table_invalid() {
        assert!(is_argument(Table::<TwoKeys>::build(1, Dialect::Sqlite, "", |_| None)));
        assert!(is_argument(Table::<Duplicate>::build(1, Dialect::Sqlite, "", |_| None)));
        assert!(is_argument(Table::<TextKey>::build(1, Dialect::Sqlite, "", |_| None)));
        assert!(is_argument(Table::<LengthOnInteger>::build(
            1,
            Dialect::Sqlite,
            "",
            |_| None
        )));
        assert!(is_argument(Table::<BadName>::build(1, Dialect::Sqlite, "", |_| None)));
        assert!(is_argument(Table::<Empty>::build(1, Dialect::Sqlite, "", |_| None)));
    }

    #[test]
    fn table_accessors() {
        let table = Table::<Author>::build(1, Dialect::Sqlite, "", |_| None).unwrap();
        let mut author = Author::default();
        table.set(&mut author, 1, "Ursula".into()).unwrap();
        table.set(&mut author, 0, 7i64.into()).unwrap();
        assert_eq!(author.id, 7);
        assert_eq!(author.name, "Ursula");
        assert_eq!(table.get(&author, 1), Value::from("Ursula"));
        assert_eq!(table.read(&author).len(), 3);
        let error = table.set(&mut author, 0, "seven".into()).unwrap_err();
        assert!(format!("{error:#}").contains("author.id"));
    }
}
