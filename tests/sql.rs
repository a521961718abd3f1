#[cfg(test)]
mod tests {
    use keel::{
        Column, CompositeIndex, Converters, CreateIndexesQuery, Database, Driver, Entity,
        IndexStatement, JoinOn, KeelError, Order, Schema, Settings, SqlWriter, Where, error_kind,
    };
    use keel_mysql::MySqlDriver;
    use keel_sqlite::SqliteDriver;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Customer {
        id: i64,
        name: String,
        email: String,
        score: f64,
        active: bool,
        totals: Vec<f64>,
    }

    impl Entity for Customer {
        fn schema() -> Schema<Self> {
            Schema::new("customer")
                .column(
                    Column::new("id", |v: &Customer| &v.id, |v| &mut v.id)
                        .primary_key()
                        .auto_increment(),
                )
                .column(
                    Column::new("name", |v: &Customer| &v.name, |v| &mut v.name)
                        .length(60)
                        .not_null(),
                )
                .column(
                    Column::new("email", |v: &Customer| &v.email, |v| &mut v.email)
                        .length(120)
                        .unique(),
                )
                .column(Column::new("score", |v: &Customer| &v.score, |v| &mut v.score))
                .column(Column::new("active", |v: &Customer| &v.active, |v| &mut v.active))
        }
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Purchase {
        id: i64,
        customer: i64,
        total: f64,
        note: Option<String>,
    }

    impl Entity for Purchase {
        fn schema() -> Schema<Self> {
            Schema::new("purchase")
                .column(Column::new("id", |v: &Purchase| &v.id, |v| &mut v.id).primary_key())
                .column(
                    Column::new("customer", |v: &Purchase| &v.customer, |v| &mut v.customer)
                        .references("customer", "id"),
                )
                .column(Column::new("total", |v: &Purchase| &v.total, |v| &mut v.total))
                .column(Column::new("note", |v: &Purchase| &v.note, |v| &mut v.note))
                .index(["customer", "total"])
        }
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Tag {
        id: i8,
        label: String,
    }

    impl Entity for Tag {
        fn schema() -> Schema<Self> {
            Schema::new("tag")
                .column(
                    Column::new("id", |v: &Tag| &v.id, |v| &mut v.id)
                        .primary_key()
                        .auto_increment(),
                )
                .column(Column::new("label", |v: &Tag| &v.label, |v| &mut v.label).length(20))
        }
    }

    /// Both tables declared, nothing is ever sent to the server.
    fn declared<D: Driver>(driver: D, url: &str) -> Database<D> {
        let database = Database::open(driver, Settings::default().with_url(url))
            .expect("Could not open the database");
        database.declare::<Customer>().unwrap();
        database.declare::<Purchase>().unwrap();
        database
    }

    fn sqlite() -> Database<SqliteDriver> {
        declared(SqliteDriver::new(), "sqlite://:memory:")
    }

    fn mysql() -> Database<MySqlDriver> {
        declared(MySqlDriver::new(), "mysql://nobody@localhost:3306/nothing")
    }

    fn create_table<D: Driver>(database: &Database<D>, table: &str) -> String {
        let mut out = String::new();
        database.sql_writer().write_create_table(
            &mut out,
            database.converters(),
            &database.table_def(table).unwrap(),
        );
        out
    }

    #[test]
    fn sql_create_table() {
        assert_eq!(
            create_table(&sqlite(), "customer"),
            "CREATE TABLE IF NOT EXISTS customer (id INTEGER PRIMARY KEY AUTOINCREMENT, \
             name VARCHAR(60) NOT NULL, email VARCHAR(120) UNIQUE, score DOUBLE, active INTEGER)"
        );
        assert_eq!(
            create_table(&mysql(), "customer"),
            "CREATE TABLE IF NOT EXISTS customer (id BIGINT PRIMARY KEY AUTO_INCREMENT, \
             name VARCHAR(60) NOT NULL, email VARCHAR(120) UNIQUE, score DOUBLE, active INTEGER)"
        );
        assert_eq!(
            create_table(&sqlite(), "purchase"),
            "CREATE TABLE IF NOT EXISTS purchase (id INTEGER PRIMARY KEY, customer INTEGER, \
             total DOUBLE, note TEXT(65535), FOREIGN KEY(customer) REFERENCES customer(id))"
        );
    }

    #[test]
    fn sql_create_index() {
        let database = mysql();
        let table = database.table_def("customer").unwrap();
        let statement = IndexStatement {
            table: &table,
            name: "name_email_ormm_idx".into(),
            columns: vec![table.column("name").unwrap(), table.column("email").unwrap()],
            unique: true,
        };
        let writer = database.sql_writer();
        let mut lookup = String::new();
        assert!(writer.write_index_lookup(&mut lookup, &statement));
        assert_eq!(
            lookup,
            "SELECT COUNT(1) FROM information_schema.statistics WHERE table_schema = DATABASE() \
             AND table_name = 'customer' AND index_name = 'name_email_ormm_idx'"
        );
        let mut create = String::new();
        writer
            .write_create_index(&mut create, &Converters::default(), &statement)
            .unwrap();
        assert_eq!(
            create,
            "CREATE UNIQUE INDEX name_email_ormm_idx ON customer(name(60), email(120))"
        );

        let database = sqlite();
        let table = database.table_def("customer").unwrap();
        let statement = IndexStatement {
            table: &table,
            name: "name_email_ormm_idx".into(),
            columns: vec![table.column("name").unwrap(), table.column("email").unwrap()],
            unique: true,
        };
        let writer = database.sql_writer();
        assert!(!writer.write_index_lookup(&mut String::new(), &statement));
        let mut create = String::new();
        writer
            .write_create_index(&mut create, &Converters::default(), &statement)
            .unwrap();
        assert_eq!(
            create,
            "CREATE UNIQUE INDEX IF NOT EXISTS name_email_ormm_idx ON customer(name, email)"
        );
    }

    #[test]
    fn sql_index_names() {
        let database = sqlite();
        let query = CreateIndexesQuery::new(
            database.clone(),
            database.table_def("purchase").unwrap(),
            vec![
                CompositeIndex {
                    columns: vec!["customer".into(), "total".into()],
                    unique: false,
                },
                CompositeIndex {
                    columns: vec!["note".into()],
                    unique: true,
                },
            ],
        )
        .unwrap();
        assert_eq!(
            query.statements().collect::<Vec<_>>(),
            [
                "CREATE INDEX IF NOT EXISTS customer_total_ormm_idx ON purchase(customer, total)",
                "CREATE UNIQUE INDEX IF NOT EXISTS note_ormm_idx ON purchase(note)",
            ]
        );
    }

    fn filtered_and_ordered<D: Driver>(database: &Database<D>) -> String {
        database
            .select::<Customer>()
            .map(|v| {
                v.filter(
                    Where::and([Where::ge("score", 2.5), Where::like("name", "O'%")]).unwrap(),
                )
            })
            .map(|v| v.order(Order::combine([Order::desc("score"), Order::asc("id")]).unwrap()))
            .and_then(|v| v.limit(10))
            .and_then(|v| v.sql())
            .unwrap()
    }

    #[test]
    fn sql_select() {
        let expected = "SELECT customer.id, customer.name, customer.email, customer.score, \
                        customer.active FROM customer \
                        WHERE (customer.score >= 2.5) AND (customer.name LIKE 'O''%') \
                        ORDER BY customer.score DESC, customer.id ASC LIMIT 10";
        assert_eq!(filtered_and_ordered(&sqlite()), expected);
        assert_eq!(filtered_and_ordered(&mysql()), expected);
    }

    #[test]
    fn sql_string_literals() {
        let filter = || Where::eq("name", r"C:\temp");
        assert_eq!(
            sqlite()
                .select::<Customer>()
                .and_then(|v| v.columns(["id"]))
                .unwrap()
                .filter(filter())
                .sql()
                .unwrap(),
            r"SELECT customer.id FROM customer WHERE customer.name = 'C:\temp'"
        );
        assert_eq!(
            mysql()
                .select::<Customer>()
                .and_then(|v| v.columns(["id"]))
                .unwrap()
                .filter(filter())
                .sql()
                .unwrap(),
            r"SELECT customer.id FROM customer WHERE customer.name = 'C:\\temp'"
        );
    }

    #[test]
    fn sql_random_order() {
        let sql = |sql: keel::Result<String>| sql.unwrap();
        assert_eq!(
            sql(sqlite()
                .select::<Customer>()
                .and_then(|v| v.columns(["name"]))
                .map(|v| v.order(Order::rand()))
                .and_then(|v| v.sql())),
            "SELECT customer.name FROM customer ORDER BY RANDOM()"
        );
        assert_eq!(
            sql(mysql()
                .select::<Customer>()
                .and_then(|v| v.columns(["name"]))
                .map(|v| v.order(Order::rand()))
                .and_then(|v| v.sql())),
            "SELECT customer.name FROM customer ORDER BY RAND()"
        );
    }

    #[test]
    fn sql_filters() {
        let database = sqlite();
        let sql = database
            .select::<Purchase>()
            .and_then(|v| v.columns(["id"]))
            .map(|v| {
                v.filter(
                    Where::or([
                        Where::is_in("customer", [1i64, 2, 3]).unwrap(),
                        Where::not(Where::is_null("note")),
                    ])
                    .unwrap(),
                )
            })
            .and_then(|v| v.sql())
            .unwrap();
        assert_eq!(
            sql,
            "SELECT purchase.id FROM purchase \
             WHERE (purchase.customer IN (1, 2, 3)) OR (NOT (purchase.note IS NULL))"
        );
        let subquery = database
            .select::<Customer>()
            .and_then(|v| v.columns(["id"]))
            .map(|v| v.filter(Where::eq("email", "ada@example.com")))
            .and_then(|v| v.single())
            .and_then(|v| v.into_subquery())
            .unwrap();
        let sql = database
            .select::<Purchase>()
            .map(|v| v.filter(Where::eq("customer", subquery)))
            .and_then(|v| v.count())
            .and_then(|v| v.sql())
            .unwrap();
        assert_eq!(
            sql,
            "SELECT COUNT(*) FROM purchase WHERE purchase.customer = \
             (SELECT customer.id FROM customer WHERE customer.email = 'ada@example.com' LIMIT 1)"
        );
        let error = database.select::<Purchase>().and_then(|v| v.columns(["missing"]));
        assert!(matches!(
            error.err().as_ref().and_then(error_kind),
            Some(KeelError::Argument(..))
        ));
    }

    #[test]
    fn sql_filter_arity() {
        let database = sqlite();
        let filters = [
            Where::In {
                column: "customer".into(),
                values: vec![1i64.into()],
            },
            Where::And(vec![]),
            Where::Or(vec![Where::is_null("note")]),
            Where::not(Where::And(vec![Where::is_null("note")])),
        ];
        for filter in filters {
            let result = database
                .select::<Purchase>()
                .map(|v| v.filter(filter))
                .and_then(|v| v.sql());
            assert!(matches!(
                result.err().as_ref().and_then(error_kind),
                Some(KeelError::Argument(..))
            ));
        }
    }

    #[test]
    fn sql_like_numeric_column() {
        let database = mysql();
        let sql = database
            .select::<Purchase>()
            .and_then(|v| v.columns(["id"]))
            .map(|v| v.filter(Where::like("customer", "1%")))
            .and_then(|v| v.sql())
            .unwrap();
        assert_eq!(
            sql,
            "SELECT purchase.id FROM purchase WHERE purchase.customer LIKE '1%'"
        );
    }

    #[test]
    fn sql_join() {
        let database = mysql();
        let sql = database
            .select::<Customer>()
            .and_then(|v| v.inner_join::<Purchase>())
            .map(|v| v.on(JoinOn::eq("id", "customer")))
            .and_then(|v| {
                v.many("total", |customer: &mut Customer, totals: Vec<f64>| {
                    customer.totals = totals
                })
            })
            .and_then(|v| v.finish())
            .map(|v| v.filter(Where::gt("purchase.total", 10.0)))
            .and_then(|v| v.limit(2))
            .and_then(|v| v.sql())
            .unwrap();
        // The limit counts customers, not joined rows
        assert_eq!(
            sql,
            "SELECT customer.id, customer.name, customer.email, customer.score, customer.active, \
             purchase.total FROM customer INNER JOIN purchase ON customer.id = purchase.customer \
             WHERE purchase.total > 10.0"
        );
    }

    #[test]
    fn sql_insert() {
        let ada = Customer {
            name: "Ada".into(),
            email: "ada@example.com".into(),
            score: 2.5,
            active: true,
            ..Default::default()
        };
        let sqlite = sqlite();
        let mysql = mysql();
        let expected = "INSERT INTO customer (name, email, score, active) \
                        VALUES ('Ada', 'ada@example.com', 2.5, 1)";
        assert_eq!(
            sqlite.insert_object(ada.clone()).and_then(|v| v.sql()).unwrap(),
            expected
        );
        assert_eq!(
            mysql.insert_object(ada.clone()).and_then(|v| v.sql()).unwrap(),
            expected
        );
        assert_eq!(
            sqlite.insert::<Customer>().and_then(|v| v.sql()).unwrap(),
            "INSERT INTO customer DEFAULT VALUES"
        );
        assert_eq!(
            mysql.insert::<Customer>().and_then(|v| v.sql()).unwrap(),
            "INSERT INTO customer () VALUES ()"
        );
        assert_eq!(
            sqlite
                .insert_object(ada.clone())
                .map(|v| v.ignore())
                .and_then(|v| v.sql())
                .unwrap(),
            "INSERT OR IGNORE INTO customer (name, email, score, active) \
             VALUES ('Ada', 'ada@example.com', 2.5, 1)"
        );
        assert_eq!(
            mysql
                .insert_object(ada.clone())
                .map(|v| v.ignore())
                .and_then(|v| v.sql())
                .unwrap(),
            "INSERT IGNORE INTO customer (name, email, score, active) \
             VALUES ('Ada', 'ada@example.com', 2.5, 1)"
        );
    }

    #[test]
    fn sql_insert_small_key() {
        let database = sqlite();
        database.declare::<Tag>().unwrap();
        let tag = Tag {
            id: 0,
            label: "red".into(),
        };
        assert_eq!(
            database.insert_object(tag.clone()).and_then(|v| v.sql()).unwrap(),
            "INSERT INTO tag (label) VALUES ('red')"
        );
        assert_eq!(
            database
                .insert_object(Tag { id: 7, ..tag })
                .and_then(|v| v.sql())
                .unwrap(),
            "INSERT INTO tag (id, label) VALUES (7, 'red')"
        );
    }

    #[test]
    fn sql_upsert() {
        assert_eq!(
            mysql()
                .insert::<Customer>()
                .and_then(|v| v.value("email", "ada@example.com"))
                .and_then(|v| v.value("score", 4.0))
                .map(|v| v.on_duplicate_update())
                .and_then(|v| v.sql())
                .unwrap(),
            "INSERT INTO customer (email, score) VALUES ('ada@example.com', 4.0) \
             ON DUPLICATE KEY UPDATE score = VALUES(score)"
        );
        let sqlite = sqlite();
        assert_eq!(
            sqlite
                .insert::<Customer>()
                .and_then(|v| v.value("email", "ada@example.com"))
                .and_then(|v| v.value("score", 4.0))
                .map(|v| v.on_duplicate_update())
                .and_then(|v| v.sql())
                .unwrap(),
            "INSERT OR REPLACE INTO customer (email, score) VALUES ('ada@example.com', 4.0)"
        );
        // Nothing tells a duplicate apart
        let error = sqlite
            .insert::<Customer>()
            .and_then(|v| v.value("score", 4.0))
            .map(|v| v.on_duplicate_update())
            .and_then(|v| v.sql());
        assert!(matches!(
            error.err().as_ref().and_then(error_kind),
            Some(KeelError::Argument(..))
        ));
    }

    #[test]
    fn sql_update_delete() {
        let database = mysql();
        assert_eq!(
            database
                .update::<Customer>()
                .and_then(|v| v.set("active", false))
                .map(|v| v.filter(Where::lt("score", 1.0)))
                .and_then(|v| v.limit(5))
                .and_then(|v| v.sql())
                .unwrap(),
            "UPDATE customer SET active = 0 WHERE customer.score < 1.0 LIMIT 5"
        );
        assert_eq!(
            database
                .update_object(Customer {
                    id: 7,
                    name: "Grace".into(),
                    email: "grace@example.com".into(),
                    score: 0.5,
                    active: false,
                    totals: Vec::new(),
                })
                .and_then(|v| v.sql())
                .unwrap(),
            "UPDATE customer SET name = 'Grace', email = 'grace@example.com', score = 0.5, \
             active = 0 WHERE customer.id = 7 LIMIT 1"
        );
        assert_eq!(
            database
                .delete::<Purchase>()
                .map(|v| v.filter(Where::ne("customer", 7i64)))
                .and_then(|v| v.sql())
                .unwrap(),
            "DELETE FROM purchase WHERE purchase.customer <> 7"
        );
        let unfiltered = database.delete::<Purchase>().and_then(|v| v.sql());
        assert!(matches!(
            unfiltered.err().as_ref().and_then(error_kind),
            Some(KeelError::UnsafeQuery(..))
        ));
        let sqlite = sqlite();
        let limited = sqlite
            .delete::<Purchase>()
            .map(|v| v.filter(Where::ne("customer", 7i64)))
            .and_then(|v| v.limit(1));
        assert!(matches!(
            limited.err().as_ref().and_then(error_kind),
            Some(KeelError::State(..))
        ));
    }
}
