use crate::drop_tables;
use keel::{
    AsValue, Column, Database, Driver, Entity, KeelError, Order, Query, Schema, Where,
    enumeration, error_kind,
};

#[derive(Debug, Default, Clone, Copy, PartialEq)]
enum Category {
    #[default]
    Food,
    Tools,
    Toys,
}
enumeration!(Category { Food, Tools, Toys });

#[derive(Debug, Default, Clone, PartialEq)]
struct Product {
    id: i64,
    name: String,
    price: f64,
    quantity: i32,
    category: Category,
}

impl Entity for Product {
    fn schema() -> Schema<Self> {
        Schema::new("products")
            .column(
                Column::new("id", |v: &Product| &v.id, |v| &mut v.id)
                    .primary_key()
                    .auto_increment(),
            )
            .column(Column::new("name", |v: &Product| &v.name, |v| &mut v.name).length(60))
            .column(Column::new("price", |v: &Product| &v.price, |v| &mut v.price))
            .column(Column::new("quantity", |v: &Product| &v.quantity, |v| &mut v.quantity))
            .column(
                Column::new("category", |v: &Product| &v.category, |v| &mut v.category)
                    .length(10),
            )
    }
}

pub fn aggregates<D: Driver>(database: &Database<D>) {
    drop_tables(database, &["products"]);
    database
        .register::<Product>()
        .expect("Failed to register Product");

    let empty_max = database
        .select::<Product>()
        .and_then(|v| v.max::<f64>("price"))
        .and_then(Query::complete)
        .expect("Failed to compute the max of no rows");
    assert_eq!(empty_max, None);

    for (name, price, quantity, category) in [
        ("Bread", 2.5, 40, Category::Food),
        ("Cheese", 7.25, 12, Category::Food),
        ("Hammer", 15.0, 3, Category::Tools),
        ("Wrench", 11.75, 5, Category::Tools),
        ("Kite", 9.5, 8, Category::Toys),
    ] {
        database
            .insert_object(Product {
                id: 0,
                name: name.into(),
                price,
                quantity,
                category,
            })
            .and_then(Query::complete)
            .expect("Failed to insert a product");
    }

    let count = database
        .select::<Product>()
        .and_then(|v| v.count())
        .and_then(Query::complete)
        .expect("Failed to count the products");
    assert_eq!(count, Some(5));
    let count = database
        .select::<Product>()
        .and_then(|v| v.count_column("name"))
        .map(|v| v.filter(Where::eq("category", Category::Tools)))
        .and_then(Query::complete)
        .expect("Failed to count the tools");
    assert_eq!(count, Some(2));
    let cheapest = database
        .select::<Product>()
        .and_then(|v| v.min::<f64>("price"))
        .and_then(Query::complete)
        .expect("Failed to compute the min price");
    assert_eq!(cheapest, Some(2.5));
    let most = database
        .select::<Product>()
        .map(|v| v.filter(Where::ne("category", Category::Food)))
        .and_then(|v| v.max::<i32>("quantity"))
        .and_then(Query::complete)
        .expect("Failed to compute the max quantity");
    assert_eq!(most, Some(8));

    // Grouped raw rows come back in their host form
    let categories = database
        .select::<Product>()
        .and_then(|v| v.columns(["category"]))
        .map(|v| v.group_by(["category"]).order(Order::asc("category")))
        .and_then(Query::complete)
        .expect("Failed to group the categories");
    assert_eq!(
        categories,
        [
            vec![Category::Food.as_value()],
            vec![Category::Tools.as_value()],
            vec![Category::Toys.as_value()],
        ]
    );

    // Invalid aggregates
    let narrowed = database
        .select::<Product>()
        .and_then(|v| v.columns(["name"]))
        .and_then(|v| v.count());
    assert!(matches!(
        narrowed.as_ref().err().and_then(error_kind),
        Some(KeelError::State(..))
    ));
    let mistyped = database
        .select::<Product>()
        .and_then(|v| v.min::<i64>("price"));
    assert!(matches!(
        mistyped.as_ref().err().and_then(error_kind),
        Some(KeelError::Argument(..))
    ));
}
