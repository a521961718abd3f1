use crate::drop_tables;
use keel::{
    Column, Database, Driver, Entity, JoinOn, KeelError, Order, Query, Schema, Where, error_kind,
};

#[derive(Debug, Default, Clone, PartialEq)]
struct Author {
    id: i64,
    name: String,
    country: String,
    titles: Vec<String>,
}

impl Entity for Author {
    fn schema() -> Schema<Self> {
        Schema::new("authors")
            .column(
                Column::new("id", |v: &Author| &v.id, |v| &mut v.id)
                    .primary_key()
                    .auto_increment(),
            )
            .column(Column::new("name", |v: &Author| &v.name, |v| &mut v.name).length(100))
            .column(
                Column::new("country", |v: &Author| &v.country, |v| &mut v.country)
                    .length(40)
                    .index(),
            )
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Book {
    id: i64,
    title: String,
    author: i64,
    year: i32,
    author_name: String,
}

impl Entity for Book {
    fn schema() -> Schema<Self> {
        Schema::new("books")
            .column(
                Column::new("id", |v: &Book| &v.id, |v| &mut v.id)
                    .primary_key()
                    .auto_increment(),
            )
            .column(Column::new("title", |v: &Book| &v.title, |v| &mut v.title).length(200))
            .column(
                Column::new("author", |v: &Book| &v.author, |v| &mut v.author)
                    .references("authors", "id"),
            )
            .column(Column::new("year", |v: &Book| &v.year, |v| &mut v.year))
            .unique_index(["title", "author"])
    }
}

pub fn books<D: Driver>(database: &Database<D>) {
    drop_tables(database, &["books", "authors"]);
    database
        .register::<Author>()
        .expect("Failed to register Author");
    database
        .register::<Book>()
        .expect("Failed to register Book");

    let author = |name: &str, country: &str| {
        database
            .insert_object(Author {
                name: name.into(),
                country: country.into(),
                ..Default::default()
            })
            .and_then(Query::complete)
            .expect("Failed to insert an author")
            .expect("The author was not inserted")
            .id
    };
    let rowling = author("J.K. Rowling", "UK");
    let tolkien = author("J.R.R. Tolkien", "UK");
    let glukhovsky = author("Dmitry Glukhovsky", "Russia");
    let torvalds = author("Linus Torvalds", "Finland");
    for (title, author, year) in [
        ("Harry Potter and the Philosopher's Stone", rowling, 1997),
        ("Harry Potter and the Deathly Hallows", rowling, 2007),
        ("The Hobbit", tolkien, 1937),
        ("Metro 2033", glukhovsky, 2002),
        ("Metro 2034", glukhovsky, 2009),
        ("Metro 2035", glukhovsky, 2015),
    ] {
        database
            .insert_object(Book {
                title: title.into(),
                author,
                year,
                ..Default::default()
            })
            .and_then(Query::complete)
            .expect("Failed to insert a book");
    }

    // Inserting the same title and author again is ignored
    let ignored = database
        .insert::<Book>()
        .and_then(|v| v.value("title", "The Hobbit"))
        .and_then(|v| v.value("author", tolkien))
        .and_then(|v| v.value("year", 1938))
        .map(|v| v.ignore())
        .and_then(Query::complete)
        .expect("Failed to insert or ignore The Hobbit");
    assert_eq!(ignored, None);

    // One to many
    let authors = database
        .select::<Author>()
        .and_then(|v| v.inner_join::<Book>())
        .map(|v| v.on(JoinOn::eq("id", "author")))
        .and_then(|v| v.many("title", |author: &mut Author, titles: Vec<String>| author.titles = titles))
        .and_then(|v| v.finish())
        .map(|v| v.order(Order::combine([Order::asc("authors.id"), Order::asc("books.year")]).unwrap()))
        .and_then(Query::complete)
        .expect("Failed to select the authors with their books");
    assert_eq!(authors.len(), 3);
    assert_eq!(authors[0].name, "J.K. Rowling");
    assert_eq!(
        authors[0].titles,
        [
            "Harry Potter and the Philosopher's Stone",
            "Harry Potter and the Deathly Hallows"
        ]
    );
    assert_eq!(authors[1].titles, ["The Hobbit"]);
    assert_eq!(authors[2].titles, ["Metro 2033", "Metro 2034", "Metro 2035"]);

    // The limit counts authors, not rows
    let authors = database
        .select::<Author>()
        .and_then(|v| v.inner_join::<Book>())
        .map(|v| v.on(JoinOn::eq("id", "author")))
        .and_then(|v| v.many("title", |author: &mut Author, titles: Vec<String>| author.titles = titles))
        .and_then(|v| v.finish())
        .map(|v| {
            v.filter(Where::eq("country", "UK"))
                .order(Order::combine([Order::asc("authors.id"), Order::asc("books.year")]).unwrap())
        })
        .and_then(|v| v.limit(1))
        .and_then(Query::complete)
        .expect("Failed to select the first author with their books");
    assert_eq!(authors.len(), 1);
    assert_eq!(authors[0].titles.len(), 2);

    // Left join keeps authors without books
    let authors = database
        .select::<Author>()
        .and_then(|v| v.left_join::<Book>())
        .map(|v| v.on(JoinOn::eq("id", "author")))
        .and_then(|v| {
            v.many("title", |author: &mut Author, titles: Vec<Option<String>>| {
                author.titles = titles.into_iter().flatten().collect()
            })
        })
        .and_then(|v| v.finish())
        .map(|v| v.filter(Where::eq("name", "Linus Torvalds")))
        .and_then(Query::complete)
        .expect("Failed to select the authors without books");
    assert_eq!(authors.len(), 1);
    assert_eq!(authors[0].id, torvalds);
    assert!(authors[0].titles.is_empty());

    // One to one
    let books = database
        .select::<Book>()
        .and_then(|v| v.inner_join::<Author>())
        .map(|v| v.on(JoinOn::eq("author", "id")))
        .and_then(|v| v.one("name", |book: &mut Book, name: String| book.author_name = name))
        .and_then(|v| v.finish())
        .map(|v| {
            v.filter(Where::lt("year", 2005))
                .order(Order::asc("books.year"))
        })
        .and_then(Query::complete)
        .expect("Failed to select the books with their author");
    let found = books
        .iter()
        .map(|v| (v.title.as_str(), v.author_name.as_str()))
        .collect::<Vec<_>>();
    assert_eq!(
        found,
        [
            ("The Hobbit", "J.R.R. Tolkien"),
            ("Harry Potter and the Philosopher's Stone", "J.K. Rowling"),
            ("Metro 2033", "Dmitry Glukhovsky"),
        ]
    );

    // Authors with many books violate a one to one projection
    let result = database
        .select::<Author>()
        .and_then(|v| v.inner_join::<Book>())
        .map(|v| v.on(JoinOn::eq("id", "author")))
        .and_then(|v| v.one("title", |author: &mut Author, title: String| author.titles = vec![title]))
        .and_then(|v| v.finish())
        .and_then(Query::complete);
    assert!(matches!(
        result.as_ref().err().and_then(error_kind),
        Some(KeelError::State(..))
    ));

    // Subquery
    let russian_author = database
        .select::<Author>()
        .and_then(|v| v.columns(["id"]))
        .map(|v| v.filter(Where::eq("country", "Russia")))
        .and_then(|v| v.into_subquery())
        .expect("Failed to build the subquery");
    let count = database
        .select::<Book>()
        .map(|v| v.filter(Where::eq("author", russian_author)))
        .and_then(|v| v.count())
        .and_then(Query::complete)
        .expect("Failed to count the books of the russian author");
    assert_eq!(count, Some(3));
}
