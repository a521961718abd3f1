use crate::Column;

/// Type persisted as the rows of one table.
///
/// # Examples
/// ```rust
/// use keel_core::{Column, Entity, Schema};
/// #[derive(Default)]
/// struct Post {
///     id: i64,
///     title: String,
/// }
/// impl Entity for Post {
///     fn schema() -> Schema<Self> {
///         Schema::new("posts")
///             .column(Column::new("id", |p: &Post| &p.id, |p| &mut p.id).primary_key().auto_increment())
///             .column(Column::new("title", |p: &Post| &p.title, |p| &mut p.title).length(200))
///     }
/// }
/// assert_eq!(Post::schema().name(), "posts");
/// ```
pub trait Entity: Default + Send + 'static {
    fn schema() -> Schema<Self>;
}

/// Index spanning one or more columns, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeIndex {
    pub columns: Vec<String>,
    pub unique: bool,
}

/// Declarative description of the table backing an entity.
#[derive(Debug)]
pub struct Schema<E> {
    pub(crate) name: String,
    pub(crate) allow_unsafe_operations: bool,
    pub(crate) cache_size: usize,
    pub(crate) columns: Vec<Column<E>>,
    pub(crate) indexes: Vec<CompositeIndex>,
}

impl<E> Schema<E> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            allow_unsafe_operations: false,
            cache_size: 0,
            columns: Vec::new(),
            indexes: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Accept UPDATE and DELETE without a WHERE clause.
    pub fn allow_unsafe_operations(mut self) -> Self {
        self.allow_unsafe_operations = true;
        self
    }

    /// Expected number of cached rows, a hint for callers keeping entities around.
    pub fn cache_size(mut self, cache_size: usize) -> Self {
        self.cache_size = cache_size;
        self
    }

    pub fn column(mut self, column: Column<E>) -> Self {
        self.columns.push(column);
        self
    }

    pub fn index<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.indexes.push(CompositeIndex {
            columns: columns.into_iter().map(Into::into).collect(),
            unique: false,
        });
        self
    }

    pub fn unique_index<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.indexes.push(CompositeIndex {
            columns: columns.into_iter().map(Into::into).collect(),
            unique: true,
        });
        self
    }
}
