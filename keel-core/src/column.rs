use crate::{AsValue, Result, SqlType, Value};
use std::fmt::{self, Debug};

/// Reads the host value of a column from an entity.
pub type Getter<E> = Box<dyn Fn(&E) -> Value + Send + Sync>;
/// Writes a host value of a column into an entity.
pub type Setter<E> = Box<dyn Fn(&mut E, Value) -> Result<()> + Send + Sync>;

/// Foreign key target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub table: String,
    pub column: String,
    /// Emit the `FOREIGN KEY` constraint in `CREATE TABLE`.
    pub constraint: bool,
}

/// Resolved, immutable description of a table column.
#[derive(Debug, Clone)]
pub struct ColumnDef {
    pub table: String,
    pub name: String,
    /// Prototype of the host value.
    pub value: Value,
    /// Prototype of the stored value.
    pub storage: Value,
    pub sql_type: SqlType,
    /// Effective length for length-bearing types, `0` otherwise.
    pub length: u32,
    pub unique: bool,
    pub not_null: bool,
    pub indexed: bool,
    pub primary_key: bool,
    pub auto_increment: bool,
    pub references: Option<ForeignKey>,
}

impl ColumnDef {
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.table, self.name)
    }

    /// Unique or primary key.
    pub fn is_unique_key(&self) -> bool {
        self.unique || self.primary_key
    }
}

/// Column declaration of an entity, part of a [`Schema`](crate::Schema).
///
/// # Examples
/// ```rust
/// use keel_core::Column;
/// #[derive(Default)]
/// struct User {
///     id: i64,
///     name: String,
/// }
/// let id = Column::new("id", |u: &User| &u.id, |u| &mut u.id)
///     .primary_key()
///     .auto_increment();
/// let name = Column::new("name", |u: &User| &u.name, |u| &mut u.name).length(100);
/// assert_eq!(id.name(), "id");
/// assert_eq!(name.declared_length(), 100);
/// ```
pub struct Column<E> {
    pub(crate) name: String,
    pub(crate) value: Value,
    pub(crate) storage: Option<Value>,
    pub(crate) length: u32,
    pub(crate) unique: bool,
    pub(crate) not_null: bool,
    pub(crate) indexed: bool,
    pub(crate) primary_key: bool,
    pub(crate) auto_increment: bool,
    pub(crate) references: Option<ForeignKey>,
    pub(crate) getter: Getter<E>,
    pub(crate) setter: Setter<E>,
}

impl<E: 'static> Column<E> {
    /// Binds a column to the field reached by `get` and `get_mut`.
    pub fn new<T>(name: impl Into<String>, get: fn(&E) -> &T, get_mut: fn(&mut E) -> &mut T) -> Self
    where
        T: AsValue + Clone + 'static,
    {
        Self::with_accessors(
            name,
            T::as_empty_value(),
            Box::new(move |entity| get(entity).clone().as_value()),
            Box::new(move |entity, value| {
                *get_mut(entity) = T::try_from_value(value)?;
                Ok(())
            }),
        )
    }

    /// Binds a column through arbitrary accessors, `value` is the host value prototype.
    pub fn with_accessors(
        name: impl Into<String>,
        value: Value,
        getter: Getter<E>,
        setter: Setter<E>,
    ) -> Self {
        Self {
            name: name.into(),
            value,
            storage: None,
            length: 0,
            unique: false,
            not_null: false,
            indexed: false,
            primary_key: false,
            auto_increment: false,
            references: None,
            getter,
            setter,
        }
    }
}

impl<E> Column<E> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declared_length(&self) -> u32 {
        self.length
    }

    /// Persists the column as `S` instead of the default storage of the host type.
    pub fn storage<S: AsValue>(mut self) -> Self {
        self.storage = Some(S::as_empty_value());
        self
    }

    pub fn length(mut self, length: u32) -> Self {
        self.length = length;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    pub fn index(mut self) -> Self {
        self.indexed = true;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    pub fn references(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.references = Some(ForeignKey {
            table: table.into(),
            column: column.into(),
            constraint: true,
        });
        self
    }

    /// Same as [`Column::references`] but without emitting the constraint.
    pub fn references_without_constraint(
        mut self,
        table: impl Into<String>,
        column: impl Into<String>,
    ) -> Self {
        self.references = Some(ForeignKey {
            table: table.into(),
            column: column.into(),
            constraint: false,
        });
        self
    }

    /// Storage prototype, enumerations and identifiers default to text, arrays to blobs.
    pub(crate) fn storage_value(&self) -> Value {
        match (&self.storage, &self.value) {
            (Some(storage), ..) => storage.clone(),
            (None, Value::Enum(..) | Value::Uuid(..)) => Value::Varchar(None),
            (None, Value::Array(..)) => Value::Blob(None),
            (None, value) => value.as_null(),
        }
    }
}

impl<E> Debug for Column<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Column")
            .field("name", &self.name)
            .field("value", &self.value)
            .field("storage", &self.storage)
            .field("length", &self.length)
            .field("primary_key", &self.primary_key)
            .finish_non_exhaustive()
    }
}
