use crate::{
    ColumnDef, CompositeIndex, Converters, Dialect, Entity, Getter, KeelError, Result, Setter,
    SqlType, Value, util::identifier,
};
use std::{collections::HashSet, fmt::Debug, sync::Arc};

/// Immutable description of a registered table.
///
/// Two definitions are the same table when they belong to the same database and
/// carry the same name.
#[derive(Debug)]
pub struct TableDef {
    pub database: u64,
    pub name: String,
    pub columns: Vec<ColumnDef>,
    pub key: Option<usize>,
    pub allow_unsafe_operations: bool,
    pub cache_size: usize,
    pub dialect: Dialect,
    pub indexes: Vec<CompositeIndex>,
}

impl PartialEq for TableDef {
    fn eq(&self, other: &Self) -> bool {
        self.database == other.database && self.name == other.name
    }
}

impl Eq for TableDef {}

impl TableDef {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.column_index(name).map(|i| &self.columns[i])
    }

    /// Same as [`TableDef::column_index`] failing with an argument error.
    pub fn require_column_index(&self, name: &str) -> Result<usize> {
        self.column_index(name).ok_or_else(|| {
            KeelError::argument(format!("Unknown column `{}` in table `{}`", name, self.name))
        })
    }

    pub fn require_column(&self, name: &str) -> Result<&ColumnDef> {
        self.require_column_index(name).map(|i| &self.columns[i])
    }

    pub fn key_column(&self) -> Option<&ColumnDef> {
        self.key.map(|i| &self.columns[i])
    }
}

/// Table definition together with the accessors of its entity.
pub struct Table<E> {
    pub(crate) def: Arc<TableDef>,
    pub(crate) getters: Arc<[Getter<E>]>,
    pub(crate) setters: Arc<[Setter<E>]>,
}

impl<E> Clone for Table<E> {
    fn clone(&self) -> Self {
        Self {
            def: self.def.clone(),
            getters: self.getters.clone(),
            setters: self.setters.clone(),
        }
    }
}

impl<E> Debug for Table<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Table").field(&self.def.name).finish()
    }
}

impl<E: Entity> Table<E> {
    /// Validates the schema of `E` and resolves storage kinds for `dialect`.
    ///
    /// `lookup` resolves the tables referenced by foreign keys.
    pub fn build(
        database: u64,
        dialect: Dialect,
        prefix: &str,
        lookup: impl Fn(&str) -> Option<Arc<TableDef>>,
    ) -> Result<Self> {
        let schema = E::schema();
        let name = identifier(&format!("{}{}", prefix, schema.name), "table")?;
        if schema.columns.is_empty() {
            return Err(KeelError::argument(format!(
                "Table `{name}` does not declare any column"
            )));
        }
        let mut columns = Vec::with_capacity(schema.columns.len());
        let mut getters = Vec::with_capacity(schema.columns.len());
        let mut setters = Vec::with_capacity(schema.columns.len());
        let mut names = HashSet::new();
        let mut key = None;
        for column in schema.columns {
            let column_name = identifier(&column.name, "column")?;
            let qualified = format!("{name}.{column_name}");
            if !names.insert(column_name.clone()) {
                return Err(KeelError::argument(format!(
                    "Column `{qualified}` is declared twice"
                )));
            }
            let storage = column.storage_value();
            let sql_type = SqlType::resolve(dialect, &column.value, &storage, column.length)
                .map_err(|e| e.context(format!("While resolving column `{qualified}`")))?;
            if column.length != 0 && !sql_type.has_length() {
                return Err(KeelError::argument(format!(
                    "Column `{qualified}` of type {} cannot declare a length",
                    sql_type.name()
                )));
            }
            let length = if sql_type.has_length() {
                match (column.length, sql_type.default_length()) {
                    (0, Some(v)) => v,
                    (0, None) => {
                        return Err(KeelError::argument(format!(
                            "Column `{qualified}` of type {} requires a length",
                            sql_type.name()
                        )));
                    }
                    (v, ..) => v,
                }
            } else {
                0
            };
            if column.primary_key {
                if key.is_some() {
                    return Err(KeelError::argument(format!(
                        "Table `{name}` declares more than one primary key"
                    )));
                }
                if column.references.is_some() {
                    return Err(KeelError::argument(format!(
                        "Column `{qualified}` cannot be both primary and foreign key"
                    )));
                }
                key = Some(columns.len());
            }
            if column.auto_increment
                && !(column.primary_key && matches!(sql_type, SqlType::Integer | SqlType::BigInt))
            {
                return Err(KeelError::argument(format!(
                    "Column `{qualified}` is auto increment, it must be an integer primary key"
                )));
            }
            let references = match column.references {
                Some(mut reference) => {
                    reference.table = identifier(&format!("{}{}", prefix, reference.table), "table")?;
                    reference.column = identifier(&reference.column, "column")?;
                    let target = lookup(&reference.table).ok_or_else(|| {
                        KeelError::argument(format!(
                            "Column `{qualified}` references `{}` which is not registered",
                            reference.table
                        ))
                    })?;
                    let target = target.require_column(&reference.column)?;
                    if !target.primary_key {
                        return Err(KeelError::argument(format!(
                            "Column `{qualified}` references `{}` which is not a primary key",
                            target.qualified_name()
                        )));
                    }
                    if target.sql_type != sql_type {
                        return Err(KeelError::argument(format!(
                            "Column `{qualified}` is {} but references `{}` which is {}",
                            sql_type.name(),
                            target.qualified_name(),
                            target.sql_type.name()
                        )));
                    }
                    Some(reference)
                }
                None => None,
            };
            columns.push(ColumnDef {
                table: name.clone(),
                name: column_name,
                value: column.value,
                storage,
                sql_type,
                length,
                unique: column.unique,
                not_null: column.not_null,
                indexed: column.indexed,
                primary_key: column.primary_key,
                auto_increment: column.auto_increment,
                references,
            });
            getters.push(column.getter);
            setters.push(column.setter);
        }
        let mut indexes = Vec::with_capacity(schema.indexes.len());
        for index in schema.indexes {
            if index.columns.is_empty() {
                return Err(KeelError::argument(format!(
                    "Table `{name}` declares an index without columns"
                )));
            }
            let columns = index
                .columns
                .iter()
                .map(|c| {
                    let c = c.to_lowercase();
                    if names.contains(&c) {
                        Ok(c)
                    } else {
                        Err(KeelError::argument(format!(
                            "Index on `{name}` uses unknown column `{c}`"
                        )))
                    }
                })
                .collect::<Result<_>>()?;
            indexes.push(CompositeIndex {
                columns,
                unique: index.unique,
            });
        }
        Ok(Self {
            def: Arc::new(TableDef {
                database,
                name,
                columns,
                key,
                allow_unsafe_operations: schema.allow_unsafe_operations,
                cache_size: schema.cache_size,
                dialect,
                indexes,
            }),
            getters: getters.into(),
            setters: setters.into(),
        })
    }
}

impl<E> Table<E> {
    pub fn def(&self) -> &Arc<TableDef> {
        &self.def
    }

    pub fn name(&self) -> &str {
        &self.def.name
    }

    /// Host value of the column at `index`.
    pub fn get(&self, entity: &E, index: usize) -> Value {
        (self.getters[index])(entity)
    }

    pub fn set(&self, entity: &mut E, index: usize, value: Value) -> Result<()> {
        (self.setters[index])(entity, value).map_err(|e| {
            e.context(format!(
                "While setting column `{}`",
                self.def.columns[index].qualified_name()
            ))
        })
    }

    /// Host values of every column, in declaration order.
    pub fn read(&self, entity: &E) -> Vec<Value> {
        self.getters.iter().map(|g| g(entity)).collect()
    }

    /// Writes stored values of `indices` into `entity`.
    pub fn write(
        &self,
        converters: &Converters,
        entity: &mut E,
        indices: &[usize],
        stored: impl IntoIterator<Item = Value>,
    ) -> Result<()> {
        for (&index, value) in indices.iter().zip(stored) {
            let value = converters.from_storage(&self.def.columns[index], value)?;
            self.set(entity, index, value)?;
        }
        Ok(())
    }
}

impl<E: Default> Table<E> {
    /// Builds an entity from stored values of `indices`, other fields keep their default.
    pub fn decode(
        &self,
        converters: &Converters,
        indices: &[usize],
        stored: impl IntoIterator<Item = Value>,
    ) -> Result<E> {
        let mut entity = E::default();
        self.write(converters, &mut entity, indices, stored)?;
        Ok(entity)
    }
}
