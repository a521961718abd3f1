use crate::{KeelError, Result, Value};
use std::collections::HashMap;

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    #[default]
    Inner,
    Left,
    Right,
}

/// How many joined rows are expected for one row of the driving table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// Exactly one.
    One,
    /// One or more.
    Many,
}

/// Joined values of one group once the cardinality has been checked.
#[derive(Debug, Clone, PartialEq)]
pub enum Collapsed {
    One(Value),
    Many(Vec<Value>),
}

/// Checks the values accumulated for `column` against `cardinality`.
pub fn collapse(cardinality: Cardinality, column: &str, mut values: Vec<Value>) -> Result<Collapsed> {
    match cardinality {
        Cardinality::One if values.len() == 1 => Ok(Collapsed::One(values.remove(0))),
        Cardinality::One => Err(KeelError::state(format!(
            "Expected exactly one value of `{column}` per row, got {}",
            values.len()
        ))),
        Cardinality::Many if values.is_empty() => Err(KeelError::state(format!(
            "Expected at least one value of `{column}` per row, got none"
        ))),
        Cardinality::Many => Ok(Collapsed::Many(values)),
    }
}

#[derive(Debug, PartialEq, Eq, Hash)]
enum GroupKey {
    Key(Value),
    Synthetic(u64),
}

/// Driving entity with the joined values accumulated for each projection.
#[derive(Debug)]
pub struct Group<E> {
    pub entity: E,
    pub joined: Vec<Vec<Value>>,
}

/// Folds a row stream into distinct driving entities, in first seen order.
///
/// Rows sharing the key of the driving table belong to the same group. Rows
/// without a key always start a new group. Once `limit` groups are collected the
/// first row of a further group stops the consumption, so a group is never cut.
///
/// # Examples
/// ```rust
/// use keel_core::{Materializer, Value};
/// let mut materializer = Materializer::new(Some(1), 1);
/// for (key, child) in [(1, "a"), (1, "b"), (2, "c")] {
///     let more = materializer
///         .push(Some(Value::Int64(Some(key))), || Ok(key), vec![child.into()])
///         .unwrap();
///     if !more {
///         break;
///     }
/// }
/// let groups = materializer.finish();
/// assert_eq!(groups.len(), 1);
/// assert_eq!(groups[0].joined[0].len(), 2);
/// ```
#[derive(Debug)]
pub struct Materializer<E> {
    index: HashMap<GroupKey, usize>,
    groups: Vec<Group<E>>,
    limit: Option<usize>,
    projections: usize,
    synthetic: u64,
}

impl<E> Materializer<E> {
    pub fn new(limit: Option<usize>, projections: usize) -> Self {
        Self {
            index: HashMap::new(),
            groups: Vec::new(),
            limit,
            projections,
            synthetic: 0,
        }
    }

    /// Adds a row. `decode` builds the driving entity and runs only for a new group.
    ///
    /// Returns `false` when the limit is reached and the row was discarded.
    pub fn push(
        &mut self,
        key: Option<Value>,
        decode: impl FnOnce() -> Result<E>,
        joined: Vec<Value>,
    ) -> Result<bool> {
        let key = match key {
            Some(key) if !key.is_null() => GroupKey::Key(key),
            _ => {
                self.synthetic += 1;
                GroupKey::Synthetic(self.synthetic)
            }
        };
        let position = match self.index.get(&key) {
            Some(position) => *position,
            None => {
                if self.limit.is_some_and(|limit| self.groups.len() >= limit) {
                    return Ok(false);
                }
                self.groups.push(Group {
                    entity: decode()?,
                    joined: vec![Vec::new(); self.projections],
                });
                self.index.insert(key, self.groups.len() - 1);
                self.groups.len() - 1
            }
        };
        let group = &mut self.groups[position];
        for (values, value) in group.joined.iter_mut().zip(joined) {
            values.push(value);
        }
        Ok(true)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn finish(self) -> Vec<Group<E>> {
        self.groups
    }
}

#[cfg(test)]
mod tests {
    use super::{Cardinality, Collapsed, collapse};
    use crate::{KeelError, Value, error_kind};

    #[test]
    fn one() {
        let value = Value::Int32(Some(7));
        assert_eq!(
            collapse(Cardinality::One, "c", vec![value.clone()]).unwrap(),
            Collapsed::One(value.clone())
        );
        let error = collapse(Cardinality::One, "c", vec![]).unwrap_err();
        assert!(matches!(error_kind(&error), Some(KeelError::State(..))));
        let error = collapse(Cardinality::One, "c", vec![value.clone(), value]).unwrap_err();
        assert!(matches!(error_kind(&error), Some(KeelError::State(..))));
    }

    #[test]
    fn many() {
        let values: Vec<Value> = vec![3.into(), 1.into(), 2.into()];
        assert_eq!(
            collapse(Cardinality::Many, "c", values.clone()).unwrap(),
            Collapsed::Many(values)
        );
        let error = collapse(Cardinality::Many, "c", vec![]).unwrap_err();
        assert!(matches!(error_kind(&error), Some(KeelError::State(..))));
    }
}
