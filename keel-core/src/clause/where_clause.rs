use crate::{AsValue, CompareOp, KeelError, Result, Value};

/// SQL text of a nested SELECT, used as operand of a `Where` leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subquery(pub String);

/// Operand of a `Where` leaf.
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    Value(Value),
    Select(Subquery),
}

impl<T: AsValue> From<T> for Argument {
    fn from(value: T) -> Self {
        Argument::Value(value.as_value())
    }
}

impl From<&str> for Argument {
    fn from(value: &str) -> Self {
        Argument::Value(value.into())
    }
}

impl From<Value> for Argument {
    fn from(value: Value) -> Self {
        Argument::Value(value)
    }
}

impl From<Subquery> for Argument {
    fn from(value: Subquery) -> Self {
        Argument::Select(value)
    }
}

/// Filter tree rendered as a WHERE clause.
///
/// Column names are resolved when the query is built, they may be qualified as
/// `table.column` to reach the tables of a join.
///
/// # Examples
/// ```rust
/// use keel_core::Where;
/// let filter = Where::and([
///     Where::eq("name", "Alice"),
///     Where::is_in("age", [30, 31, 32]).unwrap(),
/// ])
/// .unwrap();
/// assert!(matches!(filter, Where::And(ref v) if v.len() == 2));
/// assert!(Where::is_in("age", [30]).is_err());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Where {
    Compare {
        column: String,
        op: CompareOp,
        value: Argument,
    },
    Like {
        column: String,
        pattern: Argument,
    },
    In {
        column: String,
        values: Vec<Argument>,
    },
    IsNull(String),
    IsNotNull(String),
    And(Vec<Where>),
    Or(Vec<Where>),
    Not(Box<Where>),
}

impl Where {
    pub fn compare(column: impl Into<String>, op: CompareOp, value: impl Into<Argument>) -> Self {
        Where::Compare {
            column: column.into(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(column: impl Into<String>, value: impl Into<Argument>) -> Self {
        Self::compare(column, CompareOp::Equal, value)
    }

    pub fn ne(column: impl Into<String>, value: impl Into<Argument>) -> Self {
        Self::compare(column, CompareOp::NotEqual, value)
    }

    pub fn lt(column: impl Into<String>, value: impl Into<Argument>) -> Self {
        Self::compare(column, CompareOp::Less, value)
    }

    pub fn le(column: impl Into<String>, value: impl Into<Argument>) -> Self {
        Self::compare(column, CompareOp::LessEqual, value)
    }

    pub fn gt(column: impl Into<String>, value: impl Into<Argument>) -> Self {
        Self::compare(column, CompareOp::Greater, value)
    }

    pub fn ge(column: impl Into<String>, value: impl Into<Argument>) -> Self {
        Self::compare(column, CompareOp::GreaterEqual, value)
    }

    pub fn like(column: impl Into<String>, pattern: impl Into<Argument>) -> Self {
        Where::Like {
            column: column.into(),
            pattern: pattern.into(),
        }
    }

    /// Membership test, requires at least two values.
    pub fn is_in<V: Into<Argument>>(
        column: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Result<Self> {
        let column = column.into();
        let values: Vec<Argument> = values.into_iter().map(Into::into).collect();
        if values.len() < 2 {
            return Err(KeelError::argument(format!(
                "IN on `{column}` requires two or more values, got {}",
                values.len()
            )));
        }
        Ok(Where::In { column, values })
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Where::IsNull(column.into())
    }

    pub fn is_not_null(column: impl Into<String>) -> Self {
        Where::IsNotNull(column.into())
    }

    /// Conjunction, requires at least two clauses.
    pub fn and(clauses: impl IntoIterator<Item = Where>) -> Result<Self> {
        Ok(Where::And(Self::combined(clauses, "AND")?))
    }

    /// Disjunction, requires at least two clauses.
    pub fn or(clauses: impl IntoIterator<Item = Where>) -> Result<Self> {
        Ok(Where::Or(Self::combined(clauses, "OR")?))
    }

    pub fn not(clause: Where) -> Self {
        Where::Not(clause.into())
    }

    fn combined(clauses: impl IntoIterator<Item = Where>, what: &str) -> Result<Vec<Where>> {
        let clauses: Vec<_> = clauses.into_iter().collect();
        if clauses.len() < 2 {
            return Err(KeelError::argument(format!(
                "{what} requires two or more clauses, got {}",
                clauses.len()
            )));
        }
        Ok(clauses)
    }
}
