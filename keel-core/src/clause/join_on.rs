use crate::CompareOp;

/// Join condition comparing a column already in scope with a column of the joined table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOn {
    pub column: String,
    pub op: CompareOp,
    pub joined_column: String,
}

impl JoinOn {
    pub fn compare(column: impl Into<String>, op: CompareOp, joined_column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            op,
            joined_column: joined_column.into(),
        }
    }

    pub fn eq(column: impl Into<String>, joined_column: impl Into<String>) -> Self {
        Self::compare(column, CompareOp::Equal, joined_column)
    }
}
