use crate::{Error, KeelError};
use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};

/// Comparison operator of a `Where` or `JoinOn` leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Less,
    LessEqual,
    Equal,
    GreaterEqual,
    Greater,
    NotEqual,
}

impl CompareOp {
    pub const fn as_str(&self) -> &'static str {
        match self {
            CompareOp::Less => "<",
            CompareOp::LessEqual => "<=",
            CompareOp::Equal => "=",
            CompareOp::GreaterEqual => ">=",
            CompareOp::Greater => ">",
            CompareOp::NotEqual => "<>",
        }
    }
}

impl Display for CompareOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompareOp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            "<" => CompareOp::Less,
            "<=" => CompareOp::LessEqual,
            "=" => CompareOp::Equal,
            ">=" => CompareOp::GreaterEqual,
            ">" => CompareOp::Greater,
            "<>" | "!=" => CompareOp::NotEqual,
            _ => return Err(KeelError::argument(format!("Unknown operator `{s}`"))),
        })
    }
}
