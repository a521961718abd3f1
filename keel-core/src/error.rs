use crate::Error;
use std::{
    error::Error as StdError,
    fmt::{self, Display},
    panic::Location,
    sync::Arc,
};
use thiserror::Error;

/// Failure kinds raised by the library itself.
///
/// They travel inside [`anyhow::Error`], use [`error_kind`] to recover them
/// from any depth of the error chain.
#[derive(Debug, Error)]
pub enum KeelError {
    /// Invalid descriptor or clause arguments.
    #[error("{0}")]
    Argument(String),
    /// Operation not allowed in the current state of a builder, task or result.
    #[error("{0}")]
    State(String),
    /// UPDATE or DELETE without a WHERE clause on a table that does not allow it.
    #[error("{0}")]
    UnsafeQuery(String),
    #[error("{column} Cannot convert `{value}`, no converter supports it")]
    CannotConvert { column: String, value: String },
    #[error("{0}")]
    Connection(String),
}

impl KeelError {
    pub fn argument(message: impl Into<String>) -> Error {
        KeelError::Argument(message.into()).into()
    }

    pub fn state(message: impl Into<String>) -> Error {
        KeelError::State(message.into()).into()
    }

    pub fn connection(message: impl Into<String>) -> Error {
        KeelError::Connection(message.into()).into()
    }
}

/// Returns the first [`KeelError`] found in the chain of `error`.
pub fn error_kind(error: &Error) -> Option<&KeelError> {
    error.chain().find_map(|e| e.downcast_ref::<KeelError>())
}

/// Failure of a task, carries the place where the task was created.
#[derive(Debug)]
pub struct TaskError {
    pub location: &'static Location<'static>,
    pub sql: String,
    pub cause: Arc<Error>,
}

impl Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Task created at {} failed", self.location)?;
        if !self.sql.is_empty() {
            write!(f, " while running `{}`", self.sql)?;
        }
        Ok(())
    }
}

impl StdError for TaskError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&**self.cause)
    }
}
