use crate::{KeelError, Result};

/// Sorting of a SELECT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Order {
    Asc(String),
    Desc(String),
    /// Dialect specific random ordering.
    Rand,
    Combine(Vec<Order>),
}

impl Order {
    pub fn asc(column: impl Into<String>) -> Self {
        Order::Asc(column.into())
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Order::Desc(column.into())
    }

    pub fn rand() -> Self {
        Order::Rand
    }

    /// Orders by each element in turn, requires at least one.
    pub fn combine(orders: impl IntoIterator<Item = Order>) -> Result<Self> {
        let orders: Vec<_> = orders.into_iter().collect();
        if orders.is_empty() {
            return Err(KeelError::argument("Cannot combine an empty list of orders"));
        }
        Ok(Order::Combine(orders))
    }
}
