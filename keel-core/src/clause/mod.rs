mod compare_op;
mod join_on;
mod order;
mod scope;
mod where_clause;

pub use compare_op::*;
pub use join_on::*;
pub use order::*;
pub use scope::*;
pub use where_clause::*;
