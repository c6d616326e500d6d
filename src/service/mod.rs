//! Per-request query compilation: conditions and pagination.

pub mod condition;
pub mod pagination;

pub use condition::{ConditionBuilder, Operator, ResolvedCondition};
pub use pagination::{Page, PaginationResolver};
