//! Pull-based query execution over a property graph.
//!
//! Plans are trees of operators ([`Plan`]). Executing one opens a matching
//! tree of iterators that pull rows from their children on demand and own
//! every storage cursor they open until they are closed.

pub mod ast;
pub mod builder;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod facade;
pub mod input;

pub use ast::{Direction, Expression, Literal};
pub use builder::PlanBuilder;
pub use config::ExecConfig;
pub use error::{Error, Result};
pub use executor::{
    Entity, ExecutionContext, IndexPredicate, Plan, PlanIterator, PropertyCache, RangeBound, Row,
    SortItem, Value, open_plan,
};
pub use facade::{QueryExt, QueryResult, execute, execute_collect};
pub use input::{BatchCursor, RowBatch, RowSource, VecRowSource};

/// Query parameters by name, without the leading `$`.
pub type Params = std::collections::HashMap<String, Value>;
