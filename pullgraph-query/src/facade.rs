//! Query facade: run a plan and hand back its rows.
//!
//! [`execute`] opens the plan and returns a [`QueryResult`], the root
//! handle that owns the operator tree. The handle releases the tree when
//! the rows run out, on the first error, on [`QueryResult::close`], or when
//! it is dropped, whichever comes first.
//!
//! # Example
//!
//! ```rust,ignore
//! use pullgraph_query::{Expression, PlanBuilder, QueryExt};
//!
//! let plan = PlanBuilder::label_scan("n", "Person")
//!     .limit(Expression::lit(10))
//!     .produce_results(&["n"])
//!     .build();
//! let rows = graph.query_plan(&plan, &Default::default())?;
//! ```

use pullgraph_api::GraphSnapshot;
use tracing::warn;

use crate::Params;
use crate::error::Result;
use crate::executor::{ExecutionContext, Plan, PlanIterator, Row, open_plan};

/// Streaming result of one execution.
pub struct QueryResult<'a, S: GraphSnapshot + 'a> {
    columns: Vec<String>,
    root: Option<PlanIterator<'a, S>>,
}

impl<'a, S: GraphSnapshot + 'a> QueryResult<'a, S> {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Release the operator tree now. Later calls are no-ops.
    pub fn close(&mut self) -> Result<()> {
        match self.root.take() {
            Some(mut root) => root.close(),
            None => Ok(()),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.root.is_none()
    }
}

impl<'a, S: GraphSnapshot + 'a> Iterator for QueryResult<'a, S> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        let root = self.root.as_mut()?;
        match root.next() {
            Some(Ok(row)) => Some(Ok(row)),
            Some(Err(e)) => {
                if let Err(close_err) = self.close() {
                    warn!(error = %close_err, "close failed after query error");
                }
                Some(Err(e))
            }
            None => self.close().err().map(Err),
        }
    }
}

impl<'a, S: GraphSnapshot + 'a> Drop for QueryResult<'a, S> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(error = %e, "close failed while dropping an unfinished query result");
        }
    }
}

/// Open `plan` under `ctx`.
///
/// # Errors
///
/// Fails if a leaf cannot be opened (missing index, unbound argument, a
/// collaborator failure); anything opened before the failure is released.
pub fn execute<'a, S: GraphSnapshot + 'a>(
    ctx: ExecutionContext<'a, S>,
    plan: &'a Plan,
) -> Result<QueryResult<'a, S>> {
    let root = open_plan(ctx, plan, None)?;
    Ok(QueryResult {
        columns: plan.output_columns(),
        root: Some(root),
    })
}

/// Run `plan` to completion and collect its rows.
pub fn execute_collect<'a, S: GraphSnapshot + 'a>(
    ctx: ExecutionContext<'a, S>,
    plan: &'a Plan,
) -> Result<Vec<Row>> {
    execute(ctx, plan)?.collect()
}

/// Plan execution as a method on any graph.
pub trait QueryExt: GraphSnapshot + Sized {
    /// Run `plan` with default configuration and collect its rows.
    fn query_plan(&self, plan: &Plan, params: &Params) -> Result<Vec<Row>> {
        execute_collect(ExecutionContext::new(self, params), plan)
    }
}

impl<T: GraphSnapshot> QueryExt for T {}
