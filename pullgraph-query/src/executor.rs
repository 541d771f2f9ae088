//! Pull-based operator runtime.
//!
//! A [`Plan`] is an immutable tree of operator descriptions. [`open_plan`]
//! turns it into a [`PlanIterator`] tree: every operator owns its runtime
//! state and the cursors it opened, pulls rows from its children on demand,
//! and releases everything it owns in `close`.

use pullgraph_api::{GraphSnapshot, InternalNodeId, RelTypeId};

use crate::Params;
use crate::ast::Expression;
use crate::config::ExecConfig;
use crate::error::{Error, Result};
use crate::evaluator::evaluate_constant;
use crate::input::RowSource;

mod cleanup;
mod core_types;
mod expand_plan;
mod hash_join;
mod index_seek_plan;
mod join_apply;
mod plan_iterators;
mod plan_render;
mod plan_tail;
mod plan_types;
mod projection_sort;

use cleanup::abandon;
use expand_plan::ExpandIter;
use hash_join::HashJoinIter;
use join_apply::{NestedLoopIter, RightBinding};
use plan_iterators::{ArgumentIter, FilterIter, InputIter, NodeScanIter, ProduceResultsIter};
use plan_tail::{LimitIter, SkipIter};
use projection_sort::{ProjectionIter, SortIter};

pub use core_types::{Entity, PropertyCache, Row, Value};
pub use plan_types::{IndexPredicate, Plan, PlanIterator, RangeBound, SortItem};

/// Everything an operator may consult besides its own plan node.
pub struct ExecutionContext<'a, S> {
    pub snapshot: &'a S,
    pub params: &'a Params,
    pub config: ExecConfig,
    pub input: Option<&'a dyn RowSource>,
}

impl<S> Clone for ExecutionContext<'_, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S> Copy for ExecutionContext<'_, S> {}

impl<'a, S> ExecutionContext<'a, S> {
    pub fn new(snapshot: &'a S, params: &'a Params) -> Self {
        Self {
            snapshot,
            params,
            config: ExecConfig::default(),
            input: None,
        }
    }

    pub fn with_config(mut self, config: ExecConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_input(mut self, source: &'a dyn RowSource) -> Self {
        self.input = Some(source);
        self
    }
}

/// Open `plan`: allocate leaf cursors and bind `argument` to Argument leaves.
///
/// On failure every child opened so far has already been closed.
pub fn open_plan<'a, S: GraphSnapshot + 'a>(
    ctx: ExecutionContext<'a, S>,
    plan: &'a Plan,
    argument: Option<&Row>,
) -> Result<PlanIterator<'a, S>> {
    let iter = match plan {
        Plan::Argument { columns } => PlanIterator::Argument(ArgumentIter::open(columns, argument)?),
        Plan::Input { columns } => PlanIterator::Input(InputIter::open(ctx, columns)?),
        Plan::AllNodeScan { alias } => {
            let cursor = ctx.snapshot.all_nodes()?;
            PlanIterator::NodeScan(NodeScanIter::new(Some(cursor), alias))
        }
        Plan::LabelScan { alias, label } => {
            let cursor = match ctx.snapshot.resolve_label_id(label) {
                Some(label_id) => Some(ctx.snapshot.nodes_with_label(label_id)?),
                None => None,
            };
            PlanIterator::NodeScan(NodeScanIter::new(cursor, alias))
        }
        Plan::IndexSeek {
            alias,
            label,
            property,
            predicates,
        } => PlanIterator::IndexSeek(index_seek_plan::open_index_seek(
            ctx, alias, label, property, predicates,
        )?),
        Plan::Expand {
            input,
            from,
            relationship,
            to,
            direction,
            types,
        } => {
            let resolved = resolve_rel_types(ctx.snapshot, types);
            let input = open_plan(ctx, input, argument)?;
            PlanIterator::Expand(ExpandIter::new(
                ctx.snapshot,
                Box::new(input),
                from,
                relationship,
                to,
                *direction,
                resolved,
            ))
        }
        Plan::CartesianProduct { left, right } => {
            let left = open_plan(ctx, left, argument)?;
            PlanIterator::CartesianProduct(NestedLoopIter::new(
                ctx,
                Box::new(left),
                right,
                RightBinding::Shared(argument.cloned()),
            ))
        }
        Plan::Apply { left, right } => {
            let left = open_plan(ctx, left, argument)?;
            PlanIterator::Apply(NestedLoopIter::new(
                ctx,
                Box::new(left),
                right,
                RightBinding::LeftRow,
            ))
        }
        Plan::HashJoin { keys, left, right } => {
            let build = open_plan(ctx, left, argument)?;
            let probe = match open_plan(ctx, right, argument) {
                Ok(probe) => probe,
                Err(e) => return Err(abandon(build, e)),
            };
            PlanIterator::HashJoin(HashJoinIter::new(keys, Box::new(build), Box::new(probe)))
        }
        Plan::Filter { input, predicate } => {
            let input = open_plan(ctx, input, argument)?;
            PlanIterator::Filter(FilterIter::new(ctx, Box::new(input), predicate))
        }
        Plan::Projection { input, items } => {
            let input = open_plan(ctx, input, argument)?;
            PlanIterator::Projection(ProjectionIter::new(ctx, Box::new(input), items))
        }
        Plan::Sort { input, items } => {
            let input = open_plan(ctx, input, argument)?;
            PlanIterator::Sort(SortIter::new(ctx, Box::new(input), items))
        }
        Plan::Skip { input, count } => {
            let count = evaluate_row_count(count, ctx.params)?;
            let input = open_plan(ctx, input, argument)?;
            PlanIterator::Skip(SkipIter::new(Box::new(input), count))
        }
        Plan::Limit { input, count } => {
            let count = evaluate_row_count(count, ctx.params)?;
            let input = open_plan(ctx, input, argument)?;
            PlanIterator::Limit(LimitIter::new(Box::new(input), count))
        }
        Plan::ProduceResults { input, columns } => {
            let input = open_plan(ctx, input, argument)?;
            PlanIterator::ProduceResults(ProduceResultsIter::new(Box::new(input), columns))
        }
    };
    Ok(iter)
}

/// `None` means no requested type exists, so nothing can match.
fn resolve_rel_types<S: GraphSnapshot>(snapshot: &S, types: &[String]) -> Option<Vec<RelTypeId>> {
    if types.is_empty() {
        return Some(Vec::new());
    }
    let resolved: Vec<RelTypeId> = types
        .iter()
        .filter_map(|name| snapshot.resolve_rel_type_id(name))
        .collect();
    if resolved.is_empty() {
        None
    } else {
        Some(resolved)
    }
}

fn evaluate_row_count(expr: &Expression, params: &Params) -> Result<usize> {
    match evaluate_constant(expr, params)? {
        Value::Int(v) if v >= 0 => usize::try_from(v)
            .map_err(|_| Error::InvalidPlan(format!("row count {v} out of range"))),
        Value::Int(v) => Err(Error::InvalidPlan(format!("negative row count {v}"))),
        other => Err(Error::TypeMismatch(format!(
            "row count must be an integer, got {other:?}"
        ))),
    }
}

fn node_id_of(row: &Row, column: &str) -> Result<Option<InternalNodeId>> {
    match row.get(column) {
        Some(Value::Node(id)) => Ok(Some(*id)),
        Some(Value::Null) => Ok(None),
        Some(other) => Err(Error::TypeMismatch(format!(
            "{column} is not a node: {other:?}"
        ))),
        None => Err(Error::UnknownVariable(column.to_string())),
    }
}
