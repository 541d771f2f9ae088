use pullgraph_api::{GraphSnapshot, RelationshipDirection};
use serde::{Deserialize, Serialize};

use super::expand_plan::ExpandIter;
use super::hash_join::HashJoinIter;
use super::index_seek_plan::IndexSeekIter;
use super::join_apply::NestedLoopIter;
use super::plan_iterators::{ArgumentIter, FilterIter, InputIter, NodeScanIter, ProduceResultsIter};
use super::plan_tail::{LimitIter, SkipIter};
use super::projection_sort::{ProjectionIter, SortIter};
use super::Row;
use crate::ast::{Direction, Expression};
use crate::error::Result;

/// An operator tree. Immutable once built and reusable across executions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Plan {
    /// Re-emits the row bound by the enclosing Apply or CartesianProduct.
    /// Unbound with no columns, it yields a single empty row.
    Argument { columns: Vec<String> },
    /// Rows delivered by the execution's row source.
    Input { columns: Vec<String> },
    AllNodeScan { alias: String },
    LabelScan { alias: String, label: String },
    /// Nodes found through the index on `(label, property)`.
    IndexSeek {
        alias: String,
        label: String,
        property: String,
        predicates: Vec<IndexPredicate>,
    },
    /// `(from)-[relationship]-(to)` for every input row.
    Expand {
        input: Box<Plan>,
        from: String,
        relationship: String,
        to: String,
        direction: RelationshipDirection,
        /// Empty means any type.
        types: Vec<String>,
    },
    /// Every left row with every right row. The right side is re-run per
    /// left row and sees the same argument as the product itself.
    CartesianProduct { left: Box<Plan>, right: Box<Plan> },
    /// Right side re-run per left row with that row as its argument.
    Apply { left: Box<Plan>, right: Box<Plan> },
    /// Equi-join on `keys`; the left side is the build side.
    HashJoin {
        keys: Vec<String>,
        left: Box<Plan>,
        right: Box<Plan>,
    },
    Filter { input: Box<Plan>, predicate: Expression },
    Projection {
        input: Box<Plan>,
        items: Vec<(String, Expression)>,
    },
    Sort { input: Box<Plan>, items: Vec<SortItem> },
    Skip { input: Box<Plan>, count: Expression },
    Limit { input: Box<Plan>, count: Expression },
    ProduceResults {
        input: Box<Plan>,
        columns: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortItem {
    pub column: String,
    pub direction: Direction,
}

/// Index predicate as written in a plan. Values are literals or
/// parameters, resolved when the seek is opened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IndexPredicate {
    Exact(Expression),
    Range {
        lower: Option<RangeBound>,
        upper: Option<RangeBound>,
    },
    StringPrefix(Expression),
    Exists,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeBound {
    pub value: Expression,
    pub inclusive: bool,
}

impl Plan {
    /// Columns of the rows this operator produces, in order.
    pub fn output_columns(&self) -> Vec<String> {
        match self {
            Plan::Argument { columns } | Plan::Input { columns } => columns.clone(),
            Plan::AllNodeScan { alias }
            | Plan::LabelScan { alias, .. }
            | Plan::IndexSeek { alias, .. } => vec![alias.clone()],
            Plan::Expand {
                input,
                relationship,
                to,
                ..
            } => union_columns(
                input.output_columns(),
                [relationship.clone(), to.clone()],
            ),
            Plan::CartesianProduct { left, right }
            | Plan::Apply { left, right }
            | Plan::HashJoin { left, right, .. } => {
                union_columns(left.output_columns(), right.output_columns())
            }
            Plan::Filter { input, .. }
            | Plan::Sort { input, .. }
            | Plan::Skip { input, .. }
            | Plan::Limit { input, .. } => input.output_columns(),
            Plan::Projection { input, items } => union_columns(
                input.output_columns(),
                items.iter().map(|(name, _)| name.clone()),
            ),
            Plan::ProduceResults { columns, .. } => columns.clone(),
        }
    }

    /// Direct children, left to right.
    pub fn children(&self) -> Vec<&Plan> {
        match self {
            Plan::Argument { .. }
            | Plan::Input { .. }
            | Plan::AllNodeScan { .. }
            | Plan::LabelScan { .. }
            | Plan::IndexSeek { .. } => Vec::new(),
            Plan::CartesianProduct { left, right }
            | Plan::Apply { left, right }
            | Plan::HashJoin { left, right, .. } => vec![left, right],
            Plan::Expand { input, .. }
            | Plan::Filter { input, .. }
            | Plan::Projection { input, .. }
            | Plan::Sort { input, .. }
            | Plan::Skip { input, .. }
            | Plan::Limit { input, .. }
            | Plan::ProduceResults { input, .. } => vec![input],
        }
    }
}

fn union_columns(mut base: Vec<String>, extra: impl IntoIterator<Item = String>) -> Vec<String> {
    for name in extra {
        if !base.contains(&name) {
            base.push(name);
        }
    }
    base
}

/// Runtime state of an opened [`Plan`] node.
pub enum PlanIterator<'a, S: GraphSnapshot + 'a> {
    Argument(ArgumentIter),
    Input(InputIter<'a>),
    NodeScan(NodeScanIter<'a, S>),
    IndexSeek(IndexSeekIter<'a>),
    Expand(ExpandIter<'a, S>),
    CartesianProduct(NestedLoopIter<'a, S>),
    Apply(NestedLoopIter<'a, S>),
    HashJoin(HashJoinIter<'a, S>),
    Filter(FilterIter<'a, S>),
    Projection(ProjectionIter<'a, S>),
    Sort(SortIter<'a, S>),
    Skip(SkipIter<'a, S>),
    Limit(LimitIter<'a, S>),
    ProduceResults(ProduceResultsIter<'a, S>),
}

impl<'a, S: GraphSnapshot + 'a> Iterator for PlanIterator<'a, S> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            PlanIterator::Argument(iter) => iter.next(),
            PlanIterator::Input(iter) => iter.next(),
            PlanIterator::NodeScan(iter) => iter.next(),
            PlanIterator::IndexSeek(iter) => iter.next(),
            PlanIterator::Expand(iter) => iter.next(),
            PlanIterator::CartesianProduct(iter) => iter.next(),
            PlanIterator::Apply(iter) => iter.next(),
            PlanIterator::HashJoin(iter) => iter.next(),
            PlanIterator::Filter(iter) => iter.next(),
            PlanIterator::Projection(iter) => iter.next(),
            PlanIterator::Sort(iter) => iter.next(),
            PlanIterator::Skip(iter) => iter.next(),
            PlanIterator::Limit(iter) => iter.next(),
            PlanIterator::ProduceResults(iter) => iter.next(),
        }
    }
}

impl<'a, S: GraphSnapshot + 'a> PlanIterator<'a, S> {
    /// Release every resource owned by this subtree. Idempotent.
    ///
    /// Every release is attempted even if an earlier one fails; the first
    /// failure is returned.
    pub fn close(&mut self) -> Result<()> {
        match self {
            PlanIterator::Argument(_) => Ok(()),
            PlanIterator::Input(iter) => iter.close(),
            PlanIterator::NodeScan(iter) => iter.close(),
            PlanIterator::IndexSeek(iter) => iter.close(),
            PlanIterator::Expand(iter) => iter.close(),
            PlanIterator::CartesianProduct(iter) | PlanIterator::Apply(iter) => iter.close(),
            PlanIterator::HashJoin(iter) => iter.close(),
            PlanIterator::Filter(iter) => iter.close(),
            PlanIterator::Projection(iter) => iter.close(),
            PlanIterator::Sort(iter) => iter.close(),
            PlanIterator::Skip(iter) => iter.close(),
            PlanIterator::Limit(iter) => iter.close(),
            PlanIterator::ProduceResults(iter) => iter.close(),
        }
    }
}
