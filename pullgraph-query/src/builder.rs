//! Fluent construction of plans and expressions.

use pullgraph_api::RelationshipDirection;

use crate::ast::{
    BinaryExpression, BinaryOperator, Direction, Expression, Literal, UnaryExpression,
    UnaryOperator,
};
use crate::executor::{IndexPredicate, Plan, RangeBound, SortItem};

impl From<bool> for Literal {
    fn from(b: bool) -> Self {
        Literal::Boolean(b)
    }
}

impl From<i32> for Literal {
    fn from(i: i32) -> Self {
        Literal::Integer(i64::from(i))
    }
}

impl From<i64> for Literal {
    fn from(i: i64) -> Self {
        Literal::Integer(i)
    }
}

impl From<f64> for Literal {
    fn from(f: f64) -> Self {
        Literal::Float(f)
    }
}

impl From<&str> for Literal {
    fn from(s: &str) -> Self {
        Literal::String(s.to_string())
    }
}

impl From<String> for Literal {
    fn from(s: String) -> Self {
        Literal::String(s)
    }
}

impl Expression {
    pub fn lit(value: impl Into<Literal>) -> Self {
        Expression::Literal(value.into())
    }

    pub fn null() -> Self {
        Expression::Literal(Literal::Null)
    }

    pub fn var(name: impl Into<String>) -> Self {
        Expression::Variable(name.into())
    }

    pub fn param(name: impl Into<String>) -> Self {
        Expression::Parameter(name.into())
    }

    pub fn prop(variable: impl Into<String>, key: impl Into<String>) -> Self {
        Expression::Property {
            variable: variable.into(),
            key: key.into(),
        }
    }

    pub fn cached(variable: impl Into<String>, key: impl Into<String>) -> Self {
        Expression::CachedProperty {
            variable: variable.into(),
            key: key.into(),
        }
    }

    fn binary(self, operator: BinaryOperator, right: Expression) -> Self {
        Expression::Binary(Box::new(BinaryExpression {
            left: self,
            operator,
            right,
        }))
    }

    pub fn equals(self, right: Expression) -> Self {
        self.binary(BinaryOperator::Equals, right)
    }

    pub fn not_equals(self, right: Expression) -> Self {
        self.binary(BinaryOperator::NotEquals, right)
    }

    pub fn lt(self, right: Expression) -> Self {
        self.binary(BinaryOperator::LessThan, right)
    }

    pub fn lte(self, right: Expression) -> Self {
        self.binary(BinaryOperator::LessEqual, right)
    }

    pub fn gt(self, right: Expression) -> Self {
        self.binary(BinaryOperator::GreaterThan, right)
    }

    pub fn gte(self, right: Expression) -> Self {
        self.binary(BinaryOperator::GreaterEqual, right)
    }

    pub fn and(self, right: Expression) -> Self {
        self.binary(BinaryOperator::And, right)
    }

    pub fn or(self, right: Expression) -> Self {
        self.binary(BinaryOperator::Or, right)
    }

    pub fn xor(self, right: Expression) -> Self {
        self.binary(BinaryOperator::Xor, right)
    }

    pub fn add(self, right: Expression) -> Self {
        self.binary(BinaryOperator::Add, right)
    }

    pub fn subtract(self, right: Expression) -> Self {
        self.binary(BinaryOperator::Subtract, right)
    }

    pub fn multiply(self, right: Expression) -> Self {
        self.binary(BinaryOperator::Multiply, right)
    }

    pub fn logical_not(self) -> Self {
        Expression::Unary(Box::new(UnaryExpression {
            operator: UnaryOperator::Not,
            operand: self,
        }))
    }

    pub fn negate(self) -> Self {
        Expression::Unary(Box::new(UnaryExpression {
            operator: UnaryOperator::Negate,
            operand: self,
        }))
    }

    pub fn is_null(self) -> Self {
        Expression::IsNull(Box::new(self))
    }

    pub fn is_not_null(self) -> Self {
        Expression::IsNotNull(Box::new(self))
    }
}

impl IndexPredicate {
    pub fn exact(value: Expression) -> Self {
        IndexPredicate::Exact(value)
    }

    pub fn prefix(value: Expression) -> Self {
        IndexPredicate::StringPrefix(value)
    }

    pub fn range(lower: Option<RangeBound>, upper: Option<RangeBound>) -> Self {
        IndexPredicate::Range { lower, upper }
    }
}

impl RangeBound {
    pub fn inclusive(value: Expression) -> Self {
        Self {
            value,
            inclusive: true,
        }
    }

    pub fn exclusive(value: Expression) -> Self {
        Self {
            value,
            inclusive: false,
        }
    }
}

impl SortItem {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: Direction::Ascending,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: Direction::Descending,
        }
    }
}

fn names(columns: &[&str]) -> Vec<String> {
    columns.iter().map(|c| c.to_string()).collect()
}

/// Builds a plan bottom-up: start from a leaf, then stack operators on it.
#[derive(Debug, Clone)]
pub struct PlanBuilder {
    plan: Plan,
}

impl PlanBuilder {
    pub fn all_node_scan(alias: &str) -> Self {
        Self {
            plan: Plan::AllNodeScan {
                alias: alias.to_string(),
            },
        }
    }

    pub fn label_scan(alias: &str, label: &str) -> Self {
        Self {
            plan: Plan::LabelScan {
                alias: alias.to_string(),
                label: label.to_string(),
            },
        }
    }

    pub fn argument(columns: &[&str]) -> Self {
        Self {
            plan: Plan::Argument {
                columns: names(columns),
            },
        }
    }

    pub fn input(columns: &[&str]) -> Self {
        Self {
            plan: Plan::Input {
                columns: names(columns),
            },
        }
    }

    pub fn index_seek(
        alias: &str,
        label: &str,
        property: &str,
        predicates: Vec<IndexPredicate>,
    ) -> Self {
        Self {
            plan: Plan::IndexSeek {
                alias: alias.to_string(),
                label: label.to_string(),
                property: property.to_string(),
                predicates,
            },
        }
    }

    pub fn expand(
        self,
        from: &str,
        relationship: &str,
        to: &str,
        direction: RelationshipDirection,
        types: &[&str],
    ) -> Self {
        Self {
            plan: Plan::Expand {
                input: Box::new(self.plan),
                from: from.to_string(),
                relationship: relationship.to_string(),
                to: to.to_string(),
                direction,
                types: names(types),
            },
        }
    }

    pub fn filter(self, predicate: Expression) -> Self {
        Self {
            plan: Plan::Filter {
                input: Box::new(self.plan),
                predicate,
            },
        }
    }

    pub fn projection(self, items: Vec<(&str, Expression)>) -> Self {
        Self {
            plan: Plan::Projection {
                input: Box::new(self.plan),
                items: items
                    .into_iter()
                    .map(|(name, expr)| (name.to_string(), expr))
                    .collect(),
            },
        }
    }

    pub fn sort(self, items: Vec<SortItem>) -> Self {
        Self {
            plan: Plan::Sort {
                input: Box::new(self.plan),
                items,
            },
        }
    }

    pub fn skip(self, count: Expression) -> Self {
        Self {
            plan: Plan::Skip {
                input: Box::new(self.plan),
                count,
            },
        }
    }

    pub fn limit(self, count: Expression) -> Self {
        Self {
            plan: Plan::Limit {
                input: Box::new(self.plan),
                count,
            },
        }
    }

    pub fn cartesian_product(self, right: PlanBuilder) -> Self {
        Self {
            plan: Plan::CartesianProduct {
                left: Box::new(self.plan),
                right: Box::new(right.plan),
            },
        }
    }

    pub fn apply(self, right: PlanBuilder) -> Self {
        Self {
            plan: Plan::Apply {
                left: Box::new(self.plan),
                right: Box::new(right.plan),
            },
        }
    }

    /// `self` is the build side, `probe` the probe side.
    pub fn hash_join(self, keys: &[&str], probe: PlanBuilder) -> Self {
        Self {
            plan: Plan::HashJoin {
                keys: names(keys),
                left: Box::new(self.plan),
                right: Box::new(probe.plan),
            },
        }
    }

    pub fn produce_results(self, columns: &[&str]) -> Self {
        Self {
            plan: Plan::ProduceResults {
                input: Box::new(self.plan),
                columns: names(columns),
            },
        }
    }

    pub fn build(self) -> Plan {
        self.plan
    }
}
