//! Expression evaluation over a single row.
//!
//! Comparisons and boolean connectives follow three-valued logic: any
//! comparison involving `Null` is `Null`, and `And`/`Or`/`Xor`/`Not` use
//! Kleene semantics. Callers that need a boolean (Filter) treat anything
//! other than `Bool(true)` as not matched.

use std::cmp::Ordering;

use pullgraph_api::{GraphSnapshot, compare_int_float};

use crate::Params;
use crate::ast::{BinaryOperator, Expression, Literal, UnaryOperator};
use crate::error::{Error, Result};
use crate::executor::{Entity, Row, Value};

pub fn evaluate_expression_value<S: GraphSnapshot>(
    expr: &Expression,
    row: &mut Row,
    snapshot: &S,
    params: &Params,
) -> Result<Value> {
    match expr {
        Expression::Literal(lit) => Ok(literal_value(lit)),
        Expression::Variable(name) => row
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownVariable(name.clone())),
        Expression::Parameter(name) => params
            .get(name)
            .cloned()
            .ok_or_else(|| Error::MissingParameter(name.clone())),
        Expression::Property { variable, key } => {
            match entity_of(row, variable)? {
                Some(entity) => read_property(snapshot, entity, key),
                None => Ok(Value::Null),
            }
        }
        Expression::CachedProperty { variable, key } => {
            let Some(entity) = entity_of(row, variable)? else {
                return Ok(Value::Null);
            };
            if let Some(hit) = row.cache().get(entity, key) {
                return Ok(hit.clone());
            }
            let value = read_property(snapshot, entity, key)?;
            row.cache_mut().insert(entity, key, value.clone());
            Ok(value)
        }
        Expression::Binary(bin) => {
            let left = evaluate_expression_value(&bin.left, row, snapshot, params)?;
            let right = evaluate_expression_value(&bin.right, row, snapshot, params)?;
            binary_value(bin.operator, left, right)
        }
        Expression::Unary(un) => {
            let operand = evaluate_expression_value(&un.operand, row, snapshot, params)?;
            match (un.operator, operand) {
                (_, Value::Null) => Ok(Value::Null),
                (UnaryOperator::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
                (UnaryOperator::Negate, Value::Int(i)) => i
                    .checked_neg()
                    .map(Value::Int)
                    .ok_or_else(|| Error::Other("integer overflow".into())),
                (UnaryOperator::Negate, Value::Float(f)) => Ok(Value::Float(-f)),
                (op, v) => Err(Error::TypeMismatch(format!("cannot apply {op:?} to {v:?}"))),
            }
        }
        Expression::IsNull(inner) => {
            let v = evaluate_expression_value(inner, row, snapshot, params)?;
            Ok(Value::Bool(v.is_null()))
        }
        Expression::IsNotNull(inner) => {
            let v = evaluate_expression_value(inner, row, snapshot, params)?;
            Ok(Value::Bool(!v.is_null()))
        }
        Expression::List(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(evaluate_expression_value(item, row, snapshot, params)?);
            }
            Ok(Value::List(out))
        }
    }
}

/// Filter semantics: only `Bool(true)` passes.
pub fn evaluate_expression_bool<S: GraphSnapshot>(
    expr: &Expression,
    row: &mut Row,
    snapshot: &S,
    params: &Params,
) -> Result<bool> {
    Ok(matches!(
        evaluate_expression_value(expr, row, snapshot, params)?,
        Value::Bool(true)
    ))
}

/// Evaluate an expression that may only reference literals and parameters.
pub fn evaluate_constant(expr: &Expression, params: &Params) -> Result<Value> {
    match expr {
        Expression::Literal(lit) => Ok(literal_value(lit)),
        Expression::Parameter(name) => params
            .get(name)
            .cloned()
            .ok_or_else(|| Error::MissingParameter(name.clone())),
        Expression::List(items) => items
            .iter()
            .map(|item| evaluate_constant(item, params))
            .collect::<Result<Vec<_>>>()
            .map(Value::List),
        Expression::Unary(un) if un.operator == UnaryOperator::Negate => {
            match evaluate_constant(&un.operand, params)? {
                Value::Int(i) => i
                    .checked_neg()
                    .map(Value::Int)
                    .ok_or_else(|| Error::Other("integer overflow".into())),
                Value::Float(f) => Ok(Value::Float(-f)),
                other => Err(Error::TypeMismatch(format!("cannot negate {other:?}"))),
            }
        }
        other => Err(Error::InvalidPlan(format!(
            "expected a literal or parameter, got {other:?}"
        ))),
    }
}

fn literal_value(lit: &Literal) -> Value {
    match lit {
        Literal::String(s) => Value::String(s.clone()),
        Literal::Integer(i) => Value::Int(*i),
        Literal::Float(f) => Value::Float(*f),
        Literal::Boolean(b) => Value::Bool(*b),
        Literal::Null => Value::Null,
    }
}

/// Entity bound to `variable`; `None` when it is null.
fn entity_of(row: &Row, variable: &str) -> Result<Option<Entity>> {
    match row.get(variable) {
        Some(Value::Node(id)) => Ok(Some(Entity::Node(*id))),
        Some(Value::Relationship(key)) => Ok(Some(Entity::Relationship(*key))),
        Some(Value::Null) => Ok(None),
        Some(other) => Err(Error::TypeMismatch(format!(
            "property access on non-entity {variable} = {other:?}"
        ))),
        None => Err(Error::UnknownVariable(variable.to_string())),
    }
}

fn read_property<S: GraphSnapshot>(snapshot: &S, entity: Entity, key: &str) -> Result<Value> {
    let raw = match entity {
        Entity::Node(id) => snapshot.node_property(id, key)?,
        Entity::Relationship(edge) => snapshot.edge_property(edge, key)?,
    };
    Ok(raw.map(Value::from).unwrap_or(Value::Null))
}

fn binary_value(op: BinaryOperator, left: Value, right: Value) -> Result<Value> {
    match op {
        BinaryOperator::And => kleene(left, right, |l, r| match (l, r) {
            (Some(false), _) | (_, Some(false)) => Some(false),
            (Some(true), Some(true)) => Some(true),
            _ => None,
        }),
        BinaryOperator::Or => kleene(left, right, |l, r| match (l, r) {
            (Some(true), _) | (_, Some(true)) => Some(true),
            (Some(false), Some(false)) => Some(false),
            _ => None,
        }),
        BinaryOperator::Xor => kleene(left, right, |l, r| Some(l? ^ r?)),
        BinaryOperator::Equals => Ok(equality(&left, &right).map_or(Value::Null, Value::Bool)),
        BinaryOperator::NotEquals => {
            Ok(equality(&left, &right).map_or(Value::Null, |eq| Value::Bool(!eq)))
        }
        BinaryOperator::LessThan
        | BinaryOperator::LessEqual
        | BinaryOperator::GreaterThan
        | BinaryOperator::GreaterEqual => {
            let Some(ord) = comparable(&left, &right) else {
                return Ok(Value::Null);
            };
            Ok(Value::Bool(match op {
                BinaryOperator::LessThan => ord == Ordering::Less,
                BinaryOperator::LessEqual => ord != Ordering::Greater,
                BinaryOperator::GreaterThan => ord == Ordering::Greater,
                _ => ord != Ordering::Less,
            }))
        }
        BinaryOperator::Add | BinaryOperator::Subtract | BinaryOperator::Multiply => {
            arithmetic(op, left, right)
        }
    }
}

fn kleene(
    left: Value,
    right: Value,
    f: impl Fn(Option<bool>, Option<bool>) -> Option<bool>,
) -> Result<Value> {
    fn truth(v: Value) -> Result<Option<bool>> {
        match v {
            Value::Bool(b) => Ok(Some(b)),
            Value::Null => Ok(None),
            other => Err(Error::TypeMismatch(format!(
                "expected a boolean, got {other:?}"
            ))),
        }
    }
    Ok(f(truth(left)?, truth(right)?).map_or(Value::Null, Value::Bool))
}

/// `None` when the answer is unknown (a null is involved).
fn equality(left: &Value, right: &Value) -> Option<bool> {
    match (left, right) {
        (Value::Null, _) | (_, Value::Null) => None,
        (Value::Int(l), Value::Float(r)) | (Value::Float(r), Value::Int(l)) => {
            Some(compare_int_float(*l, *r) == Ordering::Equal)
        }
        (Value::List(l), Value::List(r)) => {
            if l.len() != r.len() {
                return Some(false);
            }
            let mut unknown = false;
            for (a, b) in l.iter().zip(r) {
                match equality(a, b) {
                    Some(false) => return Some(false),
                    None => unknown = true,
                    Some(true) => {}
                }
            }
            if unknown { None } else { Some(true) }
        }
        _ => Some(left == right),
    }
}

/// Ordering for `<`-style comparisons; `None` for nulls and incomparable types.
fn comparable(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Int(l), Value::Int(r)) => Some(l.cmp(r)),
        (Value::Float(l), Value::Float(r)) => l.partial_cmp(r),
        (Value::Int(_), Value::Float(r)) | (Value::Float(r), Value::Int(_)) if r.is_nan() => None,
        (Value::Int(l), Value::Float(r)) => Some(compare_int_float(*l, *r)),
        (Value::Float(l), Value::Int(r)) => Some(compare_int_float(*r, *l).reverse()),
        (Value::String(l), Value::String(r)) => Some(l.cmp(r)),
        (Value::Bool(l), Value::Bool(r)) => Some(l.cmp(r)),
        _ => None,
    }
}

fn as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Int(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        _ => None,
    }
}

fn arithmetic(op: BinaryOperator, left: Value, right: Value) -> Result<Value> {
    match (&left, &right) {
        (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
        (Value::Int(l), Value::Int(r)) => {
            let out = match op {
                BinaryOperator::Add => l.checked_add(*r),
                BinaryOperator::Subtract => l.checked_sub(*r),
                _ => l.checked_mul(*r),
            };
            out.map(Value::Int)
                .ok_or_else(|| Error::Other("integer overflow".into()))
        }
        (Value::String(l), Value::String(r)) if op == BinaryOperator::Add => {
            Ok(Value::String(format!("{l}{r}")))
        }
        _ => match (as_f64(&left), as_f64(&right)) {
            (Some(l), Some(r)) => Ok(Value::Float(match op {
                BinaryOperator::Add => l + r,
                BinaryOperator::Subtract => l - r,
                _ => l * r,
            })),
            _ => Err(Error::TypeMismatch(format!(
                "cannot apply {op:?} to {left:?} and {right:?}"
            ))),
        },
    }
}

/// Total order used by Sort. Null sorts after every other value.
pub fn order_compare(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Greater,
        (_, Value::Null) => Ordering::Less,
        _ => order_compare_non_null(left, right),
    }
}

fn order_compare_non_null(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::Bool(l), Value::Bool(r)) => l.cmp(r),
        (Value::Int(l), Value::Int(r)) => l.cmp(r),
        (Value::Float(l), Value::Float(r)) => compare_f64_with_nan(*l, *r),
        (Value::Int(l), Value::Float(r)) => compare_int_float(*l, *r),
        (Value::Float(l), Value::Int(r)) => compare_int_float(*r, *l).reverse(),
        (Value::String(l), Value::String(r)) => l.cmp(r),
        (Value::Node(l), Value::Node(r)) => l.cmp(r),
        (Value::Relationship(l), Value::Relationship(r)) => l.id.cmp(&r.id),
        (Value::List(l), Value::List(r)) => {
            for (a, b) in l.iter().zip(r) {
                match order_compare(a, b) {
                    Ordering::Equal => {}
                    non_eq => return non_eq,
                }
            }
            l.len().cmp(&r.len())
        }
        (Value::Map(l), Value::Map(r)) => {
            for ((lk, lv), (rk, rv)) in l.iter().zip(r) {
                let ord = lk.cmp(rk).then_with(|| order_compare(lv, rv));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            l.len().cmp(&r.len())
        }
        _ => value_order_rank(left).cmp(&value_order_rank(right)),
    }
}

fn value_order_rank(value: &Value) -> u8 {
    match value {
        Value::Map(_) => 0,
        Value::Node(_) => 1,
        Value::Relationship(_) => 2,
        Value::List(_) => 3,
        Value::String(_) => 4,
        Value::Bool(_) => 5,
        Value::Int(_) | Value::Float(_) => 6,
        Value::Null => 7,
    }
}

fn compare_f64_with_nan(left: f64, right: f64) -> Ordering {
    match (left.is_nan(), right.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => left.partial_cmp(&right).unwrap_or(Ordering::Equal),
    }
}

#[cfg(test)]
mod tests {
    use pullgraph_api::PropertyValue;
    use pullgraph_storage::MemGraph;

    use super::*;

    fn eval(expr: &Expression, row: &mut Row, g: &MemGraph) -> Value {
        evaluate_expression_value(expr, row, g, &Params::new()).unwrap()
    }

    #[test]
    fn three_valued_logic() {
        let g = MemGraph::new();
        let mut row = Row::default();
        let null = Expression::lit(Literal::Null);
        let t = Expression::lit(true);
        let f = Expression::lit(false);

        assert_eq!(eval(&null.clone().and(f.clone()), &mut row, &g), Value::Bool(false));
        assert_eq!(eval(&null.clone().and(t.clone()), &mut row, &g), Value::Null);
        assert_eq!(eval(&null.clone().or(t.clone()), &mut row, &g), Value::Bool(true));
        assert_eq!(eval(&null.clone().or(f.clone()), &mut row, &g), Value::Null);
        assert_eq!(eval(&null.clone().xor(t.clone()), &mut row, &g), Value::Null);
        assert_eq!(eval(&null.clone().logical_not(), &mut row, &g), Value::Null);
        assert_eq!(eval(&null.clone().equals(null.clone()), &mut row, &g), Value::Null);
        assert_eq!(eval(&Expression::lit(1).lt(null), &mut row, &g), Value::Null);
        assert_eq!(
            eval(&Expression::lit(1).equals(Expression::lit(1.0)), &mut row, &g),
            Value::Bool(true)
        );
    }

    #[test]
    fn cached_property_reads_once_per_row() {
        let mut g = MemGraph::new();
        let n = g.add_node(&[], &[("prop", PropertyValue::Int(4))]);
        let mut row = Row::default().with("a", Value::Node(n));
        let expr = Expression::cached("a", "prop");

        assert_eq!(eval(&expr, &mut row, &g), Value::Int(4));
        assert_eq!(eval(&expr, &mut row, &g), Value::Int(4));
        assert_eq!(g.stats().property_reads, 1);

        // A fresh lineage starts with an empty cache.
        let mut sibling = Row::default().with("a", Value::Node(n));
        assert_eq!(eval(&expr, &mut sibling, &g), Value::Int(4));
        assert_eq!(g.stats().property_reads, 2);

        // Uncached access always reads.
        assert_eq!(eval(&Expression::prop("a", "prop"), &mut row, &g), Value::Int(4));
        assert_eq!(g.stats().property_reads, 3);
    }

    #[test]
    fn property_of_null_is_null_without_a_read() {
        let g = MemGraph::new();
        let mut row = Row::default().with("a", Value::Null);
        assert_eq!(eval(&Expression::cached("a", "prop"), &mut row, &g), Value::Null);
        assert_eq!(g.stats().property_reads, 0);

        let mut scalar = Row::default().with("a", Value::Int(1));
        let err = evaluate_expression_value(
            &Expression::prop("a", "prop"),
            &mut scalar,
            &g,
            &Params::new(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::TypeMismatch(_)));
    }

    #[test]
    fn order_compare_puts_null_last_and_nan_after_numbers() {
        let mut values = vec![
            Value::Null,
            Value::Float(f64::NAN),
            Value::Int(2),
            Value::String("a".into()),
            Value::Float(1.5),
            Value::Bool(true),
        ];
        values.sort_by(order_compare);
        assert_eq!(values[0], Value::String("a".into()));
        assert_eq!(values[1], Value::Bool(true));
        assert_eq!(values[2], Value::Float(1.5));
        assert_eq!(values[3], Value::Int(2));
        assert!(matches!(values[4], Value::Float(f) if f.is_nan()));
        assert_eq!(values[5], Value::Null);
    }

    #[test]
    fn mixed_numbers_compare_exactly_past_f64_precision() {
        let big = 1i64 << 53;
        let (a, b, c) = (Value::Int(big), Value::Float(big as f64), Value::Int(big + 1));
        assert_eq!(order_compare(&a, &b), Ordering::Equal);
        assert_eq!(order_compare(&b, &c), Ordering::Less);
        assert_eq!(order_compare(&a, &c), Ordering::Less);

        let mut values = vec![c.clone(), b.clone(), Value::Float(-0.0), a.clone(), Value::Int(0)];
        values.sort_by(order_compare);
        assert_eq!(values[..2], [Value::Float(-0.0), Value::Int(0)]);
        assert_eq!(values[4], c);

        let g = MemGraph::new();
        let mut row = Row::default();
        let big_int = Expression::lit(big + 1);
        let big_float = Expression::lit(big as f64);
        assert_eq!(
            eval(&big_int.clone().equals(big_float.clone()), &mut row, &g),
            Value::Bool(false)
        );
        assert_eq!(eval(&big_float.gt(big_int), &mut row, &g), Value::Bool(false));
        assert_eq!(
            eval(&Expression::lit(1).lt(Expression::lit(f64::NAN)), &mut row, &g),
            Value::Null
        );
    }

    #[test]
    fn constants_accept_parameters_only() {
        let mut params = Params::new();
        params.insert("p".into(), Value::Int(3));
        assert_eq!(
            evaluate_constant(&Expression::param("p"), &params).unwrap(),
            Value::Int(3)
        );
        assert!(matches!(
            evaluate_constant(&Expression::param("q"), &params),
            Err(Error::MissingParameter(_))
        ));
        assert!(evaluate_constant(&Expression::var("n"), &params).is_err());
    }
}
