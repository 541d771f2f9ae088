use std::collections::{HashMap, VecDeque};

use pullgraph_api::GraphSnapshot;
use tracing::debug;

use super::cleanup::close_all;
use super::{PlanIterator, Row, Value};
use crate::error::{Error, Result};

/// Equi-join: the left side is drained into a hash table keyed on `keys`,
/// then right rows probe it. Keys match exactly when `=` would say true, so
/// rows with a null in any key never match.
pub struct HashJoinIter<'a, S: GraphSnapshot + 'a> {
    pub(super) keys: &'a [String],
    /// Present until the build side has been drained and closed.
    pub(super) build: Option<Box<PlanIterator<'a, S>>>,
    pub(super) probe: Box<PlanIterator<'a, S>>,
    pub(super) table: Option<HashMap<Vec<Value>, Vec<Row>>>,
    pub(super) pending: VecDeque<Row>,
}

impl<'a, S: GraphSnapshot + 'a> HashJoinIter<'a, S> {
    pub(super) fn new(
        keys: &'a [String],
        build: Box<PlanIterator<'a, S>>,
        probe: Box<PlanIterator<'a, S>>,
    ) -> Self {
        Self {
            keys,
            build: Some(build),
            probe,
            table: None,
            pending: VecDeque::new(),
        }
    }

    pub(super) fn close(&mut self) -> Result<()> {
        self.pending.clear();
        let build = match self.build.take() {
            Some(mut build) => build.close(),
            None => Ok(()),
        };
        close_all([build, self.probe.close()])
    }

    fn build_table(&mut self) -> Result<HashMap<Vec<Value>, Vec<Row>>> {
        let mut table: HashMap<Vec<Value>, Vec<Row>> = HashMap::new();
        let mut rows = 0usize;
        if let Some(build) = self.build.as_mut() {
            for row in build.by_ref() {
                let row = row?;
                if let Some(key) = join_key(&row, self.keys)? {
                    table.entry(key).or_default().push(row);
                    rows += 1;
                }
            }
        }
        if let Some(mut build) = self.build.take() {
            build.close()?;
        }
        debug!(rows, distinct_keys = table.len(), "hash join build side drained");
        Ok(table)
    }
}

impl<'a, S: GraphSnapshot + 'a> Iterator for HashJoinIter<'a, S> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.table.is_none() {
            match self.build_table() {
                Ok(table) => self.table = Some(table),
                Err(e) => return Some(Err(e)),
            }
        }
        loop {
            if let Some(row) = self.pending.pop_front() {
                return Some(Ok(row));
            }
            let table = self.table.as_ref()?;
            if table.is_empty() {
                return None;
            }
            let probe_row = match self.probe.next()? {
                Ok(row) => row,
                Err(e) => return Some(Err(e)),
            };
            let key = match join_key(&probe_row, self.keys) {
                Ok(Some(key)) => key,
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            };
            if let Some(matches) = table.get(&key) {
                self.pending
                    .extend(matches.iter().map(|build_row| build_row.merge(&probe_row)));
            }
        }
    }
}

/// Key values of `row`, or `None` if any of them can never be equal to
/// anything (a null, a NaN, or a list holding one).
fn join_key(row: &Row, keys: &[String]) -> Result<Option<Vec<Value>>> {
    let mut out = Vec::with_capacity(keys.len());
    for key in keys {
        let value = row
            .get(key)
            .ok_or_else(|| Error::UnknownVariable(key.clone()))?;
        match normalize_key(value) {
            Some(normalized) => out.push(normalized),
            None => return Ok(None),
        }
    }
    Ok(Some(out))
}

/// Canonical form under `=`: integral floats become integers, so `1` and
/// `1.0` (and `0.0` and `-0.0`) land on the same table entry.
fn normalize_key(value: &Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Float(f) if f.is_nan() => None,
        Value::Float(f) => Some(integral_float(*f).map_or(Value::Float(*f), Value::Int)),
        Value::List(items) => items
            .iter()
            .map(normalize_key)
            .collect::<Option<Vec<_>>>()
            .map(Value::List),
        other => Some(other.clone()),
    }
}

fn integral_float(f: f64) -> Option<i64> {
    const TWO_POW_63: f64 = 9_223_372_036_854_775_808.0;
    (f.fract() == 0.0 && (-TWO_POW_63..TWO_POW_63).contains(&f)).then_some(f as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_keys_are_excluded() {
        let keys = vec!["k".to_string()];
        let null = Row::default().with("k", Value::Null);
        assert_eq!(join_key(&null, &keys).unwrap(), None);
        let set = Row::default().with("k", Value::Int(1));
        assert_eq!(join_key(&set, &keys).unwrap(), Some(vec![Value::Int(1)]));
        assert!(join_key(&Row::default(), &keys).is_err());
    }

    #[test]
    fn numeric_keys_are_canonical_under_equality() {
        let keys = vec!["k".to_string()];
        let key = |v: Value| join_key(&Row::default().with("k", v), &keys).unwrap();

        assert_eq!(key(Value::Float(1.0)), key(Value::Int(1)));
        assert_eq!(key(Value::Float(-0.0)), key(Value::Float(0.0)));
        assert_eq!(key(Value::Float(2.5)), Some(vec![Value::Float(2.5)]));
        assert_eq!(key(Value::Float(f64::NAN)), None);
        assert_eq!(
            key(Value::List(vec![Value::Float(3.0)])),
            Some(vec![Value::List(vec![Value::Int(3)])])
        );
        assert_eq!(key(Value::List(vec![Value::Null])), None);
        // 2^63 has no i64 counterpart.
        assert_eq!(
            key(Value::Float(9_223_372_036_854_775_808.0)),
            Some(vec![Value::Float(9_223_372_036_854_775_808.0)])
        );
    }
}
