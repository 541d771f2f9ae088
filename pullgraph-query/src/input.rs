//! Batched input rows feeding an `Input` leaf.
//!
//! Batch boundaries are a delivery detail of the source; the engine never
//! lets them show in its output.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{Error, Result};
use crate::executor::Row;

/// An ordered group of rows sharing one column list.
#[derive(Debug, Clone, PartialEq)]
pub struct RowBatch {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl RowBatch {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Result<Self> {
        for row in &rows {
            if !row.column_names().eq(columns.iter().map(String::as_str)) {
                return Err(Error::SchemaMismatch {
                    expected: columns,
                    actual: row.column_names().map(str::to_string).collect(),
                });
            }
        }
        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }
}

/// A source of input rows. Every `open` starts a fresh pass over the rows.
pub trait RowSource {
    fn open(&self) -> Result<Box<dyn BatchCursor + '_>>;
}

pub trait BatchCursor {
    /// Next batch of at most `max_rows` rows, `None` once exhausted.
    fn next_batch(&mut self, max_rows: usize) -> Result<Option<RowBatch>>;

    fn close(&mut self) -> Result<()>;
}

/// Rows held in memory, delivered in batches of up to `max_rows`.
#[derive(Debug, Default)]
pub struct VecRowSource {
    columns: Vec<String>,
    rows: Vec<Row>,
    opened: AtomicUsize,
    closed: AtomicUsize,
}

impl VecRowSource {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Result<Self> {
        let batch = RowBatch::new(columns, rows)?;
        Ok(Self {
            columns: batch.columns,
            rows: batch.rows,
            opened: AtomicUsize::new(0),
            closed: AtomicUsize::new(0),
        })
    }

    pub fn open_count(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

impl RowSource for VecRowSource {
    fn open(&self) -> Result<Box<dyn BatchCursor + '_>> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(VecBatchCursor {
            source: self,
            pos: 0,
            closed: false,
        }))
    }
}

struct VecBatchCursor<'s> {
    source: &'s VecRowSource,
    pos: usize,
    closed: bool,
}

impl BatchCursor for VecBatchCursor<'_> {
    fn next_batch(&mut self, max_rows: usize) -> Result<Option<RowBatch>> {
        if self.closed || self.pos >= self.source.rows.len() {
            return Ok(None);
        }
        let end = (self.pos + max_rows.max(1)).min(self.source.rows.len());
        let rows = self.source.rows[self.pos..end].to_vec();
        self.pos = end;
        Ok(Some(RowBatch {
            columns: self.source.columns.clone(),
            rows,
        }))
    }

    fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            self.source.closed.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::Value;

    fn rows(n: i64) -> Vec<Row> {
        (0..n).map(|i| Row::default().with("x", Value::Int(i))).collect()
    }

    #[test]
    fn batches_respect_max_rows() {
        let source = VecRowSource::new(vec!["x".into()], rows(5)).unwrap();
        let mut cursor = source.open().unwrap();
        let sizes: Vec<usize> = std::iter::from_fn(|| cursor.next_batch(2).unwrap())
            .map(|b| b.len())
            .collect();
        assert_eq!(sizes, vec![2, 2, 1]);
        cursor.close().unwrap();
        cursor.close().unwrap();
        assert_eq!(source.open_count(), 1);
        assert_eq!(source.close_count(), 1);
    }

    #[test]
    fn batch_rejects_foreign_schema() {
        let bad = vec![Row::default().with("y", Value::Int(1))];
        assert!(matches!(
            RowBatch::new(vec!["x".into()], bad),
            Err(Error::SchemaMismatch { .. })
        ));
    }
}
