use std::sync::Arc;

use super::{Connection, Dataset};
use crate::error::{MiningError, Result};
use crate::value::{Record, Value};

/// An in-memory dataset built from literal rows.
///
/// ```rust
/// use term_rules::dataset::{Dataset, LiteralDataset};
/// use term_rules::value::Value;
///
/// let ds = LiteralDataset::new(
///     vec!["income", "band"],
///     vec![
///         vec![Value::from("3"), Value::from("4")],
///         vec![Value::from("0"), Value::from("9")],
///     ],
/// )
/// .unwrap();
/// assert_eq!(ds.fields(), vec!["income", "band"]);
/// assert_eq!(ds.open().unwrap().count(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct LiteralDataset {
    fields: Arc<Vec<String>>,
    rows: Arc<Vec<Vec<Value>>>,
}

impl LiteralDataset {
    /// Creates a dataset. Every row must have one value per field.
    pub fn new<S: Into<String>>(fields: Vec<S>, rows: Vec<Vec<Value>>) -> Result<Self> {
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        if let Some((i, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != fields.len())
        {
            return Err(MiningError::data_source(
                "Literal",
                format!(
                    "row {i} has {} values, expected {}",
                    row.len(),
                    fields.len()
                ),
            ));
        }
        Ok(Self {
            fields: Arc::new(fields),
            rows: Arc::new(rows),
        })
    }

    /// Creates a dataset from rows of strings.
    pub fn from_strings<S: Into<String>>(fields: Vec<S>, rows: &[&[&str]]) -> Result<Self> {
        let rows = rows
            .iter()
            .map(|row| row.iter().map(|v| Value::from(*v)).collect())
            .collect();
        Self::new(fields, rows)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True if there are no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl Dataset for LiteralDataset {
    fn open(&self) -> Result<Box<dyn Connection>> {
        Ok(Box::new(LiteralConnection {
            fields: Arc::clone(&self.fields),
            rows: Arc::clone(&self.rows),
            pos: 0,
        }))
    }

    fn fields(&self) -> Vec<String> {
        self.fields.as_ref().clone()
    }
}

struct LiteralConnection {
    fields: Arc<Vec<String>>,
    rows: Arc<Vec<Vec<Value>>>,
    pos: usize,
}

impl Iterator for LiteralConnection {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = self.rows.get(self.pos)?;
        self.pos += 1;
        let record: Record = self
            .fields
            .iter()
            .cloned()
            .zip(row.iter().cloned())
            .collect();
        Some(Ok(record))
    }
}

impl Connection for LiteralConnection {}
