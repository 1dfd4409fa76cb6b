use arrow::array::{Array, ArrayRef, AsArray};
use arrow::datatypes::{DataType, Float64Type, Int64Type, SchemaRef};
use arrow::record_batch::RecordBatch;
use arrow::util::display::array_value_to_string;
use std::sync::Arc;

use super::{Connection, Dataset};
use crate::error::{MiningError, Result};
use crate::value::{Record, Value};

/// A dataset over Arrow record batches sharing one schema.
///
/// `Int64` columns become [`Value::Int`], `Float64` columns [`Value::Float`],
/// and every other type is rendered with Arrow's display formatting. Nulls
/// become empty strings.
#[derive(Debug, Clone)]
pub struct RecordBatchDataset {
    schema: SchemaRef,
    batches: Arc<Vec<RecordBatch>>,
}

impl RecordBatchDataset {
    /// Creates a dataset. All batches must have the field names of `schema`.
    pub fn try_new(schema: SchemaRef, batches: Vec<RecordBatch>) -> Result<Self> {
        let names = |s: &SchemaRef| -> Vec<String> {
            s.fields().iter().map(|f| f.name().to_string()).collect()
        };
        let expected = names(&schema);
        if let Some(b) = batches.iter().find(|b| names(&b.schema()) != expected) {
            return Err(MiningError::data_source(
                "RecordBatch",
                format!(
                    "batch fields {:?} don't match {:?}",
                    names(&b.schema()),
                    expected
                ),
            ));
        }
        Ok(Self {
            schema,
            batches: Arc::new(batches),
        })
    }

    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    /// Total number of rows across batches.
    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(RecordBatch::num_rows).sum()
    }
}

impl Dataset for RecordBatchDataset {
    fn open(&self) -> Result<Box<dyn Connection>> {
        Ok(Box::new(BatchConnection {
            fields: self.fields(),
            batches: Arc::clone(&self.batches),
            batch: 0,
            row: 0,
        }))
    }

    fn fields(&self) -> Vec<String> {
        self.schema
            .fields()
            .iter()
            .map(|f| f.name().to_string())
            .collect()
    }
}

struct BatchConnection {
    fields: Vec<String>,
    batches: Arc<Vec<RecordBatch>>,
    batch: usize,
    row: usize,
}

impl Iterator for BatchConnection {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let batch = self.batches.get(self.batch)?;
            if self.row < batch.num_rows() {
                let row = self.row;
                self.row += 1;
                return Some(read_row(&self.fields, batch, row));
            }
            self.batch += 1;
            self.row = 0;
        }
    }
}

impl Connection for BatchConnection {}

fn read_row(fields: &[String], batch: &RecordBatch, row: usize) -> Result<Record> {
    fields
        .iter()
        .zip(batch.columns())
        .map(|(name, column)| Ok((name.clone(), cell_value(column, row)?)))
        .collect()
}

fn cell_value(column: &ArrayRef, row: usize) -> Result<Value> {
    if column.is_null(row) {
        return Ok(Value::Str(String::new()));
    }
    Ok(match column.data_type() {
        DataType::Int64 => Value::Int(column.as_primitive::<Int64Type>().value(row)),
        DataType::Float64 => Value::Float(column.as_primitive::<Float64Type>().value(row)),
        DataType::Utf8 => Value::Str(column.as_string::<i32>().value(row).to_string()),
        _ => Value::Str(array_value_to_string(column, row)?),
    })
}
