//! Datasets the rules are mined from.
//!
//! A [`Dataset`] can be opened any number of times; every [`Connection`]
//! streams the same records in the same order. Assessment passes rely on
//! this to compare record counts across scans.
//!
//! Provided implementations:
//!
//! - [`LiteralDataset`]: rows held in memory
//! - [`TruncatedDataset`]: yields at most N records of another dataset
//! - [`RecordBatchDataset`]: Arrow record batches
//! - [`CsvSource`]: loads CSV files through DataFusion into a [`RecordBatchDataset`]

use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;

use crate::error::Result;
use crate::value::Record;

mod batch;
mod csv;
mod memory;
mod truncate;

pub use batch::RecordBatchDataset;
pub use csv::{CsvOptions, CsvSource};
pub use memory::LiteralDataset;
pub use truncate::TruncatedDataset;

/// A source of records that can be scanned repeatedly.
pub trait Dataset: Debug + Send + Sync {
    /// Opens a new connection positioned before the first record.
    fn open(&self) -> Result<Box<dyn Connection>>;

    /// The field names, in their positional order.
    fn fields(&self) -> Vec<String>;
}

/// A single-consumer stream of records.
///
/// Read failures are yielded as `Err` items; the consumer stops at the first one.
pub trait Connection: Iterator<Item = Result<Record>> + Send {
    /// Releases any resources held by the connection.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Something that can be loaded asynchronously into a [`Dataset`].
#[async_trait]
pub trait DatasetSource: Debug + Send + Sync {
    /// Loads the source.
    async fn load(&self) -> Result<Arc<dyn Dataset>>;

    /// Returns a human-readable description of this source.
    fn description(&self) -> String;
}

/// Counts the records of a dataset with a full scan.
pub fn count_records(dataset: &dyn Dataset) -> Result<u64> {
    let mut conn = dataset.open()?;
    let mut n = 0u64;
    for record in conn.by_ref() {
        record?;
        n += 1;
    }
    conn.close()?;
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn test_count_records() {
        let ds = LiteralDataset::new(
            vec!["a"],
            vec![vec![Value::Int(1)], vec![Value::Int(2)], vec![Value::Int(3)]],
        )
        .unwrap();
        assert_eq!(count_records(&ds).unwrap(), 3);
        let truncated = TruncatedDataset::new(Arc::new(ds), 2);
        assert_eq!(count_records(&truncated).unwrap(), 2);
    }
}
