use std::sync::Arc;

use super::{Connection, Dataset};
use crate::error::Result;
use crate::value::Record;

/// Yields at most `limit` records of the wrapped dataset.
#[derive(Debug, Clone)]
pub struct TruncatedDataset {
    inner: Arc<dyn Dataset>,
    limit: u64,
}

impl TruncatedDataset {
    pub fn new(inner: Arc<dyn Dataset>, limit: u64) -> Self {
        Self { inner, limit }
    }
}

impl Dataset for TruncatedDataset {
    fn open(&self) -> Result<Box<dyn Connection>> {
        Ok(Box::new(TruncatedConnection {
            inner: self.inner.open()?,
            remaining: self.limit,
        }))
    }

    fn fields(&self) -> Vec<String> {
        self.inner.fields()
    }
}

struct TruncatedConnection {
    inner: Box<dyn Connection>,
    remaining: u64,
}

impl Iterator for TruncatedConnection {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        self.inner.next()
    }
}

impl Connection for TruncatedConnection {
    fn close(&mut self) -> Result<()> {
        self.inner.close()
    }
}
