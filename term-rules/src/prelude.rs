//! Prelude for commonly used types and traits in term-rules.

pub use crate::assessment::{Assessment, Direction, SortField};
pub use crate::assessor::{GoalAssessment, RuleAssessment};
pub use crate::config::{MiningConfig, MiningPlan};
pub use crate::dataset::{
    CsvOptions, CsvSource, Dataset, DatasetSource, LiteralDataset, RecordBatchDataset,
    TruncatedDataset,
};
pub use crate::description::DatasetDescription;
pub use crate::error::{ErrorContext, MiningError, Result};
pub use crate::formatters::{FormatterConfig, ReportFormatter};
pub use crate::logging::LogConfig;
pub use crate::miner::{MiningReport, RuleMiner};
pub use crate::rule::Rule;
pub use crate::value::{Record, Value};
