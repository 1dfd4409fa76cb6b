//! CSV file source.

use async_trait::async_trait;
use datafusion::arrow::datatypes::{DataType, Field, Schema};
use datafusion::prelude::*;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::{Dataset, DatasetSource, RecordBatchDataset};
use crate::error::{MiningError, Result};

/// Options for configuring CSV file reading.
#[derive(Debug, Clone)]
pub struct CsvOptions {
    /// Whether the CSV file has a header row
    pub has_header: bool,
    /// Field delimiter (default: ',')
    pub delimiter: u8,
    /// Quote character (default: '"')
    pub quote: u8,
    /// Escape character (default: None)
    pub escape: Option<u8>,
    /// Comment prefix (lines starting with this are ignored)
    pub comment: Option<u8>,
    /// Maximum records to read for schema inference
    pub schema_infer_max_records: usize,
    /// Keep DataFusion's inferred column types instead of reading every
    /// column as text. Text keeps values such as `5.00` as written.
    pub infer_types: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            has_header: true,
            delimiter: b',',
            quote: b'"',
            escape: None,
            comment: None,
            schema_infer_max_records: 1000,
            infer_types: false,
        }
    }
}

/// One or more CSV files loaded as a single dataset.
///
/// # Examples
///
/// ```rust,no_run
/// use term_rules::dataset::{CsvOptions, CsvSource, DatasetSource};
///
/// # async fn example() -> term_rules::error::Result<()> {
/// let source = CsvSource::new("data/sales.csv")?;
/// let dataset = source.load().await?;
///
/// let tsv = CsvSource::with_options(
///     "data/sales.tsv",
///     CsvOptions {
///         delimiter: b'\t',
///         ..Default::default()
///     },
/// )?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct CsvSource {
    paths: Vec<String>,
    options: CsvOptions,
}

impl CsvSource {
    /// Creates a new CSV source from a single file path.
    pub fn new(path: impl Into<String>) -> Result<Self> {
        Self::with_options(path, CsvOptions::default())
    }

    /// Creates a new CSV source with custom options.
    pub fn with_options(path: impl Into<String>, options: CsvOptions) -> Result<Self> {
        Ok(Self {
            paths: vec![path.into()],
            options,
        })
    }

    /// Creates a CSV source from multiple file paths.
    pub fn from_paths(paths: Vec<String>) -> Result<Self> {
        if paths.is_empty() {
            return Err(MiningError::Configuration(
                "At least one path must be provided".to_string(),
            ));
        }
        Ok(Self {
            paths,
            options: CsvOptions::default(),
        })
    }

    /// Creates a CSV source from a glob pattern.
    pub fn from_glob(pattern: impl Into<String>) -> Result<Self> {
        let pattern = pattern.into();
        let entries = glob::glob(&pattern).map_err(|e| {
            MiningError::Configuration(format!("Invalid glob pattern '{pattern}': {e}"))
        })?;
        let mut paths = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| MiningError::Io(e.into_error()))?;
            if path.is_file() {
                if let Some(path_str) = path.to_str() {
                    paths.push(path_str.to_string());
                }
            }
        }
        if paths.is_empty() {
            return Err(MiningError::data_source(
                "CSV",
                format!("No files found matching glob pattern: {pattern}"),
            ));
        }
        paths.sort();
        Self::from_paths(paths)
    }

    /// Sets custom options for this CSV source.
    pub fn with_custom_options(mut self, options: CsvOptions) -> Self {
        self.options = options;
        self
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    fn read_options<'a>(&self, extension: &'a str) -> CsvReadOptions<'a> {
        let mut options = CsvReadOptions::new()
            .has_header(self.options.has_header)
            .delimiter(self.options.delimiter)
            .quote(self.options.quote)
            .schema_infer_max_records(self.options.schema_infer_max_records)
            .file_extension(extension);
        if let Some(escape) = self.options.escape {
            options = options.escape(escape);
        }
        if let Some(comment) = self.options.comment {
            options = options.comment(comment);
        }
        options
    }

    fn extension(&self) -> String {
        std::path::Path::new(&self.paths[0])
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{ext}"))
            .unwrap_or_default()
    }
}

#[async_trait]
impl DatasetSource for CsvSource {
    #[instrument(skip(self), fields(
        source.type = "csv",
        source.files = self.paths.len(),
        csv.delimiter = %self.options.delimiter as char,
        csv.has_header = self.options.has_header
    ))]
    async fn load(&self) -> Result<Arc<dyn Dataset>> {
        info!(
            source.type = "csv",
            source.paths = ?self.paths,
            csv.infer_types = self.options.infer_types,
            "Loading CSV data source"
        );
        let ctx = SessionContext::new();
        let extension = self.extension();

        let inferred = ctx
            .read_csv(self.paths.clone(), self.read_options(&extension))
            .await?;
        let df = if self.options.infer_types {
            inferred
        } else {
            let text_schema = Schema::new(
                inferred
                    .schema()
                    .fields()
                    .iter()
                    .map(|f| Field::new(f.name(), DataType::Utf8, true))
                    .collect::<Vec<_>>(),
            );
            ctx.read_csv(
                self.paths.clone(),
                self.read_options(&extension).schema(&text_schema),
            )
            .await?
        };

        let schema = df.schema().inner().clone();
        let batches = df.collect().await?;
        let dataset = RecordBatchDataset::try_new(schema, batches)?;

        debug!(
            source.type = "csv",
            rows = dataset.num_rows(),
            fields = ?dataset.fields(),
            "CSV data source loaded"
        );
        Ok(Arc::new(dataset))
    }

    fn description(&self) -> String {
        if self.paths.len() == 1 {
            let path = &self.paths[0];
            format!("CSV file: {path}")
        } else {
            let count = self.paths.len();
            format!("CSV files: {count} files")
        }
    }
}
