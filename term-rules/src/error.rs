//! Error types for the Term rule mining library.
//!
//! All fallible operations in the crate return [`MiningError`]. Expression
//! failures are described by the smaller [`ExprError`], which is `Clone` so
//! that it can be carried inside an error [`Value`](crate::value::Value).

use thiserror::Error;

/// Errors produced while compiling or evaluating an expression.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExprError {
    /// The expression text could not be parsed.
    #[error("invalid syntax: {0}")]
    InvalidSyntax(String),

    /// A variable referenced by the expression is not defined.
    #[error("variable doesn't exist: {0}")]
    VarNotExist(String),

    /// A function referenced by the expression is not defined.
    #[error("function doesn't exist: {0}")]
    FunctionNotExist(String),

    /// A function was called with the wrong number of arguments.
    #[error("wrong number of arguments to {function}: {message}")]
    WrongNumOfArgs { function: String, message: String },

    /// Operand types don't suit the operation.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    /// Division by zero.
    #[error("divide by zero")]
    DivideByZero,
}

impl ExprError {
    pub(crate) fn type_mismatch(msg: impl Into<String>) -> Self {
        Self::TypeMismatch(msg.into())
    }

    pub(crate) fn wrong_num_of_args(function: &str, message: impl Into<String>) -> Self {
        Self::WrongNumOfArgs {
            function: function.to_string(),
            message: message.into(),
        }
    }
}

/// The main error type for the Term rule mining library.
#[derive(Error, Debug)]
pub enum MiningError {
    /// A rule references a field that is absent from the record.
    #[error("invalid rule: {rule}")]
    InvalidRule { rule: String },

    /// A field is present but can't be coerced to the type the rule needs.
    #[error("incompatible types in rule: {rule}")]
    IncompatibleTypes { rule: String },

    /// A Between/Outside rule was constructed with `high <= low`.
    #[error("invalid interval: low: {low}, high: {high}")]
    InvalidInterval { low: String, high: String },

    /// Two rules can't be composed into an And/Or rule.
    #[error("can't combine rules: {rule_a} and {rule_b}")]
    InvalidCombination { rule_a: String, rule_b: String },

    /// An aggregator name is not a valid identifier.
    #[error("invalid aggregator name: {name}")]
    InvalidName { name: String },

    /// An aggregator name is one of the reserved names.
    #[error("aggregator name reserved: {name}")]
    NameReserved { name: String },

    /// An aggregator name clashes with a field name.
    #[error("aggregator name clashes with field name: {name}")]
    NameClash { name: String },

    /// The aggregator kind is unknown.
    #[error("unregistered aggregator kind: {kind}")]
    UnregisteredKind { kind: String },

    /// Wrong number of arguments for an aggregator kind.
    #[error("invalid number of arguments for aggregator kind: {kind}")]
    InvalidNumArgs { kind: String },

    /// An expression failed to compile or evaluate.
    #[error("invalid expression: {expr} ({source})")]
    InvalidExpr {
        expr: String,
        #[source]
        source: ExprError,
    },

    /// An aggregator failed; wraps the underlying error with its name.
    #[error("aggregator: {name}, {source}")]
    Aggregator {
        name: String,
        #[source]
        source: Box<MiningError>,
    },

    /// A goal expression failed to evaluate.
    #[error("goal: {expr}, {source}")]
    Goal {
        expr: String,
        #[source]
        source: ExprError,
    },

    /// The rule field list references an unknown field.
    #[error("invalid rule field: {name}")]
    InvalidRuleField { name: String },

    /// A sort direction is neither ascending nor descending.
    #[error("invalid sort direction: {direction}")]
    InvalidSortDirection { direction: String },

    /// A sort key references an unknown aggregator.
    #[error("invalid sort field: {name}")]
    InvalidSortField { name: String },

    /// Two passes over the same dataset saw different record counts.
    #[error("number of records changed in dataset: expected {expected}, got {got}")]
    NumRecordsChanged { expected: u64, got: u64 },

    /// No rule fields were specified.
    #[error("no rule fields specified")]
    NoRuleFieldsSpecified,

    /// The assessment was cancelled through its cancellation token.
    #[error("assessment cancelled")]
    Cancelled,

    /// Error from data source operations.
    #[error("data source error ({source_type}): {message}")]
    DataSource {
        /// Type of data source (e.g., "CSV", "RecordBatch")
        source_type: String,
        message: String,
    },

    /// Error from DataFusion operations.
    #[error("DataFusion error: {0}")]
    DataFusion(#[from] datafusion::error::DataFusionError),

    /// Error from Arrow operations.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Error from I/O operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Error related to configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// An operation was invoked in a state that doesn't allow it.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Generic internal error for unexpected conditions.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A type alias for `Result<T, MiningError>`.
pub type Result<T> = std::result::Result<T, MiningError>;

impl MiningError {
    /// Creates an invalid rule error for the given rule text.
    pub fn invalid_rule(rule: impl ToString) -> Self {
        Self::InvalidRule {
            rule: rule.to_string(),
        }
    }

    /// Creates an incompatible types error for the given rule text.
    pub fn incompatible_types(rule: impl ToString) -> Self {
        Self::IncompatibleTypes {
            rule: rule.to_string(),
        }
    }

    /// Creates an invalid expression error.
    pub fn invalid_expr(expr: impl Into<String>, source: ExprError) -> Self {
        Self::InvalidExpr {
            expr: expr.into(),
            source,
        }
    }

    /// Wraps an error with the name of the aggregator that produced it.
    pub fn aggregator(name: impl Into<String>, source: MiningError) -> Self {
        Self::Aggregator {
            name: name.into(),
            source: Box::new(source),
        }
    }

    /// Creates a new data source error.
    pub fn data_source(source_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DataSource {
            source_type: source_type.into(),
            message: message.into(),
        }
    }

    /// Returns true for the errors produced by rule evaluation.
    pub fn is_rule_error(&self) -> bool {
        matches!(
            self,
            MiningError::InvalidRule { .. } | MiningError::IncompatibleTypes { .. }
        )
    }
}

impl From<serde_json::Error> for MiningError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<std::fmt::Error> for MiningError {
    fn from(err: std::fmt::Error) -> Self {
        Self::Internal(format!("failed to format output: {err}"))
    }
}

impl From<tokio::task::JoinError> for MiningError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Internal(format!("worker task failed: {err}"))
    }
}

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Adds context to an error.
    fn context(self, msg: &str) -> Result<T>;

    /// Adds context with a lazy message.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<MiningError>,
{
    fn context(self, msg: &str) -> Result<T> {
        self.map_err(|e| match e.into() {
            MiningError::Internal(inner) => MiningError::Internal(format!("{msg}: {inner}")),
            other => MiningError::Internal(format!("{msg}: {other}")),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let msg = f();
            match e.into() {
                MiningError::Internal(inner) => MiningError::Internal(format!("{msg}: {inner}")),
                other => MiningError::Internal(format!("{msg}: {other}")),
            }
        })
    }
}
