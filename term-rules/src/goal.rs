//! Goals: boolean expressions over finalized aggregator values.

use std::collections::HashMap;
use std::fmt;

use crate::error::{MiningError, Result};
use crate::expr::Expr;
use crate::value::Value;

/// A named boolean expression evaluated against the finalized aggregators
/// of a rule, plus `numRecords`.
#[derive(Debug, Clone, PartialEq)]
pub struct Goal {
    expr: Expr,
}

impl Goal {
    /// Compiles a goal expression.
    pub fn new(expr: &str) -> Result<Self> {
        Expr::compile(expr)
            .map(|expr| Self { expr })
            .map_err(|e| MiningError::invalid_expr(expr, e))
    }

    /// Like [`Goal::new`], panicking on an invalid expression.
    pub fn must_new(expr: &str) -> Self {
        match Self::new(expr) {
            Ok(g) => g,
            Err(e) => panic!("{e}"),
        }
    }

    pub fn source(&self) -> &str {
        self.expr.source()
    }

    /// Names referenced by the goal.
    pub fn variables(&self) -> Vec<String> {
        self.expr.variables()
    }

    /// Evaluates the goal against finalized aggregator values.
    pub fn evaluate(&self, aggregators: &HashMap<String, Value>) -> Result<bool> {
        self.expr
            .eval_bool(aggregators)
            .map_err(|source| MiningError::Goal {
                expr: self.source().to_string(),
                source,
            })
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.source())
    }
}
