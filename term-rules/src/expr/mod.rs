//! A small expression language evaluated against a record.
//!
//! Expressions are used for dynamic rules, aggregator arguments and goals.
//!
//! ```rust
//! use term_rules::expr::Expr;
//! use term_rules::value::{Record, Value};
//!
//! let expr = Expr::compile("income - cost > 1").unwrap();
//! let mut record = Record::new();
//! record.insert("income".to_string(), Value::from("3"));
//! record.insert("cost".to_string(), Value::from("1.5"));
//! assert_eq!(expr.eval_bool(&record), Ok(true));
//! ```
//!
//! ## Operators
//!
//! By increasing precedence: `||`, `&&`, `== != < <= > >=`, `+ -`, `* /`,
//! and the unary `-` and `!`. Booleans are represented by the strings
//! `"true"` and `"false"`.
//!
//! ## Functions
//!
//! `true()`, `false()`, `roundto(x, dp)`, `iferr(x, fallback)`,
//! `in(x, v1, ...)`, `count(v, x1, ...)`, `min(..)`, `max(..)` and `abs(x)`.

mod eval;
mod functions;
mod lexer;
mod parser;

use std::collections::HashMap;
use std::fmt;

use crate::error::ExprError;
use crate::value::Value;

/// A compiled expression.
#[derive(Debug, Clone)]
pub struct Expr {
    source: String,
    root: parser::Node,
}

impl Expr {
    /// Compiles an expression. Unknown functions and wrong argument counts
    /// are reported here; unknown variables only at evaluation time.
    pub fn compile(source: &str) -> Result<Self, ExprError> {
        let root = parser::parse(source)?;
        Ok(Self {
            source: source.to_string(),
            root,
        })
    }

    /// The text the expression was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluates the expression. Failures are returned as [`Value::Error`].
    pub fn eval(&self, vars: &HashMap<String, Value>) -> Value {
        eval::eval(&self.root, vars)
    }

    /// Evaluates the expression, requiring a boolean result.
    pub fn eval_bool(&self, vars: &HashMap<String, Value>) -> Result<bool, ExprError> {
        let v = self.eval(vars);
        if let Value::Error(e) = v {
            return Err(e);
        }
        v.as_bool()
            .ok_or_else(|| ExprError::type_mismatch(format!("expected a boolean, got: {v}")))
    }

    /// Evaluates the expression, requiring a numeric result.
    pub fn eval_float(&self, vars: &HashMap<String, Value>) -> Result<f64, ExprError> {
        let v = self.eval(vars);
        if let Value::Error(e) = v {
            return Err(e);
        }
        v.as_float()
            .ok_or_else(|| ExprError::type_mismatch(format!("expected a number, got: {v}")))
    }

    /// Names of the variables referenced, in order of first appearance.
    pub fn variables(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.root.collect_vars(&mut out);
        out.into_iter().map(str::to_string).collect()
    }
}

impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
