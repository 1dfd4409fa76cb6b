//! The rule algebra.
//!
//! A [`Rule`] is an immutable predicate over a [`Record`]. Every rule
//! reports the fields it reads through [`Rule::fields`] and displays as a
//! valid expression, so `Rule::dynamic(&rule.to_string())` evaluates the
//! same way as `rule`.
//!
//! Two optional capabilities drive the search loop:
//!
//! - **tweak**: threshold rules ([`Rule::is_tweakable`]) produce neighbouring
//!   variants around their thresholds, see [`Rule::tweak`].
//! - **overlaps**: range rules ([`Rule::is_overlapper`]) report when they
//!   constrain the same field with intersecting ranges, see [`Rule::overlaps`].
//!
//! # Example
//!
//! ```rust
//! use term_rules::rule::Rule;
//! use term_rules::value::{Record, Value};
//!
//! let rule = Rule::and(Rule::ge_fv("band", 5), Rule::le_fv("band", 8)).unwrap();
//! assert_eq!(rule.to_string(), "band >= 5 && band <= 8");
//!
//! let mut record = Record::new();
//! record.insert("band".to_string(), Value::from("7"));
//! assert!(rule.evaluate(&record).unwrap());
//! ```

mod compose;
mod overlap;
mod tweak;

use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;

use crate::error::{ExprError, MiningError, Result};
use crate::expr::Expr;
use crate::value::{Record, Value};

/// A boolean predicate over a record.
#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    /// Always true.
    True,
    /// `field == value`
    EqFV { field: String, value: Value },
    /// `field != value`
    NeFV { field: String, value: Value },
    /// `field_a == field_b`
    EqFF { field_a: String, field_b: String },
    /// `field_a != field_b`
    NeFF { field_a: String, field_b: String },
    /// `field_a < field_b`
    LtFF { field_a: String, field_b: String },
    /// `field_a <= field_b`
    LeFF { field_a: String, field_b: String },
    /// `field_a >= field_b`
    GeFF { field_a: String, field_b: String },
    /// `field_a > field_b`
    GtFF { field_a: String, field_b: String },
    /// `field <= value`
    LeFV { field: String, value: Value },
    /// `field >= value`
    GeFV { field: String, value: Value },
    /// `low <= field <= high`
    BetweenFV {
        field: String,
        low: Value,
        high: Value,
    },
    /// `field <= low || field >= high`
    OutsideFV {
        field: String,
        low: Value,
        high: Value,
    },
    /// `field` textually equals one of `values`.
    InFV { field: String, values: Vec<Value> },
    /// `field_a + field_b <= value`
    AddLeF {
        field_a: String,
        field_b: String,
        value: Value,
    },
    /// `field_a + field_b >= value`
    AddGeF {
        field_a: String,
        field_b: String,
        value: Value,
    },
    /// `field_a * field_b <= value`
    MulLeF {
        field_a: String,
        field_b: String,
        value: Value,
    },
    /// `field_a * field_b >= value`
    MulGeF {
        field_a: String,
        field_b: String,
        value: Value,
    },
    /// Number of `fields` equal to `value` is `num`.
    CountEqVF {
        value: Value,
        fields: Vec<String>,
        num: i64,
    },
    /// Number of `fields` equal to `value` is less than `num`.
    CountLtVF {
        value: Value,
        fields: Vec<String>,
        num: i64,
    },
    And(Box<Rule>, Box<Rule>),
    Or(Box<Rule>, Box<Rule>),
    /// A user supplied expression.
    Dynamic(Expr),
}

impl Rule {
    pub fn eq_fv(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Rule::EqFV {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn ne_fv(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Rule::NeFV {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn eq_ff(field_a: impl Into<String>, field_b: impl Into<String>) -> Self {
        Rule::EqFF {
            field_a: field_a.into(),
            field_b: field_b.into(),
        }
    }

    pub fn ne_ff(field_a: impl Into<String>, field_b: impl Into<String>) -> Self {
        Rule::NeFF {
            field_a: field_a.into(),
            field_b: field_b.into(),
        }
    }

    pub fn lt_ff(field_a: impl Into<String>, field_b: impl Into<String>) -> Self {
        Rule::LtFF {
            field_a: field_a.into(),
            field_b: field_b.into(),
        }
    }

    pub fn le_ff(field_a: impl Into<String>, field_b: impl Into<String>) -> Self {
        Rule::LeFF {
            field_a: field_a.into(),
            field_b: field_b.into(),
        }
    }

    pub fn ge_ff(field_a: impl Into<String>, field_b: impl Into<String>) -> Self {
        Rule::GeFF {
            field_a: field_a.into(),
            field_b: field_b.into(),
        }
    }

    pub fn gt_ff(field_a: impl Into<String>, field_b: impl Into<String>) -> Self {
        Rule::GtFF {
            field_a: field_a.into(),
            field_b: field_b.into(),
        }
    }

    pub fn le_fv(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Rule::LeFV {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn ge_fv(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Rule::GeFV {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Creates a Between rule. Fails unless `high > low`.
    pub fn between_fv(
        field: impl Into<String>,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> Result<Self> {
        let (low, high) = check_interval(low.into(), high.into())?;
        Ok(Rule::BetweenFV {
            field: field.into(),
            low,
            high,
        })
    }

    /// Like [`Rule::between_fv`], panicking on an invalid interval.
    pub fn must_between_fv(
        field: impl Into<String>,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> Self {
        match Self::between_fv(field, low, high) {
            Ok(r) => r,
            Err(e) => panic!("{e}"),
        }
    }

    /// Creates an Outside rule. Fails unless `high > low`.
    pub fn outside_fv(
        field: impl Into<String>,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> Result<Self> {
        let (low, high) = check_interval(low.into(), high.into())?;
        Ok(Rule::OutsideFV {
            field: field.into(),
            low,
            high,
        })
    }

    /// Like [`Rule::outside_fv`], panicking on an invalid interval.
    pub fn must_outside_fv(
        field: impl Into<String>,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> Self {
        match Self::outside_fv(field, low, high) {
            Ok(r) => r,
            Err(e) => panic!("{e}"),
        }
    }

    /// Creates an In rule. Values are deduplicated by their text and sorted.
    ///
    /// # Panics
    ///
    /// Panics if `values` is empty.
    pub fn in_fv(field: impl Into<String>, values: Vec<Value>) -> Self {
        assert!(!values.is_empty(), "InFV rule requires at least one value");
        Rule::InFV {
            field: field.into(),
            values: normalize_values(values),
        }
    }

    pub fn add_le_f(
        field_a: impl Into<String>,
        field_b: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        Rule::AddLeF {
            field_a: field_a.into(),
            field_b: field_b.into(),
            value: value.into(),
        }
    }

    pub fn add_ge_f(
        field_a: impl Into<String>,
        field_b: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        Rule::AddGeF {
            field_a: field_a.into(),
            field_b: field_b.into(),
            value: value.into(),
        }
    }

    pub fn mul_le_f(
        field_a: impl Into<String>,
        field_b: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        Rule::MulLeF {
            field_a: field_a.into(),
            field_b: field_b.into(),
            value: value.into(),
        }
    }

    pub fn mul_ge_f(
        field_a: impl Into<String>,
        field_b: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        Rule::MulGeF {
            field_a: field_a.into(),
            field_b: field_b.into(),
            value: value.into(),
        }
    }

    /// # Panics
    ///
    /// Panics if fewer than two fields are given.
    pub fn count_eq_vf(value: impl Into<Value>, fields: Vec<String>, num: i64) -> Self {
        assert!(fields.len() >= 2, "CountEQVF rule requires at least two fields");
        Rule::CountEqVF {
            value: value.into(),
            fields,
            num,
        }
    }

    /// # Panics
    ///
    /// Panics if fewer than two fields are given.
    pub fn count_lt_vf(value: impl Into<Value>, fields: Vec<String>, num: i64) -> Self {
        assert!(fields.len() >= 2, "CountLTVF rule requires at least two fields");
        Rule::CountLtVF {
            value: value.into(),
            fields,
            num,
        }
    }

    /// Compiles a dynamic rule from an expression.
    pub fn dynamic(expr: &str) -> Result<Self> {
        Expr::compile(expr)
            .map(Rule::Dynamic)
            .map_err(|e| MiningError::invalid_expr(expr, e))
    }

    /// The name of the rule's variant, as used by generator deny lists.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Rule::True => "True",
            Rule::EqFV { .. } => "EQFV",
            Rule::NeFV { .. } => "NEFV",
            Rule::EqFF { .. } => "EQFF",
            Rule::NeFF { .. } => "NEFF",
            Rule::LtFF { .. } => "LTFF",
            Rule::LeFF { .. } => "LEFF",
            Rule::GeFF { .. } => "GEFF",
            Rule::GtFF { .. } => "GTFF",
            Rule::LeFV { .. } => "LEFV",
            Rule::GeFV { .. } => "GEFV",
            Rule::BetweenFV { .. } => "BetweenFV",
            Rule::OutsideFV { .. } => "OutsideFV",
            Rule::InFV { .. } => "InFV",
            Rule::AddLeF { .. } => "AddLEF",
            Rule::AddGeF { .. } => "AddGEF",
            Rule::MulLeF { .. } => "MulLEF",
            Rule::MulGeF { .. } => "MulGEF",
            Rule::CountEqVF { .. } => "CountEQVF",
            Rule::CountLtVF { .. } => "CountLTVF",
            Rule::And(..) => "And",
            Rule::Or(..) => "Or",
            Rule::Dynamic(_) => "Dynamic",
        }
    }

    pub fn is_true(&self) -> bool {
        matches!(self, Rule::True)
    }

    /// The fields read by the rule, unique and in order of first use.
    pub fn fields(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields(&self, out: &mut Vec<String>) {
        let mut push = |f: &String| {
            if !out.contains(f) {
                out.push(f.clone());
            }
        };
        match self {
            Rule::True => {}
            Rule::EqFV { field, .. }
            | Rule::NeFV { field, .. }
            | Rule::LeFV { field, .. }
            | Rule::GeFV { field, .. }
            | Rule::BetweenFV { field, .. }
            | Rule::OutsideFV { field, .. }
            | Rule::InFV { field, .. } => push(field),
            Rule::EqFF { field_a, field_b }
            | Rule::NeFF { field_a, field_b }
            | Rule::LtFF { field_a, field_b }
            | Rule::LeFF { field_a, field_b }
            | Rule::GeFF { field_a, field_b }
            | Rule::GtFF { field_a, field_b }
            | Rule::AddLeF {
                field_a, field_b, ..
            }
            | Rule::AddGeF {
                field_a, field_b, ..
            }
            | Rule::MulLeF {
                field_a, field_b, ..
            }
            | Rule::MulGeF {
                field_a, field_b, ..
            } => {
                push(field_a);
                push(field_b);
            }
            Rule::CountEqVF { fields, .. } | Rule::CountLtVF { fields, .. } => {
                fields.iter().for_each(push);
            }
            Rule::And(a, b) | Rule::Or(a, b) => {
                a.collect_fields(out);
                b.collect_fields(out);
            }
            Rule::Dynamic(expr) => {
                for v in expr.variables() {
                    push(&v);
                }
            }
        }
    }

    /// Evaluates the rule against a record.
    ///
    /// Fails with [`MiningError::InvalidRule`] when a field is missing and
    /// [`MiningError::IncompatibleTypes`] when a field can't be used as the
    /// rule requires.
    pub fn evaluate(&self, record: &Record) -> Result<bool> {
        match self {
            Rule::True => Ok(true),
            Rule::EqFV { field, value } => Ok(self.field_eq(self.get(record, field)?, value)),
            Rule::NeFV { field, value } => Ok(!self.field_eq(self.get(record, field)?, value)),
            Rule::EqFF { field_a, field_b } => {
                let (a, b) = (self.get(record, field_a)?, self.get(record, field_b)?);
                Ok(self.field_eq(a, b))
            }
            Rule::NeFF { field_a, field_b } => {
                let (a, b) = (self.get(record, field_a)?, self.get(record, field_b)?);
                Ok(!self.field_eq(a, b))
            }
            Rule::LtFF { field_a, field_b } => {
                let ord = self.compare(self.get(record, field_a)?, self.get(record, field_b)?)?;
                Ok(ord == Ordering::Less)
            }
            Rule::LeFF { field_a, field_b } => {
                let ord = self.compare(self.get(record, field_a)?, self.get(record, field_b)?)?;
                Ok(ord != Ordering::Greater)
            }
            Rule::GeFF { field_a, field_b } => {
                let ord = self.compare(self.get(record, field_a)?, self.get(record, field_b)?)?;
                Ok(ord != Ordering::Less)
            }
            Rule::GtFF { field_a, field_b } => {
                let ord = self.compare(self.get(record, field_a)?, self.get(record, field_b)?)?;
                Ok(ord == Ordering::Greater)
            }
            Rule::LeFV { field, value } => {
                Ok(self.compare(self.get(record, field)?, value)? != Ordering::Greater)
            }
            Rule::GeFV { field, value } => {
                Ok(self.compare(self.get(record, field)?, value)? != Ordering::Less)
            }
            Rule::BetweenFV { field, low, high } => {
                let v = self.get(record, field)?;
                Ok(self.compare(v, low)? != Ordering::Less
                    && self.compare(v, high)? != Ordering::Greater)
            }
            Rule::OutsideFV { field, low, high } => {
                let v = self.get(record, field)?;
                Ok(self.compare(v, low)? != Ordering::Greater
                    || self.compare(v, high)? != Ordering::Less)
            }
            Rule::InFV { field, values } => {
                let text = self.get(record, field)?.to_string();
                Ok(values.iter().any(|v| v.to_string() == text))
            }
            Rule::AddLeF {
                field_a,
                field_b,
                value,
            }
            | Rule::AddGeF {
                field_a,
                field_b,
                value,
            }
            | Rule::MulLeF {
                field_a,
                field_b,
                value,
            }
            | Rule::MulGeF {
                field_a,
                field_b,
                value,
            } => {
                let (a, b) = (self.get(record, field_a)?, self.get(record, field_b)?);
                let result = match self {
                    Rule::AddLeF { .. } | Rule::AddGeF { .. } => {
                        checked_arith(a, b, i64::checked_add, |x, y| x + y)
                    }
                    _ => checked_arith(a, b, i64::checked_mul, |x, y| x * y),
                }
                .ok_or_else(|| MiningError::incompatible_types(self))?;
                let ord = self.compare(&result, value)?;
                Ok(match self {
                    Rule::AddLeF { .. } | Rule::MulLeF { .. } => ord != Ordering::Greater,
                    _ => ord != Ordering::Less,
                })
            }
            Rule::CountEqVF { value, fields, num } | Rule::CountLtVF { value, fields, num } => {
                let mut n = 0i64;
                for f in fields {
                    if self.field_eq(self.get(record, f)?, value) {
                        n += 1;
                    }
                }
                Ok(match self {
                    Rule::CountEqVF { .. } => n == *num,
                    _ => n < *num,
                })
            }
            Rule::And(a, b) => {
                let (ra, rb) = (a.evaluate(record)?, b.evaluate(record)?);
                Ok(ra && rb)
            }
            Rule::Or(a, b) => {
                let (ra, rb) = (a.evaluate(record)?, b.evaluate(record)?);
                Ok(ra || rb)
            }
            Rule::Dynamic(expr) => expr.eval_bool(record).map_err(|e| match e {
                ExprError::VarNotExist(_) => MiningError::invalid_rule(self),
                _ => MiningError::incompatible_types(self),
            }),
        }
    }

    fn get<'a>(&self, record: &'a Record, field: &str) -> Result<&'a Value> {
        match record.get(field) {
            None => Err(MiningError::invalid_rule(self)),
            Some(Value::Error(_)) => Err(MiningError::incompatible_types(self)),
            Some(v) => Ok(v),
        }
    }

    fn field_eq(&self, a: &Value, b: &Value) -> bool {
        a.loose_eq(b).unwrap_or(false)
    }

    fn compare(&self, a: &Value, b: &Value) -> Result<Ordering> {
        a.numeric_cmp(b)
            .ok_or_else(|| MiningError::incompatible_types(self))
    }

    fn precedence_group(&self) -> Option<char> {
        match self {
            Rule::And(..) | Rule::BetweenFV { .. } => Some('&'),
            Rule::Or(..) | Rule::OutsideFV { .. } => Some('|'),
            Rule::Dynamic(_) => Some('?'),
            _ => None,
        }
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>, parent: char) -> fmt::Result {
        match self.precedence_group() {
            Some(group) if group != parent => write!(f, "({self})"),
            _ => write!(f, "{self}"),
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::True => write!(f, "true()"),
            Rule::EqFV { field, value } => write!(f, "{field} == {}", value.to_literal()),
            Rule::NeFV { field, value } => write!(f, "{field} != {}", value.to_literal()),
            Rule::EqFF { field_a, field_b } => write!(f, "{field_a} == {field_b}"),
            Rule::NeFF { field_a, field_b } => write!(f, "{field_a} != {field_b}"),
            Rule::LtFF { field_a, field_b } => write!(f, "{field_a} < {field_b}"),
            Rule::LeFF { field_a, field_b } => write!(f, "{field_a} <= {field_b}"),
            Rule::GeFF { field_a, field_b } => write!(f, "{field_a} >= {field_b}"),
            Rule::GtFF { field_a, field_b } => write!(f, "{field_a} > {field_b}"),
            Rule::LeFV { field, value } => write!(f, "{field} <= {}", value.to_literal()),
            Rule::GeFV { field, value } => write!(f, "{field} >= {}", value.to_literal()),
            Rule::BetweenFV { field, low, high } => write!(
                f,
                "{field} >= {} && {field} <= {}",
                low.to_literal(),
                high.to_literal()
            ),
            Rule::OutsideFV { field, low, high } => write!(
                f,
                "{field} <= {} || {field} >= {}",
                low.to_literal(),
                high.to_literal()
            ),
            Rule::InFV { field, values } => {
                write!(f, "in({field}")?;
                for v in values {
                    write!(f, ", {}", v.to_literal())?;
                }
                write!(f, ")")
            }
            Rule::AddLeF {
                field_a,
                field_b,
                value,
            } => write!(f, "{field_a} + {field_b} <= {}", value.to_literal()),
            Rule::AddGeF {
                field_a,
                field_b,
                value,
            } => write!(f, "{field_a} + {field_b} >= {}", value.to_literal()),
            Rule::MulLeF {
                field_a,
                field_b,
                value,
            } => write!(f, "{field_a} * {field_b} <= {}", value.to_literal()),
            Rule::MulGeF {
                field_a,
                field_b,
                value,
            } => write!(f, "{field_a} * {field_b} >= {}", value.to_literal()),
            Rule::CountEqVF { value, fields, num } | Rule::CountLtVF { value, fields, num } => {
                write!(f, "count({}", value.to_literal())?;
                for field in fields {
                    write!(f, ", {field}")?;
                }
                let op = if matches!(self, Rule::CountEqVF { .. }) {
                    "=="
                } else {
                    "<"
                };
                write!(f, ") {op} {num}")
            }
            Rule::And(a, b) => {
                a.fmt_operand(f, '&')?;
                write!(f, " && ")?;
                b.fmt_operand(f, '&')
            }
            Rule::Or(a, b) => {
                a.fmt_operand(f, '|')?;
                write!(f, " || ")?;
                b.fmt_operand(f, '|')
            }
            Rule::Dynamic(expr) => write!(f, "{}", expr.source()),
        }
    }
}

impl Serialize for Rule {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Orders values numerically when both are numbers, otherwise by text.
pub(crate) fn value_cmp(a: &Value, b: &Value) -> Ordering {
    match a.numeric_cmp(b) {
        Some(ord) => ord,
        None => match (a.is_numeric(), b.is_numeric()) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => a.to_string().cmp(&b.to_string()),
        },
    }
}

fn normalize_values(mut values: Vec<Value>) -> Vec<Value> {
    values.sort_by(|a, b| value_cmp(a, b).then_with(|| a.to_string().cmp(&b.to_string())));
    values.dedup_by(|a, b| a.to_string() == b.to_string());
    values
}

fn check_interval(low: Value, high: Value) -> Result<(Value, Value)> {
    match low.numeric_cmp(&high) {
        Some(Ordering::Less) => Ok((low, high)),
        _ => Err(MiningError::InvalidInterval {
            low: low.to_string(),
            high: high.to_string(),
        }),
    }
}

fn checked_arith(
    a: &Value,
    b: &Value,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Option<Value> {
    if let (Some(x), Some(y)) = (a.as_int(), b.as_int()) {
        if let Some(r) = int_op(x, y) {
            return Some(Value::Int(r));
        }
    }
    Some(Value::Float(float_op(a.as_float()?, b.as_float()?)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, &str)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::from(*v)))
            .collect()
    }

    fn sample_rules() -> Vec<Rule> {
        vec![
            Rule::True,
            Rule::eq_fv("band", 4),
            Rule::ne_fv("name", "fred"),
            Rule::eq_ff("income", "band"),
            Rule::ne_ff("income", "band"),
            Rule::lt_ff("income", "cost"),
            Rule::le_ff("income", "cost"),
            Rule::ge_ff("income", "cost"),
            Rule::gt_ff("income", "cost"),
            Rule::le_fv("cost", 3.2),
            Rule::ge_fv("cost", 3.2),
            Rule::must_between_fv("band", 4, 7),
            Rule::must_outside_fv("band", 4, 7),
            Rule::in_fv("name", vec![Value::from("fred"), Value::from("mary")]),
            Rule::add_le_f("income", "cost", 7),
            Rule::add_ge_f("income", "cost", 7.5),
            Rule::mul_le_f("income", "cost", 10),
            Rule::mul_ge_f("income", "cost", 10),
            Rule::count_eq_vf(3, vec!["income".into(), "band".into()], 1),
            Rule::count_lt_vf(3, vec!["income".into(), "band".into()], 2),
            Rule::dynamic("income > 2 && name != \"bob\"").unwrap(),
        ]
    }

    #[test]
    fn test_display() {
        let want = [
            "true()",
            "band == 4",
            "name != \"fred\"",
            "income == band",
            "income != band",
            "income < cost",
            "income <= cost",
            "income >= cost",
            "income > cost",
            "cost <= 3.2",
            "cost >= 3.2",
            "band >= 4 && band <= 7",
            "band <= 4 || band >= 7",
            "in(name, \"fred\", \"mary\")",
            "income + cost <= 7",
            "income + cost >= 7.5",
            "income * cost <= 10",
            "income * cost >= 10",
            "count(3, income, band) == 1",
            "count(3, income, band) < 2",
            "income > 2 && name != \"bob\"",
        ];
        let got: Vec<String> = sample_rules().iter().map(Rule::to_string).collect();
        assert_eq!(got, want);
    }

    #[test]
    fn test_evaluate() {
        let r = record(&[
            ("income", "3"),
            ("cost", "4.5"),
            ("band", "4"),
            ("name", "fred"),
        ]);
        let want = [
            true, true, false, false, true, true, true, false, false, false, true, true, true,
            true, false, true, false, true, true, true, true,
        ];
        for (rule, want) in sample_rules().iter().zip(want) {
            assert_eq!(rule.evaluate(&r).unwrap(), want, "{rule}");
        }
    }

    #[test]
    fn test_display_evaluates_like_rule() {
        let records = [
            record(&[("income", "3"), ("cost", "4.5"), ("band", "4"), ("name", "fred")]),
            record(&[("income", "0"), ("cost", "0"), ("band", "9"), ("name", "bob")]),
            record(&[("income", "2"), ("cost", "7.25"), ("band", "7"), ("name", "mary")]),
        ];
        for rule in sample_rules() {
            let dynamic = Rule::dynamic(&rule.to_string()).unwrap();
            for r in &records {
                assert_eq!(
                    rule.evaluate(r).unwrap(),
                    dynamic.evaluate(r).unwrap(),
                    "{rule}"
                );
            }
        }
    }

    #[test]
    fn test_numeric_equality_is_by_value() {
        let rule = Rule::eq_fv("band", "5");
        for text in ["5", "5.0", "5.00"] {
            assert!(rule.evaluate(&record(&[("band", text)])).unwrap());
        }
        let rule = Rule::in_fv("band", vec![Value::from("5")]);
        assert!(!rule.evaluate(&record(&[("band", "5.0")])).unwrap());
    }

    #[test]
    fn test_evaluate_errors() {
        let rule = Rule::ge_fv("band", 5);
        let err = rule.evaluate(&record(&[("income", "3")])).unwrap_err();
        assert!(matches!(err, MiningError::InvalidRule { ref rule } if rule == "band >= 5"));

        let err = rule.evaluate(&record(&[("band", "high")])).unwrap_err();
        assert!(matches!(err, MiningError::IncompatibleTypes { .. }));

        let mut r = Record::new();
        r.insert("band".to_string(), Value::Error(ExprError::DivideByZero));
        assert!(matches!(
            Rule::eq_fv("band", 5).evaluate(&r),
            Err(MiningError::IncompatibleTypes { .. })
        ));

        let dynamic = Rule::dynamic("band > 2").unwrap();
        assert!(matches!(
            dynamic.evaluate(&record(&[("income", "3")])),
            Err(MiningError::InvalidRule { .. })
        ));
        assert!(matches!(
            dynamic.evaluate(&record(&[("band", "x")])),
            Err(MiningError::IncompatibleTypes { .. })
        ));
    }

    #[test]
    fn test_string_equality_falls_back_to_text() {
        let rule = Rule::eq_ff("a", "b");
        assert!(rule.evaluate(&record(&[("a", "x"), ("b", "x")])).unwrap());
        assert!(!rule.evaluate(&record(&[("a", "x"), ("b", "1")])).unwrap());
    }

    #[test]
    fn test_fields() {
        let rule = Rule::and(
            Rule::ge_fv("band", 5),
            Rule::count_eq_vf(1, vec!["a".into(), "band".into(), "b".into()], 2),
        )
        .unwrap();
        assert_eq!(rule.fields(), vec!["band", "a", "b"]);
        let rule = Rule::dynamic("x + y > x").unwrap();
        assert_eq!(rule.fields(), vec!["x", "y"]);
        assert!(Rule::True.fields().is_empty());
    }

    #[test]
    fn test_interval_construction() {
        assert!(Rule::between_fv("a", 1.0, 1.000001).is_ok());
        assert!(Rule::outside_fv("a", 1.0, 1.000001).is_ok());
        assert!(matches!(
            Rule::between_fv("a", 1, 1),
            Err(MiningError::InvalidInterval { .. })
        ));
        assert!(Rule::outside_fv("a", 5, 2).is_err());
    }

    #[test]
    #[should_panic(expected = "at least one value")]
    fn test_in_fv_requires_values() {
        let _ = Rule::in_fv("a", vec![]);
    }

    #[test]
    #[should_panic(expected = "at least two fields")]
    fn test_count_requires_two_fields() {
        let _ = Rule::count_eq_vf(1, vec!["a".into()], 1);
    }

    #[test]
    fn test_in_fv_values_sorted_and_unique() {
        let rule = Rule::in_fv(
            "a",
            vec![
                Value::from("10"),
                Value::from("9"),
                Value::from("b"),
                Value::from("9"),
                Value::from("a"),
            ],
        );
        assert_eq!(rule.to_string(), "in(a, 9, 10, \"a\", \"b\")");
    }

    #[test]
    fn test_kind_names() {
        let names: Vec<&str> = sample_rules().iter().map(Rule::kind_name).collect();
        assert_eq!(names[0], "True");
        assert_eq!(names[11], "BetweenFV");
        assert_eq!(names[18], "CountEQVF");
        assert_eq!(names[20], "Dynamic");
    }

    #[test]
    fn test_serializes_as_display() {
        let json = serde_json::to_string(&Rule::ge_fv("band", 5)).unwrap();
        assert_eq!(json, "\"band >= 5\"");
    }
}
