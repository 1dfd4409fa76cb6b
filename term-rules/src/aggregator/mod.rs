//! Per-rule streaming aggregators.
//!
//! An [`AggregatorSpec`] is an immutable description (name, kind and
//! argument expression) shared by every rule of a pass. Each rule gets its
//! own [`AggregatorInstance`] holding zeroed counters, which consumes the
//! records of the pass and is finalized into a single [`Value`].
//!
//! Three aggregators are always present: `numMatches` and `percentMatches`
//! come first and `goalsScore` comes last, see [`build_specs`].
//!
//! # Kinds
//!
//! | Kind | Consumes | Final value |
//! |---|---|---|
//! | `count` | records where the rule and `expr` are true | int |
//! | `calc` | nothing | `expr` over earlier aggregators and `numRecords` |
//! | `sum` | `expr` as a float where the rule is true | float |
//! | `mean` | as `sum`, counting matches | sum / matches, 2dp |
//! | `percent` | `expr` where the rule is true | percentage true, 2dp |
//! | `precision` | `expr` where the rule is true | percentage true, 2dp |
//! | `recall` | the rule where `expr` is true | percentage true, 2dp |
//! | `goalsscore` | nothing | goals passed, damped after the first failure |

mod state;

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{MiningError, Result};
use crate::expr::Expr;
use crate::goal::Goal;
use crate::value::Value;

pub use state::AggregatorInstance;

/// Aggregator names users may not define.
pub const RESERVED_NAMES: [&str; 3] = ["numMatches", "percentMatches", "goalsScore"];

/// Name of the record count seen by calc aggregators and goals.
pub const NUM_RECORDS: &str = "numRecords";

static VALID_NAME: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$").expect("valid name pattern")
});

/// The kind of an aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregatorKind {
    Count,
    Calc,
    Sum,
    Mean,
    Percent,
    Precision,
    Recall,
    GoalsScore,
}

impl AggregatorKind {
    pub fn name(self) -> &'static str {
        match self {
            AggregatorKind::Count => "count",
            AggregatorKind::Calc => "calc",
            AggregatorKind::Sum => "sum",
            AggregatorKind::Mean => "mean",
            AggregatorKind::Percent => "percent",
            AggregatorKind::Precision => "precision",
            AggregatorKind::Recall => "recall",
            AggregatorKind::GoalsScore => "goalsscore",
        }
    }

    /// Number of argument expressions the kind takes.
    pub fn num_args(self) -> usize {
        match self {
            AggregatorKind::GoalsScore => 0,
            _ => 1,
        }
    }
}

impl FromStr for AggregatorKind {
    type Err = MiningError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "count" => AggregatorKind::Count,
            "calc" => AggregatorKind::Calc,
            "sum" => AggregatorKind::Sum,
            "mean" => AggregatorKind::Mean,
            "percent" => AggregatorKind::Percent,
            "precision" => AggregatorKind::Precision,
            "recall" => AggregatorKind::Recall,
            "goalsscore" => AggregatorKind::GoalsScore,
            _ => {
                return Err(MiningError::UnregisteredKind {
                    kind: s.to_string(),
                })
            }
        })
    }
}

impl fmt::Display for AggregatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Immutable description of an aggregator.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatorSpec {
    name: String,
    kind: AggregatorKind,
    arg: Option<Expr>,
}

impl AggregatorSpec {
    /// Creates a spec, validating the name, the kind and the number of
    /// argument expressions.
    pub fn new(name: &str, kind: &str, args: &[&str]) -> Result<Self> {
        if !VALID_NAME.is_match(name) {
            return Err(MiningError::InvalidName {
                name: name.to_string(),
            });
        }
        let kind: AggregatorKind = kind.parse()?;
        if args.len() != kind.num_args() {
            return Err(MiningError::InvalidNumArgs {
                kind: kind.to_string(),
            });
        }
        let arg = match args.first() {
            Some(src) => {
                Some(Expr::compile(src).map_err(|e| MiningError::invalid_expr(*src, e))?)
            }
            None => None,
        };
        Ok(Self {
            name: name.to_string(),
            kind,
            arg,
        })
    }

    /// Like [`AggregatorSpec::new`], panicking on invalid input.
    pub fn must_new(name: &str, kind: &str, args: &[&str]) -> Self {
        match Self::new(name, kind, args) {
            Ok(s) => s,
            Err(e) => panic!("{e}"),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> AggregatorKind {
        self.kind
    }

    /// The argument expression, if the kind takes one.
    pub fn arg(&self) -> Option<&Expr> {
        self.arg.as_ref()
    }

    /// A fresh instance with zeroed counters.
    pub fn new_instance(self: &Arc<Self>) -> AggregatorInstance {
        AggregatorInstance::new(Arc::clone(self))
    }
}

/// The built-in aggregators that precede user aggregators.
pub fn default_specs() -> Vec<AggregatorSpec> {
    vec![
        AggregatorSpec::must_new("numMatches", "count", &["true()"]),
        AggregatorSpec::must_new(
            "percentMatches",
            "calc",
            &["iferr(roundto(100.0 * numMatches / numRecords, 2), 0)"],
        ),
    ]
}

/// Builds the full aggregator list: the defaults, then `user` in order,
/// then `goalsScore`.
///
/// User aggregators may not use a reserved name, a field name, or the name
/// of another aggregator.
pub fn build_specs(
    field_names: &[String],
    user: Vec<AggregatorSpec>,
) -> Result<Vec<Arc<AggregatorSpec>>> {
    let mut specs: Vec<Arc<AggregatorSpec>> = default_specs().into_iter().map(Arc::new).collect();
    for spec in user {
        if RESERVED_NAMES.contains(&spec.name()) || spec.name() == NUM_RECORDS {
            return Err(MiningError::NameReserved {
                name: spec.name().to_string(),
            });
        }
        if field_names.iter().any(|f| f == spec.name())
            || specs.iter().any(|s| s.name() == spec.name())
        {
            return Err(MiningError::NameClash {
                name: spec.name().to_string(),
            });
        }
        specs.push(Arc::new(spec));
    }
    specs.push(Arc::new(AggregatorSpec::must_new(
        "goalsScore",
        "goalsscore",
        &[],
    )));
    Ok(specs)
}

/// Finalizes `instances` in order.
///
/// Each aggregator sees the values of the aggregators before it plus
/// `numRecords`. The returned map still contains `numRecords`.
pub fn finalize(
    instances: &[AggregatorInstance],
    goals: &[Goal],
    num_records: u64,
) -> Result<HashMap<String, Value>> {
    let mut values: HashMap<String, Value> = HashMap::with_capacity(instances.len() + 1);
    values.insert(NUM_RECORDS.to_string(), Value::Int(num_records as i64));
    for inst in instances {
        let v = inst
            .result(&values, goals)
            .map_err(|e| MiningError::aggregator(inst.name(), e))?;
        values.insert(inst.name().to_string(), v);
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_validation() {
        assert!(AggregatorSpec::new("numBig", "count", &["a > 2"]).is_ok());
        assert!(AggregatorSpec::new("_x1", "COUNT", &["a > 2"]).is_ok());
        assert!(matches!(
            AggregatorSpec::new("1bad", "count", &["a > 2"]),
            Err(MiningError::InvalidName { .. })
        ));
        assert!(matches!(
            AggregatorSpec::new("bad-name", "count", &["a > 2"]),
            Err(MiningError::InvalidName { .. })
        ));
        assert!(matches!(
            AggregatorSpec::new("x", "median", &["a"]),
            Err(MiningError::UnregisteredKind { .. })
        ));
        assert!(matches!(
            AggregatorSpec::new("x", "sum", &[]),
            Err(MiningError::InvalidNumArgs { .. })
        ));
        assert!(matches!(
            AggregatorSpec::new("x", "goalsscore", &["a"]),
            Err(MiningError::InvalidNumArgs { .. })
        ));
        assert!(matches!(
            AggregatorSpec::new("x", "sum", &["a +"]),
            Err(MiningError::InvalidExpr { .. })
        ));
    }

    #[test]
    fn test_build_specs_order() {
        let user = vec![AggregatorSpec::must_new("numBig", "count", &["a > 2"])];
        let specs = build_specs(&["a".to_string()], user).unwrap();
        let names: Vec<&str> = specs.iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            vec!["numMatches", "percentMatches", "numBig", "goalsScore"]
        );
    }

    #[test]
    fn test_build_specs_rejects_bad_names() {
        let fields = vec!["band".to_string()];
        for (name, reserved) in [
            ("numMatches", true),
            ("goalsScore", true),
            ("numRecords", true),
            ("band", false),
        ] {
            let user = vec![AggregatorSpec::must_new(name, "count", &["true()"])];
            let err = build_specs(&fields, user).unwrap_err();
            if reserved {
                assert!(matches!(err, MiningError::NameReserved { .. }), "{name}");
            } else {
                assert!(matches!(err, MiningError::NameClash { .. }), "{name}");
            }
        }
        let user = vec![
            AggregatorSpec::must_new("x", "count", &["true()"]),
            AggregatorSpec::must_new("x", "count", &["true()"]),
        ];
        assert!(matches!(
            build_specs(&fields, user),
            Err(MiningError::NameClash { .. })
        ));
    }

    #[test]
    fn test_kind_round_trip() {
        for kind in [
            AggregatorKind::Count,
            AggregatorKind::Calc,
            AggregatorKind::Sum,
            AggregatorKind::Mean,
            AggregatorKind::Percent,
            AggregatorKind::Precision,
            AggregatorKind::Recall,
            AggregatorKind::GoalsScore,
        ] {
            assert_eq!(kind.name().parse::<AggregatorKind>().unwrap(), kind);
        }
    }
}
