use std::collections::HashMap;
use std::sync::Arc;

use super::{AggregatorKind, AggregatorSpec};
use crate::error::{MiningError, Result};
use crate::expr::Expr;
use crate::goal::Goal;
use crate::value::{round_to, Record, Value};

/// Counters accumulated by an aggregator during a pass.
#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    /// count
    Count { n: i64 },
    /// sum and mean
    Sum { sum: f64, n: i64 },
    /// percent, precision and recall
    Ratio { num: i64, den: i64 },
    /// calc and goalsscore
    Stateless,
}

/// A per-rule aggregator: zeroed counters plus the shared spec.
#[derive(Debug, Clone)]
pub struct AggregatorInstance {
    spec: Arc<AggregatorSpec>,
    state: State,
}

impl AggregatorInstance {
    pub(super) fn new(spec: Arc<AggregatorSpec>) -> Self {
        let state = match spec.kind() {
            AggregatorKind::Count => State::Count { n: 0 },
            AggregatorKind::Sum | AggregatorKind::Mean => State::Sum { sum: 0.0, n: 0 },
            AggregatorKind::Percent | AggregatorKind::Precision | AggregatorKind::Recall => {
                State::Ratio { num: 0, den: 0 }
            }
            AggregatorKind::Calc | AggregatorKind::GoalsScore => State::Stateless,
        };
        Self { spec, state }
    }

    pub fn name(&self) -> &str {
        self.spec.name()
    }

    pub fn spec(&self) -> &Arc<AggregatorSpec> {
        &self.spec
    }

    /// Updates the counters with one record, given whether the rule was
    /// true for it.
    pub fn consume(&mut self, record: &Record, rule_is_true: bool) -> Result<()> {
        let kind = self.spec.kind();
        let Self { spec, state } = self;
        match (state, kind) {
            (State::Count { n }, _) => {
                if rule_is_true && eval_bool(spec, record)? {
                    *n += 1;
                }
            }
            (State::Sum { sum, n }, _) => {
                if rule_is_true {
                    *sum += eval_float(spec, record)?;
                    *n += 1;
                }
            }
            (State::Ratio { num, den }, AggregatorKind::Recall) => {
                if eval_bool(spec, record)? {
                    *den += 1;
                    if rule_is_true {
                        *num += 1;
                    }
                }
            }
            (State::Ratio { num, den }, _) => {
                if rule_is_true {
                    *den += 1;
                    if eval_bool(spec, record)? {
                        *num += 1;
                    }
                }
            }
            (State::Stateless, _) => {}
        }
        Ok(())
    }

    /// The final value of the aggregator.
    ///
    /// `aggregators` holds `numRecords` and the values of the aggregators
    /// finalized so far. Calling this more than once gives the same value.
    pub fn result(&self, aggregators: &HashMap<String, Value>, goals: &[Goal]) -> Result<Value> {
        Ok(match (self.state, self.spec.kind()) {
            (State::Count { n }, _) => Value::Int(n),
            (State::Sum { sum, .. }, AggregatorKind::Sum) => Value::Float(sum),
            (State::Sum { sum, n }, _) => {
                if n == 0 {
                    Value::Int(0)
                } else {
                    Value::rounded(sum / n as f64, 2)
                }
            }
            (State::Ratio { num, den }, _) => {
                if den == 0 {
                    Value::Int(0)
                } else {
                    Value::rounded(100.0 * num as f64 / den as f64, 2)
                }
            }
            (State::Stateless, AggregatorKind::GoalsScore) => goals_score(aggregators, goals)?,
            (State::Stateless, _) => {
                let expr = self.arg()?;
                let v = expr.eval(aggregators);
                if let Some(e) = v.error() {
                    return Err(MiningError::invalid_expr(expr.source(), e.clone()));
                }
                v
            }
        })
    }

    fn arg(&self) -> Result<&Expr> {
        spec_arg(&self.spec)
    }
}

fn spec_arg(spec: &AggregatorSpec) -> Result<&Expr> {
    spec.arg().ok_or_else(|| {
        MiningError::Internal(format!("aggregator {} has no expression", spec.name()))
    })
}

fn eval_bool(spec: &AggregatorSpec, record: &Record) -> Result<bool> {
    let expr = spec_arg(spec)?;
    expr.eval_bool(record)
        .map_err(|e| MiningError::invalid_expr(expr.source(), e))
}

fn eval_float(spec: &AggregatorSpec, record: &Record) -> Result<f64> {
    let expr = spec_arg(spec)?;
    expr.eval_float(record)
        .map_err(|e| MiningError::invalid_expr(expr.source(), e))
}

/// Each passing goal adds the current increment to the score; the first
/// failure drops the increment to 0.001 for the rest of the goals.
fn goals_score(aggregators: &HashMap<String, Value>, goals: &[Goal]) -> Result<Value> {
    let mut score = 0.0;
    let mut increment = 1.0;
    for goal in goals {
        if goal.evaluate(aggregators)? {
            score += increment;
        } else {
            increment = 0.001;
        }
    }
    Ok(Value::Float(round_to(score, 3)))
}

#[cfg(test)]
mod tests {
    use super::super::{build_specs, finalize};
    use super::*;
    use crate::error::ExprError;

    fn record(pairs: &[(&str, &str)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::from(*v)))
            .collect()
    }

    fn instance(name: &str, kind: &str, args: &[&str]) -> AggregatorInstance {
        Arc::new(AggregatorSpec::must_new(name, kind, args)).new_instance()
    }

    fn result(inst: &AggregatorInstance) -> Value {
        inst.result(&HashMap::new(), &[]).unwrap()
    }

    #[test]
    fn test_count() {
        let mut inst = instance("numBig", "count", &["a > 2"]);
        for (a, rule) in [("3", true), ("1", true), ("5", false), ("7", true)] {
            inst.consume(&record(&[("a", a)]), rule).unwrap();
        }
        assert_eq!(result(&inst), Value::Int(2));
        assert_eq!(result(&inst), Value::Int(2));
    }

    #[test]
    fn test_count_missing_variable_is_wrapped() {
        let specs = build_specs(
            &["a".to_string()],
            vec![AggregatorSpec::must_new("numBig", "count", &["bob > 2"])],
        )
        .unwrap();
        let mut instances: Vec<_> = specs.iter().map(|s| s.new_instance()).collect();
        let rec = record(&[("a", "3")]);
        let err = instances
            .iter_mut()
            .map(|i| {
                i.consume(&rec, true)
                    .map_err(|e| MiningError::aggregator(i.name(), e))
            })
            .find_map(|r| r.err())
            .unwrap();
        match err {
            MiningError::Aggregator { name, source } => {
                assert_eq!(name, "numBig");
                match *source {
                    MiningError::InvalidExpr { source, .. } => {
                        assert_eq!(source, ExprError::VarNotExist("bob".to_string()))
                    }
                    other => panic!("unexpected error: {other:?}"),
                }
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_sum_and_mean() {
        let mut sum = instance("totalProfit", "sum", &["income - cost"]);
        let mut mean = instance("meanProfit", "mean", &["income - cost"]);
        let rows = [
            ("3", "4.5", true),
            ("3", "3.2", true),
            ("2", "1.2", false),
            ("9", "2", true),
            ("3.98", "1.2", true),
        ];
        for (income, cost, rule) in rows {
            let rec = record(&[("income", income), ("cost", cost)]);
            sum.consume(&rec, rule).unwrap();
            mean.consume(&rec, rule).unwrap();
        }
        match result(&sum) {
            Value::Float(f) => assert!((f - 8.08).abs() < 1e-9),
            other => panic!("unexpected sum: {other:?}"),
        }
        assert_eq!(result(&mean), Value::Float(2.02));
    }

    #[test]
    fn test_sum_requires_numbers() {
        let mut sum = instance("total", "sum", &["a"]);
        let err = sum.consume(&record(&[("a", "x")]), true).unwrap_err();
        assert!(matches!(err, MiningError::InvalidExpr { .. }));
    }

    #[test]
    fn test_empty_denominators_give_zero() {
        for kind in ["mean", "percent", "precision", "recall"] {
            let mut inst = instance("x", kind, &["a > 1"]);
            inst.consume(&record(&[("a", "0")]), false).unwrap();
            assert_eq!(result(&inst), Value::Int(0), "{kind}");
        }
    }

    #[test]
    fn test_percent_precision_recall() {
        let rows = [
            ("1", true),
            ("1", true),
            ("0", true),
            ("1", false),
            ("0", false),
        ];
        let mut percent = instance("p", "percent", &["a == 1"]);
        let mut precision = instance("pr", "precision", &["a == 1"]);
        let mut recall = instance("rc", "recall", &["a == 1"]);
        for (a, rule) in rows {
            let rec = record(&[("a", a)]);
            percent.consume(&rec, rule).unwrap();
            precision.consume(&rec, rule).unwrap();
            recall.consume(&rec, rule).unwrap();
        }
        assert_eq!(result(&percent), Value::Float(66.67));
        assert_eq!(result(&precision), Value::Float(66.67));
        assert_eq!(result(&recall), Value::Float(66.67));
    }

    #[test]
    fn test_goals_score() {
        let goals: Vec<Goal> = ["a == 1", "b == 2", "c == 3"]
            .iter()
            .map(|g| Goal::must_new(g))
            .collect();
        let score = |a: i64, b: i64, c: i64| {
            let map: HashMap<String, Value> = [("a", a), ("b", b), ("c", c)]
                .into_iter()
                .map(|(k, v)| (k.to_string(), Value::Int(v)))
                .collect();
            instance("goalsScore", "goalsscore", &[])
                .result(&map, &goals)
                .unwrap()
        };
        assert_eq!(score(1, 2, 3), Value::Float(3.0));
        assert_eq!(score(0, 2, 3), Value::Float(0.002));
        assert_eq!(score(1, 0, 3), Value::Float(1.001));
        assert_eq!(score(0, 0, 0), Value::Float(0.0));
    }

    #[test]
    fn test_finalize_calc_sees_earlier_aggregators() {
        let specs = build_specs(
            &[],
            vec![
                AggregatorSpec::must_new("numBig", "count", &["a > 2"]),
                AggregatorSpec::must_new("ratio", "calc", &["roundto(numBig / numMatches, 2)"]),
            ],
        )
        .unwrap();
        let mut instances: Vec<_> = specs.iter().map(|s| s.new_instance()).collect();
        for (a, rule) in [("3", true), ("1", true), ("5", true), ("7", false)] {
            for inst in &mut instances {
                inst.consume(&record(&[("a", a)]), rule).unwrap();
            }
        }
        let values = finalize(&instances, &[Goal::must_new("numBig == 2")], 4).unwrap();
        assert_eq!(values["numRecords"], Value::Int(4));
        assert_eq!(values["numMatches"], Value::Int(3));
        assert_eq!(values["percentMatches"], Value::Float(75.0));
        assert_eq!(values["numBig"], Value::Int(2));
        assert_eq!(values["ratio"], Value::Float(0.67));
        assert_eq!(values["goalsScore"], Value::Float(1.0));
    }

    #[test]
    fn test_finalize_calc_cannot_see_later_aggregators() {
        let specs = build_specs(
            &[],
            vec![
                AggregatorSpec::must_new("early", "calc", &["late + 1"]),
                AggregatorSpec::must_new("late", "count", &["true()"]),
            ],
        )
        .unwrap();
        let instances: Vec<_> = specs.iter().map(|s| s.new_instance()).collect();
        let err = finalize(&instances, &[], 0).unwrap_err();
        assert!(matches!(err, MiningError::Aggregator { ref name, .. } if name == "early"));
    }
}
