//! Per-rule assessment state for one pass over a dataset.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::aggregator::{finalize, AggregatorInstance, AggregatorSpec, NUM_RECORDS};
use crate::error::{MiningError, Result};
use crate::goal::Goal;
use crate::rule::Rule;
use crate::value::{Record, Value};

/// Whether a goal passed for a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalAssessment {
    pub expr: String,
    pub passed: bool,
}

/// The finalized result of assessing one rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleAssessment {
    pub rule: Rule,
    /// Final aggregator values by name. `numRecords` is not included.
    pub aggregators: BTreeMap<String, Value>,
    pub goals: Vec<GoalAssessment>,
}

impl RuleAssessment {
    /// The value of an aggregator.
    pub fn aggregator(&self, name: &str) -> Option<&Value> {
        self.aggregators.get(name)
    }

    /// Number of records the rule matched, 0 if not known.
    pub fn num_matches(&self) -> i64 {
        self.aggregator("numMatches")
            .and_then(Value::as_int)
            .unwrap_or(0)
    }

    /// Whether every goal passed.
    pub fn all_goals_passed(&self) -> bool {
        self.goals.iter().all(|g| g.passed)
    }
}

/// Assesses a single rule, one record at a time.
///
/// Owns fresh aggregator instances; the goals are shared and read-only.
#[derive(Debug, Clone)]
pub struct RuleAssessor {
    rule: Rule,
    aggregators: Vec<AggregatorInstance>,
    goals: Arc<[Goal]>,
}

impl RuleAssessor {
    pub fn new(rule: Rule, specs: &[Arc<AggregatorSpec>], goals: Arc<[Goal]>) -> Self {
        Self {
            rule,
            aggregators: specs.iter().map(AggregatorSpec::new_instance).collect(),
            goals,
        }
    }

    pub fn rule(&self) -> &Rule {
        &self.rule
    }

    /// Evaluates the rule against `record` and feeds the outcome to every
    /// aggregator. Aggregator errors are wrapped with the aggregator name.
    pub fn next_record(&mut self, record: &Record) -> Result<()> {
        let rule_is_true = self.rule.evaluate(record)?;
        for inst in &mut self.aggregators {
            inst.consume(record, rule_is_true)
                .map_err(|e| MiningError::aggregator(inst.name(), e))?;
        }
        Ok(())
    }

    /// Finalizes the aggregators and evaluates the goals.
    pub fn finalize(&self, num_records: u64) -> Result<RuleAssessment> {
        let mut values = finalize(&self.aggregators, &self.goals, num_records)?;
        let goals = self
            .goals
            .iter()
            .map(|g| {
                Ok(GoalAssessment {
                    expr: g.source().to_string(),
                    passed: g.evaluate(&values)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        values.remove(NUM_RECORDS);
        Ok(RuleAssessment {
            rule: self.rule.clone(),
            aggregators: values.into_iter().collect(),
            goals,
        })
    }
}
