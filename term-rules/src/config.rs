//! Mining configuration.
//!
//! A [`MiningConfig`] is plain data, typically read from JSON:
//!
//! ```json
//! {
//!   "rule_fields": ["income", "band"],
//!   "rule_complexity": { "arithmetic": true, "deny": { "EQFV": ["income"] } },
//!   "aggregators": [{ "name": "numBig", "kind": "count", "arg": "income > 2" }],
//!   "goals": ["numBig > 1"],
//!   "sort_order": [{ "aggregator": "goalsScore", "direction": "descending" }],
//!   "rules": ["income > cost"]
//! }
//! ```
//!
//! [`MiningConfig::compile`] validates it against the dataset's fields and
//! produces a [`MiningPlan`] ready for [`RuleMiner`](crate::miner::RuleMiner).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use crate::aggregator::{build_specs, AggregatorSpec};
use crate::assessment::{Direction, SortField};
use crate::error::{MiningError, Result};
use crate::generator::{generator_names, GenerationDescription};
use crate::goal::Goal;
use crate::rule::Rule;
use crate::runner::{RunnerConfig, DEFAULT_CHANNEL_CAPACITY};

/// Which kinds of rules may be generated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleComplexity {
    /// Generate Add/Mul rules.
    #[serde(default)]
    pub arithmetic: bool,
    /// Generator name to fields it must not use.
    #[serde(default)]
    pub deny: BTreeMap<String, Vec<String>>,
}

/// A user aggregator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatorConfig {
    pub name: String,
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arg: Option<String>,
}

impl AggregatorConfig {
    pub fn new(name: impl Into<String>, kind: impl Into<String>, arg: Option<&str>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            arg: arg.map(str::to_string),
        }
    }
}

/// One key of the ranking order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOrderConfig {
    pub aggregator: String,
    /// `ascending` or `descending`.
    pub direction: String,
}

impl SortOrderConfig {
    pub fn new(aggregator: impl Into<String>, direction: impl Into<String>) -> Self {
        Self {
            aggregator: aggregator.into(),
            direction: direction.into(),
        }
    }
}

fn default_max_num_rules() -> usize {
    100
}

fn default_tweak_top() -> usize {
    40
}

fn default_tweak_stages() -> u32 {
    1
}

fn default_combine_top() -> usize {
    30
}

fn default_num_workers() -> usize {
    num_cpus::get()
}

fn default_channel_capacity() -> usize {
    DEFAULT_CHANNEL_CAPACITY
}

/// Options for a mining run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MiningConfig {
    /// Fields rules may be generated for.
    pub rule_fields: Vec<String>,
    #[serde(default)]
    pub rule_complexity: RuleComplexity,
    #[serde(default)]
    pub aggregators: Vec<AggregatorConfig>,
    #[serde(default)]
    pub goals: Vec<String>,
    /// Ranking keys. Defaults to `goalsScore` then `numMatches`, descending.
    #[serde(default)]
    pub sort_order: Vec<SortOrderConfig>,
    /// Extra rules given as expressions.
    #[serde(default)]
    pub rules: Vec<String>,
    /// Number of rules kept, including True.
    #[serde(default = "default_max_num_rules")]
    pub max_num_rules: usize,
    /// Number of top rules tweaked in each stage.
    #[serde(default = "default_tweak_top")]
    pub tweak_top: usize,
    #[serde(default = "default_tweak_stages")]
    pub tweak_stages: u32,
    /// Number of top rules combined pairwise.
    #[serde(default = "default_combine_top")]
    pub combine_top: usize,
    #[serde(default = "default_num_workers")]
    pub num_workers: usize,
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl MiningConfig {
    pub fn new<S: Into<String>>(rule_fields: impl IntoIterator<Item = S>) -> Self {
        Self {
            rule_fields: rule_fields.into_iter().map(Into::into).collect(),
            rule_complexity: RuleComplexity::default(),
            aggregators: Vec::new(),
            goals: Vec::new(),
            sort_order: Vec::new(),
            rules: Vec::new(),
            max_num_rules: default_max_num_rules(),
            tweak_top: default_tweak_top(),
            tweak_stages: default_tweak_stages(),
            combine_top: default_combine_top(),
            num_workers: default_num_workers(),
            channel_capacity: default_channel_capacity(),
        }
    }

    /// Parses a configuration from JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn with_arithmetic(mut self, arithmetic: bool) -> Self {
        self.rule_complexity.arithmetic = arithmetic;
        self
    }

    pub fn with_deny(mut self, generator: impl Into<String>, fields: Vec<String>) -> Self {
        self.rule_complexity.deny.insert(generator.into(), fields);
        self
    }

    pub fn with_aggregator(
        mut self,
        name: impl Into<String>,
        kind: impl Into<String>,
        arg: Option<&str>,
    ) -> Self {
        self.aggregators.push(AggregatorConfig::new(name, kind, arg));
        self
    }

    pub fn with_goal(mut self, goal: impl Into<String>) -> Self {
        self.goals.push(goal.into());
        self
    }

    pub fn with_sort(mut self, aggregator: impl Into<String>, direction: impl Into<String>) -> Self {
        self.sort_order.push(SortOrderConfig::new(aggregator, direction));
        self
    }

    pub fn with_rule(mut self, rule: impl Into<String>) -> Self {
        self.rules.push(rule.into());
        self
    }

    pub fn with_max_num_rules(mut self, n: usize) -> Self {
        self.max_num_rules = n;
        self
    }

    pub fn with_tweak_top(mut self, n: usize) -> Self {
        self.tweak_top = n;
        self
    }

    pub fn with_tweak_stages(mut self, n: u32) -> Self {
        self.tweak_stages = n;
        self
    }

    pub fn with_combine_top(mut self, n: usize) -> Self {
        self.combine_top = n;
        self
    }

    pub fn with_workers(mut self, n: usize) -> Self {
        self.num_workers = n;
        self
    }

    pub fn with_channel_capacity(mut self, n: usize) -> Self {
        self.channel_capacity = n;
        self
    }

    /// Validates the configuration against the dataset's fields.
    pub fn compile(&self, field_names: &[String]) -> Result<MiningPlan> {
        if self.rule_fields.is_empty() {
            return Err(MiningError::NoRuleFieldsSpecified);
        }
        let known = |name: &str| field_names.iter().any(|f| f == name);
        if let Some(name) = self.rule_fields.iter().find(|f| !known(f)) {
            return Err(MiningError::InvalidRuleField { name: name.clone() });
        }

        let generators = generator_names();
        for (generator, fields) in &self.rule_complexity.deny {
            if !generators.contains(&generator.as_str()) {
                return Err(MiningError::Configuration(format!(
                    "unknown generator in deny list: {generator}"
                )));
            }
            if let Some(name) = fields.iter().find(|f| !known(f)) {
                return Err(MiningError::InvalidRuleField { name: name.clone() });
            }
        }

        let user_specs = self
            .aggregators
            .iter()
            .map(|a| {
                let args: Vec<&str> = a.arg.as_deref().into_iter().collect();
                AggregatorSpec::new(&a.name, &a.kind, &args)
            })
            .collect::<Result<Vec<_>>>()?;
        let specs = build_specs(field_names, user_specs)?;

        let goals = self
            .goals
            .iter()
            .map(|g| Goal::new(g))
            .collect::<Result<Vec<_>>>()?;

        let sort_order = if self.sort_order.is_empty() {
            vec![
                SortField::descending("goalsScore"),
                SortField::descending("numMatches"),
            ]
        } else {
            self.sort_order
                .iter()
                .map(|s| {
                    let direction: Direction = s.direction.parse()?;
                    if !specs.iter().any(|spec| spec.name() == s.aggregator) {
                        return Err(MiningError::InvalidSortField {
                            name: s.aggregator.clone(),
                        });
                    }
                    Ok(SortField::new(s.aggregator.clone(), direction))
                })
                .collect::<Result<Vec<_>>>()?
        };

        let rules = self
            .rules
            .iter()
            .map(|src| {
                let rule = Rule::dynamic(src)?;
                if let Some(name) = rule.fields().into_iter().find(|f| !known(f)) {
                    return Err(MiningError::InvalidRuleField { name });
                }
                Ok(rule)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(MiningPlan {
            generation: GenerationDescription {
                fields: self.rule_fields.clone(),
                arithmetic: self.rule_complexity.arithmetic,
                deny: self.rule_complexity.deny.clone(),
            },
            specs,
            goals: goals.into(),
            sort_order,
            rules,
            max_num_rules: self.max_num_rules.max(1),
            tweak_top: self.tweak_top,
            tweak_stages: self.tweak_stages,
            combine_top: self.combine_top,
            runner: RunnerConfig::default()
                .with_workers(self.num_workers.max(1))
                .with_channel_capacity(self.channel_capacity.max(1)),
        })
    }
}

/// A validated [`MiningConfig`].
#[derive(Debug, Clone)]
pub struct MiningPlan {
    pub generation: GenerationDescription,
    /// Aggregators with the defaults injected, in finalization order.
    pub specs: Vec<Arc<AggregatorSpec>>,
    pub goals: Arc<[Goal]>,
    pub sort_order: Vec<SortField>,
    /// User supplied rules.
    pub rules: Vec<Rule>,
    pub max_num_rules: usize,
    pub tweak_top: usize,
    pub tweak_stages: u32,
    pub combine_top: usize,
    pub runner: RunnerConfig,
}
