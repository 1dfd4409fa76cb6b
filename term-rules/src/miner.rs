//! The top-level mining driver.
//!
//! [`RuleMiner`] turns a dataset into a ranked list of rules:
//!
//! 1. describe the dataset and generate candidate rules from the description,
//!    together with any user supplied rules
//! 2. assess them, sort and refine
//! 3. tweak the thresholds of the best rules, once per tweak stage
//! 4. round the thresholds of the best rules to fewer decimal places
//! 5. combine the best rules pairwise
//! 6. truncate to the configured number of rules
//!
//! Every pass after the first only assesses rules that haven't been assessed
//! yet and merges them into the running assessment.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use term_rules::prelude::*;
//!
//! # async fn example() -> Result<()> {
//! let dataset = CsvSource::new("loans.csv")?.load().await?;
//! let config = MiningConfig::new(["income", "band"]).with_goal("numMatches > 10");
//! let miner = RuleMiner::new(&config, &dataset.fields())?;
//! let report = miner.mine(dataset).await?;
//! for rule in report.assessment.rules(Some(5)) {
//!     println!("{rule}");
//! }
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, instrument};

use crate::assessment::Assessment;
use crate::combiner::combine;
use crate::config::{MiningConfig, MiningPlan};
use crate::dataset::Dataset;
use crate::description::DatasetDescription;
use crate::error::{MiningError, Result};
use crate::generator::generate;
use crate::logging::{truncate_field, LogConfig};
use crate::rule::Rule;
use crate::runner::RuleAssessmentRunner;
use crate::tweaker::{reduce_dp, tweak_rules};
use crate::{log_data_op, log_stage};

/// The outcome of a mining run.
#[derive(Debug, Clone, Serialize)]
pub struct MiningReport {
    pub num_records: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub description: DatasetDescription,
    /// Sorted, refined and truncated. The True rule is last.
    pub assessment: Assessment,
}

impl MiningReport {
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Mines rules from datasets according to a [`MiningPlan`].
#[derive(Debug, Clone)]
pub struct RuleMiner {
    plan: MiningPlan,
    runner: RuleAssessmentRunner,
    log: LogConfig,
    cancel: Option<watch::Receiver<bool>>,
}

impl RuleMiner {
    /// Validates `config` against the dataset's field names.
    pub fn new(config: &MiningConfig, field_names: &[String]) -> Result<Self> {
        Ok(Self::from_plan(config.compile(field_names)?))
    }

    pub fn from_plan(plan: MiningPlan) -> Self {
        let runner = RuleAssessmentRunner::new(plan.runner.clone());
        Self {
            plan,
            runner,
            log: LogConfig::default(),
            cancel: None,
        }
    }

    pub fn with_log_config(mut self, log: LogConfig) -> Self {
        self.log = log;
        self
    }

    /// Stops every pass once the receiver observes `true`.
    pub fn with_cancellation(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn plan(&self) -> &MiningPlan {
        &self.plan
    }

    /// Describes `dataset`, then mines it.
    pub async fn mine(&self, dataset: Arc<dyn Dataset>) -> Result<MiningReport> {
        let started_at = Utc::now();
        let description = {
            let dataset = dataset.clone();
            tokio::task::spawn_blocking(move || DatasetDescription::describe(dataset.as_ref()))
                .await??
        };
        log_data_op!(
            self.log,
            fields = description.fields.len(),
            "described dataset"
        );
        self.run(dataset, description, started_at).await
    }

    /// Mines `dataset` using an existing description of it.
    pub async fn mine_with_description(
        &self,
        dataset: Arc<dyn Dataset>,
        description: DatasetDescription,
    ) -> Result<MiningReport> {
        self.run(dataset, description, Utc::now()).await
    }

    #[instrument(skip_all, fields(rule_fields = self.plan.generation.fields.len()))]
    async fn run(
        &self,
        dataset: Arc<dyn Dataset>,
        description: DatasetDescription,
        started_at: DateTime<Utc>,
    ) -> Result<MiningReport> {
        let plan = &self.plan;

        let mut rules = generate(&description, &plan.generation);
        rules.extend(plan.rules.iter().cloned());
        info!(num_rules = rules.len(), "generated rules");
        let mut assessment = self.assess(&dataset, rules).await?;
        assessment.sort(&plan.sort_order);
        assessment.refine()?;
        self.log_pass("generate", &assessment);

        for stage in 1..=plan.tweak_stages {
            let top = top_rules(&assessment, plan.tweak_top);
            let tweaked = tweak_rules(stage, &top, &description);
            assessment = self.extend(&dataset, assessment, tweaked, "tweak").await?;
        }

        let top = top_rules(&assessment, plan.tweak_top);
        assessment = self
            .extend(&dataset, assessment, reduce_dp(&top), "reduce_dp")
            .await?;

        let top = top_rules(&assessment, plan.combine_top);
        assessment = self
            .extend(&dataset, assessment, combine(&top), "combine")
            .await?;

        assessment.truncate(plan.max_num_rules)?;
        let finished_at = Utc::now();
        info!(
            num_records = assessment.num_records(),
            num_rules = assessment.len(),
            elapsed_ms = (finished_at - started_at).num_milliseconds(),
            "mining complete"
        );
        Ok(MiningReport {
            num_records: assessment.num_records(),
            started_at,
            finished_at,
            description,
            assessment,
        })
    }

    async fn assess(&self, dataset: &Arc<dyn Dataset>, rules: Vec<Rule>) -> Result<Assessment> {
        if self.cancel.as_ref().is_some_and(|c| *c.borrow()) {
            return Err(MiningError::Cancelled);
        }
        self.runner
            .assess(
                dataset.clone(),
                rules,
                &self.plan.specs,
                self.plan.goals.clone(),
                self.cancel.clone(),
            )
            .await
    }

    /// Assesses the rules not yet in `assessment` and merges them in.
    async fn extend(
        &self,
        dataset: &Arc<dyn Dataset>,
        assessment: Assessment,
        candidates: Vec<Rule>,
        pass: &str,
    ) -> Result<Assessment> {
        let mut seen: HashSet<String> = assessment
            .rule_assessments()
            .iter()
            .map(|ra| ra.rule.to_string())
            .collect();
        let fresh: Vec<Rule> = candidates
            .into_iter()
            .filter(|r| seen.insert(r.to_string()))
            .collect();
        if fresh.is_empty() {
            debug!(pass, "no new rules, skipping pass");
            return Ok(assessment);
        }
        debug!(pass, num_rules = fresh.len(), "assessing new rules");
        let fresh = self.assess(dataset, fresh).await?;
        let mut merged = assessment.merge(&fresh)?;
        merged.sort(&self.plan.sort_order);
        merged.refine()?;
        self.log_pass(pass, &merged);
        Ok(merged)
    }

    fn log_pass(&self, pass: &str, assessment: &Assessment) {
        log_stage!(self.log, pass, num_rules = assessment.len(), "pass complete");
        for (i, rule) in assessment
            .rules(Some(self.log.log_top_rules))
            .into_iter()
            .enumerate()
        {
            let rule = truncate_field(&rule.to_string(), self.log.max_field_length);
            debug!(pass, rank = i + 1, %rule, "top rule");
        }
    }
}

fn top_rules(assessment: &Assessment, n: usize) -> Vec<Rule> {
    assessment.rules(Some(n)).into_iter().cloned().collect()
}
