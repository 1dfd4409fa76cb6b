//! # Term Rules - Interpretable Rule Mining for Rust
//!
//! Term Rules finds simple, human-readable rules that describe interesting
//! subsets of a tabular dataset, such as `band >= 4 && income > cost`, and
//! ranks them against goals you define.
//!
//! ## Overview
//!
//! A mining run describes the dataset, generates candidate rules from that
//! description, assesses every rule against every record with a set of
//! aggregators, and keeps the best rules. The best rules are then tweaked,
//! their thresholds rounded and pairs of them combined, with each round
//! reassessed and merged into the ranking. The final ranking always ends with
//! the `true()` rule, which matches every record and serves as the baseline.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use term_rules::prelude::*;
//!
//! # async fn example() -> Result<()> {
//! let dataset: Arc<dyn Dataset> = Arc::new(LiteralDataset::from_strings(
//!     vec!["band", "success"],
//!     &[&["1", "n"], &["2", "n"], &["4", "y"], &["5", "y"], &["4", "y"]],
//! )?);
//!
//! let config = MiningConfig::new(["band"])
//!     .with_aggregator("numSuccess", "count", Some("success == \"y\""))
//!     .with_aggregator("percentSuccess", "precision", Some("success == \"y\""))
//!     .with_goal("percentSuccess >= 90")
//!     .with_sort("percentSuccess", "descending");
//!
//! let miner = RuleMiner::new(&config, &dataset.fields())?;
//! let report = miner.mine(dataset).await?;
//! for ra in report.assessment.rule_assessments() {
//!     println!("{} {:?}", ra.rule, ra.aggregator("percentSuccess"));
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Aggregators
//!
//! Every rule is assessed with `numMatches`, `percentMatches` and
//! `goalsScore`, plus the aggregators you configure. The available kinds are
//! `count`, `calc`, `sum`, `mean`, `percent`, `precision`, `recall` and
//! `goalsscore`. `calc` aggregators are expressions over earlier aggregators
//! and `numRecords`.
//!
//! ## Data Sources
//!
//! Records come from any [`dataset::Dataset`]. CSV files are loaded through
//! DataFusion with [`dataset::CsvSource`], and Arrow record batches can be
//! wrapped directly with [`dataset::RecordBatchDataset`].
//!
//! ## Building Blocks
//!
//! The pipeline stages are usable on their own: [`generator::generate`],
//! [`runner::RuleAssessmentRunner`], [`assessment::Assessment`] (sort, refine,
//! merge, truncate), [`tweaker`] and [`combiner`]. For records that arrive
//! one at a time, use [`runner::RuleAssessmentSession`].
//!
//! ## Observability
//!
//! Every stage emits `tracing` spans and events. [`logging::setup::init_logging`]
//! installs a subscriber for applications without one.

pub mod aggregator;
pub mod assessment;
pub mod assessor;
pub mod combiner;
pub mod config;
pub mod dataset;
pub mod description;
pub mod error;
pub mod expr;
pub mod formatters;
pub mod generator;
pub mod goal;
pub mod logging;
pub mod miner;
pub mod prelude;
pub mod rule;
pub mod runner;
pub mod tweaker;
pub mod value;
