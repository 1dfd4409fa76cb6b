//! Output formats for mining reports.
//!
//! [`JsonFormatter`] is meant for programs, [`HumanFormatter`] for terminals
//! and [`MarkdownFormatter`] for documents. All of them honor a
//! [`FormatterConfig`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use term_rules::formatters::{HumanFormatter, ReportFormatter};
//! # use term_rules::miner::MiningReport;
//! # fn example(report: &MiningReport) -> term_rules::error::Result<()> {
//! let output = HumanFormatter::new().format(report)?;
//! println!("{output}");
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write;

use crate::assessor::{GoalAssessment, RuleAssessment};
use crate::error::Result;
use crate::miner::MiningReport;
use crate::value::Value;

/// Options shared by the formatters.
#[derive(Debug, Clone)]
pub struct FormatterConfig {
    /// Maximum number of rules to show, `None` for all
    pub max_rules: Option<usize>,
    /// Include every aggregator value of each rule
    pub include_aggregators: bool,
    /// Include the goal results of each rule
    pub include_goals: bool,
    /// Include the start and finish times
    pub include_timestamps: bool,
    /// Colorize the human formatter's output
    pub use_colors: bool,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            max_rules: None,
            include_aggregators: true,
            include_goals: true,
            include_timestamps: true,
            use_colors: true,
        }
    }
}

impl FormatterConfig {
    /// Rules only.
    pub fn minimal() -> Self {
        Self {
            max_rules: None,
            include_aggregators: false,
            include_goals: false,
            include_timestamps: false,
            use_colors: false,
        }
    }

    /// Suitable for CI logs.
    pub fn ci() -> Self {
        Self {
            max_rules: Some(20),
            include_aggregators: true,
            include_goals: true,
            include_timestamps: true,
            use_colors: false,
        }
    }

    pub fn with_max_rules(mut self, max: usize) -> Self {
        self.max_rules = Some(max);
        self
    }

    pub fn with_aggregators(mut self, include: bool) -> Self {
        self.include_aggregators = include;
        self
    }

    pub fn with_goals(mut self, include: bool) -> Self {
        self.include_goals = include;
        self
    }

    pub fn with_timestamps(mut self, include: bool) -> Self {
        self.include_timestamps = include;
        self
    }

    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    fn shown<'a>(&self, report: &'a MiningReport) -> &'a [RuleAssessment] {
        let all = report.assessment.rule_assessments();
        match self.max_rules {
            Some(max) => &all[..max.min(all.len())],
            None => all,
        }
    }
}

/// Renders a [`MiningReport`] as text.
pub trait ReportFormatter {
    fn format(&self, report: &MiningReport) -> Result<String>;

    /// Formats with `config` instead of the formatter's own configuration.
    fn format_with_config(&self, report: &MiningReport, _config: &FormatterConfig) -> Result<String> {
        self.format(report)
    }
}

#[derive(Serialize)]
struct ReportView<'a> {
    num_records: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    finished_at: Option<DateTime<Utc>>,
    num_rules: usize,
    rules: Vec<RuleView<'a>>,
}

#[derive(Serialize)]
struct RuleView<'a> {
    rule: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    aggregators: Option<&'a BTreeMap<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    goals: Option<&'a [GoalAssessment]>,
}

/// Formats reports as JSON.
#[derive(Debug, Clone)]
pub struct JsonFormatter {
    config: FormatterConfig,
    pretty: bool,
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self::with_config(FormatterConfig::default())
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self {
            config,
            pretty: true,
        }
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportFormatter for JsonFormatter {
    fn format(&self, report: &MiningReport) -> Result<String> {
        self.format_with_config(report, &self.config)
    }

    fn format_with_config(&self, report: &MiningReport, config: &FormatterConfig) -> Result<String> {
        let view = ReportView {
            num_records: report.num_records,
            started_at: config.include_timestamps.then_some(report.started_at),
            finished_at: config.include_timestamps.then_some(report.finished_at),
            num_rules: report.assessment.len(),
            rules: config
                .shown(report)
                .iter()
                .map(|ra| RuleView {
                    rule: ra.rule.to_string(),
                    aggregators: config.include_aggregators.then_some(&ra.aggregators),
                    goals: config.include_goals.then_some(ra.goals.as_slice()),
                })
                .collect(),
        };
        let json = if self.pretty {
            serde_json::to_string_pretty(&view)?
        } else {
            serde_json::to_string(&view)?
        };
        Ok(json)
    }
}

/// Formats reports for reading in a terminal.
#[derive(Debug, Clone, Default)]
pub struct HumanFormatter {
    config: FormatterConfig,
}

impl HumanFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self { config }
    }
}

impl ReportFormatter for HumanFormatter {
    fn format(&self, report: &MiningReport) -> Result<String> {
        self.format_with_config(report, &self.config)
    }

    fn format_with_config(&self, report: &MiningReport, config: &FormatterConfig) -> Result<String> {
        let mut output = String::new();
        let bold = |s: &str| {
            if config.use_colors {
                format!("\x1b[1m{s}\x1b[0m")
            } else {
                s.to_string()
            }
        };

        writeln!(output)?;
        writeln!(output, "{}", bold("Rule Mining Report"))?;
        writeln!(output, "Records: {}", report.num_records)?;
        writeln!(output, "Rules: {}", report.assessment.len())?;
        if config.include_timestamps {
            writeln!(output, "Started: {}", report.started_at.to_rfc3339())?;
            writeln!(
                output,
                "Duration: {}ms",
                report.duration().num_milliseconds()
            )?;
        }

        let shown = config.shown(report);
        for (i, ra) in shown.iter().enumerate() {
            writeln!(output)?;
            let marker = if !config.include_goals {
                ""
            } else if ra.all_goals_passed() {
                "✅ "
            } else {
                "❌ "
            };
            writeln!(output, "{marker}{}. {}", i + 1, bold(&ra.rule.to_string()))?;
            if config.include_aggregators {
                for (name, value) in &ra.aggregators {
                    writeln!(output, "   {name}: {value}")?;
                }
            }
            if config.include_goals {
                for goal in &ra.goals {
                    let status = if goal.passed { "passed" } else { "failed" };
                    writeln!(output, "   goal {}: {status}", goal.expr)?;
                }
            }
        }
        let hidden = report.assessment.len() - shown.len();
        if hidden > 0 {
            writeln!(output)?;
            writeln!(output, "   ... and {hidden} more rules")?;
        }
        writeln!(output)?;
        Ok(output)
    }
}

/// Formats reports as Markdown.
#[derive(Debug, Clone)]
pub struct MarkdownFormatter {
    config: FormatterConfig,
    heading_level: u8,
}

impl MarkdownFormatter {
    pub fn new() -> Self {
        Self::with_config(FormatterConfig::default())
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self {
            config,
            heading_level: 2,
        }
    }

    /// Sets the base heading level, clamped to 1..=5.
    pub fn with_heading_level(mut self, level: u8) -> Self {
        self.heading_level = level.clamp(1, 5);
        self
    }
}

impl Default for MarkdownFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportFormatter for MarkdownFormatter {
    fn format(&self, report: &MiningReport) -> Result<String> {
        self.format_with_config(report, &self.config)
    }

    fn format_with_config(&self, report: &MiningReport, config: &FormatterConfig) -> Result<String> {
        let mut output = String::new();
        let h = "#".repeat(self.heading_level as usize);

        writeln!(output, "{h} Rule Mining Report")?;
        writeln!(output)?;
        writeln!(output, "**Records:** {}", report.num_records)?;
        writeln!(output, "**Rules:** {}", report.assessment.len())?;
        if config.include_timestamps {
            writeln!(output, "**Started:** {}", report.started_at.to_rfc3339())?;
            writeln!(output, "**Finished:** {}", report.finished_at.to_rfc3339())?;
        }

        let shown = config.shown(report);
        writeln!(output)?;
        writeln!(output, "{h}# Rules")?;
        writeln!(output)?;

        let columns: Vec<&String> = match (config.include_aggregators, shown.first()) {
            (true, Some(first)) => first.aggregators.keys().collect(),
            _ => Vec::new(),
        };
        write!(output, "| # | Rule |")?;
        for name in &columns {
            write!(output, " {name} |")?;
        }
        if config.include_goals {
            write!(output, " Goals |")?;
        }
        writeln!(output)?;
        write!(output, "|---|------|")?;
        for _ in &columns {
            write!(output, "---|")?;
        }
        if config.include_goals {
            write!(output, "---|")?;
        }
        writeln!(output)?;

        for (i, ra) in shown.iter().enumerate() {
            write!(output, "| {} | `{}` |", i + 1, escape_cell(&ra.rule.to_string()))?;
            for name in &columns {
                match ra.aggregators.get(name.as_str()) {
                    Some(value) => write!(output, " {value} |")?,
                    None => write!(output, " |")?,
                }
            }
            if config.include_goals {
                let passed = ra.goals.iter().filter(|g| g.passed).count();
                write!(output, " {passed}/{} |", ra.goals.len())?;
            }
            writeln!(output)?;
        }

        let hidden = report.assessment.len() - shown.len();
        if hidden > 0 {
            writeln!(output)?;
            writeln!(output, "> **Note:** {hidden} additional rules not shown.")?;
        }
        Ok(output)
    }
}

fn escape_cell(s: &str) -> String {
    s.replace('|', "\\|")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assessment::Assessment;
    use crate::description::DatasetDescription;
    use crate::rule::Rule;
    use chrono::TimeZone;

    fn rule_assessment(rule: Rule, num_matches: i64, passed: bool) -> RuleAssessment {
        let aggregators: BTreeMap<String, Value> = [
            ("goalsScore", Value::Float(if passed { 1.0 } else { 0.0 })),
            ("numMatches", Value::Int(num_matches)),
            ("percentMatches", Value::Float(num_matches as f64 * 10.0)),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        RuleAssessment {
            rule,
            aggregators,
            goals: vec![GoalAssessment {
                expr: "numMatches > 2".to_string(),
                passed,
            }],
        }
    }

    fn report() -> MiningReport {
        let started_at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        MiningReport {
            num_records: 10,
            started_at,
            finished_at: started_at + chrono::Duration::milliseconds(250),
            description: DatasetDescription::new(),
            assessment: Assessment::with_rule_assessments(
                10,
                vec![
                    rule_assessment(Rule::or(Rule::ge_fv("band", 4), Rule::eq_fv("id", 1)).unwrap(), 4, true),
                    rule_assessment(Rule::le_fv("band", 2), 3, true),
                    rule_assessment(Rule::True, 10, false),
                ],
            ),
        }
    }

    #[test]
    fn test_json_formatter() {
        let json = JsonFormatter::new().format(&report()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["num_records"], 10);
        assert_eq!(parsed["num_rules"], 3);
        assert_eq!(parsed["rules"][1]["rule"], "band <= 2");
        assert_eq!(parsed["rules"][2]["rule"], "true()");
        assert_eq!(parsed["rules"][0]["aggregators"]["numMatches"], "4");
        assert_eq!(parsed["rules"][2]["goals"][0]["passed"], false);
        assert!(parsed.get("started_at").is_some());
    }

    #[test]
    fn test_json_formatter_minimal() {
        let formatter = JsonFormatter::with_config(FormatterConfig::minimal().with_max_rules(1))
            .with_pretty(false);
        let json = formatter.format(&report()).unwrap();
        assert!(!json.contains('\n'));
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["rules"].as_array().unwrap().len(), 1);
        assert!(parsed["rules"][0].get("aggregators").is_none());
        assert!(parsed["rules"][0].get("goals").is_none());
        assert!(parsed.get("started_at").is_none());
    }

    #[test]
    fn test_human_formatter() {
        let formatter = HumanFormatter::with_config(FormatterConfig::default().with_colors(false));
        let output = formatter.format(&report()).unwrap();
        assert!(output.contains("Rule Mining Report"));
        assert!(output.contains("Records: 10"));
        assert!(output.contains("✅ 2. band <= 2"));
        assert!(output.contains("❌ 3. true()"));
        assert!(output.contains("   numMatches: 3"));
        assert!(output.contains("goal numMatches > 2: failed"));
        assert!(output.contains("Duration: 250ms"));
        assert!(!output.contains("\x1b["));

        let output = HumanFormatter::with_config(FormatterConfig::ci().with_max_rules(1))
            .format(&report())
            .unwrap();
        assert!(output.contains("... and 2 more rules"));
    }

    #[test]
    fn test_markdown_formatter() {
        let output = MarkdownFormatter::new()
            .with_heading_level(3)
            .format(&report())
            .unwrap();
        assert!(output.starts_with("### Rule Mining Report"));
        assert!(output.contains("#### Rules"));
        assert!(output.contains("| # | Rule | goalsScore | numMatches | percentMatches | Goals |"));
        assert!(output.contains("| 1 | `band >= 4 \\|\\| id == 1` | 1 | 4 | 40 | 1/1 |"));
        assert!(output.contains("| 3 | `true()` | 0 | 10 | 100 | 0/1 |"));
    }
}
