//! Ranked collections of rule assessments.
//!
//! An [`Assessment`] is built from one or more passes over the same dataset.
//! It is ranked with [`Assessment::sort`], pruned with
//! [`Assessment::refine`] and cut down with [`Assessment::truncate`]. The
//! True rule always ends up last: it is the baseline every other rule is
//! measured against.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::assessor::RuleAssessment;
use crate::error::{MiningError, Result};
use crate::rule::Rule;

/// Sort direction for an aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Ascending,
    Descending,
}

impl FromStr for Direction {
    type Err = MiningError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ascending" => Ok(Direction::Ascending),
            "descending" => Ok(Direction::Descending),
            _ => Err(MiningError::InvalidSortDirection {
                direction: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Ascending => f.write_str("ascending"),
            Direction::Descending => f.write_str("descending"),
        }
    }
}

/// One key of a sort order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortField {
    pub aggregator: String,
    pub direction: Direction,
}

impl SortField {
    pub fn new(aggregator: impl Into<String>, direction: Direction) -> Self {
        Self {
            aggregator: aggregator.into(),
            direction,
        }
    }

    pub fn ascending(aggregator: impl Into<String>) -> Self {
        Self::new(aggregator, Direction::Ascending)
    }

    pub fn descending(aggregator: impl Into<String>) -> Self {
        Self::new(aggregator, Direction::Descending)
    }
}

/// The assessments of many rules over one dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assessment {
    num_records: u64,
    rule_assessments: Vec<RuleAssessment>,
    sorted: bool,
    refined: bool,
}

impl Assessment {
    pub fn new(num_records: u64) -> Self {
        Self {
            num_records,
            rule_assessments: Vec::new(),
            sorted: false,
            refined: false,
        }
    }

    pub fn with_rule_assessments(num_records: u64, rule_assessments: Vec<RuleAssessment>) -> Self {
        Self {
            num_records,
            rule_assessments,
            sorted: false,
            refined: false,
        }
    }

    pub fn num_records(&self) -> u64 {
        self.num_records
    }

    pub fn rule_assessments(&self) -> &[RuleAssessment] {
        &self.rule_assessments
    }

    pub fn len(&self) -> usize {
        self.rule_assessments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rule_assessments.is_empty()
    }

    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    pub fn is_refined(&self) -> bool {
        self.refined
    }

    /// Appends rule assessments, clearing the sorted and refined flags.
    pub fn add(&mut self, rule_assessments: impl IntoIterator<Item = RuleAssessment>) {
        self.rule_assessments.extend(rule_assessments);
        self.sorted = false;
        self.refined = false;
    }

    /// Rules in assessment order, at most `limit` of them.
    pub fn rules(&self, limit: Option<usize>) -> Vec<&Rule> {
        let n = limit.unwrap_or(usize::MAX);
        self.rule_assessments.iter().take(n).map(|ra| &ra.rule).collect()
    }

    /// Stable sort by the given aggregators; the True rule is moved last.
    ///
    /// Values that don't coerce to a number compare equal to each other and
    /// rank after all numbers, whatever the direction.
    pub fn sort(&mut self, order: &[SortField]) {
        self.rule_assessments.sort_by(|a, b| compare(a, b, order));
        // sort_by is stable, so the True rules keep their relative order
        self.rule_assessments.sort_by_key(|ra| ra.rule.is_true());
        self.sorted = true;
        self.refined = false;
    }

    /// Drops rules that match at most one record, rules that match exactly
    /// the same records as a better rule, and rules that overlap a better
    /// rule. Repeated until nothing more is dropped.
    ///
    /// Requires a sorted assessment containing the True rule.
    pub fn refine(&mut self) -> Result<()> {
        if !self.sorted {
            return Err(MiningError::InvalidState(
                "assessment must be sorted before refining".to_string(),
            ));
        }
        loop {
            let before = self.rule_assessments.len();
            self.exclude_poor_rules()?;
            self.exclude_same_records_rules();
            self.exclude_poorer_overlapping_rules();
            if self.rule_assessments.len() == before {
                break;
            }
        }
        self.refined = true;
        Ok(())
    }

    /// Keeps the first `n - 1` rules and the final True rule.
    ///
    /// Requires a sorted and refined assessment.
    pub fn truncate(&mut self, n: usize) -> Result<()> {
        if !self.sorted || !self.refined {
            return Err(MiningError::InvalidState(
                "assessment must be sorted and refined before truncating".to_string(),
            ));
        }
        let Some(last) = self.rule_assessments.pop() else {
            return Err(MiningError::InvalidState(
                "can't truncate an empty assessment".to_string(),
            ));
        };
        if !last.rule.is_true() {
            return Err(MiningError::InvalidState(
                "final rule isn't the True rule".to_string(),
            ));
        }
        self.rule_assessments.truncate(n.saturating_sub(1));
        self.rule_assessments.push(last);
        Ok(())
    }

    /// Concatenates two assessments of the same dataset.
    pub fn merge(&self, other: &Assessment) -> Result<Assessment> {
        if self.num_records != other.num_records {
            return Err(MiningError::NumRecordsChanged {
                expected: self.num_records,
                got: other.num_records,
            });
        }
        let mut rule_assessments = self.rule_assessments.clone();
        rule_assessments.extend(other.rule_assessments.iter().cloned());
        Ok(Assessment::with_rule_assessments(
            self.num_records,
            rule_assessments,
        ))
    }

    /// True when both assessments hold the same rule assessments, in any
    /// order, over the same number of records.
    pub fn is_equal(&self, other: &Assessment) -> bool {
        if self.num_records != other.num_records
            || self.rule_assessments.len() != other.rule_assessments.len()
        {
            return false;
        }
        let key = |ra: &&RuleAssessment| ra.rule.to_string();
        let mut a: Vec<&RuleAssessment> = self.rule_assessments.iter().collect();
        let mut b: Vec<&RuleAssessment> = other.rule_assessments.iter().collect();
        a.sort_by_key(key);
        b.sort_by_key(key);
        a == b
    }

    fn exclude_poor_rules(&mut self) -> Result<()> {
        let Some(true_at) = self.rule_assessments.iter().position(|ra| ra.rule.is_true()) else {
            return Err(MiningError::InvalidState(
                "no True rule in assessment".to_string(),
            ));
        };
        self.rule_assessments.truncate(true_at + 1);
        let last = self.rule_assessments.len() - 1;
        let mut i = 0;
        self.rule_assessments.retain(|ra| {
            let keep = i == last || ra.num_matches() > 1;
            i += 1;
            keep
        });
        Ok(())
    }

    fn exclude_same_records_rules(&mut self) {
        let Some(first) = self.rule_assessments.first() else {
            return;
        };
        if first.aggregators.len() <= 3 {
            return;
        }
        let mut kept: Vec<RuleAssessment> = Vec::with_capacity(self.rule_assessments.len());
        for ra in self.rule_assessments.drain(..) {
            match kept.last_mut() {
                Some(prev) if prev.aggregators == ra.aggregators => {
                    if ra.rule.is_true() {
                        *prev = ra;
                    }
                }
                _ => kept.push(ra),
            }
        }
        self.rule_assessments = kept;
    }

    fn exclude_poorer_overlapping_rules(&mut self) {
        let mut kept: Vec<RuleAssessment> = Vec::with_capacity(self.rule_assessments.len());
        for ra in self.rule_assessments.drain(..) {
            let overlapped = ra.rule.is_overlapper()
                && kept
                    .iter()
                    .any(|k| k.rule.is_overlapper() && k.rule.overlaps(&ra.rule));
            if !overlapped {
                kept.push(ra);
            }
        }
        self.rule_assessments = kept;
    }
}

fn compare(a: &RuleAssessment, b: &RuleAssessment, order: &[SortField]) -> Ordering {
    for field in order {
        let va = a.aggregator(&field.aggregator).and_then(|v| v.as_float());
        let vb = b.aggregator(&field.aggregator).and_then(|v| v.as_float());
        let ord = match (va, vb) {
            (Some(x), Some(y)) => {
                let ord = x.total_cmp(&y);
                match field.direction {
                    Direction::Ascending => ord,
                    Direction::Descending => ord.reverse(),
                }
            }
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use std::collections::BTreeMap;

    fn ra(rule: Rule, num_matches: i64, score: f64) -> RuleAssessment {
        let aggregators: BTreeMap<String, Value> = [
            ("numMatches".to_string(), Value::Int(num_matches)),
            ("percentMatches".to_string(), Value::Float(num_matches as f64)),
            ("goalsScore".to_string(), Value::Float(score)),
        ]
        .into_iter()
        .collect();
        RuleAssessment {
            rule,
            aggregators,
            goals: Vec::new(),
        }
    }

    fn with_extra(mut ra: RuleAssessment, v: i64) -> RuleAssessment {
        ra.aggregators.insert("numBig".to_string(), Value::Int(v));
        ra
    }

    fn order() -> Vec<SortField> {
        vec![
            SortField::descending("goalsScore"),
            SortField::descending("numMatches"),
        ]
    }

    fn rule_strings(a: &Assessment) -> Vec<String> {
        a.rules(None).iter().map(|r| r.to_string()).collect()
    }

    #[test]
    fn test_direction_parse() {
        assert_eq!("ascending".parse::<Direction>().unwrap(), Direction::Ascending);
        assert_eq!("descending".parse::<Direction>().unwrap(), Direction::Descending);
        assert!(matches!(
            "up".parse::<Direction>(),
            Err(MiningError::InvalidSortDirection { .. })
        ));
    }

    #[test]
    fn test_sort_is_stable_and_pins_true_last() {
        let mut a = Assessment::with_rule_assessments(
            10,
            vec![
                ra(Rule::True, 10, 3.0),
                ra(Rule::ge_fv("a", 1), 4, 1.0),
                ra(Rule::ge_fv("b", 1), 5, 2.0),
                ra(Rule::ge_fv("c", 1), 4, 1.0),
            ],
        );
        a.sort(&order());
        assert_eq!(
            rule_strings(&a),
            vec!["b >= 1", "a >= 1", "c >= 1", "true()"]
        );
        assert!(a.is_sorted());
        assert!(!a.is_refined());
    }

    #[test]
    fn test_sort_ascending_and_non_numeric() {
        let mut x = ra(Rule::ge_fv("x", 1), 4, 1.0);
        x.aggregators
            .insert("goalsScore".to_string(), Value::from("n/a"));
        let mut a = Assessment::with_rule_assessments(
            10,
            vec![
                ra(Rule::ge_fv("a", 1), 6, 1.0),
                x,
                ra(Rule::ge_fv("b", 1), 3, 1.0),
                ra(Rule::True, 10, 0.0),
            ],
        );
        a.sort(&[SortField::ascending("goalsScore")]);
        assert_eq!(
            rule_strings(&a),
            vec!["a >= 1", "b >= 1", "x >= 1", "true()"]
        );
    }

    #[test]
    fn test_refine_requires_sort() {
        let mut a = Assessment::with_rule_assessments(10, vec![ra(Rule::True, 10, 0.0)]);
        assert!(matches!(a.refine(), Err(MiningError::InvalidState(_))));
    }

    #[test]
    fn test_refine_requires_true_rule() {
        let mut a = Assessment::with_rule_assessments(10, vec![ra(Rule::ge_fv("a", 1), 4, 0.0)]);
        a.sort(&order());
        assert!(matches!(a.refine(), Err(MiningError::InvalidState(_))));
    }

    #[test]
    fn test_refine_excludes_poor_rules() {
        let mut a = Assessment::with_rule_assessments(
            10,
            vec![
                ra(Rule::eq_fv("a", 1), 1, 3.0),
                ra(Rule::eq_fv("b", 1), 2, 2.0),
                ra(Rule::eq_fv("c", 1), 0, 1.0),
                ra(Rule::True, 1, 0.0),
            ],
        );
        a.sort(&order());
        a.refine().unwrap();
        assert_eq!(rule_strings(&a), vec!["b == 1", "true()"]);
        assert!(a.is_refined());
    }

    #[test]
    fn test_refine_keeps_one_true_rule() {
        let mut a = Assessment::with_rule_assessments(
            10,
            vec![
                ra(Rule::True, 10, 0.0),
                ra(Rule::eq_fv("b", 1), 2, 2.0),
                ra(Rule::True, 10, 0.0),
            ],
        );
        a.sort(&order());
        a.refine().unwrap();
        assert_eq!(rule_strings(&a), vec!["b == 1", "true()"]);
    }

    #[test]
    fn test_refine_excludes_same_records_rules() {
        let mut a = Assessment::with_rule_assessments(
            10,
            vec![
                with_extra(ra(Rule::eq_fv("a", 1), 5, 2.0), 3),
                with_extra(ra(Rule::eq_fv("b", 1), 5, 2.0), 3),
                with_extra(ra(Rule::eq_fv("c", 1), 4, 1.0), 3),
                with_extra(ra(Rule::True, 4, 1.0), 3),
            ],
        );
        a.sort(&order());
        a.refine().unwrap();
        assert_eq!(rule_strings(&a), vec!["a == 1", "true()"]);
    }

    #[test]
    fn test_refine_same_records_needs_extra_aggregators() {
        let mut a = Assessment::with_rule_assessments(
            10,
            vec![
                ra(Rule::eq_fv("a", 1), 5, 2.0),
                ra(Rule::eq_fv("b", 1), 5, 2.0),
                ra(Rule::True, 10, 0.0),
            ],
        );
        a.sort(&order());
        a.refine().unwrap();
        assert_eq!(rule_strings(&a), vec!["a == 1", "b == 1", "true()"]);
    }

    #[test]
    fn test_refine_removes_worse_overlaps() {
        let mut a = Assessment::with_rule_assessments(
            10,
            vec![
                ra(Rule::must_between_fv("band", 5, 7), 6, 3.0),
                ra(Rule::ge_fv("band", 4), 5, 2.0),
                ra(Rule::must_between_fv("band", 5, 6), 4, 1.0),
                ra(Rule::True, 10, 0.0),
            ],
        );
        a.sort(&order());
        a.refine().unwrap();
        assert_eq!(
            rule_strings(&a),
            vec!["band >= 5 && band <= 7", "band >= 4", "true()"]
        );
    }

    #[test]
    fn test_refine_is_idempotent() {
        let mut a = Assessment::with_rule_assessments(
            10,
            vec![
                with_extra(ra(Rule::le_fv("a", 3), 6, 3.0), 1),
                with_extra(ra(Rule::le_fv("a", 5), 5, 2.0), 2),
                with_extra(ra(Rule::eq_fv("c", 1), 6, 3.0), 1),
                with_extra(ra(Rule::eq_fv("d", 1), 1, 2.0), 2),
                with_extra(ra(Rule::True, 10, 0.0), 9),
            ],
        );
        a.sort(&order());
        a.refine().unwrap();
        let once = a.clone();
        a.refine().unwrap();
        assert_eq!(a, once);
    }

    #[test]
    fn test_truncate_keeps_true_last() {
        let mut rules: Vec<RuleAssessment> = (0..199)
            .map(|i| ra(Rule::eq_fv(format!("f{i}"), 1), 2 + i, 0.0))
            .collect();
        rules.push(ra(Rule::True, 1000, 0.0));
        let mut a = Assessment::with_rule_assessments(1000, rules);
        assert!(a.truncate(5).is_err());
        a.sort(&order());
        a.refine().unwrap();
        a.truncate(5).unwrap();
        assert_eq!(
            rule_strings(&a),
            vec!["f198 == 1", "f197 == 1", "f196 == 1", "f195 == 1", "true()"]
        );
    }

    #[test]
    fn test_merge() {
        let a = Assessment::with_rule_assessments(10, vec![ra(Rule::eq_fv("a", 1), 5, 2.0)]);
        let b = Assessment::with_rule_assessments(
            10,
            vec![ra(Rule::eq_fv("b", 1), 5, 2.0), ra(Rule::True, 10, 0.0)],
        );
        let merged = a.merge(&b).unwrap();
        assert_eq!(merged.len(), 3);
        assert!(!merged.is_sorted());
        let reversed = b.merge(&a).unwrap();
        assert!(merged.is_equal(&reversed));
        assert!(!merged.is_equal(&a));

        let c = Assessment::with_rule_assessments(11, Vec::new());
        assert!(matches!(
            a.merge(&c),
            Err(MiningError::NumRecordsChanged {
                expected: 10,
                got: 11
            })
        ));
    }
}
