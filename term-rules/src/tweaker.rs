//! Threshold refinement of existing rules.

use std::collections::HashSet;
use tracing::{debug, instrument};

use crate::description::DatasetDescription;
use crate::rule::Rule;

/// Variants of the tweakable `rules` with thresholds moved around their
/// current values, deduplicated, followed by True.
///
/// Rules that can't be tweaked contribute nothing.
#[instrument(skip(rules, desc), fields(num_rules = rules.len()))]
pub fn tweak_rules(stage: u32, rules: &[Rule], desc: &DatasetDescription) -> Vec<Rule> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out: Vec<Rule> = rules
        .iter()
        .filter(|r| r.is_tweakable())
        .flat_map(|r| r.tweak(desc, stage))
        .filter(|r| seen.insert(r.to_string()))
        .collect();
    out.push(Rule::True);
    debug!(num_tweaked = out.len() - 1, "tweaked rules");
    out
}

/// The `rules` plus variants of their thresholds rounded to fewer decimal
/// places, deduplicated, followed by True.
pub fn reduce_dp(rules: &[Rule]) -> Vec<Rule> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out: Vec<Rule> = Vec::new();
    for rule in rules.iter().filter(|r| !r.is_true()) {
        for r in std::iter::once(rule.clone()).chain(rule.reduce_dp()) {
            if seen.insert(r.to_string()) {
                out.push(r);
            }
        }
    }
    out.push(Rule::True);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::description::FieldDescription;

    fn desc() -> DatasetDescription {
        DatasetDescription::new()
            .with_field("band", FieldDescription::number(0, 100, 0))
            .with_field("rate", FieldDescription::number(0, 1, 3))
    }

    #[test]
    fn test_tweak_rules() {
        let rules = vec![
            Rule::ge_fv("band", 50),
            Rule::le_fv("band", 40),
            Rule::eq_fv("band", 7),
            Rule::True,
        ];
        let got = tweak_rules(1, &rules, &desc());
        assert_eq!(got.last(), Some(&Rule::True));
        assert_eq!(got.iter().filter(|r| r.is_true()).count(), 1);
        assert!(!got.iter().any(|r| matches!(r, Rule::EqFV { .. })));
        assert!(got.contains(&Rule::ge_fv("band", 40)));
        assert!(got.contains(&Rule::le_fv("band", 50)));
        assert!(!got.contains(&Rule::ge_fv("band", 50)));
        let strings: Vec<String> = got.iter().map(Rule::to_string).collect();
        let unique: HashSet<&String> = strings.iter().collect();
        assert_eq!(unique.len(), strings.len());
    }

    #[test]
    fn test_tweak_rules_without_tweakables() {
        let got = tweak_rules(2, &[Rule::eq_fv("band", 7)], &desc());
        assert_eq!(got, vec![Rule::True]);
    }

    #[test]
    fn test_reduce_dp_keeps_originals() {
        let rules = vec![
            Rule::ge_fv("rate", 0.256),
            Rule::ge_fv("rate", 0.26),
            Rule::eq_fv("band", 7),
            Rule::True,
        ];
        let got: Vec<String> = reduce_dp(&rules).iter().map(Rule::to_string).collect();
        assert_eq!(
            got,
            vec![
                "rate >= 0.256",
                "rate >= 0.26",
                "rate >= 0.3",
                "rate >= 0",
                "band == 7",
                "true()"
            ]
        );
    }
}
