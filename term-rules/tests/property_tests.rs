//! Property-based tests for rule evaluation, composition and assessments.
//!
//! ## Test Categories
//!
//! ### 1. Rules
//! - Evaluation is deterministic and only touches the rule's fields
//! - Tweaked thresholds stay inside the field's range and move
//! - Overlaps are symmetric
//!
//! ### 2. Composition
//! - Or of two In rules over one field is the In rule over the union
//! - And of `>=` and `<=` with an ordered pair is a Between rule
//!
//! ### 3. Assessments
//! - Refine keeps True last and drops rules matching at most one record
//! - Refine is idempotent
//! - Merge concatenates and sort is stable

use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

use term_rules::assessment::{Assessment, SortField};
use term_rules::assessor::RuleAssessment;
use term_rules::description::{DatasetDescription, FieldDescription};
use term_rules::prelude::*;
use term_rules::tweaker::reduce_dp;

// ============================================================================
// Strategies
// ============================================================================

fn simple_rule() -> impl Strategy<Value = Rule> {
    let field = prop::sample::select(vec!["a", "b", "c"]);
    let value = -50i64..50;
    prop_oneof![
        (field.clone(), value.clone()).prop_map(|(f, v)| Rule::ge_fv(f, v)),
        (field.clone(), value.clone()).prop_map(|(f, v)| Rule::le_fv(f, v)),
        (field.clone(), value.clone()).prop_map(|(f, v)| Rule::eq_fv(f, v)),
        (field.clone(), value.clone()).prop_map(|(f, v)| Rule::ne_fv(f, v)),
        (field.clone(), value.clone(), 1i64..20)
            .prop_map(|(f, lo, w)| Rule::must_between_fv(f, lo, lo + w)),
        (field.clone(), value.clone(), 1i64..20)
            .prop_map(|(f, lo, w)| Rule::must_outside_fv(f, lo, lo + w)),
        (field.clone(), field.clone()).prop_map(|(f, g)| Rule::lt_ff(f, g)),
        (field.clone(), field.clone(), value.clone())
            .prop_map(|(f, g, v)| Rule::add_ge_f(f, g, v)),
        (field.clone(), field.clone(), value).prop_map(|(f, g, v)| Rule::mul_le_f(f, g, v)),
    ]
}

fn record() -> impl Strategy<Value = Record> {
    (-60i64..60, -60i64..60, -60i64..60).prop_map(|(a, b, c)| {
        [("a", a), ("b", b), ("c", c)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), Value::Int(v)))
            .collect()
    })
}

fn rule_assessment(rule: Rule, score: i64, num_matches: i64) -> RuleAssessment {
    let aggregators: BTreeMap<String, Value> = [
        ("goalsScore", Value::Int(score)),
        ("numMatches", Value::Int(num_matches)),
        ("percentMatches", Value::Int(num_matches)),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();
    RuleAssessment {
        rule,
        aggregators,
        goals: Vec::new(),
    }
}

/// Distinct rules on distinct fields with random scores, plus True.
fn assessment() -> impl Strategy<Value = Assessment> {
    prop::collection::vec((0i64..5, 0i64..6), 0..30).prop_map(|entries| {
        let mut ras: Vec<RuleAssessment> = entries
            .into_iter()
            .enumerate()
            .map(|(i, (score, n))| rule_assessment(Rule::eq_fv(format!("f{i}"), 1), score, n))
            .collect();
        ras.push(rule_assessment(Rule::True, 0, 100));
        Assessment::with_rule_assessments(100, ras)
    })
}

fn threshold(rule: &Rule) -> Vec<f64> {
    match rule {
        Rule::GeFV { value, .. } | Rule::LeFV { value, .. } => value.as_float().into_iter().collect(),
        Rule::BetweenFV { low, high, .. } | Rule::OutsideFV { low, high, .. } => {
            low.as_float().into_iter().chain(high.as_float()).collect()
        }
        _ => Vec::new(),
    }
}

// ============================================================================
// Rules
// ============================================================================

proptest! {
    #[test]
    fn prop_evaluate_is_deterministic(rule in simple_rule(), rec in record()) {
        let first = rule.evaluate(&rec).map_err(|e| e.to_string());
        let second = rule.evaluate(&rec).map_err(|e| e.to_string());
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_evaluate_needs_only_rule_fields(rule in simple_rule(), rec in record()) {
        let fields = rule.fields();
        let narrowed: Record = rec
            .into_iter()
            .filter(|(k, _)| fields.contains(k))
            .collect();
        prop_assert!(rule.evaluate(&narrowed).is_ok());
        if let Some(missing) = fields.first() {
            let mut without = narrowed.clone();
            without.remove(missing);
            prop_assert!(rule.evaluate(&without).is_err());
        }
    }

    #[test]
    fn prop_display_round_trips_through_dynamic(rule in simple_rule(), rec in record()) {
        let dynamic = Rule::dynamic(&rule.to_string()).unwrap();
        prop_assert_eq!(rule.evaluate(&rec).ok(), dynamic.evaluate(&rec).ok());
    }

    #[test]
    fn prop_tweak_stays_in_range(
        lo in 0i64..20,
        width in 1i64..20,
        min in -10i64..0,
        span in 40i64..200,
        stage in 1u32..4,
    ) {
        let max = min + span;
        let desc = DatasetDescription::new()
            .with_field("band", FieldDescription::number(min, max, 0));
        let rules = vec![
            Rule::ge_fv("band", lo),
            Rule::le_fv("band", lo),
            Rule::must_between_fv("band", lo, lo + width),
            Rule::must_outside_fv("band", lo, lo + width),
        ];
        for rule in rules {
            let originals = threshold(&rule);
            for tweaked in rule.tweak(&desc, stage) {
                for t in threshold(&tweaked) {
                    prop_assert!(t >= min as f64 && t <= max as f64, "{} out of range", tweaked);
                }
                prop_assert_ne!(threshold(&tweaked), originals.clone());
                let changed: Vec<f64> = threshold(&tweaked)
                    .into_iter()
                    .filter(|t| !originals.contains(t))
                    .collect();
                prop_assert!(!changed.is_empty());
            }
        }
    }

    #[test]
    fn prop_overlaps_is_symmetric(
        l1 in 0i64..50, w1 in 1i64..20,
        l2 in 0i64..50, w2 in 1i64..20,
    ) {
        let r1 = Rule::must_between_fv("band", l1, l1 + w1);
        let r2 = Rule::must_between_fv("band", l2, l2 + w2);
        prop_assert_eq!(r1.overlaps(&r2), r2.overlaps(&r1));
        let intersect = l1 <= l2 + w2 && l2 <= l1 + w1;
        prop_assert_eq!(r1.overlaps(&r2), intersect);
    }

    #[test]
    fn prop_or_of_in_rules_is_union(
        a in prop::collection::btree_set(0i64..10, 1..5),
        b in prop::collection::btree_set(0i64..10, 1..5),
    ) {
        prop_assume!(a != b);
        let to_values = |s: &BTreeSet<i64>| s.iter().map(|v| Value::Int(*v)).collect::<Vec<_>>();
        let or = Rule::or(Rule::in_fv("g", to_values(&a)), Rule::in_fv("g", to_values(&b))).unwrap();
        let union: BTreeSet<i64> = a.union(&b).copied().collect();
        prop_assert_eq!(or, Rule::in_fv("g", to_values(&union)));
    }

    #[test]
    fn prop_and_of_bounds_is_between(a in -50i64..50, w in 1i64..50) {
        let and = Rule::and(Rule::ge_fv("band", a), Rule::le_fv("band", a + w)).unwrap();
        prop_assert_eq!(and, Rule::must_between_fv("band", a, a + w));
    }

    #[test]
    fn prop_reduce_dp_contains_input(v in 0.0f64..100.0) {
        let value = (v * 1000.0).round() / 1000.0;
        let rule = Rule::ge_fv("rate", value);
        let reduced = reduce_dp(&[rule.clone()]);
        prop_assert!(reduced.contains(&rule));
        prop_assert_eq!(reduced.last(), Some(&Rule::True));
    }
}

// ============================================================================
// Assessments
// ============================================================================

proptest! {
    #[test]
    fn prop_refine_keeps_true_last(mut a in assessment()) {
        a.sort(&[SortField::descending("goalsScore"), SortField::descending("numMatches")]);
        a.refine().unwrap();
        let ras = a.rule_assessments();
        prop_assert!(ras.last().unwrap().rule.is_true());
        for ra in &ras[..ras.len() - 1] {
            prop_assert!(ra.num_matches() > 1);
        }
    }

    #[test]
    fn prop_refine_is_idempotent(mut a in assessment()) {
        a.sort(&[SortField::descending("goalsScore")]);
        a.refine().unwrap();
        let once = a.clone();
        a.refine().unwrap();
        prop_assert_eq!(a, once);
    }

    #[test]
    fn prop_merge_concatenates(a in assessment(), b in assessment()) {
        let merged = a.merge(&b).unwrap();
        prop_assert_eq!(merged.len(), a.len() + b.len());
        prop_assert!(!merged.is_sorted());
    }

    #[test]
    fn prop_sort_is_stable(mut a in assessment()) {
        let before: Vec<(String, i64)> = a
            .rule_assessments()
            .iter()
            .map(|ra| (ra.rule.to_string(), ra.aggregator("goalsScore").and_then(Value::as_int).unwrap_or(0)))
            .collect();
        a.sort(&[SortField::descending("goalsScore")]);
        let after: Vec<(String, i64)> = a
            .rule_assessments()
            .iter()
            .filter(|ra| !ra.rule.is_true())
            .map(|ra| (ra.rule.to_string(), ra.aggregator("goalsScore").and_then(Value::as_int).unwrap_or(0)))
            .collect();
        for score in 0..5 {
            let position = |list: &[(String, i64)]| -> Vec<String> {
                list.iter().filter(|(r, s)| *s == score && r != "true()").map(|(r, _)| r.clone()).collect()
            };
            prop_assert_eq!(position(&before), position(&after));
        }
    }
}
