//! Pairwise composition of rules.

use std::collections::{BTreeMap, HashSet};
use tracing::{debug, instrument};

use crate::rule::Rule;

/// Every legal `&&` and `||` composition of pairs of `rules`.
///
/// Pairs are taken in order of the rules' display text and True is left
/// out. Two In rules over the same field combine into a single In rule
/// over both value sets. Output is deduplicated.
#[instrument(skip(rules), fields(num_rules = rules.len()))]
pub fn combine(rules: &[Rule]) -> Vec<Rule> {
    let ordered: Vec<&Rule> = rules
        .iter()
        .filter(|r| !r.is_true())
        .map(|r| (r.to_string(), r))
        .collect::<BTreeMap<String, &Rule>>()
        .into_values()
        .collect();

    let mut seen: HashSet<String> = HashSet::new();
    let mut out: Vec<Rule> = Vec::new();
    let mut push = |r: Rule| {
        if seen.insert(r.to_string()) {
            out.push(r);
        }
    };
    for (i, a) in ordered.iter().enumerate() {
        for b in &ordered[i + 1..] {
            let same_field_in = matches!(
                (a, b),
                (Rule::InFV { field: fa, .. }, Rule::InFV { field: fb, .. }) if fa == fb
            );
            if !same_field_in {
                if let Ok(r) = Rule::and((*a).clone(), (*b).clone()) {
                    push(r);
                }
            }
            if let Ok(r) = Rule::or((*a).clone(), (*b).clone()) {
                push(r);
            }
        }
    }
    debug!(num_combined = out.len(), "combined rules");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn strings(rules: &[Rule]) -> Vec<String> {
        rules.iter().map(Rule::to_string).collect()
    }

    #[test]
    fn test_combine_pairs_in_display_order() {
        let rules = vec![
            Rule::ge_fv("b", 2),
            Rule::eq_fv("a", 1),
            Rule::True,
        ];
        assert_eq!(
            strings(&combine(&rules)),
            vec!["a == 1 && b >= 2", "a == 1 || b >= 2"]
        );
    }

    #[test]
    fn test_combine_skips_rejected_ands() {
        let rules = vec![Rule::ge_fv("b", 2), Rule::le_fv("b", 9), Rule::ge_fv("b", 5)];
        let got = strings(&combine(&rules));
        assert_eq!(
            got,
            vec![
                "b >= 2 && b <= 9",
                "b <= 9 || b >= 2",
                "b >= 5 && b <= 9",
                "b <= 9 || b >= 5",
                "b >= 2 || b >= 5",
            ]
        );
    }

    #[test]
    fn test_combine_in_rules() {
        let x = Rule::in_fv("g", vec![Value::from("x"), Value::from("y")]);
        let y = Rule::in_fv("g", vec![Value::from("z")]);
        let h = Rule::in_fv("h", vec![Value::from("q")]);
        let got = strings(&combine(&[x, y, h]));
        assert_eq!(
            got,
            vec![
                "in(g, \"x\", \"y\", \"z\")",
                "in(g, \"x\", \"y\") && in(h, \"q\")",
                "in(g, \"x\", \"y\") || in(h, \"q\")",
                "in(g, \"z\") && in(h, \"q\")",
                "in(g, \"z\") || in(h, \"q\")",
            ]
        );
    }

    #[test]
    fn test_combine_deduplicates_input() {
        let rules = vec![Rule::eq_fv("a", 1), Rule::eq_fv("a", 1), Rule::eq_fv("c", 2)];
        assert_eq!(combine(&rules).len(), 2);
    }
}
