use super::{value_cmp, Rule};
use crate::error::{MiningError, Result};
use std::cmp::Ordering;

impl Rule {
    /// Composes `a && b`.
    ///
    /// `GEFV(f, x) && LEFV(f, y)` with `x < y`, in either order, becomes a
    /// Between rule. Rejected pairings:
    ///
    /// - either side is True, or both sides are the same rule
    /// - two tweakable rules over the same fields, other than the Between case
    /// - an In rule with a rule that only reads the In rule's field
    pub fn and(a: Rule, b: Rule) -> Result<Rule> {
        if a.is_true() || b.is_true() || a == b {
            return Err(invalid_combination(&a, &b));
        }

        if a.is_tweakable() && b.is_tweakable() && same_fields(&a, &b) {
            return match (&a, &b) {
                (Rule::GeFV { field, value: low }, Rule::LeFV { value: high, .. })
                | (Rule::LeFV { value: high, .. }, Rule::GeFV { field, value: low })
                    if value_cmp(low, high) == Ordering::Less =>
                {
                    Rule::between_fv(field.clone(), low.clone(), high.clone())
                }
                _ => Err(invalid_combination(&a, &b)),
            };
        }

        for (x, y) in [(&a, &b), (&b, &a)] {
            if let Rule::InFV { field, .. } = x {
                if y.fields() == [field.clone()] {
                    return Err(invalid_combination(&a, &b));
                }
            }
        }

        Ok(Rule::And(Box::new(a), Box::new(b)))
    }

    /// Composes `a || b`.
    ///
    /// Two In rules over the same field merge into one In rule over the union
    /// of their values. Pairings with True are rejected.
    pub fn or(a: Rule, b: Rule) -> Result<Rule> {
        if a.is_true() || b.is_true() || a == b {
            return Err(invalid_combination(&a, &b));
        }
        if let (
            Rule::InFV {
                field: fa,
                values: va,
            },
            Rule::InFV {
                field: fb,
                values: vb,
            },
        ) = (&a, &b)
        {
            if fa == fb {
                let values = va.iter().chain(vb.iter()).cloned().collect();
                return Ok(Rule::in_fv(fa.clone(), values));
            }
        }
        Ok(Rule::Or(Box::new(a), Box::new(b)))
    }
}

fn same_fields(a: &Rule, b: &Rule) -> bool {
    let mut fa = a.fields();
    let mut fb = b.fields();
    fa.sort();
    fb.sort();
    fa == fb
}

fn invalid_combination(a: &Rule, b: &Rule) -> MiningError {
    MiningError::InvalidCombination {
        rule_a: a.to_string(),
        rule_b: b.to_string(),
    }
}
