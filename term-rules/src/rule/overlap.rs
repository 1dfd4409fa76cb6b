use super::{value_cmp, Rule};
use std::cmp::Ordering;

impl Rule {
    /// True for rules that can report overlaps with [`Rule::overlaps`].
    pub fn is_overlapper(&self) -> bool {
        matches!(
            self,
            Rule::LeFV { .. }
                | Rule::GeFV { .. }
                | Rule::BetweenFV { .. }
                | Rule::OutsideFV { .. }
                | Rule::InFV { .. }
                | Rule::AddLeF { .. }
                | Rule::AddGeF { .. }
                | Rule::MulLeF { .. }
                | Rule::MulGeF { .. }
        )
    }

    /// True when both rules are of the same kind and constrain the same
    /// field(s) with intersecting ranges. Symmetric.
    pub fn overlaps(&self, other: &Rule) -> bool {
        match (self, other) {
            (Rule::LeFV { field: a, .. }, Rule::LeFV { field: b, .. })
            | (Rule::GeFV { field: a, .. }, Rule::GeFV { field: b, .. })
            | (Rule::OutsideFV { field: a, .. }, Rule::OutsideFV { field: b, .. }) => a == b,
            (
                Rule::BetweenFV {
                    field: fa,
                    low: la,
                    high: ha,
                },
                Rule::BetweenFV {
                    field: fb,
                    low: lb,
                    high: hb,
                },
            ) => {
                fa == fb
                    && value_cmp(la, hb) != Ordering::Greater
                    && value_cmp(lb, ha) != Ordering::Greater
            }
            (
                Rule::InFV {
                    field: fa,
                    values: va,
                },
                Rule::InFV {
                    field: fb,
                    values: vb,
                },
            ) => {
                fa == fb
                    && va
                        .iter()
                        .any(|x| vb.iter().any(|y| x.to_string() == y.to_string()))
            }
            (
                Rule::AddLeF {
                    field_a: a1,
                    field_b: b1,
                    ..
                },
                Rule::AddLeF {
                    field_a: a2,
                    field_b: b2,
                    ..
                },
            )
            | (
                Rule::AddGeF {
                    field_a: a1,
                    field_b: b1,
                    ..
                },
                Rule::AddGeF {
                    field_a: a2,
                    field_b: b2,
                    ..
                },
            )
            | (
                Rule::MulLeF {
                    field_a: a1,
                    field_b: b1,
                    ..
                },
                Rule::MulLeF {
                    field_a: a2,
                    field_b: b2,
                    ..
                },
            )
            | (
                Rule::MulGeF {
                    field_a: a1,
                    field_b: b1,
                    ..
                },
                Rule::MulGeF {
                    field_a: a2,
                    field_b: b2,
                    ..
                },
            ) => (a1 == a2 && b1 == b2) || (a1 == b2 && b1 == a2),
            _ => false,
        }
    }
}
