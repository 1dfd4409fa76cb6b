use super::Rule;
use crate::description::{
    add_range, generate_tweak_points, mul_range, num_decimal_places, number_range, point_value,
    DatasetDescription,
};
use crate::value::{round_to, Value};

impl Rule {
    /// True for rules with numeric thresholds that [`Rule::tweak`] can move.
    pub fn is_tweakable(&self) -> bool {
        matches!(
            self,
            Rule::LeFV { .. }
                | Rule::GeFV { .. }
                | Rule::BetweenFV { .. }
                | Rule::OutsideFV { .. }
                | Rule::AddLeF { .. }
                | Rule::AddGeF { .. }
                | Rule::MulLeF { .. }
                | Rule::MulGeF { .. }
        )
    }

    /// Variants of the rule with thresholds moved to nearby points.
    ///
    /// New thresholds lie strictly inside the field's observed range and
    /// never equal one of the rule's current thresholds. For arithmetic
    /// rules the range is the operator applied to both fields' ranges.
    /// Later stages use finer steps. Rules that aren't tweakable, or whose
    /// fields aren't described as numbers, produce no variants.
    pub fn tweak(&self, desc: &DatasetDescription, stage: u32) -> Vec<Rule> {
        match self {
            Rule::LeFV { field, value } | Rule::GeFV { field, value } => {
                let Some((min, max, dp)) = field_range(desc, field) else {
                    return Vec::new();
                };
                let Some(v) = value.as_float() else {
                    return Vec::new();
                };
                generate_tweak_points(v, min, max, dp, stage)
                    .into_iter()
                    .map(|p| self.with_value(p))
                    .collect()
            }
            Rule::BetweenFV { field, low, high } | Rule::OutsideFV { field, low, high } => {
                let Some((min, max, dp)) = field_range(desc, field) else {
                    return Vec::new();
                };
                let (Some(lo), Some(hi)) = (low.as_float(), high.as_float()) else {
                    return Vec::new();
                };
                let originals = [lo, hi];
                let keep = |p: &Value| p.as_float().is_some_and(|f| !originals.contains(&f));
                let lows: Vec<Value> = generate_tweak_points(lo, min, max, dp, stage)
                    .into_iter()
                    .filter(keep)
                    .collect();
                let highs: Vec<Value> = generate_tweak_points(hi, min, max, dp, stage)
                    .into_iter()
                    .filter(keep)
                    .collect();
                let mut out = Vec::new();
                for l in &lows {
                    for h in &highs {
                        if let Some(r) = self.with_interval(l.clone(), h.clone()) {
                            out.push(r);
                        }
                    }
                }
                out
            }
            Rule::AddLeF {
                field_a,
                field_b,
                value,
            }
            | Rule::AddGeF {
                field_a,
                field_b,
                value,
            }
            | Rule::MulLeF {
                field_a,
                field_b,
                value,
            }
            | Rule::MulGeF {
                field_a,
                field_b,
                value,
            } => {
                let (Some(a), Some(b)) = (field_range(desc, field_a), field_range(desc, field_b))
                else {
                    return Vec::new();
                };
                let Some(v) = value.as_float() else {
                    return Vec::new();
                };
                let (min, max, dp) = if matches!(self, Rule::AddLeF { .. } | Rule::AddGeF { .. }) {
                    add_range(a, b)
                } else {
                    mul_range(a, b)
                };
                generate_tweak_points(v, min, max, dp, stage)
                    .into_iter()
                    .map(|p| self.with_value(p))
                    .collect()
            }
            _ => Vec::new(),
        }
    }

    /// Variants of the rule with thresholds rounded to fewer decimal places,
    /// from one less than the threshold's own down to 0. The rule itself is
    /// not included.
    pub fn reduce_dp(&self) -> Vec<Rule> {
        match self {
            Rule::LeFV { value, .. }
            | Rule::GeFV { value, .. }
            | Rule::AddLeF { value, .. }
            | Rule::AddGeF { value, .. }
            | Rule::MulLeF { value, .. }
            | Rule::MulGeF { value, .. } => {
                let Some(v) = value.as_float() else {
                    return Vec::new();
                };
                let mut out: Vec<Rule> = Vec::new();
                for dp in (0..num_decimal_places(value)).rev() {
                    let r = self.with_value(point_value(round_to(v, dp)));
                    if r != *self && !out.contains(&r) {
                        out.push(r);
                    }
                }
                out
            }
            Rule::BetweenFV { low, high, .. } | Rule::OutsideFV { low, high, .. } => {
                let (Some(lo), Some(hi)) = (low.as_float(), high.as_float()) else {
                    return Vec::new();
                };
                let max_dp = num_decimal_places(low).max(num_decimal_places(high));
                let mut out: Vec<Rule> = Vec::new();
                for dp in (0..max_dp).rev() {
                    let l = point_value(round_to(lo, dp));
                    let h = point_value(round_to(hi, dp));
                    if let Some(r) = self.with_interval(l, h) {
                        if r != *self && !out.contains(&r) {
                            out.push(r);
                        }
                    }
                }
                out
            }
            _ => Vec::new(),
        }
    }

    fn with_value(&self, value: Value) -> Rule {
        let mut r = self.clone();
        match &mut r {
            Rule::LeFV { value: v, .. }
            | Rule::GeFV { value: v, .. }
            | Rule::AddLeF { value: v, .. }
            | Rule::AddGeF { value: v, .. }
            | Rule::MulLeF { value: v, .. }
            | Rule::MulGeF { value: v, .. } => *v = value,
            _ => {}
        }
        r
    }

    fn with_interval(&self, low: Value, high: Value) -> Option<Rule> {
        match self {
            Rule::BetweenFV { field, .. } => Rule::between_fv(field.clone(), low, high).ok(),
            Rule::OutsideFV { field, .. } => Rule::outside_fv(field.clone(), low, high).ok(),
            _ => None,
        }
    }
}

fn field_range(desc: &DatasetDescription, field: &str) -> Option<(f64, f64, u32)> {
    number_range(desc.field(field)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::description::FieldDescription;

    fn desc() -> DatasetDescription {
        DatasetDescription::new()
            .with_field("band", FieldDescription::number(0, 100, 0))
            .with_field("rate", FieldDescription::number(0, 1, 2))
            .with_field("qty", FieldDescription::number(1, 10, 0))
            .with_field("name", FieldDescription::string([("a", 2)]))
    }

    fn thresholds(rule: &Rule) -> Vec<f64> {
        match rule {
            Rule::LeFV { value, .. }
            | Rule::GeFV { value, .. }
            | Rule::AddLeF { value, .. }
            | Rule::AddGeF { value, .. }
            | Rule::MulLeF { value, .. }
            | Rule::MulGeF { value, .. } => vec![value.as_float().unwrap()],
            Rule::BetweenFV { low, high, .. } | Rule::OutsideFV { low, high, .. } => {
                vec![low.as_float().unwrap(), high.as_float().unwrap()]
            }
            _ => vec![],
        }
    }

    #[test]
    fn test_tweak_ge_fv() {
        let rule = Rule::ge_fv("band", 50);
        let tweaked = rule.tweak(&desc(), 1);
        let got: Vec<String> = tweaked.iter().map(Rule::to_string).collect();
        assert_eq!(
            got,
            vec![
                "band >= 10",
                "band >= 20",
                "band >= 30",
                "band >= 40",
                "band >= 60",
                "band >= 70",
                "band >= 80",
                "band >= 90"
            ]
        );
    }

    #[test]
    fn test_tweak_between_stays_in_range_and_avoids_originals() {
        let rule = Rule::must_between_fv("band", 20, 60);
        let tweaked = rule.tweak(&desc(), 2);
        assert!(!tweaked.is_empty());
        for r in &tweaked {
            let t = thresholds(r);
            assert!(t[0] < t[1], "{r}");
            for v in t {
                assert!(v > 0.0 && v < 100.0, "{r}");
                assert!(v != 20.0 && v != 60.0, "{r}");
            }
        }
    }

    #[test]
    fn test_tweak_arithmetic_ranges() {
        let rule = Rule::mul_ge_f("band", "qty", 500);
        for r in rule.tweak(&desc(), 1) {
            let v = thresholds(&r)[0];
            assert!(v > 0.0 && v < 1000.0 && v != 500.0, "{r}");
        }
        let rule = Rule::add_le_f("rate", "qty", 5);
        let tweaked = rule.tweak(&desc(), 1);
        assert!(!tweaked.is_empty());
        for r in tweaked {
            let v = thresholds(&r)[0];
            assert!(v > 1.0 && v < 11.0 && v != 5.0, "{r}");
        }
    }

    #[test]
    fn test_tweak_non_number_field() {
        assert!(Rule::ge_fv("name", 5).tweak(&desc(), 1).is_empty());
        assert!(Rule::ge_fv("missing", 5).tweak(&desc(), 1).is_empty());
        assert!(Rule::eq_fv("band", 5).tweak(&desc(), 1).is_empty());
    }

    #[test]
    fn test_reduce_dp() {
        let rule = Rule::ge_fv("rate", 0.256);
        let got: Vec<String> = rule.reduce_dp().iter().map(Rule::to_string).collect();
        assert_eq!(got, vec!["rate >= 0.26", "rate >= 0.3", "rate >= 0"]);

        let rule = Rule::must_between_fv("rate", 0.12, 0.87);
        let got: Vec<String> = rule.reduce_dp().iter().map(Rule::to_string).collect();
        assert_eq!(got, vec!["rate >= 0.1 && rate <= 0.9", "rate >= 0 && rate <= 1"]);

        assert!(Rule::ge_fv("band", 5).reduce_dp().is_empty());
    }
}
