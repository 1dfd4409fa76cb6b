use super::{combinations, Context};
use crate::description::{generate_points, FieldDescription, FieldKind};
use crate::rule::Rule;
use crate::value::Value;

/// Number fields with more distinct values than this get no EQFV/NEFV rules.
const MAX_EQ_NUMBER_VALUES: i64 = 20;

/// Fields need between 2 and this many distinct values for InFV rules.
const MAX_IN_NUM_VALUES: i64 = 12;

/// Largest value set of a generated InFV rule.
const MAX_IN_SET_SIZE: usize = 4;

fn literal_values(fd: &FieldDescription) -> Vec<&Value> {
    if fd.num_values < 2 {
        return Vec::new();
    }
    match fd.kind {
        FieldKind::String => fd.values_with_count(2),
        FieldKind::Number if fd.num_values <= MAX_EQ_NUMBER_VALUES => fd.values_with_count(1),
        _ => Vec::new(),
    }
}

fn points(ctx: &Context<'_>, field: &str) -> Vec<Value> {
    match ctx.number(field) {
        Some((min, max, dp)) => generate_points(min, max, dp),
        None => Vec::new(),
    }
}

pub(super) fn eq_fv(ctx: &Context<'_>, field: &str) -> Vec<Rule> {
    let Some(fd) = ctx.field(field) else {
        return Vec::new();
    };
    literal_values(fd)
        .into_iter()
        .map(|v| Rule::eq_fv(field, v.clone()))
        .collect()
}

pub(super) fn ne_fv(ctx: &Context<'_>, field: &str) -> Vec<Rule> {
    let Some(fd) = ctx.field(field) else {
        return Vec::new();
    };
    literal_values(fd)
        .into_iter()
        .map(|v| Rule::ne_fv(field, v.clone()))
        .collect()
}

pub(super) fn le_fv(ctx: &Context<'_>, field: &str) -> Vec<Rule> {
    points(ctx, field)
        .into_iter()
        .map(|p| Rule::le_fv(field, p))
        .collect()
}

pub(super) fn ge_fv(ctx: &Context<'_>, field: &str) -> Vec<Rule> {
    points(ctx, field)
        .into_iter()
        .map(|p| Rule::ge_fv(field, p))
        .collect()
}

fn intervals(ctx: &Context<'_>, field: &str) -> Vec<(Value, Value)> {
    let points = points(ctx, field);
    let mut out = Vec::new();
    for (i, low) in points.iter().enumerate() {
        for high in &points[i + 1..] {
            out.push((low.clone(), high.clone()));
        }
    }
    out
}

pub(super) fn between_fv(ctx: &Context<'_>, field: &str) -> Vec<Rule> {
    intervals(ctx, field)
        .into_iter()
        .filter_map(|(low, high)| Rule::between_fv(field, low, high).ok())
        .collect()
}

pub(super) fn outside_fv(ctx: &Context<'_>, field: &str) -> Vec<Rule> {
    intervals(ctx, field)
        .into_iter()
        .filter_map(|(low, high)| Rule::outside_fv(field, low, high).ok())
        .collect()
}

pub(super) fn in_fv(ctx: &Context<'_>, field: &str) -> Vec<Rule> {
    let Some(fd) = ctx.field(field) else {
        return Vec::new();
    };
    if !(2..=MAX_IN_NUM_VALUES).contains(&fd.num_values) {
        return Vec::new();
    }
    let values: Vec<Value> = fd.values_with_count(2).into_iter().cloned().collect();
    // proper subsets only: the full set matches every counted record
    let max_size = MAX_IN_SET_SIZE.min(values.len().saturating_sub(1));
    let mut out = Vec::new();
    for size in 2..=max_size {
        for subset in combinations(&values, size) {
            out.push(Rule::in_fv(field, subset));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::super::{generate, GenerationDescription};
    use crate::description::{DatasetDescription, FieldDescription};
    use crate::rule::Rule;

    fn rules_of(desc: &DatasetDescription, field: &str, kind: &str) -> Vec<String> {
        let gd = GenerationDescription::new([field]);
        generate(desc, &gd)
            .iter()
            .filter(|r| r.kind_name() == kind)
            .map(Rule::to_string)
            .collect()
    }

    #[test]
    fn test_eq_fv_numbers_need_few_values() {
        let few = DatasetDescription::new().with_field(
            "n",
            FieldDescription::number(1, 3, 0).with_values([("1", 1), ("2", 4), ("3", 2)]),
        );
        assert_eq!(rules_of(&few, "n", "EQFV"), vec!["n == 1", "n == 2", "n == 3"]);

        let many: Vec<String> = (0..30).map(|i| i.to_string()).collect();
        let many = DatasetDescription::new().with_field(
            "n",
            FieldDescription::number(0, 29, 0).with_values(many.iter().map(|s| (s.as_str(), 2))),
        );
        assert!(rules_of(&many, "n", "EQFV").is_empty());
    }

    #[test]
    fn test_in_fv_subsets() {
        let desc = DatasetDescription::new().with_field(
            "g",
            FieldDescription::string([("a", 2), ("b", 3), ("c", 4), ("d", 1)]),
        );
        let got = rules_of(&desc, "g", "InFV");
        assert_eq!(
            got,
            vec![
                "in(g, \"a\", \"b\")",
                "in(g, \"a\", \"c\")",
                "in(g, \"b\", \"c\")"
            ]
        );

        let one = DatasetDescription::new().with_field("g", FieldDescription::string([("a", 2)]));
        assert!(rules_of(&one, "g", "InFV").is_empty());
    }

    #[test]
    fn test_intervals_are_ordered() {
        let desc =
            DatasetDescription::new().with_field("b", FieldDescription::number(0, 4, 0));
        assert_eq!(
            rules_of(&desc, "b", "BetweenFV"),
            vec![
                "b >= 1 && b <= 2",
                "b >= 1 && b <= 3",
                "b >= 2 && b <= 3"
            ]
        );
        assert_eq!(rules_of(&desc, "b", "OutsideFV").len(), 3);
    }
}
