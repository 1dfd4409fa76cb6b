use std::collections::BTreeSet;

use super::{combinations, Context};
use crate::description::FieldDescription;
use crate::rule::Rule;
use crate::value::Value;

/// Largest field tuple a count rule spans.
const MAX_COUNT_FIELDS: usize = 12;

/// Field tuples, each led by `field`, sharing a histogram value with it.
///
/// Only partners of the same kind are considered, and tuples hold at most
/// [`MAX_COUNT_FIELDS`] fields. A tuple whose fields all have the same
/// value set of size two is skipped: every count rule over it just splits
/// the records in known ways.
fn tuples(ctx: &Context<'_>, field: &str) -> Vec<(Value, Vec<String>)> {
    let Some(fd) = ctx.field(field) else {
        return Vec::new();
    };
    if fd.num_values < 1 {
        return Vec::new();
    }
    let partners: Vec<(&str, &FieldDescription)> = ctx
        .partners(field)
        .into_iter()
        .filter(|(_, other)| other.kind == fd.kind && other.num_values >= 1)
        .collect();

    let mut out = Vec::new();
    for (key, vc) in &fd.values {
        let sharing: Vec<(&str, &FieldDescription)> = partners
            .iter()
            .filter(|(_, other)| other.values.contains_key(key))
            .copied()
            .collect();
        if sharing.is_empty() {
            continue;
        }
        for size in 1..=sharing.len().min(MAX_COUNT_FIELDS - 1) {
            for combo in combinations(&sharing, size) {
                if is_binary_partition(fd, &combo) {
                    continue;
                }
                let mut fields = vec![field.to_string()];
                fields.extend(combo.iter().map(|(f, _)| f.to_string()));
                out.push((vc.value.clone(), fields));
            }
        }
    }
    out
}

fn is_binary_partition(fd: &FieldDescription, others: &[(&str, &FieldDescription)]) -> bool {
    let keys: BTreeSet<&String> = fd.values.keys().collect();
    keys.len() == 2
        && others
            .iter()
            .all(|(_, o)| o.values.keys().collect::<BTreeSet<_>>() == keys)
}

pub(super) fn count_eq_vf(ctx: &Context<'_>, field: &str) -> Vec<Rule> {
    let mut out = Vec::new();
    for (value, fields) in tuples(ctx, field) {
        for n in 0..=fields.len() as i64 {
            out.push(Rule::count_eq_vf(value.clone(), fields.clone(), n));
        }
    }
    out
}

pub(super) fn count_lt_vf(ctx: &Context<'_>, field: &str) -> Vec<Rule> {
    let mut out = Vec::new();
    for (value, fields) in tuples(ctx, field) {
        for n in 2..=fields.len() as i64 {
            out.push(Rule::count_lt_vf(value.clone(), fields.clone(), n));
        }
    }
    out
}
