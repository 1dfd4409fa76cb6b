use super::Context;
use crate::description::{add_range, generate_points, mul_range, FieldDescription, FieldKind};
use crate::rule::Rule;
use crate::value::Value;

/// String fields need at least this many values in common to be compared.
const MIN_SHARED_VALUES: usize = 2;

fn shared_values(a: &FieldDescription, b: &FieldDescription) -> usize {
    a.values.keys().filter(|k| b.values.contains_key(*k)).count()
}

/// Partners of `field` for field/field comparisons. Equality also accepts
/// string fields with enough values in common.
fn comparable(ctx: &Context<'_>, field: &str, equality: bool) -> Vec<String> {
    let Some(fd) = ctx.field(field) else {
        return Vec::new();
    };
    ctx.partners(field)
        .into_iter()
        .filter(|(_, other)| match (fd.kind, other.kind) {
            (FieldKind::Number, FieldKind::Number) => true,
            (FieldKind::String, FieldKind::String) => {
                equality && shared_values(fd, other) >= MIN_SHARED_VALUES
            }
            _ => false,
        })
        .map(|(f, _)| f.to_string())
        .collect()
}

pub(super) fn eq_ff(ctx: &Context<'_>, field: &str) -> Vec<Rule> {
    comparable(ctx, field, true)
        .into_iter()
        .map(|other| Rule::eq_ff(field, other))
        .collect()
}

pub(super) fn ne_ff(ctx: &Context<'_>, field: &str) -> Vec<Rule> {
    comparable(ctx, field, true)
        .into_iter()
        .map(|other| Rule::ne_ff(field, other))
        .collect()
}

pub(super) fn lt_ff(ctx: &Context<'_>, field: &str) -> Vec<Rule> {
    comparable(ctx, field, false)
        .into_iter()
        .map(|other| Rule::lt_ff(field, other))
        .collect()
}

pub(super) fn le_ff(ctx: &Context<'_>, field: &str) -> Vec<Rule> {
    comparable(ctx, field, false)
        .into_iter()
        .map(|other| Rule::le_ff(field, other))
        .collect()
}

pub(super) fn ge_ff(ctx: &Context<'_>, field: &str) -> Vec<Rule> {
    comparable(ctx, field, false)
        .into_iter()
        .map(|other| Rule::ge_ff(field, other))
        .collect()
}

pub(super) fn gt_ff(ctx: &Context<'_>, field: &str) -> Vec<Rule> {
    comparable(ctx, field, false)
        .into_iter()
        .map(|other| Rule::gt_ff(field, other))
        .collect()
}

#[derive(Clone, Copy)]
enum Op {
    Add,
    Mul,
}

/// Threshold points for `field op partner` over every number partner.
fn arithmetic_points(ctx: &Context<'_>, field: &str, op: Op) -> Vec<(String, Vec<Value>)> {
    let Some(a) = ctx.number(field) else {
        return Vec::new();
    };
    ctx.partners(field)
        .into_iter()
        .filter_map(|(other, _)| {
            let b = ctx.number(other)?;
            let (min, max, dp) = match op {
                Op::Add => add_range(a, b),
                Op::Mul => mul_range(a, b),
            };
            Some((other.to_string(), generate_points(min, max, dp)))
        })
        .collect()
}

fn arithmetic_rules(
    ctx: &Context<'_>,
    field: &str,
    op: Op,
    make: fn(String, String, Value) -> Rule,
) -> Vec<Rule> {
    arithmetic_points(ctx, field, op)
        .into_iter()
        .flat_map(|(other, points)| {
            points
                .into_iter()
                .map(move |p| make(field.to_string(), other.clone(), p))
        })
        .collect()
}

pub(super) fn add_le_f(ctx: &Context<'_>, field: &str) -> Vec<Rule> {
    arithmetic_rules(ctx, field, Op::Add, |a, b, v| Rule::add_le_f(a, b, v))
}

pub(super) fn add_ge_f(ctx: &Context<'_>, field: &str) -> Vec<Rule> {
    arithmetic_rules(ctx, field, Op::Add, |a, b, v| Rule::add_ge_f(a, b, v))
}

pub(super) fn mul_le_f(ctx: &Context<'_>, field: &str) -> Vec<Rule> {
    arithmetic_rules(ctx, field, Op::Mul, |a, b, v| Rule::mul_le_f(a, b, v))
}

pub(super) fn mul_ge_f(ctx: &Context<'_>, field: &str) -> Vec<Rule> {
    arithmetic_rules(ctx, field, Op::Mul, |a, b, v| Rule::mul_ge_f(a, b, v))
}
