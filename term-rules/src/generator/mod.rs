//! Candidate rule generation.
//!
//! [`generate`] runs every registered generator over every allowed field of
//! a [`DatasetDescription`]. Generators are named after the rule variant
//! they produce, which is the name used by deny lists:
//!
//! | Generator | Fields |
//! |---|---|
//! | `EQFV`, `NEFV` | string values seen at least twice; number fields with at most 20 values |
//! | `LEFV`, `GEFV` | number fields, on [`generate_points`](crate::description::generate_points) |
//! | `BetweenFV`, `OutsideFV` | every ordered pair of generated points |
//! | `InFV` | subsets of 2 to 4 values of fields with 2 to 12 values |
//! | `EQFF`, `NEFF` | pairs of number fields, or string fields sharing 2 or more values |
//! | `LTFF`, `LEFF`, `GEFF`, `GTFF` | pairs of number fields |
//! | `AddLEF`, `AddGEF`, `MulLEF`, `MulGEF` | pairs of number fields, when arithmetic is enabled |
//! | `CountEQVF`, `CountLTVF` | values shared by 2 to 12 fields of the same kind |
//!
//! Field pairs and tuples are ordered by the fields' position in the
//! dataset, so each combination is generated once. The True rule is always
//! appended.

mod count;
mod pairs;
mod single;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info, instrument};

use crate::description::{number_range, DatasetDescription, FieldDescription, FieldKind};
use crate::rule::Rule;

/// Controls which rules are generated.
pub trait GenerationDescriber: Send + Sync {
    /// Fields rules may be generated for.
    fn fields(&self) -> &[String];

    /// Whether to generate Add/Mul rules.
    fn arithmetic(&self) -> bool;

    /// Whether `generator` must not use `field`.
    fn deny(&self, generator: &str, field: &str) -> bool;
}

/// A plain [`GenerationDescriber`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationDescription {
    pub fields: Vec<String>,
    #[serde(default)]
    pub arithmetic: bool,
    /// Generator name to denied fields.
    #[serde(default)]
    pub deny: BTreeMap<String, Vec<String>>,
}

impl GenerationDescription {
    pub fn new<S: Into<String>>(fields: impl IntoIterator<Item = S>) -> Self {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn with_arithmetic(mut self, arithmetic: bool) -> Self {
        self.arithmetic = arithmetic;
        self
    }

    pub fn with_deny(mut self, generator: impl Into<String>, fields: Vec<String>) -> Self {
        self.deny.insert(generator.into(), fields);
        self
    }
}

impl GenerationDescriber for GenerationDescription {
    fn fields(&self) -> &[String] {
        &self.fields
    }

    fn arithmetic(&self) -> bool {
        self.arithmetic
    }

    fn deny(&self, generator: &str, field: &str) -> bool {
        self.deny
            .get(generator)
            .is_some_and(|fields| fields.iter().any(|f| f == field))
    }
}

type GenerateFn = fn(&Context<'_>, &str) -> Vec<Rule>;

struct Generator {
    name: &'static str,
    arithmetic: bool,
    generate: GenerateFn,
}

const fn generator(name: &'static str, generate: GenerateFn) -> Generator {
    Generator {
        name,
        arithmetic: false,
        generate,
    }
}

const fn arithmetic(name: &'static str, generate: GenerateFn) -> Generator {
    Generator {
        name,
        arithmetic: true,
        generate,
    }
}

static GENERATORS: &[Generator] = &[
    generator("EQFV", single::eq_fv),
    generator("NEFV", single::ne_fv),
    generator("LEFV", single::le_fv),
    generator("GEFV", single::ge_fv),
    generator("BetweenFV", single::between_fv),
    generator("OutsideFV", single::outside_fv),
    generator("InFV", single::in_fv),
    generator("EQFF", pairs::eq_ff),
    generator("NEFF", pairs::ne_ff),
    generator("LTFF", pairs::lt_ff),
    generator("LEFF", pairs::le_ff),
    generator("GEFF", pairs::ge_ff),
    generator("GTFF", pairs::gt_ff),
    arithmetic("AddLEF", pairs::add_le_f),
    arithmetic("AddGEF", pairs::add_ge_f),
    arithmetic("MulLEF", pairs::mul_le_f),
    arithmetic("MulGEF", pairs::mul_ge_f),
    generator("CountEQVF", count::count_eq_vf),
    generator("CountLTVF", count::count_lt_vf),
];

/// Names of the registered generators.
pub fn generator_names() -> Vec<&'static str> {
    GENERATORS.iter().map(|g| g.name).collect()
}

/// Generates candidate rules for the allowed fields, followed by True.
///
/// Fields that aren't described, or are described as Ignore, are skipped.
/// Duplicate rules are dropped.
#[instrument(skip_all, fields(num_fields = describer.fields().len()))]
pub fn generate(desc: &DatasetDescription, describer: &dyn GenerationDescriber) -> Vec<Rule> {
    let mut rules: Vec<Rule> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    for field in describer.fields() {
        match desc.field(field) {
            Some(fd) if fd.kind != FieldKind::Ignore => {}
            _ => {
                debug!(field = %field, "skipping field without a usable description");
                continue;
            }
        }
        for g in GENERATORS {
            if (g.arithmetic && !describer.arithmetic()) || describer.deny(g.name, field) {
                continue;
            }
            let ctx = Context {
                desc,
                describer,
                generator: g.name,
            };
            let before = rules.len();
            for rule in (g.generate)(&ctx, field) {
                if seen.insert(rule.to_string()) {
                    rules.push(rule);
                }
            }
            debug!(
                field = %field,
                generator = g.name,
                num_rules = rules.len() - before,
                "generated rules"
            );
        }
    }
    rules.push(Rule::True);
    info!(num_rules = rules.len(), "rule generation complete");
    rules
}

/// What a generator sees: the description, the describer and its own name.
pub(crate) struct Context<'a> {
    desc: &'a DatasetDescription,
    describer: &'a dyn GenerationDescriber,
    generator: &'static str,
}

impl<'a> Context<'a> {
    fn field(&self, name: &str) -> Option<&'a FieldDescription> {
        self.desc.field(name)
    }

    fn number(&self, name: &str) -> Option<(f64, f64, u32)> {
        number_range(self.field(name)?)
    }

    /// Allowed fields after `field` in dataset order that this generator
    /// may use, with their descriptions.
    fn partners(&self, field: &str) -> Vec<(&'a str, &'a FieldDescription)> {
        let Some(index) = self.desc.field_index(field) else {
            return Vec::new();
        };
        let mut out: Vec<(usize, &'a str, &'a FieldDescription)> = self
            .describer
            .fields()
            .iter()
            .filter(|f| !self.describer.deny(self.generator, f))
            .filter_map(|f| {
                let i = self.desc.field_index(f)?;
                let fd = self.desc.field(f)?;
                (i > index && fd.kind != FieldKind::Ignore).then_some((i, f.as_str(), fd))
            })
            .collect();
        out.sort_by_key(|(i, _, _)| *i);
        out.dedup_by_key(|(i, _, _)| *i);
        out.into_iter().map(|(_, f, fd)| (f, fd)).collect()
    }
}

/// All `k`-element combinations of `items`, in order.
fn combinations<T: Clone>(items: &[T], k: usize) -> Vec<Vec<T>> {
    let mut out = Vec::new();
    if k == 0 || k > items.len() {
        return out;
    }
    let mut idx: Vec<usize> = (0..k).collect();
    loop {
        out.push(idx.iter().map(|&i| items[i].clone()).collect());
        let Some(pos) = (0..k).rev().find(|&p| idx[p] != p + items.len() - k) else {
            return out;
        };
        idx[pos] += 1;
        for p in pos + 1..k {
            idx[p] = idx[p - 1] + 1;
        }
    }
}
