//! Statistical descriptions of a dataset's fields.
//!
//! [`DatasetDescription::describe`] makes one streaming pass over a dataset
//! and classifies every field:
//!
//! - **Number**: every value coerces to a float. Tracks `min`, `max` and the
//!   maximum number of decimal places.
//! - **String**: at least one value isn't numeric.
//! - **Ignore**: a string field with too many distinct values to be useful
//!   for rule generation, or a field with no values at all.
//!
//! Fields of every kind keep a value histogram while they have at most
//! [`MAX_NUM_VALUES`] distinct values.
//!
//! The module also provides the threshold point generators used when
//! generating and tweaking numeric rules.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, instrument};

use crate::dataset::Dataset;
use crate::error::Result;
use crate::value::{round_to, Value};

/// Maximum number of distinct values tracked per field.
pub const MAX_NUM_VALUES: usize = 100;

/// The kind of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Ignore,
    Number,
    String,
}

/// Number of occurrences of a value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueCount {
    pub value: Value,
    pub count: i64,
}

/// The description of one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescription {
    pub kind: FieldKind,
    pub min: Option<Value>,
    pub max: Option<Value>,
    pub max_dp: u32,
    /// Histogram keyed by the value's text.
    pub values: BTreeMap<String, ValueCount>,
    /// Number of distinct values, or -1 if there were too many to track.
    pub num_values: i64,
}

impl FieldDescription {
    /// Creates a Number description from its range.
    pub fn number(min: impl Into<Value>, max: impl Into<Value>, max_dp: u32) -> Self {
        Self {
            kind: FieldKind::Number,
            min: Some(min.into()),
            max: Some(max.into()),
            max_dp,
            values: BTreeMap::new(),
            num_values: -1,
        }
    }

    /// Creates a String description from a histogram.
    pub fn string<'a>(values: impl IntoIterator<Item = (&'a str, i64)>) -> Self {
        let values: BTreeMap<String, ValueCount> = values
            .into_iter()
            .map(|(v, count)| {
                (
                    v.to_string(),
                    ValueCount {
                        value: Value::from(v),
                        count,
                    },
                )
            })
            .collect();
        Self {
            kind: FieldKind::String,
            min: None,
            max: None,
            max_dp: 0,
            num_values: values.len() as i64,
            values,
        }
    }

    /// Creates an Ignore description.
    pub fn ignore() -> Self {
        Self {
            kind: FieldKind::Ignore,
            min: None,
            max: None,
            max_dp: 0,
            values: BTreeMap::new(),
            num_values: -1,
        }
    }

    /// Replaces the histogram, keeping the kind and range.
    pub fn with_values<'a>(mut self, values: impl IntoIterator<Item = (&'a str, i64)>) -> Self {
        let histogram = Self::string(values);
        self.num_values = histogram.num_values;
        self.values = histogram.values;
        self
    }

    /// Minimum and maximum as floats, for Number fields.
    pub fn range(&self) -> Option<(f64, f64)> {
        match (self.kind, &self.min, &self.max) {
            (FieldKind::Number, Some(min), Some(max)) => Some((min.as_float()?, max.as_float()?)),
            _ => None,
        }
    }

    /// Histogram values with at least `min_count` occurrences, in key order.
    pub fn values_with_count(&self, min_count: i64) -> Vec<&Value> {
        self.values
            .values()
            .filter(|vc| vc.count >= min_count)
            .map(|vc| &vc.value)
            .collect()
    }
}

/// Descriptions of every field of a dataset.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DatasetDescription {
    /// Field names in their positional order.
    pub fields: Vec<String>,
    pub descriptions: BTreeMap<String, FieldDescription>,
}

impl DatasetDescription {
    /// Creates an empty description.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field description, keeping insertion order.
    pub fn with_field(mut self, name: impl Into<String>, desc: FieldDescription) -> Self {
        let name = name.into();
        if !self.fields.contains(&name) {
            self.fields.push(name.clone());
        }
        self.descriptions.insert(name, desc);
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescription> {
        self.descriptions.get(name)
    }

    /// Position of the field in the dataset.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f == name)
    }

    /// Streams `dataset` once, describing every field.
    #[instrument(skip(dataset), fields(fields = dataset.fields().len()))]
    pub fn describe(dataset: &dyn Dataset) -> Result<Self> {
        let fields = dataset.fields();
        let mut builders: Vec<FieldBuilder> = fields.iter().map(|_| FieldBuilder::new()).collect();
        let mut conn = dataset.open()?;
        let mut num_records = 0u64;
        for record in conn.by_ref() {
            let record = record?;
            for (name, builder) in fields.iter().zip(builders.iter_mut()) {
                if let Some(v) = record.get(name) {
                    builder.next_value(v);
                }
            }
            num_records += 1;
        }
        conn.close()?;

        let descriptions: BTreeMap<String, FieldDescription> = fields
            .iter()
            .cloned()
            .zip(builders.into_iter().map(FieldBuilder::finish))
            .collect();
        debug!(
            num_records,
            numbers = descriptions
                .values()
                .filter(|d| d.kind == FieldKind::Number)
                .count(),
            "Described dataset"
        );
        Ok(Self {
            fields,
            descriptions,
        })
    }
}

struct FieldBuilder {
    kind: FieldKind,
    seen: bool,
    min: Option<(f64, Value)>,
    max: Option<(f64, Value)>,
    max_dp: u32,
    values: Option<BTreeMap<String, ValueCount>>,
}

impl FieldBuilder {
    fn new() -> Self {
        Self {
            kind: FieldKind::Number,
            seen: false,
            min: None,
            max: None,
            max_dp: 0,
            values: Some(BTreeMap::new()),
        }
    }

    fn next_value(&mut self, v: &Value) {
        self.seen = true;
        if let Some(values) = self.values.as_mut() {
            values
                .entry(v.to_string())
                .or_insert_with(|| ValueCount {
                    value: v.clone(),
                    count: 0,
                })
                .count += 1;
            if values.len() > MAX_NUM_VALUES {
                self.values = None;
            }
        }

        if self.kind != FieldKind::Number {
            return;
        }
        let Some(f) = v.as_float() else {
            self.kind = FieldKind::String;
            self.min = None;
            self.max = None;
            self.max_dp = 0;
            return;
        };
        if self.min.as_ref().map_or(true, |(m, _)| f < *m) {
            self.min = Some((f, v.clone()));
        }
        if self.max.as_ref().map_or(true, |(m, _)| f > *m) {
            self.max = Some((f, v.clone()));
        }
        self.max_dp = self.max_dp.max(num_decimal_places(v));
    }

    fn finish(self) -> FieldDescription {
        let num_values = self.values.as_ref().map_or(-1, |v| v.len() as i64);
        let kind = match self.kind {
            _ if !self.seen => FieldKind::Ignore,
            FieldKind::String if self.values.is_none() => FieldKind::Ignore,
            k => k,
        };
        FieldDescription {
            kind,
            min: self.min.map(|(_, v)| v),
            max: self.max.map(|(_, v)| v),
            max_dp: self.max_dp,
            values: self.values.unwrap_or_default(),
            num_values,
        }
    }
}

/// Number of significant decimal places, ignoring trailing zeros.
///
/// ```rust
/// use term_rules::description::num_decimal_places;
/// use term_rules::value::Value;
///
/// assert_eq!(num_decimal_places(&Value::from("235.00")), 0);
/// assert_eq!(num_decimal_places(&Value::from(".230")), 2);
/// ```
pub fn num_decimal_places(v: &Value) -> u32 {
    let text = match v {
        Value::Int(_) | Value::Error(_) => return 0,
        Value::Float(f) => Value::Float(*f).to_string(),
        Value::Str(s) if s.contains(['e', 'E']) => match v.as_float() {
            Some(f) => Value::Float(f).to_string(),
            None => return 0,
        },
        Value::Str(s) => s.clone(),
    };
    match text.split_once('.') {
        Some((_, frac)) => frac.trim_end_matches('0').len() as u32,
        None => 0,
    }
}

/// A float as a value: integral floats become [`Value::Int`].
pub(crate) fn point_value(f: f64) -> Value {
    if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        Value::Int(f as i64)
    } else {
        Value::Float(f)
    }
}

/// Minimum, maximum and decimal places of a Number field.
pub(crate) fn number_range(fd: &FieldDescription) -> Option<(f64, f64, u32)> {
    let (min, max) = fd.range()?;
    Some((min, max, fd.max_dp))
}

/// Range of `a + b` over two number ranges.
pub(crate) fn add_range(a: (f64, f64, u32), b: (f64, f64, u32)) -> (f64, f64, u32) {
    (a.0 + b.0, a.1 + b.1, a.2.max(b.2))
}

/// Range of `a * b` over two number ranges.
pub(crate) fn mul_range(a: (f64, f64, u32), b: (f64, f64, u32)) -> (f64, f64, u32) {
    let corners = [a.0 * b.0, a.0 * b.1, a.1 * b.0, a.1 * b.1];
    let min = corners.iter().copied().fold(f64::INFINITY, f64::min);
    let max = corners.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    (min, max, a.2 + b.2)
}

fn step_size(min: f64, max: f64, divisor: f64, max_dp: u32) -> f64 {
    let step = round_to((max - min) / divisor, max_dp);
    if step == 0.0 {
        1.0
    } else {
        step
    }
}

fn sorted_points(mut points: Vec<f64>) -> Vec<Value> {
    points.sort_by(|a, b| a.total_cmp(b));
    points.dedup();
    points.into_iter().map(point_value).collect()
}

fn push_roundings(points: &mut Vec<f64>, v: f64, min: f64, max: f64, max_dp: u32) {
    for dp in 0..=max_dp {
        let r = round_to(v, dp);
        if r > min && r < max {
            points.push(r);
        }
    }
}

/// Candidate thresholds strictly between `min` and `max`, sorted and unique.
///
/// Points are `min + k * step` for `k` in `1..20`, with each also rounded to
/// every number of decimal places from 0 to `max_dp`.
pub fn generate_points(min: f64, max: f64, max_dp: u32) -> Vec<Value> {
    let step = step_size(min, max, 20.0, max_dp);
    let mut points = Vec::new();
    for k in 1..20 {
        let v = round_to(min + k as f64 * step, max_dp);
        push_roundings(&mut points, v, min, max, max_dp);
    }
    sorted_points(points)
}

/// Candidate thresholds around `value`, strictly between `min` and `max`
/// and never equal to `value`. Later stages use finer steps.
pub fn generate_tweak_points(value: f64, min: f64, max: f64, max_dp: u32, stage: u32) -> Vec<Value> {
    let step = step_size(min, max, 10.0 * stage.max(1) as f64, max_dp);
    let mut points = Vec::new();
    for k in (-5i32..=5).filter(|k| *k != 0) {
        let v = round_to(value + k as f64 * step, max_dp);
        push_roundings(&mut points, v, min, max, max_dp);
    }
    points.retain(|p| *p != value);
    sorted_points(points)
}
