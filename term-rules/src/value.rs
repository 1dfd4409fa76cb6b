//! Scalar values and records.
//!
//! A [`Value`] holds an integer, a float, a string or an expression error.
//! Strings are kept in their original textual form and coerced lazily, so a
//! field read from a CSV file as `"5.00"` keeps that text for display while
//! still comparing equal to `5` as a number.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

use crate::error::ExprError;

/// A record: a mapping from field name to value.
pub type Record = HashMap<String, Value>;

/// A tagged scalar with lazy type coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A signed 64-bit integer.
    Int(i64),
    /// A 64-bit float.
    Float(f64),
    /// A string, coerced to a number on demand.
    Str(String),
    /// A typed error. Fails all numeric coercions.
    Error(ExprError),
}

impl Value {
    /// Returns the value as an integer: ints, integral floats and strings
    /// that parse as a signed integer. `"5.0"` is a float, not an int.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(f) => float_to_int(*f),
            Value::Str(s) => parse_int(s),
            Value::Error(_) => None,
        }
    }

    /// Returns the value as a float, if it is numeric.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Str(s) => parse_decimal(s),
            Value::Error(_) => None,
        }
    }

    /// Returns the value as a boolean. Only the strings `true` and `false` coerce.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Str(s) if s == "true" => Some(true),
            Value::Str(s) if s == "false" => Some(false),
            _ => None,
        }
    }

    /// Returns the error carried by the value, if any.
    pub fn error(&self) -> Option<&ExprError> {
        match self {
            Value::Error(e) => Some(e),
            _ => None,
        }
    }

    /// Returns true if the value coerces to a number.
    pub fn is_numeric(&self) -> bool {
        self.as_float().is_some()
    }

    /// Creates a float value rounded to `dp` decimal places. With `dp == 0`
    /// the result is an integer.
    pub fn rounded(v: f64, dp: u32) -> Value {
        let r = round_to(v, dp);
        if dp == 0 {
            float_to_int(r).map(Value::Int).unwrap_or(Value::Float(r))
        } else {
            Value::Float(r)
        }
    }

    /// Equality as used by rules and the `==` operator.
    ///
    /// Integers compare as integers, then floats as floats; text equality is
    /// only used when neither side is numeric. Returns `None` if either side
    /// is an error.
    pub fn loose_eq(&self, other: &Value) -> Option<bool> {
        if self.error().is_some() || other.error().is_some() {
            return None;
        }
        if let (Some(a), Some(b)) = (self.as_int(), other.as_int()) {
            return Some(a == b);
        }
        match (self.as_float(), other.as_float()) {
            (Some(a), Some(b)) => Some(a == b),
            (None, None) => Some(self.to_string() == other.to_string()),
            _ => Some(false),
        }
    }

    /// Numeric ordering. Integers compare as integers when both sides
    /// coerce to int, otherwise as floats. `None` if either side isn't numeric.
    pub fn numeric_cmp(&self, other: &Value) -> Option<Ordering> {
        if let (Some(a), Some(b)) = (self.as_int(), other.as_int()) {
            return Some(a.cmp(&b));
        }
        match (self.as_float(), other.as_float()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => None,
        }
    }

    /// Formats the value as an expression literal: numbers raw, everything
    /// else double-quoted.
    pub fn to_literal(&self) -> String {
        if self.is_numeric() {
            self.to_string()
        } else {
            let s = self.to_string();
            let mut out = String::with_capacity(s.len() + 2);
            out.push('"');
            for c in s.chars() {
                if c == '"' || c == '\\' {
                    out.push('\\');
                }
                out.push(c);
            }
            out.push('"');
            out
        }
    }
}

/// Rounds half away from zero to `dp` decimal places.
pub fn round_to(v: f64, dp: u32) -> f64 {
    let m = 10f64.powi(dp as i32);
    let r = (v * m).round() / m;
    if r.is_finite() {
        r
    } else {
        v
    }
}

fn float_to_int(f: f64) -> Option<i64> {
    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

fn parse_int(s: &str) -> Option<i64> {
    let digits = s.strip_prefix(['-', '+']).unwrap_or(s);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Parses `[+-]digits[.digits][e[+-]digits]`, rejecting `inf`, `NaN` and friends.
fn parse_decimal(s: &str) -> Option<f64> {
    let bytes = s.as_bytes();
    let mut i = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        i += 1;
    }
    let mut mantissa_digits = 0;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
        mantissa_digits += 1;
    }
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
            mantissa_digits += 1;
        }
    }
    if mantissa_digits == 0 {
        return None;
    }
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        i += 1;
        if matches!(bytes.get(i), Some(b'+') | Some(b'-')) {
            i += 1;
        }
        let start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == start {
            return None;
        }
    }
    if i != bytes.len() {
        return None;
    }
    s.parse().ok()
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{i}"),
            // Rust's float Display is already the shortest round-trip form
            Value::Float(v) if *v == 0.0 => write!(f, "0"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::Error(e) => write!(f, "{e}"),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Str(if v { "true" } else { "false" }.to_string())
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<ExprError> for Value {
    fn from(e: ExprError) -> Self {
        Value::Error(e)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Value::Str)
    }
}
