// src/parse/value.rs

use serde::{Serialize, Serializer};
use std::{cmp::Ordering, fmt};

/// A single typed cell, as inferred from its CSV text.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Value {
    /// Infer a typed value from one raw CSV field.
    ///
    /// - empty / `null` → `Null`
    /// - `true` / `false` (lower, upper or title case) → `Bool`
    /// - finite decimal numbers → `Number`
    /// - anything else stays `Text`, untouched
    pub fn infer(raw: &str) -> Self {
        let s = raw.trim();
        match s {
            "" | "null" | "NULL" | "Null" => return Value::Null,
            "true" | "TRUE" | "True" => return Value::Bool(true),
            "false" | "FALSE" | "False" => return Value::Bool(false),
            _ => {}
        }
        match parse_number(s) {
            Some(n) => Value::Number(n),
            None => Value::Text(raw.to_string()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::Text(_) => 3,
        }
    }

    /// Total order used for table sorting: `Null < Bool < Number < Text`.
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Number(a), Value::Number(b)) => a.total_cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

/// Accepts `-?(digits[.digits?]|.digits)([eE][+-]?digits)?`.
/// Rejects `inf`, `NaN`, a leading `+` and anything `f64::from_str`
/// would take that a human would not call a number.
fn parse_number(s: &str) -> Option<f64> {
    let body = s.strip_prefix('-').unwrap_or(s);
    let (mantissa, exponent) = match body.find(['e', 'E']) {
        Some(i) => (&body[..i], Some(&body[i + 1..])),
        None => (body, None),
    };

    let mut parts = mantissa.splitn(2, '.');
    let int_part = parts.next().unwrap_or("");
    let frac_part = parts.next();
    let all_digits = |p: &str| p.bytes().all(|b| b.is_ascii_digit());

    if !all_digits(int_part) || !frac_part.map_or(true, all_digits) {
        return None;
    }
    if int_part.is_empty() && frac_part.map_or(true, str::is_empty) {
        return None;
    }
    if let Some(exp) = exponent {
        let digits = exp.strip_prefix(['+', '-']).unwrap_or(exp);
        if digits.is_empty() || !all_digits(digits) {
            return None;
        }
    }

    s.parse::<f64>().ok().filter(|n| n.is_finite())
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => serializer.serialize_f64(*n),
            Value::Text(s) => serializer.serialize_str(s),
        }
    }
}
