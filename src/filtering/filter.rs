//! Filtering traits.
use serde_json::Number;

use crate::error::Error;

/// Whether a pipeline asks oracles for a keep/drop decision or for a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Filter,
    Score,
}

/// Oracle output.
///
/// Filter mode always yields a [Value::Bool].
/// Score mode yields numbers, or one value per stream where applicable.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Number(f64),
    Bools(Vec<bool>),
    Numbers(Vec<f64>),
}

impl Value {
    /// The decision carried by a filter-mode value.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

/// Non-finite numbers (infinite length ratios) become JSON `null`.
fn number(x: f64) -> serde_json::Value {
    Number::from_f64(x).map_or(serde_json::Value::Null, serde_json::Value::Number)
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Number(x) => number(x),
            Value::Bools(v) => v.into_iter().map(serde_json::Value::Bool).collect(),
            Value::Numbers(v) => v.into_iter().map(number).collect(),
        }
    }
}

/// Immutable, pure filter (2 successive equal inputs -> 2 equal outputs).
pub trait Filter<T> {
    /// `true` if the item is kept.
    fn detect(&self, item: T) -> Result<bool, Error>;
}

/// Immutable scorer.
pub trait Score<T> {
    fn score(&self, item: T) -> Result<Value, Error>;
}
