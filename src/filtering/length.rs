//! Length-based filters.
//!
//! Lengths are counted in whitespace-separated words or in Unicode codepoints.
use itertools::{Itertools, MinMaxResult};
use serde::{Deserialize, Serialize};

use crate::{error::Error, record::Record};

use super::{Filter, Score, Value};

/// Length unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    #[serde(alias = "words")]
    Word,
    #[serde(alias = "character", alias = "characters", alias = "chars")]
    Char,
}

impl Default for Unit {
    fn default() -> Self {
        Unit::Word
    }
}

impl Unit {
    pub fn count(&self, text: &str) -> usize {
        match self {
            Unit::Word => text.split_whitespace().count(),
            Unit::Char => text.chars().count(),
        }
    }
}

/// Keeps records whose segments all have a length within `[min_length, max_length]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Length {
    #[serde(default = "Length::default_min")]
    min_length: usize,
    #[serde(default = "Length::default_max")]
    max_length: usize,
    #[serde(default)]
    unit: Unit,
}

impl Length {
    fn default_min() -> usize {
        1
    }
    fn default_max() -> usize {
        100
    }

    pub fn new(min_length: usize, max_length: usize, unit: Unit) -> Self {
        Self {
            min_length,
            max_length,
            unit,
        }
    }

    fn lengths(&self, record: &Record) -> Vec<usize> {
        record
            .segments()
            .iter()
            .map(|s| self.unit.count(s))
            .collect()
    }
}

impl Default for Length {
    fn default() -> Self {
        Self::new(Self::default_min(), Self::default_max(), Unit::default())
    }
}

impl Filter<&Record> for Length {
    fn detect(&self, record: &Record) -> Result<bool, Error> {
        Ok(self
            .lengths(record)
            .iter()
            .all(|l| (self.min_length..=self.max_length).contains(l)))
    }
}

impl Score<&Record> for Length {
    fn score(&self, record: &Record) -> Result<Value, Error> {
        Ok(Value::Numbers(
            self.lengths(record).into_iter().map(|l| l as f64).collect(),
        ))
    }
}

/// Ratio between the longest and the shortest segment.
///
/// A record with an empty segment has an infinite ratio and is always dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LengthRatio {
    #[serde(default = "LengthRatio::default_threshold")]
    threshold: f64,
    #[serde(default)]
    unit: Unit,
}

impl LengthRatio {
    fn default_threshold() -> f64 {
        3.0
    }

    pub fn new(threshold: f64, unit: Unit) -> Self {
        Self { threshold, unit }
    }

    pub fn ratio(&self, record: &Record) -> f64 {
        match record
            .segments()
            .iter()
            .map(|s| self.unit.count(s))
            .minmax()
        {
            MinMaxResult::NoElements => f64::INFINITY,
            MinMaxResult::OneElement(0) => f64::INFINITY,
            MinMaxResult::OneElement(_) => 1.0,
            MinMaxResult::MinMax(0, _) => f64::INFINITY,
            MinMaxResult::MinMax(min, max) => max as f64 / min as f64,
        }
    }
}

impl Default for LengthRatio {
    fn default() -> Self {
        Self::new(Self::default_threshold(), Unit::default())
    }
}

impl Filter<&Record> for LengthRatio {
    fn detect(&self, record: &Record) -> Result<bool, Error> {
        // a ratio on the threshold is kept, an empty segment never is
        let ratio = self.ratio(record);
        Ok(ratio.is_finite() && ratio <= self.threshold)
    }
}

impl Score<&Record> for LengthRatio {
    fn score(&self, record: &Record) -> Result<Value, Error> {
        Ok(Value::Number(self.ratio(record)))
    }
}

/// Drops records containing a word of `threshold` characters or more.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LongWord {
    #[serde(default = "LongWord::default_threshold")]
    threshold: usize,
}

impl LongWord {
    fn default_threshold() -> usize {
        40
    }

    pub fn new(threshold: usize) -> Self {
        Self { threshold }
    }

    /// Longest word length (in codepoints) among all segments.
    pub fn longest(&self, record: &Record) -> usize {
        record
            .segments()
            .iter()
            .flat_map(|s| s.split_whitespace())
            .map(|w| w.chars().count())
            .max()
            .unwrap_or(0)
    }
}

impl Default for LongWord {
    fn default() -> Self {
        Self::new(Self::default_threshold())
    }
}

impl Filter<&Record> for LongWord {
    fn detect(&self, record: &Record) -> Result<bool, Error> {
        Ok(self.longest(record) < self.threshold)
    }
}

impl Score<&Record> for LongWord {
    fn score(&self, record: &Record) -> Result<Value, Error> {
        Ok(Value::Number(self.longest(record) as f64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(segments: &[&str]) -> Record {
        Record::from((0, segments.to_vec()))
    }

    #[test]
    fn length_words() {
        let f = Length::new(1, 3, Unit::Word);
        assert!(f.detect(&rec(&["Hei.", "Hi."])).unwrap());
        assert!(!f.detect(&rec(&["Tämä on testi.", "This is a test."])).unwrap());
        assert!(!f.detect(&rec(&["", "Hi."])).unwrap());
        assert_eq!(
            f.score(&rec(&["Tämä on testi.", "This is a test."])).unwrap(),
            Value::Numbers(vec![3.0, 4.0])
        );
    }

    #[test]
    fn length_chars() {
        let f = Length::new(1, 4, Unit::Char);
        assert!(f.detect(&rec(&["Hei.", "Hiä."])).unwrap());
        assert!(!f.detect(&rec(&["Hei!!", "Hi."])).unwrap());
    }

    #[test]
    fn ratio() {
        let f = LengthRatio::new(3.0, Unit::Word);
        assert_eq!(f.ratio(&rec(&["Hei.", "Hi."])), 1.0);
        assert!(f.detect(&rec(&["Hei.", "Hi."])).unwrap());
        assert!(f.detect(&rec(&["Tämä on testi.", "This is a test."])).unwrap());
        assert!(!f.detect(&rec(&["a", "a b c d"])).unwrap());
    }

    #[test]
    fn ratio_on_threshold_is_kept() {
        let f = LengthRatio::new(3.0, Unit::Word);
        assert_eq!(f.ratio(&rec(&["a", "a b c"])), 3.0);
        assert!(f.detect(&rec(&["a", "a b c"])).unwrap());
        assert!(!LengthRatio::new(f64::INFINITY, Unit::Word)
            .detect(&rec(&["", "a"]))
            .unwrap());
    }

    #[test]
    fn ratio_empty_segment_is_dropped() {
        let f = LengthRatio::default();
        assert_eq!(f.ratio(&rec(&["", "Hi."])), f64::INFINITY);
        assert!(!f.detect(&rec(&["", "Hi."])).unwrap());
        assert!(!f.detect(&rec(&["", ""])).unwrap());
    }

    #[test]
    fn long_word() {
        let f = LongWord::new(10);
        assert!(f.detect(&rec(&["short words", "only"])).unwrap());
        assert!(!f
            .detect(&rec(&["Lentokonesuihkuturbiinimoottoriapumekaanikko", "x"]))
            .unwrap());
        assert_eq!(f.score(&rec(&["abc", "abcd ab"])).unwrap(), Value::Number(4.0));
    }

    #[test]
    fn unit_aliases() {
        let u: Unit = serde_json::from_str("\"character\"").unwrap();
        assert_eq!(u, Unit::Char);
        let l: Length = serde_json::from_str("{\"max_length\": 10}").unwrap();
        assert_eq!(l.min_length, 1);
        assert_eq!(l.unit, Unit::Word);
    }
}
