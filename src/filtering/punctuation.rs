//! Punctuation and numeral consistency between aligned segments.
use serde::{Deserialize, Serialize};

use crate::{error::Error, record::Record};

use super::{Filter, Score, Value};

const TERMINAL: [char; 4] = ['.', '?', '!', '…'];

/// Penalizes terminal punctuation count mismatches and repeated terminal punctuation.
///
/// With counts `cᵢ`, the penalty is `(max cᵢ - min cᵢ) + Σ max(cᵢ - 1, 0)`
/// and the score is `-ln(penalty + 1)`, which is 0 for a perfect record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminalPunctuation {
    #[serde(default = "TerminalPunctuation::default_threshold")]
    threshold: f64,
}

impl TerminalPunctuation {
    fn default_threshold() -> f64 {
        -2.0
    }

    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn value(&self, record: &Record) -> f64 {
        let counts: Vec<usize> = record
            .segments()
            .iter()
            .map(|s| s.chars().filter(|c| TERMINAL.contains(c)).count())
            .collect();
        let max = counts.iter().copied().max().unwrap_or(0);
        let min = counts.iter().copied().min().unwrap_or(0);
        let repeated: usize = counts.iter().map(|c| c.saturating_sub(1)).sum();
        let penalty = (max - min + repeated) as f64;
        -(penalty + 1.0).ln()
    }
}

impl Default for TerminalPunctuation {
    fn default() -> Self {
        Self::new(Self::default_threshold())
    }
}

impl Filter<&Record> for TerminalPunctuation {
    fn detect(&self, record: &Record) -> Result<bool, Error> {
        Ok(self.value(record) >= self.threshold)
    }
}

impl Score<&Record> for TerminalPunctuation {
    fn score(&self, record: &Record) -> Result<Value, Error> {
        Ok(Value::Number(self.value(record)))
    }
}

/// Similarity of the non-zero digit sequences of aligned segments.
///
/// Each segment is reduced to its digits `1`-`9`, and the sequences are compared with
/// a matching-blocks ratio `2M / T` (`M` matched digits, `T` total digits).
/// The lowest ratio between the first segment and any other one is reported.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NonZeroNumerals {
    #[serde(default = "NonZeroNumerals::default_threshold")]
    threshold: f64,
}

impl NonZeroNumerals {
    fn default_threshold() -> f64 {
        0.5
    }

    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    fn digits(text: &str) -> Vec<char> {
        text.chars().filter(|c| ('1'..='9').contains(c)).collect()
    }

    pub fn value(&self, record: &Record) -> f64 {
        let sequences: Vec<Vec<char>> = record.segments().iter().map(|s| Self::digits(s)).collect();
        match sequences.split_first() {
            Some((first, others)) => others
                .iter()
                .map(|other| similarity(first, other))
                .fold(1.0, f64::min),
            None => 1.0,
        }
    }
}

impl Default for NonZeroNumerals {
    fn default() -> Self {
        Self::new(Self::default_threshold())
    }
}

impl Filter<&Record> for NonZeroNumerals {
    fn detect(&self, record: &Record) -> Result<bool, Error> {
        Ok(self.value(record) >= self.threshold)
    }
}

impl Score<&Record> for NonZeroNumerals {
    fn score(&self, record: &Record) -> Result<Value, Error> {
        Ok(Value::Number(self.value(record)))
    }
}

/// `2M / T`, 1.0 if both sequences are empty.
pub fn similarity<T: PartialEq>(a: &[T], b: &[T]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching(a, b) as f64 / total as f64
}

/// Number of elements in matching blocks: the longest common run, then recursively
/// the runs on its left and on its right.
fn matching<T: PartialEq>(a: &[T], b: &[T]) -> usize {
    let (i, j, k) = longest_match(a, b);
    if k == 0 {
        return 0;
    }
    k + matching(&a[..i], &b[..j]) + matching(&a[i + k..], &b[j + k..])
}

/// Longest common run `(i, j, k)`, earliest in `a` then in `b` on ties.
fn longest_match<T: PartialEq>(a: &[T], b: &[T]) -> (usize, usize, usize) {
    let mut best = (0, 0, 0);
    // prev[j + 1]: length of the run ending at a[i - 1], b[j]
    let mut prev = vec![0usize; b.len() + 1];
    let mut cur = vec![0usize; b.len() + 1];
    for (i, x) in a.iter().enumerate() {
        for (j, y) in b.iter().enumerate() {
            cur[j + 1] = if x == y { prev[j] + 1 } else { 0 };
            let k = cur[j + 1];
            if k > best.2 {
                best = (i + 1 - k, j + 1 - k, k);
            }
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    best
}
