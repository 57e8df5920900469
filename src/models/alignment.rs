//! Word alignment priors.
//!
//! Priors files hold tab-separated entries. Only lexical entries are used:
//!
//! ```text
//! LEX<TAB>source word<TAB>target word<TAB>count
//! ```
//!
//! Other entry kinds (`HMMF`, `HMMR`, `FERF`, `FERR`) are skipped.
//! Lexical counts are turned into smoothed translation tables in both directions,
//! which are then used to compute an IBM model 1 alignment cost (with a NULL source word).
use std::{
    collections::HashMap,
    io::BufRead,
    path::{Path, PathBuf},
};

use log::{debug, info};

use crate::error::Error;

/// additive smoothing on lexical counts
const ALPHA: f64 = 0.01;
/// lower bound on a token probability
const FLOOR: f64 = 1e-7;

/// Counts for one translation direction.
#[derive(Debug, Default)]
struct Table {
    // given word -> (predicted word -> count)
    pairs: HashMap<String, HashMap<String, f64>>,
    // given word -> total count
    totals: HashMap<String, f64>,
    // predicted word -> total count, used for the NULL word
    unigrams: HashMap<String, f64>,
    total: f64,
}

impl Table {
    fn add(&mut self, given: &str, predicted: &str, count: f64) {
        *self
            .pairs
            .entry(given.to_string())
            .or_default()
            .entry(predicted.to_string())
            .or_default() += count;
        *self.totals.entry(given.to_string()).or_default() += count;
        *self.unigrams.entry(predicted.to_string()).or_default() += count;
        self.total += count;
    }

    fn vocab_size(&self) -> f64 {
        self.unigrams.len().max(1) as f64
    }

    /// t(predicted | given)
    fn prob(&self, given: &str, predicted: &str) -> f64 {
        let count = self
            .pairs
            .get(given)
            .and_then(|p| p.get(predicted))
            .copied()
            .unwrap_or(0.0);
        let total = self.totals.get(given).copied().unwrap_or(0.0);
        (count + ALPHA) / (total + ALPHA * self.vocab_size())
    }

    /// t(predicted | NULL)
    fn null_prob(&self, predicted: &str) -> f64 {
        let count = self.unigrams.get(predicted).copied().unwrap_or(0.0);
        (count + ALPHA) / (self.total + ALPHA * self.vocab_size())
    }

    /// Mean negative log2 likelihood of `predicted` given `given`, per predicted token.
    fn cost(&self, given: &[String], predicted: &[String]) -> f64 {
        if predicted.is_empty() {
            return 0.0;
        }
        let norm = (given.len() + 1) as f64;
        let bits: f64 = predicted
            .iter()
            .map(|p| {
                let sum = self.null_prob(p) + given.iter().map(|g| self.prob(g, p)).sum::<f64>();
                -(sum / norm).max(FLOOR).log2()
            })
            .sum();
        bits / predicted.len() as f64
    }
}

/// Lexical priors in both directions.
#[derive(Debug)]
pub struct AlignmentPriors {
    path: PathBuf,
    forward: Table,
    reverse: Table,
}

impl AlignmentPriors {
    /// Load a (possibly gzipped) priors file.
    pub fn from_path(path: &Path) -> Result<Self, Error> {
        if !path.exists() {
            return Err(Error::model_load(path, "not found"));
        }
        info!("loading alignment priors {path:?}");
        let reader = crate::io::open_read(path).map_err(|e| Error::model_load(path, e))?;
        Self::from_reader(reader, path)
    }

    fn from_reader(reader: impl BufRead, path: &Path) -> Result<Self, Error> {
        let mut forward = Table::default();
        let mut reverse = Table::default();
        let mut skipped = 0;

        for (lineno, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| Error::model_load(path, e))?;
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            if fields[0] != "LEX" {
                skipped += 1;
                continue;
            }
            if fields.len() != 4 {
                return Err(Error::model_load(
                    path,
                    format!("line {}: expected 4 fields in LEX entry", lineno + 1),
                ));
            }
            let count: f64 = fields[3].trim().parse().map_err(|_| {
                Error::model_load(path, format!("line {}: bad count", lineno + 1))
            })?;
            if count < 0.0 {
                return Err(Error::model_load(
                    path,
                    format!("line {}: negative count", lineno + 1),
                ));
            }
            forward.add(fields[1], fields[2], count);
            reverse.add(fields[2], fields[1], count);
        }

        if forward.total <= 0.0 {
            return Err(Error::model_load(path, "no lexical priors found"));
        }
        debug!(
            "{:?}: {} source words, {} target words, {skipped} non-lexical entries skipped",
            path,
            forward.totals.len(),
            reverse.totals.len()
        );
        Ok(Self {
            path: path.to_path_buf(),
            forward,
            reverse,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Alignment costs `(source → target, target → source)` in bits per token.
    /// Lower is better.
    pub fn score(&self, src: &[String], tgt: &[String]) -> (f64, f64) {
        (self.forward.cost(src, tgt), self.reverse.cost(tgt, src))
    }
}
