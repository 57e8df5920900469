//! Character script filter.
//!
//! Computes, for each segment, the proportion of letters that belong to the expected Unicode script.
//! Non-letter characters (digits, punctuation, whitespace, symbols) are ignored.
use serde::{Deserialize, Serialize};
use unic_ucd::GeneralCategory;
use unicode_script::{Script, UnicodeScript};

use crate::{error::Error, record::Record};

use super::{Filter, Score, Value};

/// Configuration form of [CharacterScore].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterScoreParams {
    /// One script name per stream (`Latin`, `Cyrillic`, or short names like `Latn`).
    pub scripts: Vec<String>,
    /// One threshold per stream, defaults to 1.0.
    #[serde(default)]
    pub thresholds: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct CharacterScore {
    scripts: Vec<Script>,
    thresholds: Vec<f64>,
}

fn script_from_name(name: &str) -> Option<Script> {
    Script::from_full_name(name).or_else(|| Script::from_short_name(name))
}

impl CharacterScore {
    /// # Errors
    /// Fails on unknown script names, empty script lists or mismatched threshold count.
    pub fn new(params: &CharacterScoreParams) -> Result<Self, Error> {
        if params.scripts.is_empty() {
            return Err(Error::config("CharacterScoreFilter needs at least one script"));
        }
        let scripts = params
            .scripts
            .iter()
            .map(|name| {
                script_from_name(name)
                    .ok_or_else(|| Error::config(format!("unknown script name {name:?}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let thresholds = if params.thresholds.is_empty() {
            vec![1.0; scripts.len()]
        } else if params.thresholds.len() == scripts.len() {
            params.thresholds.clone()
        } else {
            return Err(Error::config(format!(
                "CharacterScoreFilter: {} scripts but {} thresholds",
                scripts.len(),
                params.thresholds.len()
            )));
        };

        Ok(Self {
            scripts,
            thresholds,
        })
    }

    pub fn arity(&self) -> usize {
        self.scripts.len()
    }

    /// Proportion of letters of `text` written in `script`. 1.0 when there are no letters.
    pub fn ratio(text: &str, script: Script) -> f64 {
        let (total, matching) = text
            .chars()
            .filter(|c| GeneralCategory::of(*c).is_letter())
            .fold((0usize, 0usize), |(total, matching), c| {
                (total + 1, matching + usize::from(c.script() == script))
            });
        if total == 0 {
            1.0
        } else {
            matching as f64 / total as f64
        }
    }

    fn ratios(&self, record: &Record) -> Result<Vec<f64>, Error> {
        if record.arity() != self.scripts.len() {
            return Err(Error::config(format!(
                "CharacterScoreFilter has {} scripts for {} streams",
                self.scripts.len(),
                record.arity()
            )));
        }
        Ok(record
            .segments()
            .iter()
            .zip(&self.scripts)
            .map(|(segment, script)| Self::ratio(segment, *script))
            .collect())
    }
}

impl Filter<&Record> for CharacterScore {
    fn detect(&self, record: &Record) -> Result<bool, Error> {
        Ok(self
            .ratios(record)?
            .iter()
            .zip(&self.thresholds)
            .all(|(ratio, threshold)| ratio >= threshold))
    }
}

impl Score<&Record> for CharacterScore {
    fn score(&self, record: &Record) -> Result<Value, Error> {
        Ok(Value::Numbers(self.ratios(record)?))
    }
}
