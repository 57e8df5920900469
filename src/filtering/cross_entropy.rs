//! Language model cross-entropy scorer.
//!
//! Each stream gets its own (possibly interpolated) n-gram model, and the score of a record is
//! the list of per-segment cross-entropies in bits per token. Lower means more fluent.
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    error::Error,
    models::{InterpolatedLm, LmTokenizer, ModelCache},
    record::Record,
};

use super::{Score, Value};

/// Language model of one stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LmParams {
    /// ARPA file (optionally gzipped).
    pub filename: PathBuf,
    /// Background models as `[path, weight]`.
    #[serde(default)]
    pub interpolate: Vec<(PathBuf, f64)>,
    #[serde(flatten)]
    pub tokenizer: LmTokenizer,
}

/// Configuration form of [CrossEntropy].
///
/// Models are given either as a per-stream `lm_params` list
/// or as a `src_lm_params`/`tgt_lm_params` pair for bitexts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrossEntropyParams {
    #[serde(default)]
    pub lm_params: Vec<LmParams>,
    #[serde(default)]
    pub src_lm_params: Option<LmParams>,
    #[serde(default)]
    pub tgt_lm_params: Option<LmParams>,
}

impl CrossEntropyParams {
    fn streams(&self) -> Result<Vec<&LmParams>, Error> {
        match (&self.src_lm_params, &self.tgt_lm_params) {
            (None, None) if !self.lm_params.is_empty() => Ok(self.lm_params.iter().collect()),
            (Some(src), Some(tgt)) if self.lm_params.is_empty() => Ok(vec![src, tgt]),
            _ => Err(Error::config(
                "CrossEntropyFilter needs either `lm_params` or both `src_lm_params` and `tgt_lm_params`",
            )),
        }
    }
}

#[derive(Debug)]
pub struct CrossEntropy {
    lms: Vec<InterpolatedLm>,
}

impl CrossEntropy {
    /// Load (or reuse from `cache`) the models. Relative paths are resolved against `base`.
    pub fn new(params: &CrossEntropyParams, base: &Path, cache: &ModelCache) -> Result<Self, Error> {
        let lms = params
            .streams()?
            .into_iter()
            .map(|p| {
                let main = cache.lm(&crate::io::resolve(base, &p.filename))?;
                let others = p
                    .interpolate
                    .iter()
                    .map(|(path, weight)| Ok((cache.lm(&crate::io::resolve(base, path))?, *weight)))
                    .collect::<Result<Vec<_>, Error>>()?;
                debug!(
                    "cross-entropy model {:?} ({} interpolated)",
                    main.path(),
                    others.len()
                );
                InterpolatedLm::new(main, others, p.tokenizer.clone())
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { lms })
    }

    pub fn arity(&self) -> usize {
        self.lms.len()
    }
}

impl Score<&Record> for CrossEntropy {
    fn score(&self, record: &Record) -> Result<Value, Error> {
        if record.arity() != self.lms.len() {
            return Err(Error::config(format!(
                "CrossEntropyFilter has {} models for {} streams",
                self.lms.len(),
                record.arity()
            )));
        }
        Ok(Value::Numbers(
            record
                .segments()
                .iter()
                .zip(&self.lms)
                .map(|(segment, lm)| lm.cross_entropy(segment))
                .collect(),
        ))
    }
}
