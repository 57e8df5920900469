//! Word alignment scorer.
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::{Deserialize, Serialize};

use crate::{
    error::Error,
    models::{AlignmentPriors, ModelCache},
    record::Record,
    tokenizers::{self, Tokenizer, TokenizerSpec},
};

use super::{Score, Value};

/// Configuration form of [WordAlign].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordAlignParams {
    /// Lexical priors file.
    pub priors: PathBuf,
    #[serde(default)]
    pub src_tokenizer: Option<TokenizerSpec>,
    #[serde(default)]
    pub tgt_tokenizer: Option<TokenizerSpec>,
    /// Alignment model number (1 to 3). Only lexical priors are available,
    /// so every model is scored with lexical translation probabilities.
    #[serde(default = "WordAlignParams::default_model")]
    pub model: u8,
}

impl WordAlignParams {
    fn default_model() -> u8 {
        3
    }
}

/// Scores bitexts with `[source → target, target → source]` alignment costs (bits per token).
pub struct WordAlign {
    priors: Arc<AlignmentPriors>,
    src_tokenizer: Box<dyn Tokenizer>,
    tgt_tokenizer: Box<dyn Tokenizer>,
}

impl WordAlign {
    pub fn new(params: &WordAlignParams, base: &Path, cache: &ModelCache) -> Result<Self, Error> {
        if !(1..=3).contains(&params.model) {
            return Err(Error::config(format!(
                "WordAlignFilter: unknown alignment model {}",
                params.model
            )));
        }
        Ok(Self {
            priors: cache.priors(&crate::io::resolve(base, &params.priors))?,
            src_tokenizer: tokenizers::from_spec(params.src_tokenizer.as_ref())?,
            tgt_tokenizer: tokenizers::from_spec(params.tgt_tokenizer.as_ref())?,
        })
    }
}

impl Score<&Record> for WordAlign {
    fn score(&self, record: &Record) -> Result<Value, Error> {
        match record.segments() {
            [src, tgt] => {
                let (forward, reverse) = self.priors.score(
                    &self.src_tokenizer.tokenize(src),
                    &self.tgt_tokenizer.tokenize(tgt),
                );
                Ok(Value::Numbers(vec![forward, reverse]))
            }
            other => Err(Error::config(format!(
                "WordAlignFilter works on 2 streams, got {}",
                other.len()
            ))),
        }
    }
}

impl std::fmt::Debug for WordAlign {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WordAlign")
            .field("priors", &self.priors.path())
            .finish()
    }
}
