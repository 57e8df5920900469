/*! Tokenization

Tokenizers are looked up by `(method, language)`:

- `none`: whitespace splitting, for pre-tokenized corpora,
- `unicode`: Unicode word-boundary segmentation (UAX #29), keeping punctuation as separate tokens.

Other methods (Moses etc.) live outside of this crate and can be plugged in by implementing [Tokenizer].
!*/
use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

use crate::error::Error;

pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: &str) -> Vec<String>;
}

/// Whitespace tokenizer.
#[derive(Debug, Default, Clone, Copy)]
pub struct Whitespace;

impl Tokenizer for Whitespace {
    fn tokenize(&self, text: &str) -> Vec<String> {
        text.split_whitespace().map(String::from).collect()
    }
}

/// UAX #29 word segmentation. Whitespace segments are dropped,
/// punctuation is kept.
#[derive(Debug, Clone)]
pub struct UnicodeWords {
    lang: String,
}

impl UnicodeWords {
    pub fn new(lang: &str) -> Self {
        Self {
            lang: lang.to_string(),
        }
    }

    pub fn lang(&self) -> &str {
        &self.lang
    }
}

impl Tokenizer for UnicodeWords {
    fn tokenize(&self, text: &str) -> Vec<String> {
        text.split_word_bounds()
            .filter(|w| !w.trim().is_empty())
            .map(String::from)
            .collect()
    }
}

/// `[method, language]` pair, as found in filter parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenizerSpec(pub String, pub String);

impl TokenizerSpec {
    pub fn method(&self) -> &str {
        &self.0
    }

    pub fn lang(&self) -> &str {
        &self.1
    }
}

/// Get a tokenizer for a given method and language.
///
/// # Errors
/// Returns a configuration error on unknown methods.
pub fn get(method: &str, lang: &str) -> Result<Box<dyn Tokenizer>, Error> {
    match method {
        "none" | "whitespace" => Ok(Box::new(Whitespace)),
        "unicode" => Ok(Box::new(UnicodeWords::new(lang))),
        other => Err(Error::config(format!(
            "unknown tokenizer method {other:?} (expected `none` or `unicode`)"
        ))),
    }
}

/// Resolve an optional tokenizer spec, falling back to whitespace splitting.
pub fn from_spec(spec: Option<&TokenizerSpec>) -> Result<Box<dyn Tokenizer>, Error> {
    match spec {
        Some(spec) => get(spec.method(), spec.lang()),
        None => Ok(Box::new(Whitespace)),
    }
}
