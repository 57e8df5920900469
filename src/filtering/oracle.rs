//! Oracle dispatch.
//!
//! [OracleConfig] is the configuration form of a filter, written as `{"<Kind>": {params..., "name": ...}}`.
//! Building it yields an [Oracle], which dispatches to the concrete filters.
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{error::Error, models::ModelCache, record::Record};

use super::{
    cross_entropy::{CrossEntropy, CrossEntropyParams},
    html::HtmlTag,
    langid::{LanguageId, LanguageIdParams},
    length::{Length, LengthRatio, LongWord},
    punctuation::{NonZeroNumerals, TerminalPunctuation},
    script::{CharacterScore, CharacterScoreParams},
    word_align::{WordAlign, WordAlignParams},
    Filter, Mode, Score, Value,
};

/// Filter parameters along with an optional output name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Named<P> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub params: P,
}

impl<P> From<P> for Named<P> {
    fn from(params: P) -> Self {
        Self { name: None, params }
    }
}

#[allow(clippy::enum_variant_names)]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OracleConfig {
    LengthFilter(Named<Length>),
    LengthRatioFilter(Named<LengthRatio>),
    LongWordFilter(Named<LongWord>),
    HtmlTagFilter(Named<HtmlTag>),
    CharacterScoreFilter(Named<CharacterScoreParams>),
    TerminalPunctuationFilter(Named<TerminalPunctuation>),
    NonZeroNumeralsFilter(Named<NonZeroNumerals>),
    #[serde(rename = "LanguageIDFilter")]
    LanguageIdFilter(Named<LanguageIdParams>),
    CrossEntropyFilter(Named<CrossEntropyParams>),
    WordAlignFilter(Named<WordAlignParams>),
}

impl OracleConfig {
    /// Kind name, as written in configuration files.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::LengthFilter(_) => "LengthFilter",
            Self::LengthRatioFilter(_) => "LengthRatioFilter",
            Self::LongWordFilter(_) => "LongWordFilter",
            Self::HtmlTagFilter(_) => "HtmlTagFilter",
            Self::CharacterScoreFilter(_) => "CharacterScoreFilter",
            Self::TerminalPunctuationFilter(_) => "TerminalPunctuationFilter",
            Self::NonZeroNumeralsFilter(_) => "NonZeroNumeralsFilter",
            Self::LanguageIdFilter(_) => "LanguageIDFilter",
            Self::CrossEntropyFilter(_) => "CrossEntropyFilter",
            Self::WordAlignFilter(_) => "WordAlignFilter",
        }
    }

    fn name(&self) -> Option<&str> {
        match self {
            Self::LengthFilter(n) => n.name.as_deref(),
            Self::LengthRatioFilter(n) => n.name.as_deref(),
            Self::LongWordFilter(n) => n.name.as_deref(),
            Self::HtmlTagFilter(n) => n.name.as_deref(),
            Self::CharacterScoreFilter(n) => n.name.as_deref(),
            Self::TerminalPunctuationFilter(n) => n.name.as_deref(),
            Self::NonZeroNumeralsFilter(n) => n.name.as_deref(),
            Self::LanguageIdFilter(n) => n.name.as_deref(),
            Self::CrossEntropyFilter(n) => n.name.as_deref(),
            Self::WordAlignFilter(n) => n.name.as_deref(),
        }
    }

    /// Score key: the configured name, or the kind name.
    pub fn key(&self) -> &str {
        self.name().unwrap_or_else(|| self.kind())
    }

    /// Build the oracle, loading models through `cache`.
    /// Relative model paths are resolved against `base`.
    pub fn build(&self, base: &Path, cache: &ModelCache) -> Result<Oracle, Error> {
        Ok(match self {
            Self::LengthFilter(n) => Oracle::Length(n.params.clone()),
            Self::LengthRatioFilter(n) => Oracle::LengthRatio(n.params.clone()),
            Self::LongWordFilter(n) => Oracle::LongWord(n.params.clone()),
            Self::HtmlTagFilter(n) => Oracle::HtmlTag(n.params.clone()),
            Self::CharacterScoreFilter(n) => {
                Oracle::CharacterScore(CharacterScore::new(&n.params)?)
            }
            Self::TerminalPunctuationFilter(n) => Oracle::TerminalPunctuation(n.params.clone()),
            Self::NonZeroNumeralsFilter(n) => Oracle::NonZeroNumerals(n.params.clone()),
            Self::LanguageIdFilter(n) => Oracle::LanguageId(LanguageId::new(&n.params, base)?),
            Self::CrossEntropyFilter(n) => {
                Oracle::CrossEntropy(CrossEntropy::new(&n.params, base, cache)?)
            }
            Self::WordAlignFilter(n) => Oracle::WordAlign(WordAlign::new(&n.params, base, cache)?),
        })
    }
}

/// Built filter.
#[derive(Debug)]
pub enum Oracle {
    Length(Length),
    LengthRatio(LengthRatio),
    LongWord(LongWord),
    HtmlTag(HtmlTag),
    CharacterScore(CharacterScore),
    TerminalPunctuation(TerminalPunctuation),
    NonZeroNumerals(NonZeroNumerals),
    LanguageId(LanguageId),
    CrossEntropy(CrossEntropy),
    WordAlign(WordAlign),
}

impl Oracle {
    /// Model-based scorers have no keep/drop rule.
    pub fn supports(&self, mode: Mode) -> bool {
        match mode {
            Mode::Score => true,
            Mode::Filter => !matches!(self, Self::CrossEntropy(_) | Self::WordAlign(_)),
        }
    }

    /// Number of streams the oracle is configured for, if it is constrained.
    pub fn arity(&self) -> Option<usize> {
        match self {
            Self::CharacterScore(f) => Some(f.arity()),
            Self::LanguageId(f) => Some(f.arity()),
            Self::CrossEntropy(f) => Some(f.arity()),
            Self::WordAlign(_) => Some(2),
            _ => None,
        }
    }

    /// Evaluate a record. Filter mode yields [Value::Bool].
    pub fn evaluate(&self, record: &Record, mode: Mode) -> Result<Value, Error> {
        match mode {
            Mode::Filter => self.detect(record).map(Value::Bool),
            Mode::Score => self.score(record),
        }
    }
}

impl Filter<&Record> for Oracle {
    fn detect(&self, record: &Record) -> Result<bool, Error> {
        match self {
            Self::Length(f) => f.detect(record),
            Self::LengthRatio(f) => f.detect(record),
            Self::LongWord(f) => f.detect(record),
            Self::HtmlTag(f) => f.detect(record),
            Self::CharacterScore(f) => f.detect(record),
            Self::TerminalPunctuation(f) => f.detect(record),
            Self::NonZeroNumerals(f) => f.detect(record),
            Self::LanguageId(f) => f.detect(record),
            Self::CrossEntropy(_) | Self::WordAlign(_) => Err(Error::config(
                "score-only filter used in filter mode",
            )),
        }
    }
}

impl Score<&Record> for Oracle {
    fn score(&self, record: &Record) -> Result<Value, Error> {
        match self {
            Self::Length(f) => f.score(record),
            Self::LengthRatio(f) => f.score(record),
            Self::LongWord(f) => f.score(record),
            Self::HtmlTag(f) => f.score(record),
            Self::CharacterScore(f) => f.score(record),
            Self::TerminalPunctuation(f) => f.score(record),
            Self::NonZeroNumerals(f) => f.score(record),
            Self::LanguageId(f) => f.score(record),
            Self::CrossEntropy(f) => f.score(record),
            Self::WordAlign(f) => f.score(record),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn config(value: serde_json::Value) -> OracleConfig {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn parse() {
        let c = config(json!({"LengthFilter": {"min_length": 1, "max_length": 3, "unit": "word"}}));
        assert_eq!(c.kind(), "LengthFilter");
        assert_eq!(c.key(), "LengthFilter");

        let c = config(json!({"LengthRatioFilter": {"threshold": 3, "name": "ratio"}}));
        assert_eq!(c.key(), "ratio");

        let c = config(json!({"HtmlTagFilter": {}}));
        assert_eq!(c.key(), "HtmlTagFilter");

        let c = config(json!({"LanguageIDFilter": {"languages": ["fi", "en"]}}));
        assert_eq!(c.kind(), "LanguageIDFilter");
    }

    #[test]
    fn unknown_kind() {
        assert!(serde_json::from_value::<OracleConfig>(json!({"FooFilter": {}})).is_err());
    }

    #[test]
    fn modes() {
        let cache = ModelCache::new();
        let oracle = config(json!({"LongWordFilter": {"threshold": 5}}))
            .build(Path::new("."), &cache)
            .unwrap();
        assert!(oracle.supports(Mode::Filter));
        assert_eq!(oracle.arity(), None);

        let record = Record::from((0, vec!["abc", "abcdef"]));
        assert_eq!(oracle.evaluate(&record, Mode::Filter).unwrap(), Value::Bool(false));
        assert_eq!(oracle.evaluate(&record, Mode::Score).unwrap(), Value::Number(6.0));
    }

    #[test]
    fn score_only() {
        let dir = tempfile::tempdir().unwrap();
        crate::models::alignment::tests::write_toy(dir.path());
        let oracle = config(json!({"WordAlignFilter": {"priors": "priors.txt"}}))
            .build(dir.path(), &ModelCache::new())
            .unwrap();
        assert!(!oracle.supports(Mode::Filter));
        assert!(oracle.supports(Mode::Score));
        assert_eq!(oracle.arity(), Some(2));
    }
}
