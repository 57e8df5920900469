//! Language identification filter.
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::{Deserialize, Serialize};

use crate::{
    error::Error,
    identifiers::{tag_convert, Backend, Identifier},
    record::Record,
};

use super::{Filter, Score, Value};

/// Configuration form of [LanguageId].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageIdParams {
    /// Expected language per stream.
    pub languages: Vec<String>,
    #[serde(default = "LanguageIdParams::default_method")]
    pub id_method: String,
    /// Confidence thresholds per stream, defaults to 0.
    #[serde(default)]
    pub thresholds: Vec<f64>,
    /// Model file for model-based backends.
    #[serde(default)]
    pub model: Option<PathBuf>,
}

impl LanguageIdParams {
    fn default_method() -> String {
        "whatlang".to_string()
    }
}

/// Keeps records where every segment is identified as its expected language
/// with a confidence above the stream threshold.
///
/// Scores are the per-stream confidences, zeroed when the identified language is not the expected one.
pub struct LanguageId {
    languages: Vec<String>,
    thresholds: Vec<f64>,
    backend: Arc<Backend>,
}

impl LanguageId {
    /// Build the filter. Relative model paths are resolved against `base`.
    pub fn new(params: &LanguageIdParams, base: &Path) -> Result<Self, Error> {
        if params.languages.is_empty() {
            return Err(Error::config("LanguageIDFilter needs at least one language"));
        }
        let thresholds = if params.thresholds.is_empty() {
            vec![0.0; params.languages.len()]
        } else if params.thresholds.len() == params.languages.len() {
            params.thresholds.clone()
        } else {
            return Err(Error::config(format!(
                "LanguageIDFilter: {} languages but {} thresholds",
                params.languages.len(),
                params.thresholds.len()
            )));
        };
        let model = params
            .model
            .as_ref()
            .map(|m| crate::io::resolve(base, m));
        let backend = Backend::from_method(&params.id_method, model.as_deref())?;

        Ok(Self {
            languages: params
                .languages
                .iter()
                .map(|l| tag_convert::normalize(l))
                .collect(),
            thresholds,
            backend: Arc::new(backend),
        })
    }

    pub fn arity(&self) -> usize {
        self.languages.len()
    }

    /// `(matches expected language, confidence)` per stream.
    fn identify(&self, record: &Record) -> Result<Vec<(bool, f64)>, Error> {
        if record.arity() != self.languages.len() {
            return Err(Error::config(format!(
                "LanguageIDFilter has {} languages for {} streams",
                self.languages.len(),
                record.arity()
            )));
        }
        record
            .segments()
            .iter()
            .zip(&self.languages)
            .map(|(segment, lang)| {
                Ok(match self.backend.identify(segment)? {
                    Some(id) if id.is(lang) => (true, f64::from(*id.prob())),
                    _ => (false, 0.0),
                })
            })
            .collect()
    }
}

impl Filter<&Record> for LanguageId {
    fn detect(&self, record: &Record) -> Result<bool, Error> {
        Ok(self
            .identify(record)?
            .iter()
            .zip(&self.thresholds)
            .all(|((matches, confidence), threshold)| *matches && confidence > threshold))
    }
}

impl Score<&Record> for LanguageId {
    fn score(&self, record: &Record) -> Result<Value, Error> {
        Ok(Value::Numbers(
            self.identify(record)?.into_iter().map(|(_, c)| c).collect(),
        ))
    }
}

impl std::fmt::Debug for LanguageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LanguageId")
            .field("languages", &self.languages)
            .field("thresholds", &self.thresholds)
            .field("backend", &self.backend.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FI: &str = "Tämä on suomenkielinen lause, joka on kirjoitettu testiä varten.";
    const EN: &str = "This is an English sentence that was written for the test.";

    fn filter(languages: &[&str]) -> LanguageId {
        let params = LanguageIdParams {
            languages: languages.iter().map(|s| s.to_string()).collect(),
            id_method: "whatlang".to_string(),
            thresholds: vec![],
            model: None,
        };
        LanguageId::new(&params, Path::new(".")).unwrap()
    }

    #[test]
    fn detect() {
        let f = filter(&["fi", "en"]);
        assert!(f.detect(&Record::from((0, vec![FI, EN]))).unwrap());
        assert!(!f.detect(&Record::from((0, vec![EN, FI]))).unwrap());
    }

    #[test]
    fn three_letter_codes() {
        let f = filter(&["fin", "eng"]);
        assert!(f.detect(&Record::from((0, vec![FI, EN]))).unwrap());
    }

    #[test]
    fn scores() {
        let f = filter(&["fi", "fi"]);
        match f.score(&Record::from((0, vec![FI, EN]))).unwrap() {
            Value::Numbers(v) => {
                assert!(v[0] > 0.0);
                assert_eq!(v[1], 0.0);
            }
            other => panic!("unexpected value {other:?}"),
        }
    }

    #[test]
    fn nothing_identified_is_dropped() {
        let f = filter(&["fi", "en"]);
        assert!(!f.detect(&Record::from((0, vec!["1234", "5678"]))).unwrap());
    }

    #[test]
    fn bad_params() {
        let params = LanguageIdParams {
            languages: vec!["fi".to_string()],
            id_method: "cld3".to_string(),
            thresholds: vec![],
            model: None,
        };
        assert!(LanguageId::new(&params, Path::new(".")).is_err());
    }
}
