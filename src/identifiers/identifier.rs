/*! Identifier trait

All identifiers should implement [Identifier] to be useable in filters.
Backends are selected by name through [Backend].
!*/
use std::path::Path;

use log::debug;

use crate::error::Error;

use super::{whatlang::Whatlang, Identification};

pub trait Identifier<T> {
    /// Returns the most probable language, or `None` if nothing could be identified.
    fn identify(&self, sentence: T) -> Result<Option<Identification>, Error>;
}

/// Available language identification backends.
pub enum Backend {
    /// Trigram-based detector, no model file needed.
    Whatlang(Whatlang),
    /// Statistical classifier loaded from a `.bin` model.
    #[cfg(feature = "fasttext")]
    FastText(super::fasttext::FastText),
}

impl Backend {
    /// Methods compiled into this build.
    pub fn available() -> &'static [&'static str] {
        if cfg!(feature = "fasttext") {
            &["whatlang", "fasttext"]
        } else {
            &["whatlang"]
        }
    }

    /// Build a backend from its configuration name.
    ///
    /// `model` is required by model-based backends (`fasttext`).
    pub fn from_method(method: &str, model: Option<&Path>) -> Result<Self, Error> {
        debug!("building language identifier {method} (model: {model:?})");
        match method {
            "whatlang" => Ok(Backend::Whatlang(Whatlang::default())),
            #[cfg(feature = "fasttext")]
            "fasttext" => {
                let model = model.ok_or_else(|| {
                    Error::config("the fasttext language identifier needs a `model` path")
                })?;
                Ok(Backend::FastText(super::fasttext::FastText::new(model, 1, 0.0)?))
            }
            #[cfg(not(feature = "fasttext"))]
            "fasttext" => Err(Error::config(
                "fasttext language identification requires building with the `fasttext` feature",
            )),
            other => Err(Error::config(format!(
                "unknown language identification method {other:?} (available: {})",
                Self::available().join(", ")
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Backend::Whatlang(_) => "whatlang",
            #[cfg(feature = "fasttext")]
            Backend::FastText(_) => "fasttext",
        }
    }
}

impl Identifier<&str> for Backend {
    fn identify(&self, sentence: &str) -> Result<Option<Identification>, Error> {
        match self {
            Backend::Whatlang(w) => w.identify(sentence),
            #[cfg(feature = "fasttext")]
            Backend::FastText(f) => f.identify(sentence),
        }
    }
}
