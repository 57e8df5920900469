//! Whatlang identifier (trigram-based).
use crate::error::Error;

use super::{Identification, Identifier};

/// Stateless wrapper around [::whatlang::detect].
#[derive(Debug, Default, Clone, Copy)]
pub struct Whatlang;

impl Identifier<&str> for Whatlang {
    fn identify(&self, sentence: &str) -> Result<Option<Identification>, Error> {
        // null chars are noise for detectors, same as for fasttext
        let sentence = sentence.replace(char::from(0), "");
        Ok(::whatlang::detect(&sentence)
            .map(|info| Identification::new(info.lang().code(), info.confidence() as f32)))
    }
}
