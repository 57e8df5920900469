//! Fasttext identifier
use std::path::Path;

use ::fasttext::{FastText as FastTextLib, Prediction};

use crate::error::Error;

use super::{Identification, Identifier};

/// Clean the prediction label field from `__label__xx` into `xx`.
///
/// # Errors
/// Returns an error if provided prediction is too short to be cleaned.
fn clean_prediction(prediction: &Prediction) -> Result<Prediction, String> {
    match prediction.label.strip_prefix("__label__") {
        Some(label) if !label.is_empty() => Ok(Prediction {
            prob: prediction.prob,
            label: label.to_string(),
        }),
        _ => Err(format!(
            "Label is too short to be cleaned: {}",
            prediction.label
        )),
    }
}

/// Holds a [fasttext::FastText] instance and its parameters:
/// - [FastText::k], number of predicted languages on a sentence
/// - [FastText::threshold], prediction threshold
pub struct FastText {
    predictor: FastTextLib,
    pub k: i32,
    pub threshold: f32,
}

impl FastText {
    /// Create a new fasttext classifier.
    ///
    /// filename has to be a path to a `bin` file.
    ///
    /// # Errors
    /// Returns [Error::ModelLoad] if the model can't be read.
    pub fn new(filename: &Path, k: i32, threshold: f32) -> Result<Self, Error> {
        let mut predictor = FastTextLib::new();
        let filename_str = filename
            .to_str()
            .ok_or_else(|| Error::model_load(filename, "invalid path"))?;
        if !filename.exists() {
            return Err(Error::model_load(filename, "not found"));
        }
        predictor
            .load_model(filename_str)
            .map_err(|e| Error::model_load(filename, e))?;
        Ok(Self {
            predictor,
            k,
            threshold,
        })
    }

    /// predict for supplied sentence.
    /// returns Ok(None) if no reliable identification has been done.
    pub fn predict(&self, sentence: &str) -> Result<Option<Vec<Prediction>>, String> {
        let predictions = self.predictor.predict(sentence, self.k, self.threshold)?;

        if predictions.is_empty() {
            Ok(None)
        } else {
            // attempt to clean labels before returning
            Ok(Some(
                predictions
                    .into_iter()
                    .map(|p| clean_prediction(&p).unwrap_or(p))
                    .collect(),
            ))
        }
    }
}

impl Identifier<&str> for FastText {
    fn identify(&self, sentence: &str) -> Result<Option<Identification>, Error> {
        // fasttext chokes on null chars and works line by line
        let sentence = sentence.replace([char::from(0), '\n'], " ");
        let prediction = self.predict(&sentence).map_err(Error::Custom)?;
        Ok(prediction
            .and_then(|p| p.into_iter().next())
            .map(Identification::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean() {
        let p = Prediction {
            prob: 0.5,
            label: "__label__fi".to_string(),
        };
        assert_eq!(clean_prediction(&p).unwrap().label, "fi");

        let p = Prediction {
            prob: 0.5,
            label: "__label__".to_string(),
        };
        assert!(clean_prediction(&p).is_err());
    }

    #[test]
    fn missing_model() {
        assert!(matches!(
            FastText::new(Path::new("no-such-lid.bin"), 1, 0.0),
            Err(Error::ModelLoad { .. })
        ));
    }
}
