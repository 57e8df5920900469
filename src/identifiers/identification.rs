//! Language identification result.
use serde::{Deserialize, Serialize};

use super::tag_convert;

/// Detected language (normalized primary subtag, see [tag_convert::normalize]) and its confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identification {
    label: String,
    prob: f32,
}

impl Identification {
    pub fn new(label: &str, prob: f32) -> Self {
        Self {
            label: tag_convert::normalize(label),
            prob,
        }
    }

    /// Get a reference to the identification's label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Get a reference to the identification's prob.
    pub fn prob(&self) -> &f32 {
        &self.prob
    }

    /// Does the identification match the (possibly differently formatted) declared language?
    pub fn is(&self, lang: &str) -> bool {
        tag_convert::same_language(&self.label, lang)
    }
}

#[cfg(feature = "fasttext")]
impl From<fasttext::Prediction> for Identification {
    fn from(prediction: fasttext::Prediction) -> Self {
        Self::new(&prediction.label, prediction.prob)
    }
}

#[cfg(test)]
mod tests {
    use super::Identification;

    #[test]
    fn test_normalized_label() {
        let id = Identification::new("eng", 0.9);
        assert_eq!(id.label(), "en");
        assert!(id.is("en-GB"));
        assert!(!id.is("fr"));
    }

    #[cfg(feature = "fasttext")]
    #[test]
    fn test_from_pred() {
        let prob = 1.0f32;
        let label = "__label__en".to_string();
        let p = fasttext::Prediction { prob, label };

        let id = Identification::from(p.clone());
        assert_eq!(id.label(), "en");
        assert_eq!(id.prob(), &p.prob);
    }
}
