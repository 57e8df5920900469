/*! N-gram language models

Back-off n-gram models in the ARPA format, as produced by the usual LM toolkits
(VariKN, KenLM's `lmplz`, SRILM). Models are loaded once and are read-only afterwards.

Text is turned into LM tokens by an [LmTokenizer] that must match the one used at training time:
with `char` segmentation each word is split into characters and words are separated by a
word-boundary token (`<w>` by default).
!*/
use std::{
    collections::HashMap,
    io::BufRead,
    path::{Path, PathBuf},
    sync::Arc,
};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::Error;

pub const SENTENCE_START: &str = "<s>";
pub const SENTENCE_END: &str = "</s>";
pub const UNKNOWN: &str = "<unk>";

/// log10 probability used for unknown words when the model has no `<unk>` entry.
const UNKNOWN_LOG10: f32 = -7.0;

#[derive(Debug, Clone, Copy, Default)]
struct Entry {
    log10_prob: f32,
    log10_backoff: f32,
}

/// ARPA back-off language model.
#[derive(Debug)]
pub struct ArpaModel {
    path: PathBuf,
    vocab: HashMap<String, u32>,
    // ngrams[n - 1] holds the n-grams
    ngrams: Vec<HashMap<Box<[u32]>, Entry>>,
    unknown_log10: f32,
}

impl ArpaModel {
    /// Load a (possibly gzipped) ARPA file.
    ///
    /// # Errors
    /// Returns [Error::ModelLoad] on missing files and malformed content.
    pub fn from_path(path: &Path) -> Result<Self, Error> {
        if !path.exists() {
            return Err(Error::model_load(path, "not found"));
        }
        info!("loading language model {path:?}");
        let reader = crate::io::open_read(path).map_err(|e| Error::model_load(path, e))?;
        let model = Self::from_reader(reader, path)?;
        debug!(
            "loaded {:?}: order {}, {} words",
            path,
            model.order(),
            model.vocab.len()
        );
        Ok(model)
    }

    fn from_reader(reader: impl BufRead, path: &Path) -> Result<Self, Error> {
        let mut vocab: HashMap<String, u32> = HashMap::new();
        let mut ngrams: Vec<HashMap<Box<[u32]>, Entry>> = Vec::new();
        let mut declared: Vec<usize> = Vec::new();
        let mut section: Option<usize> = None;
        let mut seen_data = false;
        let mut seen_end = false;

        for (lineno, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| Error::model_load(path, e))?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let bad = |msg: &str| Error::model_load(path, format!("line {}: {msg}", lineno + 1));

            if line == "\\data\\" {
                seen_data = true;
                continue;
            }
            if line == "\\end\\" {
                seen_end = true;
                break;
            }
            if let Some(count) = line.strip_prefix("ngram ") {
                let (order, count) = count
                    .split_once('=')
                    .ok_or_else(|| bad("malformed ngram count"))?;
                let order: usize = order.trim().parse().map_err(|_| bad("bad order"))?;
                let count: usize = count.trim().parse().map_err(|_| bad("bad count"))?;
                if order == 0 || order != declared.len() + 1 {
                    return Err(bad("ngram counts out of order"));
                }
                declared.push(count);
                ngrams.push(HashMap::with_capacity(count));
                continue;
            }
            if let Some(header) = line.strip_prefix('\\') {
                let order = header
                    .strip_suffix("-grams:")
                    .and_then(|n| n.parse::<usize>().ok())
                    .ok_or_else(|| bad("unknown section header"))?;
                if order == 0 || order > ngrams.len() {
                    return Err(bad("section for an undeclared order"));
                }
                section = Some(order);
                continue;
            }

            let order = section.ok_or_else(|| bad("n-gram entry outside of a section"))?;
            let mut fields = line.split_whitespace();
            let log10_prob: f32 = fields
                .next()
                .and_then(|p| p.parse().ok())
                .ok_or_else(|| bad("bad probability"))?;
            let mut ids = Vec::with_capacity(order);
            for _ in 0..order {
                let word = fields.next().ok_or_else(|| bad("missing words"))?;
                let next_id = vocab.len() as u32;
                ids.push(*vocab.entry(word.to_string()).or_insert(next_id));
            }
            let log10_backoff = match fields.next() {
                Some(b) => b.parse().map_err(|_| bad("bad backoff weight"))?,
                None => 0.0,
            };
            ngrams[order - 1].insert(
                ids.into_boxed_slice(),
                Entry {
                    log10_prob,
                    log10_backoff,
                },
            );
        }

        if !seen_data || !seen_end || ngrams.is_empty() {
            return Err(Error::model_load(path, "not an ARPA file"));
        }
        for (n, (table, count)) in ngrams.iter().zip(&declared).enumerate() {
            if table.len() != *count {
                return Err(Error::model_load(
                    path,
                    format!(
                        "header declares {count} {}-grams, found {}",
                        n + 1,
                        table.len()
                    ),
                ));
            }
        }

        let unknown_log10 = vocab
            .get(UNKNOWN)
            .and_then(|id| ngrams[0].get([*id].as_slice()))
            .map_or(UNKNOWN_LOG10, |e| e.log10_prob);

        Ok(Self {
            path: path.to_path_buf(),
            vocab,
            ngrams,
            unknown_log10,
        })
    }

    pub fn order(&self) -> usize {
        self.ngrams.len()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// log10 p(word | context) with back-off.
    /// `None` ids are out-of-vocabulary words.
    fn log10_prob(&self, context: &[Option<u32>], word: Option<u32>) -> f32 {
        let word = match word {
            Some(w) => w,
            None => return self.unknown_log10,
        };

        // an OOV word in the history breaks every longer n-gram
        let usable = context
            .iter()
            .rev()
            .take(self.order() - 1)
            .take_while(|id| id.is_some())
            .count();
        let history: Vec<u32> = context[context.len() - usable..]
            .iter()
            .flatten()
            .copied()
            .collect();

        let mut backoff = 0.0;
        for len in (0..=history.len()).rev() {
            let hist = &history[history.len() - len..];
            let mut ngram = Vec::with_capacity(len + 1);
            ngram.extend_from_slice(hist);
            ngram.push(word);
            if let Some(entry) = self.ngrams[len].get(ngram.as_slice()) {
                return backoff + entry.log10_prob;
            }
            if len > 0 {
                if let Some(entry) = self.ngrams[len - 1].get(hist) {
                    backoff += entry.log10_backoff;
                }
            }
        }
        backoff + self.unknown_log10
    }

    /// log10 probabilities of `tokens[1..]`, each given its preceding tokens.
    pub fn token_log10_probs(&self, tokens: &[String]) -> Vec<f32> {
        let ids: Vec<Option<u32>> = tokens.iter().map(|t| self.vocab.get(t).copied()).collect();
        (1..ids.len())
            .map(|i| self.log10_prob(&ids[..i], ids[i]))
            .collect()
    }
}

/// How sentences are split into LM tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Segmentation {
    /// characters, with word boundary tokens between words
    Char,
    /// whitespace-separated words
    None,
}

impl Default for Segmentation {
    fn default() -> Self {
        Segmentation::Char
    }
}

/// Sentence to LM token conversion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LmTokenizer {
    #[serde(default)]
    pub segmentation: Segmentation,
    /// marker added in front of non-initial units of a word
    #[serde(default)]
    pub mb: String,
    /// word boundary token
    #[serde(default = "default_wb")]
    pub wb: String,
}

fn default_wb() -> String {
    "<w>".to_string()
}

impl Default for LmTokenizer {
    fn default() -> Self {
        Self {
            segmentation: Segmentation::default(),
            mb: String::new(),
            wb: default_wb(),
        }
    }
}

impl LmTokenizer {
    /// Tokenize, adding sentence boundaries.
    pub fn tokenize(&self, sentence: &str) -> Vec<String> {
        let mut tokens = vec![SENTENCE_START.to_string()];
        match self.segmentation {
            Segmentation::None => {
                tokens.extend(sentence.split_whitespace().map(String::from));
            }
            Segmentation::Char => {
                let mut words = sentence.split_whitespace().peekable();
                if words.peek().is_some() && !self.wb.is_empty() {
                    tokens.push(self.wb.clone());
                }
                for word in words {
                    for (idx, c) in word.chars().enumerate() {
                        if idx > 0 && !self.mb.is_empty() {
                            tokens.push(format!("{}{c}", self.mb));
                        } else {
                            tokens.push(c.to_string());
                        }
                    }
                    if !self.wb.is_empty() {
                        tokens.push(self.wb.clone());
                    }
                }
            }
        }
        tokens.push(SENTENCE_END.to_string());
        tokens
    }
}

/// Main model optionally interpolated with background models:
/// `p = (1 - Σ wᵢ) p_main + Σ wᵢ pᵢ`.
#[derive(Debug, Clone)]
pub struct InterpolatedLm {
    main: Arc<ArpaModel>,
    others: Vec<(Arc<ArpaModel>, f64)>,
    tokenizer: LmTokenizer,
}

impl InterpolatedLm {
    pub fn new(
        main: Arc<ArpaModel>,
        others: Vec<(Arc<ArpaModel>, f64)>,
        tokenizer: LmTokenizer,
    ) -> Result<Self, Error> {
        let total: f64 = others.iter().map(|(_, w)| w).sum();
        if others.iter().any(|(_, w)| !(0.0..=1.0).contains(w)) || total >= 1.0 {
            return Err(Error::config(format!(
                "interpolation weights must be in [0, 1) and sum below 1, got {total}"
            )));
        }
        Ok(Self {
            main,
            others,
            tokenizer,
        })
    }

    pub fn tokenizer(&self) -> &LmTokenizer {
        &self.tokenizer
    }

    /// Cross-entropy of a sentence, in bits per predicted token (`</s>` included).
    pub fn cross_entropy(&self, sentence: &str) -> f64 {
        let tokens = self.tokenizer.tokenize(sentence);
        let main = self.main.token_log10_probs(&tokens);

        let log10_probs: Vec<f64> = if self.others.is_empty() {
            main.iter().map(|p| f64::from(*p)).collect()
        } else {
            let main_weight = 1.0 - self.others.iter().map(|(_, w)| w).sum::<f64>();
            let others: Vec<(Vec<f32>, f64)> = self
                .others
                .iter()
                .map(|(lm, w)| (lm.token_log10_probs(&tokens), *w))
                .collect();
            main.iter()
                .enumerate()
                .map(|(i, p)| {
                    let mixed = main_weight * 10f64.powf(f64::from(*p))
                        + others
                            .iter()
                            .map(|(probs, w)| w * 10f64.powf(f64::from(probs[i])))
                            .sum::<f64>();
                    mixed.log10()
                })
                .collect()
        };

        let nb_tokens = log10_probs.len().max(1) as f64;
        let bits: f64 = log10_probs
            .iter()
            .map(|p| -p / std::f64::consts::LOG10_2)
            .sum();
        bits / nb_tokens
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Small bigram model over characters of "ab" words.
    pub const TOY_ARPA: &str = "
\\data\\
ngram 1=6
ngram 2=4

\\1-grams:
-1.0\t<s>\t-0.30103
-0.30103\ta\t-0.30103
-0.60206\tb\t-0.30103
-1.0\t<w>\t-0.30103
-1.0\t</s>
-2.0\t<unk>

\\2-grams:
-0.1\t<s> <w>
-0.2\t<w> a
-0.1\ta b
-0.1\tb <w>

\\end\\
";

    pub fn write_toy(dir: &Path) -> PathBuf {
        let path = dir.join("toy.arpa");
        std::fs::write(&path, TOY_ARPA).unwrap();
        path
    }

    #[test]
    fn load() {
        let dir = tempfile::tempdir().unwrap();
        let lm = ArpaModel::from_path(&write_toy(dir.path())).unwrap();
        assert_eq!(lm.order(), 2);
        assert_eq!(lm.vocab.len(), 6);
    }

    #[test]
    fn backoff() {
        let dir = tempfile::tempdir().unwrap();
        let lm = ArpaModel::from_path(&write_toy(dir.path())).unwrap();
        let tokens: Vec<String> = ["<s>", "<w>", "a", "b", "<w>", "</s>"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let probs = lm.token_log10_probs(&tokens);
        assert_eq!(probs.len(), 5);
        // seen bigrams
        assert!((probs[0] - -0.1).abs() < 1e-6);
        assert!((probs[1] - -0.2).abs() < 1e-6);
        // "<w> </s>" is unseen: bow(<w>) + p(</s>)
        assert!((probs[4] - (-0.30103 + -1.0)).abs() < 1e-5);
    }

    #[test]
    fn unknown_word() {
        let dir = tempfile::tempdir().unwrap();
        let lm = ArpaModel::from_path(&write_toy(dir.path())).unwrap();
        let tokens: Vec<String> = ["<s>", "z"].iter().map(|s| s.to_string()).collect();
        assert_eq!(lm.token_log10_probs(&tokens), vec![-2.0]);
    }

    #[test]
    fn missing_file() {
        assert!(matches!(
            ArpaModel::from_path(Path::new("nope.arpa")),
            Err(Error::ModelLoad { .. })
        ));
    }

    #[test]
    fn corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.arpa");
        std::fs::write(&path, "\\data\\\nngram 1=2\n\n\\1-grams:\n-1.0 a\n\\end\\\n").unwrap();
        assert!(matches!(
            ArpaModel::from_path(&path),
            Err(Error::ModelLoad { .. })
        ));
    }

    #[test]
    fn char_tokenizer() {
        let t = LmTokenizer::default();
        assert_eq!(
            t.tokenize("ab a"),
            vec!["<s>", "<w>", "a", "b", "<w>", "a", "<w>", "</s>"]
        );
        assert_eq!(t.tokenize(""), vec!["<s>", "</s>"]);
    }

    #[test]
    fn cross_entropy_and_interpolation() {
        let dir = tempfile::tempdir().unwrap();
        let lm = Arc::new(ArpaModel::from_path(&write_toy(dir.path())).unwrap());

        let plain = InterpolatedLm::new(lm.clone(), vec![], LmTokenizer::default()).unwrap();
        let in_domain = plain.cross_entropy("ab");
        let out_of_domain = plain.cross_entropy("zz");
        assert!(in_domain < out_of_domain);

        // interpolating a model with itself changes nothing
        let mixed =
            InterpolatedLm::new(lm.clone(), vec![(lm, 0.01)], LmTokenizer::default()).unwrap();
        assert!((mixed.cross_entropy("ab") - in_domain).abs() < 1e-9);
    }

    #[test]
    fn bad_weights() {
        let dir = tempfile::tempdir().unwrap();
        let lm = Arc::new(ArpaModel::from_path(&write_toy(dir.path())).unwrap());
        assert!(InterpolatedLm::new(lm.clone(), vec![(lm, 1.5)], LmTokenizer::default()).is_err());
    }
}
