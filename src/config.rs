/*! Configuration files

A configuration is a JSON document holding common settings and an ordered list of steps:

```json
{
    "common": {"output_directory": "work", "chunk_size": 100000},
    "steps": [
        {
            "type": "filter",
            "parameters": {
                "inputs": ["corpus.fi.gz", "corpus.en.gz"],
                "outputs": ["filtered.fi.gz", "filtered.en.gz"],
                "filters": [
                    {"LengthRatioFilter": {"threshold": 3, "unit": "word"}},
                    {"LanguageIDFilter": {"languages": ["fi", "en"]}}
                ]
            }
        }
    ]
}
```

Every input and output path is relative to `common.output_directory` (unless absolute),
and so are model paths given in filter parameters.
!*/
use std::{fs::File, io::BufReader, path::Path, path::PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    error::Error,
    filtering::OracleConfig,
    processing::sort::Combine,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Configuration {
    #[serde(default)]
    pub common: Common,
    pub steps: Vec<Step>,
}

impl Configuration {
    pub fn from_path(path: &Path) -> Result<Self, Error> {
        let file = File::open(path)
            .map_err(|e| Error::config(format!("could not open configuration {path:?}: {e}")))?;
        let config: Self = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| Error::config(format!("invalid configuration {path:?}: {e}")))?;
        debug!("loaded configuration with {} steps", config.steps.len());
        Ok(config)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Common {
    #[serde(default = "Common::default_output_directory")]
    pub output_directory: PathBuf,
    #[serde(default = "Common::default_chunk_size")]
    pub chunk_size: usize,
}

impl Common {
    fn default_output_directory() -> PathBuf {
        PathBuf::from(".")
    }

    fn default_chunk_size() -> usize {
        100_000
    }
}

impl Default for Common {
    fn default() -> Self {
        Self {
            output_directory: Self::default_output_directory(),
            chunk_size: Self::default_chunk_size(),
        }
    }
}

/// Processing step, tagged by `type`, with its `parameters`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "parameters", rename_all = "snake_case")]
pub enum Step {
    Filter(FilterParams),
    Score(ScoreParams),
    Subset(SubsetParams),
    Sort(SortParams),
    Join(JoinParams),
    Concatenate(ConcatenateParams),
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::Filter(_) => "filter",
            Step::Score(_) => "score",
            Step::Subset(_) => "subset",
            Step::Sort(_) => "sort",
            Step::Join(_) => "join",
            Step::Concatenate(_) => "concatenate",
        }
    }

    /// Files produced by the step.
    pub fn outputs(&self) -> Vec<&Path> {
        match self {
            Step::Filter(p) => p.outputs.iter().map(PathBuf::as_path).collect(),
            Step::Score(p) => vec![p.output.as_path()],
            Step::Subset(p) => p.outputs.iter().map(PathBuf::as_path).collect(),
            Step::Sort(p) => p
                .outputs
                .iter()
                .chain(std::iter::once(&p.values_output))
                .map(PathBuf::as_path)
                .collect(),
            Step::Join(p) => vec![p.output.as_path()],
            Step::Concatenate(p) => vec![p.output.as_path()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterParams {
    pub inputs: Vec<PathBuf>,
    pub outputs: Vec<PathBuf>,
    pub filters: Vec<OracleConfig>,
    #[serde(default)]
    pub filterfalse: bool,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreParams {
    pub inputs: Vec<PathBuf>,
    pub output: PathBuf,
    pub filters: Vec<OracleConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubsetParams {
    pub inputs: Vec<PathBuf>,
    pub outputs: Vec<PathBuf>,
    pub size: usize,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub shuffle_target: bool,
}

/// A single field reference or a list of them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Keys {
    One(String),
    Many(Vec<String>),
}

impl Default for Keys {
    fn default() -> Self {
        Keys::Many(vec![])
    }
}

impl Keys {
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            Keys::One(key) => vec![key.clone()],
            Keys::Many(keys) => keys.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortParams {
    #[serde(default)]
    pub inputs: Vec<PathBuf>,
    #[serde(default)]
    pub outputs: Vec<PathBuf>,
    pub values: PathBuf,
    pub values_output: PathBuf,
    #[serde(default)]
    pub key: Keys,
    #[serde(default)]
    pub reverse: bool,
    #[serde(default)]
    pub combine: Option<Combine>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinParams {
    pub inputs: Vec<PathBuf>,
    #[serde(default)]
    pub keys: Vec<Option<String>>,
    pub output: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConcatenateParams {
    pub inputs: Vec<PathBuf>,
    pub output: PathBuf,
}
