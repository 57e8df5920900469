/*! Trained model artifacts.

Models are produced elsewhere and are only loaded and queried here:

- [lm::ArpaModel]: back-off n-gram language models (ARPA format),
- [alignment::AlignmentPriors]: lexical word alignment priors.

Loaded models are shared behind [Arc]s and never mutated. A [ModelCache] keeps them around so that
several filters (or several steps reusing the same filter list) pointing to the same file share one instance.
!*/
pub mod alignment;
pub mod lm;

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use log::debug;

use crate::error::Error;

pub use alignment::AlignmentPriors;
pub use lm::{ArpaModel, InterpolatedLm, LmTokenizer};

/// Path-keyed model holder.
#[derive(Default)]
pub struct ModelCache {
    lms: Mutex<HashMap<PathBuf, Arc<ArpaModel>>>,
    priors: Mutex<HashMap<PathBuf, Arc<AlignmentPriors>>>,
}

fn get_or_load<T>(
    map: &Mutex<HashMap<PathBuf, Arc<T>>>,
    path: &Path,
    load: impl FnOnce(&Path) -> Result<T, Error>,
) -> Result<Arc<T>, Error> {
    let mut models = map
        .lock()
        .map_err(|_| Error::Custom("model cache lock poisoned".to_string()))?;
    if let Some(model) = models.get(path) {
        debug!("reusing loaded model {path:?}");
        return Ok(model.clone());
    }
    let model = Arc::new(load(path)?);
    models.insert(path.to_path_buf(), model.clone());
    Ok(model)
}

impl ModelCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a language model, loading it if needed.
    pub fn lm(&self, path: &Path) -> Result<Arc<ArpaModel>, Error> {
        get_or_load(&self.lms, path, ArpaModel::from_path)
    }

    /// Get alignment priors, loading them if needed.
    pub fn priors(&self, path: &Path) -> Result<Arc<AlignmentPriors>, Error> {
        get_or_load(&self.priors, path, AlignmentPriors::from_path)
    }

    /// Number of loaded models.
    pub fn len(&self) -> usize {
        self.lms.lock().map(|m| m.len()).unwrap_or(0)
            + self.priors.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
