//! Step execution.
//!
//! Steps run sequentially, in configuration order. A step whose outputs all exist is skipped
//! unless overwriting is requested, so that an interrupted run can be resumed.
//! Models loaded by a step are kept for the following ones.
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::{
    config::{Configuration, Step},
    error::Error,
    filtering::Mode,
    io,
    models::ModelCache,
    pipeline::{FilterPipeline, Pipeline},
    processing::{Concatenate, FilterStep, Join, ScoreStep, Sort, Subset},
};

/// What happened to a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Outputs already there.
    Skipped,
    /// Number of records written.
    Done(usize),
}

pub struct StepRunner {
    config: Configuration,
    cache: ModelCache,
}

impl StepRunner {
    /// Create the runner, creating the output directory if needed.
    pub fn new(config: Configuration) -> Result<Self, Error> {
        let dir = &config.common.output_directory;
        if !dir.exists() {
            warn!("output directory {dir:?} does not exist. Creating");
            std::fs::create_dir_all(dir)?;
        }
        Ok(Self {
            config,
            cache: ModelCache::new(),
        })
    }

    pub fn steps(&self) -> &[Step] {
        &self.config.steps
    }

    fn output_dir(&self) -> &Path {
        &self.config.common.output_directory
    }

    fn chunk_size(&self) -> usize {
        self.config.common.chunk_size.max(1)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        io::resolve(self.output_dir(), path)
    }

    fn resolve_all(&self, paths: &[PathBuf]) -> Vec<PathBuf> {
        paths.iter().map(|p| self.resolve(p)).collect()
    }

    /// Run the steps, up to step `last` (1-based, inclusive) if provided.
    pub fn execute_steps(
        &self,
        overwrite: bool,
        last: Option<usize>,
    ) -> Result<Vec<StepOutcome>, Error> {
        let count = self.config.steps.len();
        let last = match last {
            Some(last) if last == 0 || last > count => {
                return Err(Error::config(format!(
                    "last step {last} is out of range (1 to {count})"
                )))
            }
            Some(last) => last,
            None => count,
        };
        (0..last)
            .map(|idx| self.run_step(idx, overwrite))
            .collect()
    }

    /// Run a single step. `num` is 1-based, negative values count from the end (-1 is the last step).
    pub fn execute_step(&self, num: isize, overwrite: bool) -> Result<StepOutcome, Error> {
        let count = self.config.steps.len() as isize;
        let idx = match num {
            n if n > 0 && n <= count => n - 1,
            n if n < 0 && -n <= count => count + n,
            n => {
                return Err(Error::config(format!(
                    "step {n} is out of range ({count} steps)"
                )))
            }
        };
        self.run_step(idx as usize, overwrite)
    }

    fn run_step(&self, idx: usize, overwrite: bool) -> Result<StepOutcome, Error> {
        let step = &self.config.steps[idx];
        let outputs: Vec<PathBuf> = step.outputs().into_iter().map(|p| self.resolve(p)).collect();

        if !overwrite && !outputs.is_empty() && outputs.iter().all(|p| p.exists()) {
            info!(
                "step {} ({}): outputs exist, skipping",
                idx + 1,
                step.name()
            );
            return Ok(StepOutcome::Skipped);
        }

        info!("step {} ({}): running", idx + 1, step.name());
        let written = self.run(step)?;
        info!(
            "step {} ({}): done, {written} records written",
            idx + 1,
            step.name()
        );
        Ok(StepOutcome::Done(written))
    }

    fn run(&self, step: &Step) -> Result<usize, Error> {
        let base = self.output_dir();
        match step {
            Step::Filter(p) => {
                let pipeline =
                    FilterPipeline::from_config(&p.filters, Mode::Filter, base, &self.cache)?;
                FilterStep::new(pipeline, self.resolve_all(&p.inputs), self.resolve_all(&p.outputs))?
                    .filterfalse(p.filterfalse)
                    .limit(p.limit)
                    .chunk_size(self.chunk_size())
                    .run()
            }
            Step::Score(p) => {
                let pipeline =
                    FilterPipeline::from_config(&p.filters, Mode::Score, base, &self.cache)?;
                ScoreStep::new(pipeline, self.resolve_all(&p.inputs), self.resolve(&p.output))
                    .chunk_size(self.chunk_size())
                    .run()
            }
            Step::Subset(p) => Subset::new(
                self.resolve_all(&p.inputs),
                self.resolve_all(&p.outputs),
                p.size,
                p.seed.unwrap_or(0),
            )
            .shuffle_target(p.shuffle_target)
            .run(),
            Step::Sort(p) => Sort::new(
                self.resolve_all(&p.inputs),
                self.resolve_all(&p.outputs),
                self.resolve(&p.values),
                self.resolve(&p.values_output),
                &p.key.to_vec(),
            )
            .reverse(p.reverse)
            .combine(p.combine.as_ref())
            .chunk_size(self.chunk_size())
            .tmp_root(Some(base.to_path_buf()))
            .run(),
            Step::Join(p) => Join::new(
                self.resolve_all(&p.inputs),
                p.keys.clone(),
                self.resolve(&p.output),
            )?
            .run(),
            Step::Concatenate(p) => {
                Concatenate::new(self.resolve_all(&p.inputs), self.resolve(&p.output)).run()
            }
        }
    }

    /// Loaded models.
    pub fn cache(&self) -> &ModelCache {
        &self.cache
    }
}
