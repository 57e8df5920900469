//! Filtering and scoring steps.
use std::path::PathBuf;

use log::info;

use crate::{
    error::Error,
    filtering::Mode,
    io::{ParallelReader, ParallelWriter, ValueWriter},
    pipeline::{FilterPipeline, Pipeline},
};

/// Keeps the records of `inputs` accepted by a filter-mode pipeline.
pub struct FilterStep {
    pipeline: FilterPipeline,
    inputs: Vec<PathBuf>,
    outputs: Vec<PathBuf>,
    filterfalse: bool,
    limit: Option<usize>,
    chunk_size: usize,
}

impl FilterStep {
    pub fn new(
        pipeline: FilterPipeline,
        inputs: Vec<PathBuf>,
        outputs: Vec<PathBuf>,
    ) -> Result<Self, Error> {
        if pipeline.mode() != Mode::Filter {
            return Err(Error::config("filter step needs a filter-mode pipeline"));
        }
        if inputs.len() != outputs.len() {
            return Err(Error::config(format!(
                "filter has {} inputs but {} outputs",
                inputs.len(),
                outputs.len()
            )));
        }
        Ok(Self {
            pipeline,
            inputs,
            outputs,
            filterfalse: false,
            limit: None,
            chunk_size: 100_000,
        })
    }

    /// Keep rejected records instead of accepted ones.
    pub fn filterfalse(mut self, filterfalse: bool) -> Self {
        self.filterfalse = filterfalse;
        self
    }

    pub fn limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }
}

impl Pipeline<usize> for FilterStep {
    fn run(&self) -> Result<usize, Error> {
        info!(
            "filtering {:?} with {}",
            self.inputs,
            self.pipeline.keys().collect::<Vec<_>>().join(", ")
        );
        let mut reader = ParallelReader::open(&self.inputs)?;
        let mut writer = ParallelWriter::create(&self.outputs)?;
        let stats = self.pipeline.filter(
            &mut reader,
            &mut writer,
            self.filterfalse,
            self.limit,
            self.chunk_size,
        )?;
        writer.finish()?;
        info!("kept {} records out of {}", stats.written, stats.read);
        Ok(stats.written)
    }
}

/// Writes one score object per record of `inputs`.
pub struct ScoreStep {
    pipeline: FilterPipeline,
    inputs: Vec<PathBuf>,
    output: PathBuf,
    chunk_size: usize,
}

impl ScoreStep {
    pub fn new(pipeline: FilterPipeline, inputs: Vec<PathBuf>, output: PathBuf) -> Self {
        Self {
            pipeline,
            inputs,
            output,
            chunk_size: 100_000,
        }
    }

    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }
}

impl Pipeline<usize> for ScoreStep {
    fn run(&self) -> Result<usize, Error> {
        info!(
            "scoring {:?} with {}",
            self.inputs,
            self.pipeline.keys().collect::<Vec<_>>().join(", ")
        );
        let mut reader = ParallelReader::open(&self.inputs)?;
        let mut writer = ValueWriter::create(&self.output)?;
        let scored = self
            .pipeline
            .score(&mut reader, &mut writer, self.chunk_size)?;
        writer.finish()?;
        info!("scored {scored} records");
        Ok(scored)
    }
}
