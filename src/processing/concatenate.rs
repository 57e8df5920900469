//! Concatenation of line files.
use std::path::PathBuf;

use log::{debug, info};

use crate::{
    error::Error,
    io::{LineReader, PartialFile},
    pipeline::Pipeline,
};

/// Appends inputs one after the other into a single output.
pub struct Concatenate {
    inputs: Vec<PathBuf>,
    output: PathBuf,
}

impl Concatenate {
    pub fn new(inputs: Vec<PathBuf>, output: PathBuf) -> Self {
        Self { inputs, output }
    }
}

impl Pipeline<usize> for Concatenate {
    fn run(&self) -> Result<usize, Error> {
        info!("concatenating {} files into {:?}", self.inputs.len(), self.output);
        let mut writer = PartialFile::create(&self.output)?;
        for input in &self.inputs {
            let before = writer.lines();
            for line in LineReader::open(input)? {
                writer.write_line(&line?)?;
            }
            debug!("{:?}: {} lines", input, writer.lines() - before);
        }
        let lines = writer.lines();
        writer.finish()?;
        Ok(lines)
    }
}
