/*! Subsampling

Uniform random sampling of a fixed number of records from a parallel stream of unknown length,
in a single pass (reservoir sampling).

The generator is seeded, and kept records are written back in their input order,
so that a given `(seed, size, input)` triple always gives the same output.

With `shuffle_target`, the last stream is sampled independently and shuffled,
which gives misaligned records (useful as negative examples).
!*/
use std::path::PathBuf;

use log::{debug, info};
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};

use crate::{
    error::Error,
    io::{ParallelReader, ParallelWriter},
    pipeline::Pipeline,
    record::Record,
};

/// Fixed-size reservoir.
#[derive(Debug)]
struct Reservoir<T> {
    size: usize,
    seen: usize,
    items: Vec<T>,
}

impl<T> Reservoir<T> {
    fn new(size: usize) -> Self {
        Self {
            size,
            seen: 0,
            items: Vec::with_capacity(size.min(1 << 20)),
        }
    }

    /// Offer an item: fill while there is room, then replace a random slot
    /// with probability `size / (seen + 1)`.
    fn offer(&mut self, item: T, rng: &mut StdRng) {
        if self.items.len() < self.size {
            self.items.push(item);
        } else {
            let j = rng.gen_range(0..=self.seen);
            if j < self.size {
                self.items[j] = item;
            }
        }
        self.seen += 1;
    }
}

pub struct Subset {
    inputs: Vec<PathBuf>,
    outputs: Vec<PathBuf>,
    size: usize,
    seed: u64,
    shuffle_target: bool,
}

impl Subset {
    pub fn new(inputs: Vec<PathBuf>, outputs: Vec<PathBuf>, size: usize, seed: u64) -> Self {
        Self {
            inputs,
            outputs,
            size,
            seed,
            shuffle_target: false,
        }
    }

    /// Sample the last stream independently from the others, and shuffle it.
    pub fn shuffle_target(mut self, shuffle_target: bool) -> Self {
        self.shuffle_target = shuffle_target;
        self
    }

    /// Draw the sample. Records are returned in input order.
    pub fn sample(&self, reader: ParallelReader) -> Result<Vec<Vec<String>>, Error> {
        if self.shuffle_target && reader.arity() < 2 {
            return Err(Error::config(
                "shuffle_target needs at least two streams",
            ));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut records: Reservoir<Record> = Reservoir::new(self.size);
        let mut targets: Reservoir<String> = Reservoir::new(self.size);

        for record in reader {
            let record = record?;
            if self.shuffle_target {
                let index = record.index();
                let mut segments = record.into_segments();
                let target = segments.pop().unwrap_or_default();
                records.offer(Record::new(index, segments), &mut rng);
                targets.offer(target, &mut rng);
            } else {
                records.offer(record, &mut rng);
            }
        }

        if records.seen < self.size {
            return Err(Error::InsufficientData {
                requested: self.size,
                available: records.seen,
            });
        }
        debug!("sampled {} records out of {}", self.size, records.seen);

        let mut kept = records.items;
        kept.sort_by_key(Record::index);

        if self.shuffle_target {
            let mut targets = targets.items;
            targets.shuffle(&mut rng);
            Ok(kept
                .into_iter()
                .zip(targets)
                .map(|(record, target)| {
                    let mut segments = record.into_segments();
                    segments.push(target);
                    segments
                })
                .collect())
        } else {
            Ok(kept.into_iter().map(Record::into_segments).collect())
        }
    }
}

impl Pipeline<usize> for Subset {
    fn run(&self) -> Result<usize, Error> {
        info!(
            "sampling {} records from {:?} (seed {})",
            self.size, self.inputs, self.seed
        );
        let reader = ParallelReader::open(&self.inputs)?;
        if reader.arity() != self.outputs.len() {
            return Err(Error::config(format!(
                "subset has {} inputs but {} outputs",
                reader.arity(),
                self.outputs.len()
            )));
        }
        let sample = self.sample(reader)?;

        let mut writer = ParallelWriter::create(&self.outputs)?;
        for segments in &sample {
            writer.write_segments(segments)?;
        }
        writer.finish()?;
        Ok(sample.len())
    }
}
