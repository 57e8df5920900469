//! Filter pipeline.
//!
//! Holds an ordered list of keyed [Oracle]s and applies them to parallel streams,
//! either to drop records ([Mode::Filter]) or to produce one score object per record ([Mode::Score]).
//!
//! Records are read in chunks, evaluated in parallel with rayon and written back in input order.
use std::{collections::HashSet, path::Path};

use log::{debug, info};
use rayon::prelude::*;
use serde_json::Map;

use crate::{
    error::Error,
    filtering::{Filter, Mode, Oracle, OracleConfig, Score},
    io::{ParallelReader, ParallelWriter, ValueWriter},
    models::ModelCache,
    record::Record,
};

/// Outcome of a filter run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterStats {
    pub read: usize,
    pub written: usize,
}

#[derive(Debug)]
pub struct FilterPipeline {
    oracles: Vec<(String, Oracle)>,
    mode: Mode,
}

impl FilterPipeline {
    /// Build every oracle of `configs`, in order.
    ///
    /// # Errors
    /// - two oracles share a key,
    /// - an oracle can't be used in `mode`,
    /// - an oracle fails to build (bad parameters, missing models).
    pub fn from_config(
        configs: &[OracleConfig],
        mode: Mode,
        base: &Path,
        cache: &ModelCache,
    ) -> Result<Self, Error> {
        let mut keys = HashSet::new();
        for config in configs {
            if !keys.insert(config.key()) {
                return Err(Error::config(format!(
                    "duplicate filter key {:?}: give filters of the same kind distinct names",
                    config.key()
                )));
            }
        }

        let mut oracles = Vec::with_capacity(configs.len());
        for config in configs {
            let oracle = config.build(base, cache)?;
            if !oracle.supports(mode) {
                return Err(Error::config(format!(
                    "{} can only be used for scoring",
                    config.kind()
                )));
            }
            debug!("built filter {}: {:?}", config.key(), oracle);
            oracles.push((config.key().to_string(), oracle));
        }

        Ok(Self { oracles, mode })
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.oracles.iter().map(|(key, _)| key.as_str())
    }

    pub fn len(&self) -> usize {
        self.oracles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.oracles.is_empty()
    }

    /// Check that oracles configured per stream match the number of streams.
    pub fn check_arity(&self, arity: usize) -> Result<(), Error> {
        for (key, oracle) in &self.oracles {
            if let Some(expected) = oracle.arity() {
                if expected != arity {
                    return Err(Error::config(format!(
                        "filter {key} is configured for {expected} streams, input has {arity}"
                    )));
                }
            }
        }
        Ok(())
    }

    fn oracle_error(record: &Record, key: &str, e: Error) -> Error {
        Error::Oracle {
            row: record.index(),
            oracle: key.to_string(),
            message: e.to_string(),
        }
    }

    /// `true` if every oracle accepts the record. Stops at the first rejection.
    pub fn accepts(&self, record: &Record) -> Result<bool, Error> {
        for (key, oracle) in &self.oracles {
            if !oracle
                .detect(record)
                .map_err(|e| Self::oracle_error(record, key, e))?
            {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Score object of a record: `{key: value}` for every oracle.
    pub fn scores(&self, record: &Record) -> Result<serde_json::Value, Error> {
        let mut object = Map::new();
        for (key, oracle) in &self.oracles {
            let value = oracle
                .score(record)
                .map_err(|e| Self::oracle_error(record, key, e))?;
            object.insert(key.clone(), value.into());
        }
        Ok(serde_json::Value::Object(object))
    }

    /// Write records that pass (or, with `filterfalse`, that fail) the filters.
    ///
    /// Stops after `limit` written records if provided.
    pub fn filter(
        &self,
        reader: &mut ParallelReader,
        writer: &mut ParallelWriter,
        filterfalse: bool,
        limit: Option<usize>,
        chunk_size: usize,
    ) -> Result<FilterStats, Error> {
        self.check_arity(reader.arity())?;
        let mut stats = FilterStats::default();
        let chunk_size = chunk_size.max(1);

        loop {
            if limit.map_or(false, |l| stats.written >= l) {
                info!("limit of {} records reached", stats.written);
                break;
            }
            let chunk = reader.next_chunk(chunk_size)?;
            if chunk.is_empty() {
                break;
            }

            let decisions = chunk
                .par_iter()
                .map(|record| self.accepts(record))
                .collect::<Result<Vec<bool>, Error>>()?;

            stats.read += chunk.len();
            for (record, accepted) in chunk.iter().zip(decisions) {
                if limit.map_or(false, |l| stats.written >= l) {
                    break;
                }
                if accepted != filterfalse {
                    writer.write(record)?;
                    stats.written += 1;
                }
            }
            info!("{} records processed, {} kept", stats.read, stats.written);
        }

        Ok(stats)
    }

    /// Write one score object per input record.
    pub fn score(
        &self,
        reader: &mut ParallelReader,
        writer: &mut ValueWriter,
        chunk_size: usize,
    ) -> Result<usize, Error> {
        self.check_arity(reader.arity())?;
        let chunk_size = chunk_size.max(1);

        loop {
            let chunk = reader.next_chunk(chunk_size)?;
            if chunk.is_empty() {
                break;
            }
            let scores = chunk
                .par_iter()
                .map(|record| self.scores(record))
                .collect::<Result<Vec<_>, Error>>()?;
            for score in &scores {
                writer.write(score)?;
            }
            info!("{} records scored", writer.written());
        }

        Ok(writer.written())
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use serde_json::json;

    use super::*;
    use crate::io::ValueReader;

    fn configs(value: serde_json::Value) -> Vec<OracleConfig> {
        serde_json::from_value(value).unwrap()
    }

    fn write(dir: &Path, name: &str, lines: &[&str]) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, lines.join("\n") + "\n").unwrap();
        path
    }

    fn read(path: &Path) -> Vec<String> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(String::from)
            .collect()
    }

    #[test]
    fn duplicate_keys() {
        let c = configs(json!([{"LengthFilter": {}}, {"LengthFilter": {"max_length": 10}}]));
        let r = FilterPipeline::from_config(&c, Mode::Filter, Path::new("."), &ModelCache::new());
        assert!(matches!(r, Err(Error::Configuration(_))));

        let c = configs(json!([{"LengthFilter": {}}, {"LengthFilter": {"name": "short"}}]));
        let p = FilterPipeline::from_config(&c, Mode::Score, Path::new("."), &ModelCache::new())
            .unwrap();
        assert_eq!(p.keys().collect::<Vec<_>>(), vec!["LengthFilter", "short"]);
    }

    #[test]
    fn score_only_in_filter_mode() {
        let dir = tempfile::tempdir().unwrap();
        crate::models::alignment::tests::write_toy(dir.path());
        let c = configs(json!([{"WordAlignFilter": {"priors": "priors.txt"}}]));
        let r = FilterPipeline::from_config(&c, Mode::Filter, dir.path(), &ModelCache::new());
        assert!(matches!(r, Err(Error::Configuration(_))));
    }

    #[test]
    fn filter_keeps_order() {
        let dir = tempfile::tempdir().unwrap();
        let src: Vec<String> = (0..50).map(|i| "w ".repeat(i % 7 + 1)).collect();
        let src: Vec<&str> = src.iter().map(|s| s.trim()).collect();
        let a = write(dir.path(), "a.txt", &src);
        let b = write(dir.path(), "b.txt", &src);

        let c = configs(json!([{"LengthFilter": {"max_length": 3}}]));
        let p = FilterPipeline::from_config(&c, Mode::Filter, dir.path(), &ModelCache::new())
            .unwrap();

        let outputs = [dir.path().join("a.out"), dir.path().join("b.out")];
        let mut reader = ParallelReader::open(&[a, b]).unwrap();
        let mut writer = ParallelWriter::create(&outputs).unwrap();
        let stats = p.filter(&mut reader, &mut writer, false, None, 4).unwrap();
        writer.finish().unwrap();

        let expected: Vec<String> = src
            .iter()
            .filter(|s| s.split_whitespace().count() <= 3)
            .map(|s| s.to_string())
            .collect();
        assert_eq!(stats.read, 50);
        assert_eq!(stats.written, expected.len());
        assert_eq!(read(&outputs[0]), expected);
        assert_eq!(read(&outputs[1]), expected);
    }

    #[test]
    fn filterfalse_and_limit() {
        let dir = tempfile::tempdir().unwrap();
        let lines = ["a", "a b c d e", "b", "a b c d e f", "c", "a b c d e f g"];
        let a = write(dir.path(), "a.txt", &lines);
        let c = configs(json!([{"LengthFilter": {"max_length": 2}}]));
        let p = FilterPipeline::from_config(&c, Mode::Filter, dir.path(), &ModelCache::new())
            .unwrap();

        let out = dir.path().join("false.txt");
        let mut reader = ParallelReader::open(&[&a]).unwrap();
        let mut writer = ParallelWriter::create(&[&out]).unwrap();
        p.filter(&mut reader, &mut writer, true, None, 2).unwrap();
        writer.finish().unwrap();
        assert_eq!(read(&out), vec!["a b c d e", "a b c d e f", "a b c d e f g"]);

        let out = dir.path().join("limit.txt");
        let mut reader = ParallelReader::open(&[&a]).unwrap();
        let mut writer = ParallelWriter::create(&[&out]).unwrap();
        let stats = p.filter(&mut reader, &mut writer, false, Some(2), 100).unwrap();
        writer.finish().unwrap();
        assert_eq!(stats.written, 2);
        assert_eq!(read(&out), vec!["a", "b"]);
    }

    #[test]
    fn score_objects() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "a.txt", &["Hei.", "Tämä on testi."]);
        let b = write(dir.path(), "b.txt", &["Hi.", "This is a test."]);
        let c = configs(json!([
            {"LengthRatioFilter": {}},
            {"LengthFilter": {"unit": "char", "name": "chars"}}
        ]));
        let p =
            FilterPipeline::from_config(&c, Mode::Score, dir.path(), &ModelCache::new()).unwrap();

        let out = dir.path().join("scores.jsonl");
        let mut reader = ParallelReader::open(&[a, b]).unwrap();
        let mut writer = ValueWriter::create(&out).unwrap();
        assert_eq!(p.score(&mut reader, &mut writer, 1).unwrap(), 2);
        writer.finish().unwrap();

        let values: Vec<_> = ValueReader::open(&out)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(
            values,
            vec![
                json!({"LengthRatioFilter": 1.0, "chars": [4.0, 3.0]}),
                json!({"LengthRatioFilter": 4.0 / 3.0, "chars": [14.0, 15.0]}),
            ]
        );
    }

    #[test]
    fn oracle_failure_has_context() {
        let dir = tempfile::tempdir().unwrap();
        let c = configs(json!([{"CharacterScoreFilter": {"scripts": ["Latin", "Latin"]}}]));
        let p = FilterPipeline::from_config(&c, Mode::Filter, dir.path(), &ModelCache::new())
            .unwrap();
        assert!(p.check_arity(2).is_ok());
        assert!(matches!(p.check_arity(3), Err(Error::Configuration(_))));

        let record = Record::from((7, vec!["a"]));
        match p.accepts(&record) {
            Err(Error::Oracle { row, oracle, .. }) => {
                assert_eq!(row, 7);
                assert_eq!(oracle, "CharacterScoreFilter");
            }
            other => panic!("unexpected result {other:?}"),
        }
    }
}
