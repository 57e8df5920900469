//! Score streams: one JSON value per line.
//!
//! Score records are JSON objects. `serde_json` keeps object keys sorted,
//! which gives a canonical line for a given record and lets values
//! round-trip unchanged through sort and join steps.
use std::path::Path;

use serde_json::Value;

use crate::error::{Error, StreamError};

use super::{LineReader, PartialFile};

/// Reads one JSON value per line.
pub struct ValueReader {
    lines: LineReader,
}

impl ValueReader {
    pub fn open(path: &Path) -> Result<Self, Error> {
        Ok(Self {
            lines: LineReader::open(path)?,
        })
    }

    pub fn path(&self) -> &Path {
        self.lines.path()
    }

    fn parse(&self, line: &str) -> Result<Value, Error> {
        serde_json::from_str(line).map_err(|e| {
            StreamError::new(format!("invalid JSON value: {e}"))
                .with_path(self.lines.path())
                .with_row(self.lines.rows().saturating_sub(1))
                .into()
        })
    }
}

impl Iterator for ValueReader {
    type Item = Result<Value, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let line = self.lines.next()?;
        Some(line.and_then(|l| self.parse(&l)))
    }
}

/// Writes one JSON value per line, committing atomically on [ValueWriter::finish].
pub struct ValueWriter {
    file: PartialFile,
}

impl ValueWriter {
    pub fn create(path: &Path) -> Result<Self, Error> {
        Ok(Self {
            file: PartialFile::create(path)?,
        })
    }

    pub fn write(&mut self, value: &Value) -> Result<(), Error> {
        let line = serde_json::to_string(value)?;
        self.file.write_line(&line)
    }

    pub fn written(&self) -> usize {
        self.file.lines()
    }

    pub fn finish(self) -> Result<(), Error> {
        self.file.finish()
    }

    /// Hand over the uncommitted file (see [super::commit_all]).
    pub fn into_file(self) -> PartialFile {
        self.file
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn values_roundtrip_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scores.jsonl.gz");
        let values = vec![
            json!({"b": [0.1, 2.5e-7], "a": true}),
            json!({"a": false, "b": [1.0, 3.0], "ratio": null}),
            json!(0.75),
        ];

        let mut w = ValueWriter::create(&path).unwrap();
        for v in &values {
            w.write(v).unwrap();
        }
        w.finish().unwrap();

        let read: Vec<Value> = ValueReader::open(&path)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(read, values);
    }

    #[test]
    fn keys_are_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scores.jsonl");
        let mut w = ValueWriter::create(&path).unwrap();
        w.write(&json!({"z": 1, "a": 2})).unwrap();
        w.finish().unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "{\"a\":2,\"z\":1}\n");
    }

    #[test]
    fn invalid_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.jsonl");
        std::fs::write(&path, "{\"a\": 1}\nnot json\n").unwrap();
        let res: Result<Vec<Value>, Error> = ValueReader::open(&path).unwrap().collect();
        match res {
            Err(Error::Stream(e)) => assert_eq!(e.row, Some(1)),
            other => panic!("unexpected {other:?}"),
        }
    }
}
