/*! Reading facilities

Readers implement [Iterator] over lines/records.

- [LineReader]: reads newline-separated lines of a single file.
- [ParallelReader]: reads several aligned files in lock-step.

!*/
use std::{
    io::BufRead,
    path::{Path, PathBuf},
};

use log::debug;

use crate::{
    error::{Error, StreamError},
    record::Record,
};

/// Reader that yields lines from a single (possibly gzipped) file,
/// with trailing `\n`/`\r\n` removed.
pub struct LineReader {
    path: PathBuf,
    inner: Box<dyn BufRead + Send>,
    row: usize,
    buf: Vec<u8>,
}

impl LineReader {
    pub fn open(path: &Path) -> Result<Self, Error> {
        Ok(Self {
            path: path.to_path_buf(),
            inner: super::open_read(path)?,
            row: 0,
            buf: Vec::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of lines read so far.
    pub fn rows(&self) -> usize {
        self.row
    }

    fn read_line(&mut self) -> Option<Result<String, Error>> {
        self.buf.clear();
        match self.inner.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => {
                if self.buf.last() == Some(&b'\n') {
                    self.buf.pop();
                    if self.buf.last() == Some(&b'\r') {
                        self.buf.pop();
                    }
                }
                let row = self.row;
                self.row += 1;
                Some(String::from_utf8(std::mem::take(&mut self.buf)).map_err(|e| {
                    StreamError::new(format!("invalid UTF-8: {e}"))
                        .with_path(&self.path)
                        .with_row(row)
                        .into()
                }))
            }
            Err(e) => Some(Err(StreamError::new(format!("read failure: {e}"))
                .with_path(&self.path)
                .with_row(self.row)
                .into())),
        }
    }
}

impl Iterator for LineReader {
    type Item = Result<String, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_line()
    }
}

/// Lock-step reader over N aligned files.
///
/// Yields one [Record] per row. If a file ends before the others,
/// a [StreamError] is returned instead of silently truncating the stream set.
pub struct ParallelReader {
    readers: Vec<LineReader>,
    index: usize,
    done: bool,
}

impl ParallelReader {
    /// Open all provided paths.
    ///
    /// # Errors
    /// Fails with a [StreamError] if no path is given or if a file can't be opened.
    pub fn open<P: AsRef<Path>>(paths: &[P]) -> Result<Self, Error> {
        if paths.is_empty() {
            return Err(Error::stream("a parallel stream needs at least one file"));
        }
        let readers = paths
            .iter()
            .map(|p| LineReader::open(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(
            "opened parallel stream over {:?}",
            readers.iter().map(LineReader::path).collect::<Vec<_>>()
        );
        Ok(Self {
            readers,
            index: 0,
            done: false,
        })
    }

    /// Number of aligned streams.
    pub fn arity(&self) -> usize {
        self.readers.len()
    }

    /// Number of records yielded so far.
    pub fn position(&self) -> usize {
        self.index
    }

    pub fn paths(&self) -> Vec<&Path> {
        self.readers.iter().map(LineReader::path).collect()
    }

    /// Read up to `size` records.
    /// Returns an empty vector when the stream is exhausted.
    pub fn next_chunk(&mut self, size: usize) -> Result<Vec<Record>, Error> {
        let mut chunk = Vec::with_capacity(size.min(1 << 16));
        for record in self.by_ref().take(size) {
            chunk.push(record?);
        }
        Ok(chunk)
    }

    fn next_record(&mut self) -> Option<Result<Record, Error>> {
        if self.done {
            return None;
        }

        let mut segments = Vec::with_capacity(self.readers.len());
        let mut ended = Vec::new();
        for (stream, reader) in self.readers.iter_mut().enumerate() {
            match reader.next() {
                Some(Ok(line)) => segments.push(line),
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e));
                }
                None => ended.push(stream),
            }
        }

        if ended.len() == self.readers.len() {
            self.done = true;
            return None;
        }

        if !ended.is_empty() {
            self.done = true;
            let shorter = &self.readers[ended[0]];
            return Some(Err(StreamError::new(format!(
                "streams have different lengths: stream {} ended after {} lines while others continue",
                ended[0],
                shorter.rows()
            ))
            .with_path(shorter.path())
            .with_row(self.index)
            .into()));
        }

        let record = Record::new(self.index, segments);
        self.index += 1;
        Some(Ok(record))
    }
}

impl Iterator for ParallelReader {
    type Item = Result<Record, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn lockstep() {
        let dir = tempfile::tempdir().unwrap();
        let fi = write_file(dir.path(), "fi.txt", "Hei.\nTämä on testi.\n");
        let en = write_file(dir.path(), "en.txt", "Hi.\r\nThis is a test.\r\n");

        let records: Vec<Record> = ParallelReader::open(&[fi, en])
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].index(), 1);
        assert_eq!(records[1].segments(), &["Tämä on testi.", "This is a test."]);
    }

    #[test]
    fn missing_final_newline() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_file(dir.path(), "a.txt", "a\nb");
        let b = write_file(dir.path(), "b.txt", "c\nd\n");
        let records: Vec<Record> = ParallelReader::open(&[a, b])
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].segments(), &["b", "d"]);
    }

    #[test]
    fn mismatched_lengths() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_file(dir.path(), "a.txt", "1\n2\n3\n");
        let b = write_file(dir.path(), "b.txt", "1\n2\n");

        let res: Result<Vec<Record>, Error> = ParallelReader::open(&[a, b]).unwrap().collect();
        match res {
            Err(Error::Stream(e)) => {
                assert_eq!(e.row, Some(2));
                assert!(e.path.unwrap().ends_with("b.txt"));
            }
            other => panic!("expected stream error, got {other:?}"),
        }
    }

    #[test]
    fn empty_path_list() {
        let paths: Vec<PathBuf> = vec![];
        assert!(ParallelReader::open(&paths).is_err());
    }

    #[test]
    fn chunks() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_file(dir.path(), "a.txt", "1\n2\n3\n4\n5\n");
        let mut r = ParallelReader::open(&[a]).unwrap();
        assert_eq!(r.next_chunk(2).unwrap().len(), 2);
        assert_eq!(r.next_chunk(2).unwrap().len(), 2);
        let last = r.next_chunk(2).unwrap();
        assert_eq!(last.len(), 1);
        assert_eq!(last[0].index(), 4);
        assert!(r.next_chunk(2).unwrap().is_empty());
    }
}
