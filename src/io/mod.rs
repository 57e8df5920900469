/*!
# IO utilities

Line-oriented reading and writing of (optionally gzipped) corpus files.

- [ParallelReader] reads N aligned files in lock-step, yielding [crate::record::Record]s.
- [ParallelWriter] writes N aligned files, committing them atomically on [ParallelWriter::finish].
- [ValueReader]/[ValueWriter] handle score streams (one JSON value per line).

Compression is chosen from the file extension: files ending in `.gz` are gzip-compressed,
everything else is plain UTF-8 text.
!*/
mod reader;
mod scores;
mod writer;

use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use flate2::{read::MultiGzDecoder, write::GzEncoder, Compression};

use crate::error::{Error, StreamError};

pub use reader::{LineReader, ParallelReader};
pub use scores::{ValueReader, ValueWriter};
pub use writer::{commit_all, ParallelWriter, PartialFile};

/// Is the file gzip-compressed (judging from its extension)?
pub fn is_gzip(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext == "gz")
}

/// Open a file for buffered line reading, decompressing gzip files.
pub fn open_read(path: &Path) -> Result<Box<dyn BufRead + Send>, Error> {
    let file = File::open(path).map_err(|e| {
        Error::Stream(StreamError::new(format!("could not open file: {e}")).with_path(path))
    })?;
    if is_gzip(path) {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Sink for a single output file. Gzip streams must be finished explicitly
/// so that the trailer is written before the file is renamed.
pub(crate) enum Sink {
    Plain(BufWriter<File>),
    Gzip(GzEncoder<BufWriter<File>>),
}

impl Sink {
    pub(crate) fn create(path: &Path, compressed: bool) -> Result<Self, Error> {
        let file = File::create(path)?;
        let buf = BufWriter::new(file);
        Ok(if compressed {
            Sink::Gzip(GzEncoder::new(buf, Compression::default()))
        } else {
            Sink::Plain(buf)
        })
    }

    /// Flush and close the underlying file.
    pub(crate) fn finish(self) -> std::io::Result<()> {
        match self {
            Sink::Plain(mut w) => w.flush(),
            Sink::Gzip(enc) => enc.finish()?.flush(),
        }
    }
}

impl Write for Sink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            Sink::Plain(w) => w.write(buf),
            Sink::Gzip(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            Sink::Plain(w) => w.flush(),
            Sink::Gzip(w) => w.flush(),
        }
    }
}

/// Count lines of a (possibly compressed) file.
pub fn count_lines(path: &Path) -> Result<usize, Error> {
    let reader = open_read(path)?;
    let mut count = 0;
    for line in reader.lines() {
        line?;
        count += 1;
    }
    Ok(count)
}

/// Resolve `name` against `dir` unless it is already absolute.
pub fn resolve(dir: &Path, name: &Path) -> PathBuf {
    if name.is_absolute() {
        name.to_path_buf()
    } else {
        dir.join(name)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;

    #[test]
    fn gzip_roundtrip_through_sink() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt.gz");
        let mut sink = Sink::create(&path, true).unwrap();
        sink.write_all(b"hello\nworld\n").unwrap();
        sink.finish().unwrap();

        let mut content = String::new();
        open_read(&path).unwrap().read_to_string(&mut content).unwrap();
        assert_eq!(content, "hello\nworld\n");
        assert_eq!(count_lines(&path).unwrap(), 2);
    }

    #[test]
    fn missing_file_is_stream_error() {
        let res = open_read(Path::new("does/not/exist.gz"));
        assert!(matches!(res, Err(Error::Stream(_))));
    }
}
