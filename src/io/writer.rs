//! Atomic line writers.
//!
//! Every output is first written to a sibling `<name>.partial` file.
//! Files are renamed to their final name only once *all* outputs of a writer are complete,
//! and partial files are removed when a writer is dropped without being finished.
//! That way, a step either produces all of its declared outputs or none of them.
use std::{
    io::Write,
    path::{Path, PathBuf},
};

use log::{debug, warn};

use crate::{
    error::{Error, StreamError},
    record::Record,
};

use super::Sink;

/// Single output file, written under a temporary name.
pub struct PartialFile {
    path: PathBuf,
    partial: PathBuf,
    sink: Option<Sink>,
    lines: usize,
}

impl PartialFile {
    pub fn create(path: &Path) -> Result<Self, Error> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut partial = path.as_os_str().to_owned();
        partial.push(".partial");
        let partial = PathBuf::from(partial);

        let sink = Sink::create(&partial, super::is_gzip(path))?;
        Ok(Self {
            path: path.to_path_buf(),
            partial,
            sink: Some(sink),
            lines: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of lines written.
    pub fn lines(&self) -> usize {
        self.lines
    }

    /// Write `line` followed by a newline.
    pub fn write_line(&mut self, line: &str) -> Result<(), Error> {
        let sink = self
            .sink
            .as_mut()
            .ok_or_else(|| Error::stream("write on a closed file"))?;
        sink.write_all(line.as_bytes())?;
        sink.write_all(b"\n")?;
        self.lines += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Error> {
        if let Some(sink) = self.sink.as_mut() {
            sink.flush()?;
        }
        Ok(())
    }

    /// Close the partial file, leaving it in place.
    fn close(&mut self) -> Result<(), Error> {
        if let Some(sink) = self.sink.take() {
            sink.finish()?;
        }
        Ok(())
    }

    /// Move the closed partial file to its final destination.
    fn rename(&mut self) -> Result<(), Error> {
        std::fs::rename(&self.partial, &self.path)?;
        debug!("wrote {} lines to {:?}", self.lines, self.path);
        // nothing to clean up anymore.
        self.partial = PathBuf::new();
        Ok(())
    }

    /// Close and commit a single file.
    pub fn finish(self) -> Result<(), Error> {
        commit_all(vec![self])
    }
}

/// Commit several files as a whole.
///
/// Every file is closed before the first rename. If a rename fails, files already moved
/// to their final name are removed again and the remaining partial files are dropped,
/// so either all of `files` become visible or none.
pub fn commit_all(mut files: Vec<PartialFile>) -> Result<(), Error> {
    for file in files.iter_mut() {
        file.close()?;
    }
    let mut committed: Vec<PathBuf> = Vec::with_capacity(files.len());
    for file in files.iter_mut() {
        if let Err(e) = file.rename() {
            for path in &committed {
                if let Err(e) = std::fs::remove_file(path) {
                    warn!("could not remove committed file {path:?}: {e}");
                }
            }
            return Err(e);
        }
        committed.push(file.path.clone());
    }
    Ok(())
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if self.partial.as_os_str().is_empty() {
            return;
        }
        // drop the encoder before removing the file.
        self.sink.take();
        if let Err(e) = std::fs::remove_file(&self.partial) {
            warn!("could not remove partial file {:?}: {e}", self.partial);
        }
    }
}

/// Writer over N aligned output files.
pub struct ParallelWriter {
    files: Vec<PartialFile>,
}

impl ParallelWriter {
    pub fn create<P: AsRef<Path>>(paths: &[P]) -> Result<Self, Error> {
        if paths.is_empty() {
            return Err(Error::stream("a parallel stream needs at least one file"));
        }
        let files = paths
            .iter()
            .map(|p| PartialFile::create(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { files })
    }

    pub fn arity(&self) -> usize {
        self.files.len()
    }

    /// Number of records written so far.
    pub fn written(&self) -> usize {
        self.files.first().map_or(0, PartialFile::lines)
    }

    /// Write one line to each output file.
    ///
    /// Segments are validated before anything is written, and every file is flushed
    /// once the record is out, so that a failure can never leave one stream ahead of the others
    /// in a committed output.
    pub fn write_segments<S: AsRef<str>>(&mut self, segments: &[S]) -> Result<(), Error> {
        if segments.len() != self.files.len() {
            return Err(StreamError::new(format!(
                "record has {} segments, writer has {} streams",
                segments.len(),
                self.files.len()
            ))
            .with_row(self.written())
            .into());
        }
        if let Some(stream) = segments
            .iter()
            .position(|s| s.as_ref().contains(['\n', '\r']))
        {
            return Err(
                StreamError::new("segment contains a line break, alignment would be lost")
                    .with_path(self.files[stream].path())
                    .with_row(self.written())
                    .into(),
            );
        }

        for (file, segment) in self.files.iter_mut().zip(segments) {
            file.write_line(segment.as_ref())?;
        }
        for file in self.files.iter_mut() {
            file.flush()?;
        }
        Ok(())
    }

    pub fn write(&mut self, record: &Record) -> Result<(), Error> {
        self.write_segments(record.segments())
    }

    /// Check that all files have the same line count, then commit them.
    pub fn finish(self) -> Result<(), Error> {
        commit_all(self.into_files()?)
    }

    /// Check that all files have the same line count and hand them over uncommitted,
    /// to be committed along with other outputs.
    pub fn into_files(self) -> Result<Vec<PartialFile>, Error> {
        let expected = self.written();
        if let Some(file) = self.files.iter().find(|f| f.lines() != expected) {
            return Err(StreamError::new(format!(
                "output has {} lines, expected {}",
                file.lines(),
                expected
            ))
            .with_path(file.path())
            .into());
        }
        Ok(self.files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::ParallelReader;

    #[test]
    fn write_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let paths = vec![dir.path().join("a.gz"), dir.path().join("b.txt")];
        let mut w = ParallelWriter::create(&paths).unwrap();
        w.write_segments(&["hello", "bonjour"]).unwrap();
        w.write_segments(&["bye", "au revoir"]).unwrap();
        assert_eq!(w.written(), 2);
        w.finish().unwrap();

        let records: Vec<_> = ParallelReader::open(&paths)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].segments(), &["bye", "au revoir"]);
        assert!(!dir.path().join("a.gz.partial").exists());
    }

    #[test]
    fn dropped_writer_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let paths = vec![dir.path().join("a.gz"), dir.path().join("b.gz")];
        {
            let mut w = ParallelWriter::create(&paths).unwrap();
            w.write_segments(&["x", "y"]).unwrap();
        }
        let remaining: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert!(remaining.is_empty());
    }

    #[test]
    fn failed_rename_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("a.txt");
        let second = dir.path().join("b.txt");
        // a non-empty directory can't be replaced by a file
        std::fs::create_dir(&second).unwrap();
        std::fs::write(second.join("keep"), "x").unwrap();

        let mut w = ParallelWriter::create(&[&first, &second]).unwrap();
        w.write_segments(&["hello", "bonjour"]).unwrap();
        assert!(w.finish().is_err());

        assert!(!first.exists());
        assert!(!dir.path().join("a.txt.partial").exists());
        assert!(!dir.path().join("b.txt.partial").exists());
        assert!(second.join("keep").exists());
    }

    #[test]
    fn wrong_arity() {
        let dir = tempfile::tempdir().unwrap();
        let mut w = ParallelWriter::create(&[dir.path().join("a"), dir.path().join("b")]).unwrap();
        assert!(matches!(w.write_segments(&["only one"]), Err(Error::Stream(_))));
    }

    #[test]
    fn newline_in_segment() {
        let dir = tempfile::tempdir().unwrap();
        let mut w = ParallelWriter::create(&[dir.path().join("a"), dir.path().join("b")]).unwrap();
        assert!(w.write_segments(&["fine", "not\nfine"]).is_err());
        // nothing was written on the first stream either.
        assert_eq!(w.written(), 0);
    }
}
