//! Parallel record.
//!
//! A [Record] is one row of a parallel stream: a tuple of aligned segments
//! along with its 0-based position in the stream set.

/// Row of a parallel stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    index: usize,
    segments: Vec<String>,
}

impl Record {
    pub fn new(index: usize, segments: Vec<String>) -> Self {
        Self { index, segments }
    }

    /// Row index in the source stream set.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn segment(&self, idx: usize) -> Option<&str> {
        self.segments.get(idx).map(String::as_str)
    }

    /// Number of aligned streams.
    pub fn arity(&self) -> usize {
        self.segments.len()
    }

    pub fn into_segments(self) -> Vec<String> {
        self.segments
    }
}

impl<S: Into<String>> From<(usize, Vec<S>)> for Record {
    fn from((index, segments): (usize, Vec<S>)) -> Self {
        Self::new(index, segments.into_iter().map(Into::into).collect())
    }
}
