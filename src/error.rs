//! Error enum
use std::fmt;
use std::path::PathBuf;

/// Every error is fatal at the step level: the running step is aborted and
/// its partial outputs are discarded.
#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    Serde(serde_json::Error),
    /// Misaligned, unreadable or malformed parallel streams.
    Stream(StreamError),
    /// Invalid step or filter configuration.
    Configuration(String),
    /// Missing or corrupt trained model artifact.
    ModelLoad { path: PathBuf, reason: String },
    /// A subset larger than its input was requested.
    InsufficientData { requested: usize, available: usize },
    /// Join operands of unequal length.
    Alignment(String),
    /// An oracle failed on a given record.
    Oracle {
        row: usize,
        oracle: String,
        message: String,
    },
    Custom(String),
}

/// Stream-level failure, with enough context to locate the faulty file/line.
#[derive(Debug)]
pub struct StreamError {
    pub path: Option<PathBuf>,
    pub row: Option<usize>,
    pub message: String,
}

impl StreamError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            path: None,
            row: None,
            message: message.into(),
        }
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_row(mut self, row: usize) -> Self {
        self.row = Some(row);
        self
    }
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(path) = &self.path {
            write!(f, " (file {path:?}")?;
            if let Some(row) = self.row {
                write!(f, ", row {row}")?;
            }
            write!(f, ")")?;
        } else if let Some(row) = self.row {
            write!(f, " (row {row})")?;
        }
        Ok(())
    }
}

impl Error {
    /// Shortcut for [Error::Stream] without file context.
    pub fn stream(message: impl Into<String>) -> Self {
        Self::Stream(StreamError::new(message))
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn model_load(path: impl Into<PathBuf>, reason: impl fmt::Display) -> Self {
        Self::ModelLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "io error: {e}"),
            Error::Serde(e) => write!(f, "serialization error: {e}"),
            Error::Stream(e) => write!(f, "stream error: {e}"),
            Error::Configuration(e) => write!(f, "configuration error: {e}"),
            Error::ModelLoad { path, reason } => {
                write!(f, "could not load model {path:?}: {reason}")
            }
            Error::InsufficientData {
                requested,
                available,
            } => write!(
                f,
                "insufficient data: requested {requested} records, only {available} available"
            ),
            Error::Alignment(e) => write!(f, "alignment error: {e}"),
            Error::Oracle {
                row,
                oracle,
                message,
            } => write!(f, "oracle {oracle} failed on row {row}: {message}"),
            Error::Custom(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Serde(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Error {
        Error::Io(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Error {
        Error::Serde(e)
    }
}

impl From<StreamError> for Error {
    fn from(e: StreamError) -> Error {
        Error::Stream(e)
    }
}

impl From<String> for Error {
    fn from(s: String) -> Error {
        Error::Custom(s)
    }
}
