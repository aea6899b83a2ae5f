use super::Format;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O operation failed: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("failed to parse {format} data: {details} (at line {line})")]
    Parse {
        format: Format,
        line: usize,
        details: String,
    },
}

impl Error {
    pub fn parse(format: Format, line: usize, details: impl Into<String>) -> Self {
        Self::Parse {
            format,
            line,
            details: details.into(),
        }
    }

    /// Line number of a parse failure.
    pub fn line(&self) -> Option<usize> {
        match self {
            Error::Parse { line, .. } => Some(*line),
            Error::Io { .. } => None,
        }
    }
}
