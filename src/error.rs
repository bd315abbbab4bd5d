use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid dataset: {0}")]
    InvalidDataset(String),

    #[error("dataset has no rows")]
    EmptyDataset,

    #[error("line {line}, column '{column}': '{value}' is not a number")]
    InvalidValue {
        line: u64,
        column: String,
        value: String,
    },

    #[error("dimension mismatch: expected {expected} features, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("training failed: {0}")]
    Training(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("corrupt model artifact: {0}")]
    CorruptArtifact(String),

    #[error("unsupported model artifact version {found} (expected {expected})")]
    UnsupportedArtifactVersion { expected: u16, found: u16 },
}

pub type Result<T> = ::std::result::Result<T, Error>;

impl Error {
    /// True when the underlying cause is a missing file.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Io(e) => e.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }
}
