//! Error types for flagfile

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlagFileError {
    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    #[error("Malformed file: {0}")]
    MalformedFile(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Invalid feature name: {0}")]
    InvalidFeatureName(String),
}

pub type Result<T> = std::result::Result<T, FlagFileError>;
