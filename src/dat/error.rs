#![forbid(unsafe_code)]

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("input not found: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("invalid archive: {0}")]
    Invalid(String),

    #[error("path is outside input dir: {0}")]
    Outside(String),

    #[error("no known name and file stem is not a fingerprint: {0}")]
    Unresolved(String),
}

pub type DatResult<T> = Result<T, DatError>;
