use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;

pub type IncognitoResult<T> = Result<T, IncognitoError>;

/// Incognito error
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum IncognitoError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("Unknown value {1:?} in hierarchy for column {0}")]
    UnknownValueInHierarchy(String, String),

    #[error("Invalid k: {0} (must be >= 1)")]
    InvalidK(i64),

    #[error("Lattices are incompatible: {0}")]
    IncompatibleLattice(String),

    #[error("Quasi-identifier set is empty")]
    EmptyQuasiIdentifierSet,

    #[error("Unknown dataset: {0}")]
    UnknownDataset(String),

    #[error("Hierarchy file not found for column {0}: {1:?}")]
    HierarchyFileNotFound(String, PathBuf),

    #[error("Invalid hierarchy definition: {0}")]
    InvalidHierarchy(String),
}
