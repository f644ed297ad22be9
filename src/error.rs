use std::path::PathBuf;

use polars::prelude::PolarsError;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while training, persisting or serving the failure model.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The training CSV does not exist.
    #[error("dataset not found at {}", .0.display())]
    DatasetMissing(PathBuf),
    /// Polars failed to read or reshape the dataset.
    #[error("dataset error: {0}")]
    Csv(#[from] PolarsError),
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to serialize {}: {source}", path.display())]
    Encode {
        path: PathBuf,
        source: bincode::Error,
    },
    #[error("failed to deserialize {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        source: bincode::Error,
    },
    /// Rows whose `Type` is not one of L, M or H.
    #[error("{count} rows have an unknown machine type")]
    UnknownMachineType { count: usize },
    #[error("invalid label value {0}, expected 0 or 1")]
    InvalidLabel(i64),
    /// Balancing needs at least one row of each class.
    #[error("no rows for class {0}")]
    MissingClass(u8),
    #[error("expected {expected} features, got {actual}")]
    FeatureCount { expected: usize, actual: usize },
    /// Stored feature names do not line up with the model or the input.
    #[error("feature schema mismatch: {0}")]
    SchemaMismatch(String),
    /// A decoded forest whose trees cannot be walked safely.
    #[error("corrupt model: {0}")]
    CorruptModel(String),
    #[error("cannot fit on an empty dataset")]
    EmptyInput,
    #[error("model artifacts are not loaded")]
    ArtifactsUnavailable,
}
