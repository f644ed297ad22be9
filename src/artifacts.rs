//! The three files the trainer writes and the predictor reads back.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;

use crate::error::{Error, Result};
use crate::forest::RandomForest;
use crate::scaler::StandardScaler;

pub const DEFAULT_MODEL_DIR: &str = "models";

const MODEL_FILE: &str = "rf_model.bin";
const SCALER_FILE: &str = "scaler.bin";
const FEATURE_COLUMNS_FILE: &str = "feature_columns.bin";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub dir: PathBuf,
    pub model: PathBuf,
    pub scaler: PathBuf,
    pub feature_columns: PathBuf,
}

impl ArtifactPaths {
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            dir: dir.to_path_buf(),
            model: dir.join(MODEL_FILE),
            scaler: dir.join(SCALER_FILE),
            feature_columns: dir.join(FEATURE_COLUMNS_FILE),
        }
    }
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self::in_dir(DEFAULT_MODEL_DIR)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactBundle {
    pub model: RandomForest,
    pub scaler: StandardScaler,
    pub feature_columns: Vec<String>,
}

impl ArtifactBundle {
    /// Writes all three files, replacing whatever is already there.
    pub fn save(&self, paths: &ArtifactPaths) -> Result<()> {
        fs::create_dir_all(&paths.dir).map_err(|source| Error::Io {
            path: paths.dir.clone(),
            source,
        })?;

        write_artifact(&paths.model, &self.model)?;
        write_artifact(&paths.scaler, &self.scaler)?;
        write_artifact(&paths.feature_columns, &self.feature_columns)?;

        info!(dir = %paths.dir.display(), "artifacts saved");
        Ok(())
    }

    pub fn load(paths: &ArtifactPaths) -> Result<Self> {
        let bundle = Self {
            model: read_artifact(&paths.model)?,
            scaler: read_artifact(&paths.scaler)?,
            feature_columns: read_artifact(&paths.feature_columns)?,
        };
        bundle.check_consistent()?;
        Ok(bundle)
    }

    /// Model, scaler and feature list must agree on the feature count, and
    /// every tree must be walkable.
    pub fn check_consistent(&self) -> Result<()> {
        self.model.validate()?;
        let columns = self.feature_columns.len();
        if self.scaler.n_features() != columns || self.model.n_features() != columns {
            return Err(Error::SchemaMismatch(format!(
                "{columns} feature columns, scaler expects {}, model expects {}",
                self.scaler.n_features(),
                self.model.n_features()
            )));
        }
        Ok(())
    }
}

fn write_artifact<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let bytes = bincode::serialize(value).map_err(|source| Error::Encode {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, bytes).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn read_artifact<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    bincode::deserialize(&bytes).map_err(|source| Error::Decode {
        path: path.to_path_buf(),
        source,
    })
}
