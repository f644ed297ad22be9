//! Runtime settings for both binaries.
//!
//! Every value has a default matching the fixed layout of the project
//! (`data/ai4i2020.csv`, `models/`); `MAINT_*` environment variables
//! override them. Unparsable overrides fall back to the default.

use std::path::PathBuf;

use crate::artifacts::{ArtifactPaths, DEFAULT_MODEL_DIR};
use crate::forest::ForestParams;

pub const DEFAULT_DATASET_PATH: &str = "data/ai4i2020.csv";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8501";
pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_N_TREES: usize = 200;
pub const DEFAULT_TEST_RATIO: f64 = 0.2;

#[derive(Debug, Clone, PartialEq)]
pub struct TrainConfig {
    pub dataset_path: PathBuf,
    pub model_dir: PathBuf,
    pub seed: u64,
    pub n_trees: usize,
    pub test_ratio: f64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from(DEFAULT_DATASET_PATH),
            model_dir: PathBuf::from(DEFAULT_MODEL_DIR),
            seed: DEFAULT_SEED,
            n_trees: DEFAULT_N_TREES,
            test_ratio: DEFAULT_TEST_RATIO,
        }
    }
}

impl TrainConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let dataset_path = lookup("MAINT_DATASET_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.dataset_path);
        let model_dir = lookup("MAINT_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.model_dir);
        let seed = lookup("MAINT_SEED")
            .and_then(|value| value.trim().parse::<u64>().ok())
            .unwrap_or(defaults.seed);
        let n_trees = lookup("MAINT_N_TREES")
            .and_then(|value| value.trim().parse::<usize>().ok())
            .map(clamp_n_trees)
            .unwrap_or(defaults.n_trees);
        let test_ratio = lookup("MAINT_TEST_RATIO")
            .and_then(|value| value.trim().parse::<f64>().ok())
            .filter(|value| value.is_finite())
            .map(clamp_test_ratio)
            .unwrap_or(defaults.test_ratio);

        Self {
            dataset_path,
            model_dir,
            seed,
            n_trees,
            test_ratio,
        }
    }

    pub fn artifact_paths(&self) -> ArtifactPaths {
        ArtifactPaths::in_dir(&self.model_dir)
    }

    pub fn forest_params(&self) -> ForestParams {
        ForestParams {
            n_trees: self.n_trees,
            seed: self.seed,
            ..ForestParams::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServeConfig {
    pub model_dir: PathBuf,
    pub bind_addr: String,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from(DEFAULT_MODEL_DIR),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
        }
    }
}

impl ServeConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            model_dir: lookup("MAINT_MODEL_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_dir),
            bind_addr: lookup("MAINT_BIND_ADDR")
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .unwrap_or(defaults.bind_addr),
        }
    }

    pub fn artifact_paths(&self) -> ArtifactPaths {
        ArtifactPaths::in_dir(&self.model_dir)
    }
}

fn clamp_n_trees(value: usize) -> usize {
    value.clamp(1, 2000)
}

fn clamp_test_ratio(value: f64) -> f64 {
    value.clamp(0.05, 0.5)
}
