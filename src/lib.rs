//! Predictive maintenance: train a random-forest failure classifier on the
//! AI4I 2020 sensor dataset and serve single-reading risk predictions.

pub mod artifacts;
pub mod config;
pub mod dataset;
pub mod error;
pub mod forest;
pub mod logging;
pub mod metrics;
pub mod predictor;
pub mod sampling;
pub mod scaler;
pub mod schema;
pub mod training;
pub mod web;

pub use artifacts::{ArtifactBundle, ArtifactPaths};
pub use config::{ServeConfig, TrainConfig};
pub use error::{Error, Result};
pub use forest::{ForestParams, RandomForest};
pub use predictor::{Predictor, RiskAssessment, SensorReadings};
pub use scaler::StandardScaler;
pub use training::{run_training, TrainingSummary};
