//! Serving-side inference over a loaded artifact bundle.
//!
//! A [`Predictor`] is decided once, when it is built: either the artifacts
//! loaded and every assessment runs against them, or they did not and the
//! predictor stays unavailable for the life of the process.

use tracing::{info, warn};

use crate::artifacts::{ArtifactBundle, ArtifactPaths};
use crate::error::{Error, Result};
use crate::schema::{
    MachineType, AIR_TEMPERATURE_COLUMN, PROCESS_TEMPERATURE_COLUMN, ROTATIONAL_SPEED_COLUMN,
    TOOL_WEAR_COLUMN, TORQUE_COLUMN, TYPE_COLUMN,
};

/// A bounded numeric input on the form.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputField {
    pub key: &'static str,
    pub label: &'static str,
    pub column: &'static str,
    pub min: f64,
    pub max: f64,
    pub default: f64,
}

impl InputField {
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

pub const AIR_TEMPERATURE: InputField = InputField {
    key: "air_temperature",
    label: "Air Temperature [K]",
    column: AIR_TEMPERATURE_COLUMN,
    min: 290.0,
    max: 320.0,
    default: 298.0,
};

pub const PROCESS_TEMPERATURE: InputField = InputField {
    key: "process_temperature",
    label: "Process Temperature [K]",
    column: PROCESS_TEMPERATURE_COLUMN,
    min: 300.0,
    max: 330.0,
    default: 308.0,
};

pub const ROTATIONAL_SPEED: InputField = InputField {
    key: "rotational_speed",
    label: "Rotational Speed [rpm]",
    column: ROTATIONAL_SPEED_COLUMN,
    min: 1000.0,
    max: 3000.0,
    default: 1500.0,
};

pub const TORQUE: InputField = InputField {
    key: "torque",
    label: "Torque [Nm]",
    column: TORQUE_COLUMN,
    min: 0.0,
    max: 100.0,
    default: 40.0,
};

pub const TOOL_WEAR: InputField = InputField {
    key: "tool_wear",
    label: "Tool Wear [min]",
    column: TOOL_WEAR_COLUMN,
    min: 0.0,
    max: 250.0,
    default: 50.0,
};

/// Numeric inputs in form order: two temperatures in the first column, the
/// rest in the second.
pub const INPUT_FIELDS: [InputField; 5] = [
    AIR_TEMPERATURE,
    PROCESS_TEMPERATURE,
    ROTATIONAL_SPEED,
    TORQUE,
    TOOL_WEAR,
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReadings {
    pub machine_type: MachineType,
    pub air_temperature: f64,
    pub process_temperature: f64,
    pub rotational_speed: f64,
    pub torque: f64,
    pub tool_wear: f64,
}

impl Default for SensorReadings {
    fn default() -> Self {
        Self {
            machine_type: MachineType::M,
            air_temperature: AIR_TEMPERATURE.default,
            process_temperature: PROCESS_TEMPERATURE.default,
            rotational_speed: ROTATIONAL_SPEED.default,
            torque: TORQUE.default,
            tool_wear: TOOL_WEAR.default,
        }
    }
}

impl SensorReadings {
    /// Pins every reading into its form bounds.
    pub fn clamped(self) -> Self {
        Self {
            machine_type: self.machine_type,
            air_temperature: AIR_TEMPERATURE.clamp(self.air_temperature),
            process_temperature: PROCESS_TEMPERATURE.clamp(self.process_temperature),
            rotational_speed: ROTATIONAL_SPEED.clamp(self.rotational_speed),
            torque: TORQUE.clamp(self.torque),
            tool_wear: TOOL_WEAR.clamp(self.tool_wear),
        }
    }

    pub fn value(&self, field: &InputField) -> f64 {
        self.value_for(field.column).unwrap_or(field.default)
    }

    /// Reading for a dataset column name.
    pub fn value_for(&self, column: &str) -> Option<f64> {
        match column {
            TYPE_COLUMN => Some(self.machine_type.code()),
            AIR_TEMPERATURE_COLUMN => Some(self.air_temperature),
            PROCESS_TEMPERATURE_COLUMN => Some(self.process_temperature),
            ROTATIONAL_SPEED_COLUMN => Some(self.rotational_speed),
            TORQUE_COLUMN => Some(self.torque),
            TOOL_WEAR_COLUMN => Some(self.tool_wear),
            _ => None,
        }
    }

    /// Builds the model input in the order of the stored feature list.
    pub fn feature_vector(&self, feature_columns: &[String]) -> Result<Vec<f64>> {
        feature_columns
            .iter()
            .map(|column| {
                self.value_for(column).ok_or_else(|| {
                    Error::SchemaMismatch(format!("no input for feature column `{column}`"))
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskAssessment {
    HighRisk,
    Normal,
}

impl RiskAssessment {
    pub fn from_label(label: u8) -> Self {
        if label == 1 {
            RiskAssessment::HighRisk
        } else {
            RiskAssessment::Normal
        }
    }

    pub fn headline(self) -> &'static str {
        match self {
            RiskAssessment::HighRisk => "High Failure Risk Detected!",
            RiskAssessment::Normal => "Machine Operating Normally",
        }
    }

    pub fn advice(self) -> &'static str {
        match self {
            RiskAssessment::HighRisk => "Schedule maintenance immediately to avoid downtime.",
            RiskAssessment::Normal => "The machine is running within safe operational limits.",
        }
    }
}

#[derive(Debug)]
pub enum Predictor {
    Ready(ArtifactBundle),
    Unavailable(String),
}

impl Predictor {
    /// Loads the artifacts once. Any failure leaves the predictor unavailable.
    pub fn load(paths: &ArtifactPaths) -> Self {
        match ArtifactBundle::load(paths) {
            Ok(bundle) => {
                info!(
                    dir = %paths.dir.display(),
                    trees = bundle.model.n_trees(),
                    "model artifacts loaded"
                );
                Predictor::Ready(bundle)
            }
            Err(err) => {
                warn!(error = %err, "model artifacts unavailable, prediction disabled");
                Predictor::Unavailable(err.to_string())
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Predictor::Ready(_))
    }

    /// Why loading failed, if it did.
    pub fn unavailable_reason(&self) -> Option<&str> {
        match self {
            Predictor::Ready(_) => None,
            Predictor::Unavailable(reason) => Some(reason),
        }
    }

    pub fn assess(&self, readings: &SensorReadings) -> Result<RiskAssessment> {
        let Predictor::Ready(bundle) = self else {
            return Err(Error::ArtifactsUnavailable);
        };

        let features = readings.feature_vector(&bundle.feature_columns)?;
        let scaled = bundle.scaler.transform(&features)?;
        let label = bundle.model.predict(&scaled)?;
        Ok(RiskAssessment::from_label(label))
    }
}
