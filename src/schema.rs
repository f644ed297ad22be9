//! Column layout shared by the trainer and the predictor.
//!
//! The order of [`FEATURE_COLUMNS`] is the order of every feature vector the
//! model ever sees. The trainer persists it next to the model so the
//! predictor can rebuild vectors by name instead of by position.

pub const TYPE_COLUMN: &str = "Type";
pub const AIR_TEMPERATURE_COLUMN: &str = "Air temperature [K]";
pub const PROCESS_TEMPERATURE_COLUMN: &str = "Process temperature [K]";
pub const ROTATIONAL_SPEED_COLUMN: &str = "Rotational speed [rpm]";
pub const TORQUE_COLUMN: &str = "Torque [Nm]";
pub const TOOL_WEAR_COLUMN: &str = "Tool wear [min]";

pub const TARGET_COLUMN: &str = "Machine failure";

pub const FEATURE_COLUMNS: [&str; 6] = [
    TYPE_COLUMN,
    AIR_TEMPERATURE_COLUMN,
    PROCESS_TEMPERATURE_COLUMN,
    ROTATIONAL_SPEED_COLUMN,
    TORQUE_COLUMN,
    TOOL_WEAR_COLUMN,
];

pub fn feature_column_names() -> Vec<String> {
    FEATURE_COLUMNS.iter().map(|name| name.to_string()).collect()
}

/// Product quality variant of the machine, encoded ordinally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MachineType {
    /// Low
    L,
    /// Medium
    #[default]
    M,
    /// High
    H,
}

impl MachineType {
    pub const ALL: [MachineType; 3] = [MachineType::L, MachineType::M, MachineType::H];

    pub fn code(self) -> f64 {
        match self {
            MachineType::L => 0.0,
            MachineType::M => 1.0,
            MachineType::H => 2.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MachineType::L => "L",
            MachineType::M => "M",
            MachineType::H => "H",
        }
    }

    /// Parses the dataset's `Type` value. Anything else is unknown.
    pub fn from_label(value: &str) -> Option<Self> {
        match value.trim() {
            "L" => Some(MachineType::L),
            "M" => Some(MachineType::M),
            "H" => Some(MachineType::H),
            _ => None,
        }
    }
}
