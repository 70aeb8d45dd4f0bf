use serde::Serialize;

/// Maximum number of simultaneously active actuators (heat, cool, light).
pub const MAX_ACTIVE_FUNCTIONS: u8 = 3;

/// One physical sensor reading.
///
/// `Fault` is the decoded `er` wire sentinel: a legitimate value meaning the
/// sensor failed, distinct from a parse failure and never coerced to a number.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SensorReading {
    Value(f32),
    Fault,
}

impl SensorReading {
    /// The numeric value, if the sensor reported one.
    pub fn value(self) -> Option<f32> {
        match self {
            Self::Value(v) => Some(v),
            Self::Fault => None,
        }
    }

    pub fn is_fault(self) -> bool {
        matches!(self, Self::Fault)
    }
}

impl std::fmt::Display for SensorReading {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Value(v) => write!(f, "{v:.2}"),
            Self::Fault => f.write_str("fault"),
        }
    }
}

/// Decoded state of the bag at one telemetry frame.
///
/// Produced whole or not at all: a frame that fails validation yields no
/// snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TelemetrySnapshot {
    /// Battery charge, clamped into 0..=100.
    pub battery_percent: u8,
    /// Upper (heated) compartment temperature.
    pub hot_temp_c: SensorReading,
    /// Lower (cooled) compartment temperature.
    pub cold_temp_c: SensorReading,
    /// Hall-sensor derived lid state.
    pub lock_closed: bool,
    /// Count of simultaneously active actuators, 0..=3.
    pub active_functions: u8,
    /// Signed accelerometer deviation from rest (1 g baseline removed
    /// on the device).
    pub shake_magnitude: f32,
}
