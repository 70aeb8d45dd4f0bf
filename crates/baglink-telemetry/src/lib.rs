//! Telemetry frame validation and classification.
//!
//! Turns one raw wire frame (`battery,tempHot,tempCold,closed,state,overload`)
//! into a typed [`TelemetrySnapshot`] (whole or not at all) and derives
//! [`AlertEvent`]s from severity-band crossings between consecutive
//! snapshots.

pub mod classify;
pub mod error;
pub mod parse;
pub mod snapshot;

pub use classify::{
    battery_band, classify, cold_temp_band, hot_temp_band, shake_band, AlertEvent, Band,
    Classifier, Metric,
};
pub use error::{Result, TelemetryError};
pub use parse::{parse, SENSOR_FAULT_SENTINEL};
pub use snapshot::{SensorReading, TelemetrySnapshot, MAX_ACTIVE_FUNCTIONS};
