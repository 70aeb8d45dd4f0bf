/// Errors from telemetry frame validation.
///
/// Always whole-frame: a failing frame is dropped in its entirety and no
/// partial snapshot is ever produced.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The frame did not have exactly six comma-separated fields.
    #[error("expected 6 fields, got {got}")]
    FieldCount { got: usize },

    /// A field failed to parse as its expected type.
    #[error("unparseable {field} field: '{value}'")]
    InvalidField { field: &'static str, value: String },

    /// The frame contained non-ASCII bytes.
    #[error("frame is not ASCII")]
    NotAscii,
}

pub type Result<T> = std::result::Result<T, TelemetryError>;
