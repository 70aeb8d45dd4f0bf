use crate::error::{Result, TelemetryError};
use crate::snapshot::{SensorReading, TelemetrySnapshot, MAX_ACTIVE_FUNCTIONS};

/// Wire sentinel for a failed physical sensor reading.
pub const SENSOR_FAULT_SENTINEL: &str = "er";

const FIELD_COUNT: usize = 6;

/// Parse one telemetry frame: `battery,tempHot,tempCold,closed,state,overload`.
///
/// Numeric parsing is locale-independent by construction (`str::parse`, fixed
/// decimal point). Out-of-range battery values are clamped, not rejected.
/// Everything else fails the whole frame.
pub fn parse(frame: &str) -> Result<TelemetrySnapshot> {
    if !frame.is_ascii() {
        return Err(TelemetryError::NotAscii);
    }

    let fields: Vec<&str> = frame.split(',').collect();
    if fields.len() != FIELD_COUNT {
        return Err(TelemetryError::FieldCount { got: fields.len() });
    }

    let battery_percent = fields[0]
        .trim()
        .parse::<i64>()
        .map(|v| v.clamp(0, 100) as u8)
        .map_err(|_| invalid("battery", fields[0]))?;

    let hot_temp_c = parse_temperature("tempHot", fields[1])?;
    let cold_temp_c = parse_temperature("tempCold", fields[2])?;

    let lock_closed = match fields[3].trim() {
        "0" => false,
        "1" => true,
        other => return Err(invalid("closed", other)),
    };

    let active_functions = fields[4]
        .trim()
        .parse::<u8>()
        .ok()
        .filter(|v| *v <= MAX_ACTIVE_FUNCTIONS)
        .ok_or_else(|| invalid("state", fields[4]))?;

    let shake_magnitude = fields[5]
        .trim()
        .parse::<f32>()
        .map_err(|_| invalid("overload", fields[5]))?;

    Ok(TelemetrySnapshot {
        battery_percent,
        hot_temp_c,
        cold_temp_c,
        lock_closed,
        active_functions,
        shake_magnitude,
    })
}

fn parse_temperature(field: &'static str, raw: &str) -> Result<SensorReading> {
    let trimmed = raw.trim();
    if trimmed == SENSOR_FAULT_SENTINEL {
        return Ok(SensorReading::Fault);
    }
    trimmed
        .parse::<f32>()
        .map(SensorReading::Value)
        .map_err(|_| invalid(field, raw))
}

fn invalid(field: &'static str, value: &str) -> TelemetryError {
    TelemetryError::InvalidField {
        field,
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nominal_frame() {
        let snap = parse("85,24.50,15.10,0,1,0.12").unwrap();
        assert_eq!(
            snap,
            TelemetrySnapshot {
                battery_percent: 85,
                hot_temp_c: SensorReading::Value(24.50),
                cold_temp_c: SensorReading::Value(15.10),
                lock_closed: false,
                active_functions: 1,
                shake_magnitude: 0.12,
            }
        );
    }

    #[test]
    fn parse_is_deterministic() {
        let frame = "40,er,15.10,1,0,3.0";
        assert_eq!(parse(frame).unwrap(), parse(frame).unwrap());
    }

    #[test]
    fn sensor_fault_sentinel_is_a_value_not_an_error() {
        let snap = parse("40,er,15.10,1,0,3.0").unwrap();
        assert!(snap.hot_temp_c.is_fault());
        assert_eq!(snap.cold_temp_c, SensorReading::Value(15.10));
        assert!(snap.lock_closed);

        let both = parse("40,er,er,1,0,0.0").unwrap();
        assert!(both.hot_temp_c.is_fault());
        assert!(both.cold_temp_c.is_fault());
    }

    #[test]
    fn battery_clamps_instead_of_rejecting() {
        assert_eq!(parse("-5,20.0,10.0,0,0,0.0").unwrap().battery_percent, 0);
        assert_eq!(parse("150,20.0,10.0,0,0,0.0").unwrap().battery_percent, 100);
        assert_eq!(parse("0,20.0,10.0,0,0,0.0").unwrap().battery_percent, 0);
        assert_eq!(parse("100,20.0,10.0,0,0,0.0").unwrap().battery_percent, 100);
    }

    #[test]
    fn rejects_wrong_field_count() {
        assert!(matches!(
            parse("85,24.50,15.10,0,1"),
            Err(TelemetryError::FieldCount { got: 5 })
        ));
        assert!(matches!(
            parse("85,24.50,15.10,0,1,0.12,7"),
            Err(TelemetryError::FieldCount { got: 7 })
        ));
        assert!(matches!(parse(""), Err(TelemetryError::FieldCount { got: 1 })));
    }

    #[test]
    fn rejects_non_binary_closed_flag() {
        let err = parse("85,24.50,15.10,2,1,0.12").unwrap_err();
        assert!(matches!(
            err,
            TelemetryError::InvalidField { field: "closed", .. }
        ));
    }

    #[test]
    fn rejects_out_of_range_state() {
        let err = parse("85,24.50,15.10,0,4,0.12").unwrap_err();
        assert!(matches!(
            err,
            TelemetryError::InvalidField { field: "state", .. }
        ));
    }

    #[test]
    fn rejects_garbled_numeric_field() {
        let err = parse("85,2x.50,15.10,0,1,0.12").unwrap_err();
        assert!(matches!(
            err,
            TelemetryError::InvalidField { field: "tempHot", .. }
        ));
    }

    #[test]
    fn sentinel_only_valid_for_temperatures() {
        assert!(parse("er,24.50,15.10,0,1,0.12").is_err());
        assert!(parse("85,24.50,15.10,0,1,er").is_err());
    }

    #[test]
    fn accepts_negative_and_large_shake() {
        assert_eq!(
            parse("85,24.50,15.10,0,1,-3.75").unwrap().shake_magnitude,
            -3.75
        );
        assert_eq!(
            parse("85,24.50,15.10,0,1,120.0").unwrap().shake_magnitude,
            120.0
        );
    }

    #[test]
    fn rejects_non_ascii_frame() {
        assert!(matches!(
            parse("85,24°5,15.10,0,1,0.12"),
            Err(TelemetryError::NotAscii)
        ));
    }
}
