//! Severity-band classification.
//!
//! Each metric is banded independently; an alert fires only when a value
//! crosses a band boundary relative to the immediately preceding snapshot,
//! so a steady-state condition is reported once, not on every sample.

use std::fmt;

use serde::Serialize;

use crate::snapshot::{SensorReading, TelemetrySnapshot};

/// Hot compartment thresholds (°C); alert as the compartment overheats.
pub const HOT_NOTICE_C: f32 = 40.0;
pub const HOT_WARNING_C: f32 = 50.0;
pub const HOT_CRITICAL_C: f32 = 60.0;

/// Cold compartment thresholds (°C); alert as the compartment overcools
/// toward freezing the contents.
pub const COLD_NOTICE_C: f32 = 15.0;
pub const COLD_WARNING_C: f32 = 10.0;
pub const COLD_CRITICAL_C: f32 = 5.0;

/// Shake magnitude thresholds (signed symmetric).
pub const SHAKE_NOTICE: f32 = 0.5;
pub const SHAKE_WARNING: f32 = 1.0;
pub const SHAKE_CRITICAL: f32 = 2.5;

/// Battery charge thresholds (%).
pub const BATTERY_NOTICE_PCT: u8 = 30;
pub const BATTERY_WARNING_PCT: u8 = 15;
pub const BATTERY_CRITICAL_PCT: u8 = 5;

/// Severity band of one metric.
///
/// `Fault` is reachable only for the temperature metrics (failed sensor).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Band {
    Normal,
    Notice,
    Warning,
    Critical,
    Fault,
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Band::Normal => "normal",
            Band::Notice => "notice",
            Band::Warning => "warning",
            Band::Critical => "critical",
            Band::Fault => "fault",
        })
    }
}

/// The classified metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Battery,
    HotTemperature,
    ColdTemperature,
    Shake,
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Metric::Battery => "battery",
            Metric::HotTemperature => "hot compartment temperature",
            Metric::ColdTemperature => "cold compartment temperature",
            Metric::Shake => "shake",
        })
    }
}

/// One band crossing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AlertEvent {
    pub metric: Metric,
    pub band: Band,
    pub previous: Band,
}

impl AlertEvent {
    /// Human-readable message for log sinks and the CLI.
    pub fn message(&self) -> String {
        match (self.band, self.previous) {
            (Band::Fault, _) => format!("{} sensor fault", self.metric),
            (_, Band::Fault) => format!("{} sensor recovered ({})", self.metric, self.band),
            _ => format!("{} {} (was {})", self.metric, self.band, self.previous),
        }
    }
}

/// Band of the hot compartment reading.
pub fn hot_temp_band(reading: SensorReading) -> Band {
    match reading {
        SensorReading::Fault => Band::Fault,
        SensorReading::Value(v) if v >= HOT_CRITICAL_C => Band::Critical,
        SensorReading::Value(v) if v >= HOT_WARNING_C => Band::Warning,
        SensorReading::Value(v) if v >= HOT_NOTICE_C => Band::Notice,
        SensorReading::Value(_) => Band::Normal,
    }
}

/// Band of the cold compartment reading (descending scale).
pub fn cold_temp_band(reading: SensorReading) -> Band {
    match reading {
        SensorReading::Fault => Band::Fault,
        SensorReading::Value(v) if v <= COLD_CRITICAL_C => Band::Critical,
        SensorReading::Value(v) if v <= COLD_WARNING_C => Band::Warning,
        SensorReading::Value(v) if v <= COLD_NOTICE_C => Band::Notice,
        SensorReading::Value(_) => Band::Normal,
    }
}

/// Band of the shake magnitude; sign is ignored.
pub fn shake_band(magnitude: f32) -> Band {
    let m = magnitude.abs();
    if m >= SHAKE_CRITICAL {
        Band::Critical
    } else if m >= SHAKE_WARNING {
        Band::Warning
    } else if m >= SHAKE_NOTICE {
        Band::Notice
    } else {
        Band::Normal
    }
}

/// Band of the battery charge.
pub fn battery_band(percent: u8) -> Band {
    if percent <= BATTERY_CRITICAL_PCT {
        Band::Critical
    } else if percent <= BATTERY_WARNING_PCT {
        Band::Warning
    } else if percent <= BATTERY_NOTICE_PCT {
        Band::Notice
    } else {
        Band::Normal
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MetricBands {
    battery: Band,
    hot: Band,
    cold: Band,
    shake: Band,
}

impl Default for MetricBands {
    fn default() -> Self {
        Self {
            battery: Band::Normal,
            hot: Band::Normal,
            cold: Band::Normal,
            shake: Band::Normal,
        }
    }
}

fn bands_of(snapshot: &TelemetrySnapshot) -> MetricBands {
    MetricBands {
        battery: battery_band(snapshot.battery_percent),
        hot: hot_temp_band(snapshot.hot_temp_c),
        cold: cold_temp_band(snapshot.cold_temp_c),
        shake: shake_band(snapshot.shake_magnitude),
    }
}

/// Pure crossing detection.
///
/// With no previous snapshot the baseline is all-`Normal`, so a first sample
/// already outside its lowest band alerts immediately.
pub fn classify(
    current: &TelemetrySnapshot,
    previous: Option<&TelemetrySnapshot>,
) -> Vec<AlertEvent> {
    let baseline = previous.map(bands_of).unwrap_or_default();
    let now = bands_of(current);

    let mut events = Vec::new();
    let mut push = |metric: Metric, band: Band, previous: Band| {
        if band != previous {
            events.push(AlertEvent {
                metric,
                band,
                previous,
            });
        }
    };

    push(Metric::Battery, now.battery, baseline.battery);
    push(Metric::HotTemperature, now.hot, baseline.hot);
    push(Metric::ColdTemperature, now.cold, baseline.cold);
    push(Metric::Shake, now.shake, baseline.shake);
    events
}

/// Retains the last snapshot of a session for crossing detection.
#[derive(Debug, Default)]
pub struct Classifier {
    previous: Option<TelemetrySnapshot>,
}

impl Classifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify a snapshot against the previous one and retain it.
    pub fn observe(&mut self, snapshot: TelemetrySnapshot) -> Vec<AlertEvent> {
        let events = classify(&snapshot, self.previous.as_ref());
        self.previous = Some(snapshot);
        events
    }

    /// Forget the previous snapshot (session teardown).
    pub fn reset(&mut self) {
        self.previous = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse;

    #[test]
    fn nominal_frame_emits_no_alerts() {
        let snap = parse("85,24.50,15.10,0,1,0.12").unwrap();
        assert!(classify(&snap, None).is_empty());
    }

    #[test]
    fn extreme_shake_and_sensor_fault_alert_without_previous() {
        let snap = parse("40,er,15.10,1,0,3.0").unwrap();
        let events = classify(&snap, None);

        assert_eq!(events.len(), 2);
        assert!(events.contains(&AlertEvent {
            metric: Metric::HotTemperature,
            band: Band::Fault,
            previous: Band::Normal,
        }));
        assert!(events.contains(&AlertEvent {
            metric: Metric::Shake,
            band: Band::Critical,
            previous: Band::Normal,
        }));
    }

    #[test]
    fn steady_state_is_reported_once() {
        let mut classifier = Classifier::new();
        let snap = parse("85,45.00,15.10,0,1,0.12").unwrap();

        let first = classifier.observe(snap);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].metric, Metric::HotTemperature);
        assert_eq!(first[0].band, Band::Notice);

        // Same band next sample: nothing new.
        assert!(classifier.observe(snap).is_empty());
    }

    #[test]
    fn leaving_a_band_alerts_too() {
        let mut classifier = Classifier::new();
        classifier.observe(parse("85,55.00,15.10,0,1,0.0").unwrap());
        let events = classifier.observe(parse("85,24.50,15.10,0,1,0.0").unwrap());

        assert_eq!(
            events,
            vec![AlertEvent {
                metric: Metric::HotTemperature,
                band: Band::Normal,
                previous: Band::Warning,
            }]
        );
    }

    #[test]
    fn sensor_recovery_is_a_crossing() {
        let mut classifier = Classifier::new();
        classifier.observe(parse("85,er,15.10,0,1,0.0").unwrap());
        let events = classifier.observe(parse("85,24.50,15.10,0,1,0.0").unwrap());

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].previous, Band::Fault);
        assert_eq!(events[0].band, Band::Normal);
        assert!(events[0].message().contains("recovered"));
    }

    #[test]
    fn shake_is_signed_symmetric() {
        assert_eq!(shake_band(-3.0), Band::Critical);
        assert_eq!(shake_band(3.0), Band::Critical);
        assert_eq!(shake_band(-0.7), Band::Notice);
        assert_eq!(shake_band(0.12), Band::Normal);
    }

    #[test]
    fn battery_bands_descend() {
        assert_eq!(battery_band(100), Band::Normal);
        assert_eq!(battery_band(30), Band::Notice);
        assert_eq!(battery_band(15), Band::Warning);
        assert_eq!(battery_band(5), Band::Critical);
        assert_eq!(battery_band(0), Band::Critical);
    }

    #[test]
    fn cold_compartment_alerts_as_it_overcools() {
        assert_eq!(cold_temp_band(SensorReading::Value(15.10)), Band::Normal);
        assert_eq!(cold_temp_band(SensorReading::Value(12.0)), Band::Notice);
        assert_eq!(cold_temp_band(SensorReading::Value(8.0)), Band::Warning);
        assert_eq!(cold_temp_band(SensorReading::Value(2.0)), Band::Critical);
        assert_eq!(cold_temp_band(SensorReading::Fault), Band::Fault);
    }

    #[test]
    fn hot_compartment_bands_ascend() {
        assert_eq!(hot_temp_band(SensorReading::Value(24.5)), Band::Normal);
        assert_eq!(hot_temp_band(SensorReading::Value(40.0)), Band::Notice);
        assert_eq!(hot_temp_band(SensorReading::Value(50.0)), Band::Warning);
        assert_eq!(hot_temp_band(SensorReading::Value(75.0)), Band::Critical);
    }

    #[test]
    fn battery_drain_crosses_each_band_once() {
        let mut classifier = Classifier::new();
        let mut crossings = Vec::new();
        for pct in (0..=100).rev() {
            let frame = format!("{pct},24.50,15.10,0,1,0.0");
            crossings.extend(classifier.observe(parse(&frame).unwrap()));
        }
        let bands: Vec<Band> = crossings.iter().map(|e| e.band).collect();
        assert_eq!(bands, vec![Band::Notice, Band::Warning, Band::Critical]);
    }
}
