use std::io::IsTerminal;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

use baglink_session::SessionEvent;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct EventRecord<'a> {
    timestamp: String,
    #[serde(flatten)]
    event: &'a SessionEvent,
}

pub fn print_event(event: &SessionEvent, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let record = EventRecord {
                timestamp: now_unix_seconds(),
                event,
            };
            println!(
                "{}",
                serde_json::to_string(&record).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["EVENT", "DETAIL"])
                .add_row(vec![event_kind(event).to_string(), event_detail(event)]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("{:<14} {}", event_kind(event), event_detail(event));
        }
    }
}

pub fn event_kind(event: &SessionEvent) -> &'static str {
    match event {
        SessionEvent::Telemetry { .. } => "telemetry",
        SessionEvent::Alert { .. } => "alert",
        SessionEvent::Authenticated { .. } => "authenticated",
        SessionEvent::AuthRejected { .. } => "auth-rejected",
        SessionEvent::FrameRejected { .. } => "frame-rejected",
        SessionEvent::Disconnected { .. } => "disconnected",
    }
}

pub fn event_detail(event: &SessionEvent) -> String {
    match event {
        SessionEvent::Telemetry { snapshot } => format!(
            "battery={}% hot={} cold={} closed={} active={} shake={:.2}",
            snapshot.battery_percent,
            snapshot.hot_temp_c,
            snapshot.cold_temp_c,
            snapshot.lock_closed,
            snapshot.active_functions,
            snapshot.shake_magnitude
        ),
        SessionEvent::Alert { alert } => alert.message(),
        SessionEvent::Authenticated { bag_id } => format!("bag {bag_id}"),
        SessionEvent::AuthRejected { reason } | SessionEvent::FrameRejected { reason } => {
            reason.clone()
        }
        SessionEvent::Disconnected { reason } => reason.to_string(),
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}

#[cfg(test)]
mod tests {
    use baglink_telemetry::parse;

    use super::*;

    #[test]
    fn telemetry_detail_renders_fault_readings() {
        let snapshot = parse("40,er,15.10,1,0,3.0").unwrap();
        let detail = event_detail(&SessionEvent::Telemetry { snapshot });
        assert_eq!(
            detail,
            "battery=40% hot=fault cold=15.10 closed=true active=0 shake=3.00"
        );
    }

    #[test]
    fn json_record_carries_event_tag() {
        let snapshot = parse("85,24.50,15.10,0,1,0.12").unwrap();
        let record = EventRecord {
            timestamp: "0".to_string(),
            event: &SessionEvent::Telemetry { snapshot },
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"event\":\"telemetry\""));
        assert!(json.contains("\"battery_percent\":85"));
    }
}
