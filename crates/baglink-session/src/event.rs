use std::fmt;

use serde::Serialize;

use baglink_telemetry::{AlertEvent, TelemetrySnapshot};

use crate::handshake::BagId;

/// Why the link went away.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DisconnectReason {
    /// The remote end closed the connection (EOF).
    RemoteClosed,
    /// A read or write on the link failed.
    Io(String),
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RemoteClosed => f.write_str("remote closed the link"),
            Self::Io(detail) => write!(f, "link I/O failure: {detail}"),
        }
    }
}

/// One entry of the session's ordered outward stream.
///
/// Events are delivered in the exact order frames were decoded from the byte
/// stream. Failures (malformed frames, rejected identities, lost links) are
/// events on the same channel as successes; nothing panics across the read
/// loop boundary.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A validated telemetry snapshot.
    Telemetry { snapshot: TelemetrySnapshot },
    /// A severity-band crossing derived from the latest snapshot.
    Alert { alert: AlertEvent },
    /// The device's identity was verified and acknowledged.
    Authenticated { bag_id: BagId },
    /// An identity frame was malformed; the link stays open.
    AuthRejected { reason: String },
    /// A frame failed validation and was dropped; the loop continues.
    FrameRejected { reason: String },
    /// The link is gone; authentication has been reset.
    Disconnected { reason: DisconnectReason },
}
