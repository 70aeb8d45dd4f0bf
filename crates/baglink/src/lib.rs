//! Smart-bag device communication subsystem.
//!
//! baglink monitors a physical container instrumented with a microcontroller
//! that streams sensor telemetry over a point-to-point wireless serial link
//! and accepts single-character actuator commands.
//!
//! # Crate Structure
//!
//! - [`transport`] — the physical link (RFCOMM + loopback)
//! - [`frame`] — newline-delimited frame codec and actuator commands
//! - [`telemetry`] — frame validation and severity-band classification
//! - [`session`] — connection sessions, identity handshake, event stream

/// Re-export transport types.
pub mod transport {
    pub use baglink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use baglink_frame::*;
}

/// Re-export telemetry types.
pub mod telemetry {
    pub use baglink_telemetry::*;
}

/// Re-export session types.
pub mod session {
    pub use baglink_session::*;
}
