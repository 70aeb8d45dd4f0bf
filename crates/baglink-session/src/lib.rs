//! Connection session management for the bag monitor.
//!
//! This is the "just works" layer: it drives one [`LinkStream`] through
//! connect, identity handshake and a background read loop, and publishes a
//! single ordered stream of [`SessionEvent`]s: telemetry snapshots, alert
//! crossings, authentication transitions and disconnects.
//!
//! [`LinkStream`]: baglink_transport::LinkStream

pub mod collaborators;
pub mod error;
pub mod event;
pub mod handshake;
pub mod session;

pub use collaborators::{EventSink, GeoFix, LocationSource};
pub use error::{Result, SessionError};
pub use event::{DisconnectReason, SessionEvent};
pub use handshake::{
    AuthState, BagId, Handshake, HandshakeOutcome, InvalidBagId, ACK_PREFIX, BAG_ID_DIGITS,
    BAG_ID_PREFIX, ID_PREFIX,
};
pub use session::{BagSession, SessionConfig, SessionState, SessionStats};
