use std::fmt;
use std::io::Write;
use std::str::FromStr;

use serde::Serialize;
use tracing::{info, warn};

/// Prefix of an inbound identity frame.
pub const ID_PREFIX: &str = "ID:";
/// Prefix of the outbound identity acknowledgement.
pub const ACK_PREFIX: &str = "ID_OK:";
/// Fixed prefix of every bag identity.
pub const BAG_ID_PREFIX: &str = "SB";
/// Number of digits following the prefix.
pub const BAG_ID_DIGITS: usize = 6;

/// A verified bag identity: `SB` followed by exactly six ASCII digits.
///
/// Created on a valid identity frame, held for the duration of the
/// connection, destroyed on disconnect. Never persisted beyond a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct BagId(String);

impl BagId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An identity payload that does not match the required shape.
#[derive(Debug, thiserror::Error)]
#[error("bag id must be 'SB' followed by six digits, got '{0}'")]
pub struct InvalidBagId(String);

impl FromStr for BagId {
    type Err = InvalidBagId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.strip_prefix(BAG_ID_PREFIX) {
            Some(digits)
                if digits.len() == BAG_ID_DIGITS
                    && digits.bytes().all(|b| b.is_ascii_digit()) =>
            {
                Ok(Self(s.to_string()))
            }
            _ => Err(InvalidBagId(s.to_string())),
        }
    }
}

/// Authentication state of one connection.
///
/// Exactly one bag identity is active per physical connection; the state
/// resets to `Unauthenticated` whenever the link disconnects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    PendingVerification(String),
    Authenticated(BagId),
    Rejected(String),
}

impl Default for AuthState {
    fn default() -> Self {
        Self::Unauthenticated
    }
}

/// Result of processing one identity frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeOutcome {
    Accepted(BagId),
    Rejected { reason: String },
}

/// The per-connection identity handshake.
///
/// Rides on top of the link: an identity frame is validated and, when
/// well-formed, acknowledged with `ID_OK:<bag_id>` before the device's
/// telemetry is treated as attributable. A malformed identity is reported
/// and the link stays open; the next identity frame may still succeed.
#[derive(Debug, Default)]
pub struct Handshake {
    state: AuthState,
}

impl Handshake {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cheap routing check applied to every frame before either parser runs.
    pub fn matches(line: &str) -> bool {
        line.starts_with(ID_PREFIX)
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    /// The verified identity, if any.
    pub fn bag_id(&self) -> Option<&BagId> {
        match &self.state {
            AuthState::Authenticated(id) => Some(id),
            _ => None,
        }
    }

    /// Process one identity frame and acknowledge it on `link` if valid.
    ///
    /// A valid frame while already authenticated re-runs the exchange and
    /// replaces the active identity. Only the acknowledgement write can
    /// fail; rejection is an outcome, not an error.
    pub fn process<W: Write>(
        &mut self,
        line: &str,
        link: &mut W,
    ) -> std::io::Result<HandshakeOutcome> {
        let payload = line.strip_prefix(ID_PREFIX).unwrap_or(line);
        self.state = AuthState::PendingVerification(payload.to_string());

        match payload.parse::<BagId>() {
            Ok(bag_id) => {
                link.write_all(format!("{ACK_PREFIX}{bag_id}").as_bytes())?;
                link.flush()?;
                info!(%bag_id, "bag identity verified");
                self.state = AuthState::Authenticated(bag_id.clone());
                Ok(HandshakeOutcome::Accepted(bag_id))
            }
            Err(err) => {
                warn!(payload, "rejecting malformed bag identity");
                let reason = err.to_string();
                self.state = AuthState::Rejected(reason.clone());
                Ok(HandshakeOutcome::Rejected { reason })
            }
        }
    }

    /// Back to `Unauthenticated` (link disconnect).
    pub fn reset(&mut self) {
        self.state = AuthState::Unauthenticated;
    }
}
