use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::TransportError;

/// Default RFCOMM channel used by the bag firmware.
pub const DEFAULT_RFCOMM_CHANNEL: u8 = 1;

/// A six-octet Bluetooth device address in transmission order
/// (`AA:BB:CC:DD:EE:FF`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceAddr([u8; 6]);

impl DeviceAddr {
    /// Construct from raw octets in display order.
    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    /// The raw octets in display order.
    pub const fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl fmt::Display for DeviceAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

impl FromStr for DeviceAddr {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| TransportError::InvalidEndpoint {
            spec: s.to_string(),
            reason: reason.to_string(),
        };

        let mut octets = [0u8; 6];
        let mut parts = s.split(':');
        for octet in &mut octets {
            let part = parts
                .next()
                .ok_or_else(|| invalid("expected six ':'-separated octets"))?;
            if part.len() != 2 {
                return Err(invalid("each octet must be two hex digits"));
            }
            *octet = u8::from_str_radix(part, 16)
                .map_err(|_| invalid("each octet must be two hex digits"))?;
        }
        if parts.next().is_some() {
            return Err(invalid("expected six ':'-separated octets"));
        }
        Ok(Self(octets))
    }
}

/// The address of the one remote endpoint a session talks to.
///
/// Supplied by the external endpoint provider; the transport performs no
/// discovery of its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointDescriptor {
    /// Bluetooth RFCOMM serial channel to the bag microcontroller.
    Rfcomm { addr: DeviceAddr, channel: u8 },
    /// Unix-domain-socket loopback endpoint (device simulator, tests).
    Local { path: PathBuf },
}

impl fmt::Display for EndpointDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rfcomm { addr, channel } => write!(f, "rfcomm:{addr}:{channel}"),
            Self::Local { path } => write!(f, "local:{}", path.display()),
        }
    }
}

/// Length of a textual bluetooth address (`AA:BB:CC:DD:EE:FF`).
const ADDR_LEN: usize = 17;

impl FromStr for EndpointDescriptor {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| TransportError::InvalidEndpoint {
            spec: s.to_string(),
            reason: reason.to_string(),
        };

        if let Some(rest) = s.strip_prefix("local:") {
            if rest.is_empty() {
                return Err(invalid("missing socket path"));
            }
            return Ok(Self::Local {
                path: PathBuf::from(rest),
            });
        }

        if let Some(rest) = s.strip_prefix("rfcomm:") {
            if !rest.is_ascii() || rest.len() < ADDR_LEN {
                return Err(invalid("expected rfcomm:AA:BB:CC:DD:EE:FF[:channel]"));
            }
            let addr: DeviceAddr = rest[..ADDR_LEN].parse()?;
            let channel = match &rest[ADDR_LEN..] {
                "" => DEFAULT_RFCOMM_CHANNEL,
                suffix => suffix
                    .strip_prefix(':')
                    .and_then(|ch| ch.parse::<u8>().ok())
                    .filter(|ch| *ch >= 1)
                    .ok_or_else(|| invalid("channel must be an integer in 1..=30"))?,
            };
            return Ok(Self::Rfcomm { addr, channel });
        }

        Err(invalid("expected 'rfcomm:' or 'local:' prefix"))
    }
}
