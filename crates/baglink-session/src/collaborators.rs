//! External collaborator interfaces.
//!
//! The session consumes these as constructor-injected instances with caller
//! owned lifetimes; it never manages or assumes process-wide singletons.
//! Radio permission and availability checks also belong to the application:
//! the session assumes it is only invoked once the transport is usable.

use serde::Serialize;

/// A position fix from whatever location machinery the application runs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoFix {
    pub latitude: f64,
    pub longitude: f64,
    /// Estimated horizontal accuracy in meters.
    pub accuracy_m: f32,
}

/// Supplies the current position on demand.
///
/// The session treats this as an opaque accessor; acquiring fixes is the
/// application's business.
pub trait LocationSource: Send + Sync {
    fn current_fix(&self) -> Option<GeoFix>;
}

/// Receives notable session messages for persistent logging.
///
/// Called fire-and-forget from the session's read loop: implementations must
/// return promptly and failures are the implementation's to swallow.
pub trait EventSink: Send + Sync {
    fn record(&self, message: &str, fix: Option<GeoFix>);
}
