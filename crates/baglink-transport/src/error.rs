use std::path::PathBuf;

/// Errors that can occur on the physical link.
///
/// Every variant is terminal for the current stream: the caller must open a
/// fresh connection, never retry the same handle.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The OS denied access to the endpoint (missing bluetooth capability,
    /// socket permissions).
    #[error("permission denied opening {endpoint}")]
    PermissionDenied { endpoint: String },

    /// The remote endpoint is unreachable, powered off or refusing.
    #[error("endpoint {endpoint} unavailable: {source}")]
    EndpointUnavailable {
        endpoint: String,
        source: std::io::Error,
    },

    /// Failed to bind a local loopback endpoint.
    #[error("failed to bind to {path}: {source}")]
    Bind {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to accept an incoming loopback connection.
    #[error("failed to accept connection: {0}")]
    Accept(std::io::Error),

    /// An I/O error occurred on an established stream.
    #[error("link I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The loopback socket path is too long for the platform.
    #[error("socket path too long ({len} bytes, max {max}): {path}")]
    PathTooLong {
        path: PathBuf,
        len: usize,
        max: usize,
    },

    /// An endpoint descriptor string could not be parsed.
    #[error("invalid endpoint '{spec}': {reason}")]
    InvalidEndpoint { spec: String, reason: String },
}

pub type Result<T> = std::result::Result<T, TransportError>;
