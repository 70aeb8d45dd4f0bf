/// Errors that can occur in session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] baglink_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] baglink_frame::FrameError),

    /// The session is not in a state that accepts this operation.
    #[error("not connected")]
    NotConnected,

    /// A connect was requested while a session is already active.
    #[error("already connected")]
    AlreadyConnected,
}

pub type Result<T> = std::result::Result<T, SessionError>;
