/// Errors that can occur while reading frames from a link.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// An I/O error occurred while reading from the link.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The link was closed by the remote end.
    ///
    /// Any buffered partial frame is discarded, never surfaced.
    #[error("link closed")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
