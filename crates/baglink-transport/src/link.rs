use std::io::{Read, Write};
use std::time::Duration;

use tracing::debug;

use crate::endpoint::EndpointDescriptor;
use crate::error::{Result, TransportError};

/// A connected serial link to the remote endpoint — implements Read + Write.
///
/// This is the fundamental I/O type returned by transport operations.
/// The production variant wraps a Bluetooth RFCOMM socket; the loopback
/// variant wraps a Unix domain socket stream (device simulator, tests).
pub struct LinkStream {
    inner: LinkStreamInner,
}

enum LinkStreamInner {
    #[cfg(target_os = "linux")]
    Rfcomm(crate::rfcomm::RfcommStream),
    #[cfg(unix)]
    Unix(std::os::unix::net::UnixStream),
}

impl LinkStream {
    /// Open a blocking connection to the given endpoint.
    pub fn connect(endpoint: &EndpointDescriptor) -> Result<Self> {
        match endpoint {
            EndpointDescriptor::Rfcomm { addr, channel } => {
                #[cfg(target_os = "linux")]
                {
                    let stream = crate::rfcomm::RfcommStream::connect(*addr, *channel)?;
                    Ok(Self {
                        inner: LinkStreamInner::Rfcomm(stream),
                    })
                }
                #[cfg(not(target_os = "linux"))]
                {
                    let _ = (addr, channel);
                    Err(TransportError::EndpointUnavailable {
                        endpoint: endpoint.to_string(),
                        source: std::io::Error::new(
                            std::io::ErrorKind::Unsupported,
                            "RFCOMM endpoints require Linux (BlueZ)",
                        ),
                    })
                }
            }
            EndpointDescriptor::Local { path } => {
                #[cfg(unix)]
                {
                    let stream = std::os::unix::net::UnixStream::connect(path)
                        .map_err(|err| classify_local_error(endpoint.to_string(), err))?;
                    debug!(?path, "connected to loopback endpoint");
                    Ok(Self::from_unix(stream))
                }
                #[cfg(not(unix))]
                {
                    let _ = path;
                    Err(TransportError::EndpointUnavailable {
                        endpoint: endpoint.to_string(),
                        source: std::io::Error::new(
                            std::io::ErrorKind::Unsupported,
                            "loopback endpoints require Unix domain sockets",
                        ),
                    })
                }
            }
        }
    }

    /// Create a connected in-process pair (link double for tests and the
    /// simulator harness).
    #[cfg(unix)]
    pub fn pair() -> Result<(Self, Self)> {
        let (left, right) = std::os::unix::net::UnixStream::pair()?;
        Ok((Self::from_unix(left), Self::from_unix(right)))
    }

    /// Wrap an already-connected Unix stream.
    #[cfg(unix)]
    pub(crate) fn from_unix(stream: std::os::unix::net::UnixStream) -> Self {
        Self {
            inner: LinkStreamInner::Unix(stream),
        }
    }

    /// Clone this stream (both handles refer to the same connection).
    pub fn try_clone(&self) -> Result<Self> {
        match &self.inner {
            #[cfg(target_os = "linux")]
            LinkStreamInner::Rfcomm(stream) => Ok(Self {
                inner: LinkStreamInner::Rfcomm(stream.try_clone()?),
            }),
            #[cfg(unix)]
            LinkStreamInner::Unix(stream) => Ok(Self {
                inner: LinkStreamInner::Unix(stream.try_clone()?),
            }),
        }
    }

    /// Set read timeout on the underlying stream.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            #[cfg(target_os = "linux")]
            LinkStreamInner::Rfcomm(stream) => stream.set_read_timeout(timeout),
            #[cfg(unix)]
            LinkStreamInner::Unix(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
        }
    }

    /// Set write timeout on the underlying stream.
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            #[cfg(target_os = "linux")]
            LinkStreamInner::Rfcomm(stream) => stream.set_write_timeout(timeout),
            #[cfg(unix)]
            LinkStreamInner::Unix(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
        }
    }

    /// Shut down both directions.
    ///
    /// Any thread blocked in `read` on a clone of this stream observes EOF.
    pub fn shutdown(&self) -> Result<()> {
        match &self.inner {
            #[cfg(target_os = "linux")]
            LinkStreamInner::Rfcomm(stream) => stream.shutdown(),
            #[cfg(unix)]
            LinkStreamInner::Unix(stream) => match stream.shutdown(std::net::Shutdown::Both) {
                Ok(()) => Ok(()),
                Err(err) if err.kind() == std::io::ErrorKind::NotConnected => Ok(()),
                Err(err) => Err(err.into()),
            },
        }
    }
}

impl Read for LinkStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            #[cfg(target_os = "linux")]
            LinkStreamInner::Rfcomm(stream) => stream.read(buf),
            #[cfg(unix)]
            LinkStreamInner::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for LinkStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            #[cfg(target_os = "linux")]
            LinkStreamInner::Rfcomm(stream) => stream.write(buf),
            #[cfg(unix)]
            LinkStreamInner::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            #[cfg(target_os = "linux")]
            LinkStreamInner::Rfcomm(stream) => stream.flush(),
            #[cfg(unix)]
            LinkStreamInner::Unix(stream) => stream.flush(),
        }
    }
}

#[cfg(unix)]
fn classify_local_error(endpoint: String, err: std::io::Error) -> TransportError {
    match err.kind() {
        std::io::ErrorKind::PermissionDenied => TransportError::PermissionDenied { endpoint },
        std::io::ErrorKind::NotFound | std::io::ErrorKind::ConnectionRefused => {
            TransportError::EndpointUnavailable {
                endpoint,
                source: err,
            }
        }
        _ => TransportError::Io(err),
    }
}

impl std::fmt::Debug for LinkStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            #[cfg(target_os = "linux")]
            LinkStreamInner::Rfcomm(_) => f
                .debug_struct("LinkStream")
                .field("type", &"rfcomm")
                .finish(),
            #[cfg(unix)]
            LinkStreamInner::Unix(_) => {
                f.debug_struct("LinkStream").field("type", &"unix").finish()
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn pair_roundtrip() {
        let (mut left, mut right) = LinkStream::pair().unwrap();

        left.write_all(b"ping").unwrap();
        let mut buf = [0u8; 4];
        right.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"ping");
    }

    #[test]
    fn shutdown_unblocks_cloned_reader() {
        let (left, _right) = LinkStream::pair().unwrap();
        let mut reader = left.try_clone().unwrap();

        let handle = std::thread::spawn(move || {
            let mut buf = [0u8; 16];
            reader.read(&mut buf)
        });

        std::thread::sleep(std::time::Duration::from_millis(20));
        left.shutdown().unwrap();

        let read = handle.join().unwrap().unwrap();
        assert_eq!(read, 0, "reader should observe EOF after shutdown");
    }

    #[test]
    fn connect_unavailable_local_endpoint() {
        let endpoint = EndpointDescriptor::Local {
            path: std::path::PathBuf::from("/tmp/baglink-definitely-missing.sock"),
        };
        let err = LinkStream::connect(&endpoint).unwrap_err();
        assert!(matches!(err, TransportError::EndpointUnavailable { .. }));
    }

    #[test]
    fn double_shutdown_is_ok() {
        let (left, _right) = LinkStream::pair().unwrap();
        left.shutdown().unwrap();
        left.shutdown().unwrap();
    }
}
