use std::io::{Read, Write};
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::time::Duration;

use tracing::debug;

use crate::endpoint::DeviceAddr;
use crate::error::{Result, TransportError};

/// `BTPROTO_RFCOMM` from `<bluetooth/bluetooth.h>`; not exposed by libc.
const BTPROTO_RFCOMM: libc::c_int = 3;

/// `struct sockaddr_rc` from `<bluetooth/rfcomm.h>`.
///
/// `rc_bdaddr` is in wire order, i.e. the reverse of the textual
/// `AA:BB:CC:DD:EE:FF` octet order.
#[repr(C)]
struct SockaddrRc {
    rc_family: libc::sa_family_t,
    rc_bdaddr: [u8; 6],
    rc_channel: u8,
}

/// A connected RFCOMM serial stream to the bag microcontroller.
pub struct RfcommStream {
    fd: OwnedFd,
}

impl RfcommStream {
    /// Open a blocking RFCOMM connection.
    pub fn connect(addr: DeviceAddr, channel: u8) -> Result<Self> {
        let endpoint = format!("rfcomm:{addr}:{channel}");

        // SAFETY: plain socket(2) call with constant arguments.
        let raw = unsafe {
            libc::socket(
                libc::AF_BLUETOOTH,
                libc::SOCK_STREAM | libc::SOCK_CLOEXEC,
                BTPROTO_RFCOMM,
            )
        };
        if raw < 0 {
            return Err(classify_connect_error(
                endpoint,
                std::io::Error::last_os_error(),
            ));
        }
        // SAFETY: `raw` is a freshly created, open socket descriptor we own.
        let fd = unsafe { OwnedFd::from_raw_fd(raw) };

        let mut bdaddr = addr.octets();
        bdaddr.reverse();
        let sa = SockaddrRc {
            rc_family: libc::AF_BLUETOOTH as libc::sa_family_t,
            rc_bdaddr: bdaddr,
            rc_channel: channel,
        };

        // SAFETY: `sa` is a valid sockaddr_rc for the lifetime of the call and
        // the length argument matches its size.
        let rc = unsafe {
            libc::connect(
                fd.as_raw_fd(),
                std::ptr::addr_of!(sa).cast::<libc::sockaddr>(),
                std::mem::size_of::<SockaddrRc>() as libc::socklen_t,
            )
        };
        if rc != 0 {
            return Err(classify_connect_error(
                endpoint,
                std::io::Error::last_os_error(),
            ));
        }

        debug!(%addr, channel, "rfcomm connected");
        Ok(Self { fd })
    }

    /// Clone the stream (duplicates the file descriptor; both handles refer
    /// to the same underlying connection).
    pub fn try_clone(&self) -> Result<Self> {
        let fd = self.fd.try_clone().map_err(TransportError::Io)?;
        Ok(Self { fd })
    }

    /// Set the receive timeout (`None` blocks indefinitely).
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.set_timeout(libc::SO_RCVTIMEO, timeout)
    }

    /// Set the send timeout (`None` blocks indefinitely).
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.set_timeout(libc::SO_SNDTIMEO, timeout)
    }

    fn set_timeout(&self, opt: libc::c_int, timeout: Option<Duration>) -> Result<()> {
        let tv = match timeout {
            Some(d) if d.is_zero() => {
                return Err(TransportError::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "zero timeout; use None to block",
                )));
            }
            Some(d) => libc::timeval {
                tv_sec: d.as_secs() as libc::time_t,
                tv_usec: d.subsec_micros() as libc::suseconds_t,
            },
            None => libc::timeval {
                tv_sec: 0,
                tv_usec: 0,
            },
        };

        // SAFETY: `tv` is a valid timeval for the lifetime of the call and
        // the length argument matches its size.
        let rc = unsafe {
            libc::setsockopt(
                self.fd.as_raw_fd(),
                libc::SOL_SOCKET,
                opt,
                std::ptr::addr_of!(tv).cast::<libc::c_void>(),
                std::mem::size_of::<libc::timeval>() as libc::socklen_t,
            )
        };
        if rc != 0 {
            return Err(TransportError::Io(std::io::Error::last_os_error()));
        }
        Ok(())
    }

    /// Shut down both directions, waking any thread blocked in `read`.
    pub fn shutdown(&self) -> Result<()> {
        // SAFETY: shutdown(2) on an open socket descriptor owned by us.
        let rc = unsafe { libc::shutdown(self.fd.as_raw_fd(), libc::SHUT_RDWR) };
        if rc != 0 {
            let err = std::io::Error::last_os_error();
            // Already disconnected is fine.
            if err.kind() != std::io::ErrorKind::NotConnected {
                return Err(TransportError::Io(err));
            }
        }
        Ok(())
    }
}

impl Read for RfcommStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        // SAFETY: `buf` is valid and writable for `buf.len()` bytes.
        let n = unsafe {
            libc::read(
                self.fd.as_raw_fd(),
                buf.as_mut_ptr().cast::<libc::c_void>(),
                buf.len(),
            )
        };
        if n < 0 {
            Err(std::io::Error::last_os_error())
        } else {
            Ok(n as usize)
        }
    }
}

impl Write for RfcommStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        // SAFETY: `buf` is valid and readable for `buf.len()` bytes.
        let n = unsafe {
            libc::write(
                self.fd.as_raw_fd(),
                buf.as_ptr().cast::<libc::c_void>(),
                buf.len(),
            )
        };
        if n < 0 {
            Err(std::io::Error::last_os_error())
        } else {
            Ok(n as usize)
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        // Socket writes are not buffered in userspace.
        Ok(())
    }
}

/// Probe whether the kernel accepts RFCOMM sockets at all.
pub fn rfcomm_supported() -> bool {
    // SAFETY: plain socket(2)/close(2) calls with constant arguments.
    unsafe {
        let fd = libc::socket(
            libc::AF_BLUETOOTH,
            libc::SOCK_STREAM | libc::SOCK_CLOEXEC,
            BTPROTO_RFCOMM,
        );
        if fd >= 0 {
            libc::close(fd);
            true
        } else {
            false
        }
    }
}

fn classify_connect_error(endpoint: String, err: std::io::Error) -> TransportError {
    match err.raw_os_error() {
        Some(libc::EACCES) | Some(libc::EPERM) => TransportError::PermissionDenied { endpoint },
        Some(libc::ECONNREFUSED)
        | Some(libc::EHOSTDOWN)
        | Some(libc::EHOSTUNREACH)
        | Some(libc::ETIMEDOUT)
        | Some(libc::ENODEV)
        | Some(libc::EADDRNOTAVAIL) => TransportError::EndpointUnavailable {
            endpoint,
            source: err,
        },
        // EAFNOSUPPORT / EPROTONOSUPPORT: kernel without bluetooth.
        Some(libc::EAFNOSUPPORT) | Some(libc::EPROTONOSUPPORT) => {
            TransportError::EndpointUnavailable {
                endpoint,
                source: err,
            }
        }
        _ => TransportError::Io(err),
    }
}

impl std::fmt::Debug for RfcommStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RfcommStream")
            .field("fd", &self.fd.as_raw_fd())
            .finish()
    }
}
