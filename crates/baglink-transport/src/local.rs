use std::os::unix::fs::{FileTypeExt, PermissionsExt};
use std::os::unix::net::UnixListener;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::link::LinkStream;

/// Loopback listener backing `EndpointDescriptor::Local`.
///
/// Serves the device-simulator side of a local endpoint over a Unix domain
/// socket. The socket file is removed again on drop.
pub struct LocalEndpoint {
    listener: UnixListener,
    path: PathBuf,
}

impl LocalEndpoint {
    /// Permission mode for created socket paths.
    pub const SOCKET_MODE: u32 = 0o600;
    /// Maximum socket path length.
    /// Unix `sockaddr_un.sun_path` is typically 108 bytes on Linux, 104 on macOS.
    #[cfg(target_os = "linux")]
    const MAX_PATH_LEN: usize = 108;
    #[cfg(not(target_os = "linux"))]
    const MAX_PATH_LEN: usize = 104;

    /// Bind and listen on a filesystem-path socket.
    ///
    /// If the path already exists and is a socket, it is removed first
    /// (stale socket cleanup). An existing non-socket file is never removed.
    pub fn bind(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let path_bytes = path.as_os_str().len();
        if path_bytes >= Self::MAX_PATH_LEN {
            return Err(TransportError::PathTooLong {
                path,
                len: path_bytes,
                max: Self::MAX_PATH_LEN,
            });
        }

        if path.exists() {
            let metadata = std::fs::symlink_metadata(&path).map_err(|e| TransportError::Bind {
                path: path.clone(),
                source: e,
            })?;
            if metadata.file_type().is_socket() {
                debug!(?path, "removing stale socket");
                std::fs::remove_file(&path).map_err(|e| TransportError::Bind {
                    path: path.clone(),
                    source: e,
                })?;
            } else {
                return Err(TransportError::Bind {
                    path: path.clone(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::AlreadyExists,
                        "existing path is not a unix socket",
                    ),
                });
            }
        }

        let listener = UnixListener::bind(&path).map_err(|e| TransportError::Bind {
            path: path.clone(),
            source: e,
        })?;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(Self::SOCKET_MODE))
            .map_err(|e| TransportError::Bind {
                path: path.clone(),
                source: e,
            })?;

        info!(?path, "listening on loopback endpoint");
        Ok(Self { listener, path })
    }

    /// Accept an incoming connection (blocking).
    pub fn accept(&self) -> Result<LinkStream> {
        let (stream, _addr) = self.listener.accept().map_err(TransportError::Accept)?;
        debug!("accepted loopback connection");
        Ok(LinkStream::from_unix(stream))
    }

    /// The path this endpoint is bound to.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LocalEndpoint {
    fn drop(&mut self) {
        if let Ok(metadata) = std::fs::symlink_metadata(&self.path) {
            if metadata.file_type().is_socket() {
                debug!(path = ?self.path, "cleaning up socket file");
                let _ = std::fs::remove_file(&self.path);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};

    fn temp_sock(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("baglink-{tag}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir.join("bag.sock")
    }

    #[test]
    fn bind_accept_connect() {
        let sock_path = temp_sock("local");
        let listener = LocalEndpoint::bind(&sock_path).unwrap();
        assert!(sock_path.exists());

        let endpoint = crate::EndpointDescriptor::Local {
            path: sock_path.clone(),
        };
        let handle = std::thread::spawn(move || {
            let mut client = LinkStream::connect(&endpoint).unwrap();
            client.write_all(b"hello").unwrap();
        });

        let mut server = listener.accept().unwrap();
        let mut buf = [0u8; 5];
        server.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"hello");

        handle.join().unwrap();

        drop(listener);
        assert!(
            !sock_path.exists(),
            "socket file should be cleaned up on drop"
        );
        let _ = std::fs::remove_dir_all(sock_path.parent().unwrap());
    }

    #[test]
    fn path_too_long() {
        let long_path = "/tmp/".to_string() + &"a".repeat(200) + ".sock";
        let result = LocalEndpoint::bind(&long_path);
        assert!(matches!(result, Err(TransportError::PathTooLong { .. })));
    }

    #[test]
    fn bind_rejects_existing_non_socket_file() {
        let sock_path = temp_sock("bind-file");
        std::fs::write(&sock_path, b"regular-file").unwrap();

        let result = LocalEndpoint::bind(&sock_path);
        assert!(matches!(result, Err(TransportError::Bind { .. })));

        let _ = std::fs::remove_dir_all(sock_path.parent().unwrap());
    }

    #[test]
    fn bind_replaces_stale_socket() {
        let sock_path = temp_sock("stale");
        let first = LocalEndpoint::bind(&sock_path).unwrap();
        // Simulate a crashed process leaving the file behind.
        std::mem::forget(first);

        let second = LocalEndpoint::bind(&sock_path).unwrap();
        assert_eq!(second.path(), sock_path.as_path());

        drop(second);
        let _ = std::fs::remove_dir_all(sock_path.parent().unwrap());
    }

    #[test]
    fn bind_permissions_hardened() {
        let sock_path = temp_sock("perms");
        let listener = LocalEndpoint::bind(&sock_path).unwrap();
        let mode = std::fs::metadata(&sock_path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);

        drop(listener);
        let _ = std::fs::remove_dir_all(sock_path.parent().unwrap());
    }
}
