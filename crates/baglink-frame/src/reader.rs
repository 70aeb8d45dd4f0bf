use std::collections::VecDeque;
use std::io::{ErrorKind, Read};

use bytes::Bytes;
use tracing::debug;

use crate::codec::LineDecoder;
use crate::error::{FrameError, Result};

const DEFAULT_READ_CHUNK_SIZE: usize = 1024;

/// Reads complete frames from any `Read` stream.
///
/// Handles partial reads internally — callers always get complete frames.
/// On EOF a buffered partial frame is dropped, never surfaced as a frame.
pub struct LineReader<T> {
    inner: T,
    decoder: LineDecoder,
    pending: VecDeque<Bytes>,
    chunk: Vec<u8>,
}

impl<T: Read> LineReader<T> {
    /// Create a new line reader with the default chunk size.
    pub fn new(inner: T) -> Self {
        Self::with_chunk_size(inner, DEFAULT_READ_CHUNK_SIZE)
    }

    /// Create a new line reader with an explicit read chunk size.
    pub fn with_chunk_size(inner: T, chunk_size: usize) -> Self {
        Self {
            inner,
            decoder: LineDecoder::new(),
            pending: VecDeque::new(),
            chunk: vec![0u8; chunk_size.max(1)],
        }
    }

    /// Read the next complete frame (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached.
    pub fn read_line(&mut self) -> Result<Bytes> {
        loop {
            if let Some(line) = self.pending.pop_front() {
                return Ok(line);
            }

            let read = match self.inner.read(&mut self.chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                let partial = self.decoder.carry_len();
                if partial > 0 {
                    debug!(partial, "link closed mid-frame; dropping partial bytes");
                    self.decoder.clear();
                }
                return Err(FrameError::ConnectionClosed);
            }

            self.pending.extend(self.decoder.push(&self.chunk[..read]));
        }
    }

    /// Bytes currently buffered as an incomplete frame.
    pub fn carry_len(&self) -> usize {
        self.decoder.carry_len()
    }

    /// Frames discarded as oversized line noise.
    pub fn discarded(&self) -> u64 {
        self.decoder.discarded()
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn read_single_frame() {
        let mut reader = LineReader::new(Cursor::new(b"85,24.50,15.10,0,1,0.12\n".to_vec()));
        let line = reader.read_line().unwrap();
        assert_eq!(line.as_ref(), b"85,24.50,15.10,0,1,0.12");
    }

    #[test]
    fn read_multiple_frames() {
        let wire = b"ID:SB000001\n85,24.50,15.10,0,1,0.12\n40,er,15.10,1,0,3.0\n";
        let mut reader = LineReader::new(Cursor::new(wire.to_vec()));

        assert_eq!(reader.read_line().unwrap().as_ref(), b"ID:SB000001");
        assert_eq!(
            reader.read_line().unwrap().as_ref(),
            b"85,24.50,15.10,0,1,0.12"
        );
        assert_eq!(reader.read_line().unwrap().as_ref(), b"40,er,15.10,1,0,3.0");
    }

    #[test]
    fn eof_after_frames() {
        let mut reader = LineReader::new(Cursor::new(b"ID:SB000001\n".to_vec()));
        reader.read_line().unwrap();
        let err = reader.read_line().unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn eof_mid_frame_drops_partial() {
        let mut reader = LineReader::new(Cursor::new(b"85,24.".to_vec()));
        let err = reader.read_line().unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
        assert_eq!(reader.carry_len(), 0);
    }

    #[test]
    fn partial_read_handling() {
        let wire = b"85,24.50,15.10,0,1,0.12\n".to_vec();
        let byte_reader = ByteByByteReader {
            bytes: wire,
            pos: 0,
        };
        let mut reader = LineReader::new(byte_reader);

        let line = reader.read_line().unwrap();
        assert_eq!(line.as_ref(), b"85,24.50,15.10,0,1,0.12");
    }

    #[test]
    fn interrupted_read_retries() {
        let reader = InterruptedThenData {
            state: 0,
            bytes: b"ID:SB000001\n".to_vec(),
            pos: 0,
        };
        let mut framed = LineReader::new(reader);
        assert_eq!(framed.read_line().unwrap().as_ref(), b"ID:SB000001");
    }

    #[test]
    fn roundtrip_over_pipe() {
        use std::io::Write;

        let (mut left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut reader = LineReader::new(right);

        left.write_all(b"90,21.00,4.90,1,2,-0.40\n").unwrap();
        let line = reader.read_line().unwrap();
        assert_eq!(line.as_ref(), b"90,21.00,4.90,1,2,-0.40");
    }

    #[derive(Debug)]
    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    struct InterruptedThenData {
        state: u8,
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for InterruptedThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.state == 0 {
                self.state = 1;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            if self.pos >= self.bytes.len() {
                return Ok(0);
            }
            let n = (self.bytes.len() - self.pos).min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }
}
