use bytes::{Bytes, BytesMut};
use tracing::warn;

/// Maximum accepted frame length in bytes, terminator excluded.
///
/// Real telemetry frames are ~30 bytes; anything past this is line noise
/// from a garbling link and is discarded until the next terminator.
pub const MAX_FRAME_LEN: usize = 256;

const INITIAL_CARRY_CAPACITY: usize = 1024;

/// Line decoder owning one carry-over buffer.
///
/// [`push`](Self::push) drains every complete newline-terminated frame from
/// the buffered stream; bytes after the last terminator stay in the carry
/// buffer for the next call, so no partial frame is ever handed out and no
/// byte is dropped across arbitrary chunk splits. A trailing `\r` before the
/// terminator is stripped (CRLF-emitting firmware).
///
/// Exactly one decoder exists per session; the session's read loop is its
/// only user. Frames longer than [`MAX_FRAME_LEN`] are discarded and counted,
/// and the decoder resynchronizes at the next terminator.
#[derive(Debug)]
pub struct LineDecoder {
    carry: BytesMut,
    discarding: bool,
    discarded: u64,
}

impl Default for LineDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl LineDecoder {
    pub fn new() -> Self {
        Self {
            carry: BytesMut::with_capacity(INITIAL_CARRY_CAPACITY),
            discarding: false,
            discarded: 0,
        }
    }

    /// Feed a raw chunk from the link; returns every frame it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Bytes> {
        self.carry.extend_from_slice(chunk);

        let mut frames = Vec::new();
        loop {
            match self.carry.iter().position(|&b| b == b'\n') {
                Some(pos) => {
                    if self.discarding {
                        // Tail of an oversized line already counted.
                        let _ = self.carry.split_to(pos + 1);
                        self.discarding = false;
                        continue;
                    }
                    if pos > MAX_FRAME_LEN {
                        warn!(len = pos, "discarding oversized frame");
                        let _ = self.carry.split_to(pos + 1);
                        self.discarded += 1;
                        continue;
                    }
                    let mut line = self.carry.split_to(pos + 1);
                    line.truncate(pos);
                    if line.last() == Some(&b'\r') {
                        line.truncate(line.len() - 1);
                    }
                    frames.push(line.freeze());
                }
                None => {
                    if !self.discarding && self.carry.len() > MAX_FRAME_LEN {
                        warn!(len = self.carry.len(), "discarding oversized frame");
                        self.carry.clear();
                        self.discarding = true;
                        self.discarded += 1;
                    } else if self.discarding {
                        self.carry.clear();
                    }
                    break;
                }
            }
        }
        frames
    }

    /// Bytes currently held as an incomplete frame.
    pub fn carry_len(&self) -> usize {
        self.carry.len()
    }

    /// Frames discarded as oversized line noise since creation.
    pub fn discarded(&self) -> u64 {
        self.discarded
    }

    /// Drop any buffered partial frame (link teardown).
    pub fn clear(&mut self) {
        self.carry.clear();
        self.discarding = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(frames: &[Bytes]) -> Vec<&str> {
        frames
            .iter()
            .map(|f| std::str::from_utf8(f).unwrap())
            .collect()
    }

    #[test]
    fn splits_complete_lines_and_keeps_remainder() {
        let mut decoder = LineDecoder::new();
        let frames = decoder.push(b"85,24.50,15.10,0,1,0.12\nID:SB000001\n40,er");

        assert_eq!(texts(&frames), vec!["85,24.50,15.10,0,1,0.12", "ID:SB000001"]);
        assert_eq!(decoder.carry_len(), 5);
    }

    #[test]
    fn strips_carriage_return() {
        let mut decoder = LineDecoder::new();
        let frames = decoder.push(b"ID:SB000001\r\n");
        assert_eq!(texts(&frames), vec!["ID:SB000001"]);
    }

    #[test]
    fn empty_line_yields_empty_frame() {
        let mut decoder = LineDecoder::new();
        let frames = decoder.push(b"\n");
        assert_eq!(frames.len(), 1);
        assert!(frames[0].is_empty());
    }

    #[test]
    fn arbitrary_chunking_is_lossless() {
        let stream = b"85,24.50,15.10,0,1,0.12\n40,er,15.10,1,0,3.0\nID:SB000001\n90,21.00,4.90,1,2,-0.40\n";

        // Reference: decode in one shot.
        let mut reference = LineDecoder::new();
        let expected = reference.push(stream);

        // Every split point in a few chunk sizes.
        for chunk_size in [1, 2, 3, 5, 7, 16, 64] {
            let mut decoder = LineDecoder::new();
            let mut frames = Vec::new();
            for chunk in stream.chunks(chunk_size) {
                frames.extend(decoder.push(chunk));
            }
            assert_eq!(frames, expected, "chunk size {chunk_size}");
            assert_eq!(decoder.carry_len(), 0);
        }
    }

    #[test]
    fn oversized_line_is_discarded_and_resyncs() {
        let mut decoder = LineDecoder::new();
        let mut garbage = vec![b'x'; MAX_FRAME_LEN + 40];
        garbage.push(b'\n');
        garbage.extend_from_slice(b"85,24.50,15.10,0,1,0.12\n");

        let frames = decoder.push(&garbage);
        assert_eq!(texts(&frames), vec!["85,24.50,15.10,0,1,0.12"]);
        assert_eq!(decoder.discarded(), 1);
    }

    #[test]
    fn oversized_line_split_across_pushes_counts_once() {
        let mut decoder = LineDecoder::new();
        assert!(decoder.push(&vec![b'x'; MAX_FRAME_LEN + 1]).is_empty());
        assert!(decoder.push(&vec![b'x'; 100]).is_empty());
        let frames = decoder.push(b"\n90,21.00,4.90,1,2,-0.40\n");

        assert_eq!(texts(&frames), vec!["90,21.00,4.90,1,2,-0.40"]);
        assert_eq!(decoder.discarded(), 1);
        assert_eq!(decoder.carry_len(), 0);
    }

    #[test]
    fn clear_drops_partial_frame() {
        let mut decoder = LineDecoder::new();
        decoder.push(b"85,24.");
        assert_eq!(decoder.carry_len(), 6);
        decoder.clear();
        assert_eq!(decoder.carry_len(), 0);

        // A fresh stream decodes normally afterwards.
        let frames = decoder.push(b"ID:SB000001\n");
        assert_eq!(texts(&frames), vec!["ID:SB000001"]);
    }
}
