//! Newline-delimited frame codec for the bag wire protocol.
//!
//! Device-to-host traffic is newline-terminated ASCII frames; host-to-device
//! traffic is single actuator command characters. This crate owns the
//! framing logic:
//! - [`LineDecoder`] — carry-over decoding: no partial frame is ever handed
//!   out and no byte is dropped across arbitrary chunk splits
//! - [`LineReader`] — blocking frame reads over any `Read` stream
//! - [`Command`] — the closed actuator command set and its wire mapping
//!
//! The protocol has no checksum and no frame-type discriminator beyond the
//! identity prefix heuristic applied a layer up.

pub mod codec;
pub mod command;
pub mod error;
pub mod reader;

pub use codec::{LineDecoder, MAX_FRAME_LEN};
pub use command::{encode_command, Command};
pub use error::{FrameError, Result};
pub use reader::LineReader;
