//! The framed text protocol spoken between host and sensor node.
//!
//! One frame on the wire, all ASCII, fields adjacent:
//!
//! ```text
//! & SENDER(3) RECEIVER(3) LEN(3 dec) ID(2 dec) PAYLOAD(LEN hex) CRC(4 hex) *
//! ```
//!
//! The payload decodes to an uppercase command name followed by a
//! fixed-width parameter block; replies carry short status strings.

/// Frame start marker. Reserved, never appears elsewhere in a frame.
pub const FRAME_START: u8 = b'&';
/// Frame end marker. Reserved like [FRAME_START].
pub const FRAME_END: u8 = b'*';

/// The sensor node's fixed link address.
pub const DEVICE_ID: [u8; 3] = *b"STM";

/// Header bytes after the start marker: sender, receiver, length, id.
pub const HEADER_LEN: usize = 11;
/// Maximum wire payload length (hex characters).
pub const MAX_WIRE_DATA: usize = 256;
/// Maximum decoded payload length.
pub const MAX_DATA_LEN: usize = MAX_WIRE_DATA / 2;
/// Smallest possible frame: markers, header, empty payload, checksum.
pub const MIN_FRAME_LEN: usize = 17;
/// Largest possible frame.
pub const MAX_FRAME_LEN: usize = MIN_FRAME_LEN + MAX_WIRE_DATA;

pub const BAUD_RATE: u32 = 115200;

pub mod crc;

pub mod hex;

pub mod serialize;
pub use serialize::Serializer;

pub mod stream;
pub use stream::StreamParser;

pub mod frame;
pub use frame::{Address, Frame, FrameError, RawFrame};

pub mod command;
pub use command::Command;

pub mod response;
pub use response::{ErrorCode, Reply, ReplyData};
