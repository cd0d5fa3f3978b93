//! The full-frame validator and its decoded [Frame] type.

use core::ops::Deref;

use nom::IResult;

use super::command::Command;
use super::crc::{CrcDigest, CrcStyle};
use super::{hex, FRAME_END, FRAME_START, HEADER_LEN, MAX_DATA_LEN, MAX_WIRE_DATA, MIN_FRAME_LEN};

/// A 3-character link address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Address(pub [u8; 3]);

impl Address {
    /// The local sensor node address.
    pub const DEVICE: Address = Address(super::DEVICE_ID);

    /// An address that can be placed in an outbound frame: exactly 3
    /// bytes, neither delimiter byte among them.
    pub fn checked(bytes: &[u8]) -> Option<Address> {
        match bytes {
            [a, b, c] => {
                let addr = Address([*a, *b, *c]);
                if addr.is_wire_safe() {
                    Some(addr)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> &[u8; 3] {
        &self.0
    }

    /// True if the address contains no delimiter bytes.
    pub fn is_wire_safe(&self) -> bool {
        !self.0.iter().any(|b| *b == FRAME_START || *b == FRAME_END)
    }
}

impl core::fmt::Display for Address {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        for b in self.0 {
            write!(f, "{}", b as char)?;
        }
        Ok(())
    }
}

/// A decoded frame payload, bounded by the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Payload {
    len: usize,
    buf: [u8; MAX_DATA_LEN],
}

impl Payload {
    pub const fn new() -> Self {
        Self {
            len: 0,
            buf: [0; MAX_DATA_LEN],
        }
    }

}

impl Default for Payload {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for Payload {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.buf[..self.len]
    }
}

/// A fully validated inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Frame {
    pub sender: Address,
    pub receiver: Address,
    pub frame_id: u8,
    pub command: Command,
    data: Payload,
    params_at: usize,
}

impl Frame {
    /// The whole decoded payload, command name included.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The parameter block after the command name.
    pub fn params(&self) -> &[u8] {
        &self.data[self.params_at..]
    }
}

/// A classified frame validation failure.
///
/// The first three variants are silent (shared-bus noise, not
/// errors). The rest carry the address to answer to, when the inbound
/// sender field was structurally sound enough to answer at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Shorter than any legal frame.
    TooShort,
    /// Addressed to some other device.
    WrongRecipient,
    /// A delimiter byte inside a field.
    ForbiddenChars,
    /// Structure damaged beyond recovering the frame id.
    InvalidFormat { reply_to: Option<Address> },
    /// The received checksum did not match.
    Checksum { reply_to: Address, frame_id: u8 },
    /// An odd hex length, or a parameter block of the wrong width.
    LengthMismatch { reply_to: Address, frame_id: u8 },
    /// No such command, or a trailing tail on a parameterless one.
    UnknownCommand { reply_to: Address, frame_id: u8 },
}

fn address(input: &[u8]) -> IResult<&[u8], Address> {
    nom::combinator::map(nom::bytes::complete::take(3usize), |b: &[u8]| {
        Address([b[0], b[1], b[2]])
    })(input)
}

/// A fixed-width zero-padded decimal field.
pub(crate) fn dec_field<const WIDTH: usize>(input: &[u8]) -> IResult<&[u8], u32> {
    nom::combinator::map_res(nom::bytes::complete::take(WIDTH), |b: &[u8]| {
        if b.iter().all(|d| d.is_ascii_digit()) {
            Ok(b.iter().fold(0u32, |acc, d| acc * 10 + (d - b'0') as u32))
        } else {
            Err(())
        }
    })(input)
}

fn command_name(input: &[u8]) -> IResult<&[u8], &[u8]> {
    nom::bytes::complete::take_while1(|b: u8| b.is_ascii_uppercase())(input)
}

/// A structurally valid, checksum-valid frame, before command
/// resolution.
///
/// This is as far as the host side takes inbound replies; the node
/// side continues through [parse()] to resolve the command table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawFrame {
    pub sender: Address,
    pub receiver: Address,
    pub frame_id: u8,
    data: Payload,
}

impl RawFrame {
    /// The whole decoded payload.
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// Validate and decompose a captured span, stopping short of command
/// resolution.
///
/// The span is expected to run from start marker to end marker
/// inclusive, as produced by [StreamParser][super::StreamParser], but
/// everything is re-checked here: this function is the trust boundary.
pub fn parse_raw<C>(crc: &C, span: &[u8], local: Address) -> Result<RawFrame, FrameError>
where
    C: CrcStyle,
{
    // defensive re-scan for the start marker
    let start = span
        .iter()
        .position(|b| *b == FRAME_START)
        .ok_or(FrameError::TooShort)?;
    let span = &span[start..];

    if span.len() < MIN_FRAME_LEN {
        return Err(FrameError::TooShort);
    }
    if span[span.len() - 1] != FRAME_END {
        // the header has not been vetted yet, so the sender field is
        // only usable for the reply if it checks out on its own
        return Err(FrameError::InvalidFormat {
            reply_to: Address::checked(&span[1..4]),
        });
    }

    // delimiters are reserved: anywhere in the header they mean the
    // capture is garbage, and nobody trustworthy is named in it
    let header = &span[1..1 + HEADER_LEN];
    if header.iter().any(|b| *b == FRAME_START || *b == FRAME_END) {
        return Err(FrameError::ForbiddenChars);
    }

    let (rest, (sender, receiver)) =
        nom::sequence::pair(address, address)(header).map_err(|_| FrameError::ForbiddenChars)?;

    if receiver != local {
        return Err(FrameError::WrongRecipient);
    }

    // the header scan above proved the sender wire-safe
    let reply_to = sender;

    let invalid = |_| FrameError::InvalidFormat {
        reply_to: Some(reply_to),
    };

    let (rest, wire_len) = dec_field::<3>(rest).map_err(invalid)?;
    let wire_len = wire_len as usize;
    if wire_len > MAX_WIRE_DATA {
        return Err(FrameError::InvalidFormat {
            reply_to: Some(reply_to),
        });
    }
    let (_, frame_id) = dec_field::<2>(rest).map_err(invalid)?;
    let frame_id = frame_id as u8;

    // marker + header + payload + checksum + marker, nothing else;
    // a disagreement means the structure itself is damaged, and
    // nothing after the length field can be located reliably
    if span.len() != MIN_FRAME_LEN + wire_len {
        return Err(FrameError::InvalidFormat {
            reply_to: Some(reply_to),
        });
    }
    // an odd count of hex characters cannot decode to whole bytes
    if wire_len % 2 != 0 {
        return Err(FrameError::LengthMismatch { reply_to, frame_id });
    }

    let wire_data = &span[1 + HEADER_LEN..1 + HEADER_LEN + wire_len];
    let mut data = Payload::new();
    data.len = hex::decode(wire_data, &mut data.buf).map_err(|_| FrameError::InvalidFormat {
        reply_to: Some(reply_to),
    })?;

    let crc_field = &span[1 + HEADER_LEN + wire_len..span.len() - 1];
    if crc_field
        .iter()
        .any(|b| *b == FRAME_START || *b == FRAME_END)
    {
        return Err(FrameError::ForbiddenChars);
    }
    let mut provided = 0u16;
    for d in crc_field {
        let val = hex::digit_value(*d).ok_or(FrameError::InvalidFormat {
            reply_to: Some(reply_to),
        })?;
        provided = (provided << 4) | val as u16;
    }

    // the covered span is exactly the header and wire payload as
    // received, already in re-serialized form
    let mut digest = crc.digest();
    digest.update(&span[1..1 + HEADER_LEN + wire_len]);
    if !crc.validate(digest.finalize(), provided) {
        return Err(FrameError::Checksum { reply_to, frame_id });
    }

    Ok(RawFrame {
        sender,
        receiver,
        frame_id,
        data,
    })
}

/// Validate a captured span all the way down to a dispatchable
/// [Frame]: [parse_raw()] plus command table resolution.
pub fn parse<C>(crc: &C, span: &[u8], local: Address) -> Result<Frame, FrameError>
where
    C: CrcStyle,
{
    let raw = parse_raw(crc, span, local)?;
    let reply_to = raw.sender;
    let frame_id = raw.frame_id;

    let (_, name) = command_name(&raw.data).map_err(|_| FrameError::UnknownCommand {
        reply_to,
        frame_id,
    })?;
    let command = Command::from_name(name).ok_or(FrameError::UnknownCommand {
        reply_to,
        frame_id,
    })?;

    let expected = command.param_len();
    if expected == 0 {
        // a tail on a parameterless command is indistinguishable from
        // a malformed command name
        if raw.data.len != name.len() {
            return Err(FrameError::UnknownCommand {
                reply_to,
                frame_id,
            });
        }
    } else if raw.data.len != name.len() + expected {
        return Err(FrameError::LengthMismatch {
            reply_to,
            frame_id,
        });
    }

    Ok(Frame {
        sender: raw.sender,
        receiver: raw.receiver,
        frame_id,
        command,
        data: raw.data,
        params_at: name.len(),
    })
}
