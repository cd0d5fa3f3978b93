//! Outbound frame descriptions and the response builder.

use nom::IResult;

use super::crc::CrcStyle;
use super::frame::{Address, FrameError};
use super::serialize::{infallible, Serializer, SerializerCrc, SerializerHex, SerializerLength};
use super::{FRAME_END, FRAME_START};
use crate::ColorReading;

/// The fixed error code table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ErrorCode {
    /// Checksum mismatch.
    Checksum,
    /// Unknown or malformed command.
    Command,
    /// Odd hex length, or wrong parameter width for the command.
    Length,
    /// Archive offset out of range.
    Position,
    /// Frame structure damaged.
    Frame,
    /// Interval/integration-time conflict.
    Timing,
}

impl ErrorCode {
    pub fn as_bytes(self) -> &'static [u8] {
        match self {
            ErrorCode::Checksum => b"WRCHSUM",
            ErrorCode::Command => b"WRCMD",
            ErrorCode::Length => b"WRLEN",
            ErrorCode::Position => b"WRPOS",
            ErrorCode::Frame => b"WRFRM",
            ErrorCode::Timing => b"WRTIME",
        }
    }
}

/// The decoded payload of an outbound reply frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReplyData {
    /// Plain success.
    Ok,
    /// A sample, channels as 5-digit zero-padded decimals.
    Answer(ColorReading),
    /// Current sampling interval in milliseconds.
    Interval(u32),
    /// Current gain table index.
    Gain(u8),
    /// Current integration time table index.
    Time(u8),
    /// Actual LED pin level.
    Led(bool),
    /// Nothing stored that satisfies the query.
    NoData,
    /// One of the fixed error codes.
    Error(ErrorCode),
}

impl ReplyData {
    /// Write the decoded payload form of this reply.
    pub fn write_payload<S>(&self, ser: &mut S) -> Result<(), S::Error>
    where
        S: Serializer,
    {
        match self {
            ReplyData::Ok => ser.write_bytes(b"OK"),
            ReplyData::Answer(r) => {
                ser.write_u8(b'A')?;
                ser.write_u8(b'N')?;
                ser.write_u8(b'S')?;
                ser.write_u8(b'R')?;
                ser.write_dec(r.red as u32, 5)?;
                ser.write_u8(b'G')?;
                ser.write_dec(r.green as u32, 5)?;
                ser.write_u8(b'B')?;
                ser.write_dec(r.blue as u32, 5)?;
                ser.write_u8(b'C')?;
                ser.write_dec(r.clear as u32, 5)
            }
            ReplyData::Interval(ms) => {
                ser.write_bytes(b"INT")?;
                ser.write_dec(*ms, 5)
            }
            ReplyData::Gain(i) => {
                ser.write_bytes(b"GAIN")?;
                ser.write_dec(*i as u32, 1)
            }
            ReplyData::Time(i) => {
                ser.write_bytes(b"TIME")?;
                ser.write_dec(*i as u32, 1)
            }
            ReplyData::Led(on) => {
                ser.write_bytes(b"LED")?;
                ser.write_dec(*on as u32, 1)
            }
            ReplyData::NoData => ser.write_bytes(b"NODATA"),
            ReplyData::Error(code) => ser.write_bytes(code.as_bytes()),
        }
    }

    /// Parse a decoded reply payload. Used on the host side, where
    /// replies arrive through the same validator path as commands.
    pub fn parse(payload: &[u8]) -> Option<ReplyData> {
        nom::combinator::all_consuming(reply_payload)(payload)
            .ok()
            .map(|(_, data)| data)
    }
}

fn dec_field<const WIDTH: usize>(input: &[u8]) -> IResult<&[u8], u32> {
    super::frame::dec_field::<WIDTH>(input)
}

fn dec_u16<const WIDTH: usize>(input: &[u8]) -> IResult<&[u8], u16> {
    nom::combinator::map_res(dec_field::<WIDTH>, u16::try_from)(input)
}

fn answer(input: &[u8]) -> IResult<&[u8], ReplyData> {
    let (input, _) = nom::bytes::complete::tag(&b"ANSR"[..])(input)?;
    let (input, red) = dec_u16::<5>(input)?;
    let (input, _) = nom::bytes::complete::tag(&b"G"[..])(input)?;
    let (input, green) = dec_u16::<5>(input)?;
    let (input, _) = nom::bytes::complete::tag(&b"B"[..])(input)?;
    let (input, blue) = dec_u16::<5>(input)?;
    let (input, _) = nom::bytes::complete::tag(&b"C"[..])(input)?;
    let (input, clear) = dec_u16::<5>(input)?;
    Ok((
        input,
        ReplyData::Answer(ColorReading {
            clear,
            red,
            green,
            blue,
        }),
    ))
}

fn reply_payload(input: &[u8]) -> IResult<&[u8], ReplyData> {
    use nom::bytes::complete::tag;
    use nom::combinator::{map, value};
    use nom::sequence::preceded;

    nom::branch::alt((
        value(ReplyData::Ok, tag(&b"OK"[..])),
        answer,
        map(preceded(tag(&b"INT"[..]), dec_field::<5>), ReplyData::Interval),
        map(preceded(tag(&b"GAIN"[..]), dec_u16::<1>), |i| {
            ReplyData::Gain(i as u8)
        }),
        map(preceded(tag(&b"TIME"[..]), dec_u16::<1>), |i| {
            ReplyData::Time(i as u8)
        }),
        map(preceded(tag(&b"LED"[..]), dec_u16::<1>), |i| {
            ReplyData::Led(i != 0)
        }),
        value(ReplyData::NoData, tag(&b"NODATA"[..])),
        value(ReplyData::Error(ErrorCode::Checksum), tag(&b"WRCHSUM"[..])),
        value(ReplyData::Error(ErrorCode::Command), tag(&b"WRCMD"[..])),
        value(ReplyData::Error(ErrorCode::Length), tag(&b"WRLEN"[..])),
        value(ReplyData::Error(ErrorCode::Position), tag(&b"WRPOS"[..])),
        value(ReplyData::Error(ErrorCode::Frame), tag(&b"WRFRM"[..])),
        value(ReplyData::Error(ErrorCode::Timing), tag(&b"WRTIME"[..])),
    ))(input)
}

/// A complete outbound frame description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Reply {
    pub sender: Address,
    pub receiver: Address,
    pub frame_id: u8,
    pub data: ReplyData,
}

impl Reply {
    /// Serialize this reply into wire form.
    pub fn write<C, S>(&self, crc: &C, ser: &mut S) -> Result<(), S::Error>
    where
        C: CrcStyle,
        S: Serializer,
    {
        write_frame(crc, ser, self.sender, self.receiver, self.frame_id, &self.data)
    }
}

/// Anything that can form the decoded payload of a frame.
///
/// For this to work correctly, it *must* perform the same writes
/// every time it is called with the same value. That means no IO, no
/// funny business.
pub trait FrameBody {
    fn write_body<S>(&self, ser: &mut S) -> Result<(), S::Error>
    where
        S: Serializer;
}

impl FrameBody for &[u8] {
    fn write_body<S>(&self, ser: &mut S) -> Result<(), S::Error>
    where
        S: Serializer,
    {
        ser.write_bytes(self)
    }
}

impl FrameBody for ReplyData {
    fn write_body<S>(&self, ser: &mut S) -> Result<(), S::Error>
    where
        S: Serializer,
    {
        self.write_payload(ser)
    }
}

/// Serialize one complete frame: start marker, header and hex payload
/// with the checksum computed on the side, checksum tail, end marker.
///
/// Both sides build their frames through here; a command is just a
/// byte-slice body.
pub fn write_frame<C, S, B>(
    crc: &C,
    ser: &mut S,
    sender: Address,
    receiver: Address,
    frame_id: u8,
    body: &B,
) -> Result<(), S::Error>
where
    C: CrcStyle,
    S: Serializer,
    B: FrameBody,
{
    // run the body once to get the decoded length
    let mut len_ser = SerializerLength::new();
    infallible(body.write_body(&mut len_ser));
    let wire_len = 2 * len_ser.len();

    ser.write_u8(FRAME_START)?;

    let mut crc_ser = SerializerCrc::new(crc, ser);
    crc_ser.write_bytes(sender.as_bytes())?;
    crc_ser.write_bytes(receiver.as_bytes())?;
    crc_ser.write_dec(wire_len as u32, 3)?;
    crc_ser.write_dec(frame_id as u32, 2)?;

    let mut hex_ser = SerializerHex::new(crc_ser);
    body.write_body(&mut hex_ser)?;
    let (crc_val, ser) = hex_ser.done().finalize();

    ser.write_hex_u16(crc_val)?;
    ser.write_u8(FRAME_END)
}

impl FrameError {
    /// The reply owed to the sender for this failure, if any.
    ///
    /// Shared-bus noise (too short, wrong recipient, delimiter bytes
    /// in fields) stays silent; so does anything whose sender field
    /// cannot be answered safely.
    pub fn reply(&self, local: Address) -> Option<Reply> {
        let (reply_to, frame_id, code) = match self {
            FrameError::TooShort | FrameError::WrongRecipient | FrameError::ForbiddenChars => {
                return None
            }
            // the id field cannot be trusted here, so echo id 0
            FrameError::InvalidFormat { reply_to } => ((*reply_to)?, 0, ErrorCode::Frame),
            FrameError::Checksum { reply_to, frame_id } => {
                (*reply_to, *frame_id, ErrorCode::Checksum)
            }
            FrameError::LengthMismatch { reply_to, frame_id } => {
                (*reply_to, *frame_id, ErrorCode::Length)
            }
            FrameError::UnknownCommand { reply_to, frame_id } => {
                (*reply_to, *frame_id, ErrorCode::Command)
            }
        };

        Some(Reply {
            sender: local,
            receiver: reply_to,
            frame_id,
            data: ReplyData::Error(code),
        })
    }
}

#[cfg(test)]
mod test {
    use super::super::crc::CrcCcitt;
    use super::super::frame;
    use super::super::serialize::SerializerSlice;
    use super::super::stream::StreamParser;
    use super::*;

    const HOST: Address = Address(*b"AAA");

    fn render(reply: &Reply) -> Vec<u8> {
        let mut buf = [0; 128];
        let mut ser = SerializerSlice::new(&mut buf);
        reply.write(&CrcCcitt::new(), &mut ser).unwrap();
        ser.done().to_vec()
    }

    fn payload(data: &ReplyData) -> Vec<u8> {
        let mut buf = [0; 64];
        let mut ser = SerializerSlice::new(&mut buf);
        data.write_payload(&mut ser).unwrap();
        ser.done().to_vec()
    }

    #[test]
    fn ok_reply_bytes() {
        let reply = Reply {
            sender: Address::DEVICE,
            receiver: HOST,
            frame_id: 7,
            data: ReplyData::Ok,
        };
        assert_eq!(render(&reply), b"&STMAAA004074F4B5F18*");
    }

    #[test]
    fn checksum_error_bytes() {
        let reply = Reply {
            sender: Address::DEVICE,
            receiver: HOST,
            frame_id: 7,
            data: ReplyData::Error(ErrorCode::Checksum),
        };
        assert_eq!(render(&reply), b"&STMAAA014075752434853554D76C4*");
    }

    #[test]
    fn answer_payload_format() {
        let data = ReplyData::Answer(ColorReading {
            clear: 4,
            red: 1,
            green: 12345,
            blue: 65535,
        });
        assert_eq!(payload(&data), b"ANSR00001G12345B65535C00004");
    }

    #[test]
    fn query_payload_formats() {
        assert_eq!(payload(&ReplyData::Interval(1000)), b"INT01000");
        assert_eq!(payload(&ReplyData::Gain(1)), b"GAIN1");
        assert_eq!(payload(&ReplyData::Time(3)), b"TIME3");
        assert_eq!(payload(&ReplyData::Led(true)), b"LED1");
        assert_eq!(payload(&ReplyData::Led(false)), b"LED0");
        assert_eq!(payload(&ReplyData::NoData), b"NODATA");
    }

    #[test]
    fn built_replies_parse_back() {
        let crc = CrcCcitt::new();
        for data in [
            ReplyData::Ok,
            ReplyData::Answer(ColorReading {
                clear: 9,
                red: 10,
                green: 11,
                blue: 12,
            }),
            ReplyData::Interval(99999),
            ReplyData::Gain(3),
            ReplyData::Time(0),
            ReplyData::Led(true),
            ReplyData::NoData,
            ReplyData::Error(ErrorCode::Timing),
        ] {
            let reply = Reply {
                sender: Address::DEVICE,
                receiver: HOST,
                frame_id: 42,
                data,
            };
            let bytes = render(&reply);

            // byte at a time through the streaming stage, then the
            // validator, acting as the host
            let mut parser = StreamParser::new();
            let mut span = None;
            for b in &bytes {
                if let Some(s) = parser.push(*b) {
                    span = Some(s.to_vec());
                }
            }
            let span = span.unwrap();
            let raw = frame::parse_raw(&crc, &span, HOST).unwrap();
            assert_eq!(raw.sender, Address::DEVICE);
            assert_eq!(raw.receiver, HOST);
            assert_eq!(raw.frame_id, 42);
            assert_eq!(ReplyData::parse(raw.data()), Some(data));
        }
    }

    #[test]
    fn parse_rejects_trailing_junk() {
        assert_eq!(ReplyData::parse(b"OKX"), None);
        assert_eq!(ReplyData::parse(b""), None);
        assert_eq!(ReplyData::parse(b"WRNOPE"), None);
    }

    #[test]
    fn silent_errors_have_no_reply() {
        assert_eq!(FrameError::TooShort.reply(Address::DEVICE), None);
        assert_eq!(FrameError::WrongRecipient.reply(Address::DEVICE), None);
        assert_eq!(FrameError::ForbiddenChars.reply(Address::DEVICE), None);
        assert_eq!(
            FrameError::InvalidFormat { reply_to: None }.reply(Address::DEVICE),
            None
        );
    }

    #[test]
    fn answered_errors_echo_the_frame_id() {
        let err = FrameError::Checksum {
            reply_to: HOST,
            frame_id: 33,
        };
        assert_eq!(
            err.reply(Address::DEVICE),
            Some(Reply {
                sender: Address::DEVICE,
                receiver: HOST,
                frame_id: 33,
                data: ReplyData::Error(ErrorCode::Checksum),
            })
        );

        // a format error cannot trust the received id
        let err = FrameError::InvalidFormat {
            reply_to: Some(HOST),
        };
        assert_eq!(err.reply(Address::DEVICE).map(|r| r.frame_id), Some(0));
    }
}
