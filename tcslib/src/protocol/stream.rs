//! The streaming stage of the frame parser.
//!
//! Pulls candidate frames out of a raw byte stream, one byte at a
//! time. This stage only tracks enough structure to know where a frame
//! ends; everything else (checksum, addressing, payload decode) is the
//! full validator's job in [frame][super::frame].

use super::{FRAME_END, FRAME_START, HEADER_LEN, MAX_FRAME_LEN, MAX_WIRE_DATA};

/// Offset of the 3-digit length field inside the capture buffer.
const LEN_FIELD: core::ops::Range<usize> = 7..10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum State {
    /// Discarding bytes, waiting for a start marker.
    Idle,
    /// Accumulating the 11 fixed header bytes after the start marker.
    Header,
    /// Accumulating the declared number of wire payload bytes.
    Data { remaining: usize },
    /// Accumulating up to 4 checksum bytes, then the end marker.
    CrcTail { count: usize },
}

/// A streaming frame extractor.
///
/// Feed it bytes with [push()][Self::push]; when a complete candidate
/// span (start marker through end marker) has been captured, `push`
/// returns it. A start marker in any state restarts capture from
/// scratch, so a truncated frame can never block a following one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StreamParser {
    state: State,
    buf: [u8; MAX_FRAME_LEN],
    len: usize,
}

impl StreamParser {
    pub const fn new() -> Self {
        Self {
            state: State::Idle,
            buf: [0; MAX_FRAME_LEN],
            len: 0,
        }
    }

    /// Consume one byte. Returns the complete captured span when this
    /// byte finished a candidate frame.
    pub fn push(&mut self, byte: u8) -> Option<&[u8]> {
        // mandatory resynchronization, in every state
        if byte == FRAME_START {
            self.buf[0] = byte;
            self.len = 1;
            self.state = State::Header;
            return None;
        }

        match self.state {
            State::Idle => {}

            State::Header => {
                if byte == FRAME_END {
                    // a header can never legitimately contain this
                    self.state = State::Idle;
                    return None;
                }

                self.store(byte);
                if self.len == 1 + HEADER_LEN {
                    match decode_len(&self.buf[LEN_FIELD]) {
                        Some(0) => self.state = State::CrcTail { count: 0 },
                        Some(n) => self.state = State::Data { remaining: n },
                        None => self.state = State::Idle,
                    }
                }
            }

            State::Data { remaining } => {
                if !self.store(byte) {
                    return None;
                }
                if remaining == 1 {
                    self.state = State::CrcTail { count: 0 };
                } else {
                    self.state = State::Data {
                        remaining: remaining - 1,
                    };
                }
            }

            State::CrcTail { count } => {
                if byte == FRAME_END {
                    self.store(byte);
                    self.state = State::Idle;
                    return Some(&self.buf[..self.len]);
                }

                if count == 4 || !self.store(byte) {
                    // checksum field is exactly 4 bytes
                    self.state = State::Idle;
                    return None;
                }
                self.state = State::CrcTail { count: count + 1 };
            }
        }

        None
    }

    /// Store a byte, aborting to Idle on overflow.
    fn store(&mut self, byte: u8) -> bool {
        if let Some(slot) = self.buf.get_mut(self.len) {
            *slot = byte;
            self.len += 1;
            true
        } else {
            self.state = State::Idle;
            false
        }
    }
}

impl Default for StreamParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode a 3-digit decimal length field, bounded to the wire maximum.
fn decode_len(digits: &[u8]) -> Option<usize> {
    let mut val = 0;
    for d in digits {
        if !d.is_ascii_digit() {
            return None;
        }
        val = val * 10 + (d - b'0') as usize;
    }
    if val <= MAX_WIRE_DATA {
        Some(val)
    } else {
        None
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const START_FRAME: &[u8] = b"&AAASTM0100753544152549F28*";

    fn feed<'a>(parser: &'a mut StreamParser, bytes: &[u8]) -> Option<Vec<u8>> {
        let mut found = None;
        for b in bytes {
            if let Some(span) = parser.push(*b) {
                found = Some(span.to_vec());
            }
        }
        found
    }

    #[test]
    fn whole_frame() {
        let mut parser = StreamParser::new();
        assert_eq!(feed(&mut parser, START_FRAME).as_deref(), Some(START_FRAME));
    }

    #[test]
    fn idle_discards_garbage() {
        let mut parser = StreamParser::new();
        assert_eq!(feed(&mut parser, b"*xyz123*"), None);
        // and the parser still works afterwards
        assert_eq!(feed(&mut parser, START_FRAME).as_deref(), Some(START_FRAME));
    }

    #[test]
    fn leading_garbage_skipped() {
        let mut parser = StreamParser::new();
        let mut input = b"noise".to_vec();
        input.extend_from_slice(START_FRAME);
        assert_eq!(feed(&mut parser, &input).as_deref(), Some(START_FRAME));
    }

    #[test]
    fn resync_mid_header() {
        let mut parser = StreamParser::new();
        let mut input = b"&AAAST".to_vec();
        input.extend_from_slice(START_FRAME);
        assert_eq!(feed(&mut parser, &input).as_deref(), Some(START_FRAME));
    }

    #[test]
    fn resync_mid_data() {
        let mut parser = StreamParser::new();
        let mut input = b"&AAASTM010075354".to_vec();
        input.extend_from_slice(START_FRAME);
        assert_eq!(feed(&mut parser, &input).as_deref(), Some(START_FRAME));
    }

    #[test]
    fn end_marker_in_header_aborts() {
        let mut parser = StreamParser::new();
        assert_eq!(feed(&mut parser, b"&AAA*"), None);
        // back in idle: data bytes are discarded until a new start
        assert_eq!(feed(&mut parser, b"STM01007"), None);
        assert_eq!(feed(&mut parser, START_FRAME).as_deref(), Some(START_FRAME));
    }

    #[test]
    fn non_digit_length_aborts() {
        let mut parser = StreamParser::new();
        assert_eq!(feed(&mut parser, b"&AAASTM0A00753544152549F28*"), None);
    }

    #[test]
    fn oversized_length_aborts() {
        let mut parser = StreamParser::new();
        assert_eq!(feed(&mut parser, b"&AAASTM99907"), None);
        assert_eq!(parser.state, State::Idle);
    }

    #[test]
    fn zero_length_goes_straight_to_crc() {
        let mut parser = StreamParser::new();
        assert_eq!(
            feed(&mut parser, b"&AAASTM00007ABCD*").as_deref(),
            Some(b"&AAASTM00007ABCD*".as_ref())
        );
    }

    #[test]
    fn short_crc_tail_still_terminates() {
        // the end marker closes the frame even if fewer than 4
        // checksum bytes arrived; the validator rejects it later
        let mut parser = StreamParser::new();
        assert_eq!(
            feed(&mut parser, b"&AAASTM00007AB*").as_deref(),
            Some(b"&AAASTM00007AB*".as_ref())
        );
    }

    #[test]
    fn overlong_crc_tail_aborts() {
        let mut parser = StreamParser::new();
        assert_eq!(feed(&mut parser, b"&AAASTM00007ABCDE*"), None);
    }

    #[test]
    fn streaming_matches_burst() {
        // one byte at a time vs all at once gives the same span
        let mut one = StreamParser::new();
        let mut spans = Vec::new();
        for b in START_FRAME {
            if let Some(span) = one.push(*b) {
                spans.push(span.to_vec());
            }
        }
        let mut burst = StreamParser::new();
        assert_eq!(spans, vec![feed(&mut burst, START_FRAME).unwrap()]);
    }

    #[test]
    fn back_to_back_frames() {
        let mut parser = StreamParser::new();
        let mut input = START_FRAME.to_vec();
        input.extend_from_slice(b"&STMAAA004074F4B5F18*");
        let mut found = Vec::new();
        for b in &input {
            if let Some(span) = parser.push(*b) {
                found.push(span.to_vec());
            }
        }
        assert_eq!(found.len(), 2);
        assert_eq!(found[0], START_FRAME);
        assert_eq!(found[1], b"&STMAAA004074F4B5F18*");
    }
}
