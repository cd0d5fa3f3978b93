//! The uppercase hex codec used for frame payloads.
//!
//! Payload bytes travel as two uppercase hex digits each, most
//! significant nibble first. Decoding is strict: lowercase digits and
//! anything outside `0-9A-F` are rejected.

/// An error from [decode()].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HexError {
    /// The input length was not a multiple of two.
    OddLength,
    /// The input contained a non-hex (or lowercase) character.
    BadDigit,
}

const DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// Encode a single byte as two uppercase hex digits.
pub fn encode_byte(val: u8) -> [u8; 2] {
    [DIGITS[(val >> 4) as usize], DIGITS[(val & 0xf) as usize]]
}

/// Decode a single uppercase hex digit.
pub fn digit_value(digit: u8) -> Option<u8> {
    match digit {
        b'0'..=b'9' => Some(digit - b'0'),
        b'A'..=b'F' => Some(digit - b'A' + 10),
        _ => None,
    }
}

/// Encode `src` into `dst`, returning the number of bytes written.
///
/// `dst` must have room for `2 * src.len()` bytes.
pub fn encode(src: &[u8], dst: &mut [u8]) -> usize {
    for (val, out) in src.iter().zip(dst.chunks_exact_mut(2)) {
        out.copy_from_slice(&encode_byte(*val));
    }
    2 * src.len()
}

/// Decode `src` into `dst`, returning the number of bytes written.
///
/// `dst` must have room for `src.len() / 2` bytes.
pub fn decode(src: &[u8], dst: &mut [u8]) -> Result<usize, HexError> {
    if src.len() % 2 != 0 {
        return Err(HexError::OddLength);
    }

    for (pair, out) in src.chunks_exact(2).zip(dst.iter_mut()) {
        let hi = digit_value(pair[0]).ok_or(HexError::BadDigit)?;
        let lo = digit_value(pair[1]).ok_or(HexError::BadDigit)?;
        *out = (hi << 4) | lo;
    }
    Ok(src.len() / 2)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn encode_known() {
        let mut buf = [0; 10];
        let len = encode(b"START", &mut buf);
        assert_eq!(&buf[..len], b"5354415254");
    }

    #[test]
    fn decode_known() {
        let mut buf = [0; 5];
        assert_eq!(decode(b"5354415254", &mut buf), Ok(5));
        assert_eq!(&buf, b"START");
    }

    #[test]
    fn decode_rejects_odd_length() {
        let mut buf = [0; 2];
        assert_eq!(decode(b"535", &mut buf), Err(HexError::OddLength));
    }

    #[test]
    fn decode_rejects_lowercase() {
        let mut buf = [0; 1];
        assert_eq!(decode(b"5a", &mut buf), Err(HexError::BadDigit));
    }

    #[test]
    fn decode_rejects_non_hex() {
        let mut buf = [0; 1];
        assert_eq!(decode(b"G0", &mut buf), Err(HexError::BadDigit));
        assert_eq!(decode(b"0*", &mut buf), Err(HexError::BadDigit));
    }

    #[quickcheck_macros::quickcheck]
    fn round_trip(data: Vec<u8>) -> bool {
        let mut encoded = vec![0; 2 * data.len()];
        let mut decoded = vec![0; data.len()];
        let elen = encode(&data, &mut encoded);
        decode(&encoded[..elen], &mut decoded) == Ok(data.len()) && decoded == data
    }

    #[quickcheck_macros::quickcheck]
    fn encoded_is_uppercase_hex(data: Vec<u8>) -> bool {
        let mut encoded = vec![0; 2 * data.len()];
        let elen = encode(&data, &mut encoded);
        encoded[..elen]
            .iter()
            .all(|b| b.is_ascii_digit() || (b'A'..=b'F').contains(b))
    }
}
