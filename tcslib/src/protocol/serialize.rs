use super::crc::{CrcDigest, CrcStyle};
use super::hex;

/// Unwrap a result whose error cannot occur.
pub fn infallible<T>(res: Result<T, core::convert::Infallible>) -> T {
    match res {
        Ok(v) => v,
        Err(e) => match e {},
    }
}

/// A byte sink for building frames.
pub trait Serializer {
    type Error;

    fn write_u8(&mut self, val: u8) -> Result<(), Self::Error>;

    // everything else can be written in terms of write_u8
    // (although they probably should be specialized in some impls)

    // Note: they *definitely should* be specialized in
    // SerializerLength and &mut S so if you add a method here, add
    // one there.

    fn write_bytes(&mut self, val: &[u8]) -> Result<(), Self::Error> {
        for b in val.iter() {
            self.write_u8(*b)?;
        }
        Ok(())
    }

    /// Write a zero-padded decimal number, at least `width` digits wide.
    fn write_dec(&mut self, val: u32, width: usize) -> Result<(), Self::Error> {
        // the widest field on the wire is 5 digits, u32 needs 10
        let mut digits = [b'0'; 10];
        let mut i = digits.len();
        let mut v = val;
        loop {
            i -= 1;
            digits[i] = b'0' + (v % 10) as u8;
            v /= 10;
            if v == 0 {
                break;
            }
        }
        if digits.len() - i < width {
            i = digits.len() - width;
        }
        self.write_bytes(&digits[i..])
    }

    /// Write a u16 as four uppercase hex digits, most significant first.
    fn write_hex_u16(&mut self, val: u16) -> Result<(), Self::Error> {
        self.write_bytes(&hex::encode_byte((val >> 8) as u8))?;
        self.write_bytes(&hex::encode_byte((val & 0xff) as u8))
    }
}

impl<S> Serializer for &mut S
where
    S: Serializer,
{
    type Error = S::Error;

    fn write_u8(&mut self, val: u8) -> Result<(), Self::Error> {
        (*self).write_u8(val)
    }

    fn write_bytes(&mut self, val: &[u8]) -> Result<(), Self::Error> {
        (*self).write_bytes(val)
    }

    fn write_dec(&mut self, val: u32, width: usize) -> Result<(), Self::Error> {
        (*self).write_dec(val, width)
    }

    fn write_hex_u16(&mut self, val: u16) -> Result<(), Self::Error> {
        (*self).write_hex_u16(val)
    }
}

/// A serializer that only counts bytes written.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SerializerLength {
    len: usize,
}

impl SerializerLength {
    pub fn new() -> Self {
        SerializerLength { len: 0 }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Default for SerializerLength {
    fn default() -> Self {
        Self::new()
    }
}

impl Serializer for SerializerLength {
    type Error = core::convert::Infallible;

    fn write_u8(&mut self, _val: u8) -> Result<(), Self::Error> {
        self.len += 1;
        Ok(())
    }

    fn write_bytes(&mut self, val: &[u8]) -> Result<(), Self::Error> {
        self.len += val.len();
        Ok(())
    }
}

/// A serializer that also computes a CRC on the side.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SerializerCrc<'a, C, T>
where
    C: CrcStyle + 'a,
{
    digest: C::Digest<'a>,
    inner: T,
}

impl<'a, C, T> SerializerCrc<'a, C, T>
where
    C: CrcStyle + 'a,
{
    pub fn new(crc: &'a C, inner: T) -> Self {
        Self {
            digest: crc.digest(),
            inner,
        }
    }

    pub fn finalize(self) -> (u16, T) {
        (self.digest.finalize(), self.inner)
    }
}

impl<'a, C, T> Serializer for SerializerCrc<'a, C, T>
where
    C: CrcStyle + 'a,
    T: Serializer,
{
    type Error = T::Error;

    fn write_u8(&mut self, val: u8) -> Result<(), Self::Error> {
        self.digest.update(&[val]);
        self.inner.write_u8(val)
    }

    fn write_bytes(&mut self, val: &[u8]) -> Result<(), Self::Error> {
        self.digest.update(val);
        self.inner.write_bytes(val)
    }
}

/// A serializer that hex-encodes everything written through it.
///
/// Each byte comes out as two uppercase hex digits in the inner
/// serializer. Used for frame payloads, which travel in hex form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SerializerHex<T> {
    inner: T,
}

impl<T> SerializerHex<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    pub fn done(self) -> T {
        self.inner
    }
}

impl<T> Serializer for SerializerHex<T>
where
    T: Serializer,
{
    type Error = T::Error;

    fn write_u8(&mut self, val: u8) -> Result<(), Self::Error> {
        self.inner.write_bytes(&hex::encode_byte(val))
    }
}

/// An error from [SerializerSlice] when the slice runs out of room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BufferFull;

/// A serializer backed by a fixed byte slice.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SerializerSlice<'a> {
    buf: &'a mut [u8],
    len: usize,
}

impl<'a> SerializerSlice<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, len: 0 }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn done(self) -> &'a [u8] {
        &self.buf[..self.len]
    }
}

impl<'a> Serializer for SerializerSlice<'a> {
    type Error = BufferFull;

    fn write_u8(&mut self, val: u8) -> Result<(), Self::Error> {
        let slot = self.buf.get_mut(self.len).ok_or(BufferFull)?;
        *slot = val;
        self.len += 1;
        Ok(())
    }

    fn write_bytes(&mut self, val: &[u8]) -> Result<(), Self::Error> {
        let end = self.len + val.len();
        let dst = self.buf.get_mut(self.len..end).ok_or(BufferFull)?;
        dst.copy_from_slice(val);
        self.len = end;
        Ok(())
    }
}

/// Wrap an [embedded_io::Write] to become a Serializer.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SerializerIo<T> {
    inner: T,
}

impl<T> SerializerIo<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    pub fn done(self) -> T {
        self.inner
    }
}

impl<T> Serializer for SerializerIo<T>
where
    T: embedded_io::Write,
{
    type Error = T::Error;

    fn write_u8(&mut self, val: u8) -> Result<(), Self::Error> {
        self.inner.write_all(&[val])
    }

    fn write_bytes(&mut self, val: &[u8]) -> Result<(), Self::Error> {
        self.inner.write_all(val)
    }
}

/// Wrap an [std::io::Write] to become a Serializer.
#[cfg(feature = "std")]
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SerializerWrap<T> {
    inner: T,
}

#[cfg(feature = "std")]
impl<T> SerializerWrap<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    pub fn done(self) -> T {
        self.inner
    }
}

#[cfg(feature = "std")]
impl<T> Serializer for SerializerWrap<T>
where
    T: std::io::Write,
{
    type Error = std::io::Error;

    fn write_u8(&mut self, val: u8) -> Result<(), Self::Error> {
        self.inner.write_all(&[val])
    }

    fn write_bytes(&mut self, val: &[u8]) -> Result<(), Self::Error> {
        self.inner.write_all(val)
    }
}
