/// Generic CRC style, for sealing and checking frames.
pub trait CrcStyle {
    type Digest<'a>: CrcDigest
    where
        Self: 'a;

    fn digest<'a>(&'a self) -> Self::Digest<'a>;

    fn validate(&self, calculated: u16, provided: u16) -> bool {
        calculated == provided
    }
}

/// Interface for a CRC digest.
pub trait CrcDigest {
    fn update(&mut self, bytes: &[u8]);
    fn finalize(self) -> u16;
}

impl<C> CrcStyle for &C
where
    C: CrcStyle,
{
    type Digest<'a> = C::Digest<'a> where Self: 'a;

    fn digest<'a>(&'a self) -> Self::Digest<'a> {
        (*self).digest()
    }

    fn validate(&self, calculated: u16, provided: u16) -> bool {
        (*self).validate(calculated, provided)
    }
}

/// A CRC that is always a specific given value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CrcConstant(pub u16);

impl CrcStyle for CrcConstant {
    type Digest<'a> = CrcConstant;

    fn digest<'a>(&'a self) -> Self::Digest<'a> {
        CrcConstant(self.0)
    }
}

impl CrcDigest for CrcConstant {
    fn update(&mut self, _bytes: &[u8]) {}

    fn finalize(self) -> u16 {
        self.0
    }
}

/// A CRC that is always a specific given value, and always validates.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CrcConstantIgnore(pub u16);

impl CrcStyle for CrcConstantIgnore {
    type Digest<'a> = CrcConstant;

    fn digest<'a>(&'a self) -> Self::Digest<'a> {
        CrcConstant(self.0)
    }

    fn validate(&self, _calculated: u16, _provided: u16) -> bool {
        true
    }
}

/// The CRC16-CCITT used on sensor frames: polynomial 0x1021, initial
/// value 0, no final xor. This is the XModem variant.
#[derive(Clone)]
pub struct CrcCcitt(crc::Crc<u16>);

/// A CRC16-CCITT digest struct.
#[derive(Clone)]
pub struct CrcCcittDigest<'a>(crc::Digest<'a, u16, crc::Table<1>>);

impl CrcCcitt {
    pub fn new() -> Self {
        Self(crc::Crc::<u16>::new(&crc::CRC_16_XMODEM))
    }
}

impl Default for CrcCcitt {
    fn default() -> Self {
        Self::new()
    }
}

impl CrcStyle for CrcCcitt {
    type Digest<'a> = CrcCcittDigest<'a>;

    fn digest<'a>(&'a self) -> Self::Digest<'a> {
        CrcCcittDigest(self.0.digest())
    }
}

impl<'a> CrcDigest for CrcCcittDigest<'a> {
    fn update(&mut self, bytes: &[u8]) {
        self.0.update(bytes)
    }

    fn finalize(self) -> u16 {
        self.0.finalize()
    }
}
