/// One 4-channel color sensor reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ColorReading {
    pub clear: u16,
    pub red: u16,
    pub green: u16,
    pub blue: u16,
}

impl ColorReading {
    /// Decode the 8-byte channel register block: clear, red, green,
    /// blue, each as a little-endian u16.
    pub fn from_registers(data: &[u8; 8]) -> Self {
        let ch = |i: usize| u16::from_le_bytes([data[2 * i], data[2 * i + 1]]);
        Self {
            clear: ch(0),
            red: ch(1),
            green: ch(2),
            blue: ch(3),
        }
    }
}
