//! The TCS34725 acquisition state machine.
//!
//! All bus traffic is asynchronous: the machine issues at most one
//! transfer at a time and advances on explicit completion events, so
//! nothing here ever blocks. The state variant itself is the
//! mutual-exclusion flag for the one in-flight transfer.

use tcslib::ColorReading;

use crate::ring::{Sample, SampleRing};

/// TCS34725 seven-bit bus address.
pub const ADDR: u8 = 0x29;

/// Register command bit, set on every register access.
pub const COMMAND_BIT: u8 = 0x80;
/// Auto-increment addressing mode, for the burst channel read.
pub const AUTO_INCREMENT: u8 = 0x20;

/// Register map.
pub mod reg {
    pub const ENABLE: u8 = 0x00;
    pub const ATIME: u8 = 0x01;
    pub const CONTROL: u8 = 0x0f;
    pub const ID: u8 = 0x12;
    /// First of the 8 channel data registers.
    pub const CDATAL: u8 = 0x14;
}

/// The identity the ID register must report.
pub const EXPECTED_ID: u8 = 0x44;

pub const ENABLE_PON: u8 = 0x01;
pub const ENABLE_AEN: u8 = 0x02;

/// CONTROL register values: 1x, 4x, 16x, 60x gain.
pub const GAIN_TABLE: [u8; 4] = [0x00, 0x01, 0x02, 0x03];
/// ATIME register values for the integration time table.
pub const ATIME_TABLE: [u8; 5] = [0xff, 0xf6, 0xd5, 0xc0, 0x00];
/// Integration times implied by [ATIME_TABLE], in milliseconds.
/// The shortest setting is really 2.4 ms, rounded up here.
pub const INTEGRATION_MS: [u32; 5] = [3, 24, 101, 154, 700];

/// Minimum oscillator start-up time after PON, before AEN.
pub const POWERUP_DELAY_MS: u32 = 3;

fn command(register: u8) -> u8 {
    COMMAND_BIT | register
}

fn command_burst(register: u8) -> u8 {
    COMMAND_BIT | AUTO_INCREMENT | register
}

/// Asynchronous register access to the sensor.
///
/// Completions arrive out of band, as calls to
/// [Tcs34725::transfer_complete].
pub trait SensorBus {
    type Error;

    /// True when no transfer is in flight.
    fn is_idle(&mut self) -> bool;

    /// Issue a single register write.
    fn write_register(&mut self, register: u8, value: u8) -> Result<(), Self::Error>;

    /// Begin an asynchronous read of `len` bytes starting at `register`.
    fn start_read(&mut self, register: u8, len: usize) -> Result<(), Self::Error>;
}

/// Where the machine is in its life cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorState {
    /// Identity check; `requested` once the read is in flight.
    InitReadId { requested: bool },
    /// Issuing the configuration writes, one per pass.
    Configuring { step: u8 },
    /// Waiting out the oscillator start-up time after PON.
    PowerupWait { since_ms: u32 },
    /// Idle, a sample read can be requested.
    Ready,
    /// A channel read is in flight.
    Busy,
    /// Identity mismatch. Terminal: sampling never starts.
    Error,
}

/// The sensor driver.
pub struct Tcs34725<B> {
    bus: B,
    state: SensorState,
}

impl<B> Tcs34725<B>
where
    B: SensorBus,
{
    pub fn new(bus: B) -> Self {
        Self {
            bus,
            state: SensorState::InitReadId { requested: false },
        }
    }

    pub fn state(&self) -> SensorState {
        self.state
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// One scheduler pass. Issues at most one transfer, gated on the
    /// bus being idle; bus refusals leave the state unchanged so the
    /// next pass retries.
    pub fn poll(&mut self, gain_index: u8, time_index: u8, now_ms: u32) {
        if !self.bus.is_idle() {
            return;
        }

        match self.state {
            SensorState::InitReadId { requested: false } => {
                if self.bus.start_read(command(reg::ID), 1).is_ok() {
                    self.state = SensorState::InitReadId { requested: true };
                }
            }

            SensorState::Configuring { step } => {
                let issued = match step {
                    0 => self
                        .bus
                        .write_register(command(reg::ATIME), atime_for(time_index)),
                    1 => self
                        .bus
                        .write_register(command(reg::CONTROL), gain_for(gain_index)),
                    _ => self.bus.write_register(command(reg::ENABLE), ENABLE_PON),
                };
                if issued.is_ok() {
                    if step >= 2 {
                        self.state = SensorState::PowerupWait { since_ms: now_ms };
                    } else {
                        self.state = SensorState::Configuring { step: step + 1 };
                    }
                }
            }

            SensorState::PowerupWait { since_ms } => {
                if now_ms.wrapping_sub(since_ms) >= POWERUP_DELAY_MS
                    && self
                        .bus
                        .write_register(command(reg::ENABLE), ENABLE_PON | ENABLE_AEN)
                        .is_ok()
                {
                    self.state = SensorState::Ready;
                }
            }

            _ => {}
        }
    }

    /// Periodic sampling tick: begin a channel read when `Ready`.
    ///
    /// A tick while `Busy` is dropped, never queued; the next tick
    /// retries naturally. A refused transfer leaves the machine
    /// `Ready` for the same reason.
    pub fn request_sample(&mut self) {
        if self.state == SensorState::Ready
            && self.bus.is_idle()
            && self.bus.start_read(command_burst(reg::CDATAL), 8).is_ok()
        {
            self.state = SensorState::Busy;
        }
    }

    /// An asynchronous read finished with `data`.
    pub fn transfer_complete<const N: usize>(
        &mut self,
        data: &[u8],
        now_ms: u32,
        ring: &mut SampleRing<N>,
    ) {
        match self.state {
            SensorState::InitReadId { requested: true } => {
                if data.first() == Some(&EXPECTED_ID) {
                    self.state = SensorState::Configuring { step: 0 };
                } else {
                    self.state = SensorState::Error;
                }
            }

            SensorState::Busy => {
                if let Ok(block) = <&[u8; 8]>::try_from(data) {
                    ring.put(Sample {
                        reading: ColorReading::from_registers(block),
                        timestamp_ms: now_ms,
                    });
                }
                self.state = SensorState::Ready;
            }

            _ => {}
        }
    }

    /// Push a new gain index to the hardware. Write refusals are
    /// ignored; the index is re-applied at the next reconfiguration.
    pub fn apply_gain(&mut self, gain_index: u8) {
        let _ = self
            .bus
            .write_register(command(reg::CONTROL), gain_for(gain_index));
    }

    /// Push a new integration time index to the hardware.
    pub fn apply_integration_time(&mut self, time_index: u8) {
        let _ = self
            .bus
            .write_register(command(reg::ATIME), atime_for(time_index));
    }
}

fn gain_for(index: u8) -> u8 {
    GAIN_TABLE.get(index as usize).copied().unwrap_or(GAIN_TABLE[1])
}

fn atime_for(index: u8) -> u8 {
    ATIME_TABLE.get(index as usize).copied().unwrap_or(ATIME_TABLE[3])
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Debug, Default)]
    struct MockBus {
        idle: bool,
        refuse: bool,
        writes: Vec<(u8, u8)>,
        reads: Vec<(u8, usize)>,
    }

    impl MockBus {
        fn new() -> Self {
            Self {
                idle: true,
                ..Self::default()
            }
        }
    }

    impl SensorBus for MockBus {
        type Error = ();

        fn is_idle(&mut self) -> bool {
            self.idle
        }

        fn write_register(&mut self, register: u8, value: u8) -> Result<(), ()> {
            if self.refuse {
                return Err(());
            }
            self.writes.push((register, value));
            Ok(())
        }

        fn start_read(&mut self, register: u8, len: usize) -> Result<(), ()> {
            if self.refuse {
                return Err(());
            }
            self.reads.push((register, len));
            Ok(())
        }
    }

    fn bring_up(sensor: &mut Tcs34725<MockBus>) -> u32 {
        let mut ring: SampleRing<4> = SampleRing::new();
        sensor.poll(1, 3, 0);
        sensor.transfer_complete(&[EXPECTED_ID], 0, &mut ring);
        sensor.poll(1, 3, 1); // ATIME
        sensor.poll(1, 3, 2); // CONTROL
        sensor.poll(1, 3, 3); // ENABLE = PON
        sensor.poll(1, 3, 10); // past the powerup wait
        10
    }

    #[test]
    fn init_sequence() {
        let mut sensor = Tcs34725::new(MockBus::new());
        bring_up(&mut sensor);
        assert_eq!(sensor.state(), SensorState::Ready);
        assert_eq!(sensor.bus_mut().reads, vec![(COMMAND_BIT | reg::ID, 1)]);
        assert_eq!(
            sensor.bus_mut().writes,
            vec![
                (COMMAND_BIT | reg::ATIME, 0xc0),
                (COMMAND_BIT | reg::CONTROL, 0x01),
                (COMMAND_BIT | reg::ENABLE, ENABLE_PON),
                (COMMAND_BIT | reg::ENABLE, ENABLE_PON | ENABLE_AEN),
            ]
        );
    }

    #[test]
    fn wrong_identity_is_terminal() {
        let mut sensor = Tcs34725::new(MockBus::new());
        let mut ring: SampleRing<4> = SampleRing::new();
        sensor.poll(1, 3, 0);
        sensor.transfer_complete(&[0x12], 0, &mut ring);
        assert_eq!(sensor.state(), SensorState::Error);
        // nothing moves it again
        sensor.poll(1, 3, 100);
        sensor.request_sample();
        assert_eq!(sensor.state(), SensorState::Error);
        assert!(sensor.bus_mut().writes.is_empty());
    }

    #[test]
    fn powerup_wait_is_respected() {
        let mut sensor = Tcs34725::new(MockBus::new());
        let mut ring: SampleRing<4> = SampleRing::new();
        sensor.poll(1, 3, 0);
        sensor.transfer_complete(&[EXPECTED_ID], 0, &mut ring);
        sensor.poll(1, 3, 0);
        sensor.poll(1, 3, 0);
        sensor.poll(1, 3, 100);
        assert!(matches!(sensor.state(), SensorState::PowerupWait { .. }));
        // 2 ms after the PON write: still waiting
        sensor.poll(1, 3, 102);
        assert!(matches!(sensor.state(), SensorState::PowerupWait { .. }));
        sensor.poll(1, 3, 103);
        assert_eq!(sensor.state(), SensorState::Ready);
    }

    #[test]
    fn sample_cycle() {
        let mut sensor = Tcs34725::new(MockBus::new());
        bring_up(&mut sensor);
        let mut ring: SampleRing<4> = SampleRing::new();

        sensor.request_sample();
        assert_eq!(sensor.state(), SensorState::Busy);
        assert_eq!(
            sensor.bus_mut().reads.last(),
            Some(&(COMMAND_BIT | AUTO_INCREMENT | reg::CDATAL, 8))
        );

        sensor.transfer_complete(&[0x01, 0x00, 0x02, 0x00, 0x03, 0x00, 0x04, 0x00], 50, &mut ring);
        assert_eq!(sensor.state(), SensorState::Ready);
        let sample = ring.latest().unwrap();
        assert_eq!(sample.timestamp_ms, 50);
        assert_eq!(sample.reading.clear, 1);
        assert_eq!(sample.reading.red, 2);
        assert_eq!(sample.reading.green, 3);
        assert_eq!(sample.reading.blue, 4);
    }

    #[test]
    fn tick_while_busy_is_dropped() {
        let mut sensor = Tcs34725::new(MockBus::new());
        bring_up(&mut sensor);
        sensor.request_sample();
        let issued = sensor.bus_mut().reads.len();
        sensor.request_sample();
        assert_eq!(sensor.bus_mut().reads.len(), issued);
        assert_eq!(sensor.state(), SensorState::Busy);
    }

    #[test]
    fn refused_read_stays_ready() {
        let mut sensor = Tcs34725::new(MockBus::new());
        bring_up(&mut sensor);
        sensor.bus_mut().refuse = true;
        sensor.request_sample();
        assert_eq!(sensor.state(), SensorState::Ready);
        // the next tick can try again
        sensor.bus_mut().refuse = false;
        sensor.request_sample();
        assert_eq!(sensor.state(), SensorState::Busy);
    }

    #[test]
    fn busy_bus_defers_init() {
        let mut bus = MockBus::new();
        bus.idle = false;
        let mut sensor = Tcs34725::new(bus);
        sensor.poll(1, 3, 0);
        assert_eq!(sensor.state(), SensorState::InitReadId { requested: false });
        sensor.bus_mut().idle = true;
        sensor.poll(1, 3, 1);
        assert_eq!(sensor.state(), SensorState::InitReadId { requested: true });
    }
}
