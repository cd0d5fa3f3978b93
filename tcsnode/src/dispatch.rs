//! Command execution against the node state.

use tcslib::protocol::crc::CrcCcitt;
use tcslib::protocol::{frame, Address, Command, ErrorCode, Frame, Reply, ReplyData};

use crate::hw::{LedPin, SampleTimer};
use crate::ring::{OffsetError, SampleRing, CAPACITY};
use crate::sensor::{SensorBus, Tcs34725, INTEGRATION_MS};

/// The acquisition settings a host can change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Index into the sensor gain table.
    pub gain_index: u8,
    /// Index into the integration time table.
    pub time_index: u8,
    /// Sampling period in milliseconds.
    pub interval_ms: u32,
}

impl Config {
    /// Power-on settings: 4x gain, 154 ms integration, one sample a
    /// second.
    pub const fn new() -> Self {
        Self {
            gain_index: 1,
            time_index: 3,
            interval_ms: 1000,
        }
    }

    /// The integration time the current index implies.
    pub fn integration_ms(&self) -> u32 {
        INTEGRATION_MS
            .get(self.time_index as usize)
            .copied()
            .unwrap_or(INTEGRATION_MS[3])
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

/// The whole node: settings, sample storage, the sensor machine and
/// the hardware seams, with command dispatch on top.
///
/// The event entry points mirror the interrupt sources; the main loop
/// calls [poll][Self::poll] and [process_frame][Self::process_frame].
pub struct Node<B, L, T, const N: usize = CAPACITY> {
    config: Config,
    ring: SampleRing<N>,
    sensor: Tcs34725<B>,
    led: L,
    timer: T,
    crc: CrcCcitt,
}

impl<B, L, T, const N: usize> Node<B, L, T, N>
where
    B: SensorBus,
    L: LedPin,
    T: SampleTimer,
{
    pub fn new(bus: B, led: L, timer: T) -> Self {
        Self {
            config: Config::new(),
            ring: SampleRing::new(),
            sensor: Tcs34725::new(bus),
            led,
            timer,
            crc: CrcCcitt::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn ring(&self) -> &SampleRing<N> {
        &self.ring
    }

    pub fn sensor(&self) -> &Tcs34725<B> {
        &self.sensor
    }

    pub fn sensor_mut(&mut self) -> &mut Tcs34725<B> {
        &mut self.sensor
    }

    pub fn led(&self) -> &L {
        &self.led
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    /// One main-loop pass: advance the sensor machine.
    pub fn poll(&mut self, now_ms: u32) {
        self.sensor
            .poll(self.config.gain_index, self.config.time_index, now_ms);
    }

    /// The periodic sampling timer fired.
    pub fn on_timer_tick(&mut self) {
        self.sensor.request_sample();
    }

    /// A sensor bus read finished.
    pub fn on_transfer_complete(&mut self, data: &[u8], now_ms: u32) {
        self.sensor.transfer_complete(data, now_ms, &mut self.ring);
    }

    /// Run one captured frame span through validation and execution.
    ///
    /// `None` means stay silent; anything structurally answerable gets
    /// a reply, success or error.
    pub fn process_frame(&mut self, span: &[u8], now_ms: u32) -> Option<Reply> {
        match frame::parse(&self.crc, span, Address::DEVICE) {
            Ok(frame) => Some(self.execute(&frame, now_ms)),
            Err(err) => err.reply(Address::DEVICE),
        }
    }

    /// Execute a validated frame. Always answers.
    pub fn execute(&mut self, frame: &Frame, now_ms: u32) -> Reply {
        let data = match frame.command {
            Command::Start => {
                self.timer.start();
                ReplyData::Ok
            }

            Command::Stop => {
                self.timer.stop();
                ReplyData::Ok
            }

            Command::SetInterval => match parse_dec(frame.params()) {
                // the sensor cannot finish an integration inside a
                // shorter interval
                Some(ms) if ms == 0 || ms <= self.config.integration_ms() => {
                    ReplyData::Error(ErrorCode::Timing)
                }
                Some(ms) => {
                    self.config.interval_ms = ms;
                    self.timer.set_period_ms(ms);
                    ReplyData::Ok
                }
                None => ReplyData::Error(ErrorCode::Command),
            },

            Command::GetInterval => ReplyData::Interval(self.config.interval_ms),

            Command::SetGain => match frame.params() {
                [d @ b'0'..=b'3'] => {
                    self.config.gain_index = d - b'0';
                    self.sensor.apply_gain(self.config.gain_index);
                    ReplyData::Ok
                }
                _ => ReplyData::Error(ErrorCode::Command),
            },

            Command::GetGain => ReplyData::Gain(self.config.gain_index),

            Command::SetTime => match frame.params() {
                [d @ b'0'..=b'4'] => {
                    let index = d - b'0';
                    let integration = INTEGRATION_MS
                        .get(index as usize)
                        .copied()
                        .unwrap_or(INTEGRATION_MS[3]);
                    if self.config.interval_ms <= integration {
                        ReplyData::Error(ErrorCode::Timing)
                    } else {
                        self.config.time_index = index;
                        self.sensor.apply_integration_time(index);
                        ReplyData::Ok
                    }
                }
                _ => ReplyData::Error(ErrorCode::Command),
            },

            Command::GetTime => ReplyData::Time(self.config.time_index),

            Command::SetLed => match frame.params() {
                [b'0'] => {
                    self.led.set_on(false);
                    ReplyData::Ok
                }
                [b'1'] => {
                    self.led.set_on(true);
                    ReplyData::Ok
                }
                _ => ReplyData::Error(ErrorCode::Command),
            },

            // answer with the pin as it actually sits, not a shadow
            Command::GetLed => ReplyData::Led(self.led.is_on()),

            Command::ReadRaw => match self.ring.latest() {
                Some(sample) => ReplyData::Answer(sample.reading),
                None => ReplyData::NoData,
            },

            Command::ReadArchive => match parse_dec(frame.params()) {
                Some(offset_ms) => {
                    match self
                        .ring
                        .by_time_offset(offset_ms, now_ms, self.config.interval_ms)
                    {
                        Ok(sample) => ReplyData::Answer(sample.reading),
                        Err(OffsetError::OutOfRange) => ReplyData::Error(ErrorCode::Position),
                        Err(OffsetError::NotFound) => ReplyData::NoData,
                    }
                }
                None => ReplyData::Error(ErrorCode::Command),
            },
        };

        Reply {
            sender: Address::DEVICE,
            receiver: frame.sender,
            frame_id: frame.frame_id,
            data,
        }
    }
}

/// A fixed-width decimal parameter block. The validator has already
/// enforced the width, not the digits.
fn parse_dec(params: &[u8]) -> Option<u32> {
    if params.is_empty() {
        return None;
    }
    params.iter().try_fold(0u32, |acc, d| {
        if d.is_ascii_digit() {
            Some(acc * 10 + (*d - b'0') as u32)
        } else {
            None
        }
    })
}
