//! The time-indexed sample ring buffer.

use tcslib::ColorReading;

/// How many samples the node keeps.
pub const CAPACITY: usize = 600;

/// One stored sensor reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Sample {
    pub reading: ColorReading,
    /// Monotonic millisecond tick at acquisition.
    pub timestamp_ms: u32,
}

const EMPTY: Sample = Sample {
    reading: ColorReading {
        clear: 0,
        red: 0,
        green: 0,
        blue: 0,
    },
    timestamp_ms: 0,
};

/// A failed time-offset lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OffsetError {
    /// Offset zero, or beyond what the ring can ever cover.
    OutOfRange,
    /// Nothing old enough is stored.
    NotFound,
}

/// A fixed-capacity ring of the most recent samples, oldest
/// overwritten on overflow.
///
/// Single producer (the sensor completion handler), so walking from
/// oldest to newest the timestamps are non-decreasing.
#[derive(Debug, Clone)]
pub struct SampleRing<const N: usize = CAPACITY> {
    entries: [Sample; N],
    /// Next write slot.
    head: usize,
    count: usize,
}

impl<const N: usize> SampleRing<N> {
    pub const fn new() -> Self {
        Self {
            entries: [EMPTY; N],
            head: 0,
            count: 0,
        }
    }

    /// Append a sample, overwriting the oldest once full.
    pub fn put(&mut self, sample: Sample) {
        self.entries[self.head] = sample;
        self.head = (self.head + 1) % N;
        if self.count < N {
            self.count += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.count == N
    }

    pub fn capacity(&self) -> usize {
        N
    }

    /// The most recently stored sample.
    pub fn latest(&self) -> Option<&Sample> {
        if self.count == 0 {
            return None;
        }
        Some(&self.entries[(self.head + N - 1) % N])
    }

    /// The newest sample at least `offset_ms` old.
    ///
    /// Offsets of zero, or beyond `capacity * interval_ms` (older
    /// than anything the ring could still hold), are out of range.
    /// Scans backward from the newest entry for the first timestamp
    /// at or before `now_ms - offset_ms`.
    pub fn by_time_offset(
        &self,
        offset_ms: u32,
        now_ms: u32,
        interval_ms: u32,
    ) -> Result<&Sample, OffsetError> {
        if offset_ms == 0 || offset_ms as u64 > N as u64 * interval_ms as u64 {
            return Err(OffsetError::OutOfRange);
        }

        let target = now_ms.checked_sub(offset_ms).ok_or(OffsetError::NotFound)?;

        for back in 0..self.count {
            let idx = (self.head + N - 1 - back) % N;
            if self.entries[idx].timestamp_ms <= target {
                return Ok(&self.entries[idx]);
            }
        }
        Err(OffsetError::NotFound)
    }
}

impl<const N: usize> Default for SampleRing<N> {
    fn default() -> Self {
        Self::new()
    }
}
