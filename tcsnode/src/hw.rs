//! Hardware collaborator traits.

/// The LED output pin.
pub trait LedPin {
    /// Drive the pin.
    fn set_on(&mut self, on: bool);

    /// The actual pin level, read back from the hardware.
    fn is_on(&self) -> bool;
}

/// The periodic sampling tick source.
pub trait SampleTimer {
    /// Arm the timer.
    fn start(&mut self);

    /// Disarm the timer.
    fn stop(&mut self);

    /// Change the tick period. Takes effect from the next tick.
    fn set_period_ms(&mut self, period_ms: u32);
}
