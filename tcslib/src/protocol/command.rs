//! The closed command set.

/// A command a host can send to the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// Arm the periodic sampling timer.
    Start,
    /// Disarm the periodic sampling timer.
    Stop,
    /// Set the sampling interval, in milliseconds.
    SetInterval,
    /// Query the sampling interval.
    GetInterval,
    /// Set the gain table index.
    SetGain,
    /// Query the gain table index.
    GetGain,
    /// Set the integration time table index.
    SetTime,
    /// Query the integration time table index.
    GetTime,
    /// Drive the LED pin.
    SetLed,
    /// Query the actual LED pin level.
    GetLed,
    /// Read the most recent sample.
    ReadRaw,
    /// Read an archived sample by time offset.
    ReadArchive,
}

impl Command {
    pub const ALL: [Command; 12] = [
        Command::Start,
        Command::Stop,
        Command::SetInterval,
        Command::GetInterval,
        Command::SetGain,
        Command::GetGain,
        Command::SetTime,
        Command::GetTime,
        Command::SetLed,
        Command::GetLed,
        Command::ReadRaw,
        Command::ReadArchive,
    ];

    /// The command name as it travels in the decoded payload.
    pub fn name(self) -> &'static [u8] {
        match self {
            Command::Start => b"START",
            Command::Stop => b"STOP",
            Command::SetInterval => b"SETINT",
            Command::GetInterval => b"GETINT",
            Command::SetGain => b"SETGAIN",
            Command::GetGain => b"GETGAIN",
            Command::SetTime => b"SETTIME",
            Command::GetTime => b"GETTIME",
            Command::SetLed => b"SETLED",
            Command::GetLed => b"GETLED",
            Command::ReadRaw => b"RDRAW",
            Command::ReadArchive => b"RDARC",
        }
    }

    /// Expected parameter block width after the command name.
    pub fn param_len(self) -> usize {
        match self {
            Command::SetInterval | Command::ReadArchive => 5,
            Command::SetGain | Command::SetTime | Command::SetLed => 1,
            _ => 0,
        }
    }

    /// Full-string, case-sensitive lookup by command name.
    pub fn from_name(name: &[u8]) -> Option<Command> {
        Self::ALL.iter().copied().find(|c| c.name() == name)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn lookup_is_exact() {
        assert_eq!(Command::from_name(b"START"), Some(Command::Start));
        assert_eq!(Command::from_name(b"RDARC"), Some(Command::ReadArchive));
        // prefixes, suffixes and lowercase do not match
        assert_eq!(Command::from_name(b"STAR"), None);
        assert_eq!(Command::from_name(b"START0"), None);
        assert_eq!(Command::from_name(b"start"), None);
        assert_eq!(Command::from_name(b""), None);
    }

    #[test]
    fn names_round_trip() {
        for c in Command::ALL {
            assert_eq!(Command::from_name(c.name()), Some(c));
        }
    }

    #[test]
    fn parameter_widths() {
        assert_eq!(Command::SetInterval.param_len(), 5);
        assert_eq!(Command::ReadArchive.param_len(), 5);
        assert_eq!(Command::SetGain.param_len(), 1);
        assert_eq!(Command::SetTime.param_len(), 1);
        assert_eq!(Command::SetLed.param_len(), 1);
        assert_eq!(Command::Start.param_len(), 0);
        assert_eq!(Command::ReadRaw.param_len(), 0);
    }
}
