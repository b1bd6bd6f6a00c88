//! Core types used throughout vrlib.
//!
//! These are the module-level concepts (record slots, groups, output
//! settings) that appear in command arguments and decoded responses.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Identifier of a trained voice command slot.
///
/// The valid range is defined by the module firmware (0-254 on the V3).
pub type RecordId = u8;

/// Byte value the firmware uses for "no record" in slot listings.
pub const EMPTY_SLOT: u8 = 0xFF;

/// Number of records the recognizer can hold loaded at once.
pub const RECOGNIZER_CAPACITY: usize = 7;

/// A user-defined group of records.
///
/// User groups are numbered 0-7. [`Group::ALL`] addresses every user group
/// at once in queries that accept it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Group(u8);

impl Group {
    /// Highest user group number.
    pub const MAX: u8 = 7;

    /// Sentinel addressing all user groups.
    pub const ALL: Group = Group(0xFF);

    /// Create a user group, validating the range.
    pub fn new(index: u8) -> Result<Self> {
        if index <= Self::MAX {
            Ok(Group(index))
        } else {
            Err(Error::InvalidParameter(format!(
                "user group {index} out of range 0-{}",
                Self::MAX
            )))
        }
    }

    /// Return the raw wire value.
    pub fn value(&self) -> u8 {
        self.0
    }

    /// Returns `true` for the [`Group::ALL`] sentinel.
    pub fn is_all(&self) -> bool {
        self.0 == Self::ALL.0
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_all() {
            write!(f, "all")
        } else {
            write!(f, "user-{}", self.0)
        }
    }
}

/// A factory-defined group of records (0-10 on the V3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SystemGroup(u8);

impl SystemGroup {
    /// Highest system group number.
    pub const MAX: u8 = 0x0A;

    /// Create a system group, validating the range.
    pub fn new(index: u8) -> Result<Self> {
        if index <= Self::MAX {
            Ok(SystemGroup(index))
        } else {
            Err(Error::InvalidParameter(format!(
                "system group {index} out of range 0-{}",
                Self::MAX
            )))
        }
    }

    /// Return the raw wire value.
    pub fn value(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for SystemGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "system-{}", self.0)
    }
}

/// Group recognition mode.
///
/// When enabled, recognizing a record that belongs to a group switches the
/// recognizer to that group's members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupControl {
    /// Group mode off.
    Disabled,
    /// Follow a system group.
    System(SystemGroup),
    /// Follow a user group.
    User(Group),
}

impl GroupControl {
    /// Wire value of [`GroupControl::Disabled`].
    pub const DISABLED: u8 = 0xFF;

    /// Offset added to a user group number on the wire.
    pub const USER_BASE: u8 = 0x80;

    /// Encode as the single control byte sent to the module.
    pub fn to_byte(&self) -> u8 {
        match self {
            GroupControl::Disabled => Self::DISABLED,
            GroupControl::System(g) => g.value(),
            GroupControl::User(g) => Self::USER_BASE | g.value(),
        }
    }

    /// Decode a control byte reported by the module.
    pub fn from_byte(byte: u8) -> Result<Self> {
        match byte {
            Self::DISABLED => Ok(GroupControl::Disabled),
            0x80..=0x87 => Ok(GroupControl::User(Group::new(byte - Self::USER_BASE)?)),
            _ => SystemGroup::new(byte)
                .map(GroupControl::System)
                .map_err(|_| {
                    Error::MalformedFrame(format!("invalid group control byte 0x{byte:02X}"))
                }),
        }
    }
}

impl fmt::Display for GroupControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupControl::Disabled => write!(f, "disabled"),
            GroupControl::System(g) => write!(f, "{g}"),
            GroupControl::User(g) => write!(f, "{g}"),
        }
    }
}

/// Behavior of the module's output pins when a record is recognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IoMode {
    /// Pulse the pin for the configured pulse width.
    Pulse,
    /// Toggle the pin level.
    Toggle,
    /// Drive the pin high.
    Set,
    /// Drive the pin low.
    Clear,
}

impl IoMode {
    /// Encode as the wire byte.
    pub fn to_byte(&self) -> u8 {
        match self {
            IoMode::Pulse => 0,
            IoMode::Toggle => 1,
            IoMode::Set => 2,
            IoMode::Clear => 3,
        }
    }

    /// Decode the wire byte.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(IoMode::Pulse),
            1 => Some(IoMode::Toggle),
            2 => Some(IoMode::Set),
            3 => Some(IoMode::Clear),
            _ => None,
        }
    }
}

impl fmt::Display for IoMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IoMode::Pulse => "pulse",
            IoMode::Toggle => "toggle",
            IoMode::Set => "set",
            IoMode::Clear => "clear",
        };
        write!(f, "{s}")
    }
}

/// Error returned when a string cannot be parsed into an [`IoMode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIoModeError(String);

impl fmt::Display for ParseIoModeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown IO mode: {}", self.0)
    }
}

impl std::error::Error for ParseIoModeError {}

impl FromStr for IoMode {
    type Err = ParseIoModeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pulse" => Ok(IoMode::Pulse),
            "toggle" => Ok(IoMode::Toggle),
            "set" => Ok(IoMode::Set),
            "clear" => Ok(IoMode::Clear),
            _ => Err(ParseIoModeError(s.to_string())),
        }
    }
}

/// Output pulse width level, 0-15.
///
/// Level 0 is the shortest pulse (10 ms on the V3); higher levels lengthen it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PulseWidth(u8);

impl PulseWidth {
    /// Highest pulse width level.
    pub const MAX: u8 = 15;

    /// Create a pulse width level, validating the range.
    pub fn new(level: u8) -> Result<Self> {
        if level <= Self::MAX {
            Ok(PulseWidth(level))
        } else {
            Err(Error::InvalidParameter(format!(
                "pulse width level {level} out of range 0-{}",
                Self::MAX
            )))
        }
    }

    /// Return the level.
    pub fn level(&self) -> u8 {
        self.0
    }
}

/// Serial baud rates supported by the module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaudRate {
    B2400,
    B4800,
    B9600,
    B19200,
    B38400,
}

impl BaudRate {
    /// Baud rate in bits per second.
    pub fn bps(&self) -> u32 {
        match self {
            BaudRate::B2400 => 2400,
            BaudRate::B4800 => 4800,
            BaudRate::B9600 => 9600,
            BaudRate::B19200 => 19200,
            BaudRate::B38400 => 38400,
        }
    }

    /// Look up a supported rate from bits per second.
    pub fn from_bps(bps: u32) -> Result<Self> {
        match bps {
            2400 => Ok(BaudRate::B2400),
            4800 => Ok(BaudRate::B4800),
            9600 => Ok(BaudRate::B9600),
            19200 => Ok(BaudRate::B19200),
            38400 => Ok(BaudRate::B38400),
            _ => Err(Error::InvalidParameter(format!(
                "unsupported baud rate {bps}"
            ))),
        }
    }

    /// Encode as the module's baud rate index.
    pub fn to_byte(&self) -> u8 {
        match self {
            BaudRate::B2400 => 1,
            BaudRate::B4800 => 2,
            BaudRate::B9600 => 3,
            BaudRate::B19200 => 4,
            BaudRate::B38400 => 5,
        }
    }

    /// Decode the module's baud rate index. Index 0 is the factory
    /// default and means 9600.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 | 3 => Some(BaudRate::B9600),
            1 => Some(BaudRate::B2400),
            2 => Some(BaudRate::B4800),
            4 => Some(BaudRate::B19200),
            5 => Some(BaudRate::B38400),
            _ => None,
        }
    }
}

impl fmt::Display for BaudRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bps())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_range() {
        assert_eq!(Group::new(0).unwrap().value(), 0);
        assert_eq!(Group::new(7).unwrap().value(), 7);
        assert!(matches!(Group::new(8), Err(Error::InvalidParameter(_))));
        assert!(Group::ALL.is_all());
        assert!(!Group::new(3).unwrap().is_all());
    }

    #[test]
    fn group_display() {
        assert_eq!(Group::new(2).unwrap().to_string(), "user-2");
        assert_eq!(Group::ALL.to_string(), "all");
        assert_eq!(SystemGroup::new(10).unwrap().to_string(), "system-10");
    }

    #[test]
    fn system_group_range() {
        assert!(SystemGroup::new(0x0A).is_ok());
        assert!(SystemGroup::new(0x0B).is_err());
    }

    #[test]
    fn group_control_bytes() {
        assert_eq!(GroupControl::Disabled.to_byte(), 0xFF);
        assert_eq!(
            GroupControl::System(SystemGroup::new(3).unwrap()).to_byte(),
            0x03
        );
        assert_eq!(GroupControl::User(Group::new(5).unwrap()).to_byte(), 0x85);
    }

    #[test]
    fn group_control_decode() {
        assert_eq!(GroupControl::from_byte(0xFF).unwrap(), GroupControl::Disabled);
        assert_eq!(
            GroupControl::from_byte(0x87).unwrap(),
            GroupControl::User(Group::new(7).unwrap())
        );
        assert_eq!(
            GroupControl::from_byte(0x00).unwrap(),
            GroupControl::System(SystemGroup::new(0).unwrap())
        );
        assert!(matches!(
            GroupControl::from_byte(0x40),
            Err(Error::MalformedFrame(_))
        ));
        assert!(GroupControl::from_byte(0x88).is_err());
    }

    #[test]
    fn io_mode_bytes() {
        for mode in [IoMode::Pulse, IoMode::Toggle, IoMode::Set, IoMode::Clear] {
            assert_eq!(IoMode::from_byte(mode.to_byte()), Some(mode));
        }
        assert_eq!(IoMode::from_byte(4), None);
    }

    #[test]
    fn io_mode_parse() {
        assert_eq!("Toggle".parse::<IoMode>().unwrap(), IoMode::Toggle);
        assert!("blink".parse::<IoMode>().is_err());
    }

    #[test]
    fn pulse_width_range() {
        assert_eq!(PulseWidth::new(15).unwrap().level(), 15);
        assert!(PulseWidth::new(16).is_err());
    }

    #[test]
    fn baud_rate_codes() {
        assert_eq!(BaudRate::B2400.to_byte(), 1);
        assert_eq!(BaudRate::B38400.to_byte(), 5);
        assert_eq!(BaudRate::from_byte(0), Some(BaudRate::B9600));
        assert_eq!(BaudRate::from_byte(3), Some(BaudRate::B9600));
        assert_eq!(BaudRate::from_byte(6), None);
    }

    #[test]
    fn baud_rate_from_bps() {
        assert_eq!(BaudRate::from_bps(19200).unwrap(), BaudRate::B19200);
        assert!(matches!(
            BaudRate::from_bps(115_200),
            Err(Error::InvalidParameter(_))
        ));
        assert_eq!(BaudRate::B4800.to_string(), "4800");
    }
}
