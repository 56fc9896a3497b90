//! MIDI addresses
//!
//! A MIDI address is the triple (address, channel, cable number) an incoming
//! channel message is matched against. Each field may be left unset, which
//! makes it a wildcard in single-address matching and invalid in range and
//! bankable matching.

use std::fmt;

use thiserror::Error;

/// Errors raised when constructing addresses, banks, or matchers from
/// out-of-range values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("MIDI channel {0} is out of range (must be 0-15)")]
    ChannelOutOfRange(u8),
    #[error("MIDI channel number {0} is out of range (must be 1-16)")]
    ChannelNumberOutOfRange(u8),
    #[error("cable number {0} is out of range (must be 0-15)")]
    CableOutOfRange(u8),
    #[error("address {0} is out of range (must be 0-127)")]
    AddressOutOfRange(u8),
    #[error("VU track {0} is out of range (must be 0-7)")]
    TrackOutOfRange(u8),
    #[error("a bank needs at least one bank setting")]
    ZeroBankCount,
    #[error("a bank needs at least one track per bank")]
    ZeroTracksPerBank,
    #[error("bank selection {selection} is out of range (bank has {count} settings)")]
    SelectionOutOfRange { selection: u8, count: u8 },
    #[error("range length must be at least 1")]
    ZeroRangeLength,
}

/// MIDI channel, stored zero-based (0-15)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Channel(u8);

impl Channel {
    pub const CHANNEL_1: Channel = Channel(0);

    /// Create a channel from a zero-based index
    pub fn new(index: u8) -> Result<Self, AddressError> {
        if index > 15 {
            return Err(AddressError::ChannelOutOfRange(index));
        }
        Ok(Self(index))
    }

    /// Create a channel from the one-based number shown to users (1-16)
    pub fn from_number(number: u8) -> Result<Self, AddressError> {
        match number {
            1..=16 => Ok(Self(number - 1)),
            _ => Err(AddressError::ChannelNumberOutOfRange(number)),
        }
    }

    /// Low nibble of a status byte
    pub fn from_status(status: u8) -> Self {
        Self(status & 0x0F)
    }

    /// Zero-based channel index, the raw value on the wire
    pub fn raw(self) -> u8 {
        self.0
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ch{}", self.0 + 1)
    }
}

/// USB MIDI cable number (virtual port), stored zero-based (0-15)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cable(u8);

impl Cable {
    pub const CABLE_1: Cable = Cable(0);

    pub fn new(index: u8) -> Result<Self, AddressError> {
        if index > 15 {
            return Err(AddressError::CableOutOfRange(index));
        }
        Ok(Self(index))
    }

    pub fn raw(self) -> u8 {
        self.0
    }
}

impl fmt::Display for Cable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cn{}", self.0 + 1)
    }
}

/// Address triple of a channel message: (address in bank, channel, cable).
///
/// `None` fields are wildcards for [`MidiAddress::match_single`]. Range and
/// bankable matching only accept addresses where every field is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MidiAddress {
    pub address: Option<u8>,
    pub channel: Option<Channel>,
    pub cable: Option<Cable>,
}

impl MidiAddress {
    /// Fully specified address
    pub fn new(address: u8, channel: Channel, cable: Cable) -> Result<Self, AddressError> {
        if address > 127 {
            return Err(AddressError::AddressOutOfRange(address));
        }
        Ok(Self {
            address: Some(address),
            channel: Some(channel),
            cable: Some(cable),
        })
    }

    /// Address that only cares about channel and cable, used by one-byte
    /// messages such as Channel Pressure
    pub fn channel_cn(channel: Channel, cable: Cable) -> Self {
        Self {
            address: None,
            channel: Some(channel),
            cable: Some(cable),
        }
    }

    /// True when no field is a wildcard
    pub fn is_valid(&self) -> bool {
        self.address.is_some() && self.channel.is_some() && self.cable.is_some()
    }

    /// Every field set in `target` must equal the same field of `candidate`.
    pub fn match_single(candidate: &MidiAddress, target: &MidiAddress) -> bool {
        fn field<T: PartialEq>(candidate: Option<T>, target: Option<T>) -> bool {
            match target {
                None => true,
                Some(t) => candidate == Some(t),
            }
        }
        field(candidate.address, target.address)
            && field(candidate.channel, target.channel)
            && field(candidate.cable, target.cable)
    }

    /// Address of `candidate` lies in `[base.address, base.address + length)`
    /// on exactly the same channel and cable.
    pub fn match_address_in_range(candidate: &MidiAddress, base: &MidiAddress, length: u8) -> bool {
        if !candidate.is_valid() || !base.is_valid() {
            return false;
        }
        let (Some(address), Some(start)) = (candidate.address, base.address) else {
            return false;
        };
        candidate.channel == base.channel
            && candidate.cable == base.cable
            && in_range(address, start, length)
    }
}

/// `value` lies in `[base, base + length)`; compares before subtracting.
pub(crate) fn in_range(value: u8, base: u8, length: u8) -> bool {
    value >= base && value - base < length
}

impl fmt::Display for MidiAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.address {
            Some(a) => write!(f, "0x{:02X}", a)?,
            None => write!(f, "*")?,
        }
        match self.channel {
            Some(c) => write!(f, " {}", c)?,
            None => write!(f, " ch*")?,
        }
        match self.cable {
            Some(c) => write!(f, " {}", c),
            None => write!(f, " cn*"),
        }
    }
}
