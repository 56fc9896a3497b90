//! Message matchers
//!
//! Matchers decide whether a decoded channel message addresses a given input
//! element, and extract the value, the index within a range, and the bank
//! setting the message belongs to.

use crate::address::{AddressError, Cable, Channel, MidiAddress};
use crate::bank::geometry::{bank_index, match_bankable, match_bankable_in_range, range_index};
use crate::bank::BankConfig;
use crate::midi::{ChannelMessage, MessageType};

/// Result of a successful match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Match {
    /// Message value (data2 for two-byte messages, data1 for one-byte ones)
    pub value: u8,
    /// Index within the matched range, 0 for single addresses
    pub index: u8,
    /// Bank setting the message belongs to, 0 when not bankable
    pub bank_index: u8,
}

/// Value of a two-byte message. Note Off always carries value 0, whatever
/// its release velocity.
fn two_byte_value(msg: &ChannelMessage) -> u8 {
    if msg.message_type == MessageType::NoteOff {
        0
    } else {
        msg.data2
    }
}

/// Matcher for messages with two data bytes (Note On/Off, Control Change,
/// Key Pressure), where the first data byte is the address.
#[derive(Debug, Clone)]
pub enum AddressMatcher {
    /// One address
    Single { address: MidiAddress },
    /// `length` consecutive addresses on one channel and cable
    Range { address: MidiAddress, length: u8 },
    /// One address per bank setting
    Bankable { config: BankConfig, address: MidiAddress },
    /// A range of addresses per bank setting
    BankableRange {
        config: BankConfig,
        address: MidiAddress,
        length: u8,
    },
}

impl AddressMatcher {
    pub fn single(address: MidiAddress) -> Self {
        AddressMatcher::Single { address }
    }

    pub fn range(address: MidiAddress, length: u8) -> Result<Self, AddressError> {
        Self::new(address, length, None)
    }

    pub fn bankable(config: BankConfig, address: MidiAddress) -> Self {
        AddressMatcher::Bankable { config, address }
    }

    pub fn bankable_range(config: BankConfig, address: MidiAddress, length: u8) -> Result<Self, AddressError> {
        Self::new(address, length, Some(config))
    }

    /// Pick the matcher shape from an optional range length and an optional
    /// bank. A length of 1 without a bank is the plain single-address case.
    pub fn new(address: MidiAddress, length: u8, bank: Option<BankConfig>) -> Result<Self, AddressError> {
        if length == 0 {
            return Err(AddressError::ZeroRangeLength);
        }
        Ok(match (length, bank) {
            (1, None) => AddressMatcher::Single { address },
            (length, None) => AddressMatcher::Range { address, length },
            (1, Some(config)) => AddressMatcher::Bankable { config, address },
            (length, Some(config)) => AddressMatcher::BankableRange { config, address, length },
        })
    }

    /// Try to match a message, ignoring its type
    pub fn match_message(&self, msg: &ChannelMessage) -> Option<Match> {
        let target = msg.address();
        match self {
            AddressMatcher::Single { address } => {
                MidiAddress::match_single(&target, address).then(|| Match {
                    value: two_byte_value(msg),
                    ..Match::default()
                })
            }
            AddressMatcher::Range { address, length } => {
                if !MidiAddress::match_address_in_range(&target, address, *length) {
                    return None;
                }
                Some(Match {
                    value: two_byte_value(msg),
                    index: msg.data1 - address.address.unwrap_or(0),
                    bank_index: 0,
                })
            }
            AddressMatcher::Bankable { config, address } => {
                if !match_bankable(&target, address, config) {
                    return None;
                }
                Some(Match {
                    value: two_byte_value(msg),
                    index: 0,
                    bank_index: bank_index(&target, address, config),
                })
            }
            AddressMatcher::BankableRange { config, address, length } => {
                if !match_bankable_in_range(&target, address, config, *length) {
                    return None;
                }
                Some(Match {
                    value: two_byte_value(msg),
                    index: range_index(&target, address, config),
                    bank_index: bank_index(&target, address, config),
                })
            }
        }
    }

    /// Base address (bank setting 0, first index of the range)
    pub fn address(&self) -> &MidiAddress {
        match self {
            AddressMatcher::Single { address }
            | AddressMatcher::Range { address, .. }
            | AddressMatcher::Bankable { address, .. }
            | AddressMatcher::BankableRange { address, .. } => address,
        }
    }

    /// Number of indices in the range
    pub fn length(&self) -> u8 {
        match self {
            AddressMatcher::Single { .. } | AddressMatcher::Bankable { .. } => 1,
            AddressMatcher::Range { length, .. } | AddressMatcher::BankableRange { length, .. } => *length,
        }
    }

    pub fn bank_config(&self) -> Option<&BankConfig> {
        match self {
            AddressMatcher::Bankable { config, .. } | AddressMatcher::BankableRange { config, .. } => Some(config),
            _ => None,
        }
    }

    /// Number of bank settings, 1 when not bankable
    pub fn bank_count(&self) -> u8 {
        self.bank_config().map_or(1, |c| c.bank.bank_count())
    }

    /// Active bank setting, 0 when not bankable
    pub fn selection(&self) -> u8 {
        self.bank_config().map_or(0, |c| c.selection())
    }
}

/// Matcher for messages with one data byte (Channel Pressure, Program
/// Change). Only channel and cable are compared; the data byte is the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelMatcher {
    pub address: MidiAddress,
}

impl ChannelMatcher {
    pub fn new(channel: Channel, cable: Cable) -> Self {
        Self {
            address: MidiAddress::channel_cn(channel, cable),
        }
    }

    pub fn match_message(&self, msg: &ChannelMessage) -> Option<Match> {
        MidiAddress::match_single(&msg.channel_cn(), &self.address).then(|| Match {
            value: msg.data1,
            ..Match::default()
        })
    }
}
