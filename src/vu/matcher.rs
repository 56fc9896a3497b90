//! Matchers for VU meter messages, where the track lives in the upper
//! nibble of the data byte

use crate::address::{AddressError, Cable, Channel, MidiAddress};
use crate::bank::geometry::{bank_index, match_bankable};
use crate::bank::BankConfig;
use crate::midi::ChannelMessage;

/// Output of the VU matchers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VuMatch {
    /// Code to update the meter with [0x0, 0xF]
    pub data: u8,
    /// Bank setting of the message, 0 when not bankable
    pub bank_index: u8,
}

/// Address of the track a Channel Pressure message refers to
fn track_address(msg: &ChannelMessage) -> MidiAddress {
    MidiAddress {
        address: Some(msg.data1 >> 4),
        channel: Some(msg.channel),
        cable: Some(msg.cable),
    }
}

fn checked_track(track: u8) -> Result<u8, AddressError> {
    if track > 7 {
        return Err(AddressError::TrackOutOfRange(track));
    }
    Ok(track)
}

/// Matches the VU messages of one track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VuMatcher {
    pub address: MidiAddress,
}

impl VuMatcher {
    /// `track` is zero-based [0, 7]
    pub fn new(track: u8, channel: Channel, cable: Cable) -> Result<Self, AddressError> {
        Ok(Self {
            address: MidiAddress::new(checked_track(track)?, channel, cable)?,
        })
    }

    pub fn match_message(&self, msg: &ChannelMessage) -> Option<VuMatch> {
        MidiAddress::match_single(&track_address(msg), &self.address).then(|| VuMatch {
            data: msg.data1 & 0x0F,
            bank_index: 0,
        })
    }
}

/// Matches the VU messages of one track in every bank setting
#[derive(Debug, Clone)]
pub struct BankableVuMatcher {
    pub config: BankConfig,
    pub address: MidiAddress,
}

impl BankableVuMatcher {
    /// `track` is the zero-based track of bank setting 0
    pub fn new(config: BankConfig, track: u8, channel: Channel, cable: Cable) -> Result<Self, AddressError> {
        Ok(Self {
            config,
            address: MidiAddress::new(checked_track(track)?, channel, cable)?,
        })
    }

    pub fn match_message(&self, msg: &ChannelMessage) -> Option<VuMatch> {
        let target = track_address(msg);
        if !match_bankable(&target, &self.address, &self.config) {
            return None;
        }
        Some(VuMatch {
            data: msg.data1 & 0x0F,
            bank_index: bank_index(&target, &self.address, &self.config),
        })
    }

    pub fn bank_count(&self) -> u8 {
        self.config.bank.bank_count()
    }

    /// Active bank setting
    pub fn selection(&self) -> u8 {
        self.config.selection()
    }
}
