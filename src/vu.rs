//! Mackie Control Universal VU meters
//!
//! VU levels arrive as Channel Pressure messages:
//!
//! | Status      | Data 1      |
//! |:-----------:|:-----------:|
//! | `1101 cccc` | `0hhh llll` |
//!
//! `cccc` is the MIDI channel, `hhh` the track [0, 7] and `llll` the code.
//! Codes `0x0` to `0xC` set the level (0% to 100%), `0xD` has no meaning,
//! `0xE` sets the overload indicator and `0xF` clears it.

mod matcher;
mod meter;

pub use matcher::{BankableVuMatcher, VuMatch, VuMatcher};
pub use meter::{BankableVuMeter, VuMeter};

/// Decay times in milliseconds per step
pub mod decay {
    /// Never decay, hold the latest value until a new one arrives
    pub const HOLD: u64 = 0;
    /// The protocol uses 300 ms per division and two steps per division
    pub const DEFAULT: u64 = 150;
}

/// What an update changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VuChange {
    NothingChanged,
    ValueChanged,
    OverloadChanged,
}

/// Level and overload indicator of one VU meter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VuState {
    level: u8,
    overload: bool,
}

impl VuState {
    pub const MAX_LEVEL: u8 = 12;

    /// Levels above [`VuState::MAX_LEVEL`] are clamped
    pub fn new(level: u8, overload: bool) -> Self {
        Self {
            level: level.min(Self::MAX_LEVEL),
            overload,
        }
    }

    /// Level [0, 12]
    pub fn level(&self) -> u8 {
        self.level
    }

    pub fn overload(&self) -> bool {
        self.overload
    }

    /// Apply a 4-bit code (track bits already masked out).
    pub fn update(&mut self, data: u8) -> VuChange {
        match data & 0x0F {
            0xF => {
                let changed = self.overload;
                self.overload = false;
                change_if(changed, VuChange::OverloadChanged)
            }
            0xE => {
                let changed = !self.overload;
                self.overload = true;
                change_if(changed, VuChange::OverloadChanged)
            }
            0xD => VuChange::NothingChanged,
            level => {
                let changed = self.level != level;
                self.level = level;
                change_if(changed, VuChange::ValueChanged)
            }
        }
    }

    /// Drop the level by one step. Returns true if it changed.
    pub fn decay(&mut self) -> bool {
        if self.level == 0 {
            return false;
        }
        self.level -= 1;
        true
    }
}

fn change_if(changed: bool, change: VuChange) -> VuChange {
    if changed {
        change
    } else {
        VuChange::NothingChanged
    }
}
