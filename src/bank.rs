//! Banks
//!
//! A bank groups `tracks_per_bank` consecutive addresses, channels, or cable
//! numbers into one page of a control surface. The selection is owned by
//! whoever switches banks (buttons, a config, a test); elements only read it.

pub mod geometry;

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::address::AddressError;

/// Which part of the address advances by `tracks_per_bank` per bank setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BankType {
    /// Consecutive addresses (note or controller numbers)
    ChangeAddress,
    /// Consecutive MIDI channels
    ChangeChannel,
    /// Consecutive cable numbers
    #[serde(alias = "change_cable_number")]
    ChangeCable,
}

impl fmt::Display for BankType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BankType::ChangeAddress => write!(f, "change_address"),
            BankType::ChangeChannel => write!(f, "change_channel"),
            BankType::ChangeCable => write!(f, "change_cable"),
        }
    }
}

/// Shared bank handle.
///
/// Clones share the same selection, so the bank manager and every element
/// built from it always observe the current setting.
#[derive(Debug, Clone)]
pub struct Bank {
    bank_count: u8,
    tracks_per_bank: u8,
    selection: Arc<AtomicU8>,
}

impl Bank {
    /// Create a bank with `bank_count` settings of `tracks_per_bank` tracks,
    /// starting at setting 0
    pub fn new(bank_count: u8, tracks_per_bank: u8) -> Result<Self, AddressError> {
        if bank_count == 0 {
            return Err(AddressError::ZeroBankCount);
        }
        if tracks_per_bank == 0 {
            return Err(AddressError::ZeroTracksPerBank);
        }
        Ok(Self {
            bank_count,
            tracks_per_bank,
            selection: Arc::new(AtomicU8::new(0)),
        })
    }

    /// Number of bank settings (N)
    pub fn bank_count(&self) -> u8 {
        self.bank_count
    }

    /// Number of tracks per bank setting (T)
    pub fn tracks_per_bank(&self) -> u8 {
        self.tracks_per_bank
    }

    /// Currently selected bank setting [0, N)
    pub fn selection(&self) -> u8 {
        self.selection.load(Ordering::Relaxed)
    }

    /// Select a bank setting
    pub fn select(&self, setting: u8) -> Result<(), AddressError> {
        if setting >= self.bank_count {
            return Err(AddressError::SelectionOutOfRange {
                selection: setting,
                count: self.bank_count,
            });
        }
        let previous = self.selection.swap(setting, Ordering::Relaxed);
        if previous != setting {
            debug!("Bank selection {} → {}", previous, setting);
        }
        Ok(())
    }

    /// Total span of addresses covered by all settings (N * T)
    pub(crate) fn span(&self) -> u16 {
        self.bank_count as u16 * self.tracks_per_bank as u16
    }
}

/// A bank together with the dimension it changes
#[derive(Debug, Clone)]
pub struct BankConfig {
    pub bank: Bank,
    pub bank_type: BankType,
}

impl BankConfig {
    pub fn new(bank: Bank, bank_type: BankType) -> Self {
        Self { bank, bank_type }
    }

    /// Currently selected bank setting, re-read on every call
    pub fn selection(&self) -> u8 {
        self.bank.selection()
    }
}
