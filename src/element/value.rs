//! Generic control values (notes, controllers, key pressure, channel
//! pressure, program changes)

use crate::element::{accepts, InputElement};
use crate::matcher::{AddressMatcher, ChannelMatcher, Match};
use crate::midi::{ChannelMessage, MessageType};

/// Matcher used by a [`ControlValue`]
#[derive(Debug, Clone)]
pub enum ValueMatcher {
    /// Channel Pressure and Program Change
    OneByte(ChannelMatcher),
    /// Notes, controllers and key pressure, optionally ranged and bankable
    TwoByte(AddressMatcher),
}

impl ValueMatcher {
    fn match_message(&self, msg: &ChannelMessage) -> Option<Match> {
        match self {
            ValueMatcher::OneByte(m) => m.match_message(msg),
            ValueMatcher::TwoByte(m) => m.match_message(msg),
        }
    }

    fn length(&self) -> u8 {
        match self {
            ValueMatcher::OneByte(_) => 1,
            ValueMatcher::TwoByte(m) => m.length(),
        }
    }

    fn bank_count(&self) -> u8 {
        match self {
            ValueMatcher::OneByte(_) => 1,
            ValueMatcher::TwoByte(m) => m.bank_count(),
        }
    }

    fn selection(&self) -> u8 {
        match self {
            ValueMatcher::OneByte(_) => 0,
            ValueMatcher::TwoByte(m) => m.selection(),
        }
    }
}

/// Latest value received for every (bank setting, range index) cell.
///
/// Messages for inactive bank settings are stored but do not mark the
/// element dirty, since nothing visible changed. Selecting another bank
/// setting marks it dirty on the next tick.
#[derive(Debug, Clone)]
pub struct ControlValue {
    message_type: MessageType,
    matcher: ValueMatcher,
    values: Vec<u8>,
    dirty: bool,
    /// Bank setting shown when the element was last ticked
    shown_bank: u8,
}

impl ControlValue {
    pub fn new(message_type: MessageType, matcher: ValueMatcher) -> Self {
        let cells = matcher.bank_count() as usize * matcher.length() as usize;
        let shown_bank = matcher.selection();
        Self {
            message_type,
            matcher,
            values: vec![0; cells],
            dirty: true,
            shown_bank,
        }
    }

    fn cell(&self, bank: u8, index: u8) -> Option<usize> {
        if bank >= self.matcher.bank_count() || index >= self.matcher.length() {
            return None;
        }
        Some(bank as usize * self.matcher.length() as usize + index as usize)
    }

    /// Value of the first index in the active bank setting
    pub fn value(&self) -> u8 {
        self.value_at(0).unwrap_or(0)
    }

    /// Value of a range index in the active bank setting
    pub fn value_at(&self, index: u8) -> Option<u8> {
        self.value_in(self.matcher.selection(), index)
    }

    /// Value of a range index in any bank setting
    pub fn value_in(&self, bank: u8, index: u8) -> Option<u8> {
        self.cell(bank, index).map(|c| self.values[c])
    }

    pub fn matcher(&self) -> &ValueMatcher {
        &self.matcher
    }
}

impl InputElement for ControlValue {
    fn message_type(&self) -> MessageType {
        self.message_type
    }

    fn update_with(&mut self, msg: &ChannelMessage) -> bool {
        if !accepts(self.message_type, msg.message_type) {
            return false;
        }
        let Some(m) = self.matcher.match_message(msg) else {
            return false;
        };
        if let Some(cell) = self.cell(m.bank_index, m.index) {
            if self.values[cell] != m.value {
                self.values[cell] = m.value;
                if m.bank_index == self.matcher.selection() {
                    self.dirty = true;
                }
            }
        }
        true
    }

    fn tick(&mut self) {
        let selection = self.matcher.selection();
        if selection != self.shown_bank {
            self.shown_bank = selection;
            self.dirty = true;
        }
    }

    fn reset(&mut self) {
        self.values.iter_mut().for_each(|v| *v = 0);
        self.dirty = true;
    }

    fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    fn describe(&self) -> String {
        let length = self.matcher.length();
        if length == 1 {
            return format!("value {}", self.value());
        }
        let values: Vec<String> = (0..length)
            .map(|i| self.value_at(i).unwrap_or(0).to_string())
            .collect();
        format!("values [{}]", values.join(" "))
    }
}
