//! VU meter input elements

use tracing::trace;

use crate::element::{accepts, InputElement};
use crate::midi::{ChannelMessage, MessageType};
use crate::timer::{Clock, SystemClock, Timer};
use crate::vu::{decay, BankableVuMatcher, VuChange, VuMatch, VuMatcher, VuState};

fn describe_state(state: &VuState) -> String {
    let bar: String = (0..VuState::MAX_LEVEL)
        .map(|i| if i < state.level() { '#' } else { '.' })
        .collect();
    let overload = if state.overload() { " OVL" } else { "" };
    format!("[{}] {:>2}{}", bar, state.level(), overload)
}

/// VU meter of a single track.
///
/// A new level restarts the decay timer, so the first decay step happens one
/// full interval after the last level update.
#[derive(Debug, Clone)]
pub struct VuMeter<C = SystemClock> {
    matcher: VuMatcher,
    state: VuState,
    dirty: bool,
    decay_timer: Timer<C>,
}

impl<C: Clock> VuMeter<C> {
    /// `decay_ms` is the time per decay step, [`decay::HOLD`] disables decay
    pub fn new(matcher: VuMatcher, decay_ms: u64, clock: C) -> Self {
        Self {
            matcher,
            state: VuState::default(),
            dirty: true,
            decay_timer: Timer::new(decay_ms, clock),
        }
    }

    /// Apply a matched update
    pub fn handle_update(&mut self, m: VuMatch) {
        let changed = self.state.update(m.data);
        if changed == VuChange::NothingChanged {
            return;
        }
        if changed == VuChange::ValueChanged {
            self.decay_timer.begin_next_period();
        }
        self.dirty = true;
    }

    /// Most recent level [0, 12]
    pub fn level(&self) -> u8 {
        self.state.level()
    }

    pub fn overload(&self) -> bool {
        self.state.overload()
    }

    pub fn value(&self) -> u8 {
        self.level()
    }

    /// Level as a fraction [0, 1]
    pub fn float_level(&self) -> f32 {
        self.level() as f32 / VuState::MAX_LEVEL as f32
    }

    pub fn matcher(&self) -> &VuMatcher {
        &self.matcher
    }
}

impl<C: Clock> InputElement for VuMeter<C> {
    fn message_type(&self) -> MessageType {
        MessageType::ChannelPressure
    }

    fn update_with(&mut self, msg: &ChannelMessage) -> bool {
        if !accepts(self.message_type(), msg.message_type) {
            return false;
        }
        match self.matcher.match_message(msg) {
            Some(m) => {
                self.handle_update(m);
                true
            }
            None => false,
        }
    }

    fn tick(&mut self) {
        if self.decay_timer.interval() != decay::HOLD && self.decay_timer.poll() {
            self.dirty |= self.state.decay();
        }
    }

    fn reset(&mut self) {
        self.state = VuState::default();
        self.dirty = true;
    }

    fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    fn describe(&self) -> String {
        describe_state(&self.state)
    }
}

/// VU meter of a single track with one state per bank setting.
///
/// Every setting is updated when a message for it arrives, so switching banks
/// shows current data right away. Only the active setting decays: the decay
/// timer is restarted by level changes in the active setting only, and each
/// tick decays the active setting only. Inactive settings keep their level
/// until they are updated or selected. Selecting another bank setting marks
/// the meter dirty on the next tick.
#[derive(Debug, Clone)]
pub struct BankableVuMeter<C = SystemClock> {
    matcher: BankableVuMatcher,
    states: Vec<VuState>,
    dirty: bool,
    decay_timer: Timer<C>,
    /// Bank setting shown when the meter was last ticked
    shown_bank: u8,
}

impl<C: Clock> BankableVuMeter<C> {
    pub fn new(matcher: BankableVuMatcher, decay_ms: u64, clock: C) -> Self {
        let states = vec![VuState::default(); matcher.bank_count() as usize];
        let shown_bank = matcher.selection();
        Self {
            matcher,
            states,
            dirty: true,
            decay_timer: Timer::new(decay_ms, clock),
            shown_bank,
        }
    }

    /// Active bank setting, re-read from the bank on every call
    pub fn active_bank(&self) -> u8 {
        self.matcher.selection()
    }

    /// Apply a matched update to the bank setting it addresses
    pub fn handle_update(&mut self, m: VuMatch) {
        let active = self.active_bank();
        let Some(state) = self.states.get_mut(m.bank_index as usize) else {
            return;
        };
        let changed = state.update(m.data);
        if changed == VuChange::NothingChanged {
            return;
        }
        if changed == VuChange::ValueChanged && m.bank_index == active {
            self.decay_timer.begin_next_period();
        }
        self.dirty = true;
    }

    fn active_state(&self) -> VuState {
        self.states
            .get(self.active_bank() as usize)
            .copied()
            .unwrap_or_default()
    }

    /// Level of the active bank setting
    pub fn level(&self) -> u8 {
        self.active_state().level()
    }

    /// Overload indicator of the active bank setting
    pub fn overload(&self) -> bool {
        self.active_state().overload()
    }

    pub fn level_in(&self, bank: u8) -> Option<u8> {
        self.states.get(bank as usize).map(VuState::level)
    }

    pub fn overload_in(&self, bank: u8) -> Option<bool> {
        self.states.get(bank as usize).map(VuState::overload)
    }

    pub fn value(&self) -> u8 {
        self.level()
    }

    pub fn float_level(&self) -> f32 {
        self.level() as f32 / VuState::MAX_LEVEL as f32
    }

    pub fn matcher(&self) -> &BankableVuMatcher {
        &self.matcher
    }
}

impl<C: Clock> InputElement for BankableVuMeter<C> {
    fn message_type(&self) -> MessageType {
        MessageType::ChannelPressure
    }

    fn update_with(&mut self, msg: &ChannelMessage) -> bool {
        if !accepts(self.message_type(), msg.message_type) {
            return false;
        }
        match self.matcher.match_message(msg) {
            Some(m) => {
                self.handle_update(m);
                true
            }
            None => false,
        }
    }

    fn tick(&mut self) {
        let active = self.active_bank();
        if active != self.shown_bank {
            self.shown_bank = active;
            self.dirty = true;
        }
        if self.decay_timer.interval() == decay::HOLD || !self.decay_timer.poll() {
            return;
        }
        if let Some(state) = self.states.get_mut(active as usize) {
            if state.decay() {
                trace!("Bank {} decayed to {}", active, state.level());
                self.dirty = true;
            }
        }
    }

    fn reset(&mut self) {
        self.states.iter_mut().for_each(|s| *s = VuState::default());
        self.dirty = true;
    }

    fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    fn describe(&self) -> String {
        format!("{} (bank {})", describe_state(&self.active_state()), self.active_bank() + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::{Cable, Channel};
    use crate::bank::{Bank, BankConfig, BankType};
    use crate::timer::ManualClock;

    fn pressure(data1: u8) -> ChannelMessage {
        ChannelMessage::parse(&[0xD0, data1], Cable::CABLE_1).unwrap()
    }

    fn meter(track: u8, decay_ms: u64, clock: &ManualClock) -> VuMeter<ManualClock> {
        let matcher = VuMatcher::new(track, Channel::CHANNEL_1, Cable::CABLE_1).unwrap();
        let mut meter = VuMeter::new(matcher, decay_ms, clock.clone());
        meter.clear_dirty();
        meter
    }

    /// 4 banks of 1 track each, meter on track 0
    fn bankable(decay_ms: u64, clock: &ManualClock) -> (Bank, BankableVuMeter<ManualClock>) {
        let bank = Bank::new(4, 1).unwrap();
        let config = BankConfig::new(bank.clone(), BankType::ChangeAddress);
        let matcher = BankableVuMatcher::new(config, 0, Channel::CHANNEL_1, Cable::CABLE_1).unwrap();
        let mut meter = BankableVuMeter::new(matcher, decay_ms, clock.clone());
        meter.clear_dirty();
        (bank, meter)
    }

    #[test]
    fn test_starts_dirty() {
        let clock = ManualClock::new();
        let matcher = VuMatcher::new(0, Channel::CHANNEL_1, Cable::CABLE_1).unwrap();
        let meter = VuMeter::new(matcher, decay::DEFAULT, clock);
        assert!(meter.is_dirty());
        assert_eq!(meter.level(), 0);
    }

    #[test]
    fn test_update_sets_level_and_dirty() {
        let clock = ManualClock::new();
        let mut meter = meter(3, decay::DEFAULT, &clock);

        assert!(meter.update_with(&pressure(0x38)));
        assert_eq!(meter.level(), 8);
        assert!((meter.float_level() - 8.0 / 12.0).abs() < f32::EPSILON);
        assert!(meter.is_dirty());

        meter.clear_dirty();
        assert!(meter.update_with(&pressure(0x38)));
        assert!(!meter.is_dirty());

        // other track, other message type
        assert!(!meter.update_with(&pressure(0x28)));
        let cc = ChannelMessage::parse(&[0xB0, 0x38, 1], Cable::CABLE_1).unwrap();
        assert!(!meter.update_with(&cc));
    }

    #[test]
    fn test_overload_marks_dirty() {
        let clock = ManualClock::new();
        let mut meter = meter(0, decay::DEFAULT, &clock);
        meter.update_with(&pressure(0x0E));
        assert!(meter.overload());
        assert!(meter.is_dirty());
        meter.clear_dirty();
        meter.update_with(&pressure(0x0D));
        assert!(!meter.is_dirty());
    }

    #[test]
    fn test_decay_one_interval_after_last_update() {
        let clock = ManualClock::new();
        let mut meter = meter(0, 150, &clock);

        clock.advance(100);
        meter.update_with(&pressure(0x05));
        meter.clear_dirty();

        // 150 ms since construction, but only 50 ms since the update
        clock.advance(50);
        meter.tick();
        assert_eq!(meter.level(), 5);
        assert!(!meter.is_dirty());

        clock.advance(100);
        meter.tick();
        assert_eq!(meter.level(), 4);
        assert!(meter.is_dirty());

        clock.advance(150);
        meter.tick();
        assert_eq!(meter.level(), 3);
    }

    #[test]
    fn test_overload_does_not_restart_decay() {
        let clock = ManualClock::new();
        let mut meter = meter(0, 150, &clock);
        meter.update_with(&pressure(0x05));

        clock.advance(100);
        meter.update_with(&pressure(0x0E));
        clock.advance(50);
        meter.tick();
        assert_eq!(meter.level(), 4);
    }

    #[test]
    fn test_hold_never_decays() {
        let clock = ManualClock::new();
        let mut meter = meter(0, decay::HOLD, &clock);
        meter.update_with(&pressure(0x0C));
        meter.clear_dirty();

        for _ in 0..20 {
            clock.advance(1000);
            meter.tick();
        }
        assert_eq!(meter.level(), 12);
        assert!(!meter.is_dirty());
    }

    #[test]
    fn test_decay_at_zero_is_not_dirty() {
        let clock = ManualClock::new();
        let mut meter = meter(0, 10, &clock);
        clock.advance(10);
        meter.tick();
        assert!(!meter.is_dirty());
    }

    #[test]
    fn test_reset() {
        let clock = ManualClock::new();
        let mut meter = meter(0, decay::DEFAULT, &clock);
        meter.update_with(&pressure(0x07));
        meter.update_with(&pressure(0x0E));
        meter.clear_dirty();

        meter.reset();
        assert_eq!(meter.level(), 0);
        assert!(!meter.overload());
        assert!(meter.is_dirty());
    }

    #[test]
    fn test_describe() {
        let clock = ManualClock::new();
        let mut meter = meter(0, decay::DEFAULT, &clock);
        meter.update_with(&pressure(0x03));
        meter.update_with(&pressure(0x0E));
        assert_eq!(meter.describe(), "[###.........]  3 OVL");
    }

    #[test]
    fn test_bankable_updates_inactive_bank_without_restarting_decay() {
        let clock = ManualClock::new();
        let (_bank, mut meter) = bankable(150, &clock);

        // bank 0 active, level 6
        meter.update_with(&pressure(0x06));
        meter.clear_dirty();

        // 100 ms later bank 1 gets a level; the active timer keeps running
        clock.advance(100);
        assert!(meter.update_with(&pressure(0x19)));
        assert_eq!(meter.level_in(1), Some(9));
        assert!(meter.is_dirty());
        assert_eq!(meter.level(), 6);
        meter.clear_dirty();

        // one interval after the bank 0 update, not after the bank 1 update
        clock.advance(50);
        meter.tick();
        assert_eq!(meter.level_in(0), Some(5));
        assert!(meter.is_dirty());

        // bank 1 never decays while inactive
        for _ in 0..10 {
            clock.advance(150);
            meter.tick();
        }
        assert_eq!(meter.level_in(0), Some(0));
        assert_eq!(meter.level_in(1), Some(9));
    }

    #[test]
    fn test_bankable_tick_dirty_only_for_active_bank() {
        let clock = ManualClock::new();
        let (_bank, mut meter) = bankable(100, &clock);

        meter.update_with(&pressure(0x2A));
        meter.clear_dirty();

        clock.advance(100);
        meter.tick();
        assert!(!meter.is_dirty());
        assert_eq!(meter.level_in(2), Some(10));
    }

    #[test]
    fn test_bankable_switching_banks() {
        let clock = ManualClock::new();
        let (bank, mut meter) = bankable(100, &clock);

        meter.update_with(&pressure(0x34));
        meter.update_with(&pressure(0x3E));
        assert_eq!(meter.level(), 0);
        assert!(!meter.overload());

        bank.select(3).unwrap();
        assert_eq!(meter.active_bank(), 3);
        assert_eq!(meter.level(), 4);
        assert!(meter.overload());
        meter.clear_dirty();

        clock.advance(100);
        meter.tick();
        assert_eq!(meter.level(), 3);
        assert!(meter.is_dirty());
        assert!(meter.describe().ends_with("(bank 4)"));
    }

    #[test]
    fn test_bankable_bank_switch_marks_dirty_on_tick() {
        let clock = ManualClock::new();
        let (bank, mut meter) = bankable(decay::HOLD, &clock);

        meter.update_with(&pressure(0x17));
        meter.clear_dirty();

        bank.select(1).unwrap();
        meter.tick();
        assert!(meter.is_dirty());
        assert_eq!(meter.level(), 7);

        meter.clear_dirty();
        meter.tick();
        assert!(!meter.is_dirty());
    }

    #[test]
    fn test_bankable_reset_clears_every_bank() {
        let clock = ManualClock::new();
        let (_bank, mut meter) = bankable(decay::HOLD, &clock);
        for data1 in [0x01, 0x12, 0x23, 0x3E] {
            meter.update_with(&pressure(data1));
        }
        meter.clear_dirty();

        meter.reset();
        for bank in 0..4 {
            assert_eq!(meter.level_in(bank), Some(0));
            assert_eq!(meter.overload_in(bank), Some(false));
        }
        assert_eq!(meter.level_in(4), None);
        assert!(meter.is_dirty());
    }
}
