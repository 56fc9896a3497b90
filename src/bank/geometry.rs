//! Bank-relative address matching
//!
//! Consider a bank with 4 tracks per bank (T), 2 bank settings (N) and a base
//! address of 3:
//!
//! ```text
//! 0   1   2   3   4   5   6   7   8   9  10  11  12  ...
//! .   .   .   X   .   .   .   X   .   .   .   .   .  ...
//! ```
//!
//! Addresses before the base (0, 1, 2) and from `base + N * T` on (11, 12)
//! never match. Addresses whose distance to the base is not a multiple of T
//! (4, 5, 6, 8, 9, 10) are between bank settings and do not match either.
//!
//! Which field is compared this way depends on the [`BankType`]; the other
//! two fields must be equal.

use crate::address::{in_range, MidiAddress};
use crate::bank::{Bank, BankConfig, BankType};

/// The field that changes between bank settings
fn varying_field(address: &MidiAddress, bank_type: BankType) -> Option<u8> {
    match bank_type {
        BankType::ChangeAddress => address.address,
        BankType::ChangeChannel => address.channel.map(|c| c.raw()),
        BankType::ChangeCable => address.cable.map(|c| c.raw()),
    }
}

/// `to_match` is exactly on a bank setting relative to `base`.
///
/// Equivalent to [`match_bankable_setting_in_range`] with a length of 1.
pub fn match_bankable_setting(to_match: u8, base: u8, bank: &Bank) -> bool {
    match_bankable_setting_in_range(to_match, base, bank, 1)
}

/// `to_match` lies within the first `length` tracks of a bank setting
/// relative to `base`.
pub fn match_bankable_setting_in_range(to_match: u8, base: u8, bank: &Bank, length: u8) -> bool {
    if to_match < base {
        return false;
    }
    let diff = (to_match - base) as u16;
    let tracks = bank.tracks_per_bank() as u16;
    diff < bank.span() && diff % tracks < length as u16
}

/// Check whether `target` belongs to one of the bank settings of `base`.
///
/// Both addresses must be fully specified.
pub fn match_bankable(target: &MidiAddress, base: &MidiAddress, config: &BankConfig) -> bool {
    if !target.is_valid() || !base.is_valid() {
        return false;
    }
    let fixed_fields_equal = match config.bank_type {
        BankType::ChangeAddress => target.channel == base.channel && target.cable == base.cable,
        BankType::ChangeChannel => target.address == base.address && target.cable == base.cable,
        BankType::ChangeCable => target.address == base.address && target.channel == base.channel,
    };
    let (Some(t), Some(b)) = (
        varying_field(target, config.bank_type),
        varying_field(base, config.bank_type),
    ) else {
        return false;
    };
    fixed_fields_equal && match_bankable_setting(t, b, &config.bank)
}

/// Check whether `target` belongs to one of the bank settings of the range of
/// `length` addresses starting at `base`.
///
/// With [`BankType::ChangeAddress`] the range lives inside each bank setting,
/// so the address may land anywhere in the first `length` tracks of a
/// setting. With the channel and cable types the address range is fixed and
/// the channel or cable must sit exactly on a bank setting.
pub fn match_bankable_in_range(target: &MidiAddress, base: &MidiAddress, config: &BankConfig, length: u8) -> bool {
    if !target.is_valid() || !base.is_valid() {
        return false;
    }
    let (Some(address), Some(base_address)) = (target.address, base.address) else {
        return false;
    };
    let bank = &config.bank;
    match config.bank_type {
        BankType::ChangeAddress => {
            target.channel == base.channel
                && target.cable == base.cable
                && match_bankable_setting_in_range(address, base_address, bank, length)
        }
        BankType::ChangeChannel => {
            let (Some(ch), Some(base_ch)) = (target.channel, base.channel) else {
                return false;
            };
            in_range(address, base_address, length)
                && target.cable == base.cable
                && match_bankable_setting(ch.raw(), base_ch.raw(), bank)
        }
        BankType::ChangeCable => {
            let (Some(cn), Some(base_cn)) = (target.cable, base.cable) else {
                return false;
            };
            in_range(address, base_address, length)
                && target.channel == base.channel
                && match_bankable_setting(cn.raw(), base_cn.raw(), bank)
        }
    }
}

/// Bank setting of `target` relative to `base`.
///
/// Only meaningful after [`match_bankable`] or [`match_bankable_in_range`]
/// accepted the pair.
pub fn bank_index(target: &MidiAddress, base: &MidiAddress, config: &BankConfig) -> u8 {
    let t = varying_field(target, config.bank_type).unwrap_or(0);
    let b = varying_field(base, config.bank_type).unwrap_or(0);
    debug_assert!(t >= b, "bank_index called on a non-matching address");
    t.saturating_sub(b) / config.bank.tracks_per_bank()
}

/// Index of `target` inside the range starting at `base`.
///
/// Only meaningful after [`match_bankable_in_range`] accepted the pair.
pub fn range_index(target: &MidiAddress, base: &MidiAddress, config: &BankConfig) -> u8 {
    let t = target.address.unwrap_or(0);
    let b = base.address.unwrap_or(0);
    debug_assert!(t >= b, "range_index called on a non-matching address");
    let diff = t.saturating_sub(b);
    match config.bank_type {
        BankType::ChangeAddress => diff % config.bank.tracks_per_bank(),
        BankType::ChangeChannel | BankType::ChangeCable => diff,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::{Cable, Channel};
    use proptest::prelude::*;

    fn addr(address: u8, channel: u8, cable: u8) -> MidiAddress {
        MidiAddress::new(address, Channel::new(channel).unwrap(), Cable::new(cable).unwrap()).unwrap()
    }

    fn config(count: u8, tracks: u8, bank_type: BankType) -> BankConfig {
        BankConfig::new(Bank::new(count, tracks).unwrap(), bank_type)
    }

    /// Base address and the address `steps` positions further along the
    /// varying dimension
    fn step(base: MidiAddress, bank_type: BankType, steps: u8) -> MidiAddress {
        let mut target = base;
        match bank_type {
            BankType::ChangeAddress => target.address = base.address.map(|a| a + steps),
            BankType::ChangeChannel => {
                target.channel = base.channel.map(|c| Channel::new(c.raw() + steps).unwrap())
            }
            BankType::ChangeCable => target.cable = base.cable.map(|c| Cable::new(c.raw() + steps).unwrap()),
        }
        target
    }

    #[test]
    fn test_change_address_scenario() {
        let cfg = config(4, 2, BankType::ChangeAddress);
        let base = addr(10, 0, 0);

        let hit = addr(14, 0, 0);
        assert!(match_bankable(&hit, &base, &cfg));
        assert_eq!(bank_index(&hit, &base, &cfg), 2);

        // diff = 3 is between bank settings
        assert!(!match_bankable(&addr(13, 0, 0), &base, &cfg));
        // diff = 8 = N * T is past the last bank
        assert!(!match_bankable(&addr(18, 0, 0), &base, &cfg));
        // before the base
        assert!(!match_bankable(&addr(8, 0, 0), &base, &cfg));
        // wrong channel or cable
        assert!(!match_bankable(&addr(14, 1, 0), &base, &cfg));
        assert!(!match_bankable(&addr(14, 0, 1), &base, &cfg));
    }

    #[test]
    fn test_change_channel() {
        let cfg = config(4, 2, BankType::ChangeChannel);
        let base = addr(0x20, 1, 0);

        let hit = addr(0x20, 5, 0);
        assert!(match_bankable(&hit, &base, &cfg));
        assert_eq!(bank_index(&hit, &base, &cfg), 2);

        assert!(!match_bankable(&addr(0x20, 4, 0), &base, &cfg));
        assert!(!match_bankable(&addr(0x20, 9, 0), &base, &cfg));
        assert!(!match_bankable(&addr(0x20, 0, 0), &base, &cfg));
        assert!(!match_bankable(&addr(0x21, 5, 0), &base, &cfg));
    }

    #[test]
    fn test_change_cable() {
        let cfg = config(3, 1, BankType::ChangeCable);
        let base = addr(0x20, 0, 0);

        for cable in 0..3 {
            let hit = addr(0x20, 0, cable);
            assert!(match_bankable(&hit, &base, &cfg));
            assert_eq!(bank_index(&hit, &base, &cfg), cable);
        }
        assert!(!match_bankable(&addr(0x20, 0, 3), &base, &cfg));
        assert!(!match_bankable(&addr(0x20, 1, 1), &base, &cfg));
    }

    #[test]
    fn test_wildcards_never_match_bankable() {
        let cfg = config(4, 2, BankType::ChangeAddress);
        let base = addr(10, 0, 0);
        let wildcard = MidiAddress::channel_cn(Channel::CHANNEL_1, Cable::CABLE_1);
        assert!(!match_bankable(&wildcard, &base, &cfg));
        assert!(!match_bankable(&base, &wildcard, &cfg));
        assert!(!match_bankable_in_range(&wildcard, &base, &cfg, 2));
    }

    #[test]
    fn test_range_change_address() {
        // 4 banks of 8 tracks, range of 3 starting at 16
        let cfg = config(4, 8, BankType::ChangeAddress);
        let base = addr(16, 0, 0);

        let hit = addr(16 + 8 * 2 + 1, 0, 0);
        assert!(match_bankable_in_range(&hit, &base, &cfg, 3));
        assert_eq!(bank_index(&hit, &base, &cfg), 2);
        assert_eq!(range_index(&hit, &base, &cfg), 1);

        // fourth track of a setting is outside the range
        assert!(!match_bankable_in_range(&addr(16 + 8 + 3, 0, 0), &base, &cfg, 3));
        assert!(!match_bankable_in_range(&addr(16 + 32, 0, 0), &base, &cfg, 3));
        assert!(!match_bankable_in_range(&addr(15, 0, 0), &base, &cfg, 3));
    }

    #[test]
    fn test_range_change_channel() {
        let cfg = config(4, 2, BankType::ChangeChannel);
        let base = addr(40, 0, 0);

        let hit = addr(42, 4, 0);
        assert!(match_bankable_in_range(&hit, &base, &cfg, 4));
        assert_eq!(bank_index(&hit, &base, &cfg), 2);
        // raw address offset, not reduced modulo T
        assert_eq!(range_index(&hit, &base, &cfg), 2);

        assert!(match_bankable_in_range(&addr(43, 6, 0), &base, &cfg, 4));
        assert!(!match_bankable_in_range(&addr(44, 4, 0), &base, &cfg, 4));
        assert!(!match_bankable_in_range(&addr(42, 3, 0), &base, &cfg, 4));
        assert!(!match_bankable_in_range(&addr(42, 8, 0), &base, &cfg, 4));
        assert!(!match_bankable_in_range(&addr(42, 4, 1), &base, &cfg, 4));
    }

    #[test]
    fn test_range_change_cable() {
        let cfg = config(2, 1, BankType::ChangeCable);
        let base = addr(0, 0, 0);

        let hit = addr(7, 0, 1);
        assert!(match_bankable_in_range(&hit, &base, &cfg, 8));
        assert_eq!(bank_index(&hit, &base, &cfg), 1);
        assert_eq!(range_index(&hit, &base, &cfg), 7);
        assert!(!match_bankable_in_range(&addr(8, 0, 1), &base, &cfg, 8));
        assert!(!match_bankable_in_range(&addr(7, 1, 1), &base, &cfg, 8));
    }

    /// Largest value of the varying field on the wire
    fn varying_max(bank_type: BankType) -> u8 {
        match bank_type {
            BankType::ChangeAddress => 127,
            BankType::ChangeChannel | BankType::ChangeCable => 15,
        }
    }

    /// Address whose varying field is `value`, other fields fixed
    fn at(bank_type: BankType, value: u8) -> MidiAddress {
        let origin = match bank_type {
            BankType::ChangeAddress => addr(0, 0, 0),
            BankType::ChangeChannel | BankType::ChangeCable => addr(10, 0, 0),
        };
        step(origin, bank_type, value)
    }

    fn bank_type_strategy() -> impl Strategy<Value = BankType> {
        prop_oneof![
            Just(BankType::ChangeAddress),
            Just(BankType::ChangeChannel),
            Just(BankType::ChangeCable),
        ]
    }

    proptest! {
        #[test]
        fn prop_every_bank_step_matches(
            bank_type in bank_type_strategy(),
            count in 1u8..=4,
            tracks in 1u8..=4,
        ) {
            let cfg = config(count, tracks, bank_type);
            let base = addr(10, 0, 0);
            for k in 0..count {
                let target = step(base, bank_type, k * tracks);
                prop_assert!(match_bankable(&target, &base, &cfg));
                prop_assert_eq!(bank_index(&target, &base, &cfg), k);
            }
        }

        #[test]
        fn prop_nothing_below_base_matches(
            bank_type in bank_type_strategy(),
            count in 1u8..=4,
            tracks in 1u8..=4,
            base in any::<u8>(),
            below in any::<u8>(),
        ) {
            let base = 1 + base % varying_max(bank_type);
            let target = at(bank_type, below % base);
            let base = at(bank_type, base);
            let cfg = config(count, tracks, bank_type);
            prop_assert!(!match_bankable(&target, &base, &cfg));
            prop_assert!(!match_bankable_in_range(&target, &base, &cfg, tracks));
        }

        #[test]
        fn prop_nothing_past_last_bank_matches(
            bank_type in bank_type_strategy(),
            count in 1u8..=4,
            tracks in 1u8..=3,
            base in any::<u8>(),
            extra in any::<u8>(),
        ) {
            let span = count * tracks;
            let room = varying_max(bank_type) + 1 - span;
            let base = base % room;
            let past = base + span + extra % (room - base);
            let target = at(bank_type, past);
            let base = at(bank_type, base);
            let cfg = config(count, tracks, bank_type);
            prop_assert!(!match_bankable(&target, &base, &cfg));
            prop_assert!(!match_bankable_in_range(&target, &base, &cfg, tracks));
        }

        #[test]
        fn prop_in_range_agrees_with_single_for_length_one(
            count in 1u8..=8,
            tracks in 1u8..=8,
            base in 0u8..=63,
            target in 0u8..=127,
        ) {
            let cfg = config(count, tracks, BankType::ChangeAddress);
            let base = addr(base, 0, 0);
            let target = addr(target, 0, 0);
            prop_assert_eq!(
                match_bankable(&target, &base, &cfg),
                match_bankable_in_range(&target, &base, &cfg, 1)
            );
        }
    }
}
