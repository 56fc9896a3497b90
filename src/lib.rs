//! Mackie Control Universal input handling
//!
//! Decodes MIDI from a control surface into element state: bank-relative
//! address matching, MCU VU meters with timed decay, and generic control
//! values. The [`surface`] module wires elements up from a YAML
//! configuration; [`monitor`] and [`replay`] feed it live or recorded MIDI.

pub mod address;
pub mod bank;
pub mod config;
pub mod element;
pub mod matcher;
pub mod midi;
pub mod monitor;
pub mod replay;
pub mod surface;
pub mod timer;
pub mod vu;
