//! Configuration for the surface monitor
//!
//! Handles loading, parsing, and validation of the YAML file describing
//! banks, VU meters and generic controls.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tokio::fs;

use crate::bank::BankType;
use crate::midi::MessageType;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub midi: MidiConfig,
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
    #[serde(default)]
    pub banks: Vec<BankSpec>,
    #[serde(default)]
    pub meters: Vec<MeterSpec>,
    #[serde(default)]
    pub controls: Vec<ControlSpec>,
}

/// MIDI port configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MidiConfig {
    /// Input port name patterns; the index of a port is its cable number
    #[serde(default)]
    pub input_ports: Vec<String>,
}

/// Bank definition
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BankSpec {
    pub name: String,
    pub count: u8,
    pub tracks_per_bank: u8,
    /// Bank setting selected at startup (0-based)
    #[serde(default)]
    pub initial: u8,
}

/// VU meter definition
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MeterSpec {
    pub name: String,
    /// Track (1-8)
    pub track: u8,
    /// MIDI channel (1-16)
    #[serde(default = "default_channel")]
    pub channel: u8,
    /// Cable number (0-15)
    #[serde(default)]
    pub cable: u8,
    /// Milliseconds per decay step, 0 holds the value
    #[serde(default = "default_decay_ms")]
    pub decay_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank_type: Option<BankType>,
}

/// Generic control definition
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ControlSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    /// Note or controller number (0-127), unused for one-byte types
    #[serde(default)]
    pub address: u8,
    /// MIDI channel (1-16)
    #[serde(default = "default_channel")]
    pub channel: u8,
    /// Cable number (0-15)
    #[serde(default)]
    pub cable: u8,
    /// Number of consecutive addresses
    #[serde(default = "default_length")]
    pub length: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank_type: Option<BankType>,
}

impl AppConfig {
    /// Load configuration from file with validation
    pub async fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path))?;

        Self::from_yaml_str(&contents).with_context(|| format!("Invalid config file: {}", path))
    }

    /// Parse and validate configuration from a YAML string
    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        let config: AppConfig = serde_yaml::from_str(contents).context("Failed to parse YAML config")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration for correctness and consistency
    pub fn validate(&self) -> Result<()> {
        if self.midi.input_ports.len() > 16 {
            anyhow::bail!("At most 16 input ports are supported (one per cable number)");
        }
        if self.tick_interval_ms == 0 {
            anyhow::bail!("tick_interval_ms must be at least 1");
        }

        let mut bank_names = HashSet::new();
        for bank in &self.banks {
            if bank.name.is_empty() {
                anyhow::bail!("Bank name cannot be empty");
            }
            if !bank_names.insert(bank.name.as_str()) {
                anyhow::bail!("Duplicate bank name '{}'", bank.name);
            }
            if bank.count == 0 || bank.tracks_per_bank == 0 {
                anyhow::bail!("Bank '{}' needs a non-zero count and tracks_per_bank", bank.name);
            }
            if bank.initial >= bank.count {
                anyhow::bail!(
                    "Bank '{}' initial setting {} is out of range (must be 0-{})",
                    bank.name,
                    bank.initial,
                    bank.count - 1
                );
            }
        }

        let mut element_names = HashSet::new();
        for meter in &self.meters {
            check_name(&meter.name, &mut element_names)?;
            self.validate_meter(meter)
                .with_context(|| format!("Invalid meter '{}'", meter.name))?;
        }
        for control in &self.controls {
            check_name(&control.name, &mut element_names)?;
            self.validate_control(control)
                .with_context(|| format!("Invalid control '{}'", control.name))?;
        }

        Ok(())
    }

    fn validate_meter(&self, meter: &MeterSpec) -> Result<()> {
        if !(1..=8).contains(&meter.track) {
            anyhow::bail!("Track {} is invalid (must be 1-8)", meter.track);
        }
        check_channel_cable(meter.channel, meter.cable)?;
        self.check_bank_ref(meter.bank.as_deref(), meter.bank_type)?;
        // VU messages carry the track in three bits
        self.check_bank_reach(
            meter.bank.as_deref(),
            meter.bank_type,
            [meter.track - 1, meter.channel - 1, meter.cable],
            7,
        )
    }

    fn validate_control(&self, control: &ControlSpec) -> Result<()> {
        check_channel_cable(control.channel, control.cable)?;
        match control.message_type {
            MessageType::PitchBend => {
                anyhow::bail!("Pitch bend has no address and cannot be used as a control");
            }
            MessageType::ChannelPressure | MessageType::ProgramChange => {
                if control.length != 1 || control.bank.is_some() {
                    anyhow::bail!("{:?} controls cannot be ranged or banked", control.message_type);
                }
            }
            _ => {
                if control.length == 0 {
                    anyhow::bail!("Length must be at least 1");
                }
                if control.address as u16 + control.length as u16 > 128 {
                    anyhow::bail!(
                        "Address range {}..{} exceeds 127",
                        control.address,
                        control.address as u16 + control.length as u16
                    );
                }
            }
        }
        self.check_bank_ref(control.bank.as_deref(), control.bank_type)?;
        self.check_bank_reach(
            control.bank.as_deref(),
            control.bank_type,
            [control.address + (control.length - 1), control.channel - 1, control.cable],
            127,
        )
    }

    fn check_bank_ref(&self, bank: Option<&str>, bank_type: Option<BankType>) -> Result<()> {
        match (bank, bank_type) {
            (None, Some(_)) => anyhow::bail!("bank_type requires a bank"),
            (Some(name), _) if self.bank(name).is_none() => anyhow::bail!("Unknown bank '{}'", name),
            _ => Ok(()),
        }
    }

    /// Every bank setting must be addressable: the varying field of the last
    /// setting may not exceed its wire range. `fields` holds the zero-based
    /// (last address, channel, cable) of bank setting 0.
    fn check_bank_reach(
        &self,
        bank: Option<&str>,
        bank_type: Option<BankType>,
        fields: [u8; 3],
        max_address: u8,
    ) -> Result<()> {
        let Some(spec) = bank.and_then(|name| self.bank(name)) else {
            return Ok(());
        };
        let bank_type = bank_type.unwrap_or(BankType::ChangeAddress);
        let (start, max) = match bank_type {
            BankType::ChangeAddress => (fields[0], max_address),
            BankType::ChangeChannel => (fields[1], 15),
            BankType::ChangeCable => (fields[2], 15),
        };
        let last = start as u16 + (spec.count as u16 - 1) * spec.tracks_per_bank as u16;
        if last > max as u16 {
            anyhow::bail!(
                "Bank '{}' ({} settings of {} tracks, {}) needs {} up to {}, but the maximum is {}",
                spec.name,
                spec.count,
                spec.tracks_per_bank,
                bank_type,
                match bank_type {
                    BankType::ChangeAddress => "addresses",
                    BankType::ChangeChannel => "channels",
                    BankType::ChangeCable => "cables",
                },
                last,
                max
            );
        }
        Ok(())
    }

    /// Look up a bank definition by name
    pub fn bank(&self, name: &str) -> Option<&BankSpec> {
        self.banks.iter().find(|b| b.name == name)
    }
}

fn check_name<'a>(name: &'a str, seen: &mut HashSet<&'a str>) -> Result<()> {
    if name.is_empty() {
        anyhow::bail!("Element name cannot be empty");
    }
    if !seen.insert(name) {
        anyhow::bail!("Duplicate element name '{}'", name);
    }
    Ok(())
}

fn check_channel_cable(channel: u8, cable: u8) -> Result<()> {
    if channel == 0 || channel > 16 {
        anyhow::bail!("MIDI channel {} is invalid (must be 1-16)", channel);
    }
    if cable > 15 {
        anyhow::bail!("Cable number {} is invalid (must be 0-15)", cable);
    }
    Ok(())
}

// Default value functions
fn default_tick_interval() -> u64 { 10 }
fn default_channel() -> u8 { 1 }
fn default_decay_ms() -> u64 { crate::vu::decay::DEFAULT }
fn default_length() -> u8 { 1 }
