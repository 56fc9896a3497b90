//! Surface builder: turns an [`AppConfig`] into banks and input elements

use anyhow::{Context, Result};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::address::{Cable, Channel, MidiAddress};
use crate::bank::{Bank, BankConfig, BankType};
use crate::config::{AppConfig, ControlSpec, MeterSpec};
use crate::element::{ControlValue, ElementRegistry, ValueMatcher};
use crate::matcher::{AddressMatcher, ChannelMatcher};
use crate::midi::{ChannelMessage, MessageType};
use crate::timer::Clock;
use crate::vu::{BankableVuMatcher, BankableVuMeter, VuMatcher, VuMeter};

/// Banks plus the elements that read them
pub struct Surface {
    banks: HashMap<String, Bank>,
    registry: ElementRegistry,
}

impl Surface {
    /// Build every bank, meter and control of `config`, with decay timers
    /// running on `clock`
    pub fn from_config<C>(config: &AppConfig, clock: C) -> Result<Self>
    where
        C: Clock + Clone + 'static,
    {
        let mut banks = HashMap::new();
        for spec in &config.banks {
            let bank = Bank::new(spec.count, spec.tracks_per_bank)
                .with_context(|| format!("Invalid bank '{}'", spec.name))?;
            bank.select(spec.initial)
                .with_context(|| format!("Invalid initial setting for bank '{}'", spec.name))?;
            debug!(
                "Bank '{}': {} settings of {} tracks",
                spec.name, spec.count, spec.tracks_per_bank
            );
            banks.insert(spec.name.clone(), bank);
        }

        let mut surface = Self {
            banks,
            registry: ElementRegistry::new(),
        };

        for meter in &config.meters {
            surface
                .add_meter(meter, clock.clone())
                .with_context(|| format!("Failed to build meter '{}'", meter.name))?;
        }
        for control in &config.controls {
            surface
                .add_control(control)
                .with_context(|| format!("Failed to build control '{}'", control.name))?;
        }

        info!(
            "Surface ready: {} banks, {} elements",
            surface.banks.len(),
            surface.registry.len()
        );
        Ok(surface)
    }

    fn bank_config(&self, bank: Option<&str>, bank_type: Option<BankType>) -> Result<Option<BankConfig>> {
        let Some(name) = bank else {
            return Ok(None);
        };
        let bank = self
            .banks
            .get(name)
            .ok_or_else(|| anyhow::anyhow!("Unknown bank '{}'", name))?;
        Ok(Some(BankConfig::new(
            bank.clone(),
            bank_type.unwrap_or(BankType::ChangeAddress),
        )))
    }

    fn add_meter<C>(&mut self, spec: &MeterSpec, clock: C) -> Result<()>
    where
        C: Clock + Clone + 'static,
    {
        let channel = Channel::from_number(spec.channel)?;
        let cable = Cable::new(spec.cable)?;
        let track = spec.track.saturating_sub(1);

        match self.bank_config(spec.bank.as_deref(), spec.bank_type)? {
            Some(config) => {
                let matcher = BankableVuMatcher::new(config, track, channel, cable)?;
                self.registry
                    .register(&spec.name, Box::new(BankableVuMeter::new(matcher, spec.decay_ms, clock)));
            }
            None => {
                let matcher = VuMatcher::new(track, channel, cable)?;
                self.registry
                    .register(&spec.name, Box::new(VuMeter::new(matcher, spec.decay_ms, clock)));
            }
        }
        Ok(())
    }

    fn add_control(&mut self, spec: &ControlSpec) -> Result<()> {
        let channel = Channel::from_number(spec.channel)?;
        let cable = Cable::new(spec.cable)?;

        let matcher = match spec.message_type {
            MessageType::ChannelPressure | MessageType::ProgramChange => {
                ValueMatcher::OneByte(ChannelMatcher::new(channel, cable))
            }
            MessageType::PitchBend => anyhow::bail!("Pitch bend controls are not supported"),
            _ => {
                let address = MidiAddress::new(spec.address, channel, cable)?;
                let bank = self.bank_config(spec.bank.as_deref(), spec.bank_type)?;
                ValueMatcher::TwoByte(AddressMatcher::new(address, spec.length, bank)?)
            }
        };
        self.registry
            .register(&spec.name, Box::new(ControlValue::new(spec.message_type, matcher)));
        Ok(())
    }

    /// Select a bank setting by bank name
    pub fn select_bank(&self, name: &str, setting: u8) -> Result<()> {
        let bank = self
            .banks
            .get(name)
            .ok_or_else(|| anyhow::anyhow!("Unknown bank '{}'", name))?;
        bank.select(setting)?;
        info!("Bank '{}' → setting {}", name, setting + 1);
        Ok(())
    }

    pub fn bank(&self, name: &str) -> Option<&Bank> {
        self.banks.get(name)
    }

    pub fn handle_message(&mut self, msg: &ChannelMessage) -> usize {
        self.registry.dispatch(msg)
    }

    pub fn handle_raw(&mut self, data: &[u8], cable: Cable) -> usize {
        self.registry.dispatch_raw(data, cable)
    }

    pub fn tick(&mut self) {
        self.registry.tick();
    }

    pub fn registry(&self) -> &ElementRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ElementRegistry {
        &mut self.registry
    }
}
