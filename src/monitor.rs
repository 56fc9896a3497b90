//! Live monitor
//!
//! Connects to the configured MIDI input ports, feeds incoming messages to
//! the surface and ticks it at a fixed interval. The port index in the
//! configuration is used as cable number.

use anyhow::{Context, Result};
use midir::{MidiInput, MidiInputConnection, MidiInputPort};
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::address::Cable;
use crate::midi::format_hex;
use crate::surface::Surface;

/// Raw MIDI received on one cable
#[derive(Debug, Clone)]
pub struct MidiEvent {
    pub cable: Cable,
    pub raw_data: Vec<u8>,
}

/// List available MIDI input ports
pub fn list_input_ports() -> Result<Vec<String>> {
    let midi_in = MidiInput::new("MCU-Input-Scanner").context("Failed to create MIDI input")?;

    let mut port_names = Vec::new();
    for port in midi_in.ports() {
        if let Ok(name) = midi_in.port_name(&port) {
            port_names.push(name);
        }
    }

    Ok(port_names)
}

/// Find an input port by case-insensitive substring match
fn find_input_port(midi_in: &MidiInput, pattern: &str) -> Option<(MidiInputPort, String)> {
    let pattern = pattern.to_lowercase();
    for port in midi_in.ports() {
        if let Ok(name) = midi_in.port_name(&port) {
            if name.to_lowercase().contains(&pattern) {
                debug!("Found port '{}' matching pattern '{}'", name, pattern);
                return Some((port, name));
            }
        }
    }
    None
}

/// Open input connections; events arrive on the returned receiver
pub struct Monitor {
    _connections: Vec<MidiInputConnection<()>>,
    event_rx: mpsc::Receiver<MidiEvent>,
}

impl Monitor {
    /// Connect to every port pattern, in cable order
    pub fn connect(port_patterns: &[String]) -> Result<Self> {
        if port_patterns.is_empty() {
            anyhow::bail!("No input ports configured");
        }

        let (event_tx, event_rx) = mpsc::channel(1000);
        let mut connections = Vec::new();

        for (index, pattern) in port_patterns.iter().enumerate() {
            let cable = Cable::new(index as u8)?;
            let midi_in = MidiInput::new(&format!("MCU-Input-{}", index))
                .context("Failed to create MIDI input")?;

            let (port, port_name) = find_input_port(&midi_in, pattern)
                .ok_or_else(|| anyhow::anyhow!("Input port '{}' not found", pattern))?;

            info!("Connecting to input port: {} ({})", port_name, cable);

            let tx = event_tx.clone();
            let connection = midi_in
                .connect(
                    &port,
                    "mcu-input",
                    move |_timestamp, data, _| {
                        let event = MidiEvent {
                            cable,
                            raw_data: data.to_vec(),
                        };
                        // Never block the MIDI thread
                        let _ = tx.try_send(event);
                    },
                    (),
                )
                .map_err(|e| anyhow::anyhow!("Failed to connect to input port '{}': {}", port_name, e))?;

            connections.push(connection);
        }

        Ok(Self {
            _connections: connections,
            event_rx,
        })
    }

    /// Process events and ticks until `shutdown` resolves
    pub async fn run(
        self,
        surface: &mut Surface,
        tick_interval: Duration,
        shutdown: impl Future<Output = ()>,
    ) -> Result<()> {
        let Self {
            _connections,
            event_rx,
        } = self;
        info!("Monitoring MIDI input...");
        process_events(event_rx, surface, tick_interval, shutdown).await
    }
}

/// Feed events to `surface` and tick it every `tick_interval`, until
/// `shutdown` resolves or every sender is gone
pub async fn process_events(
    mut event_rx: mpsc::Receiver<MidiEvent>,
    surface: &mut Surface,
    tick_interval: Duration,
    shutdown: impl Future<Output = ()>,
) -> Result<()> {
    let mut ticker = tokio::time::interval(tick_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            event = event_rx.recv() => {
                let Some(event) = event else {
                    warn!("All MIDI inputs closed");
                    break;
                };
                let matched = surface.handle_raw(&event.raw_data, event.cable);
                if matched == 0 {
                    debug!("Unmatched {} | {}", event.cable, format_hex(&event.raw_data));
                }
                log_dirty(surface);
            }

            _ = ticker.tick() => {
                surface.tick();
                log_dirty(surface);
            }

            _ = &mut shutdown => {
                info!("Shutdown signal received, stopping monitor");
                break;
            }
        }
    }

    Ok(())
}

/// Log and clear every dirty element
pub fn log_dirty(surface: &mut Surface) {
    for (name, state) in surface.registry_mut().take_dirty() {
        info!("{:<16} {}", name, state);
    }
}
