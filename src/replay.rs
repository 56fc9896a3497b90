//! Replay of sniffer logs
//!
//! Feeds a recorded sniffer log through the surface, driving a
//! [`ManualClock`] from the recorded timestamps so meter decay behaves as it
//! did live.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, warn};

use crate::address::Cable;
use crate::midi::parse_sniffer_line;
use crate::surface::Surface;
use crate::timer::{Clock, ManualClock};

/// Counters of a replay run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    pub lines: usize,
    pub messages: usize,
    pub matched: usize,
    pub skipped: usize,
}

/// Replays sniffer output into a surface
pub struct Replay {
    clock: ManualClock,
    tick_interval_ms: u64,
    /// Port name patterns in cable order
    ports: Vec<String>,
}

impl Replay {
    /// `clock` must be the clock the surface was built with
    pub fn new(clock: ManualClock, tick_interval_ms: u64, ports: Vec<String>) -> Self {
        Self {
            clock,
            tick_interval_ms: tick_interval_ms.max(1),
            ports,
        }
    }

    /// Cable of the first configured pattern contained in the port name,
    /// cable 1 when none matches
    fn cable_for(&self, port: &str) -> Cable {
        let port = port.to_lowercase();
        self.ports
            .iter()
            .position(|pattern| port.contains(&pattern.to_lowercase()))
            .and_then(|index| Cable::new(index as u8).ok())
            .unwrap_or(Cable::CABLE_1)
    }

    /// Advance time to `target_ms`, ticking the surface on every tick
    /// boundary on the way
    fn advance_to(&self, surface: &mut Surface, target_ms: u64) {
        let mut now = self.clock.now_ms();
        while now + self.tick_interval_ms <= target_ms {
            now += self.tick_interval_ms;
            self.clock.set(now);
            surface.tick();
        }
        self.clock.set(target_ms);
    }

    /// Replay sniffer text. Lines that are not sniffer output are skipped.
    pub fn run_str(&self, surface: &mut Surface, contents: &str) -> ReplayStats {
        let mut stats = ReplayStats::default();
        for (number, line) in contents.lines().enumerate() {
            stats.lines += 1;
            let Some(entry) = parse_sniffer_line(line) else {
                if !line.trim().is_empty() && !line.trim_start().starts_with('#') {
                    warn!("Skipping line {}: not sniffer output", number + 1);
                    stats.skipped += 1;
                }
                continue;
            };
            if !entry.direction.eq_ignore_ascii_case("IN") {
                debug!("Skipping {} message on line {}", entry.direction, number + 1);
                continue;
            }

            self.advance_to(surface, entry.timestamp_ms);
            stats.messages += 1;
            if surface.handle_raw(&entry.data, self.cable_for(&entry.port)) > 0 {
                stats.matched += 1;
            }
        }
        stats
    }

    /// Replay a sniffer log file, then keep ticking for `tail_ms`
    pub fn run_file(&self, surface: &mut Surface, path: &Path, tail_ms: u64) -> Result<ReplayStats> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read replay file: {}", path.display()))?;
        let stats = self.run_str(surface, &contents);
        let end = self.clock.now_ms() + tail_ms;
        self.advance_to(surface, end);
        Ok(stats)
    }
}
