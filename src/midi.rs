//! MIDI channel message decoding
//!
//! Decodes raw channel voice messages into the (type, channel, cable, data)
//! form the matchers operate on, plus hex helpers for sniffer-style logs.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::address::{Cable, Channel, MidiAddress};

/// Channel voice message types, keyed by status nibble
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    NoteOff,
    #[serde(alias = "note")]
    NoteOn,
    KeyPressure,
    #[serde(rename = "cc")]
    ControlChange,
    ProgramChange,
    ChannelPressure,
    PitchBend,
}

impl MessageType {
    /// Message type for the upper nibble of a status byte
    pub fn from_status(status: u8) -> Option<Self> {
        match status & 0xF0 {
            0x80 => Some(MessageType::NoteOff),
            0x90 => Some(MessageType::NoteOn),
            0xA0 => Some(MessageType::KeyPressure),
            0xB0 => Some(MessageType::ControlChange),
            0xC0 => Some(MessageType::ProgramChange),
            0xD0 => Some(MessageType::ChannelPressure),
            0xE0 => Some(MessageType::PitchBend),
            _ => None,
        }
    }

    /// Status nibble (upper four bits of the status byte)
    pub fn status_nibble(self) -> u8 {
        match self {
            MessageType::NoteOff => 0x8,
            MessageType::NoteOn => 0x9,
            MessageType::KeyPressure => 0xA,
            MessageType::ControlChange => 0xB,
            MessageType::ProgramChange => 0xC,
            MessageType::ChannelPressure => 0xD,
            MessageType::PitchBend => 0xE,
        }
    }

    /// Number of data bytes following the status byte
    pub fn data_len(self) -> usize {
        match self {
            MessageType::ProgramChange | MessageType::ChannelPressure => 1,
            _ => 2,
        }
    }

    /// Note On and Note Off share an address space
    pub fn is_note(self) -> bool {
        matches!(self, MessageType::NoteOn | MessageType::NoteOff)
    }
}

/// Decoded channel voice message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelMessage {
    pub message_type: MessageType,
    pub channel: Channel,
    pub cable: Cable,
    pub data1: u8,
    /// Zero for one-byte message types
    pub data2: u8,
}

impl ChannelMessage {
    /// Parse a channel message received on the given cable.
    ///
    /// Returns `None` for system messages, running status, truncated
    /// messages, and data bytes with the high bit set. Note On with velocity
    /// zero is kept as Note On.
    pub fn parse(data: &[u8], cable: Cable) -> Option<Self> {
        let status = *data.first()?;
        if status < 0x80 {
            // Running status would require per-port state
            return None;
        }
        let message_type = MessageType::from_status(status)?;
        let payload = data.get(1..1 + message_type.data_len())?;
        if payload.iter().any(|b| b & 0x80 != 0) {
            return None;
        }
        let data1 = payload[0];
        let data2 = payload.get(1).copied().unwrap_or(0);
        Some(Self {
            message_type,
            channel: Channel::from_status(status),
            cable,
            data1,
            data2,
        })
    }

    /// Encode back to raw bytes (cable number is out of band)
    pub fn encode(&self) -> Vec<u8> {
        let status = (self.message_type.status_nibble() << 4) | self.channel.raw();
        match self.message_type.data_len() {
            1 => vec![status, self.data1],
            _ => vec![status, self.data1, self.data2],
        }
    }

    /// Full address: data1 on this channel and cable
    pub fn address(&self) -> MidiAddress {
        MidiAddress {
            address: Some(self.data1),
            channel: Some(self.channel),
            cable: Some(self.cable),
        }
    }

    /// Address without the data byte, for one-byte messages
    pub fn channel_cn(&self) -> MidiAddress {
        MidiAddress::channel_cn(self.channel, self.cable)
    }
}

impl fmt::Display for ChannelMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ch = self.channel.raw() + 1;
        let cn = self.cable.raw() + 1;
        match self.message_type {
            MessageType::NoteOff => write!(f, "NoteOff ch:{} cn:{} n:{} v:{}", ch, cn, self.data1, self.data2),
            MessageType::NoteOn => write!(f, "NoteOn ch:{} cn:{} n:{} v:{}", ch, cn, self.data1, self.data2),
            MessageType::KeyPressure => {
                write!(f, "KeyPressure ch:{} cn:{} n:{} p:{}", ch, cn, self.data1, self.data2)
            }
            MessageType::ControlChange => write!(f, "CC ch:{} cn:{} cc:{} v:{}", ch, cn, self.data1, self.data2),
            MessageType::ProgramChange => write!(f, "ProgramChange ch:{} cn:{} p:{}", ch, cn, self.data1),
            MessageType::ChannelPressure => {
                write!(f, "ChannelPressure ch:{} cn:{} p:0x{:02X}", ch, cn, self.data1)
            }
            MessageType::PitchBend => {
                let value = ((self.data2 as u16) << 7) | self.data1 as u16;
                write!(f, "PitchBend ch:{} cn:{} v:{}", ch, cn, value)
            }
        }
    }
}

/// Format MIDI bytes as hex string for debugging
pub fn format_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Format MIDI message for sniffer output
pub fn format_sniffer(timestamp_ms: u64, direction: &str, port: &str, data: &[u8]) -> String {
    let hex = format_hex(data);
    let message = ChannelMessage::parse(data, Cable::CABLE_1)
        .map(|m| format!(" => {}", m))
        .unwrap_or_default();

    format!("[{:08}ms] {} {} | {}{}", timestamp_ms, direction, port, hex, message)
}

/// One line of sniffer output, as written by [`format_sniffer`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnifferLine {
    pub timestamp_ms: u64,
    pub direction: String,
    pub port: String,
    pub data: Vec<u8>,
}

/// Parse a line written by [`format_sniffer`]. The decoded suffix after
/// `=>` is ignored; blank lines and `#` comments yield `None`.
pub fn parse_sniffer_line(line: &str) -> Option<SnifferLine> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let rest = line.strip_prefix('[')?;
    let (ts, rest) = rest.split_once("ms]")?;
    let timestamp_ms = ts.trim().parse().ok()?;

    let (head, payload) = rest.split_once('|')?;
    let mut head = head.split_whitespace();
    let direction = head.next()?.to_string();
    let port = head.collect::<Vec<_>>().join(" ");

    let hex = payload.split("=>").next()?;
    let data = hex
        .split_whitespace()
        .map(|b| u8::from_str_radix(b, 16).ok())
        .collect::<Option<Vec<u8>>>()?;
    if data.is_empty() {
        return None;
    }

    Some(SnifferLine {
        timestamp_ms,
        direction,
        port,
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_pressure_parsing() {
        let msg = ChannelMessage::parse(&[0xD0, 0x45], Cable::CABLE_1).unwrap();
        assert_eq!(msg.message_type, MessageType::ChannelPressure);
        assert_eq!(msg.channel, Channel::CHANNEL_1);
        assert_eq!(msg.data1, 0x45);
        assert_eq!(msg.data2, 0);
    }

    #[test]
    fn test_note_on_velocity_zero_stays_note_on() {
        let msg = ChannelMessage::parse(&[0x90, 60, 0], Cable::CABLE_1).unwrap();
        assert_eq!(msg.message_type, MessageType::NoteOn);
        assert_eq!(msg.data2, 0);
    }

    #[test]
    fn test_cable_is_carried() {
        let cable = Cable::new(3).unwrap();
        let msg = ChannelMessage::parse(&[0xB2, 7, 100], cable).unwrap();
        assert_eq!(msg.cable, cable);
        assert_eq!(msg.channel.raw(), 2);
        assert_eq!(msg.address().address, Some(7));
        assert_eq!(msg.channel_cn().address, None);
    }

    #[test]
    fn test_rejects_system_and_truncated() {
        assert!(ChannelMessage::parse(&[], Cable::CABLE_1).is_none());
        assert!(ChannelMessage::parse(&[0xF8], Cable::CABLE_1).is_none());
        assert!(ChannelMessage::parse(&[0x40, 0x10], Cable::CABLE_1).is_none());
        assert!(ChannelMessage::parse(&[0xB0, 7], Cable::CABLE_1).is_none());
        assert!(ChannelMessage::parse(&[0xD0], Cable::CABLE_1).is_none());
    }

    #[test]
    fn test_rejects_data_bytes_with_high_bit() {
        assert!(ChannelMessage::parse(&[0xB0, 0x87, 0x05], Cable::CABLE_1).is_none());
        assert!(ChannelMessage::parse(&[0xB0, 0x07, 0x85], Cable::CABLE_1).is_none());
        assert!(ChannelMessage::parse(&[0xD0, 0x9C], Cable::CABLE_1).is_none());
        assert!(ChannelMessage::parse(&[0xB0, 0x07, 0x05], Cable::CABLE_1).is_some());
    }

    #[test]
    fn test_encode() {
        let msg = ChannelMessage::parse(&[0x81, 60, 64], Cable::CABLE_1).unwrap();
        assert_eq!(msg.encode(), vec![0x81, 60, 64]);
        let msg = ChannelMessage::parse(&[0xD0, 0x1E], Cable::CABLE_1).unwrap();
        assert_eq!(msg.encode(), vec![0xD0, 0x1E]);
    }

    #[test]
    fn test_sniffer_line_parsing() {
        let line = format_sniffer(150, "IN", "X-Touch INT", &[0xD0, 0x45]);
        assert_eq!(line, "[00000150ms] IN X-Touch INT | D0 45 => ChannelPressure ch:1 cn:1 p:0x45");

        let parsed = parse_sniffer_line(&line).unwrap();
        assert_eq!(parsed.timestamp_ms, 150);
        assert_eq!(parsed.direction, "IN");
        assert_eq!(parsed.port, "X-Touch INT");
        assert_eq!(parsed.data, vec![0xD0, 0x45]);
    }

    #[test]
    fn test_sniffer_line_skips_noise() {
        assert!(parse_sniffer_line("").is_none());
        assert!(parse_sniffer_line("# comment").is_none());
        assert!(parse_sniffer_line("[0000ms] IN x | ZZ").is_none());
    }
}
