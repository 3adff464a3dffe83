//! Core types for the CAN bitstream codec
//!
//! This module defines the values that flow between the codec stages: sampled
//! edges, bit sequences, the fixed CAN base-frame field layout and the partially
//! decoded frame produced by the field extractor.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single logical bit. Always holds 0 (dominant) or 1 (recessive).
pub type Bit = u8;

/// Result type for codec operations
pub type Result<T> = std::result::Result<T, CodecError>;

/// Number of recessive bus-idle bits shown before SOF when a frame is displayed
pub const BUS_IDLE_BITS: usize = 8;

/// Maximum number of data bytes in a classic CAN frame
pub const MAX_DATA_BYTES: usize = 8;

/// A sampled logic level together with its absolute tick timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// Sampled electrical level (0 or 1)
    pub level: Bit,
    /// Absolute capture tick count
    pub timestamp: u32,
}

impl Edge {
    pub fn new(level: Bit, timestamp: u32) -> Self {
        Self { level, timestamp }
    }
}

/// Errors that can occur in the codec
///
/// Decode-path anomalies (malformed records, timestamp rollback) are recovered
/// locally by the decoder and never surface here.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error("Failed to parse capture file: {0}")]
    CaptureParse(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Capture stream closed")]
    StreamClosed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Fields of a CAN 2.0A base frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FrameField {
    Sof,
    Id,
    Rtr,
    Ide,
    R0,
    Dlc,
    /// Data byte by index (0..8)
    Data(u8),
    Crc,
    CrcDelimiter,
    Ack,
    AckDelimiter,
    Eof,
}

impl FrameField {
    /// Short label used in field boxes and reports
    pub fn label(&self) -> String {
        match self {
            FrameField::Sof => "SOF".to_string(),
            FrameField::Id => "ID".to_string(),
            FrameField::Rtr => "RTR".to_string(),
            FrameField::Ide => "IDE".to_string(),
            FrameField::R0 => "r0".to_string(),
            FrameField::Dlc => "DLC".to_string(),
            FrameField::Data(i) => format!("DATA{}", i),
            FrameField::Crc => "CRC".to_string(),
            FrameField::CrcDelimiter => "CRC_del".to_string(),
            FrameField::Ack => "ACK".to_string(),
            FrameField::AckDelimiter => "ACK_del".to_string(),
            FrameField::Eof => "EOF".to_string(),
        }
    }
}

impl fmt::Display for FrameField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// A frame as far as it could be decoded from the clean bits seen so far
///
/// Every field is optional: a partial frame is a normal intermediate state,
/// and an absent field means "not decoded yet".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedFrame {
    /// 11-bit identifier
    pub id: Option<u16>,
    /// Data length code as transmitted (not clamped to 8)
    pub dlc: Option<u8>,
    /// Fully received data bytes, in order
    pub data: Vec<u8>,
    /// 15-bit CRC field as transmitted (not verified)
    pub crc: Option<u16>,
}

impl DecodedFrame {
    /// True once every field up to and including the CRC is available
    pub fn is_complete(&self) -> bool {
        match (self.id, self.dlc, self.crc) {
            (Some(_), Some(dlc), Some(_)) => self.data.len() == (dlc as usize).min(MAX_DATA_BYTES),
            _ => false,
        }
    }

    /// Hex rendering of a decoded field, if present
    pub fn hex_value(&self, field: FrameField) -> Option<String> {
        match field {
            FrameField::Id => self.id.map(|v| format!("0x{:03X}", v)),
            FrameField::Dlc => self.dlc.map(|v| format!("0x{:X}", v)),
            FrameField::Data(i) => self.data.get(i as usize).map(|v| format!("0x{:02X}", v)),
            FrameField::Crc => self.crc.map(|v| format!("0x{:04X}", v)),
            _ => None,
        }
    }
}

/// A labelled box over a run of bits, as drawn above a waveform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldBox {
    pub field: FrameField,
    /// First bit index covered by the field
    pub start: usize,
    /// Number of bits covered
    pub width: usize,
    /// Decoded value, if the field carries one and is fully available
    pub value: Option<u64>,
}

/// Interpret bits as an unsigned MSB-first integer
pub fn bits_to_u64(bits: &[Bit]) -> u64 {
    bits.iter().fold(0u64, |acc, &b| (acc << 1) | u64::from(b & 1))
}

/// Expand the low `width` bits of `value` into an MSB-first bit vector
pub fn u64_to_bits(value: u64, width: usize) -> Vec<Bit> {
    (0..width)
        .rev()
        .map(|shift| ((value >> shift) & 1) as Bit)
        .collect()
}

/// Render bits as a compact `0101...` string
pub fn bits_to_string(bits: &[Bit]) -> String {
    bits.iter().map(|&b| if b == 0 { '0' } else { '1' }).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_conversions() {
        assert_eq!(bits_to_u64(&[1, 0, 1, 1]), 0b1011);
        assert_eq!(u64_to_bits(0b1011, 6), vec![0, 0, 1, 0, 1, 1]);
        assert_eq!(bits_to_u64(&[]), 0);
        // Only the low bits are kept
        assert_eq!(u64_to_bits(0xFFF, 11), vec![1; 11]);
    }

    #[test]
    fn test_field_labels() {
        assert_eq!(FrameField::Data(3).to_string(), "DATA3");
        assert_eq!(FrameField::CrcDelimiter.to_string(), "CRC_del");
        assert_eq!(FrameField::R0.label(), "r0");
    }

    #[test]
    fn test_hex_value_formatting() {
        let frame = DecodedFrame {
            id: Some(0x7FF),
            dlc: Some(1),
            data: vec![0x0A],
            crc: Some(0),
        };
        assert_eq!(frame.hex_value(FrameField::Id).as_deref(), Some("0x7FF"));
        assert_eq!(frame.hex_value(FrameField::Dlc).as_deref(), Some("0x1"));
        assert_eq!(frame.hex_value(FrameField::Data(0)).as_deref(), Some("0x0A"));
        assert_eq!(frame.hex_value(FrameField::Data(1)), None);
        assert_eq!(frame.hex_value(FrameField::Crc).as_deref(), Some("0x0000"));
        assert!(frame.is_complete());
    }

    #[test]
    fn test_partial_frame_is_not_complete() {
        let frame = DecodedFrame {
            id: Some(0x123),
            dlc: Some(2),
            data: vec![0x11],
            crc: None,
        };
        assert!(!frame.is_complete());
    }
}
