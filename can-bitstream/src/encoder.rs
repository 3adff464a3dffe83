//! Frame encoder
//!
//! Builds the logical bit groups of a CAN base frame from a hex description
//! (`"7FF1122"` = ID 0x7FF, data 0x11 0x22) and stuffs them for the wire.
//! The CRC field is a zero placeholder; no CRC is computed.

use crate::layout::{FieldSpan, FrameLayout};
use crate::stuffing::{stuff, StuffMap, Stuffed};
use crate::types::{u64_to_bits, Bit, CodecError, FrameField, Result, MAX_DATA_BYTES};
use serde::Serialize;

/// Hex digits that make up the identifier
const ID_DIGITS: usize = 3;

/// Low 11 bits of the parsed identifier group
const ID_MASK: u16 = 0x7FF;

/// One labelled group of logical bits
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldBits {
    pub field: FrameField,
    pub bits: Vec<Bit>,
}

impl FieldBits {
    fn new(field: FrameField, bits: Vec<Bit>) -> Self {
        Self { field, bits }
    }
}

/// Identifier and payload parsed from a hex frame string
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameSpec {
    pub id: u16,
    pub data: Vec<u8>,
}

impl FrameSpec {
    /// Parse `IIIDDDD...`: 3 hex digits of ID, then data bytes in pairs
    ///
    /// The ID group is read as 12 bits and its low 11 bits are kept. A
    /// trailing odd digit does not form a byte and is dropped.
    pub fn parse(hex: &str) -> Result<Self> {
        let s = hex.trim().to_lowercase();
        if s.len() < ID_DIGITS || !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(CodecError::InvalidFrame(format!(
                "expected at least {} hex digits (ID + DATA), got {:?}",
                ID_DIGITS, hex
            )));
        }

        let (id_hex, data_hex) = s.split_at(ID_DIGITS);
        let id = u16::from_str_radix(id_hex, 16)
            .map_err(|e| CodecError::InvalidFrame(format!("bad ID {:?}: {}", id_hex, e)))?
            & ID_MASK;

        let pairs = data_hex.as_bytes().chunks_exact(2);
        if !pairs.remainder().is_empty() {
            log::debug!("Dropping odd trailing hex digit in {:?}", hex);
        }
        if pairs.len() > MAX_DATA_BYTES {
            return Err(CodecError::InvalidFrame(format!(
                "classic CAN carries at most {} data bytes, got {}",
                MAX_DATA_BYTES,
                pairs.len()
            )));
        }

        let data = pairs
            .map(|pair| {
                let text = std::str::from_utf8(pair)
                    .map_err(|e| CodecError::InvalidFrame(e.to_string()))?;
                u8::from_str_radix(text, 16)
                    .map_err(|e| CodecError::InvalidFrame(format!("bad data byte {:?}: {}", text, e)))
            })
            .collect::<Result<Vec<u8>>>()?;

        Ok(Self { id, data })
    }

    /// Data length code
    pub fn dlc(&self) -> u8 {
        self.data.len() as u8
    }
}

/// A fully encoded frame ready for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFrame {
    pub spec: FrameSpec,
    /// Logical bit groups in transmission order
    pub fields: Vec<FieldBits>,
    /// Logical positions of every field
    pub layout: FrameLayout,
    /// Concatenated logical bits
    pub raw: Vec<Bit>,
    /// Bits on the wire with stuff positions
    pub stuffed: Stuffed,
    /// Raw → stuffed index correspondence
    pub map: StuffMap,
}

impl EncodedFrame {
    /// Field spans measured in stuffed bits, stuff bits inside a field included
    pub fn stuffed_spans(&self) -> Vec<FieldSpan> {
        self.layout
            .spans()
            .iter()
            .filter_map(|span| {
                self.map
                    .stuffed_span(span.start, span.width)
                    .map(|(start, width)| FieldSpan {
                        field: span.field,
                        start,
                        width,
                    })
            })
            .collect()
    }

    /// Per-bit stuff flags for the stuffed sequence
    pub fn stuff_flags(&self) -> Vec<bool> {
        self.map.stuff_flags(self.stuffed.bits.len())
    }
}

/// Frame encoder
pub struct FrameEncoder;

impl FrameEncoder {
    /// Encode a hex frame description into labelled logical bit groups
    pub fn encode(hex: &str) -> Result<Vec<FieldBits>> {
        let spec = FrameSpec::parse(hex)?;
        Ok(Self::encode_spec(&spec))
    }

    /// Bit groups for an already parsed frame
    pub fn encode_spec(spec: &FrameSpec) -> Vec<FieldBits> {
        let mut fields = vec![
            FieldBits::new(FrameField::Sof, vec![0]),
            FieldBits::new(FrameField::Id, u64_to_bits((spec.id & ID_MASK) as u64, 11)),
            FieldBits::new(FrameField::Rtr, vec![0]),
            FieldBits::new(FrameField::Ide, vec![0]),
            FieldBits::new(FrameField::R0, vec![0]),
            FieldBits::new(FrameField::Dlc, u64_to_bits(spec.dlc() as u64, 4)),
        ];
        for (i, &byte) in spec.data.iter().enumerate() {
            fields.push(FieldBits::new(
                FrameField::Data(i as u8),
                u64_to_bits(byte as u64, 8),
            ));
        }
        fields.extend([
            FieldBits::new(FrameField::Crc, vec![0; 15]),
            FieldBits::new(FrameField::CrcDelimiter, vec![1]),
            FieldBits::new(FrameField::Ack, vec![0]),
            FieldBits::new(FrameField::AckDelimiter, vec![1]),
            FieldBits::new(FrameField::Eof, vec![1; 7]),
        ]);
        fields
    }

    /// Encode, flatten and stuff up to the end of the CRC field
    pub fn build(hex: &str) -> Result<EncodedFrame> {
        let spec = FrameSpec::parse(hex)?;
        let fields = Self::encode_spec(&spec);
        let layout = FrameLayout::for_dlc(spec.dlc());

        let raw: Vec<Bit> = fields.iter().flat_map(|f| f.bits.iter().copied()).collect();
        let stuffed = stuff(&raw, layout.stuffing_end());
        let map = StuffMap::from_stuffed(raw.len(), &stuffed);

        log::debug!(
            "Encoded ID 0x{:03X} with {} data bytes: {} raw bits, {} stuff bits",
            spec.id,
            spec.data.len(),
            raw.len(),
            stuffed.positions.len()
        );

        Ok(EncodedFrame {
            spec,
            fields,
            layout,
            raw,
            stuffed,
            map,
        })
    }
}
