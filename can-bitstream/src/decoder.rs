//! Main decoder API
//!
//! This module provides the session-level interface of the library. A
//! [`Decoder`] owns one edge-decoding session and turns it into everything a
//! display needs: wire bits with stuff bits flagged, clean bits, the decoded
//! frame and field boxes.

use crate::config::CodecConfig;
use crate::edge_decoder::{EdgeDecoder, FeedSummary};
use crate::extractor::{extract, field_boxes};
use crate::formats::load_capture;
use crate::layout::FrameLayout;
use crate::stuffing::{destuff_with_positions, StuffMap};
use crate::types::{Bit, DecodedFrame, FieldBox, Result};
use serde::Serialize;
use std::path::Path;

/// Playback chunk size used when replaying a capture file
pub const DEFAULT_CHUNK_SIZE: usize = 120;

/// Everything decoded so far in a session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DecodeSnapshot {
    /// Bits as seen on the wire, stuff bits included
    pub raw_bits: Vec<Bit>,
    /// One flag per raw bit, set for stuff bits
    pub stuff_flags: Vec<bool>,
    /// Indices of the stuff bits within `raw_bits`
    pub stuff_positions: Vec<usize>,
    /// Logical bits with stuff bits removed
    pub clean_bits: Vec<Bit>,
    /// Fields decoded from the clean bits
    pub frame: DecodedFrame,
    /// Field boxes in clean-bit coordinates
    pub field_boxes: Vec<FieldBox>,
    /// Raw index of every clean bit
    pub clean_to_raw: Vec<usize>,
}

impl DecodeSnapshot {
    /// Field boxes moved onto the wire bit axis, stuff bits inside a field included
    pub fn wire_field_boxes(&self) -> Vec<FieldBox> {
        let map = StuffMap::new(self.clean_bits.len(), &self.stuff_positions);
        self.field_boxes
            .iter()
            .filter_map(|fb| {
                let available = fb.width.min(self.clean_bits.len() - fb.start);
                map.stuffed_span(fb.start, available)
                    .map(|(start, width)| FieldBox {
                        start,
                        width,
                        ..fb.clone()
                    })
            })
            .collect()
    }
}

/// The main decoder struct - entry point for decoding a capture session
pub struct Decoder {
    edges: EdgeDecoder,
    totals: FeedSummary,
}

impl Decoder {
    /// Create a decoder with the calibrated defaults
    pub fn new() -> Self {
        Self {
            edges: EdgeDecoder::new(),
            totals: FeedSummary::default(),
        }
    }

    /// Create a decoder with a custom configuration
    ///
    /// # Example
    /// ```
    /// use can_bitstream::{CodecConfig, Decoder};
    ///
    /// let config = CodecConfig::new().with_partial_record_carry(true);
    /// let decoder = Decoder::with_config(config).unwrap();
    /// assert!(decoder.snapshot().raw_bits.is_empty());
    /// ```
    pub fn with_config(config: CodecConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            edges: EdgeDecoder::with_config(config),
            totals: FeedSummary::default(),
        })
    }

    /// Feed raw adapter bytes
    pub fn feed(&mut self, bytes: &[u8]) -> FeedSummary {
        let summary = self.edges.feed(bytes);
        self.totals.merge(summary);
        summary
    }

    /// Feed a buffer in fixed-size chunks, as if it arrived live
    pub fn feed_chunked(&mut self, bytes: &[u8], chunk_size: usize) -> FeedSummary {
        let mut summary = FeedSummary::default();
        for chunk in bytes.chunks(chunk_size.max(1)) {
            summary.merge(self.feed(chunk));
        }
        summary
    }

    /// Load a capture file and replay it into this session
    ///
    /// # Example
    /// ```no_run
    /// use can_bitstream::Decoder;
    /// use std::path::Path;
    ///
    /// let mut decoder = Decoder::new();
    /// decoder.decode_file(Path::new("capture.bin"), 120).unwrap();
    /// println!("{:?}", decoder.snapshot().frame);
    /// ```
    pub fn decode_file(&mut self, path: &Path, chunk_size: usize) -> Result<FeedSummary> {
        let bytes = load_capture(path)?;
        let summary = self.feed_chunked(&bytes, chunk_size);
        log::info!(
            "Decoded {:?}: {} records, {} bits, {} resets",
            path,
            summary.records,
            summary.bits_decoded,
            summary.resets
        );
        Ok(summary)
    }

    /// Start a fresh session
    pub fn reset(&mut self) {
        self.edges.reset();
        self.totals = FeedSummary::default();
    }

    /// Wire bits decoded so far
    pub fn bits(&self) -> &[Bit] {
        self.edges.bits()
    }

    /// Feed statistics accumulated since the last explicit reset
    pub fn totals(&self) -> FeedSummary {
        self.totals
    }

    /// Step-plot points of the captured waveform
    pub fn waveform(&self) -> Vec<(u32, Bit)> {
        self.edges.waveform()
    }

    pub fn edge_decoder(&self) -> &EdgeDecoder {
        &self.edges
    }

    /// De-stuff and extract everything available right now
    pub fn snapshot(&self) -> DecodeSnapshot {
        let raw_bits = self.edges.bits().to_vec();
        let destuffed =
            destuff_with_positions(&raw_bits, usize::MAX, self.edges.config().stuff_run);
        let map = StuffMap::new(destuffed.clean.len(), &destuffed.positions);

        DecodeSnapshot {
            stuff_flags: map.stuff_flags(raw_bits.len()),
            stuff_positions: destuffed.positions,
            frame: extract(&destuffed.clean),
            field_boxes: field_boxes(&destuffed.clean, &FrameLayout::classic()),
            clean_to_raw: map.raw_to_stuffed().to_vec(),
            clean_bits: destuffed.clean,
            raw_bits,
        }
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}
