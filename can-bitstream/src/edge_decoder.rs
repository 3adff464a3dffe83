//! Edge-to-bit decoder
//!
//! Turns the adapter's timestamped level samples into a bit sequence (stuff
//! bits still present). The line is integrated over fixed bit windows; a
//! window that an edge cuts in two is resolved with the duty-cycle table in
//! [`crate::duty`].
//!
//! All state belongs to one [`EdgeDecoder`] value. A session lasts until an
//! explicit [`EdgeDecoder::reset`] or until a record arrives with a timestamp
//! lower than the previous one (capture buffer wrap-around).

use crate::config::CodecConfig;
use crate::duty::{decide_bit, DutySplit};
use crate::record::{scan_at, Scan, RECORD_LEN};
use crate::types::{Bit, Edge};
use serde::Serialize;
use std::borrow::Cow;

/// What happened during one [`EdgeDecoder::feed`] call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FeedSummary {
    /// Records accepted as edges
    pub records: usize,
    /// Records dropped because they repeat the previous level
    pub duplicates: usize,
    /// Headers with fewer than 8 bytes behind them
    pub malformed: usize,
    /// Sessions restarted because of a timestamp rollback
    pub resets: usize,
    /// Bits appended to the bit sequence
    pub bits_decoded: usize,
    /// Bytes skipped while searching for a header
    pub skipped_bytes: usize,
}

impl FeedSummary {
    /// Fold another summary into this one
    pub fn merge(&mut self, other: FeedSummary) {
        self.records += other.records;
        self.duplicates += other.duplicates;
        self.malformed += other.malformed;
        self.resets += other.resets;
        self.bits_decoded += other.bits_decoded;
        self.skipped_bytes += other.skipped_bytes;
    }
}

/// Stateful edge-to-bit decoder for a single capture session
#[derive(Debug, Clone)]
pub struct EdgeDecoder {
    config: CodecConfig,
    edges: Vec<Edge>,
    bits: Vec<Bit>,
    bit_index: usize,
    duty: DutySplit,
    last_timestamp: u32,
    bit_duration: f64,
    /// Start of a record cut off at the end of the previous feed
    pending: Vec<u8>,
}

impl EdgeDecoder {
    /// Create a decoder with the calibrated defaults
    pub fn new() -> Self {
        Self::with_config(CodecConfig::default())
    }

    pub fn with_config(config: CodecConfig) -> Self {
        let bit_duration = config.nominal_bit_ticks;
        Self {
            config,
            edges: Vec::new(),
            bits: Vec::new(),
            bit_index: 0,
            duty: DutySplit::default(),
            last_timestamp: 0,
            bit_duration,
            pending: Vec::new(),
        }
    }

    /// Drop all session state
    pub fn reset(&mut self) {
        self.edges.clear();
        self.bits.clear();
        self.bit_index = 0;
        self.duty = DutySplit::default();
        self.last_timestamp = 0;
        self.bit_duration = self.config.nominal_bit_ticks;
        self.pending.clear();
    }

    /// Scan raw adapter bytes and integrate every record found
    pub fn feed(&mut self, bytes: &[u8]) -> FeedSummary {
        let mut summary = FeedSummary::default();

        let input: Cow<'_, [u8]> = if self.pending.is_empty() {
            Cow::Borrowed(bytes)
        } else {
            let mut joined = std::mem::take(&mut self.pending);
            joined.extend_from_slice(bytes);
            Cow::Owned(joined)
        };

        let mut pos = 0;
        while pos < input.len() {
            match scan_at(&input, pos) {
                Scan::Record(edge) => {
                    self.accept(edge, &mut summary);
                    pos += RECORD_LEN;
                }
                Scan::Truncated { header_matched } => {
                    if self.config.carry_partial_records {
                        self.pending = input[pos..].to_vec();
                        log::trace!("Holding {} bytes of a split record", self.pending.len());
                        break;
                    }
                    if header_matched {
                        log::debug!("Dropping malformed record at offset {}", pos);
                        summary.malformed += 1;
                    } else {
                        summary.skipped_bytes += 1;
                    }
                    pos += 1;
                }
                Scan::NoHeader => {
                    summary.skipped_bytes += 1;
                    pos += 1;
                }
            }
        }

        summary
    }

    fn accept(&mut self, edge: Edge, summary: &mut FeedSummary) {
        if let Some(last) = self.edges.last() {
            if edge.timestamp < last.timestamp {
                log::info!(
                    "Timestamp rolled back ({} < {}), starting a new session",
                    edge.timestamp,
                    last.timestamp
                );
                self.reset();
                summary.resets += 1;
            }
        }

        if self.edges.len() >= 2 && self.edges.last().map(|e| e.level) == Some(edge.level) {
            log::debug!("Dropping repeated level {} at tick {}", edge.level, edge.timestamp);
            summary.duplicates += 1;
            return;
        }

        self.edges.push(edge);
        summary.records += 1;

        let before = self.bits.len();
        self.integrate(edge);
        summary.bits_decoded += self.bits.len() - before;
    }

    fn integrate(&mut self, edge: Edge) {
        if self.bit_index > self.config.drift_after_bits {
            self.bit_duration = self.config.drift_bit_ticks;
        }

        let ts = f64::from(edge.timestamp);
        // The level before this edge is what the elapsed time was spent at
        let previous = 1 - (edge.level & 1);

        loop {
            let start = self.bit_index as f64 * self.bit_duration;
            if start > ts {
                break;
            }
            let end = (self.bit_index + 1) as f64 * self.bit_duration;
            if end <= ts {
                let bit = if self.duty.is_empty() {
                    previous
                } else {
                    self.duty.set(previous, end - f64::from(self.last_timestamp));
                    decide_bit(self.duty, &self.bits, self.config.duty_threshold)
                };
                log::trace!("Bit {} = {} (duty {:?})", self.bit_index, bit, self.duty);
                self.bits.push(bit);
                self.duty = DutySplit::default();
                self.bit_index += 1;
            } else {
                self.duty.set(previous, ts - start);
                break;
            }
        }

        self.last_timestamp = edge.timestamp;
    }

    /// Decoded bits so far, stuff bits included
    pub fn bits(&self) -> &[Bit] {
        &self.bits
    }

    /// Accepted edges of the current session
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Index of the bit window currently being integrated
    pub fn bit_index(&self) -> usize {
        self.bit_index
    }

    /// Bit window length currently in use
    pub fn bit_duration(&self) -> f64 {
        self.bit_duration
    }

    /// Duty split accumulated for the open window
    pub fn duty(&self) -> DutySplit {
        self.duty
    }

    /// Bytes held back from a split record
    pub fn pending_bytes(&self) -> usize {
        self.pending.len()
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Step-plot points (tick, level) of the captured waveform
    pub fn waveform(&self) -> Vec<(u32, Bit)> {
        let mut points = Vec::with_capacity(self.edges.len() * 2);
        for edge in &self.edges {
            if let Some(&(_, level)) = points.last() {
                points.push((edge.timestamp, level));
            }
            points.push((edge.timestamp, edge.level));
        }
        points
    }
}

impl Default for EdgeDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{encode_record, encode_records};

    fn records(edges: &[(Bit, u32)]) -> Vec<u8> {
        let edges: Vec<Edge> = edges.iter().map(|&(l, t)| Edge::new(l, t)).collect();
        encode_records(&edges)
    }

    /// Edges for a bit sequence at 20 ticks per bit, closed by a final edge
    fn edges_for_bits(bits: &[Bit]) -> Vec<(Bit, u32)> {
        let mut edges = vec![(bits[0], 0)];
        for (i, pair) in bits.windows(2).enumerate() {
            if pair[0] != pair[1] {
                edges.push((pair[1], (i as u32 + 1) * 20));
            }
        }
        let last = bits[bits.len() - 1];
        edges.push((1 - last, bits.len() as u32 * 20));
        edges
    }

    #[test]
    fn test_clean_edges_reproduce_bits() {
        let bits = vec![0, 1, 1, 0, 0, 0, 1, 0, 1, 1, 1, 1, 1, 0];
        let mut decoder = EdgeDecoder::new();
        let summary = decoder.feed(&records(&edges_for_bits(&bits)));

        assert_eq!(decoder.bits(), bits.as_slice());
        assert_eq!(summary.bits_decoded, bits.len());
        assert_eq!(summary.resets, 0);
        assert_eq!(decoder.bit_index(), bits.len());
    }

    #[test]
    fn test_partial_period_uses_duty_table() {
        let mut decoder = EdgeDecoder::new();
        decoder.feed(&records(&[(1, 0), (0, 30), (1, 50), (0, 100)]));
        assert_eq!(decoder.bits(), &[1, 0, 0, 1, 1]);
    }

    #[test]
    fn test_arbitrary_chunking() {
        let bits = vec![1, 0, 1, 1, 0, 0, 1, 0, 0, 0, 1, 1];
        let bytes = records(&edges_for_bits(&bits));

        let mut whole = EdgeDecoder::new();
        whole.feed(&bytes);

        let mut chunked = EdgeDecoder::new();
        for chunk in bytes.chunks(RECORD_LEN) {
            chunked.feed(chunk);
        }
        assert_eq!(chunked.bits(), whole.bits());
    }

    #[test]
    fn test_timestamp_rollback_resets_session() {
        let mut decoder = EdgeDecoder::new();
        decoder.feed(&records(&[(1, 0), (0, 100)]));
        assert_eq!(decoder.bits().len(), 5);

        let summary = decoder.feed(&records(&[(1, 5)]));
        assert_eq!(summary.resets, 1);
        assert_eq!(decoder.bit_index(), 0);
        assert!(decoder.bits().is_empty());
        assert_eq!(decoder.edges(), &[Edge::new(1, 5)]);
    }

    #[test]
    fn test_duplicate_level_is_dropped() {
        let mut decoder = EdgeDecoder::new();
        decoder.feed(&records(&[(1, 0), (0, 100)]));
        let bits_before = decoder.bits().to_vec();

        let summary = decoder.feed(&records(&[(0, 100), (0, 100)]));
        assert_eq!(summary.duplicates, 2);
        assert_eq!(summary.records, 0);
        assert_eq!(decoder.bits(), bits_before.as_slice());
        assert_eq!(decoder.edges().len(), 2);
    }

    #[test]
    fn test_repeat_with_single_sample_is_kept() {
        let mut decoder = EdgeDecoder::new();
        let summary = decoder.feed(&records(&[(1, 0), (1, 0)]));
        assert_eq!(summary.records, 2);
        assert_eq!(summary.duplicates, 0);
    }

    #[test]
    fn test_malformed_trailing_record() {
        let mut bytes = encode_record(Edge::new(1, 0)).to_vec();
        bytes.extend_from_slice(&[0x11, 0x01, 0x01, 0x00, 0x05]);

        let mut decoder = EdgeDecoder::new();
        let summary = decoder.feed(&bytes);
        assert_eq!(summary.records, 1);
        assert_eq!(summary.malformed, 1);
        // Scan moved one byte past the header and skipped the other four
        assert_eq!(summary.skipped_bytes, 4);
        assert_eq!(decoder.edges().len(), 1);
        assert!(decoder.bits().is_empty());
        assert_eq!(decoder.pending_bytes(), 0);
    }

    #[test]
    fn test_noise_between_records_is_skipped() {
        let mut bytes = vec![0x00, 0xFF, 0x11, 0x02];
        bytes.extend_from_slice(&encode_record(Edge::new(1, 0)));
        bytes.extend_from_slice(&[0x42]);
        bytes.extend_from_slice(&encode_record(Edge::new(0, 40)));

        let mut decoder = EdgeDecoder::new();
        let summary = decoder.feed(&bytes);
        assert_eq!(summary.records, 2);
        assert_eq!(summary.skipped_bytes, 5);
        assert_eq!(decoder.bits(), &[1, 1]);
    }

    #[test]
    fn test_split_record_carried_when_enabled() {
        let bytes = records(&[(1, 0), (0, 60)]);
        let config = CodecConfig::new().with_partial_record_carry(true);
        let mut decoder = EdgeDecoder::with_config(config);

        let first = decoder.feed(&bytes[..11]);
        assert_eq!(first.records, 1);
        assert_eq!(first.malformed, 0);
        assert_eq!(decoder.pending_bytes(), 3);

        let second = decoder.feed(&bytes[11..]);
        assert_eq!(second.records, 1);
        assert_eq!(decoder.pending_bytes(), 0);
        assert_eq!(decoder.bits(), &[1, 1, 1]);
    }

    #[test]
    fn test_split_record_lost_by_default() {
        let bytes = records(&[(1, 0), (0, 60)]);
        let mut decoder = EdgeDecoder::new();
        decoder.feed(&bytes[..11]);
        decoder.feed(&bytes[11..]);
        assert_eq!(decoder.edges().len(), 1);
    }

    #[test]
    fn test_bit_duration_switches_after_forty_bits() {
        let mut decoder = EdgeDecoder::new();
        decoder.feed(&records(&[(1, 0), (0, 900)]));
        assert_eq!(decoder.bit_index(), 45);
        assert_eq!(decoder.bit_duration(), 20.0);

        decoder.feed(&records(&[(1, 1000)]));
        assert_eq!(decoder.bit_duration(), 20.1);
    }

    #[test]
    fn test_reset_restores_nominal_duration() {
        let mut decoder = EdgeDecoder::new();
        decoder.feed(&records(&[(1, 0), (0, 900), (1, 1000)]));
        decoder.reset();
        assert_eq!(decoder.bit_duration(), 20.0);
        assert!(decoder.edges().is_empty());
        assert_eq!(decoder.duty(), DutySplit::default());
    }

    #[test]
    fn test_waveform_steps() {
        let mut decoder = EdgeDecoder::new();
        decoder.feed(&records(&[(1, 0), (0, 40), (1, 60)]));
        assert_eq!(
            decoder.waveform(),
            vec![(0, 1), (40, 1), (40, 0), (60, 0), (60, 1)]
        );
    }
}
