//! Wire records emitted by the edge-capture adapter
//!
//! Each record is 8 bytes:
//!
//! ```text
//! [0x11][level][0x01][0x00][timestamp u32 LE]
//! ```
//!
//! Only `11 00 01` and `11 01 01` are valid headers; anything else is noise
//! and is skipped a byte at a time until the stream re-synchronises.

use crate::types::Edge;
use byteorder::{ByteOrder, LittleEndian};

/// Length of one wire record
pub const RECORD_LEN: usize = 8;

const HEADER_TAG: u8 = 0x11;
const HEADER_MARK: u8 = 0x01;

/// Outcome of looking for a record at a byte offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scan {
    /// A complete record
    Record(Edge),
    /// Fewer than 8 bytes remain and they could still be the start of a
    /// record. `header_matched` is set when all three header bytes are present.
    Truncated { header_matched: bool },
    /// No record starts here
    NoHeader,
}

fn is_header(bytes: &[u8]) -> bool {
    matches!(bytes, [HEADER_TAG, 0x00 | 0x01, HEADER_MARK, ..])
}

fn is_header_prefix(bytes: &[u8]) -> bool {
    match bytes {
        [] => false,
        [HEADER_TAG] | [HEADER_TAG, 0x00 | 0x01] => true,
        _ => is_header(bytes),
    }
}

/// Try to read a record starting at `pos`
pub fn scan_at(bytes: &[u8], pos: usize) -> Scan {
    let rest = match bytes.get(pos..) {
        Some(rest) => rest,
        None => return Scan::NoHeader,
    };

    if rest.len() < RECORD_LEN {
        if is_header_prefix(rest) {
            return Scan::Truncated {
                header_matched: is_header(rest),
            };
        }
        return Scan::NoHeader;
    }

    if !is_header(rest) {
        return Scan::NoHeader;
    }

    let level = rest[1];
    let timestamp = LittleEndian::read_u32(&rest[4..RECORD_LEN]);
    Scan::Record(Edge::new(level, timestamp))
}

/// Serialize an edge the way the adapter sends it
pub fn encode_record(edge: Edge) -> [u8; RECORD_LEN] {
    let mut record = [HEADER_TAG, edge.level & 1, HEADER_MARK, 0x00, 0, 0, 0, 0];
    LittleEndian::write_u32(&mut record[4..], edge.timestamp);
    record
}

/// Serialize a sequence of edges into one byte stream
pub fn encode_records<'a>(edges: impl IntoIterator<Item = &'a Edge>) -> Vec<u8> {
    edges
        .into_iter()
        .flat_map(|edge| encode_record(*edge))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_valid_record() {
        let bytes = [0x11, 0x01, 0x01, 0x00, 0x34, 0x12, 0x00, 0x00];
        assert_eq!(scan_at(&bytes, 0), Scan::Record(Edge::new(1, 0x1234)));
    }

    #[test]
    fn test_scan_rejects_unknown_level() {
        let bytes = [0x11, 0x02, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00];
        assert_eq!(scan_at(&bytes, 0), Scan::NoHeader);
    }

    #[test]
    fn test_scan_truncated_header() {
        let bytes = [0xAA, 0x11, 0x00, 0x01, 0x00, 0x05];
        assert_eq!(scan_at(&bytes, 0), Scan::NoHeader);
        assert_eq!(scan_at(&bytes, 1), Scan::Truncated { header_matched: true });
        assert_eq!(scan_at(&bytes, 2), Scan::NoHeader);
        assert_eq!(scan_at(&[0x11, 0x01], 0), Scan::Truncated { header_matched: false });
        assert_eq!(scan_at(&bytes, 10), Scan::NoHeader);
    }

    #[test]
    fn test_encode_record_layout() {
        let record = encode_record(Edge::new(0, 0x0102_0304));
        assert_eq!(record, [0x11, 0x00, 0x01, 0x00, 0x04, 0x03, 0x02, 0x01]);
        assert_eq!(scan_at(&record, 0), Scan::Record(Edge::new(0, 0x0102_0304)));
    }
}
