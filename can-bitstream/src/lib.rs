//! CAN Bitstream Codec Library
//!
//! A bit-level codec for CAN 2.0A base frames as seen by a logic-level
//! capture adapter.
//!
//! # Architecture
//!
//! Decoding runs in three stages:
//! - [`EdgeDecoder`] turns timestamped level records into wire bits
//! - [`stuffing::destuff`] removes the stuff bits
//! - [`extract`] reads ID, DLC, data and CRC at the fixed field offsets
//!
//! Encoding runs the other way: [`FrameEncoder`] builds the logical field
//! groups from a hex description and [`stuffing::stuff`] inserts stuff bits
//! up to the end of the CRC field.
//!
//! The library does NOT:
//! - Compute or verify the CRC (the encoder emits a zero placeholder)
//! - Handle extended (29-bit) identifiers, remote or CAN FD frames
//! - Detect bus errors or arbitration loss
//!
//! # Example Usage
//!
//! ```
//! use can_bitstream::{destuff, extract, FrameEncoder};
//!
//! let frame = FrameEncoder::build("7FF00").unwrap();
//! let clean = destuff(&frame.stuffed.bits);
//! let decoded = extract(&clean);
//!
//! assert_eq!(decoded.id, Some(0x7FF));
//! assert_eq!(decoded.dlc, Some(1));
//! ```

pub mod config;
pub mod decoder;
pub mod duty;
pub mod edge_decoder;
pub mod encoder;
pub mod extractor;
pub mod formats;
pub mod layout;
pub mod record;
pub mod stream;
pub mod stuffing;
pub mod types;

// Re-export main types for convenience
pub use config::CodecConfig;
pub use decoder::{DecodeSnapshot, Decoder, DEFAULT_CHUNK_SIZE};
pub use edge_decoder::{EdgeDecoder, FeedSummary};
pub use encoder::{EncodedFrame, FieldBits, FrameEncoder, FrameSpec};
pub use extractor::{extract, field_boxes};
pub use layout::{FieldSpan, FrameLayout};
pub use stuffing::{destuff, stuff, StuffMap};
pub use types::{
    Bit, CodecError, DecodedFrame, Edge, FieldBox, FrameField, Result, BUS_IDLE_BITS,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_basics() {
        // Smoke test: an empty session decodes nothing
        let decoder = Decoder::new();
        let snapshot = decoder.snapshot();
        assert!(snapshot.clean_bits.is_empty());
        assert!(!snapshot.frame.is_complete());
    }
}
