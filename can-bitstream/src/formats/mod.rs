//! Capture file formats
//!
//! A capture holds the adapter's raw record bytes. Two layouts are found in
//! the wild:
//! - plain binary dumps of the serial stream
//! - text dumps with one bytes literal per line (`b'\x11\x01\x01\x00...'`)
//!
//! Both are reduced to the raw byte stream the edge decoder consumes.

use crate::types::{CodecError, Result};
use serde::Serialize;
use std::fs;
use std::path::Path;

pub mod literal;

pub use literal::{parse_bytes_literal, LiteralCapture};

/// Common trait for capture parsers
pub trait CaptureParser {
    /// Reduce file content to raw record bytes
    fn parse(content: &[u8]) -> Result<Vec<u8>>;
}

/// Binary capture: the content already is the record stream
pub struct BinaryCapture;

impl CaptureParser for BinaryCapture {
    fn parse(content: &[u8]) -> Result<Vec<u8>> {
        Ok(content.to_vec())
    }
}

/// Layout of a capture file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CaptureFormat {
    Binary,
    LiteralText,
}

impl CaptureFormat {
    /// Guess the layout from the file content
    pub fn detect(content: &[u8]) -> Self {
        let start = content
            .iter()
            .position(|b| !b.is_ascii_whitespace())
            .map(|i| &content[i..])
            .unwrap_or(&[]);
        if start.starts_with(b"b'") || start.starts_with(b"b\"") {
            CaptureFormat::LiteralText
        } else {
            CaptureFormat::Binary
        }
    }
}

/// Parse capture content of any supported layout
pub fn parse_capture(content: &[u8]) -> Result<Vec<u8>> {
    match CaptureFormat::detect(content) {
        CaptureFormat::Binary => BinaryCapture::parse(content),
        CaptureFormat::LiteralText => LiteralCapture::parse(content),
    }
}

/// Load a capture file and return its raw record bytes
pub fn load_capture(path: &Path) -> Result<Vec<u8>> {
    log::info!("Loading capture file: {:?}", path);

    if !path.exists() {
        return Err(CodecError::CaptureParse(format!(
            "capture file not found: {:?}",
            path
        )));
    }

    let content = fs::read(path)?;
    let format = CaptureFormat::detect(&content);
    log::debug!("Detected {:?} capture ({} bytes)", format, content.len());

    let bytes = parse_capture(&content)?;
    log::info!("Capture loaded: {} record bytes", bytes.len());
    Ok(bytes)
}
