//! Report generation
//!
//! Generates TXT and JSON reports for decoded captures and encoded frames.

use anyhow::Result;
use can_bitstream::types::bits_to_string;
use can_bitstream::{Bit, DecodeSnapshot, EncodedFrame, FeedSummary, BUS_IDLE_BITS};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write;

/// A labelled field as shown in a report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldEntry {
    pub label: String,
    pub start: usize,
    pub width: usize,
    /// Hex rendering for ID/DLC/DATA/CRC, binary for the control bits
    pub value: Option<String>,
}

/// Result of decoding one capture file
#[derive(Debug, Clone, Serialize)]
pub struct CaptureReport {
    pub capture: String,
    pub totals: FeedSummary,
    /// Wire bits, stuff bits in brackets
    pub wire_bits: String,
    pub clean_bits: String,
    pub stuff_positions: Vec<usize>,
    pub fields: Vec<FieldEntry>,
    pub complete: bool,
}

impl CaptureReport {
    pub fn new(capture: String, totals: FeedSummary, snapshot: &DecodeSnapshot) -> Self {
        let fields = snapshot
            .field_boxes
            .iter()
            .map(|fb| FieldEntry {
                label: fb.field.label(),
                start: fb.start,
                width: fb.width,
                value: snapshot
                    .frame
                    .hex_value(fb.field)
                    .or_else(|| fb.value.map(|v| format!("{:0width$b}", v, width = fb.width))),
            })
            .collect();

        Self {
            capture,
            totals,
            wire_bits: mark_stuff_bits(&snapshot.raw_bits, &snapshot.stuff_flags),
            clean_bits: bits_to_string(&snapshot.clean_bits),
            stuff_positions: snapshot.stuff_positions.clone(),
            fields,
            complete: snapshot.frame.is_complete(),
        }
    }
}

/// Result of encoding one hex frame
#[derive(Debug, Clone, Serialize)]
pub struct EncodeReport {
    pub input: String,
    pub id: String,
    pub dlc: u8,
    /// Logical bit groups in transmission order
    pub groups: Vec<FieldEntry>,
    /// Idle bits followed by the wire bits, stuff bits in brackets
    pub wire_bits: String,
    pub stuff_positions: Vec<usize>,
    /// Field spans on the stuffed axis
    pub spans: Vec<FieldEntry>,
}

impl EncodeReport {
    pub fn new(input: &str, frame: &EncodedFrame) -> Self {
        let mut offset = 0;
        let groups = frame
            .fields
            .iter()
            .map(|group| {
                let entry = FieldEntry {
                    label: group.field.label(),
                    start: offset,
                    width: group.bits.len(),
                    value: Some(bits_to_string(&group.bits)),
                };
                offset += group.bits.len();
                entry
            })
            .collect();

        let spans = frame
            .stuffed_spans()
            .into_iter()
            .map(|span| FieldEntry {
                label: span.field.label(),
                start: span.start,
                width: span.width,
                value: None,
            })
            .collect();

        Self {
            input: input.trim().to_string(),
            id: format!("0x{:03X}", frame.spec.id),
            dlc: frame.spec.dlc(),
            groups,
            wire_bits: format!(
                "{}{}",
                "1".repeat(BUS_IDLE_BITS),
                mark_stuff_bits(&frame.stuffed.bits, &frame.stuff_flags())
            ),
            stuff_positions: frame.stuffed.positions.clone(),
            spans,
        }
    }
}

/// Complete report of one CLI run
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub generated_at: DateTime<Utc>,
    pub version: String,
    pub captures: Vec<CaptureReport>,
    pub encoded: Option<EncodeReport>,
}

impl Report {
    pub fn new() -> Self {
        Self {
            generated_at: Utc::now(),
            version: can_bitstream::VERSION.to_string(),
            captures: Vec::new(),
            encoded: None,
        }
    }
}

impl Default for Report {
    fn default() -> Self {
        Self::new()
    }
}

/// Render bits with every flagged stuff bit in brackets
pub fn mark_stuff_bits(bits: &[Bit], flags: &[bool]) -> String {
    let mut out = String::with_capacity(bits.len() * 2);
    for (i, &bit) in bits.iter().enumerate() {
        let c = if bit == 0 { '0' } else { '1' };
        if flags.get(i).copied().unwrap_or(false) {
            out.push('[');
            out.push(c);
            out.push(']');
        } else {
            out.push(c);
        }
    }
    out
}

pub fn render_json(report: &Report) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

pub fn render_txt(report: &Report) -> Result<String> {
    let mut out = String::new();
    let rule = "═".repeat(63);

    writeln!(out, "{}", rule)?;
    writeln!(out, "  CAN Bitstream Report (v{})", report.version)?;
    writeln!(out, "  Generated: {}", report.generated_at.format("%Y-%m-%d %H:%M:%S UTC"))?;
    writeln!(out, "{}", rule)?;

    if let Some(encoded) = &report.encoded {
        writeln!(out, "\nEncoded frame {:?}: ID {} DLC {}", encoded.input, encoded.id, encoded.dlc)?;
        writeln!(out, "\n  Field groups:")?;
        for group in &encoded.groups {
            writeln!(
                out,
                "    {:<8} {}",
                group.label,
                group.value.as_deref().unwrap_or("")
            )?;
        }
        writeln!(out, "\n  Wire (idle + frame):")?;
        writeln!(out, "    {}", encoded.wire_bits)?;
        writeln!(out, "  Stuff bits at: {:?}", encoded.stuff_positions)?;
        writeln!(out, "\n  Stuffed spans:")?;
        for span in &encoded.spans {
            writeln!(out, "    {:<8} {:>3}..{:<3}", span.label, span.start, span.start + span.width)?;
        }
    }

    for capture in &report.captures {
        writeln!(out, "\nCapture: {}", capture.capture)?;
        writeln!(out, "  Wire:  {}", capture.wire_bits)?;
        writeln!(out, "  Clean: {}", capture.clean_bits)?;
        writeln!(out, "  Stuff bits at: {:?}", capture.stuff_positions)?;
        writeln!(out, "\n  Fields{}:", if capture.complete { "" } else { " (partial)" })?;
        for field in &capture.fields {
            writeln!(
                out,
                "    {:<8} {:>3}..{:<3} {}",
                field.label,
                field.start,
                field.start + field.width,
                field.value.as_deref().unwrap_or("-")
            )?;
        }
        let t = &capture.totals;
        writeln!(
            out,
            "\n  Records: {}  Duplicates: {}  Malformed: {}  Resets: {}  Bits: {}  Skipped bytes: {}",
            t.records, t.duplicates, t.malformed, t.resets, t.bits_decoded, t.skipped_bytes
        )?;
    }

    Ok(out)
}
