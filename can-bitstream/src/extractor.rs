//! Frame field extraction from clean (de-stuffed) bits
//!
//! Fields appear as soon as enough bits have arrived; a field that is not
//! complete yet is simply left out of the result.

use crate::layout::{FieldSpan, FrameLayout};
use crate::types::{bits_to_u64, Bit, DecodedFrame, FieldBox, FrameField, MAX_DATA_BYTES};

/// Value of a span if all of its bits are present
fn read_span(clean: &[Bit], span: FieldSpan) -> Option<u64> {
    clean.get(span.start..span.end()).map(bits_to_u64)
}

/// Extract fields using the fixed classic table
///
/// Needs 12 bits for the ID, 19 for the DLC, `19 + 8(k+1)` for data byte k
/// and 98 for the CRC.
pub fn extract(clean: &[Bit]) -> DecodedFrame {
    extract_with_layout(clean, &FrameLayout::classic())
}

/// Extract fields using an arbitrary layout
pub fn extract_with_layout(clean: &[Bit], layout: &FrameLayout) -> DecodedFrame {
    let read = |field: FrameField| layout.span(field).and_then(|span| read_span(clean, span));

    let mut frame = DecodedFrame {
        id: read(FrameField::Id).map(|v| v as u16),
        dlc: read(FrameField::Dlc).map(|v| v as u8),
        ..DecodedFrame::default()
    };

    if let Some(dlc) = frame.dlc {
        for i in 0..(dlc as usize).min(MAX_DATA_BYTES) {
            match read(FrameField::Data(i as u8)) {
                Some(byte) => frame.data.push(byte as u8),
                None => break,
            }
        }
    }

    frame.crc = read(FrameField::Crc).map(|v| v as u16);
    frame
}

/// Extract fields placing data and CRC according to the decoded DLC
///
/// Unlike [`extract`], the CRC of a short frame is read right after its last
/// data byte instead of at the fixed offset 83.
pub fn extract_by_dlc(clean: &[Bit]) -> DecodedFrame {
    let header = extract(clean);
    match header.dlc {
        Some(dlc) => extract_with_layout(clean, &FrameLayout::for_dlc(dlc)),
        None => header,
    }
}

/// Field boxes for every field the clean sequence has reached
///
/// Once the DLC is known, data slots past it are left out.
pub fn field_boxes(clean: &[Bit], layout: &FrameLayout) -> Vec<FieldBox> {
    let dlc = layout
        .span(FrameField::Dlc)
        .and_then(|span| read_span(clean, span))
        .map(|v| (v as usize).min(MAX_DATA_BYTES));

    layout
        .spans()
        .iter()
        .take_while(|span| span.start < clean.len())
        .filter(|span| match (span.field, dlc) {
            (FrameField::Data(i), Some(dlc)) => (i as usize) < dlc,
            _ => true,
        })
        .map(|&span| FieldBox {
            field: span.field,
            start: span.start,
            width: span.width,
            value: read_span(clean, span),
        })
        .collect()
}
