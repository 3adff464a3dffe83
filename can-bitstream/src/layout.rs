//! CAN 2.0A base-frame field layout
//!
//! Offsets are in logical (de-stuffed) bits. The classic table places all
//! eight data slots at fixed offsets, which is what a display uses before the
//! DLC is known:
//!
//! | field    | start | width |
//! |----------|-------|-------|
//! | SOF      | 0     | 1     |
//! | ID       | 1     | 11    |
//! | RTR      | 12    | 1     |
//! | IDE      | 13    | 1     |
//! | r0       | 14    | 1     |
//! | DLC      | 15    | 4     |
//! | DATA0..7 | 19+8k | 8     |
//! | CRC      | 83    | 15    |
//! | CRC_del  | 98    | 1     |
//! | ACK      | 99    | 1     |
//! | ACK_del  | 100   | 1     |
//! | EOF      | 101   | 7     |

use crate::types::{FrameField, MAX_DATA_BYTES};
use serde::Serialize;

impl FrameField {
    /// Width of the field in logical bits
    pub fn width(&self) -> usize {
        match self {
            FrameField::Sof
            | FrameField::Rtr
            | FrameField::Ide
            | FrameField::R0
            | FrameField::CrcDelimiter
            | FrameField::Ack
            | FrameField::AckDelimiter => 1,
            FrameField::Id => 11,
            FrameField::Dlc => 4,
            FrameField::Data(_) => 8,
            FrameField::Crc => 15,
            FrameField::Eof => 7,
        }
    }
}

/// Position of one field within a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldSpan {
    pub field: FrameField,
    pub start: usize,
    pub width: usize,
}

impl FieldSpan {
    /// One past the last bit of the field
    pub fn end(&self) -> usize {
        self.start + self.width
    }
}

/// Ordered field spans of one frame shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameLayout {
    spans: Vec<FieldSpan>,
}

impl FrameLayout {
    /// Fixed table with all eight data slots
    pub fn classic() -> Self {
        Self::with_data_slots(MAX_DATA_BYTES)
    }

    /// Layout of a frame carrying `dlc` data bytes (capped at 8)
    pub fn for_dlc(dlc: u8) -> Self {
        Self::with_data_slots((dlc as usize).min(MAX_DATA_BYTES))
    }

    fn with_data_slots(slots: usize) -> Self {
        let header = [
            FrameField::Sof,
            FrameField::Id,
            FrameField::Rtr,
            FrameField::Ide,
            FrameField::R0,
            FrameField::Dlc,
        ];
        let trailer = [
            FrameField::Crc,
            FrameField::CrcDelimiter,
            FrameField::Ack,
            FrameField::AckDelimiter,
            FrameField::Eof,
        ];
        let data = (0..slots).map(|i| FrameField::Data(i as u8));

        let mut start = 0;
        let spans = header
            .into_iter()
            .chain(data)
            .chain(trailer)
            .map(|field| {
                let span = FieldSpan {
                    field,
                    start,
                    width: field.width(),
                };
                start += span.width;
                span
            })
            .collect();

        Self { spans }
    }

    pub fn spans(&self) -> &[FieldSpan] {
        &self.spans
    }

    pub fn span(&self, field: FrameField) -> Option<FieldSpan> {
        self.spans.iter().copied().find(|s| s.field == field)
    }

    /// Field whose first bit is at `offset`
    pub fn field_starting_at(&self, offset: usize) -> Option<FieldSpan> {
        self.spans.iter().copied().find(|s| s.start == offset)
    }

    /// Field covering bit `offset`
    pub fn field_containing(&self, offset: usize) -> Option<FieldSpan> {
        self.spans
            .iter()
            .copied()
            .find(|s| s.start <= offset && offset < s.end())
    }

    /// Logical length of the whole frame
    pub fn total_bits(&self) -> usize {
        self.spans.last().map(FieldSpan::end).unwrap_or(0)
    }

    /// End of the CRC field: stuffing applies to everything before it
    pub fn stuffing_end(&self) -> usize {
        self.span(FrameField::Crc).map(|s| s.end()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classic_offsets() {
        let layout = FrameLayout::classic();
        let starts: Vec<(String, usize)> = layout
            .spans()
            .iter()
            .map(|s| (s.field.label(), s.start))
            .collect();

        let expected = [
            ("SOF", 0),
            ("ID", 1),
            ("RTR", 12),
            ("IDE", 13),
            ("r0", 14),
            ("DLC", 15),
            ("DATA0", 19),
            ("DATA1", 27),
            ("DATA2", 35),
            ("DATA3", 43),
            ("DATA4", 51),
            ("DATA5", 59),
            ("DATA6", 67),
            ("DATA7", 75),
            ("CRC", 83),
            ("CRC_del", 98),
            ("ACK", 99),
            ("ACK_del", 100),
            ("EOF", 101),
        ];
        let expected: Vec<(String, usize)> =
            expected.iter().map(|(n, s)| (n.to_string(), *s)).collect();
        assert_eq!(starts, expected);
        assert_eq!(layout.total_bits(), 108);
        assert_eq!(layout.stuffing_end(), 98);
    }

    #[test]
    fn test_width_is_distance_to_next_start() {
        let layout = FrameLayout::classic();
        for pair in layout.spans().windows(2) {
            assert_eq!(pair[0].start + pair[0].width, pair[1].start);
        }
    }

    #[test]
    fn test_layout_for_short_frame() {
        let layout = FrameLayout::for_dlc(1);
        assert_eq!(layout.span(FrameField::Data(1)), None);
        assert_eq!(layout.span(FrameField::Crc).map(|s| s.start), Some(27));
        assert_eq!(layout.stuffing_end(), 42);
        assert_eq!(FrameLayout::for_dlc(15), FrameLayout::classic());
    }

    #[test]
    fn test_field_lookup() {
        let layout = FrameLayout::classic();
        assert_eq!(
            layout.field_starting_at(15).map(|s| s.field),
            Some(FrameField::Dlc)
        );
        assert_eq!(layout.field_starting_at(16), None);
        assert_eq!(
            layout.field_containing(90).map(|s| s.field),
            Some(FrameField::Crc)
        );
        assert_eq!(layout.field_containing(108), None);
    }
}
