//! Bit stuffing and de-stuffing
//!
//! CAN inserts a complementary bit after every run of five identical bits.
//! Both directions are driven by the same [`RunTracker`] so the encoder and
//! the decoder cannot disagree on where stuff bits live:
//!
//! - a bit equal to the previous one extends the run, any other bit starts a
//!   new run of length 1
//! - once the run reaches the limit, the next bit on the wire is a stuff bit
//! - the stuff bit itself starts the following run (length 1, flipped level)
//!
//! Stuffing is only applied while the raw (logical) index is inside the
//! protected region, which for a base frame ends after the CRC field.

use crate::types::Bit;

/// Identical bits after which CAN requires a stuff bit
pub const STUFF_RUN: usize = 5;

/// Run-length state shared by the stuffer and the de-stuffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunTracker {
    limit: usize,
    run: usize,
    last: Option<Bit>,
}

impl RunTracker {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            run: 0,
            last: None,
        }
    }

    /// Account for a data bit
    pub fn push(&mut self, bit: Bit) {
        if self.last == Some(bit) {
            self.run += 1;
        } else {
            self.run = 1;
            self.last = Some(bit);
        }
    }

    /// True when the next bit on the wire must be a stuff bit
    pub fn stuff_due(&self) -> bool {
        self.last.is_some() && self.run >= self.limit
    }

    /// The stuff bit the current run calls for
    pub fn stuff_bit(&self) -> Option<Bit> {
        self.last.map(|b| 1 - b)
    }

    /// Account for a stuff bit: it opens a new run of length 1
    pub fn push_stuff(&mut self, bit: Bit) {
        self.run = 1;
        self.last = Some(bit);
    }

    /// Length of the current run
    pub fn run(&self) -> usize {
        self.run
    }
}

impl Default for RunTracker {
    fn default() -> Self {
        Self::new(STUFF_RUN)
    }
}

/// Output of [`stuff`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stuffed {
    /// Bits as they appear on the wire
    pub bits: Vec<Bit>,
    /// Indices into `bits` of every inserted stuff bit, ascending
    pub positions: Vec<usize>,
}

/// Output of [`destuff_with_positions`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destuffed {
    /// Logical bits with stuff bits removed
    pub clean: Vec<Bit>,
    /// Indices into the input of every removed stuff bit, ascending
    pub positions: Vec<usize>,
}

/// Insert stuff bits into `raw` while the raw index is below `protected_len`
pub fn stuff(raw: &[Bit], protected_len: usize) -> Stuffed {
    stuff_with_run(raw, protected_len, STUFF_RUN)
}

/// [`stuff`] with a custom run length
pub fn stuff_with_run(raw: &[Bit], protected_len: usize, run_limit: usize) -> Stuffed {
    let mut bits = Vec::with_capacity(raw.len() + raw.len() / run_limit.max(1));
    let mut positions = Vec::new();
    let mut tracker = RunTracker::new(run_limit);

    for (raw_idx, &bit) in raw.iter().enumerate() {
        if raw_idx < protected_len && tracker.stuff_due() {
            if let Some(stuff_bit) = tracker.stuff_bit() {
                positions.push(bits.len());
                bits.push(stuff_bit);
                tracker.push_stuff(stuff_bit);
            }
        }
        bits.push(bit);
        tracker.push(bit);
    }

    log::trace!(
        "Stuffed {} raw bits into {} ({} stuff bits)",
        raw.len(),
        bits.len(),
        positions.len()
    );

    Stuffed { bits, positions }
}

/// Remove every stuff bit from a wire bit sequence
pub fn destuff(bits: &[Bit]) -> Vec<Bit> {
    destuff_with_positions(bits, usize::MAX, STUFF_RUN).clean
}

/// Remove stuff bits only while the clean length is below `protected_len`
pub fn destuff_within(bits: &[Bit], protected_len: usize) -> Vec<Bit> {
    destuff_with_positions(bits, protected_len, STUFF_RUN).clean
}

/// De-stuff and report where the removed bits were
pub fn destuff_with_positions(bits: &[Bit], protected_len: usize, run_limit: usize) -> Destuffed {
    let mut clean = Vec::with_capacity(bits.len());
    let mut positions = Vec::new();
    let mut tracker = RunTracker::new(run_limit);

    for (idx, &bit) in bits.iter().enumerate() {
        if clean.len() < protected_len && tracker.stuff_due() {
            if tracker.stuff_bit() != Some(bit) {
                log::trace!("Stuff bit at {} does not complement the preceding run", idx);
            }
            positions.push(idx);
            tracker.push_stuff(bit);
            continue;
        }
        clean.push(bit);
        tracker.push(bit);
    }

    Destuffed { clean, positions }
}

/// Raw ↔ stuffed index correspondence for one stuffing pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StuffMap {
    stuffed_positions: Vec<usize>,
    raw_to_stuffed: Vec<usize>,
}

impl StuffMap {
    /// Build the map for `raw_len` logical bits given the stuff positions
    pub fn new(raw_len: usize, stuffed_positions: &[usize]) -> Self {
        let mut positions = stuffed_positions.to_vec();
        positions.sort_unstable();
        positions.dedup();

        let mut raw_to_stuffed = Vec::with_capacity(raw_len);
        let mut pending = positions.iter().peekable();
        let mut stuffed_idx = 0;
        for _ in 0..raw_len {
            while pending.peek() == Some(&&stuffed_idx) {
                pending.next();
                stuffed_idx += 1;
            }
            raw_to_stuffed.push(stuffed_idx);
            stuffed_idx += 1;
        }

        Self {
            stuffed_positions: positions,
            raw_to_stuffed,
        }
    }

    /// Build the map straight from a stuffing pass
    pub fn from_stuffed(raw_len: usize, stuffed: &Stuffed) -> Self {
        Self::new(raw_len, &stuffed.positions)
    }

    /// Stuffed index of a raw (logical) index
    pub fn to_stuffed(&self, raw_idx: usize) -> Option<usize> {
        self.raw_to_stuffed.get(raw_idx).copied()
    }

    /// Raw index of a stuffed index, or `None` for stuff bits
    pub fn to_raw(&self, stuffed_idx: usize) -> Option<usize> {
        self.raw_to_stuffed.binary_search(&stuffed_idx).ok()
    }

    pub fn is_stuff_bit(&self, stuffed_idx: usize) -> bool {
        self.stuffed_positions.binary_search(&stuffed_idx).is_ok()
    }

    pub fn stuffed_positions(&self) -> &[usize] {
        &self.stuffed_positions
    }

    pub fn raw_to_stuffed(&self) -> &[usize] {
        &self.raw_to_stuffed
    }

    /// Stuffed start and width of a raw span, including interior stuff bits
    pub fn stuffed_span(&self, raw_start: usize, raw_len: usize) -> Option<(usize, usize)> {
        if raw_len == 0 {
            return None;
        }
        let start = self.to_stuffed(raw_start)?;
        let end = self.to_stuffed(raw_start + raw_len - 1)?;
        Some((start, end - start + 1))
    }

    /// Per-bit "is stuff bit" flags for a stuffed sequence of `stuffed_len` bits
    pub fn stuff_flags(&self, stuffed_len: usize) -> Vec<bool> {
        let mut flags = vec![false; stuffed_len];
        for &pos in &self.stuffed_positions {
            if let Some(flag) = flags.get_mut(pos) {
                *flag = true;
            }
        }
        flags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stuff_after_five_identical() {
        let raw = vec![0, 0, 0, 0, 0, 0, 1];
        let stuffed = stuff(&raw, raw.len());
        assert_eq!(stuffed.bits, vec![0, 0, 0, 0, 0, 1, 0, 1]);
        assert_eq!(stuffed.positions, vec![5]);
    }

    #[test]
    fn test_stuff_bit_starts_next_run() {
        // Stuff bit 1 plus four data 1s makes another run of five
        let raw = vec![0, 0, 0, 0, 0, 1, 1, 1, 1, 0];
        let stuffed = stuff(&raw, raw.len());
        assert_eq!(stuffed.bits, vec![0, 0, 0, 0, 0, 1, 1, 1, 1, 1, 0, 0]);
        assert_eq!(stuffed.positions, vec![5, 10]);
        assert_eq!(destuff(&stuffed.bits), raw);
    }

    #[test]
    fn test_run_of_five_at_end_needs_no_stuff_bit() {
        let raw = vec![1, 1, 1, 1, 1];
        let stuffed = stuff(&raw, raw.len());
        assert_eq!(stuffed.bits, raw);
        assert!(stuffed.positions.is_empty());
    }

    #[test]
    fn test_no_stuffing_past_protected_len() {
        let raw = vec![1; 12];
        let stuffed = stuff(&raw, 3);
        assert_eq!(stuffed.bits, raw);

        let stuffed = stuff(&raw, 7);
        // Only the stuff bit before raw index 5 is inside the protected region
        assert_eq!(stuffed.positions, vec![5]);
        assert_eq!(stuffed.bits.len(), 13);
    }

    #[test]
    fn test_destuff_reports_positions() {
        let wire = vec![1, 1, 1, 1, 1, 0, 1, 0];
        let result = destuff_with_positions(&wire, usize::MAX, STUFF_RUN);
        assert_eq!(result.clean, vec![1, 1, 1, 1, 1, 1, 0]);
        assert_eq!(result.positions, vec![5]);
    }

    #[test]
    fn test_destuff_within_leaves_tail_alone() {
        // EOF-like tail of seven recessive bits after the protected region
        let wire = vec![0, 1, 1, 1, 1, 1, 1, 1];
        assert_eq!(destuff_within(&wire, 1), wire);
        assert_eq!(destuff(&wire), vec![0, 1, 1, 1, 1, 1, 1]);
    }

    #[test]
    fn test_stuff_map_skips_stuff_positions() {
        let map = StuffMap::new(6, &[2, 5]);
        assert_eq!(map.raw_to_stuffed(), &[0, 1, 3, 4, 6, 7]);
        assert!(map.is_stuff_bit(5));
        assert!(!map.is_stuff_bit(4));
        assert_eq!(map.to_raw(3), Some(2));
        assert_eq!(map.to_raw(2), None);
        assert_eq!(map.stuffed_span(1, 3), Some((1, 4)));
        assert_eq!(map.stuffed_span(0, 0), None);
        assert_eq!(
            map.stuff_flags(8),
            vec![false, false, true, false, false, true, false, false]
        );
    }

    #[test]
    fn test_tracker_state_machine() {
        let mut tracker = RunTracker::default();
        assert!(!tracker.stuff_due());
        for _ in 0..5 {
            tracker.push(0);
        }
        assert!(tracker.stuff_due());
        assert_eq!(tracker.stuff_bit(), Some(1));
        tracker.push_stuff(1);
        assert_eq!(tracker.run(), 1);
        tracker.push(1);
        assert_eq!(tracker.run(), 2);
        tracker.push(0);
        assert_eq!(tracker.run(), 1);
    }
}
