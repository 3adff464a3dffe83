//! Duty-cycle bit decision
//!
//! When an edge lands inside a bit period, the decoder remembers how long the
//! line sat at each level before the edge. Once the period is complete the bit
//! is decided from that split and the tail of the already decoded bits.
//!
//! The rules are a calibrated table tuned against the capture hardware and are
//! evaluated top to bottom; the first matching row wins.

use crate::types::Bit;

/// Bits of history consulted by the tie-break rows
pub const TIE_WINDOW: usize = 5;

/// Bit chosen when no row matches
const DEFAULT_BIT: Bit = 1;

/// Ticks spent low and high within the current bit period
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DutySplit {
    pub low: f64,
    pub high: f64,
}

impl DutySplit {
    pub fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    /// Nothing accumulated in this period yet
    pub fn is_empty(&self) -> bool {
        self.low == 0.0 && self.high == 0.0
    }

    /// Record `ticks` spent at `level`
    pub fn set(&mut self, level: Bit, ticks: f64) {
        if level == 0 {
            self.low = ticks;
        } else {
            self.high = ticks;
        }
    }

    fn share(&self, share: Share) -> f64 {
        match share {
            Share::Low => self.low,
            Share::High => self.high,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Share {
    Low,
    High,
}

#[derive(Debug, Clone, Copy)]
enum Compare {
    Above,
    Equal,
}

#[derive(Debug, Clone, Copy)]
enum Outcome {
    Fixed(Bit),
    /// `then` if the last [`TIE_WINDOW`] bits sum to `window_sum`, else `otherwise`
    TieBreak {
        window_sum: usize,
        then: Bit,
        otherwise: Bit,
    },
}

#[derive(Debug, Clone, Copy)]
struct DutyRule {
    share: Share,
    compare: Compare,
    outcome: Outcome,
}

const DUTY_TABLE: [DutyRule; 3] = [
    DutyRule {
        share: Share::Low,
        compare: Compare::Above,
        outcome: Outcome::Fixed(0),
    },
    DutyRule {
        share: Share::Low,
        compare: Compare::Equal,
        outcome: Outcome::TieBreak {
            window_sum: 0,
            then: 1,
            otherwise: 0,
        },
    },
    DutyRule {
        share: Share::High,
        compare: Compare::Equal,
        outcome: Outcome::TieBreak {
            window_sum: TIE_WINDOW,
            then: 0,
            otherwise: 1,
        },
    },
];

/// Sum of the last [`TIE_WINDOW`] bits, if that many exist
fn window_sum(history: &[Bit]) -> Option<usize> {
    if history.len() < TIE_WINDOW {
        return None;
    }
    Some(
        history[history.len() - TIE_WINDOW..]
            .iter()
            .map(|&b| usize::from(b))
            .sum(),
    )
}

/// Decide a bit from its duty split and the decoded history
pub fn decide_bit(duty: DutySplit, history: &[Bit], threshold: f64) -> Bit {
    for rule in &DUTY_TABLE {
        let value = duty.share(rule.share);
        let matched = match rule.compare {
            Compare::Above => value > threshold,
            Compare::Equal => value == threshold,
        };
        if !matched {
            continue;
        }
        return match rule.outcome {
            Outcome::Fixed(bit) => bit,
            Outcome::TieBreak {
                window_sum: expected,
                then,
                otherwise,
            } => {
                if window_sum(history) == Some(expected) {
                    then
                } else {
                    otherwise
                }
            }
        };
    }
    DEFAULT_BIT
}
