//! Codec configuration types
//!
//! The defaults reproduce the calibration of the capture hardware the decoder
//! was tuned against. Changing them is possible for other adapters but the
//! default decode behaviour must stay exactly as calibrated.

use crate::types::{CodecError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for the edge decoder and stuffing rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodecConfig {
    /// Nominal bit duration in capture ticks
    #[serde(default = "default_nominal_bit_ticks")]
    pub nominal_bit_ticks: f64,

    /// Bit duration used once the drift threshold is passed
    #[serde(default = "default_drift_bit_ticks")]
    pub drift_bit_ticks: f64,

    /// Bit index after which the drift duration applies
    #[serde(default = "default_drift_after_bits")]
    pub drift_after_bits: usize,

    /// Duty-cycle share (in ticks) that decides a partially sampled bit
    #[serde(default = "default_duty_threshold")]
    pub duty_threshold: f64,

    /// Identical bits after which a stuff bit is inserted
    #[serde(default = "default_stuff_run")]
    pub stuff_run: usize,

    /// Hold a trailing record split across two `feed` calls
    #[serde(default)]
    pub carry_partial_records: bool,
}

fn default_nominal_bit_ticks() -> f64 {
    20.0
}

fn default_drift_bit_ticks() -> f64 {
    20.1
}

fn default_drift_after_bits() -> usize {
    40
}

fn default_duty_threshold() -> f64 {
    10.0
}

fn default_stuff_run() -> usize {
    5
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            nominal_bit_ticks: default_nominal_bit_ticks(),
            drift_bit_ticks: default_drift_bit_ticks(),
            drift_after_bits: default_drift_after_bits(),
            duty_threshold: default_duty_threshold(),
            stuff_run: default_stuff_run(),
            carry_partial_records: false,
        }
    }
}

impl CodecConfig {
    /// Create a new configuration with the calibrated defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set nominal and drift bit durations
    pub fn with_bit_ticks(mut self, nominal: f64, drift: f64) -> Self {
        self.nominal_bit_ticks = nominal;
        self.drift_bit_ticks = drift;
        self
    }

    /// Builder method: set the bit index after which drift compensation starts
    pub fn with_drift_after_bits(mut self, bits: usize) -> Self {
        self.drift_after_bits = bits;
        self
    }

    /// Builder method: set the duty-cycle decision threshold
    pub fn with_duty_threshold(mut self, threshold: f64) -> Self {
        self.duty_threshold = threshold;
        self
    }

    /// Builder method: keep partial trailing records between feeds
    pub fn with_partial_record_carry(mut self, enabled: bool) -> Self {
        self.carry_partial_records = enabled;
        self
    }

    /// Check the values are usable
    pub fn validate(&self) -> Result<()> {
        if !(self.nominal_bit_ticks > 0.0) || !(self.drift_bit_ticks > 0.0) {
            return Err(CodecError::InvalidConfig(format!(
                "bit durations must be positive (nominal {}, drift {})",
                self.nominal_bit_ticks, self.drift_bit_ticks
            )));
        }
        if self.stuff_run == 0 {
            return Err(CodecError::InvalidConfig(
                "stuff run length must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_calibration() {
        let config = CodecConfig::new();
        assert_eq!(config.nominal_bit_ticks, 20.0);
        assert_eq!(config.drift_bit_ticks, 20.1);
        assert_eq!(config.drift_after_bits, 40);
        assert_eq!(config.duty_threshold, 10.0);
        assert_eq!(config.stuff_run, 5);
        assert!(!config.carry_partial_records);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = CodecConfig::new()
            .with_bit_ticks(10.0, 10.05)
            .with_drift_after_bits(80)
            .with_duty_threshold(5.0)
            .with_partial_record_carry(true);

        assert_eq!(config.nominal_bit_ticks, 10.0);
        assert_eq!(config.drift_bit_ticks, 10.05);
        assert_eq!(config.drift_after_bits, 80);
        assert_eq!(config.duty_threshold, 5.0);
        assert!(config.carry_partial_records);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(CodecConfig::new().with_bit_ticks(0.0, 20.1).validate().is_err());
        assert!(CodecConfig::new().with_bit_ticks(20.0, f64::NAN).validate().is_err());

        let mut config = CodecConfig::new();
        config.stuff_run = 0;
        assert!(config.validate().is_err());
    }
}
