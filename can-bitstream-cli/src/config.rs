//! Configuration file parsing (config.toml)

use anyhow::{Context, Result};
use can_bitstream::{CodecConfig, CodecError, DEFAULT_CHUNK_SIZE};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main application configuration (loaded from config.toml)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub decoder: CodecConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InputConfig {
    /// Capture files decoded in addition to those given on the command line
    #[serde(default)]
    pub captures: Vec<PathBuf>,
    /// Bytes handed to the decoder per playback step
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            captures: Vec::new(),
            chunk_size: default_chunk_size(),
        }
    }
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
    /// Write the report here instead of stdout
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Txt,
    Json,
}

/// Problems found in an otherwise well-formed configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("input.chunk_size must be at least 1")]
    ZeroChunkSize,

    #[error(transparent)]
    Decoder(#[from] CodecError),
}

impl AppConfig {
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.input.chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        self.decoder.validate()?;
        Ok(())
    }
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    config
        .validate()
        .with_context(|| format!("Invalid config file: {:?}", path))?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_config_deserialization() {
        let toml_content = r#"
            [decoder]
            drift_after_bits = 60
            carry_partial_records = true

            [input]
            captures = ["bench.txt"]

            [output]
            format = "json"
        "#;

        let config: AppConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.decoder.drift_after_bits, 60);
        assert!(config.decoder.carry_partial_records);
        assert_eq!(config.decoder.nominal_bit_ticks, 20.0);
        assert_eq!(config.input.captures.len(), 1);
        assert_eq!(config.input.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(config.output.format, OutputFormat::Json);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.input.chunk_size, 120);
        assert_eq!(config.output.format, OutputFormat::Txt);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[input]\nchunk_size = 0").unwrap();
        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::ZeroChunkSize)
        ));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[decoder]\nstuff_run = 0").unwrap();
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn test_load_missing_file() {
        assert!(load_config(Path::new("does-not-exist.toml")).is_err());
    }
}
