//! CAN Bitstream CLI Application
//!
//! Command-line front end for the can-bitstream codec:
//! - Decode adapter captures into wire bits, clean bits and frame fields
//! - Encode a hex frame description into its stuffed bitstream
//! - Write TXT or JSON reports

use anyhow::{Context, Result};
use can_bitstream::{Decoder, FrameEncoder};
use clap::Parser;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

mod config;
mod report;

use config::{AppConfig, OutputFormat};
use report::{CaptureReport, EncodeReport, Report};

/// CAN Bitstream - Decode and encode CAN 2.0A frames at bit level
#[derive(Parser, Debug)]
#[command(name = "can-bitstream-cli")]
#[command(about = "Decode edge captures and encode CAN base frames at bit level", long_about = None)]
#[command(version)]
struct Args {
    /// Capture file(s) to decode (can be repeated)
    #[arg(short = 'i', long, value_name = "FILE")]
    capture: Vec<PathBuf>,

    /// Hex frame to encode: 3 ID digits followed by data bytes (e.g. 7FF00)
    #[arg(short, long, value_name = "HEX")]
    encode: Option<String>,

    /// Path to configuration file (config.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Report format
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Bytes handed to the decoder per playback step
    #[arg(long, value_name = "BYTES")]
    chunk_size: Option<usize>,

    /// Output file for the report (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Verbosity level (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    log::info!("CAN Bitstream CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using codec library v{}", can_bitstream::VERSION);

    let config = resolve_config(&args)?;

    if config.input.captures.is_empty() && args.encode.is_none() {
        println!("CAN Bitstream - No input specified");
        println!("\nQuick Start:");
        println!("  can-bitstream-cli --capture capture.bin");
        println!("  can-bitstream-cli --encode 7FF00");
        println!("\nWith a configuration file:");
        println!("  can-bitstream-cli --config config.toml");
        println!("\nUse --help for more options");
        return Ok(());
    }

    let mut report = Report::new();

    if let Some(hex) = &args.encode {
        let frame = FrameEncoder::build(hex)
            .with_context(|| format!("Failed to encode frame {:?}", hex))?;
        log::info!(
            "Encoded {:?}: {} wire bits, {} stuff bits",
            hex,
            frame.stuffed.bits.len(),
            frame.stuffed.positions.len()
        );
        report.encoded = Some(EncodeReport::new(hex, &frame));
    }

    report.captures = config
        .input
        .captures
        .par_iter()
        .map(|path| decode_capture(path, &config))
        .collect::<Result<Vec<_>>>()?;

    let rendered = match config.output.format {
        OutputFormat::Txt => report::render_txt(&report)?,
        OutputFormat::Json => report::render_json(&report)?,
    };

    match &config.output.path {
        Some(path) => {
            fs::write(path, rendered)
                .with_context(|| format!("Failed to write report: {:?}", path))?;
            log::info!("Report written to {:?}", path);
        }
        None => print!("{}", rendered),
    }

    Ok(())
}

/// Merge the config file with command-line overrides
fn resolve_config(args: &Args) -> Result<AppConfig> {
    let mut config = match &args.config {
        Some(path) => config::load_config(path)?,
        None => AppConfig::default(),
    };

    // Command-line captures come first
    let mut captures = args.capture.clone();
    captures.append(&mut config.input.captures);
    config.input.captures = captures;
    if let Some(chunk_size) = args.chunk_size {
        config.input.chunk_size = chunk_size;
    }
    if let Some(format) = args.format {
        config.output.format = format;
    }
    if let Some(output) = &args.output {
        config.output.path = Some(output.clone());
    }

    config.validate()?;
    Ok(config)
}

/// Decode one capture in its own session
fn decode_capture(path: &Path, config: &AppConfig) -> Result<CaptureReport> {
    let mut decoder = Decoder::with_config(config.decoder.clone())?;
    let totals = decoder
        .decode_file(path, config.input.chunk_size)
        .with_context(|| format!("Failed to decode capture: {:?}", path))?;

    if totals.malformed > 0 || totals.resets > 0 {
        log::warn!(
            "{:?}: {} malformed records, {} session resets",
            path,
            totals.malformed,
            totals.resets
        );
    }

    Ok(CaptureReport::new(
        path.display().to_string(),
        totals,
        &decoder.snapshot(),
    ))
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use can_bitstream::record::encode_records;
    use can_bitstream::Edge;
    use std::io::Write;

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "can-bitstream-cli",
            "--capture",
            "a.bin",
            "-i",
            "b.txt",
            "--encode",
            "7FF00",
            "--format",
            "json",
            "-vv",
        ])
        .unwrap();
        assert_eq!(args.capture.len(), 2);
        assert_eq!(args.encode.as_deref(), Some("7FF00"));
        assert_eq!(args.format, Some(OutputFormat::Json));
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_command_line_overrides_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[input]\ncaptures = [\"bench.bin\"]\nchunk_size = 64").unwrap();
        let path = file.path().to_string_lossy().to_string();

        let args = Args::try_parse_from([
            "can-bitstream-cli",
            "--config",
            path.as_str(),
            "--capture",
            "live.bin",
            "--chunk-size",
            "16",
        ])
        .unwrap();
        let config = resolve_config(&args).unwrap();

        assert_eq!(
            config.input.captures,
            vec![PathBuf::from("live.bin"), PathBuf::from("bench.bin")]
        );
        assert_eq!(config.input.chunk_size, 16);
        assert_eq!(config.output.format, OutputFormat::Txt);
    }

    #[test]
    fn test_decode_capture() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&encode_records(&[
            Edge::new(0, 0),
            Edge::new(1, 20),
            Edge::new(0, 120),
            Edge::new(1, 140),
            Edge::new(0, 160),
        ]))
        .unwrap();

        let report = decode_capture(file.path(), &AppConfig::default()).unwrap();
        assert_eq!(report.totals.records, 5);
        assert_eq!(report.stuff_positions, vec![6]);
    }
}
