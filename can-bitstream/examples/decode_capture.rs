//! Standalone capture decoder tool
//!
//! Replays an adapter capture (binary or bytes-literal text) through the
//! edge decoder and prints the bits and frame fields found.
//!
//! Usage:
//!   decode_capture <capture.bin> [--chunk-size <bytes>] [--carry] [--verbose]
//!
//! Example:
//!   decode_capture capture.txt --chunk-size 120 --verbose

use can_bitstream::types::bits_to_string;
use can_bitstream::{CodecConfig, Decoder, FrameField, DEFAULT_CHUNK_SIZE};
use std::env;
use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <capture> [--chunk-size <bytes>] [--carry] [--verbose]", args[0]);
        eprintln!("\nExample:");
        eprintln!("  {} capture.txt --chunk-size 120 --verbose", args[0]);
        std::process::exit(1);
    }

    let capture = PathBuf::from(&args[1]);
    let mut chunk_size = DEFAULT_CHUNK_SIZE;
    let mut carry = false;
    let mut verbose = false;

    // Parse arguments
    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--chunk-size" => {
                i += 1;
                if i < args.len() {
                    chunk_size = args[i].parse()?;
                }
            }
            "--carry" => {
                carry = true;
            }
            "--verbose" | "-v" => {
                verbose = true;
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
            }
        }
        i += 1;
    }

    println!("=== CAN Capture Decoder ===");
    println!("Capture: {:?}", capture);
    println!("Chunk size: {} bytes", chunk_size);
    println!("Partial record carry: {}", carry);
    println!();

    let config = CodecConfig::new().with_partial_record_carry(carry);
    let mut decoder = Decoder::with_config(config)?;
    let summary = decoder.decode_file(&capture, chunk_size)?;
    let snapshot = decoder.snapshot();

    println!("=== BITS ===");
    println!("Wire:  {}", bits_to_string(&snapshot.raw_bits));
    println!("Clean: {}", bits_to_string(&snapshot.clean_bits));
    println!("Stuff bits at: {:?}", snapshot.stuff_positions);

    println!("\n=== FRAME ===");
    for field_box in &snapshot.field_boxes {
        let value = snapshot
            .frame
            .hex_value(field_box.field)
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:<8} bits {:>3}..{:<3} {}",
            field_box.field.label(),
            field_box.start,
            field_box.start + field_box.width,
            value
        );
    }
    if snapshot.frame.hex_value(FrameField::Crc).is_none() {
        println!("  (CRC not reached yet)");
    }

    if verbose {
        println!("\n=== WAVEFORM ===");
        for (tick, level) in decoder.waveform() {
            println!("  {:>8} {}", tick, level);
        }
    }

    println!("\n=== DECODING SUMMARY ===");
    println!("Records accepted: {}", summary.records);
    println!("Duplicate levels dropped: {}", summary.duplicates);
    println!("Malformed records: {}", summary.malformed);
    println!("Session resets: {}", summary.resets);
    println!("Bits decoded: {}", summary.bits_decoded);
    println!("Bytes skipped: {}", summary.skipped_bytes);

    Ok(())
}
