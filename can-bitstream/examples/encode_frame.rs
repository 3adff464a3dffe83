//! Encode a CAN base frame and show its stuffed bitstream
//!
//! Usage:
//!   encode_frame <IIIDD...>
//!
//! Example:
//!   encode_frame 7FF00

use can_bitstream::types::bits_to_string;
use can_bitstream::{FrameEncoder, BUS_IDLE_BITS};
use std::env;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <hex frame: 3 ID digits then data bytes>", args[0]);
        eprintln!("\nExample:");
        eprintln!("  {} 7FF00", args[0]);
        std::process::exit(1);
    }

    let frame = FrameEncoder::build(&args[1])?;

    println!("=== CAN Frame Encoder ===");
    println!("ID: 0x{:03X}  DLC: {}", frame.spec.id, frame.spec.dlc());
    println!();

    for group in &frame.fields {
        println!("  {:<8} {}", group.field.label(), bits_to_string(&group.bits));
    }

    let flags = frame.stuff_flags();
    let marked: String = frame
        .stuffed
        .bits
        .iter()
        .zip(&flags)
        .map(|(&bit, &stuffed)| match (bit, stuffed) {
            (0, true) => 'o',
            (_, true) => 'i',
            (0, false) => '0',
            _ => '1',
        })
        .collect();

    println!("\nIdle + wire ({} stuff bits, shown as o/i):", frame.stuffed.positions.len());
    println!("  {}{}", "1".repeat(BUS_IDLE_BITS), marked);

    println!("\nStuffed field spans:");
    for span in frame.stuffed_spans() {
        println!("  {:<8} {:>3}..{:<3}", span.field.label(), span.start, span.end());
    }

    Ok(())
}
