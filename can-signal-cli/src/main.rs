//! CAN Signal CLI Application
//!
//! Command-line front end for the can-signal-codec library. It loads frame
//! layouts from a TOML file and:
//! - Shows which slot owns each bit of a frame
//! - Encodes physical values into a frame payload
//! - Decodes a frame payload back into physical values

use anyhow::{bail, Context, Result};
use can_signal_codec::{CanFrame, FrameLayout, FRAME_BYTES};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod config;
mod render;

/// CAN Signal CLI - Pack and unpack scaled signals in CAN frames
#[derive(Parser, Debug)]
#[command(name = "can-signal-cli")]
#[command(about = "Pack and unpack scaled signals in CAN frames", long_about = None)]
#[command(version)]
struct Args {
    /// Path to the frame layout file (TOML)
    #[arg(short, long, value_name = "FILE")]
    config: PathBuf,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the bit occupancy of one or all frames
    Layout {
        /// Frame ID (decimal or 0x-prefixed hex); all frames if omitted
        #[arg(long, value_parser = parse_frame_id)]
        frame: Option<u32>,
    },

    /// Encode physical values (in slot order) into a frame
    Encode {
        /// Frame ID (decimal or 0x-prefixed hex)
        #[arg(long, value_parser = parse_frame_id)]
        frame: u32,

        /// Print the frame as JSON
        #[arg(long)]
        json: bool,

        /// One physical value per slot
        #[arg(required = true, allow_negative_numbers = true)]
        values: Vec<f64>,
    },

    /// Decode a frame payload into physical values
    Decode {
        /// Frame ID (decimal or 0x-prefixed hex)
        #[arg(long, value_parser = parse_frame_id)]
        frame: u32,

        /// Print the values as JSON
        #[arg(long)]
        json: bool,

        /// Payload bytes in hex, e.g. "00 1F 40" or "001F40"
        #[arg(required = true)]
        data: Vec<String>,
    },
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    log::info!("CAN Signal CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using codec library v{}", can_signal_codec::VERSION);

    let config = config::load_config(&args.config)?;

    match &args.command {
        Command::Layout { frame } => {
            let layouts: Vec<&FrameLayout> = match frame {
                Some(id) => vec![config.frame(*id)?],
                None => config.frames.iter().collect(),
            };
            for layout in layouts {
                layout_mode(layout)?;
            }
        }
        Command::Encode {
            frame,
            json,
            values,
        } => encode_mode(config.frame(*frame)?, values, *json)?,
        Command::Decode { frame, json, data } => {
            let bytes = parse_hex(&data.join(""))?;
            decode_mode(config.frame(*frame)?, &bytes, *json)?;
        }
    }

    Ok(())
}

/// Print the occupancy matrix and signal table of a frame
fn layout_mode(layout: &FrameLayout) -> Result<()> {
    let adapter = layout.build()?;

    println!(
        "Frame 0x{:X}{} ({}, DLC {})",
        layout.frame_id,
        layout
            .name
            .as_deref()
            .map(|n| format!(" {}", n))
            .unwrap_or_default(),
        adapter.byte_order(),
        adapter.frame_length()
    );
    print!("{}", render::occupancy_matrix(&adapter));
    print!("{}", render::signal_table(layout, &adapter));
    if !adapter.status() {
        println!("  warning: not every slot holds a signal");
    }
    println!();
    Ok(())
}

/// Bulk-write values into an empty frame and print it
fn encode_mode(layout: &FrameLayout, values: &[f64], json: bool) -> Result<()> {
    let adapter = layout.build()?;
    if !adapter.status() {
        bail!(
            "Frame 0x{:X} has unset slots; every slot needs a signal to encode",
            layout.frame_id
        );
    }

    let mut frame = CanFrame::empty(layout.frame_id);
    adapter
        .bulk_write(&mut frame, values)
        .with_context(|| format!("Failed to encode frame 0x{:X}", layout.frame_id))?;
    log::debug!("Encoded {}", frame);

    let encoded = render::EncodedFrame::from(&frame);
    if json {
        println!("{}", serde_json::to_string_pretty(&encoded)?);
    } else {
        println!("0x{:X} [{}] {}", encoded.id, encoded.dlc, encoded.data);
    }
    Ok(())
}

/// Bulk-read a payload and print one value per slot
fn decode_mode(layout: &FrameLayout, bytes: &[u8], json: bool) -> Result<()> {
    let adapter = layout.build()?;
    let frame = CanFrame::new(layout.frame_id, bytes)?;
    if frame.len < adapter.frame_length() {
        log::warn!(
            "Payload has {} bytes but frame 0x{:X} uses {}; missing bytes read as zero",
            frame.len,
            layout.frame_id,
            adapter.frame_length()
        );
    }

    let values = adapter
        .bulk_read(&frame)
        .with_context(|| format!("Failed to decode frame 0x{:X}", layout.frame_id))?;

    let by_slot = layout.signals_by_slot();
    let decoded: Vec<render::DecodedValue> = values
        .iter()
        .zip(by_slot)
        .enumerate()
        .map(|(slot, (&value, signal))| render::DecodedValue {
            slot,
            name: signal.map(|s| s.name.clone()).unwrap_or_default(),
            value,
            unit: signal.and_then(|s| s.unit.clone()),
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&decoded)?);
    } else {
        for entry in &decoded {
            // Drop float noise below a micro-unit
            println!(
                "{} = {}{}",
                entry.name,
                (entry.value * 1e6).round() / 1e6,
                entry
                    .unit
                    .as_deref()
                    .map(|u| format!(" {}", u))
                    .unwrap_or_default()
            );
        }
    }
    Ok(())
}

/// Accept decimal or 0x-prefixed hexadecimal frame IDs
fn parse_frame_id(s: &str) -> std::result::Result<u32, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid frame ID '{}': {}", s, e))
}

/// Parse a hex payload, ignoring whitespace
fn parse_hex(s: &str) -> Result<Vec<u8>> {
    let digits: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    if !digits.is_ascii() {
        bail!("Hex payload contains non-hex characters: {:?}", s);
    }
    if digits.len() % 2 != 0 {
        bail!("Hex payload has an odd number of digits: {:?}", s);
    }
    if digits.len() / 2 > FRAME_BYTES {
        bail!("Hex payload is longer than {} bytes", FRAME_BYTES);
    }

    (0..digits.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .with_context(|| format!("Invalid hex byte {:?}", &digits[i..i + 2]))
        })
        .collect()
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
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
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
