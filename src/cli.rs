//! CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Parse a string as a hex or decimal u32
fn parse_hex_u32(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

const PORT_HELP: &str = "Link to the device: dev=<path>[:<baud>] or ip=<host>:<port>";

#[derive(Parser)]
#[command(name = "uartboot")]
#[command(author, version, about = "UART SPI-flash bootloader tool", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Default env_logger filter for the requested verbosity
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show flash chip identity and geometry
    Info {
        #[arg(short, long, help = PORT_HELP)]
        port: String,
    },

    /// Write a file to flash
    Write {
        #[arg(short, long, help = PORT_HELP)]
        port: String,

        /// Input file path
        #[arg(short, long)]
        input: PathBuf,

        /// Flash address to start at (hex or decimal)
        #[arg(short, long, default_value = "0", value_parser = parse_hex_u32)]
        address: u32,

        /// Read back and compare after writing
        #[arg(long)]
        verify: bool,

        /// Don't erase the covered sectors before writing
        #[arg(long)]
        no_erase: bool,
    },

    /// Read flash contents to a file
    Read {
        #[arg(short, long, help = PORT_HELP)]
        port: String,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Flash address to start at (hex or decimal)
        #[arg(short, long, default_value = "0", value_parser = parse_hex_u32)]
        address: u32,

        /// Number of bytes (default: up to the end of the chip)
        #[arg(short, long, value_parser = parse_hex_u32)]
        length: Option<u32>,
    },

    /// Compare flash contents against a file
    Verify {
        #[arg(short, long, help = PORT_HELP)]
        port: String,

        /// Input file path to verify against
        #[arg(short, long)]
        input: PathBuf,

        /// Flash address the file was written to (hex or decimal)
        #[arg(short, long, default_value = "0", value_parser = parse_hex_u32)]
        address: u32,
    },

    /// Erase sectors or the whole chip
    Erase {
        #[arg(short, long, help = PORT_HELP)]
        port: String,

        /// Start address for partial erase (hex, e.g., 0x10000)
        #[arg(short, long, value_parser = parse_hex_u32)]
        address: Option<u32>,

        /// Length of region to erase (hex or decimal)
        #[arg(short, long, value_parser = parse_hex_u32)]
        length: Option<u32>,

        /// Erase the whole chip
        #[arg(long, conflicts_with_all = ["address", "length"])]
        all: bool,

        /// Seconds to wait for a chip erase to finish
        #[arg(long, default_value = "250")]
        erase_timeout: u64,
    },

    /// Emulate a device: run the bootloader against an in-memory chip
    Serve {
        /// Where to serve: dev=<path>[:<baud>] or listen=<addr>:<port>
        #[arg(short, long)]
        port: String,

        /// Chip to emulate [available: w25q64, w25q128]
        #[arg(short, long, default_value = "w25q128")]
        chip: String,

        /// Initial flash contents
        #[arg(long)]
        image: Option<PathBuf>,

        /// Dump flash contents here after every session
        #[arg(long)]
        save: Option<PathBuf>,

        /// Status reads reporting busy after each program/erase
        #[arg(long, default_value = "0")]
        busy_polls: u32,

        /// Use datasheet worst-case busy deadlines instead of a flat 5 s
        #[arg(long)]
        datasheet_timeouts: bool,

        /// Busy deadline for chip erase in milliseconds
        #[arg(long)]
        chip_erase_timeout: Option<u32>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_u32() {
        assert_eq!(parse_hex_u32("0x1000"), Ok(0x1000));
        assert_eq!(parse_hex_u32("0XFF"), Ok(0xFF));
        assert_eq!(parse_hex_u32("4096"), Ok(4096));
        assert!(parse_hex_u32("0xZZ").is_err());
        assert!(parse_hex_u32("-1").is_err());
    }

    #[test]
    fn test_cli_shape() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_erase_all_conflicts_with_range() {
        let parsed = Cli::try_parse_from([
            "uartboot", "erase", "-p", "ip=localhost:1", "--all", "-a", "0x1000",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_verbosity_selects_log_filter() {
        let quiet = Cli::try_parse_from(["uartboot", "info", "-p", "dev=/dev/ttyUSB0"]).unwrap();
        assert_eq!(quiet.log_filter(), "info");

        let debug = Cli::try_parse_from(["uartboot", "-v", "info", "-p", "dev=/dev/ttyUSB0"]).unwrap();
        assert_eq!(debug.log_filter(), "debug");

        let trace = Cli::try_parse_from(["uartboot", "info", "-vv", "-p", "dev=/dev/ttyUSB0"]).unwrap();
        assert_eq!(trace.log_filter(), "trace");
    }
}
