//! CLI argument parsing

use clap::{Parser, Subcommand};
use sdspi_core::card::{DEFAULT_INIT_TIMEOUT_MS, DEFAULT_READ_TIMEOUT_MS};
use std::path::PathBuf;

/// Parse a string as a hex or decimal u32
fn parse_hex_u32(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

/// Generate dynamic help text for the transport argument
fn transport_help() -> String {
    format!(
        "Transport to use, with options as name:key=value,... [available: {}]",
        sdspi_card::transport_names_short()
    )
}

#[derive(Parser)]
#[command(name = "sdspi")]
#[command(author, version, about = "SD/SDHC card access over SPI", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Deadline of the power-up negotiation in milliseconds
    #[arg(long, global = true, default_value_t = DEFAULT_INIT_TIMEOUT_MS)]
    pub init_timeout: u32,

    /// Deadline of the start-token wait of each block read in milliseconds
    #[arg(long, global = true, default_value_t = DEFAULT_READ_TIMEOUT_MS)]
    pub read_timeout: u32,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the card and show its parameters
    Info {
        /// Transport to use
        #[arg(short, long, help = transport_help())]
        transport: String,
    },

    /// Read sectors to a file
    Read {
        /// Transport to use
        #[arg(short, long, help = transport_help())]
        transport: String,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// First sector to read (hex with 0x prefix, or decimal)
        #[arg(short, long, default_value = "0", value_parser = parse_hex_u32)]
        start: u32,

        /// Number of sectors to read
        #[arg(short, long, default_value_t = 1)]
        count: u32,
    },

    /// Hex dump a single sector
    Dump {
        /// Transport to use
        #[arg(short, long, help = transport_help())]
        transport: String,

        /// Sector to dump (hex with 0x prefix, or decimal)
        #[arg(short, long, default_value = "0", value_parser = parse_hex_u32)]
        sector: u32,
    },

    /// Query whether the card has finished powering up
    Status {
        /// Transport to use
        #[arg(short, long, help = transport_help())]
        transport: String,

        /// Query without running the power-up negotiation first
        #[arg(long)]
        no_init: bool,
    },

    /// List available transports
    ListTransports,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_parse_hex_u32() {
        assert_eq!(parse_hex_u32("0x10"), Ok(16));
        assert_eq!(parse_hex_u32("0XfF"), Ok(255));
        assert_eq!(parse_hex_u32("2048"), Ok(2048));
        assert!(parse_hex_u32("0xZZ").is_err());
        assert!(parse_hex_u32("-1").is_err());
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_read_arguments() {
        let cli = Cli::try_parse_from([
            "sdspi", "read", "-t", "dummy", "-o", "card.img", "-s", "0x20", "-c", "4",
        ])
        .unwrap();
        match cli.command {
            Commands::Read {
                transport,
                output,
                start,
                count,
            } => {
                assert_eq!(transport, "dummy");
                assert_eq!(output, PathBuf::from("card.img"));
                assert_eq!(start, 0x20);
                assert_eq!(count, 4);
            }
            _ => panic!("expected read command"),
        }
        assert_eq!(cli.init_timeout, DEFAULT_INIT_TIMEOUT_MS);
    }

    #[test]
    fn test_global_timeouts() {
        let cli = Cli::try_parse_from([
            "sdspi",
            "status",
            "-t",
            "dummy",
            "--no-init",
            "--read-timeout",
            "50",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.read_timeout, 50);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Commands::Status { no_init: true, .. }));
    }
}
