//! sdspi - SD/SDHC card access over SPI
//!
//! Drives an SD card in SPI mode through any transport compiled into the
//! binary: the simulated `dummy` card or a Linux spidev device.
//!
//! # Architecture
//!
//! The CLI only talks to `sdspi_card::CardHandle`. The handle owns the
//! generic `sdspi_core` driver over a boxed transport and countdown, so the
//! same command implementations work regardless of the underlying bus.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use sdspi_card::{open_card, open_transport, CardHandle};
use sdspi_core::card::CardConfig;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logger; -v overrides RUST_LOG
    let mut logger =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.verbose > 0 {
        logger.filter_level(verbosity_level(cli.verbose));
    }
    logger.init();

    let config = CardConfig::default()
        .with_init_timeout_ms(cli.init_timeout)
        .with_read_timeout_ms(cli.read_timeout);

    match cli.command {
        Commands::Info { transport } => {
            let mut handle = open_card(&transport, config)?;
            run_and_shutdown(&mut handle, commands::cmd_info)
        }
        Commands::Read {
            transport,
            output,
            start,
            count,
        } => {
            let mut handle = open_card(&transport, config)?;
            run_and_shutdown(&mut handle, |h| {
                commands::cmd_read(h, &output, start, count)
            })
        }
        Commands::Dump { transport, sector } => {
            let mut handle = open_card(&transport, config)?;
            run_and_shutdown(&mut handle, |h| commands::cmd_dump(h, sector))
        }
        Commands::Status { transport, no_init } => {
            let mut handle = if no_init {
                open_transport(&transport, config)?
            } else {
                open_card(&transport, config)?
            };
            run_and_shutdown(&mut handle, commands::cmd_status)
        }
        Commands::ListTransports => {
            commands::list_transports();
            Ok(())
        }
    }
}

/// Map the `-v` count to a log level
fn verbosity_level(verbose: u8) -> log::LevelFilter {
    match verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}

/// Run a command, then disable the transport whatever the outcome
fn run_and_shutdown<F>(handle: &mut CardHandle, command: F) -> Result<(), Box<dyn std::error::Error>>
where
    F: FnOnce(&mut CardHandle) -> Result<(), Box<dyn std::error::Error>>,
{
    let result = command(handle);
    if let Err(e) = handle.shutdown() {
        log::warn!("{}", e);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_level() {
        assert_eq!(verbosity_level(0), log::LevelFilter::Info);
        assert_eq!(verbosity_level(1), log::LevelFilter::Debug);
        assert_eq!(verbosity_level(2), log::LevelFilter::Trace);
        assert_eq!(verbosity_level(5), log::LevelFilter::Trace);
    }
}
