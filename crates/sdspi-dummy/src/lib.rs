//! sdspi-dummy - Simulated SD card for testing
//!
//! This crate provides a [`DummyCard`] that emulates an SD card in SPI mode
//! behind the [`sdspi_core::bus::BusTransport`] trait, and a [`SimTimer`]
//! that implements the countdown deterministically. Together they let the
//! whole driver run without hardware.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "alloc")]
mod card;
mod timer;


#[cfg(feature = "alloc")]
pub use card::{CardKind, DummyCard, DummyConfig, LoggedCommand};
pub use timer::{SimTimer, DEFAULT_POLLS_PER_MS};

/// Largest capacity accepted by [`parse_options`] (128 MiB in memory)
pub const MAX_BLOCKS: u32 = 1 << 18;

#[cfg(feature = "alloc")]
use alloc::{format, string::String, string::ToString};

/// Parse transport options from a list of key-value pairs
///
/// Recognised keys are `kind` (`v1`, `sdsc`, `sdhc`, `none`), `blocks`
/// (capacity in 512-byte blocks, at most [`MAX_BLOCKS`]) and `idle`
/// (ACMD41 polls before ready).
#[cfg(feature = "alloc")]
pub fn parse_options(options: &[(&str, &str)]) -> core::result::Result<DummyConfig, String> {
    let mut config = DummyConfig::default();

    for (key, value) in options {
        match *key {
            "kind" => {
                config.kind = CardKind::from_name(value)
                    .ok_or_else(|| format!("Invalid card kind: {} (v1, sdsc, sdhc, none)", value))?;
            }
            "blocks" => {
                let blocks: u32 = value
                    .parse()
                    .map_err(|_| format!("Invalid blocks value: {}", value))?;
                if blocks == 0 {
                    return Err("blocks must be at least 1".to_string());
                }
                if blocks > MAX_BLOCKS {
                    return Err(format!("blocks must be at most {}", MAX_BLOCKS));
                }
                config.blocks = blocks;
            }
            "idle" => {
                config.idle_polls = value
                    .parse()
                    .map_err(|_| format!("Invalid idle value: {}", value))?;
            }
            _ => {
                log::warn!("dummy: Unknown option: {}={}", key, value);
            }
        }
    }

    Ok(config)
}
