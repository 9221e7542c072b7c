//! sdspi-core - SD/SDHC card driver over an SPI bus
//!
//! This crate implements the SPI-mode protocol of SD memory cards: command
//! framing, response decoding, the initialization negotiation and
//! single-sector block reads. It is `no_std` compatible; the bus and the
//! countdown timer are supplied by the platform through the
//! [`bus::BusTransport`] and [`timeout::TimeoutGuard`] traits.
//!
//! # Features
//!
//! - `std` - Enable standard library support (includes `alloc`)
//! - `alloc` - Enable boxed trait objects for transports and timers
//!
//! # Example
//!
//! ```ignore
//! use sdspi_core::card::{CardConfig, SdCard};
//! use sdspi_core::consts::BLOCK_SIZE;
//!
//! let mut card = SdCard::new(transport, timer, CardConfig::default());
//! card.initialize()?;
//!
//! let mut sector = [0u8; BLOCK_SIZE];
//! card.read_block(0, &mut sector)?;
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(any(feature = "std", test))]
extern crate std;

pub mod bus;
pub mod card;
pub mod cmd;
pub mod consts;
pub mod disk;
pub mod error;
pub mod timeout;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{Error, Result};
