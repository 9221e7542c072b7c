//! sdspi-linux-spi - Linux spidev transport
//!
//! This crate drives an SD card wired to a Linux SPI controller through the
//! `/dev/spidevX.Y` device interface, and provides a thread-backed countdown
//! for the driver's bounded waits.
//!
//! # Example
//!
//! ```no_run
//! use sdspi_core::card::{CardConfig, SdCard};
//! use sdspi_linux_spi::{LinuxSpi, LinuxSpiConfig, ThreadTimer};
//!
//! let config = LinuxSpiConfig::new("/dev/spidev0.0").with_base_clock(16_000_000);
//! let spi = LinuxSpi::open(&config)?;
//! let timer = ThreadTimer::start()?;
//!
//! let mut card = SdCard::new(spi, timer, CardConfig::default());
//! card.initialize()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Usage with the sdspi CLI
//!
//! ```bash
//! # Initialize the card and print its parameters
//! sdspi info -t linux_spi:dev=/dev/spidev0.0
//!
//! # Base clock in kHz the dividers apply to
//! sdspi read -t linux_spi:dev=/dev/spidev0.0,spispeed=8000 -o card.img -c 2048
//! ```
//!
//! # System Requirements
//!
//! - Linux kernel with spidev support enabled (`CONFIG_SPI_SPIDEV`)
//! - Read/write access to `/dev/spidevX.Y` device
//! - A controller supporting `SPI_NO_CS` for correct power-on clocking

pub mod device;
pub mod error;
pub mod timer;

// Re-exports
pub use device::{mode, parse_options, LinuxSpi, LinuxSpiConfig, DEFAULT_BASE_CLOCK_HZ};
pub use error::{LinuxSpiError, Result};
pub use timer::ThreadTimer;
