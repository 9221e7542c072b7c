//! SD card driver
//!
//! [`SdCard`] owns the bus transport, the countdown timer and the driver
//! state. It is created uninitialized; [`SdCard::initialize`] runs the
//! negotiation and either leaves the card ready or uninitialized, never in
//! between.

mod config;
mod init;
mod read;
mod status;

pub use config::{CardConfig, DEFAULT_INIT_TIMEOUT_MS, DEFAULT_READ_TIMEOUT_MS};

use crate::bus::BusTransport;
use crate::error::Result;
use crate::timeout::TimeoutGuard;

/// How a card interprets the argument of a read command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Addressing {
    /// Argument is a byte offset (standard capacity cards)
    Byte,
    /// Argument is a block number (high capacity cards)
    Block,
}

impl Addressing {
    /// Command argument addressing `block`
    pub const fn address(&self, block: u32) -> u32 {
        match self {
            Self::Block => block,
            Self::Byte => block.wrapping_mul(crate::consts::BLOCK_SIZE as u32),
        }
    }
}

/// Physical layer version detected during negotiation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CardVersion {
    /// Version 1.x card (no interface-condition command)
    V1,
    /// Version 2.0 or later
    V2,
}

#[derive(Debug, Clone, Copy, Default)]
struct DriverState {
    addressing: Option<Addressing>,
    version: Option<CardVersion>,
    initialized: bool,
}

/// SD card on an SPI bus
pub struct SdCard<T: BusTransport, G: TimeoutGuard> {
    bus: T,
    timer: G,
    config: CardConfig,
    state: DriverState,
}

impl<T: BusTransport, G: TimeoutGuard> SdCard<T, G> {
    /// Create an uninitialized driver
    pub fn new(bus: T, timer: G, config: CardConfig) -> Self {
        Self {
            bus,
            timer,
            config,
            state: DriverState::default(),
        }
    }

    /// Configuration in use
    pub fn config(&self) -> &CardConfig {
        &self.config
    }

    /// Returns true after a successful [`SdCard::initialize`]
    pub fn is_initialized(&self) -> bool {
        self.state.initialized
    }

    /// Addressing mode, once initialized
    pub fn addressing(&self) -> Option<Addressing> {
        self.state.addressing.filter(|_| self.state.initialized)
    }

    /// Card version, once initialized
    pub fn version(&self) -> Option<CardVersion> {
        self.state.version.filter(|_| self.state.initialized)
    }

    /// Release the bus
    ///
    /// Disables the transport. The card keeps its own state, but the driver
    /// must be initialized again before the next read.
    pub fn shutdown(&mut self) -> Result<()> {
        self.state.initialized = false;
        log::debug!("sdspi: shutting down");
        self.bus.disable()
    }

    /// Borrow the transport
    pub fn transport(&self) -> &T {
        &self.bus
    }

    /// Mutably borrow the transport
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.bus
    }

    /// Borrow the timer
    pub fn timer(&self) -> &G {
        &self.timer
    }

    /// Take back the transport and the timer
    pub fn into_parts(self) -> (T, G) {
        (self.bus, self.timer)
    }
}
