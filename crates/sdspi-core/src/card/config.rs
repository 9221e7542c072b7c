//! Driver configuration

use crate::bus::ClockDivider;

/// Default deadline of the negotiation loop
pub const DEFAULT_INIT_TIMEOUT_MS: u32 = 1000;

/// Default deadline of the wait for a data start token
pub const DEFAULT_READ_TIMEOUT_MS: u32 = 1000;

/// Bus clocks and deadlines used by [`super::SdCard`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardConfig {
    /// Divider used from power-on until negotiation is done
    pub init_divider: ClockDivider,
    /// Divider used once the card is ready
    pub operating_divider: ClockDivider,
    /// Deadline of the negotiation loop in milliseconds
    pub init_timeout_ms: u32,
    /// Deadline of the start-token wait in milliseconds
    pub read_timeout_ms: u32,
}

impl Default for CardConfig {
    fn default() -> Self {
        Self {
            init_divider: ClockDivider::Div64,
            operating_divider: ClockDivider::Div2,
            init_timeout_ms: DEFAULT_INIT_TIMEOUT_MS,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
        }
    }
}

impl CardConfig {
    /// Create the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the negotiation clock divider
    pub fn with_init_divider(mut self, divider: ClockDivider) -> Self {
        self.init_divider = divider;
        self
    }

    /// Set the operating clock divider
    pub fn with_operating_divider(mut self, divider: ClockDivider) -> Self {
        self.operating_divider = divider;
        self
    }

    /// Set the negotiation deadline
    pub fn with_init_timeout_ms(mut self, ms: u32) -> Self {
        self.init_timeout_ms = ms;
        self
    }

    /// Set the start-token deadline
    pub fn with_read_timeout_ms(mut self, ms: u32) -> Self {
        self.read_timeout_ms = ms;
        self
    }
}
