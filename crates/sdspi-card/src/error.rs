//! Error types for card access

use thiserror::Error;

/// Errors raised while opening or driving a card
#[derive(Debug, Error)]
pub enum CardError {
    #[error("Invalid parameter format: '{0}' (expected key=value)")]
    InvalidParameter(String),

    #[error("Invalid {transport} parameters: {message}")]
    InvalidOptions {
        transport: &'static str,
        message: String,
    },

    #[error("Unknown transport: {0}")]
    UnknownTransport(String),

    #[error("{0}")]
    OpenFailed(String),

    #[error("Card initialization failed: {0}")]
    Init(#[source] sdspi_core::Error),

    #[error("Failed to read block {block}: {source}")]
    Read {
        block: u32,
        #[source]
        source: sdspi_core::Error,
    },

    #[error("Buffer length {0} is not a multiple of the block size")]
    BufferSize(usize),

    #[error("Block range starting at {start} exceeds the 32-bit block space")]
    BlockRange { start: u32 },

    #[error("Failed to shut down transport: {0}")]
    Shutdown(#[source] sdspi_core::Error),
}
