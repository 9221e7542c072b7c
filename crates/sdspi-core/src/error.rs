//! Error types for sdspi-core
//!
//! This module provides a no_std compatible error type that can be used
//! throughout the crate. The benign card states (`Ok` and `Idle`) are not
//! errors; they are reported by [`crate::cmd::Status`].

use core::fmt;

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Error {
    // Status byte errors, in decoding priority order (lowest first)
    /// Card is still idle where a ready card was required
    Idle,
    /// Erase sequence was cleared before executing
    EraseReset,
    /// Card did not recognise the command
    IllegalCommand,
    /// Command check value was rejected
    CommandCrc,
    /// Error in the sequence of erase commands
    EraseSequence,
    /// Misaligned address that did not match the block length
    AddressError,
    /// Command argument was outside the allowed range
    Parameter,

    // Driver errors
    /// Unclassified failure or low-level protocol mismatch
    Generic,
    /// A bounded wait ran out before the card answered
    Timeout,
    /// Card rejected the host voltage range
    InvalidVoltageRange,
    /// Card never produced a status byte
    NoResponse,
    /// Operation requires a successful `initialize` first
    NotInitialized,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "card is idle"),
            Self::EraseReset => write!(f, "erase reset"),
            Self::IllegalCommand => write!(f, "illegal command"),
            Self::CommandCrc => write!(f, "command CRC invalid"),
            Self::EraseSequence => write!(f, "erase sequence error"),
            Self::AddressError => write!(f, "address error"),
            Self::Parameter => write!(f, "parameter error"),
            Self::Generic => write!(f, "generic error"),
            Self::Timeout => write!(f, "access timed out"),
            Self::InvalidVoltageRange => write!(f, "invalid voltage range"),
            Self::NoResponse => write!(f, "no response"),
            Self::NotInitialized => write!(f, "card not initialized"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
