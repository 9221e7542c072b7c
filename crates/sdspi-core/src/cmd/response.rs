//! Response decoding

use bitflags::bitflags;

use crate::error::{Error, Result};

bitflags! {
    /// R1 status byte
    ///
    /// All-zero means the card is ready and the command succeeded.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct R1: u8 {
        /// Card is in the idle state running initialization
        const IDLE = 0x01;
        /// Erase sequence was cleared before executing
        const ERASE_RESET = 0x02;
        /// Illegal command code
        const ILLEGAL_COMMAND = 0x04;
        /// Check value of the last command failed
        const COMMAND_CRC = 0x08;
        /// Error in the sequence of erase commands
        const ERASE_SEQUENCE = 0x10;
        /// Misaligned address
        const ADDRESS_ERROR = 0x20;
        /// Argument outside the allowed range
        const PARAMETER = 0x40;
        /// Always 0 in a real status byte
        const START = 0x80;
    }
}

bitflags! {
    /// Operating conditions register (CMD58 payload)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Ocr: u32 {
        /// 2.7-3.6V supported
        const VDD_27_36 = 0x00FF_8000;
        /// Card capacity status: block addressing
        const CCS = 1 << 30;
        /// Power-up routine finished (card not busy)
        const POWER_UP = 1 << 31;
    }
}

/// Benign outcome of a command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// Card is ready and accepted the command
    Ok,
    /// Card accepted the command but is still initializing
    Idle,
}

impl Status {
    /// Returns true if the card reported idle
    pub const fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Require a ready card; an idle card is an error
    pub fn expect_ok(self) -> Result<()> {
        match self {
            Self::Ok => Ok(()),
            Self::Idle => Err(Error::Idle),
        }
    }

    /// Require an idle card; a ready card is an unexpected state
    pub fn expect_idle(self) -> Result<()> {
        match self {
            Self::Idle => Ok(()),
            Self::Ok => Err(Error::Generic),
        }
    }
}

/// Decode a status byte
///
/// The highest set bit wins, so `0b1100_0000` decodes to `NoResponse`
/// rather than `Parameter`.
pub fn decode_status(byte: u8) -> Result<Status> {
    let r1 = R1::from_bits_retain(byte);
    if r1.contains(R1::START) {
        Err(Error::NoResponse)
    } else if r1.contains(R1::PARAMETER) {
        Err(Error::Parameter)
    } else if r1.contains(R1::ADDRESS_ERROR) {
        Err(Error::AddressError)
    } else if r1.contains(R1::ERASE_SEQUENCE) {
        Err(Error::EraseSequence)
    } else if r1.contains(R1::COMMAND_CRC) {
        Err(Error::CommandCrc)
    } else if r1.contains(R1::ILLEGAL_COMMAND) {
        Err(Error::IllegalCommand)
    } else if r1.contains(R1::ERASE_RESET) {
        Err(Error::EraseReset)
    } else if r1.contains(R1::IDLE) {
        Ok(Status::Idle)
    } else {
        Ok(Status::Ok)
    }
}

/// Decoded response to one command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Response {
    /// Benign status
    pub status: Status,
    /// Extended payload, 0 when the command returns none
    pub payload: u32,
}

impl Response {
    /// Operating conditions register view of the payload
    pub fn ocr(&self) -> Ocr {
        Ocr::from_bits_retain(self.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_benign_statuses() {
        assert_eq!(decode_status(0x00), Ok(Status::Ok));
        assert_eq!(decode_status(0x01), Ok(Status::Idle));
    }

    #[test]
    fn test_highest_bit_wins() {
        assert_eq!(decode_status(0b1100_0000), Err(Error::NoResponse));
        assert_eq!(decode_status(0b0110_0000), Err(Error::Parameter));
        assert_eq!(decode_status(0b0011_0000), Err(Error::AddressError));
        assert_eq!(decode_status(0b0001_1000), Err(Error::EraseSequence));
        assert_eq!(decode_status(0b0000_1100), Err(Error::CommandCrc));
        assert_eq!(decode_status(0b0000_0101), Err(Error::IllegalCommand));
        assert_eq!(decode_status(0b0000_0011), Err(Error::EraseReset));
    }

    #[test]
    fn test_single_bits() {
        assert_eq!(decode_status(0b0000_0100), Err(Error::IllegalCommand));
        assert_eq!(decode_status(0x40), Err(Error::Parameter));
        assert_eq!(decode_status(0x08), Err(Error::CommandCrc));
    }

    #[test]
    fn test_expectations() {
        assert_eq!(Status::Ok.expect_ok(), Ok(()));
        assert_eq!(Status::Idle.expect_ok(), Err(Error::Idle));
        assert_eq!(Status::Idle.expect_idle(), Ok(()));
        assert_eq!(Status::Ok.expect_idle(), Err(Error::Generic));
    }

    #[test]
    fn test_ocr_bits() {
        let response = Response {
            status: Status::Ok,
            payload: 0xC0FF_8000,
        };
        assert!(response.ocr().contains(Ocr::POWER_UP | Ocr::CCS));
        assert!(response.ocr().contains(Ocr::VDD_27_36));
    }
}
