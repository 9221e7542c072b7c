//! SD SPI-mode command set

use crate::consts::{GO_IDLE_CHECK, SEND_IF_COND_CHECK};

/// Commands issued by the driver
///
/// Application commands (`ACMD*`) must be preceded by [`Command::AppCommand`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// CMD0 GO_IDLE_STATE - software reset, enters SPI mode
    GoIdleState,
    /// CMD8 SEND_IF_COND - interface condition / version probe
    SendIfCond,
    /// CMD16 SET_BLOCKLEN - block length for byte-addressed cards
    SetBlockLen,
    /// CMD17 READ_SINGLE_BLOCK
    ReadSingleBlock,
    /// CMD55 APP_CMD - prefix for application commands
    AppCommand,
    /// CMD58 READ_OCR - operating conditions register
    ReadOcr,
    /// ACMD41 SD_SEND_OP_COND - start initialization
    SdSendOpCond,
}

impl Command {
    /// Command index (0-63) placed in the first frame byte
    pub const fn index(&self) -> u8 {
        match self {
            Self::GoIdleState => 0,
            Self::SendIfCond => 8,
            Self::SetBlockLen => 16,
            Self::ReadSingleBlock => 17,
            Self::AppCommand => 55,
            Self::ReadOcr => 58,
            Self::SdSendOpCond => 41,
        }
    }

    /// Number of payload bytes following the status byte
    pub const fn payload_len(&self) -> usize {
        match self {
            Self::SendIfCond | Self::ReadOcr => 4,
            _ => 0,
        }
    }

    /// Check value the card verifies even with checking disabled
    ///
    /// Only CMD0 and CMD8 are checked while the card is in SPI mode with
    /// checking off; every other command carries 0.
    pub const fn fixed_check(&self) -> u8 {
        match self {
            Self::GoIdleState => GO_IDLE_CHECK,
            Self::SendIfCond => SEND_IF_COND_CHECK,
            _ => 0,
        }
    }

    /// Returns true for application commands
    pub const fn is_app_command(&self) -> bool {
        matches!(self, Self::SdSendOpCond)
    }
}
