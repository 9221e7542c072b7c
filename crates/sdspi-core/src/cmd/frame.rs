//! Command frame encoding

use super::Command;
use crate::consts::{FRAME_LEN, FRAME_START, FRAME_STOP};

/// A single 6-byte command frame
///
/// Wire format is `01CCCCCC AAAAAAAA AAAAAAAA AAAAAAAA AAAAAAAA RRRRRRR1`
/// where C is the command index, A the big-endian argument and R the 7-bit
/// check value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandFrame {
    /// Command index (0-63)
    pub index: u8,
    /// 32-bit argument
    pub argument: u32,
    /// 7-bit check value (0 when checking is disabled)
    pub check: u8,
}

impl CommandFrame {
    /// Frame for `cmd` using its fixed check value
    pub const fn new(cmd: Command, argument: u32) -> Self {
        Self {
            index: cmd.index(),
            argument,
            check: cmd.fixed_check(),
        }
    }

    /// Frame with an explicit 7-bit check value
    pub const fn with_check(index: u8, argument: u32, check: u8) -> Self {
        Self {
            index,
            argument,
            check,
        }
    }

    /// Encode the frame into its wire bytes
    pub fn encode(&self) -> [u8; FRAME_LEN] {
        let arg = self.argument.to_be_bytes();
        [
            FRAME_START | (self.index & 0x3F),
            arg[0],
            arg[1],
            arg[2],
            arg[3],
            ((self.check & 0x7F) << 1) | FRAME_STOP,
        ]
    }
}
