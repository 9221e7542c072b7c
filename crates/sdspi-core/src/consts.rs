//! SD SPI-mode protocol constants

/// Size of one card sector in bytes
pub const BLOCK_SIZE: usize = 512;

/// Value clocked out while receiving, and idle level of the card's data out
pub const FILL_BYTE: u8 = 0xFF;

/// Maximum number of bytes polled for a status byte after a command
pub const RESPONSE_POLL_LIMIT: usize = 10;

/// Start token preceding the data of a single-block read
pub const DATA_START_TOKEN: u8 = 0xFE;

/// Number of check bytes trailing every data block
pub const DATA_CRC_LEN: usize = 2;

/// Bytes clocked with chip-select released at power-on (>= 74 clocks)
pub const POWER_ON_RELEASED_BYTES: usize = 10;

/// Bytes clocked with chip-select asserted after the power-on clocks
pub const POWER_ON_SELECTED_BYTES: usize = 2;

// ============================================================================
// Command framing
// ============================================================================

/// Start bit (0) and transmission bit (1) of the first frame byte
pub const FRAME_START: u8 = 0x40;

/// Stop bit of the last frame byte
pub const FRAME_STOP: u8 = 0x01;

/// Length of a command frame in bytes
pub const FRAME_LEN: usize = 6;

/// 7-bit check value of CMD0 with argument 0 (wire byte 0x95)
pub const GO_IDLE_CHECK: u8 = 0x95 >> 1;

/// 7-bit check value of CMD8 with argument 0x1AA (wire byte 0x87)
pub const SEND_IF_COND_CHECK: u8 = 0x87 >> 1;

// ============================================================================
// Negotiation
// ============================================================================

/// CMD8 argument: 2.7-3.6V supply and check pattern 0xAA
pub const IF_COND_PATTERN: u32 = 0x0000_01AA;

/// Bits of the CMD8 echo compared against [`IF_COND_PATTERN`]
pub const IF_COND_ECHO_MASK: u32 = 0x0000_0FFF;

/// ACMD41 host capacity support bit
pub const HCS_BIT: u32 = 1 << 30;
