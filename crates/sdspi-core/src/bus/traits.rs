//! Bus transport trait definitions

use crate::consts::FILL_BYTE;
use crate::error::Result;

/// Electrical level of the chip-select line
///
/// Chip-select is active low: `Low` means the card is the addressed device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CsLevel {
    /// Released (card not addressed)
    #[default]
    High,
    /// Asserted (card addressed)
    Low,
}

impl CsLevel {
    /// Returns true if the card is addressed at this level
    pub const fn is_asserted(&self) -> bool {
        matches!(self, Self::Low)
    }
}

/// SPI clock divider, relative to the platform base clock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClockDivider {
    /// Base clock / 2
    Div2,
    /// Base clock / 4
    Div4,
    /// Base clock / 8
    Div8,
    /// Base clock / 16
    Div16,
    /// Base clock / 32
    Div32,
    /// Base clock / 64
    Div64,
    /// Base clock / 128
    Div128,
}

impl ClockDivider {
    /// Returns the division factor
    pub const fn factor(&self) -> u32 {
        match self {
            Self::Div2 => 2,
            Self::Div4 => 4,
            Self::Div8 => 8,
            Self::Div16 => 16,
            Self::Div32 => 32,
            Self::Div64 => 64,
            Self::Div128 => 128,
        }
    }

    /// Resulting bus clock for the given base clock
    pub const fn apply(&self, base_hz: u32) -> u32 {
        base_hz / self.factor()
    }
}

/// Bus transport trait
///
/// This trait represents exclusive ownership of the SPI bus and of the
/// chip-select line wired to the card. Every call is blocking.
///
/// ## Chip-select discipline
///
/// `select` asserts chip-select and returns the level it observed, and
/// `restore` puts that level back. An operation that selects the card while
/// an outer operation already did so therefore leaves the line asserted when
/// it finishes. Use [`super::ChipSelect`] rather than pairing the calls by
/// hand so every exit path restores the line.
///
/// ## Example
///
/// ```ignore
/// impl BusTransport for MySpi {
///     fn select(&mut self) -> Result<CsLevel> {
///         let prior = self.cs;
///         self.set_cs(CsLevel::Low)?;
///         Ok(prior)
///     }
///
///     fn restore(&mut self, level: CsLevel) -> Result<()> {
///         self.set_cs(level)
///     }
///
///     fn transfer_byte(&mut self, byte: u8) -> Result<u8> {
///         self.hw.exchange(byte).map_err(|_| Error::Generic)
///     }
///
///     fn set_clock(&mut self, divider: ClockDivider) -> Result<()> {
///         self.hw.set_divider(divider.factor());
///         Ok(())
///     }
/// }
/// ```
pub trait BusTransport {
    /// Assert chip-select, returning the level observed before
    fn select(&mut self) -> Result<CsLevel>;

    /// Drive chip-select to `level`
    fn restore(&mut self, level: CsLevel) -> Result<()>;

    /// Exchange a single byte (MSB first)
    fn transfer_byte(&mut self, byte: u8) -> Result<u8>;

    /// Change the bus clock divider
    fn set_clock(&mut self, divider: ClockDivider) -> Result<()>;

    /// Enable the bus peripheral
    fn enable(&mut self) -> Result<()> {
        Ok(())
    }

    /// Disable the bus peripheral
    fn disable(&mut self) -> Result<()> {
        Ok(())
    }

    /// Send bytes, discarding whatever the card clocks back
    fn send_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        for &byte in bytes {
            self.transfer_byte(byte)?;
        }
        Ok(())
    }

    /// Receive bytes in wire order, clocking out fill bytes
    fn receive_bytes(&mut self, buf: &mut [u8]) -> Result<()> {
        for byte in buf.iter_mut() {
            *byte = self.transfer_byte(FILL_BYTE)?;
        }
        Ok(())
    }

    /// Receive bytes into `buf` in reverse wire order
    ///
    /// The first byte on the wire lands in the last slot, so
    /// `u32::from_le_bytes` over a 4-byte buffer yields the MSB-first value.
    fn receive_bytes_le(&mut self, buf: &mut [u8]) -> Result<()> {
        for byte in buf.iter_mut().rev() {
            *byte = self.transfer_byte(FILL_BYTE)?;
        }
        Ok(())
    }

    /// Clock out `count` fill bytes and drop the received data
    fn skip_bytes(&mut self, count: usize) -> Result<()> {
        for _ in 0..count {
            self.transfer_byte(FILL_BYTE)?;
        }
        Ok(())
    }
}

// Blanket impl for boxed transports to allow trait objects
#[cfg(feature = "alloc")]
impl BusTransport for alloc::boxed::Box<dyn BusTransport + Send> {
    fn select(&mut self) -> Result<CsLevel> {
        (**self).select()
    }

    fn restore(&mut self, level: CsLevel) -> Result<()> {
        (**self).restore(level)
    }

    fn transfer_byte(&mut self, byte: u8) -> Result<u8> {
        (**self).transfer_byte(byte)
    }

    fn set_clock(&mut self, divider: ClockDivider) -> Result<()> {
        (**self).set_clock(divider)
    }

    fn enable(&mut self) -> Result<()> {
        (**self).enable()
    }

    fn disable(&mut self) -> Result<()> {
        (**self).disable()
    }

    fn send_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).send_bytes(bytes)
    }

    fn receive_bytes(&mut self, buf: &mut [u8]) -> Result<()> {
        (**self).receive_bytes(buf)
    }

    fn receive_bytes_le(&mut self, buf: &mut [u8]) -> Result<()> {
        (**self).receive_bytes_le(buf)
    }

    fn skip_bytes(&mut self, count: usize) -> Result<()> {
        (**self).skip_bytes(count)
    }
}
