//! Bus transport traits and abstractions
//!
//! This module defines the trait a platform implements to give the driver
//! exclusive access to the SPI bus and the card's chip-select line.

mod select;
mod traits;

pub use select::ChipSelect;
pub use traits::*;
