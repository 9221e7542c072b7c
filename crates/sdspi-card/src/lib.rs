//! High-level card access
//!
//! This crate opens a bus transport by name, pairs it with the matching
//! countdown source and hands back a [`CardHandle`]. The CLI only interacts
//! with types from this crate, never with a concrete transport.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        CLI (bin/sdspi)                       │
//! │  - Only imports sdspi-card                                   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     sdspi-card (this crate)                  │
//! │  - CardHandle: SdCard over boxed transport and timer         │
//! │  - open_card: opens transports by name                       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!              ┌───────────────┴───────────────┐
//!              ▼                               ▼
//! ┌──────────────────────────┐   ┌──────────────────────────┐
//! │    sdspi-core            │   │  Transport crates        │
//! │  - SdCard driver         │   │  - dummy, linux_spi      │
//! │  - BusTransport trait    │   │  - Implement BusTransport│
//! │  - TimeoutGuard trait    │   │    and TimeoutGuard      │
//! └──────────────────────────┘   └──────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use sdspi_card::open_card;
//! use sdspi_core::card::CardConfig;
//!
//! let mut handle = open_card("dummy:kind=sdhc", CardConfig::default())?;
//!
//! let mut buffer = vec![0u8; 4 * 512];
//! handle.read_blocks(0, &mut buffer)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod error;
mod handle;
mod registry;

pub use error::CardError;
pub use handle::{BoxedTimer, BoxedTransport, CardHandle, CardInfo};
pub use registry::{
    available_transports, open_card, open_transport, parse_transport_params,
    transport_names_short, TransportInfo, TransportParams,
};
pub use sdspi_core::consts::BLOCK_SIZE;
