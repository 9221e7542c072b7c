//! CLI command implementations
//!
//! Every command works on a [`sdspi_card::CardHandle`], so the same code
//! drives the simulated card and real hardware.

mod dump;
mod info;
mod list;
mod read;
mod status;

pub use dump::cmd_dump;
pub use info::cmd_info;
pub use list::list_transports;
pub use read::cmd_read;
pub use status::cmd_status;

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the commands themselves
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Sector count must be at least 1")]
    EmptyRange,

    #[error("Sectors {start}+{count} exceed the 32-bit sector space")]
    RangeOverflow { start: u32, count: u32 },

    #[error("Failed to write {}: {source}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
