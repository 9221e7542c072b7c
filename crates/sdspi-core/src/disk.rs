//! Disk I/O glue for FAT filesystem layers
//!
//! Maps the driver onto the status/result codes a FatFs-style storage layer
//! expects. There is a single physical drive, so no drive number is taken.

use bitflags::bitflags;

use crate::bus::BusTransport;
use crate::card::SdCard;
use crate::consts::BLOCK_SIZE;
use crate::error::Error;
use crate::timeout::TimeoutGuard;

bitflags! {
    /// Drive status; empty means ready
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DiskStatus: u8 {
        /// Drive not initialized
        const NOT_INITIALIZED = 0x01;
        /// No medium in the drive
        const NO_DISK = 0x02;
    }
}

/// Result of a sector transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiskResult {
    /// Transfer succeeded
    Ok,
    /// Hard error during the transfer
    Error,
    /// Drive not ready
    NotReady,
    /// Invalid parameter
    ParameterError,
}

impl From<Error> for DiskResult {
    fn from(e: Error) -> Self {
        match e {
            Error::Idle => Self::NotReady,
            _ => Self::Error,
        }
    }
}

/// Drive status from a live readiness query
pub fn disk_status<T: BusTransport, G: TimeoutGuard>(card: &mut SdCard<T, G>) -> DiskStatus {
    if card.is_ready() {
        DiskStatus::empty()
    } else {
        DiskStatus::NOT_INITIALIZED
    }
}

/// Initialize the drive
///
/// A negotiation timeout means no card answered and reads as `NO_DISK`.
pub fn disk_initialize<T: BusTransport, G: TimeoutGuard>(card: &mut SdCard<T, G>) -> DiskStatus {
    match card.initialize() {
        Ok(()) => DiskStatus::empty(),
        Err(Error::Timeout) => DiskStatus::NO_DISK,
        Err(_) => DiskStatus::NOT_INITIALIZED,
    }
}

/// Read `count` sectors starting at `sector` into `buf`
///
/// `buf` must hold exactly `count` sectors. Sectors are read one at a time
/// and the first failure ends the transfer.
pub fn disk_read<T: BusTransport, G: TimeoutGuard>(
    card: &mut SdCard<T, G>,
    buf: &mut [u8],
    sector: u32,
    count: usize,
) -> DiskResult {
    if count == 0 || count.checked_mul(BLOCK_SIZE) != Some(buf.len()) {
        return DiskResult::ParameterError;
    }

    for (offset, chunk) in buf.chunks_exact_mut(BLOCK_SIZE).enumerate() {
        let block = u32::try_from(offset)
            .ok()
            .and_then(|offset| sector.checked_add(offset));
        let (Some(block), Ok(chunk)) = (block, <&mut [u8; BLOCK_SIZE]>::try_from(chunk)) else {
            return DiskResult::ParameterError;
        };
        if let Err(e) = card.read_block(block, chunk) {
            log::debug!("sdspi: disk read of sector {} failed: {}", block, e);
            return e.into();
        }
    }
    DiskResult::Ok
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::CardConfig;
    use crate::testing::{PollTimer, ScriptedBus};

    #[test]
    fn test_error_mapping() {
        assert_eq!(DiskResult::from(Error::Idle), DiskResult::NotReady);
        assert_eq!(DiskResult::from(Error::Timeout), DiskResult::Error);
        assert_eq!(DiskResult::from(Error::NotInitialized), DiskResult::Error);
    }

    #[test]
    fn test_read_rejects_bad_lengths() {
        let mut card = SdCard::new(ScriptedBus::new(&[]), PollTimer::new(), CardConfig::default());
        let mut buf = [0u8; BLOCK_SIZE * 2];
        assert_eq!(disk_read(&mut card, &mut buf, 0, 0), DiskResult::ParameterError);
        assert_eq!(disk_read(&mut card, &mut buf, 0, 1), DiskResult::ParameterError);
        assert_eq!(disk_read(&mut card, &mut buf[..100], 0, 1), DiskResult::ParameterError);
        assert!(card.transport().sent().is_empty());
    }

    #[test]
    fn test_read_before_initialize_is_error() {
        let mut card = SdCard::new(ScriptedBus::new(&[]), PollTimer::new(), CardConfig::default());
        let mut buf = [0u8; BLOCK_SIZE];
        assert_eq!(disk_read(&mut card, &mut buf, 0, 1), DiskResult::Error);
    }

    #[test]
    fn test_silent_card_status() {
        let mut card = SdCard::new(ScriptedBus::new(&[]), PollTimer::new(), CardConfig::default());
        assert_eq!(disk_status(&mut card), DiskStatus::NOT_INITIALIZED);
        assert_eq!(disk_initialize(&mut card), DiskStatus::NOT_INITIALIZED);
    }
}
