//! Live readiness query

use super::SdCard;
use crate::bus::BusTransport;
use crate::cmd::{command, Command, Ocr, Status};
use crate::timeout::TimeoutGuard;

impl<T: BusTransport, G: TimeoutGuard> SdCard<T, G> {
    /// Ask the card whether it finished its power-up routine
    ///
    /// This reads the operating conditions register on every call instead
    /// of returning the cached initialization flag, so it also tells whether
    /// a card is physically present. Any failure reads as not ready.
    pub fn is_ready(&mut self) -> bool {
        match command(&mut self.bus, Command::ReadOcr, 0) {
            Ok(response) => {
                response.status == Status::Ok && response.ocr().contains(Ocr::POWER_UP)
            }
            Err(e) => {
                log::trace!("sdspi: readiness query failed: {}", e);
                false
            }
        }
    }
}
