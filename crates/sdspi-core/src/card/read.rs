//! Single-block reads

use super::{Addressing, SdCard};
use crate::bus::{BusTransport, ChipSelect};
use crate::cmd::{command, Command};
use crate::consts::{BLOCK_SIZE, DATA_CRC_LEN, DATA_START_TOKEN, FILL_BYTE};
use crate::error::{Error, Result};
use crate::timeout::TimeoutGuard;

impl<T: BusTransport, G: TimeoutGuard> SdCard<T, G> {
    /// Read block `block` into `buf`
    ///
    /// Chip-select stays asserted from the command until the trailing check
    /// bytes are consumed and is restored to its entry level on every exit.
    /// `buf` is only written once the start token has arrived.
    pub fn read_block(&mut self, block: u32, buf: &mut [u8; BLOCK_SIZE]) -> Result<()> {
        if !self.state.initialized {
            return Err(Error::NotInitialized);
        }
        let address = self
            .state
            .addressing
            .unwrap_or(Addressing::Byte)
            .address(block);

        let mut cs = ChipSelect::acquire(&mut self.bus)?;
        command(&mut *cs, Command::ReadSingleBlock, address)?
            .status
            .expect_ok()?;

        self.timer.arm(self.config.read_timeout_ms);
        let token = wait_for_token(&mut *cs, &self.timer);
        self.timer.disarm();

        match token? {
            DATA_START_TOKEN => {}
            other => {
                log::debug!("sdspi: block {} bad start token 0x{:02X}", block, other);
                return Err(Error::Generic);
            }
        }

        cs.receive_bytes(buf)?;
        cs.skip_bytes(DATA_CRC_LEN)?;
        cs.release()
    }
}

/// Poll until a byte other than fill arrives or `timer` expires
fn wait_for_token<B, G>(bus: &mut B, timer: &G) -> Result<u8>
where
    B: BusTransport + ?Sized,
    G: TimeoutGuard,
{
    loop {
        let byte = bus.transfer_byte(FILL_BYTE)?;
        if byte != FILL_BYTE {
            return Ok(byte);
        }
        if timer.expired() {
            return Err(Error::Timeout);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::vec::Vec;

    use super::*;
    use crate::bus::CsLevel;
    use crate::card::{CardConfig, CardVersion, DriverState};
    use crate::testing::{PollTimer, ScriptedBus};

    fn ready_card(
        bus: ScriptedBus,
        timer: PollTimer,
        addressing: Addressing,
    ) -> SdCard<ScriptedBus, PollTimer> {
        let mut card = SdCard::new(bus, timer, CardConfig::default());
        card.state = DriverState {
            addressing: Some(addressing),
            version: Some(CardVersion::V2),
            initialized: true,
        };
        card
    }

    fn block_reply(token_delay: usize, data: &[u8]) -> Vec<u8> {
        let mut miso = std::vec![0xFF; 6];
        miso.push(0x00);
        miso.extend(core::iter::repeat(0xFF).take(token_delay));
        miso.push(DATA_START_TOKEN);
        miso.extend_from_slice(data);
        miso.extend_from_slice(&[0xAB, 0xCD]);
        miso
    }

    #[test]
    fn test_read_before_initialize() {
        let mut card = SdCard::new(ScriptedBus::new(&[]), PollTimer::new(), CardConfig::default());
        let mut buf = [0x5Au8; BLOCK_SIZE];
        assert_eq!(card.read_block(0, &mut buf), Err(Error::NotInitialized));
        assert!(buf.iter().all(|&b| b == 0x5A));
        assert!(card.transport().sent().is_empty());
        assert!(card.transport().cs_changes().is_empty());
    }

    #[test]
    fn test_block_address_on_wire() {
        let data: Vec<u8> = (0..BLOCK_SIZE).map(|i| i as u8).collect();

        let bus = ScriptedBus::new(&block_reply(3, &data));
        let mut card = ready_card(bus, PollTimer::new(), Addressing::Block);
        let mut buf = [0u8; BLOCK_SIZE];
        card.read_block(9, &mut buf).unwrap();
        assert_eq!(&card.transport().sent()[..6], &[0x51, 0, 0, 0, 9, 0x01]);
        assert_eq!(&buf[..], &data[..]);
        assert_eq!(card.transport().remaining(), 0);

        let bus = ScriptedBus::new(&block_reply(0, &data));
        let mut card = ready_card(bus, PollTimer::new(), Addressing::Byte);
        card.read_block(9, &mut buf).unwrap();
        // 9 * 512 = 0x1200
        assert_eq!(&card.transport().sent()[..6], &[0x51, 0, 0, 0x12, 0x00, 0x01]);
    }

    #[test]
    fn test_missing_token_times_out() {
        let mut miso = std::vec![0xFF; 6];
        miso.push(0x00);
        let bus = ScriptedBus::new(&miso);
        let mut card = ready_card(bus, PollTimer::expiring_after(20), Addressing::Block);

        let mut buf = [0x5Au8; BLOCK_SIZE];
        assert_eq!(card.read_block(1, &mut buf), Err(Error::Timeout));
        assert!(buf.iter().all(|&b| b == 0x5A));
        assert_eq!(card.timer().disarms, 1);
        assert_eq!(card.transport().cs(), CsLevel::High);
    }

    #[test]
    fn test_bad_token_is_generic() {
        let mut miso = std::vec![0xFF; 6];
        miso.extend_from_slice(&[0x00, 0xFF, 0x09]);
        let bus = ScriptedBus::new(&miso);
        let mut card = ready_card(bus, PollTimer::new(), Addressing::Block);

        let mut buf = [0u8; BLOCK_SIZE];
        assert_eq!(card.read_block(1, &mut buf), Err(Error::Generic));
        assert_eq!(card.transport().cs(), CsLevel::High);
    }

    #[test]
    fn test_rejected_command_restores_chip_select() {
        let mut miso = std::vec![0xFF; 6];
        miso.push(0x20);
        let bus = ScriptedBus::new(&miso);
        let mut card = ready_card(bus, PollTimer::new(), Addressing::Byte);

        let mut buf = [0u8; BLOCK_SIZE];
        assert_eq!(card.read_block(1, &mut buf), Err(Error::AddressError));
        assert_eq!(card.transport().cs(), CsLevel::High);
        // Timer never armed when the command itself fails
        assert!(card.timer().armed.is_empty());
    }

    #[test]
    fn test_read_keeps_outer_selection() {
        let data = [0u8; BLOCK_SIZE];
        let mut bus = ScriptedBus::new(&block_reply(0, &data));
        bus.select().unwrap();
        let mut card = ready_card(bus, PollTimer::new(), Addressing::Block);

        let mut buf = [0u8; BLOCK_SIZE];
        card.read_block(0, &mut buf).unwrap();
        assert_eq!(card.transport().cs(), CsLevel::Low);
    }
}
