//! Initialization sequence

use super::{Addressing, CardVersion, DriverState, SdCard};
use crate::bus::{BusTransport, CsLevel};
use crate::cmd::{command, Command, Ocr, Response, Status};
use crate::consts::{
    BLOCK_SIZE, HCS_BIT, IF_COND_ECHO_MASK, IF_COND_PATTERN, POWER_ON_RELEASED_BYTES,
    POWER_ON_SELECTED_BYTES,
};
use crate::error::{Error, Result};
use crate::timeout::TimeoutGuard;

impl<T: BusTransport, G: TimeoutGuard> SdCard<T, G> {
    /// Bring the card from power-on into the ready state
    ///
    /// Runs the full negotiation every time it is called. On failure the
    /// driver is left uninitialized and the call may be repeated.
    pub fn initialize(&mut self) -> Result<()> {
        self.state = DriverState::default();

        let (version, addressing) = self.negotiate().inspect_err(|e| {
            log::debug!("sdspi: initialization failed: {}", e);
        })?;

        self.state = DriverState {
            addressing: Some(addressing),
            version: Some(version),
            initialized: true,
        };
        Ok(())
    }

    fn negotiate(&mut self) -> Result<(CardVersion, Addressing)> {
        self.bus.enable()?;
        self.bus.set_clock(self.config.init_divider)?;
        self.power_on_clocks()?;

        command(&mut self.bus, Command::GoIdleState, 0)?
            .status
            .expect_idle()?;

        let version = self.probe_version()?;
        log::debug!("sdspi: card version {:?}", version);

        self.wait_until_ready(version)?;

        let addressing = match version {
            CardVersion::V2 => {
                let response = command(&mut self.bus, Command::ReadOcr, 0)?;
                response.status.expect_ok()?;
                if response.ocr().contains(Ocr::CCS) {
                    Addressing::Block
                } else {
                    Addressing::Byte
                }
            }
            CardVersion::V1 => Addressing::Byte,
        };
        log::debug!("sdspi: {:?} addressing", addressing);

        if addressing == Addressing::Byte {
            command(&mut self.bus, Command::SetBlockLen, BLOCK_SIZE as u32)?
                .status
                .expect_ok()?;
        }

        self.bus.set_clock(self.config.operating_divider)?;
        log::debug!(
            "sdspi: switched to operating clock {:?}",
            self.config.operating_divider
        );

        Ok((version, addressing))
    }

    /// At least 74 clocks with chip-select released, then a few selected
    fn power_on_clocks(&mut self) -> Result<()> {
        self.bus.restore(CsLevel::High)?;
        self.bus.skip_bytes(POWER_ON_RELEASED_BYTES)?;
        self.bus.restore(CsLevel::Low)?;
        self.bus.skip_bytes(POWER_ON_SELECTED_BYTES)?;
        self.bus.restore(CsLevel::High)
    }

    fn probe_version(&mut self) -> Result<CardVersion> {
        match command(&mut self.bus, Command::SendIfCond, IF_COND_PATTERN) {
            Ok(Response {
                status: Status::Idle,
                payload,
            }) => {
                if payload & IF_COND_ECHO_MASK == IF_COND_PATTERN {
                    Ok(CardVersion::V2)
                } else {
                    log::debug!("sdspi: interface condition echo 0x{:08X}", payload);
                    Err(Error::InvalidVoltageRange)
                }
            }
            Ok(Response {
                status: Status::Ok,
                ..
            }) => Err(Error::Generic),
            Err(Error::IllegalCommand | Error::NoResponse) => Ok(CardVersion::V1),
            Err(e) => Err(e),
        }
    }

    fn wait_until_ready(&mut self, version: CardVersion) -> Result<()> {
        let argument = match version {
            CardVersion::V2 => HCS_BIT,
            CardVersion::V1 => 0,
        };

        self.timer.arm(self.config.init_timeout_ms);
        let result = self.poll_op_cond(argument);
        self.timer.disarm();
        result
    }

    fn poll_op_cond(&mut self, argument: u32) -> Result<()> {
        while !self.timer.expired() {
            command(&mut self.bus, Command::AppCommand, 0)?;
            let response = command(&mut self.bus, Command::SdSendOpCond, argument)?;
            if response.status == Status::Ok {
                return Ok(());
            }
        }
        Err(Error::Timeout)
    }
}
