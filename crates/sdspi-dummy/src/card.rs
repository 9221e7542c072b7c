//! Byte-level SD card emulation
//!
//! The card sees the bus exactly like a real card in SPI mode: it assembles
//! command frames from the bytes clocked in while chip-select is asserted and
//! answers on the following transfers. Nothing is exchanged while
//! chip-select is released.

use alloc::vec;
use alloc::vec::Vec;

use heapless::Deque;

use sdspi_core::bus::{BusTransport, ClockDivider, CsLevel};
use sdspi_core::cmd::{Ocr, R1};
use sdspi_core::consts::{
    BLOCK_SIZE, DATA_CRC_LEN, DATA_START_TOKEN, FILL_BYTE, FRAME_LEN, FRAME_START, HCS_BIT,
    IF_COND_ECHO_MASK, POWER_ON_RELEASED_BYTES,
};
use sdspi_core::error::{Error, Result};

/// Status byte plus the largest payload
const PENDING_CAPACITY: usize = 8;

/// Wire byte ending a valid CMD0 frame
const GO_IDLE_CHECK_BYTE: u8 = 0x95;

/// Wire byte ending a valid CMD8 frame for argument 0x1AA
const SEND_IF_COND_CHECK_BYTE: u8 = 0x87;

/// Kind of card inserted in the simulated slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CardKind {
    /// Version 1.x standard capacity card
    V1,
    /// Version 2 standard capacity card (byte addressing)
    V2Standard,
    /// Version 2 high capacity card (block addressing)
    #[default]
    V2HighCapacity,
    /// Empty slot; the data line stays high
    Absent,
}

impl CardKind {
    /// Parse an option value (`v1`, `sdsc`, `sdhc`, `none`)
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "v1" => Some(Self::V1),
            "sdsc" | "v2" => Some(Self::V2Standard),
            "sdhc" | "sdxc" => Some(Self::V2HighCapacity),
            "none" | "absent" => Some(Self::Absent),
            _ => None,
        }
    }

    /// Option value naming this kind
    pub const fn name(&self) -> &'static str {
        match self {
            Self::V1 => "v1",
            Self::V2Standard => "sdsc",
            Self::V2HighCapacity => "sdhc",
            Self::Absent => "none",
        }
    }

    const fn is_high_capacity(&self) -> bool {
        matches!(self, Self::V2HighCapacity)
    }
}

/// Configuration for the simulated card
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// Kind of card in the slot
    pub kind: CardKind,
    /// Capacity in 512-byte blocks
    pub blocks: u32,
    /// ACMD41 polls answered with idle before the card becomes ready
    pub idle_polls: u32,
    /// Fill bytes between a command frame and its status byte
    pub response_latency: usize,
    /// Fill bytes between a read status and the start token
    pub token_latency: usize,
    /// Start token sent before block data; `None` never sends one
    pub start_token: Option<u8>,
    /// Value echoed by CMD8 instead of the received check pattern
    pub echo_override: Option<u32>,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            kind: CardKind::default(),
            blocks: 2048, // 1 MiB
            idle_polls: 3,
            response_latency: 1,
            token_latency: 4,
            start_token: Some(DATA_START_TOKEN),
            echo_override: None,
        }
    }
}

/// Command received by the simulated card
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoggedCommand {
    /// Command index
    pub index: u8,
    /// Argument
    pub argument: u32,
    /// Preceded by CMD55
    pub app: bool,
}

#[derive(Debug, Clone, Copy)]
struct ReadPhase {
    block: u32,
    latency: usize,
    token_sent: bool,
    offset: usize,
    crc: u16,
}

/// Simulated SD card implementing [`BusTransport`]
pub struct DummyCard {
    config: DummyConfig,
    data: Vec<u8>,

    // Bus side
    cs: CsLevel,
    enabled: bool,
    clock_log: Vec<ClockDivider>,
    transfer_budget: Option<usize>,

    // Card side
    released_clocks: usize,
    spi_mode: bool,
    idle: bool,
    app_command: bool,
    op_cond_remaining: u32,
    block_len: Option<u32>,
    frame: heapless::Vec<u8, FRAME_LEN>,
    latency: usize,
    pending: Deque<u8, PENDING_CAPACITY>,
    read: Option<ReadPhase>,

    faults: Vec<(u8, u8)>,
    commands: Vec<LoggedCommand>,
}

impl DummyCard {
    /// Create a card with zeroed contents
    pub fn new(config: DummyConfig) -> Self {
        let data = vec![0u8; config.blocks as usize * BLOCK_SIZE];
        Self {
            config,
            data,
            cs: CsLevel::High,
            enabled: false,
            clock_log: Vec::new(),
            transfer_budget: None,
            released_clocks: 0,
            spi_mode: false,
            idle: true,
            app_command: false,
            op_cond_remaining: 0,
            block_len: None,
            frame: heapless::Vec::new(),
            latency: 0,
            pending: Deque::new(),
            read: None,
            faults: Vec::new(),
            commands: Vec::new(),
        }
    }

    /// Create a default high capacity card
    pub fn new_default() -> Self {
        Self::new(DummyConfig::default())
    }

    /// Create a card with pre-filled contents
    pub fn with_data(config: DummyConfig, initial_data: &[u8]) -> Self {
        let mut card = Self::new(config);
        let len = core::cmp::min(initial_data.len(), card.data.len());
        card.data[..len].copy_from_slice(&initial_data[..len]);
        card
    }

    /// Get the configuration
    pub fn config(&self) -> &DummyConfig {
        &self.config
    }

    /// Card contents
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable card contents
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Current chip-select level
    pub fn cs(&self) -> CsLevel {
        self.cs
    }

    /// Returns true while the bus peripheral is enabled
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Every divider the host selected, oldest first
    pub fn clock_log(&self) -> &[ClockDivider] {
        &self.clock_log
    }

    /// Divider currently selected
    pub fn divider(&self) -> Option<ClockDivider> {
        self.clock_log.last().copied()
    }

    /// Commands received so far, oldest first
    pub fn commands(&self) -> &[LoggedCommand] {
        &self.commands
    }

    /// Returns true if command `index` was received
    pub fn issued(&self, index: u8) -> bool {
        self.commands.iter().any(|c| c.index == index)
    }

    /// Number of times command `index` was received
    pub fn count(&self, index: u8) -> usize {
        self.commands.iter().filter(|c| c.index == index).count()
    }

    /// Forget the command log
    pub fn clear_log(&mut self) {
        self.commands.clear();
    }

    /// Block length set by CMD16
    pub fn block_len(&self) -> Option<u32> {
        self.block_len
    }

    /// Returns true once the card left the idle state
    pub fn is_ready(&self) -> bool {
        self.spi_mode && !self.idle
    }

    /// Answer command `index` with status byte `r1` and no payload
    ///
    /// `0xFF` makes the card ignore the command entirely.
    pub fn inject_fault(&mut self, index: u8, r1: u8) {
        self.faults.retain(|(i, _)| *i != index);
        self.faults.push((index, r1));
    }

    /// Remove all injected faults
    pub fn clear_faults(&mut self) {
        self.faults.clear();
    }

    /// Fail every transfer after `count` more succeed
    pub fn fail_transfers_after(&mut self, count: usize) {
        self.transfer_budget = Some(count);
    }

    /// Stop failing transfers
    pub fn clear_transfer_failure(&mut self) {
        self.transfer_budget = None;
    }

    /// Change the start token of later reads; `None` stalls them
    pub fn set_start_token(&mut self, token: Option<u8>) {
        self.config.start_token = token;
    }

    /// Change the number of fill bytes before the start token
    pub fn set_token_latency(&mut self, latency: usize) {
        self.config.token_latency = latency;
    }

    fn drive_cs(&mut self, level: CsLevel) {
        if self.cs.is_asserted() && !level.is_asserted() {
            // Deselecting aborts whatever the card was sending
            self.frame.clear();
            self.abort_output();
        }
        self.cs = level;
    }

    fn abort_output(&mut self) {
        self.latency = 0;
        self.pending.clear();
        self.read = None;
    }

    fn idle_bits(&self) -> u8 {
        if self.idle {
            R1::IDLE.bits()
        } else {
            0
        }
    }

    fn next_miso(&mut self) -> u8 {
        if self.latency > 0 {
            self.latency -= 1;
            return FILL_BYTE;
        }
        if let Some(byte) = self.pending.pop_front() {
            return byte;
        }
        self.next_data_byte()
    }

    fn next_data_byte(&mut self) -> u8 {
        let Some(mut phase) = self.read else {
            return FILL_BYTE;
        };

        let byte = if phase.latency > 0 {
            phase.latency -= 1;
            FILL_BYTE
        } else if !phase.token_sent {
            match self.config.start_token {
                Some(token) => {
                    phase.token_sent = true;
                    token
                }
                None => FILL_BYTE,
            }
        } else if phase.offset < BLOCK_SIZE {
            let byte = self.data[phase.block as usize * BLOCK_SIZE + phase.offset];
            phase.offset += 1;
            byte
        } else {
            let crc = phase.crc.to_be_bytes();
            let byte = crc[phase.offset - BLOCK_SIZE];
            phase.offset += 1;
            byte
        };

        self.read = if phase.offset < BLOCK_SIZE + DATA_CRC_LEN {
            Some(phase)
        } else {
            None
        };
        byte
    }

    fn accept_mosi(&mut self, byte: u8) {
        if self.frame.is_empty() {
            if byte & 0xC0 != FRAME_START {
                return;
            }
            // A new command aborts the previous response
            self.abort_output();
        }
        let _ = self.frame.push(byte);
        if self.frame.is_full() {
            let mut raw = [0u8; FRAME_LEN];
            raw.copy_from_slice(&self.frame);
            self.frame.clear();
            self.execute(raw);
        }
    }

    fn reply(&mut self, r1: u8, payload: Option<u32>) {
        if r1 == FILL_BYTE {
            return;
        }
        self.latency = self.config.response_latency;
        let _ = self.pending.push_back(r1);
        if let Some(payload) = payload {
            for byte in payload.to_be_bytes() {
                let _ = self.pending.push_back(byte);
            }
        }
    }

    fn execute(&mut self, frame: [u8; FRAME_LEN]) {
        let index = frame[0] & 0x3F;
        let argument = u32::from_be_bytes([frame[1], frame[2], frame[3], frame[4]]);
        let check = frame[5];
        let app = core::mem::take(&mut self.app_command);

        self.commands.push(LoggedCommand {
            index,
            argument,
            app,
        });
        log::trace!(
            "dummy: {}CMD{} arg=0x{:08X} check=0x{:02X}",
            if app { "A" } else { "" },
            index,
            argument,
            check
        );

        if let Some(&(_, r1)) = self.faults.iter().find(|(i, _)| *i == index) {
            self.reply(r1, None);
            return;
        }

        // Outside SPI mode only a reset is recognised
        if !self.spi_mode && index != 0 {
            return;
        }

        match (index, app) {
            (0, _) => self.go_idle(check),
            (8, _) => self.send_if_cond(argument, check),
            (16, _) => self.set_block_len(argument),
            (17, _) => self.read_single_block(argument),
            (41, true) => self.send_op_cond(argument),
            (55, _) => {
                self.app_command = true;
                self.reply(self.idle_bits(), None);
            }
            (58, _) => self.read_ocr(),
            _ => self.reply(R1::ILLEGAL_COMMAND.bits() | self.idle_bits(), None),
        }
    }

    fn go_idle(&mut self, check: u8) {
        if !self.spi_mode && self.released_clocks < POWER_ON_RELEASED_BYTES {
            log::debug!(
                "dummy: reset after only {} power-on bytes",
                self.released_clocks
            );
            return;
        }
        if check != GO_IDLE_CHECK_BYTE {
            self.reply((R1::COMMAND_CRC | R1::IDLE).bits(), None);
            return;
        }
        self.spi_mode = true;
        self.idle = true;
        self.op_cond_remaining = self.config.idle_polls;
        self.block_len = None;
        self.reply(R1::IDLE.bits(), None);
    }

    fn send_if_cond(&mut self, argument: u32, check: u8) {
        if self.config.kind == CardKind::V1 {
            self.reply(R1::ILLEGAL_COMMAND.bits() | self.idle_bits(), None);
            return;
        }
        if check != SEND_IF_COND_CHECK_BYTE {
            self.reply(R1::COMMAND_CRC.bits() | self.idle_bits(), None);
            return;
        }
        let echo = self
            .config
            .echo_override
            .unwrap_or(argument & IF_COND_ECHO_MASK);
        self.reply(self.idle_bits(), Some(echo));
    }

    fn send_op_cond(&mut self, argument: u32) {
        // A high capacity card never finishes without host support
        let host_supports_hc = argument & HCS_BIT != 0;
        if self.config.kind.is_high_capacity() && !host_supports_hc {
            self.reply(R1::IDLE.bits(), None);
            return;
        }
        if self.op_cond_remaining > 0 {
            self.op_cond_remaining -= 1;
            self.reply(R1::IDLE.bits(), None);
        } else {
            self.idle = false;
            self.reply(0, None);
        }
    }

    fn read_ocr(&mut self) {
        let mut ocr = Ocr::VDD_27_36;
        if self.is_ready() {
            ocr |= Ocr::POWER_UP;
            if self.config.kind.is_high_capacity() {
                ocr |= Ocr::CCS;
            }
        }
        self.reply(self.idle_bits(), Some(ocr.bits()));
    }

    fn set_block_len(&mut self, argument: u32) {
        let valid = if self.config.kind.is_high_capacity() {
            argument == BLOCK_SIZE as u32
        } else {
            argument > 0 && argument <= BLOCK_SIZE as u32
        };
        if !valid {
            self.reply(R1::PARAMETER.bits() | self.idle_bits(), None);
            return;
        }
        self.block_len = Some(argument);
        self.reply(self.idle_bits(), None);
    }

    fn read_single_block(&mut self, argument: u32) {
        if self.idle {
            self.reply(R1::ILLEGAL_COMMAND.bits() | R1::IDLE.bits(), None);
            return;
        }

        let block = if self.config.kind.is_high_capacity() {
            argument
        } else if argument % BLOCK_SIZE as u32 != 0 {
            self.reply(R1::ADDRESS_ERROR.bits(), None);
            return;
        } else {
            argument / BLOCK_SIZE as u32
        };

        if block >= self.config.blocks {
            self.reply(R1::PARAMETER.bits(), None);
            return;
        }

        let start = block as usize * BLOCK_SIZE;
        let crc = crc16(&self.data[start..start + BLOCK_SIZE]);
        self.reply(0, None);
        self.read = Some(ReadPhase {
            block,
            latency: self.config.token_latency,
            token_sent: false,
            offset: 0,
            crc,
        });
    }
}

impl BusTransport for DummyCard {
    fn select(&mut self) -> Result<CsLevel> {
        let prior = self.cs;
        self.drive_cs(CsLevel::Low);
        Ok(prior)
    }

    fn restore(&mut self, level: CsLevel) -> Result<()> {
        self.drive_cs(level);
        Ok(())
    }

    fn transfer_byte(&mut self, byte: u8) -> Result<u8> {
        if !self.enabled {
            log::warn!("dummy: transfer while bus disabled");
            return Err(Error::Generic);
        }
        if let Some(budget) = self.transfer_budget {
            if budget == 0 {
                return Err(Error::Generic);
            }
            self.transfer_budget = Some(budget - 1);
        }

        if self.config.kind == CardKind::Absent {
            return Ok(FILL_BYTE);
        }
        if !self.cs.is_asserted() {
            if !self.spi_mode {
                self.released_clocks += 1;
            }
            return Ok(FILL_BYTE);
        }

        let miso = self.next_miso();
        self.accept_mosi(byte);
        Ok(miso)
    }

    fn set_clock(&mut self, divider: ClockDivider) -> Result<()> {
        self.clock_log.push(divider);
        Ok(())
    }

    fn enable(&mut self) -> Result<()> {
        self.enabled = true;
        Ok(())
    }

    fn disable(&mut self) -> Result<()> {
        self.enabled = false;
        Ok(())
    }
}

/// CRC-16/XMODEM over a data block
fn crc16(data: &[u8]) -> u16 {
    let mut crc = 0u16;
    for &byte in data {
        crc ^= (byte as u16) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ 0x1021
            } else {
                crc << 1
            };
        }
    }
    crc
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdspi_core::cmd::{command, Command, Status};

    fn powered_card(config: DummyConfig) -> DummyCard {
        let mut card = DummyCard::new(config);
        card.enable().unwrap();
        card.skip_bytes(POWER_ON_RELEASED_BYTES).unwrap();
        card
    }

    #[test]
    fn test_crc16_check_value() {
        assert_eq!(crc16(b"123456789"), 0x31C3);
    }

    #[test]
    fn test_reset_requires_power_on_clocks() {
        let mut card = DummyCard::new_default();
        card.enable().unwrap();
        assert_eq!(
            command(&mut card, Command::GoIdleState, 0),
            Err(Error::NoResponse)
        );

        let mut card = powered_card(DummyConfig::default());
        let response = command(&mut card, Command::GoIdleState, 0).unwrap();
        assert_eq!(response.status, Status::Idle);
    }

    #[test]
    fn test_bad_check_byte_is_rejected() {
        let mut card = powered_card(DummyConfig::default());
        card.select().unwrap();
        card.send_bytes(&[0x40, 0, 0, 0, 0, 0x01]).unwrap();
        let status = card.transfer_byte(FILL_BYTE).unwrap();
        let status = if status == FILL_BYTE {
            card.transfer_byte(FILL_BYTE).unwrap()
        } else {
            status
        };
        assert_eq!(status, 0x09);
    }

    #[test]
    fn test_commands_ignored_before_reset() {
        let mut card = powered_card(DummyConfig::default());
        assert_eq!(command(&mut card, Command::ReadOcr, 0), Err(Error::NoResponse));
        assert!(card.issued(58));
    }

    #[test]
    fn test_absent_card_stays_silent() {
        let mut card = powered_card(DummyConfig {
            kind: CardKind::Absent,
            ..Default::default()
        });
        assert_eq!(
            command(&mut card, Command::GoIdleState, 0),
            Err(Error::NoResponse)
        );
        assert!(card.commands().is_empty());
    }

    #[test]
    fn test_disabled_bus_fails_transfers() {
        let mut card = DummyCard::new_default();
        assert_eq!(card.transfer_byte(FILL_BYTE), Err(Error::Generic));
    }

    #[test]
    fn test_kind_names() {
        for kind in [
            CardKind::V1,
            CardKind::V2Standard,
            CardKind::V2HighCapacity,
            CardKind::Absent,
        ] {
            assert_eq!(CardKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(CardKind::from_name("mmc"), None);
    }
}
