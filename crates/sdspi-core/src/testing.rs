//! Scripted transport and timer for unit tests

use std::collections::VecDeque;
use std::vec::Vec;

use crate::bus::{BusTransport, ClockDivider, CsLevel};
use crate::consts::FILL_BYTE;
use crate::error::{Error, Result};
use crate::timeout::{ExpiryFlag, TimeoutGuard};

/// Bus that answers transfers from a fixed script
///
/// Once the script is exhausted every transfer reads `0xFF`.
#[derive(Debug, Default)]
pub struct ScriptedBus {
    miso: VecDeque<u8>,
    sent: Vec<u8>,
    cs: CsLevel,
    cs_changes: Vec<CsLevel>,
    clocks: Vec<ClockDivider>,
    enabled: bool,
    fail_after: Option<usize>,
}

impl ScriptedBus {
    pub fn new(miso: &[u8]) -> Self {
        Self {
            miso: miso.iter().copied().collect(),
            ..Default::default()
        }
    }

    /// Fail every transfer after `count` successful ones
    pub fn fail_after(mut self, count: usize) -> Self {
        self.fail_after = Some(count);
        self
    }

    pub fn cs(&self) -> CsLevel {
        self.cs
    }

    pub fn cs_changes(&self) -> &[CsLevel] {
        &self.cs_changes
    }

    pub fn sent(&self) -> &[u8] {
        &self.sent
    }

    pub fn clocks(&self) -> &[ClockDivider] {
        &self.clocks
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn remaining(&self) -> usize {
        self.miso.len()
    }

    fn drive(&mut self, level: CsLevel) {
        self.cs = level;
        self.cs_changes.push(level);
    }
}

impl BusTransport for ScriptedBus {
    fn select(&mut self) -> Result<CsLevel> {
        let prior = self.cs;
        self.drive(CsLevel::Low);
        Ok(prior)
    }

    fn restore(&mut self, level: CsLevel) -> Result<()> {
        self.drive(level);
        Ok(())
    }

    fn transfer_byte(&mut self, byte: u8) -> Result<u8> {
        if let Some(limit) = self.fail_after {
            if self.sent.len() >= limit {
                return Err(Error::Generic);
            }
        }
        self.sent.push(byte);
        Ok(self.miso.pop_front().unwrap_or(FILL_BYTE))
    }

    fn set_clock(&mut self, divider: ClockDivider) -> Result<()> {
        self.clocks.push(divider);
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

/// Timer that expires after a fixed number of `expired()` polls
#[derive(Debug, Default)]
pub struct PollTimer {
    flag: ExpiryFlag,
    budget: Option<usize>,
    polls: core::cell::Cell<usize>,
    pub armed: Vec<u32>,
    pub disarms: usize,
}

impl PollTimer {
    /// Never expires
    pub fn new() -> Self {
        Self::default()
    }

    /// Expires on the `polls`-th call to `expired()` after arming
    pub fn expiring_after(polls: usize) -> Self {
        Self {
            budget: Some(polls),
            ..Default::default()
        }
    }
}

impl TimeoutGuard for PollTimer {
    fn arm(&mut self, deadline_ms: u32) {
        self.flag.clear();
        self.polls.set(0);
        self.armed.push(deadline_ms);
    }

    fn disarm(&mut self) {
        self.disarms += 1;
    }

    fn expired(&self) -> bool {
        let polls = self.polls.get() + 1;
        self.polls.set(polls);
        if self.budget.is_some_and(|budget| polls >= budget) {
            self.flag.signal();
        }
        self.flag.is_set()
    }
}
