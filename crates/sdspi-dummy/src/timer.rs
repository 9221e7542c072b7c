//! Deterministic countdown
//!
//! Stands in for a hardware timer: the deadline is converted into a number
//! of `expired()` polls, and the simulated compare-match handler runs when
//! the count reaches zero.

use core::cell::Cell;

use sdspi_core::timeout::{ExpiryFlag, TimeoutGuard};

/// Polls per millisecond used by [`SimTimer::new`]
pub const DEFAULT_POLLS_PER_MS: u32 = 10;

/// Countdown driven by polling instead of wall-clock time
#[derive(Debug)]
pub struct SimTimer {
    flag: ExpiryFlag,
    polls_per_ms: u32,
    remaining: Cell<Option<u64>>,
    arms: u32,
    last_deadline_ms: Option<u32>,
}

impl Default for SimTimer {
    fn default() -> Self {
        Self::with_polls_per_ms(DEFAULT_POLLS_PER_MS)
    }
}

impl SimTimer {
    /// Create a countdown using [`DEFAULT_POLLS_PER_MS`]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a countdown where one millisecond lasts `polls_per_ms` polls
    pub fn with_polls_per_ms(polls_per_ms: u32) -> Self {
        Self {
            flag: ExpiryFlag::new(),
            polls_per_ms,
            remaining: Cell::new(None),
            arms: 0,
            last_deadline_ms: None,
        }
    }

    /// Number of times the countdown was armed
    pub fn arms(&self) -> u32 {
        self.arms
    }

    /// Deadline of the most recent arm
    pub fn last_deadline_ms(&self) -> Option<u32> {
        self.last_deadline_ms
    }

    /// Returns true while a countdown is pending
    pub fn is_armed(&self) -> bool {
        self.remaining.get().is_some()
    }

    fn tick(&self) {
        match self.remaining.get() {
            Some(0) => {
                // Compare match: signal once, then disarm
                self.flag.signal();
                self.remaining.set(None);
            }
            Some(n) => self.remaining.set(Some(n - 1)),
            None => {}
        }
    }
}

impl TimeoutGuard for SimTimer {
    fn arm(&mut self, deadline_ms: u32) {
        self.flag.clear();
        self.remaining
            .set(Some(u64::from(deadline_ms) * u64::from(self.polls_per_ms)));
        self.arms += 1;
        self.last_deadline_ms = Some(deadline_ms);
    }

    fn disarm(&mut self) {
        self.remaining.set(None);
    }

    fn expired(&self) -> bool {
        self.tick();
        self.flag.is_set()
    }
}
