//! Timeout guard for bounded waits
//!
//! The driver never waits on the card without a bound. Byte-count ceilings
//! cover status polling; the negotiation loop and the wait for a data start
//! token are bounded by a countdown armed through [`TimeoutGuard`].
//!
//! ## Expiry rendezvous
//!
//! The countdown fires asynchronously (a timer interrupt on a
//! microcontroller, a thread on a hosted platform). The only state it shares
//! with the foreground wait loop is an [`ExpiryFlag`]:
//!
//! - the expiry handler is the only writer of `true` ([`ExpiryFlag::signal`]),
//! - arming is the only place the flag is cleared ([`ExpiryFlag::clear`]),
//! - the wait loop only reads it ([`ExpiryFlag::is_set`]).
//!
//! Arming clears the flag before the countdown starts, so a wait never
//! observes an expiry left over from an earlier arm.

use core::sync::atomic::{AtomicBool, Ordering};

/// Single-writer/single-reader expiry flag
///
/// Can be placed in a `static` so an interrupt handler can reach it:
///
/// ```ignore
/// static SD_TIMEOUT: ExpiryFlag = ExpiryFlag::new();
///
/// #[interrupt]
/// fn TIMER1_COMPA() {
///     SD_TIMEOUT.signal();
///     disable_compare_interrupt();
/// }
/// ```
#[derive(Debug, Default)]
pub struct ExpiryFlag {
    expired: AtomicBool,
}

impl ExpiryFlag {
    /// Create a cleared flag
    pub const fn new() -> Self {
        Self {
            expired: AtomicBool::new(false),
        }
    }

    /// Clear the flag; called by the arm operation only
    pub fn clear(&self) {
        self.expired.store(false, Ordering::Release);
    }

    /// Mark the deadline as passed; called by the expiry handler only
    pub fn signal(&self) {
        self.expired.store(true, Ordering::Release);
    }

    /// Returns true once the expiry handler has fired
    pub fn is_set(&self) -> bool {
        self.expired.load(Ordering::Acquire)
    }
}

/// Countdown used to abort unbounded waits
///
/// Implementations must be wired to a real asynchronous countdown: `arm`
/// clears the expiry flag and starts counting, the countdown's handler sets
/// the flag at most once per arm and disarms itself, and `disarm` stops a
/// pending countdown.
pub trait TimeoutGuard {
    /// Start a countdown of `deadline_ms` milliseconds
    fn arm(&mut self, deadline_ms: u32);

    /// Stop the countdown if it has not fired yet
    fn disarm(&mut self);

    /// Returns true once the armed deadline has passed
    fn expired(&self) -> bool;
}

#[cfg(feature = "alloc")]
impl TimeoutGuard for alloc::boxed::Box<dyn TimeoutGuard + Send> {
    fn arm(&mut self, deadline_ms: u32) {
        (**self).arm(deadline_ms)
    }

    fn disarm(&mut self) {
        (**self).disarm()
    }

    fn expired(&self) -> bool {
        (**self).expired()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_starts_cleared() {
        static FLAG: ExpiryFlag = ExpiryFlag::new();
        assert!(!FLAG.is_set());
    }

    #[test]
    fn test_signal_then_clear() {
        let flag = ExpiryFlag::new();
        flag.signal();
        assert!(flag.is_set());
        flag.clear();
        assert!(!flag.is_set());
    }
}
