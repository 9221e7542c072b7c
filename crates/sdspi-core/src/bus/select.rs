//! Scoped chip-select acquisition

use core::ops::{Deref, DerefMut};

use super::{BusTransport, CsLevel};
use crate::error::Result;

/// Chip-select held for the lifetime of the guard
///
/// Acquiring asserts the line and remembers the previous level. Dropping the
/// guard, or calling [`ChipSelect::release`], drives the line back to that
/// level. Guards nest: an inner guard acquired while an outer one is alive
/// observes `Low` and restores `Low`.
///
/// The guard dereferences to the transport, so bytes are exchanged through
/// it while the card is selected.
pub struct ChipSelect<'a, B: BusTransport + ?Sized> {
    bus: &'a mut B,
    prior: CsLevel,
    restored: bool,
}

impl<'a, B: BusTransport + ?Sized> ChipSelect<'a, B> {
    /// Assert chip-select on `bus`
    pub fn acquire(bus: &'a mut B) -> Result<Self> {
        let prior = bus.select()?;
        Ok(Self {
            bus,
            prior,
            restored: false,
        })
    }

    /// Level the line had before this guard asserted it
    pub fn prior(&self) -> CsLevel {
        self.prior
    }

    /// Restore the prior level, reporting a transport failure
    pub fn release(mut self) -> Result<()> {
        self.restored = true;
        self.bus.restore(self.prior)
    }
}

impl<B: BusTransport + ?Sized> Deref for ChipSelect<'_, B> {
    type Target = B;

    fn deref(&self) -> &B {
        self.bus
    }
}

impl<B: BusTransport + ?Sized> DerefMut for ChipSelect<'_, B> {
    fn deref_mut(&mut self) -> &mut B {
        self.bus
    }
}

impl<B: BusTransport + ?Sized> Drop for ChipSelect<'_, B> {
    fn drop(&mut self) {
        if self.restored {
            return;
        }
        if let Err(e) = self.bus.restore(self.prior) {
            log::warn!("sdspi: failed to restore chip-select to {:?}: {}", self.prior, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedBus;

    #[test]
    fn test_guard_restores_released_level() {
        let mut bus = ScriptedBus::new(&[]);
        {
            let guard = ChipSelect::acquire(&mut bus).unwrap();
            assert_eq!(guard.prior(), CsLevel::High);
            assert_eq!(guard.cs(), CsLevel::Low);
        }
        assert_eq!(bus.cs(), CsLevel::High);
    }

    #[test]
    fn test_nested_guard_keeps_line_asserted() {
        let mut bus = ScriptedBus::new(&[]);
        let mut outer = ChipSelect::acquire(&mut bus).unwrap();
        {
            let inner = ChipSelect::acquire(&mut *outer).unwrap();
            assert_eq!(inner.prior(), CsLevel::Low);
        }
        assert_eq!(outer.cs(), CsLevel::Low);
        outer.release().unwrap();
        assert_eq!(bus.cs(), CsLevel::High);
    }

    #[test]
    fn test_release_restores_once() {
        let mut bus = ScriptedBus::new(&[]);
        let guard = ChipSelect::acquire(&mut bus).unwrap();
        guard.release().unwrap();
        // acquire + release; the drop after release must not restore again
        assert_eq!(bus.cs_changes(), &[CsLevel::Low, CsLevel::High]);
    }
}
