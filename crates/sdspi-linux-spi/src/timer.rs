//! Thread-backed countdown
//!
//! A worker thread plays the role of the hardware compare-match interrupt:
//! it sleeps until the armed deadline, signals the shared [`ExpiryFlag`] once
//! and disarms itself. Arming and disarming happen under the same lock the
//! worker holds while signalling, so a countdown that was disarmed can never
//! set the flag of a later arm.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use sdspi_core::timeout::{ExpiryFlag, TimeoutGuard};

use crate::error::{LinuxSpiError, Result};

#[derive(Debug, Default)]
struct Countdown {
    deadline: Option<Instant>,
    shutdown: bool,
}

#[derive(Debug, Default)]
struct Shared {
    countdown: Mutex<Countdown>,
    wake: Condvar,
    flag: ExpiryFlag,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Countdown> {
        self.countdown.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Countdown timer running on a dedicated thread
pub struct ThreadTimer {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl ThreadTimer {
    /// Start the countdown thread
    pub fn start() -> Result<Self> {
        let shared = Arc::new(Shared::default());
        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name("sdspi-timeout".into())
            .spawn(move || run(&worker_shared))
            .map_err(LinuxSpiError::TimerFailed)?;

        Ok(Self {
            shared,
            worker: Some(worker),
        })
    }
}

fn run(shared: &Shared) {
    let mut countdown = shared.lock();
    loop {
        if countdown.shutdown {
            return;
        }
        countdown = match countdown.deadline {
            None => shared
                .wake
                .wait(countdown)
                .unwrap_or_else(PoisonError::into_inner),
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    shared.flag.signal();
                    countdown.deadline = None;
                    continue;
                }
                shared
                    .wake
                    .wait_timeout(countdown, deadline - now)
                    .unwrap_or_else(PoisonError::into_inner)
                    .0
            }
        };
    }
}

impl TimeoutGuard for ThreadTimer {
    fn arm(&mut self, deadline_ms: u32) {
        let mut countdown = self.shared.lock();
        self.shared.flag.clear();
        countdown.deadline = Some(Instant::now() + Duration::from_millis(u64::from(deadline_ms)));
        self.shared.wake.notify_one();
    }

    fn disarm(&mut self) {
        self.shared.lock().deadline = None;
        self.shared.wake.notify_one();
    }

    fn expired(&self) -> bool {
        self.shared.flag.is_set()
    }
}

impl Drop for ThreadTimer {
    fn drop(&mut self) {
        self.shared.lock().shutdown = true;
        self.shared.wake.notify_one();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::warn!("linux_spi: timeout thread panicked");
            }
        }
    }
}
