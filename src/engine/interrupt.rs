//! Interrupt tracking.
//!
//! Ctrl-C reaches both dcgoss and the docker-compose child it is waiting on.
//! The child dies on its own; dcgoss only counts the signal so the run loop
//! can stop and the shutdown sequence can tell a first interrupt from a
//! second one.

use crate::{DcgossError, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

const SLEEP_SLICE: Duration = Duration::from_millis(50);

/// Shared count of interrupts received
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    count: Arc<AtomicUsize>,
}

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a counter fed by the process Ctrl-C handler
    pub fn install() -> Result<Self> {
        let interrupt = Self::new();
        let handle = interrupt.clone();
        ctrlc::set_handler(move || handle.trigger())
            .map_err(|e| DcgossError::Signal(e.to_string()))?;
        Ok(interrupt)
    }

    pub fn trigger(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    pub fn is_set(&self) -> bool {
        self.count() > 0
    }

    /// Err(Interrupted) once any interrupt has been received
    pub fn check(&self) -> Result<()> {
        if self.is_set() {
            Err(DcgossError::Interrupted)
        } else {
            Ok(())
        }
    }

    /// Sleep for `duration`, waking early if interrupted
    ///
    /// A duration past the clock's range sleeps until interrupted.
    pub fn sleep(&self, duration: Duration) -> Result<()> {
        let deadline = Instant::now().checked_add(duration);
        loop {
            self.check()?;
            let slice = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(());
                    }
                    SLEEP_SLICE.min(deadline - now)
                }
                None => SLEEP_SLICE,
            };
            std::thread::sleep(slice);
        }
    }
}
