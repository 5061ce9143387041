//! [`MicrosecondTimer`] implementations.
//!
//! - [`MonotonicTimer`] reads the host's monotonic clock; the CLI soak runs
//!   its engines on it.
//! - [`SimTimer`] is advanced by hand so tests can step through real-time
//!   intervals and RX-check timeouts deterministically.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

use canguard_types::MicrosecondTimer;

/// Microseconds since construction, wrapping at `u32::MAX` like a hardware
/// free-running counter.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicTimer {
    origin: Instant,
}

impl MonotonicTimer {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for MonotonicTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl MicrosecondTimer for MonotonicTimer {
    fn now_us(&self) -> u32 {
        // Truncation is the wrap.
        self.origin.elapsed().as_micros() as u32
    }
}

/// Hand-driven timer. Clones share the same counter, so a test can keep one
/// handle while the engine owns another.
///
/// # Example
///
/// ```
/// use canguard_hal::timer::SimTimer;
/// use canguard_types::MicrosecondTimer;
///
/// let timer = SimTimer::new();
/// let handle = timer.clone();
/// handle.advance(250_000);
/// assert_eq!(timer.now_us(), 250_000);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SimTimer {
    now: Rc<Cell<u32>>,
}

impl SimTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, us: u32) {
        self.now.set(us);
    }

    pub fn advance(&self, us: u32) {
        self.now.set(self.now.get().wrapping_add(us));
    }
}

impl MicrosecondTimer for SimTimer {
    fn now_us(&self) -> u32 {
        self.now.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sim_timer_wraps() {
        let timer = SimTimer::new();
        timer.set(u32::MAX);
        timer.advance(2);
        assert_eq!(timer.now_us(), 1);
    }

    #[test]
    fn monotonic_timer_moves_forward() {
        let timer = MonotonicTimer::new();
        let first = timer.now_us();
        std::thread::sleep(std::time::Duration::from_millis(2));
        assert!(timer.now_us() > first);
    }
}
