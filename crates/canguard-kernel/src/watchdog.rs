//! [`RxWatchdog`] – liveness and shape checks for required messages.
//!
//! Each vehicle variant lists the periodic messages it relies on
//! ([`RxCheck`]). Every received frame matching a check's address and bus
//! refreshes that check's timestamp; a matching frame with the wrong length
//! is malformed and must not update any state.
//!
//! [`RxWatchdog::tick`] is called from the ~1 Hz safety tick and reports
//! whether any check is lagging, i.e. silent for longer than
//! `max(expected_timestep * MAX_MISSED_MSGS, 1 s)`.

use canguard_types::{CanFrame, ts_elapsed};

/// Missed periods tolerated before a message counts as lagging.
pub const MAX_MISSED_MSGS: u32 = 10;

/// Lower bound on the lag threshold.
pub const MIN_LAG_US: u32 = 1_000_000;

/// Checks tracked per variant.
pub const MAX_RX_CHECKS: usize = 8;

/// A periodic message a variant requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RxCheck {
    pub address: u32,
    pub bus: u8,
    pub len: usize,
    pub expected_timestep_us: u32,
}

impl RxCheck {
    fn lag_threshold(&self) -> u32 {
        self.expected_timestep_us
            .saturating_mul(MAX_MISSED_MSGS)
            .max(MIN_LAG_US)
    }
}

#[derive(Debug, Clone, Copy)]
struct CheckEntry {
    check: RxCheck,
    last_timestamp: u32,
    lagging: bool,
}

/// Tracks the [`RxCheck`]s of the active variant.
#[derive(Debug, Clone, Copy, Default)]
pub struct RxWatchdog {
    entries: [Option<CheckEntry>; MAX_RX_CHECKS],
}

impl RxWatchdog {
    /// Start tracking `checks` (at most [`MAX_RX_CHECKS`]), treating each as
    /// last seen at `now_us`.
    pub fn new(checks: &[RxCheck], now_us: u32) -> Self {
        let mut entries = [None; MAX_RX_CHECKS];
        for (slot, check) in entries.iter_mut().zip(checks) {
            *slot = Some(CheckEntry {
                check: *check,
                last_timestamp: now_us,
                lagging: false,
            });
        }
        Self { entries }
    }

    /// Validate `frame` against the checks. Returns `false` for a checked
    /// message with an unexpected length; otherwise refreshes the matching
    /// check, if any, and returns `true`.
    pub fn validate(&mut self, frame: &CanFrame, now_us: u32) -> bool {
        let matching = self
            .entries
            .iter_mut()
            .flatten()
            .find(|e| e.check.address == frame.address() && e.check.bus == frame.bus());
        match matching {
            Some(entry) if entry.check.len != frame.len() => false,
            Some(entry) => {
                entry.last_timestamp = now_us;
                entry.lagging = false;
                true
            }
            None => true,
        }
    }

    /// Re-evaluate every check. Returns `true` if any is lagging.
    pub fn tick(&mut self, now_us: u32) -> bool {
        let mut any = false;
        for entry in self.entries.iter_mut().flatten() {
            entry.lagging = ts_elapsed(now_us, entry.last_timestamp) > entry.check.lag_threshold();
            any |= entry.lagging;
        }
        any
    }

    pub fn is_lagging(&self) -> bool {
        self.entries.iter().flatten().any(|e| e.lagging)
    }

    /// Addresses of lagging checks.
    pub fn lagging_addresses(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries
            .iter()
            .flatten()
            .filter(|e| e.lagging)
            .map(|e| e.check.address)
    }
}
