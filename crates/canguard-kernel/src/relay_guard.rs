//! [`RelayGuard`] – detects a failed harness relay.
//!
//! When the relay works, the stock ECU that the actuation computer replaces
//! is cut off from the vehicle bus, so its messages can never be seen there.
//! Seeing the variant's sentinel `(address, bus)` therefore means the relay
//! has failed, and the session must stop transmitting for good.
//!
//! Right after a safety-mode change the relay is still switching, so
//! sightings are ignored until more than [`RELAY_TRNS_TIMEOUT`] safety ticks
//! have passed, i.e. from the second tick on.

/// Sightings are trusted once the tick count exceeds this value.
pub const RELAY_TRNS_TIMEOUT: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RelayGuard {
    sentinel: Option<(u32, u8)>,
    mode_ticks: u32,
}

impl RelayGuard {
    /// A guard for a freshly selected mode. Not armed until the transition
    /// timeout elapses.
    pub fn new(sentinel: Option<(u32, u8)>) -> Self {
        Self { sentinel, mode_ticks: 0 }
    }

    /// Skip the transition grace period.
    pub fn arm(&mut self) {
        self.mode_ticks = RELAY_TRNS_TIMEOUT + 1;
    }

    pub fn tick(&mut self) {
        self.mode_ticks = self.mode_ticks.saturating_add(1);
    }

    pub fn is_armed(&self) -> bool {
        self.mode_ticks > RELAY_TRNS_TIMEOUT
    }

    /// `true` when a received frame proves the relay has failed.
    pub fn observe(&self, address: u32, bus: u8) -> bool {
        self.is_armed() && self.sentinel == Some((address, bus))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_ignored_during_transition() {
        let mut guard = RelayGuard::new(Some((384, 0)));
        assert!(!guard.observe(384, 0));
        guard.tick();
        assert!(!guard.observe(384, 0));
        guard.tick();
        assert!(guard.observe(384, 0));
    }

    #[test]
    fn only_the_exact_pair_trips() {
        let mut guard = RelayGuard::new(Some((384, 0)));
        guard.arm();
        assert!(guard.observe(384, 0));
        assert!(!guard.observe(384, 2));
        assert!(!guard.observe(385, 0));
    }

    #[test]
    fn no_sentinel_never_trips() {
        let mut guard = RelayGuard::new(None);
        guard.arm();
        assert!(!guard.observe(384, 0));
    }
}
