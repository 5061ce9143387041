//! [`SafetyState`] – the engagement state machine.
//!
//! `controls_allowed` is not stored: it is derived from [`Engagement`], so
//! the only way to permit actuation is to be in [`Engagement::Enabled`], and
//! a relay fault ([`Engagement::Faulted`]) is absorbing until the session is
//! reset.
//!
//! ```text
//!            edge condition                 relay fault
//! Disabled ─────────────────▶ Enabled ───────────────────▶ Faulted
//!    ▲                          │                            │
//!    └──────────────────────────┘                            │
//!     cancel / pedal override / rx lag      reset only ◀─────┘
//! ```

use canguard_types::{AlternativeExperience, BUS_COUNT};
use tracing::{debug, warn};

/// Engagement state of the active session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Engagement {
    #[default]
    Disabled,
    Enabled,
    /// Relay malfunction detected. Nothing may be transmitted or forwarded.
    Faulted,
}

/// Session-wide safety state.
#[derive(Debug, Clone, Default)]
pub struct SafetyState {
    engagement: Engagement,
    alternative_experience: AlternativeExperience,
    last_rx_us: [Option<u32>; BUS_COUNT],
}

impl SafetyState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn engagement(&self) -> Engagement {
        self.engagement
    }

    pub fn controls_allowed(&self) -> bool {
        self.engagement == Engagement::Enabled
    }

    pub fn relay_malfunction(&self) -> bool {
        self.engagement == Engagement::Faulted
    }

    /// Force the engagement flag. Intended for harnesses simulating upstream
    /// engagement; ignored while faulted.
    pub fn set_controls_allowed(&mut self, allowed: bool) {
        if allowed {
            self.engage("manual");
        } else {
            self.disengage("manual");
        }
    }

    pub(crate) fn engage(&mut self, cause: &'static str) {
        if self.engagement == Engagement::Disabled {
            debug!(cause, "controls allowed");
            self.engagement = Engagement::Enabled;
        }
    }

    pub(crate) fn disengage(&mut self, cause: &'static str) {
        if self.engagement == Engagement::Enabled {
            debug!(cause, "controls disallowed");
            self.engagement = Engagement::Disabled;
        }
    }

    pub(crate) fn fault(&mut self) {
        if self.engagement != Engagement::Faulted {
            warn!("relay malfunction: all transmits blocked until reset");
            self.engagement = Engagement::Faulted;
        }
    }

    pub fn alternative_experience(&self) -> AlternativeExperience {
        self.alternative_experience
    }

    /// Unknown bits are dropped.
    pub fn set_alternative_experience(&mut self, bits: u32) {
        self.alternative_experience = AlternativeExperience::from_bits_truncate(bits);
    }

    pub(crate) fn record_rx(&mut self, bus: u8, now_us: u32) {
        if let Some(slot) = self.last_rx_us.get_mut(usize::from(bus)) {
            *slot = Some(now_us);
        }
    }

    /// Timestamp of the last frame received on `bus`.
    pub fn last_rx_us(&self, bus: u8) -> Option<u32> {
        self.last_rx_us.get(usize::from(bus)).copied().flatten()
    }

    /// Back to power-on defaults, alternative experience included.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
