//! Vehicle hooks – the per-variant half of the engine.
//!
//! A hook supplies *what* is on the bus (message layouts, limits, the static
//! [`MessagePolicy`]) and decodes signals into the generic inputs of
//! [`SafetyCore`]. The mechanics (engagement edges, rate limiting, relay
//! detection, forwarding) are shared and live in the sibling modules.
//!
//! Variants form a closed set, so dispatch is a plain `match` over
//! [`SafetyHooks`] rather than a trait object.

pub mod basic;
pub mod gm;

use canguard_types::{CanFrame, ForwardDecision, SafetyMode, SignalCodec};

use crate::forwarding::ForwardingPolicy;
use crate::limiter::TorqueHistory;
use crate::pedal_monitor::PedalState;
use crate::safety_state::SafetyState;
use crate::watchdog::RxCheck;

pub use basic::AllOutputHooks;
pub use gm::{GmHooks, GmVariant};

/// One entry of a transmit table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxMsg {
    pub address: u32,
    pub bus: u8,
    pub len: usize,
}

impl TxMsg {
    pub const fn new(address: u32, bus: u8, len: usize) -> Self {
        Self { address, bus, len }
    }
}

/// Static per-variant message policy, fixed at hook selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessagePolicy {
    pub tx_msgs: &'static [TxMsg],
    pub forwarding: ForwardingPolicy,
    /// `(address, bus)` whose sighting on rx proves a failed relay.
    pub relay_malfunction: Option<(u32, u8)>,
    pub rx_checks: &'static [RxCheck],
}

impl MessagePolicy {
    /// Nothing transmitted, nothing forwarded, nothing checked.
    pub const CLOSED: Self = Self {
        tx_msgs: &[],
        forwarding: ForwardingPolicy::NONE,
        relay_malfunction: None,
        rx_checks: &[],
    };

    /// `true` when `frame` matches a transmit-table entry in address, bus
    /// and length.
    pub fn tx_listed(&self, frame: &CanFrame) -> bool {
        self.tx_msgs
            .iter()
            .any(|m| m.address == frame.address() && m.bus == frame.bus() && m.len == frame.len())
    }
}

/// Mutable state the hooks act on.
#[derive(Debug, Clone, Default)]
pub struct SafetyCore {
    pub state: SafetyState,
    pub pedals: PedalState,
    pub torque: TorqueHistory,
}

impl SafetyCore {
    /// Power-on defaults for every field.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// The active vehicle hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SafetyHooks {
    #[default]
    Silent,
    NoOutput,
    AllOutput(AllOutputHooks),
    Gm(GmHooks),
}

impl SafetyHooks {
    /// Hook for `mode`, with `param` selecting the integration sub-mode.
    pub fn select(mode: SafetyMode, param: u16) -> Self {
        match mode {
            SafetyMode::Silent => SafetyHooks::Silent,
            SafetyMode::NoOutput => SafetyHooks::NoOutput,
            SafetyMode::AllOutput => SafetyHooks::AllOutput(AllOutputHooks::from_param(param)),
            SafetyMode::Gm => SafetyHooks::Gm(GmHooks::from_param(param)),
        }
    }

    pub fn mode(&self) -> SafetyMode {
        match self {
            SafetyHooks::Silent => SafetyMode::Silent,
            SafetyHooks::NoOutput => SafetyMode::NoOutput,
            SafetyHooks::AllOutput(_) => SafetyMode::AllOutput,
            SafetyHooks::Gm(_) => SafetyMode::Gm,
        }
    }

    pub fn policy(&self) -> &'static MessagePolicy {
        match self {
            SafetyHooks::Silent | SafetyHooks::NoOutput => &MessagePolicy::CLOSED,
            SafetyHooks::AllOutput(hooks) => hooks.policy(),
            SafetyHooks::Gm(hooks) => hooks.policy(),
        }
    }

    /// Variant-specific initial state, applied after a full reset when the
    /// hook is selected.
    pub fn init(&self, core: &mut SafetyCore) {
        if let SafetyHooks::AllOutput(hooks) = self {
            hooks.init(core);
        }
    }

    /// Decode a received, already validated frame into `core`.
    pub fn rx<C: SignalCodec>(&self, codec: &C, frame: &CanFrame, core: &mut SafetyCore) {
        if let SafetyHooks::Gm(hooks) = self {
            hooks.rx(codec, frame, core);
        }
    }

    /// Transmit admission, relay fault excluded.
    pub fn tx<C: SignalCodec>(&self, codec: &C, frame: &CanFrame, core: &mut SafetyCore, now_us: u32) -> bool {
        match self {
            SafetyHooks::Silent | SafetyHooks::NoOutput => false,
            SafetyHooks::AllOutput(_) => true,
            SafetyHooks::Gm(hooks) => hooks.policy().tx_listed(frame) && hooks.tx(codec, frame, core, now_us),
        }
    }

    pub fn fwd(&self, address: u32, source_bus: u8) -> ForwardDecision {
        self.policy().forwarding.should_forward(address, source_bus)
    }
}
