//! Vehicle-independent modes.
//!
//! `Silent` and `NoOutput` need no state of their own and are handled
//! directly in [`SafetyHooks`](super::SafetyHooks). `AllOutput` admits every
//! transmit and can optionally bridge buses 0 and 2; it exists for bench
//! work and loopback testing, never for driving.

use crate::forwarding::ForwardingPolicy;

use super::{MessagePolicy, SafetyCore};

/// `AllOutput` param bit enabling 0↔2 passthrough.
pub const ALL_OUTPUT_PARAM_PASSTHROUGH: u16 = 1;

const PASSTHROUGH: MessagePolicy = MessagePolicy {
    forwarding: ForwardingPolicy {
        bus_lookup: &[(0, 2), (2, 0)],
        blacklist: &[],
    },
    ..MessagePolicy::CLOSED
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AllOutputHooks {
    passthrough: bool,
}

impl AllOutputHooks {
    pub fn from_param(param: u16) -> Self {
        Self {
            passthrough: param & ALL_OUTPUT_PARAM_PASSTHROUGH != 0,
        }
    }

    pub fn passthrough(&self) -> bool {
        self.passthrough
    }

    pub fn policy(&self) -> &'static MessagePolicy {
        if self.passthrough { &PASSTHROUGH } else { &MessagePolicy::CLOSED }
    }

    /// Controls start allowed in this mode.
    pub fn init(&self, core: &mut SafetyCore) {
        core.state.set_controls_allowed(true);
    }
}

#[cfg(test)]
mod tests {
    use canguard_types::ForwardDecision;

    use super::*;

    #[test]
    fn passthrough_bridges_zero_and_two() {
        let hooks = AllOutputHooks::from_param(ALL_OUTPUT_PARAM_PASSTHROUGH);
        assert!(hooks.passthrough());
        let fwd = &hooks.policy().forwarding;
        assert_eq!(fwd.should_forward(0x123, 0), ForwardDecision::Forward(2));
        assert_eq!(fwd.should_forward(0x123, 2), ForwardDecision::Forward(0));
        assert_eq!(fwd.should_forward(0x123, 1), ForwardDecision::Drop);
    }

    #[test]
    fn no_passthrough_by_default() {
        let hooks = AllOutputHooks::from_param(0);
        assert_eq!(hooks.policy().forwarding.should_forward(0x123, 0), ForwardDecision::Drop);
    }

    #[test]
    fn init_allows_controls() {
        let mut core = SafetyCore::default();
        AllOutputHooks::default().init(&mut core);
        assert!(core.state.controls_allowed());
    }
}
