//! [`ForwardingPolicy`] – static cross-bus replication table.
//!
//! An intercepting integration sits between two buses and must pass
//! everything through except the messages it replaces. The table maps a
//! source bus to its target bus, plus a per-source-bus list of addresses
//! that are never replicated. A bus without a lookup entry forwards nothing.

use canguard_types::ForwardDecision;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForwardingPolicy {
    /// `(source_bus, target_bus)` pairs.
    pub bus_lookup: &'static [(u8, u8)],
    /// `(source_bus, addresses)` pairs: addresses received on `source_bus`
    /// that must not cross.
    pub blacklist: &'static [(u8, &'static [u32])],
}

impl ForwardingPolicy {
    /// No forwarding at all.
    pub const NONE: Self = Self {
        bus_lookup: &[],
        blacklist: &[],
    };

    pub fn should_forward(&self, address: u32, source_bus: u8) -> ForwardDecision {
        let Some(&(_, target)) = self.bus_lookup.iter().find(|(src, _)| *src == source_bus) else {
            return ForwardDecision::Drop;
        };
        let blocked = self
            .blacklist
            .iter()
            .any(|(src, addrs)| *src == source_bus && addrs.contains(&address));
        if blocked {
            ForwardDecision::Drop
        } else {
            ForwardDecision::Forward(target)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERCEPT: ForwardingPolicy = ForwardingPolicy {
        bus_lookup: &[(0, 2), (2, 0)],
        blacklist: &[(2, &[384]), (0, &[388])],
    };

    #[test]
    fn unmapped_bus_drops() {
        assert_eq!(INTERCEPT.should_forward(100, 1), ForwardDecision::Drop);
        assert_eq!(ForwardingPolicy::NONE.should_forward(100, 0), ForwardDecision::Drop);
    }

    #[test]
    fn blacklisted_source_addresses_drop() {
        assert_eq!(INTERCEPT.should_forward(384, 2), ForwardDecision::Drop);
        assert_eq!(INTERCEPT.should_forward(388, 0), ForwardDecision::Drop);
    }

    #[test]
    fn everything_else_crosses() {
        assert_eq!(INTERCEPT.should_forward(384, 0), ForwardDecision::Forward(2));
        assert_eq!(INTERCEPT.should_forward(388, 2), ForwardDecision::Forward(0));
        assert_eq!(INTERCEPT.should_forward(452, 0), ForwardDecision::Forward(2));
    }
}
