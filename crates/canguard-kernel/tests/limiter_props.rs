use proptest::prelude::*;

use canguard_kernel::hooks::gm::GM_TORQUE_LIMITS;
use canguard_kernel::{ForwardingPolicy, TorqueHistory};
use canguard_types::ForwardDecision;

const CAMERA_FWD: ForwardingPolicy = ForwardingPolicy {
    bus_lookup: &[(0, 2), (2, 0)],
    blacklist: &[(2, &[384]), (0, &[388])],
};

proptest! {
    #[test]
    fn admitted_steering_respects_bound_and_rate(
        cmds in prop::collection::vec(-400i32..=400, 1..200),
        steps in prop::collection::vec(0u32..100_000, 1..200),
    ) {
        let mut history = TorqueHistory::default();
        let mut now = 0u32;
        for (i, &cmd) in cmds.iter().enumerate() {
            now = now.wrapping_add(steps[i % steps.len()]);
            let prev = history.desired_torque_last();
            if history.check_steer(cmd, true, now, &GM_TORQUE_LIMITS) {
                prop_assert!(cmd.abs() <= GM_TORQUE_LIMITS.max_torque);
                prop_assert!(cmd <= prev.max(0) + GM_TORQUE_LIMITS.max_rate_up);
                prop_assert!(cmd >= prev.min(0) - GM_TORQUE_LIMITS.max_rate_up);
                prop_assert_eq!(history.desired_torque_last(), cmd);
            } else {
                // A denied candidate never becomes the reference.
                prop_assert_eq!(history.desired_torque_last(), 0);
            }
        }
    }

    #[test]
    fn disallowed_steering_only_admits_zero(cmd in -400i32..=400, seed in -300i32..=300) {
        let mut history = TorqueHistory::default();
        history.set_reference(seed);
        let admitted = history.check_steer(cmd, false, 0, &GM_TORQUE_LIMITS);
        prop_assert_eq!(admitted, cmd == 0);
        prop_assert_eq!(history.desired_torque_last(), 0);
    }

    #[test]
    fn forwarding_is_pure_and_never_loops_back(address in 0u32..0x2000_0000, bus in 0u8..4) {
        let first = CAMERA_FWD.should_forward(address, bus);
        prop_assert_eq!(first, CAMERA_FWD.should_forward(address, bus));
        match first {
            ForwardDecision::Forward(target) => {
                prop_assert_ne!(target, bus);
                prop_assert!(!(bus == 2 && address == 384));
                prop_assert!(!(bus == 0 && address == 388));
            }
            ForwardDecision::Drop => {
                prop_assert!(bus == 1 || bus == 3 || address == 384 || address == 388);
            }
        }
    }
}
