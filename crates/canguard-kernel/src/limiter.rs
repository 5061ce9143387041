//! Rate and bound limits for actuation commands.
//!
//! Steering torque goes through three independent checks, any one of which
//! denies the command:
//!
//! 1. **Bound** – `|torque| <= max_torque`.
//! 2. **Per-cycle rate** – magnitude may grow by at most `max_rate_up` from
//!    the last *allowed* command. When the driver pushes against the command
//!    beyond `driver_torque_allowance`, the permitted magnitude shrinks and
//!    the command must wind down by at least `max_rate_down` per cycle.
//!    Moving towards zero is never limited.
//! 3. **Real-time delta** – the command may not drift more than
//!    `max_rt_delta` from a checkpoint refreshed every `rt_interval_us`. This
//!    caps the cumulative change of many individually legal small steps.
//!
//! [`TorqueHistory`] owns the reference values. Only allowed commands ever
//! become the reference; any denial resets the history to zero.
//!
//! Longitudinal channels (brake, gas/regen) use [`longitudinal_check`]: a
//! value window while allowed, a single inactive value otherwise.

use std::ops::RangeInclusive;

use canguard_types::ts_elapsed;

/// Number of driver-torque samples kept for the min/max window.
pub const MAX_SAMPLE_VALS: usize = 6;

/// Steering torque limits for one vehicle family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TorqueLimits {
    pub max_torque: i32,
    pub max_rate_up: i32,
    pub max_rate_down: i32,
    pub max_rt_delta: i32,
    pub rt_interval_us: u32,
    pub driver_torque_allowance: i32,
    pub driver_torque_factor: i32,
}

/// Rolling window of the most recent samples with cached extremes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SampleWindow {
    values: [i32; MAX_SAMPLE_VALS],
    min: i32,
    max: i32,
}

impl SampleWindow {
    pub fn update(&mut self, sample: i32) {
        self.values.copy_within(..MAX_SAMPLE_VALS - 1, 1);
        self.values[0] = sample;
        self.min = self.values.iter().copied().min().unwrap_or(sample);
        self.max = self.values.iter().copied().max().unwrap_or(sample);
    }

    /// Overwrite the cached extremes directly.
    pub fn set_extremes(&mut self, min: i32, max: i32) {
        self.min = min;
        self.max = max;
    }

    pub fn min(&self) -> i32 {
        self.min
    }

    pub fn max(&self) -> i32 {
        self.max
    }
}

/// `true` when `val` lies outside `[min, max]`.
pub fn max_limit_violation(val: i32, max: i32, min: i32) -> bool {
    val > max || val < min
}

/// `true` when `val` breaks the per-cycle rate limit relative to `last`,
/// taking the driver's opposing torque into account.
pub fn driver_limit_violation(val: i32, last: i32, driver: &SampleWindow, limits: &TorqueLimits) -> bool {
    // Saturating: `last` and the driver extremes can be seeded by harnesses.
    let highest_rate_limited = last.max(0).saturating_add(limits.max_rate_up);
    let lowest_rate_limited = last.min(0).saturating_sub(limits.max_rate_up);

    let driver_max_limit = limits.max_torque.saturating_add(
        limits
            .driver_torque_allowance
            .saturating_add(driver.max())
            .saturating_mul(limits.driver_torque_factor),
    );
    let driver_min_limit = limits.max_torque.saturating_neg().saturating_add(
        driver
            .min()
            .saturating_sub(limits.driver_torque_allowance)
            .saturating_mul(limits.driver_torque_factor),
    );

    // Past the driver-adjusted limit the command must head back to zero.
    let highest_allowed =
        highest_rate_limited.min(last.saturating_sub(limits.max_rate_down).max(driver_max_limit.max(0)));
    let lowest_allowed =
        lowest_rate_limited.max(last.saturating_add(limits.max_rate_down).min(driver_min_limit.min(0)));

    val < lowest_allowed || val > highest_allowed
}

/// `true` when `val` has drifted further than `max_rt_delta` from the
/// real-time checkpoint.
pub fn rt_rate_violation(val: i32, checkpoint: i32, max_rt_delta: i32) -> bool {
    let highest = checkpoint.max(0).saturating_add(max_rt_delta);
    let lowest = checkpoint.min(0).saturating_sub(max_rt_delta);
    val < lowest || val > highest
}

/// Bound, per-cycle rate and real-time checks combined. Returns `true` when
/// `new` passes all three.
pub fn check_rate_and_bound(
    new: i32,
    prev_allowed: i32,
    rt_checkpoint: i32,
    driver: &SampleWindow,
    limits: &TorqueLimits,
) -> bool {
    let bound = max_limit_violation(new, limits.max_torque, -limits.max_torque);
    let rate = driver_limit_violation(new, prev_allowed, driver, limits);
    let realtime = rt_rate_violation(new, rt_checkpoint, limits.max_rt_delta);
    !(bound || rate || realtime)
}

/// History for the steering channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TorqueHistory {
    desired_torque_last: i32,
    rt_torque_last: i32,
    ts_last: u32,
    driver_torque: SampleWindow,
}

impl TorqueHistory {
    /// Admit or deny a steering command.
    ///
    /// With `controls_allowed == false` only a zero command passes. A passing
    /// command becomes the new reference; every denial (and every
    /// disallowed cycle) resets the reference and the real-time checkpoint
    /// to zero.
    pub fn check_steer(&mut self, desired: i32, controls_allowed: bool, now_us: u32, limits: &TorqueLimits) -> bool {
        let violation = if controls_allowed {
            !check_rate_and_bound(
                desired,
                self.desired_torque_last,
                self.rt_torque_last,
                &self.driver_torque,
                limits,
            )
        } else {
            desired != 0
        };

        if violation || !controls_allowed {
            self.desired_torque_last = 0;
            self.rt_torque_last = 0;
            self.ts_last = now_us;
            return !violation;
        }

        self.desired_torque_last = desired;
        if ts_elapsed(now_us, self.ts_last) > limits.rt_interval_us {
            self.rt_torque_last = desired;
            self.ts_last = now_us;
        }
        true
    }

    pub fn update_driver_torque(&mut self, sample: i32) {
        self.driver_torque.update(sample);
    }

    pub fn driver_torque(&self) -> &SampleWindow {
        &self.driver_torque
    }

    pub fn set_driver_torque(&mut self, min: i32, max: i32) {
        self.driver_torque.set_extremes(min, max);
    }

    pub fn desired_torque_last(&self) -> i32 {
        self.desired_torque_last
    }

    /// Seed both the per-cycle reference and the real-time checkpoint.
    pub fn set_reference(&mut self, torque: i32) {
        self.desired_torque_last = torque;
        self.rt_torque_last = torque;
    }
}

/// Admission for a longitudinal command: inside `active` while allowed,
/// exactly `inactive` otherwise.
pub fn longitudinal_check(value: i64, allowed: bool, active: RangeInclusive<i64>, inactive: i64) -> bool {
    if allowed { active.contains(&value) } else { value == inactive }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMITS: TorqueLimits = TorqueLimits {
        max_torque: 300,
        max_rate_up: 7,
        max_rate_down: 17,
        max_rt_delta: 128,
        rt_interval_us: 250_000,
        driver_torque_allowance: 50,
        driver_torque_factor: 4,
    };

    fn quiet_driver() -> SampleWindow {
        SampleWindow::default()
    }

    #[test]
    fn sample_window_tracks_last_six() {
        let mut window = SampleWindow::default();
        for v in [5, -3, 9, 0, 0, 0] {
            window.update(v);
        }
        assert_eq!((window.min(), window.max()), (-3, 9));
        // Push 5 and -3 out of the window.
        window.update(1);
        window.update(1);
        window.update(1);
        assert_eq!((window.min(), window.max()), (0, 1));
    }

    #[test]
    fn rate_up_is_limited_in_both_directions() {
        let d = quiet_driver();
        assert!(!driver_limit_violation(7, 0, &d, &LIMITS));
        assert!(!driver_limit_violation(-7, 0, &d, &LIMITS));
        assert!(driver_limit_violation(8, 0, &d, &LIMITS));
        assert!(driver_limit_violation(-8, 0, &d, &LIMITS));
    }

    #[test]
    fn releasing_to_zero_is_always_allowed() {
        let d = quiet_driver();
        assert!(!driver_limit_violation(0, 300, &d, &LIMITS));
        assert!(!driver_limit_violation(0, -300, &d, &LIMITS));
    }

    #[test]
    fn opposing_driver_forces_wind_down() {
        let mut d = SampleWindow::default();
        let heavy = LIMITS.max_torque / LIMITS.driver_torque_factor + LIMITS.driver_torque_allowance + 1;
        d.set_extremes(-heavy, -heavy);
        let last = LIMITS.max_torque;
        assert!(!driver_limit_violation(last - LIMITS.max_rate_down, last, &d, &LIMITS));
        assert!(driver_limit_violation(last - LIMITS.max_rate_down + 1, last, &d, &LIMITS));
        assert!(!driver_limit_violation(0, last, &d, &LIMITS));
    }

    #[test]
    fn driver_within_allowance_does_not_limit() {
        let mut d = SampleWindow::default();
        d.set_extremes(-LIMITS.driver_torque_allowance, -LIMITS.driver_torque_allowance);
        assert!(!driver_limit_violation(300, 300, &d, &LIMITS));
    }

    #[test]
    fn extreme_seeded_values_do_not_overflow() {
        let mut d = SampleWindow::default();
        d.set_extremes(i32::MIN, i32::MAX);
        assert!(!driver_limit_violation(0, i32::MAX, &d, &LIMITS));
        assert!(driver_limit_violation(i32::MAX, i32::MIN, &d, &LIMITS));
        assert!(rt_rate_violation(i32::MAX, i32::MIN, LIMITS.max_rt_delta));
        assert!(!rt_rate_violation(i32::MIN, i32::MIN, LIMITS.max_rt_delta));
        assert!(!check_rate_and_bound(i32::MAX, i32::MAX, i32::MAX, &d, &LIMITS));

        let mut h = TorqueHistory::default();
        h.set_driver_torque(i32::MIN, i32::MAX);
        h.set_reference(i32::MIN);
        assert!(!h.check_steer(i32::MAX, true, 0, &LIMITS));
    }

    #[test]
    fn rt_delta_is_checkpoint_relative() {
        assert!(!rt_rate_violation(128, 0, 128));
        assert!(rt_rate_violation(129, 0, 128));
        assert!(!rt_rate_violation(-128, 0, 128));
        assert!(!rt_rate_violation(200, 100, 128));
        assert!(rt_rate_violation(229, 100, 128));
    }

    #[test]
    fn check_rate_and_bound_rejects_over_max() {
        let d = quiet_driver();
        assert!(check_rate_and_bound(300, 295, 250, &d, &LIMITS));
        assert!(!check_rate_and_bound(301, 295, 250, &d, &LIMITS));
    }

    #[test]
    fn denied_candidate_never_becomes_reference() {
        let mut h = TorqueHistory::default();
        assert!(h.check_steer(7, true, 0, &LIMITS));
        assert_eq!(h.desired_torque_last(), 7);
        // Attempt to walk the limiter with oversized steps.
        for step in [20, 30, 40] {
            assert!(!h.check_steer(step, true, 0, &LIMITS));
            assert_eq!(h.desired_torque_last(), 0);
        }
        assert!(!h.check_steer(14, true, 0, &LIMITS));
        assert!(h.check_steer(7, true, 0, &LIMITS));
    }

    #[test]
    fn disallowed_cycle_only_passes_zero() {
        let mut h = TorqueHistory::default();
        assert!(h.check_steer(0, false, 0, &LIMITS));
        assert!(!h.check_steer(1, false, 0, &LIMITS));
        h.set_reference(100);
        assert!(h.check_steer(0, false, 0, &LIMITS));
        assert_eq!(h.desired_torque_last(), 0);
    }

    #[test]
    fn rt_checkpoint_refreshes_after_interval() {
        let mut h = TorqueHistory::default();
        let mut t = 0;
        for _ in 0..18 {
            t += 7;
            assert!(h.check_steer(t, true, 0, &LIMITS));
        }
        assert_eq!(t, 126);
        assert!(!h.check_steer(133, true, 0, &LIMITS));

        let mut h = TorqueHistory::default();
        for v in (0..=126).step_by(7) {
            assert!(h.check_steer(v, true, 0, &LIMITS));
        }
        assert!(h.check_steer(127, true, LIMITS.rt_interval_us + 1, &LIMITS));
        assert!(h.check_steer(134, true, LIMITS.rt_interval_us + 2, &LIMITS));
    }

    #[test]
    fn longitudinal_window_and_inactive_value() {
        assert!(longitudinal_check(400, true, 0..=400, 0));
        assert!(!longitudinal_check(401, true, 0..=400, 0));
        assert!(longitudinal_check(0, false, 0..=400, 0));
        assert!(!longitudinal_check(1, false, 0..=400, 0));
        assert!(longitudinal_check(1404, false, 1404..=3072, 1404));
        assert!(!longitudinal_check(1403, true, 1404..=3072, 1404));
    }
}
