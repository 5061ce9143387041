//! [`SafetyEngine`] – single interception point between the actuation
//! computer and the vehicle buses.
//!
//! Every frame crosses the engine through one of three calls:
//!
//! 1. [`SafetyEngine::rx`] – a frame arrived from a vehicle bus. It is
//!    validated against the variant's RX checks, checked for the relay
//!    sentinel, and decoded into safety state by the active hook.
//! 2. [`SafetyEngine::tx`] – the actuation computer wants to transmit. The
//!    frame must be in the variant's transmit table and pass the content
//!    checks (engagement, pedal override, rate and bound limits).
//! 3. [`SafetyEngine::fwd`] – should a received frame be replicated onto
//!    another bus?
//!
//! A relay malfunction overrides all of it: once detected, nothing is
//! transmitted or forwarded until the session is reset.
//!
//! # Example
//!
//! ```
//! use canguard_hal::{SimTimer, gm_database};
//! use canguard_kernel::SafetyEngine;
//! use canguard_types::SafetyMode;
//!
//! let db = gm_database();
//! let mut engine = SafetyEngine::new(db, SimTimer::new());
//! engine.set_safety_hooks(SafetyMode::Gm.id(), 0).unwrap();
//! engine.init_tests();
//!
//! // Not engaged → only a zero steering command passes.
//! let zero = db.pack("ASCMLKASteeringCmd", 0, &[("LKASteeringCmd", 0)]).unwrap();
//! let some = db.pack("ASCMLKASteeringCmd", 0, &[("LKASteeringCmd", 5)]).unwrap();
//! assert!(engine.tx(&zero));
//! assert!(!engine.tx(&some));
//!
//! engine.set_controls_allowed(true);
//! assert!(engine.tx(&some));
//! ```

use canguard_types::{CanFrame, ForwardDecision, MicrosecondTimer, SafetyError, SafetyMode, SignalCodec, TxDecision};
use tracing::{debug, info};

use crate::hooks::{SafetyCore, SafetyHooks};
use crate::relay_guard::RelayGuard;
use crate::safety_state::Engagement;
use crate::watchdog::RxWatchdog;

pub struct SafetyEngine<C: SignalCodec, T: MicrosecondTimer> {
    codec: C,
    timer: T,
    hooks: SafetyHooks,
    param: u16,
    core: SafetyCore,
    relay: RelayGuard,
    watchdog: RxWatchdog,
}

impl<C: SignalCodec, T: MicrosecondTimer> SafetyEngine<C, T> {
    /// A new engine in [`SafetyMode::Silent`].
    pub fn new(codec: C, timer: T) -> Self {
        let now = timer.now_us();
        Self {
            codec,
            timer,
            hooks: SafetyHooks::Silent,
            param: 0,
            core: SafetyCore::default(),
            relay: RelayGuard::new(None),
            watchdog: RxWatchdog::new(&[], now),
        }
    }

    /// Select the active vehicle hook and reset all session state.
    ///
    /// # Errors
    ///
    /// [`SafetyError::UnknownSafetyMode`] – `mode_id` names no mode. The
    /// engine falls back to [`SafetyMode::Silent`] before returning.
    pub fn set_safety_hooks(&mut self, mode_id: u16, param: u16) -> Result<(), SafetyError> {
        let selected = SafetyMode::from_id(mode_id);
        let (mode, param) = match selected {
            Ok(mode) => (mode, param),
            Err(_) => (SafetyMode::Silent, 0),
        };

        self.hooks = SafetyHooks::select(mode, param);
        self.param = param;
        self.core.reset();
        self.hooks.init(&mut self.core);

        let policy = self.hooks.policy();
        self.relay = RelayGuard::new(policy.relay_malfunction);
        self.watchdog = RxWatchdog::new(policy.rx_checks, self.timer.now_us());

        info!(%mode, param, "safety hooks selected");
        selected.map(|_| ())
    }

    /// Process a received frame. Returns `false` if the frame is malformed
    /// for its address, in which case no state was updated.
    pub fn rx(&mut self, frame: &CanFrame) -> bool {
        let now = self.timer.now_us();
        if !self.watchdog.validate(frame, now) {
            debug!(address = frame.address(), bus = frame.bus(), len = frame.len(), "rx length mismatch");
            return false;
        }
        self.core.state.record_rx(frame.bus(), now);

        if self.relay.observe(frame.address(), frame.bus()) {
            self.core.state.fault();
        }
        self.hooks.rx(&self.codec, frame, &mut self.core);
        self.hold_disengaged_while_lagging();
        true
    }

    /// Transmit admission for a frame from the actuation computer.
    pub fn tx(&mut self, frame: &CanFrame) -> bool {
        if self.core.state.relay_malfunction() {
            return false;
        }
        self.hold_disengaged_while_lagging();
        let now = self.timer.now_us();
        self.hooks.tx(&self.codec, frame, &mut self.core, now)
    }

    /// [`SafetyEngine::tx`] as a [`TxDecision`].
    pub fn tx_decision(&mut self, frame: &CanFrame) -> TxDecision {
        self.tx(frame).into()
    }

    /// Forwarding decision for a frame received on `source_bus`.
    pub fn fwd(&self, address: u32, source_bus: u8) -> ForwardDecision {
        if self.core.state.relay_malfunction() {
            return ForwardDecision::Drop;
        }
        self.hooks.fwd(address, source_bus)
    }

    /// ~1 Hz housekeeping: advance the relay transition timer and re-evaluate
    /// the RX checks. While any check lags, `rx` and `tx` keep the engine
    /// disengaged.
    pub fn safety_tick(&mut self) {
        self.relay.tick();
        if self.watchdog.tick(self.timer.now_us()) {
            for address in self.watchdog.lagging_addresses() {
                debug!(address, "rx check lagging");
            }
            self.core.state.disengage("rx check lagging");
        }
    }

    // Lag is only re-evaluated on the tick, but it must hold engagement off
    // until every lagging message is seen again.
    fn hold_disengaged_while_lagging(&mut self) {
        if self.watchdog.is_lagging() {
            self.core.state.disengage("rx check lagging");
        }
    }

    /// Restore every field to its power-on default for the current hook and
    /// arm the relay detector.
    pub fn init_tests(&mut self) {
        self.core.reset();
        let policy = self.hooks.policy();
        self.relay = RelayGuard::new(policy.relay_malfunction);
        self.relay.arm();
        self.watchdog = RxWatchdog::new(policy.rx_checks, self.timer.now_us());
    }

    pub fn safety_mode(&self) -> SafetyMode {
        self.hooks.mode()
    }

    pub fn safety_param(&self) -> u16 {
        self.param
    }

    pub fn controls_allowed(&self) -> bool {
        self.core.state.controls_allowed()
    }

    pub fn set_controls_allowed(&mut self, allowed: bool) {
        self.core.state.set_controls_allowed(allowed);
    }

    pub fn engagement(&self) -> Engagement {
        self.core.state.engagement()
    }

    pub fn set_alternative_experience(&mut self, bits: u32) {
        self.core.state.set_alternative_experience(bits);
    }

    pub fn alternative_experience(&self) -> u32 {
        self.core.state.alternative_experience().bits()
    }

    pub fn relay_malfunction(&self) -> bool {
        self.core.state.relay_malfunction()
    }

    /// Whether any required message is currently lagging.
    pub fn rx_checks_lagging(&self) -> bool {
        self.watchdog.is_lagging()
    }

    // ── Inspection helpers for harnesses ─────────────────────────────────────

    pub fn set_torque_driver(&mut self, min: i32, max: i32) {
        self.core.torque.set_driver_torque(min, max);
    }

    pub fn torque_driver(&self) -> (i32, i32) {
        let window = self.core.torque.driver_torque();
        (window.min(), window.max())
    }

    pub fn set_desired_torque_last(&mut self, torque: i32) {
        self.core.torque.set_reference(torque);
    }

    pub fn desired_torque_last(&self) -> i32 {
        self.core.torque.desired_torque_last()
    }

    pub fn vehicle_moving(&self) -> bool {
        self.core.pedals.vehicle_moving()
    }

    pub fn gas_pressed_prev(&self) -> bool {
        self.core.pedals.gas_pressed_prev()
    }

    pub fn brake_pressed_prev(&self) -> bool {
        self.core.pedals.brake_pressed_prev()
    }

    pub fn regen_braking_prev(&self) -> bool {
        self.core.pedals.regen_braking_prev()
    }

    pub fn cruise_engaged_prev(&self) -> bool {
        self.core.pedals.cruise_engaged_prev()
    }

    pub fn last_rx_us(&self, bus: u8) -> Option<u32> {
        self.core.state.last_rx_us(bus)
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }
}
