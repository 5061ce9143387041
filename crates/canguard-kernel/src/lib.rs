//! `canguard-kernel` – the CAN safety engine.
//!
//! It does not drive; it decides. Every frame the actuation computer wants to
//! send and every frame arriving from the vehicle passes through
//! [`SafetyEngine`], which admits, denies or forwards it according to the
//! active vehicle hook.
//!
//! # Modules
//!
//! - [`safety_state`] – [`SafetyState`][safety_state::SafetyState]: the
//!   `Disabled → Enabled → Faulted` engagement machine that derives
//!   `controls_allowed`.
//! - [`limiter`] – bound, per-cycle rate and real-time checks for steering
//!   torque, plus the longitudinal window check.
//! - [`pedal_monitor`] – [`PedalState`][pedal_monitor::PedalState]: pedal,
//!   speed, cruise and button edges that engage or disengage.
//! - [`relay_guard`] – [`RelayGuard`][relay_guard::RelayGuard]: detects a
//!   failed harness relay from a sentinel message.
//! - [`forwarding`] – [`ForwardingPolicy`][forwarding::ForwardingPolicy]:
//!   static cross-bus replication table.
//! - [`watchdog`] – [`RxWatchdog`][watchdog::RxWatchdog]: length and
//!   liveness checks for required messages.
//! - [`hooks`] – the closed set of vehicle hooks (`Silent`, `NoOutput`,
//!   `AllOutput`, `Gm`).
//! - [`engine`] – [`SafetyEngine`][engine::SafetyEngine]: the boundary the
//!   host calls for every frame.

pub mod engine;
pub mod forwarding;
pub mod hooks;
pub mod limiter;
pub mod pedal_monitor;
pub mod relay_guard;
pub mod safety_state;
pub mod watchdog;

pub use engine::SafetyEngine;
pub use forwarding::ForwardingPolicy;
pub use hooks::{MessagePolicy, SafetyCore, SafetyHooks, TxMsg};
pub use limiter::{SampleWindow, TorqueHistory, TorqueLimits};
pub use pedal_monitor::{CruiseButton, PedalState};
pub use relay_guard::RelayGuard;
pub use safety_state::{Engagement, SafetyState};
pub use watchdog::{RxCheck, RxWatchdog};
