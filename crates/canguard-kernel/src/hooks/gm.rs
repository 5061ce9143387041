//! GM global-A platform.
//!
//! Two integrations share the powertrain layout:
//!
//! - **ASCM**: the actuation computer replaces the adaptive-cruise module,
//!   commands steering, gas/regen and friction brake, and engages from the
//!   steering-wheel SET/RESUME buttons.
//! - **Camera** ([`GM_PARAM_HW_CAM`]): the actuation computer intercepts the
//!   front camera harness. Longitudinal control stays with the stock system,
//!   engagement follows the stock cruise state, and all traffic except the
//!   replaced steering messages is bridged between buses 0 and 2.

use canguard_types::{CanFrame, SignalCodec};

use crate::forwarding::ForwardingPolicy;
use crate::limiter::{TorqueLimits, longitudinal_check};
use crate::pedal_monitor::CruiseButton;
use crate::watchdog::RxCheck;

use super::{MessagePolicy, SafetyCore, TxMsg};

/// Param flag selecting the camera-harness integration.
pub const GM_PARAM_HW_CAM: u16 = 1;

pub const GM_TORQUE_LIMITS: TorqueLimits = TorqueLimits {
    max_torque: 300,
    max_rate_up: 7,
    max_rate_down: 17,
    max_rt_delta: 128,
    rt_interval_us: 250_000,
    driver_torque_allowance: 50,
    driver_torque_factor: 4,
};

pub const GM_MAX_GAS: i64 = 3072;
pub const GM_MAX_REGEN: i64 = 1404;
pub const GM_INACTIVE_REGEN: i64 = 1404;
pub const GM_MAX_BRAKE: i64 = 400;

/// Rear wheel speed (raw, 0.0311 km/h per unit) above which the car moves.
pub const GM_STANDSTILL_THRESHOLD: i64 = 10;
/// Brake pedal position at and above which the brake counts as pressed.
pub const GM_BRAKE_PRESSED_THRESHOLD: i64 = 8;

const BUTTON_UNPRESS: i64 = 1;
const BUTTON_RES_ACCEL: i64 = 2;
const BUTTON_DECEL_SET: i64 = 3;
const BUTTON_CANCEL: i64 = 6;

// ── Addresses ────────────────────────────────────────────────────────────────

const PSCM_STATUS: u32 = 388;
const EBCM_WHEEL_SPD_REAR: u32 = 842;
const ASCM_STEERING_BUTTON: u32 = 481;
const EBCM_BRAKE_PEDAL_POSITION: u32 = 241;
const ACCELERATOR_PEDAL2: u32 = 452;
const EBCM_REGEN_PADDLE: u32 = 189;
const ASCM_LKA_STEERING_CMD: u32 = 384;
const ASCM_GAS_REGEN_CMD: u32 = 715;
const EBCM_FRICTION_BRAKE_CMD: u32 = 789;

const RX_TIMESTEP_US: u32 = 100_000;

// ── Static policies ──────────────────────────────────────────────────────────

const ASCM_TX_MSGS: &[TxMsg] = &[
    // powertrain
    TxMsg::new(ASCM_LKA_STEERING_CMD, 0, 4),
    TxMsg::new(1033, 0, 7),
    TxMsg::new(1034, 0, 7),
    TxMsg::new(ASCM_GAS_REGEN_CMD, 0, 8),
    TxMsg::new(880, 0, 6),
    // object
    TxMsg::new(161, 1, 7),
    TxMsg::new(774, 1, 8),
    TxMsg::new(776, 1, 7),
    TxMsg::new(784, 1, 2),
    // chassis
    TxMsg::new(EBCM_FRICTION_BRAKE_CMD, 2, 5),
    // gmlan
    TxMsg::new(0x104c_006c, 3, 3),
    TxMsg::new(0x1040_0060, 3, 5),
];

const CAMERA_TX_MSGS: &[TxMsg] = &[
    TxMsg::new(ASCM_LKA_STEERING_CMD, 0, 4),
    TxMsg::new(PSCM_STATUS, 2, 8),
    TxMsg::new(ASCM_STEERING_BUTTON, 2, 7),
];

const fn rx_check(address: u32, len: usize) -> RxCheck {
    RxCheck {
        address,
        bus: 0,
        len,
        expected_timestep_us: RX_TIMESTEP_US,
    }
}

const ASCM_RX_CHECKS: &[RxCheck] = &[
    rx_check(PSCM_STATUS, 8),
    rx_check(EBCM_WHEEL_SPD_REAR, 5),
    rx_check(ASCM_STEERING_BUTTON, 7),
    rx_check(EBCM_BRAKE_PEDAL_POSITION, 6),
    rx_check(ACCELERATOR_PEDAL2, 8),
];

const CAMERA_RX_CHECKS: &[RxCheck] = &[
    rx_check(PSCM_STATUS, 8),
    rx_check(EBCM_WHEEL_SPD_REAR, 5),
    rx_check(EBCM_BRAKE_PEDAL_POSITION, 6),
    rx_check(ACCELERATOR_PEDAL2, 8),
];

const ASCM_POLICY: MessagePolicy = MessagePolicy {
    tx_msgs: ASCM_TX_MSGS,
    forwarding: ForwardingPolicy::NONE,
    relay_malfunction: Some((ASCM_LKA_STEERING_CMD, 0)),
    rx_checks: ASCM_RX_CHECKS,
};

const CAMERA_POLICY: MessagePolicy = MessagePolicy {
    tx_msgs: CAMERA_TX_MSGS,
    forwarding: ForwardingPolicy {
        bus_lookup: &[(0, 2), (2, 0)],
        // Stock LKAS from the camera and the real PSCMStatus to the camera.
        blacklist: &[(2, &[ASCM_LKA_STEERING_CMD]), (0, &[PSCM_STATUS])],
    },
    relay_malfunction: Some((ASCM_LKA_STEERING_CMD, 0)),
    rx_checks: CAMERA_RX_CHECKS,
};

// ── Hooks ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GmVariant {
    #[default]
    Ascm,
    Camera,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GmHooks {
    variant: GmVariant,
}

impl GmHooks {
    pub fn from_param(param: u16) -> Self {
        let variant = if param & GM_PARAM_HW_CAM != 0 {
            GmVariant::Camera
        } else {
            GmVariant::Ascm
        };
        Self { variant }
    }

    pub fn variant(&self) -> GmVariant {
        self.variant
    }

    /// Longitudinal control left to the stock system: brake and gas
    /// commands are never admitted.
    pub fn stock_longitudinal(&self) -> bool {
        self.variant == GmVariant::Camera
    }

    pub fn policy(&self) -> &'static MessagePolicy {
        match self.variant {
            GmVariant::Ascm => &ASCM_POLICY,
            GmVariant::Camera => &CAMERA_POLICY,
        }
    }

    pub fn rx<C: SignalCodec>(&self, codec: &C, frame: &CanFrame, core: &mut SafetyCore) {
        if frame.bus() != 0 {
            return;
        }
        let get = |message, signal| codec.extract(frame, message, signal);

        match frame.address() {
            PSCM_STATUS => {
                if let Some(torque) = get("PSCMStatus", "LKADriverAppldTrq").and_then(|v| i32::try_from(v).ok()) {
                    core.torque.update_driver_torque(torque);
                }
            }
            EBCM_WHEEL_SPD_REAR => {
                if let (Some(left), Some(right)) =
                    (get("EBCMWheelSpdRear", "RLWheelSpd"), get("EBCMWheelSpdRear", "RRWheelSpd"))
                {
                    core.pedals
                        .set_vehicle_moving(left > GM_STANDSTILL_THRESHOLD || right > GM_STANDSTILL_THRESHOLD);
                }
            }
            ASCM_STEERING_BUTTON if self.variant == GmVariant::Ascm => {
                if let Some(raw) = get("ASCMSteeringButton", "ACCButtons") {
                    core.pedals.cruise_button_check(decode_button(raw), &mut core.state);
                }
            }
            EBCM_BRAKE_PEDAL_POSITION => {
                if let Some(pos) = get("EBCMBrakePedalPosition", "BrakePedalPos") {
                    core.pedals.set_brake_pressed(pos >= GM_BRAKE_PRESSED_THRESHOLD);
                }
            }
            ACCELERATOR_PEDAL2 => {
                if let Some(gas) = get("AcceleratorPedal2", "AcceleratorPedal2") {
                    core.pedals.set_gas_pressed(gas != 0);
                }
                if self.variant == GmVariant::Camera {
                    if let Some(cruise) = get("AcceleratorPedal2", "CruiseState") {
                        core.pedals.pcm_cruise_check(cruise != 0, &mut core.state);
                    }
                }
            }
            EBCM_REGEN_PADDLE => {
                if let Some(regen) = get("EBCMRegenPaddle", "RegenPaddle") {
                    core.pedals.set_regen_braking(regen != 0);
                }
            }
            _ => {}
        }

        core.pedals.generic_rx_checks(&mut core.state);
    }

    /// Content checks for a frame already matched against the tx table.
    /// Undecodable commands are denied.
    pub fn tx<C: SignalCodec>(&self, codec: &C, frame: &CanFrame, core: &mut SafetyCore, now_us: u32) -> bool {
        let get = |message, signal| codec.extract(frame, message, signal);
        let alternative_experience = core.state.alternative_experience();
        let lateral_allowed =
            core.state.controls_allowed() && !core.pedals.pedal_override(alternative_experience);
        let longitudinal_allowed = lateral_allowed && !core.pedals.longitudinal_override();

        match frame.address() {
            EBCM_FRICTION_BRAKE_CMD => {
                if self.stock_longitudinal() {
                    return false;
                }
                // Braking is commanded as a negative value.
                get("EBCMFrictionBrakeCmd", "FrictionBrakeCmd")
                    .is_some_and(|cmd| longitudinal_check(-cmd, longitudinal_allowed, 0..=GM_MAX_BRAKE, 0))
            }
            ASCM_GAS_REGEN_CMD => {
                if self.stock_longitudinal() {
                    return false;
                }
                let (Some(gas), Some(active)) = (
                    get("ASCMGasRegenCmd", "GasRegenCmd"),
                    get("ASCMGasRegenCmd", "GasRegenCmdActive"),
                ) else {
                    return false;
                };
                if active != 0 && !longitudinal_allowed {
                    return false;
                }
                longitudinal_check(gas, longitudinal_allowed, GM_MAX_REGEN..=GM_MAX_GAS, GM_INACTIVE_REGEN)
            }
            ASCM_LKA_STEERING_CMD => get("ASCMLKASteeringCmd", "LKASteeringCmd")
                .and_then(|v| i32::try_from(v).ok())
                .is_some_and(|desired| core.torque.check_steer(desired, lateral_allowed, now_us, &GM_TORQUE_LIMITS)),
            // Only cancel, and only while the stock cruise is engaged.
            ASCM_STEERING_BUTTON => get("ASCMSteeringButton", "ACCButtons")
                .is_some_and(|raw| raw == BUTTON_CANCEL && core.pedals.cruise_engaged_prev()),
            _ => true,
        }
    }
}

fn decode_button(raw: i64) -> CruiseButton {
    match raw {
        0 => CruiseButton::None,
        BUTTON_UNPRESS => CruiseButton::Unpress,
        BUTTON_RES_ACCEL => CruiseButton::ResumeAccel,
        BUTTON_DECEL_SET => CruiseButton::DecelSet,
        BUTTON_CANCEL => CruiseButton::Cancel,
        other => CruiseButton::Other(u8::try_from(other).unwrap_or(u8::MAX)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn param_selects_variant() {
        assert_eq!(GmHooks::from_param(0).variant(), GmVariant::Ascm);
        assert_eq!(GmHooks::from_param(GM_PARAM_HW_CAM).variant(), GmVariant::Camera);
        assert!(GmHooks::from_param(GM_PARAM_HW_CAM).stock_longitudinal());
        assert!(!GmHooks::from_param(0).stock_longitudinal());
    }

    #[test]
    fn rx_checks_fit_the_watchdog() {
        use crate::watchdog::MAX_RX_CHECKS;
        assert!(ASCM_RX_CHECKS.len() <= MAX_RX_CHECKS);
        assert!(CAMERA_RX_CHECKS.len() <= MAX_RX_CHECKS);
    }

    #[test]
    fn only_ascm_checks_buttons_on_rx() {
        let ascm = GmHooks::from_param(0).policy();
        let cam = GmHooks::from_param(GM_PARAM_HW_CAM).policy();
        assert!(ascm.rx_checks.iter().any(|c| c.address == ASCM_STEERING_BUTTON));
        assert!(!cam.rx_checks.iter().any(|c| c.address == ASCM_STEERING_BUTTON));
    }

    #[test]
    fn buttons_decode() {
        assert_eq!(decode_button(1), CruiseButton::Unpress);
        assert_eq!(decode_button(2), CruiseButton::ResumeAccel);
        assert_eq!(decode_button(3), CruiseButton::DecelSet);
        assert_eq!(decode_button(6), CruiseButton::Cancel);
        assert_eq!(decode_button(5), CruiseButton::Other(5));
        assert_eq!(decode_button(-1), CruiseButton::Other(u8::MAX));
    }
}
