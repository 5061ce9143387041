//! [`PedalState`] – driver input tracking and engagement edges.
//!
//! Vehicle hooks decode pedal, speed, cruise and button signals and hand the
//! resulting booleans here. This module owns the rules that turn those
//! inputs into engagement transitions:
//!
//! - gas: a rising edge disengages, unless the alternative experience
//!   `DISABLE_DISENGAGE_ON_GAS` is active;
//! - brake and regen paddle: a rising edge disengages, and so does a held
//!   press while the vehicle is moving;
//! - stock cruise: a rising edge engages, cruise off disengages;
//! - steering-wheel buttons: CANCEL disengages at once, a SET or RESUME
//!   press engages only on its release.
//!
//! It also answers the transmit-time override question: is a pedal currently
//! overriding the actuation computer?

use canguard_types::AlternativeExperience;

use crate::safety_state::SafetyState;

/// Steering-wheel cruise button, as decoded by a vehicle hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CruiseButton {
    #[default]
    None,
    Unpress,
    ResumeAccel,
    DecelSet,
    Cancel,
    /// A button value the engagement logic does not act on.
    Other(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PedalState {
    gas_pressed: bool,
    gas_pressed_prev: bool,
    brake_pressed: bool,
    brake_pressed_prev: bool,
    regen_braking: bool,
    regen_braking_prev: bool,
    vehicle_moving: bool,
    cruise_engaged_prev: bool,
    cruise_button_prev: CruiseButton,
}

impl PedalState {
    pub fn set_vehicle_moving(&mut self, moving: bool) {
        self.vehicle_moving = moving;
    }

    pub fn set_gas_pressed(&mut self, pressed: bool) {
        self.gas_pressed = pressed;
    }

    pub fn set_brake_pressed(&mut self, pressed: bool) {
        self.brake_pressed = pressed;
    }

    pub fn set_regen_braking(&mut self, pressed: bool) {
        self.regen_braking = pressed;
    }

    /// Apply pedal edge rules and latch the current pedal readings as the
    /// previous ones. Run after every valid frame a hook processes.
    pub fn generic_rx_checks(&mut self, state: &mut SafetyState) {
        let gas_disengages = !state
            .alternative_experience()
            .contains(AlternativeExperience::DISABLE_DISENGAGE_ON_GAS);
        if self.gas_pressed && !self.gas_pressed_prev && gas_disengages {
            state.disengage("gas pressed");
        }
        self.gas_pressed_prev = self.gas_pressed;

        if self.brake_pressed && (!self.brake_pressed_prev || self.vehicle_moving) {
            state.disengage("brake pressed");
        }
        self.brake_pressed_prev = self.brake_pressed;

        if self.regen_braking && (!self.regen_braking_prev || self.vehicle_moving) {
            state.disengage("regen paddle");
        }
        self.regen_braking_prev = self.regen_braking;
    }

    /// Engagement follows the stock cruise system.
    pub fn pcm_cruise_check(&mut self, cruise_engaged: bool, state: &mut SafetyState) {
        if !cruise_engaged {
            state.disengage("cruise off");
        }
        if cruise_engaged && !self.cruise_engaged_prev {
            state.engage("cruise engaged");
        }
        self.cruise_engaged_prev = cruise_engaged;
    }

    /// Engagement follows the steering-wheel buttons.
    pub fn cruise_button_check(&mut self, button: CruiseButton, state: &mut SafetyState) {
        if button == CruiseButton::Cancel {
            state.disengage("cancel button");
        }
        let released = button == CruiseButton::Unpress
            && matches!(self.cruise_button_prev, CruiseButton::ResumeAccel | CruiseButton::DecelSet);
        if released {
            state.engage("set/resume released");
        }
        self.cruise_button_prev = button;
    }

    /// A pedal is overriding lateral control: brake while moving, or gas
    /// unless gas override is permitted by the alternative experience.
    pub fn pedal_override(&self, alternative_experience: AlternativeExperience) -> bool {
        let brake = self.brake_pressed_prev && self.vehicle_moving;
        let gas = self.gas_pressed_prev
            && !alternative_experience.contains(AlternativeExperience::DISABLE_DISENGAGE_ON_GAS);
        brake || gas
    }

    /// Longitudinal commands are never allowed with the gas pedal pressed.
    pub fn longitudinal_override(&self) -> bool {
        self.gas_pressed_prev
    }

    pub fn gas_pressed_prev(&self) -> bool {
        self.gas_pressed_prev
    }

    pub fn brake_pressed_prev(&self) -> bool {
        self.brake_pressed_prev
    }

    pub fn regen_braking_prev(&self) -> bool {
        self.regen_braking_prev
    }

    pub fn vehicle_moving(&self) -> bool {
        self.vehicle_moving
    }

    pub fn cruise_engaged_prev(&self) -> bool {
        self.cruise_engaged_prev
    }
}
