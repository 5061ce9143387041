//! GM global-A powertrain and chassis message definitions.
//!
//! Only the messages the GM safety hooks read or gate are listed. Raw values
//! are returned unscaled: wheel speeds are in 0.0311 km/h units and torques
//! in the steering rack's native counts.

use crate::codec::{MessageDef, SignalDatabase, SignalDef};

pub const PSCM_STATUS: u32 = 388;
pub const EBCM_WHEEL_SPD_REAR: u32 = 842;
pub const ASCM_STEERING_BUTTON: u32 = 481;
pub const EBCM_BRAKE_PEDAL_POSITION: u32 = 241;
pub const ACCELERATOR_PEDAL2: u32 = 452;
pub const EBCM_REGEN_PADDLE: u32 = 189;
pub const ASCM_LKA_STEERING_CMD: u32 = 384;
pub const ASCM_GAS_REGEN_CMD: u32 = 715;
pub const EBCM_FRICTION_BRAKE_CMD: u32 = 789;

const fn sig(name: &'static str, start: u16, size: u8, signed: bool) -> SignalDef {
    SignalDef { name, start, size, signed }
}

static GM_MESSAGES: &[MessageDef] = &[
    MessageDef {
        name: "PSCMStatus",
        address: PSCM_STATUS,
        length: 8,
        signals: &[sig("LKADriverAppldTrq", 53, 11, true)],
    },
    MessageDef {
        name: "EBCMWheelSpdRear",
        address: EBCM_WHEEL_SPD_REAR,
        length: 5,
        signals: &[sig("RLWheelSpd", 0, 16, false), sig("RRWheelSpd", 16, 16, false)],
    },
    MessageDef {
        name: "ASCMSteeringButton",
        address: ASCM_STEERING_BUTTON,
        length: 7,
        signals: &[sig("ACCButtons", 41, 3, false)],
    },
    MessageDef {
        name: "EBCMBrakePedalPosition",
        address: EBCM_BRAKE_PEDAL_POSITION,
        length: 6,
        signals: &[sig("BrakePedalPos", 8, 8, false)],
    },
    MessageDef {
        name: "AcceleratorPedal2",
        address: ACCELERATOR_PEDAL2,
        length: 8,
        signals: &[sig("CruiseState", 8, 3, false), sig("AcceleratorPedal2", 40, 8, false)],
    },
    MessageDef {
        name: "EBCMRegenPaddle",
        address: EBCM_REGEN_PADDLE,
        length: 7,
        signals: &[sig("RegenPaddle", 0, 4, false)],
    },
    MessageDef {
        name: "ASCMLKASteeringCmd",
        address: ASCM_LKA_STEERING_CMD,
        length: 4,
        signals: &[sig("LKASteeringCmd", 5, 11, true)],
    },
    MessageDef {
        name: "ASCMGasRegenCmd",
        address: ASCM_GAS_REGEN_CMD,
        length: 8,
        signals: &[sig("GasRegenCmdActive", 7, 1, false), sig("GasRegenCmd", 17, 12, false)],
    },
    MessageDef {
        name: "EBCMFrictionBrakeCmd",
        address: EBCM_FRICTION_BRAKE_CMD,
        length: 5,
        signals: &[sig("FrictionBrakeCmd", 4, 12, true)],
    },
];

/// The GM database used by the GM safety hooks.
pub fn gm_database() -> SignalDatabase {
    SignalDatabase::new(GM_MESSAGES)
}

#[cfg(test)]
mod tests {
    use super::*;
    use canguard_types::SignalCodec;

    #[test]
    fn steering_command_uses_low_bits_of_first_two_bytes() {
        let frame = gm_database()
            .pack("ASCMLKASteeringCmd", 0, &[("LKASteeringCmd", -1)])
            .unwrap();
        assert_eq!(frame.address(), ASCM_LKA_STEERING_CMD);
        assert_eq!(frame.payload(), &[0x07, 0xFF, 0x00, 0x00]);
    }

    #[test]
    fn buttons_sit_in_byte_five() {
        let frame = gm_database()
            .pack("ASCMSteeringButton", 0, &[("ACCButtons", 6)])
            .unwrap();
        assert_eq!(frame.payload()[5], 0x60);
        assert_eq!(gm_database().extract(&frame, "ASCMSteeringButton", "ACCButtons"), Some(6));
    }

    #[test]
    fn gas_regen_spans_bytes_two_and_three() {
        let frame = gm_database()
            .pack("ASCMGasRegenCmd", 0, &[("GasRegenCmd", 0xFFF)])
            .unwrap();
        assert_eq!(&frame.payload()[2..4], &[0x7F, 0xF8]);
    }

    #[test]
    fn friction_brake_is_negative_for_braking() {
        let frame = gm_database()
            .pack("EBCMFrictionBrakeCmd", 2, &[("FrictionBrakeCmd", -400)])
            .unwrap();
        assert_eq!(frame.bus(), 2);
        assert_eq!(
            gm_database().extract(&frame, "EBCMFrictionBrakeCmd", "FrictionBrakeCmd"),
            Some(-400)
        );
    }

    #[test]
    fn every_message_fits_its_declared_length() {
        for msg in gm_database().messages() {
            for def in msg.signals {
                assert!(usize::from(def.start) + usize::from(def.size) <= msg.length * 8, "{}", def.name);
            }
        }
    }
}
