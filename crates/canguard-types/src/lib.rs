//! `canguard-types` – shared vocabulary for the canguard workspace.
//!
//! Everything that crosses a crate boundary lives here: frames, decisions,
//! safety-mode identifiers, the alternative-experience bitset, and the two
//! narrow traits the engine uses to reach the outside world
//! ([`SignalCodec`] for signal extraction, [`MicrosecondTimer`] for time).

pub mod frame;

pub use frame::{BUS_COUNT, CanFrame, DLC_TO_LEN, MAX_ADDRESS, MAX_PAYLOAD_LEN, dlc_to_len, len_to_dlc};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Outcome of a transmit admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TxDecision {
    Allow,
    Deny,
}

impl TxDecision {
    pub fn is_allowed(self) -> bool {
        matches!(self, TxDecision::Allow)
    }
}

impl From<bool> for TxDecision {
    fn from(allowed: bool) -> Self {
        if allowed { TxDecision::Allow } else { TxDecision::Deny }
    }
}

/// Outcome of a forwarding lookup for a received frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ForwardDecision {
    /// Replicate the frame onto the given bus.
    Forward(u8),
    /// Do not replicate the frame.
    Drop,
}

impl ForwardDecision {
    /// The target bus, if any.
    pub fn target(self) -> Option<u8> {
        match self {
            ForwardDecision::Forward(bus) => Some(bus),
            ForwardDecision::Drop => None,
        }
    }
}

/// Bitset of opt-in deviations from the default engagement policy.
///
/// Unknown bits are discarded on construction so that a corrupted or
/// newer-than-supported flag word can never switch on undefined behaviour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub struct AlternativeExperience(u32);

impl AlternativeExperience {
    pub const DEFAULT: Self = Self(0);
    /// Pressing the gas pedal does not disengage; lateral control stays
    /// available while longitudinal commands are still blocked.
    pub const DISABLE_DISENGAGE_ON_GAS: Self = Self(1);
    pub const DISABLE_STOCK_AEB: Self = Self(2);
    pub const RAISE_LONGITUDINAL_LIMITS_TO_ISO_MAX: Self = Self(8);

    const KNOWN_BITS: u32 = 1 | 2 | 8;

    /// Keep only the recognised bits of `bits`.
    pub const fn from_bits_truncate(bits: u32) -> Self {
        Self(bits & Self::KNOWN_BITS)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }
}

impl From<u32> for AlternativeExperience {
    fn from(bits: u32) -> Self {
        Self::from_bits_truncate(bits)
    }
}

impl From<AlternativeExperience> for u32 {
    fn from(flags: AlternativeExperience) -> Self {
        flags.0
    }
}

impl std::ops::BitOr for AlternativeExperience {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Safety modes the engine can be switched into via `set_safety_hooks`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyMode {
    /// Nothing may be transmitted and nothing is forwarded.
    Silent,
    /// GM global-A platform (ASCM or camera-harness integration).
    Gm,
    /// Every frame may be transmitted. Development and bench use only.
    AllOutput,
    /// Receive-only: frames are observed but never transmitted.
    NoOutput,
}

impl SafetyMode {
    pub const ALL: [SafetyMode; 4] = [
        SafetyMode::Silent,
        SafetyMode::Gm,
        SafetyMode::AllOutput,
        SafetyMode::NoOutput,
    ];

    /// Numeric identifier used on the host boundary.
    pub const fn id(self) -> u16 {
        match self {
            SafetyMode::Silent => 0,
            SafetyMode::Gm => 4,
            SafetyMode::AllOutput => 17,
            SafetyMode::NoOutput => 19,
        }
    }

    pub fn from_id(id: u16) -> Result<Self, SafetyError> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.id() == id)
            .ok_or(SafetyError::UnknownSafetyMode(id))
    }
}

impl std::fmt::Display for SafetyMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SafetyMode::Silent => write!(f, "silent"),
            SafetyMode::Gm => write!(f, "gm"),
            SafetyMode::AllOutput => write!(f, "all_output"),
            SafetyMode::NoOutput => write!(f, "no_output"),
        }
    }
}

/// Signal-extraction capability supplied by an external codec.
///
/// Signals are addressed by message name and signal name, the way a CAN
/// database names them. Implementations must not allocate: the engine calls
/// this on every received and every candidate frame.
pub trait SignalCodec {
    /// Raw integer value of `signal` in `frame`, interpreted as message
    /// `message`. Returns `None` when the signal is unknown or the frame is
    /// too short to contain it.
    fn extract(&self, frame: &CanFrame, message: &str, signal: &str) -> Option<i64>;
}

/// Free-running microsecond timer. Wraps at `u32::MAX`.
pub trait MicrosecondTimer {
    fn now_us(&self) -> u32;
}

/// Elapsed microseconds between two wrapping timer readings.
pub fn ts_elapsed(now: u32, earlier: u32) -> u32 {
    now.wrapping_sub(earlier)
}

/// Errors raised while setting up the engine or building frames.
///
/// Admission decisions are never errors: a rejected frame is a
/// [`TxDecision::Deny`], not an `Err`.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SafetyError {
    #[error("unknown safety mode {0}")]
    UnknownSafetyMode(u16),

    #[error("payload length {0} is not a CAN-FD frame size")]
    InvalidLength(usize),

    #[error("address {0:#x} does not fit in 29 bits")]
    AddressOutOfRange(u32),

    #[error("unknown signal {message}.{signal}")]
    UnknownSignal { message: String, signal: String },

    #[error("value {value} does not fit signal {signal}")]
    ValueOutOfRange { signal: String, value: i64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_alternative_experience_bits_are_dropped() {
        let flags = AlternativeExperience::from_bits_truncate(0xFFFF_FFFF);
        assert_eq!(flags.bits(), 1 | 2 | 8);
        assert_eq!(AlternativeExperience::from(4).bits(), 0);
    }

    #[test]
    fn contains_checks_every_requested_bit() {
        let flags = AlternativeExperience::DISABLE_DISENGAGE_ON_GAS
            | AlternativeExperience::RAISE_LONGITUDINAL_LIMITS_TO_ISO_MAX;
        assert!(flags.contains(AlternativeExperience::DISABLE_DISENGAGE_ON_GAS));
        assert!(!flags.contains(AlternativeExperience::DISABLE_STOCK_AEB));
        assert!(!flags.contains(AlternativeExperience::DEFAULT));
    }

    #[test]
    fn safety_mode_ids_roundtrip() {
        for mode in SafetyMode::ALL {
            assert_eq!(SafetyMode::from_id(mode.id()), Ok(mode));
        }
        assert_eq!(SafetyMode::from_id(3), Err(SafetyError::UnknownSafetyMode(3)));
    }

    #[test]
    fn safety_mode_serializes_snake_case() {
        let json = serde_json::to_string(&SafetyMode::AllOutput).unwrap();
        assert_eq!(json, "\"all_output\"");
    }

    #[test]
    fn elapsed_time_survives_wraparound() {
        assert_eq!(ts_elapsed(10, u32::MAX - 9), 20);
        assert_eq!(ts_elapsed(500, 200), 300);
    }

    #[test]
    fn decisions_convert_from_bool() {
        assert!(TxDecision::from(true).is_allowed());
        assert!(!TxDecision::from(false).is_allowed());
        assert_eq!(ForwardDecision::Forward(2).target(), Some(2));
        assert_eq!(ForwardDecision::Drop.target(), None);
    }

    #[test]
    fn safety_error_display() {
        let err = SafetyError::UnknownSafetyMode(42);
        assert!(err.to_string().contains("42"));
        let err = SafetyError::AddressOutOfRange(0x2000_0000);
        assert!(err.to_string().contains("0x20000000"));
    }
}
