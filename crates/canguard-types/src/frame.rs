//! [`CanFrame`] – a single classic-CAN or CAN-FD frame as seen by the engine.
//!
//! Frames are fixed-size values: the payload lives in an inline 64-byte
//! buffer so that building, copying and inspecting a frame never allocates.
//! Only the CAN-FD payload lengths listed in [`DLC_TO_LEN`] are accepted.

use serde::{Deserialize, Serialize};

use crate::SafetyError;

/// Number of buses the engine tracks state for (three CAN buses plus the
/// single-wire GMLAN bus on GM vehicles).
pub const BUS_COUNT: usize = 4;

/// Largest payload a CAN-FD frame can carry.
pub const MAX_PAYLOAD_LEN: usize = 64;

/// Highest identifier representable in a 29-bit extended frame.
pub const MAX_ADDRESS: u32 = (1 << 29) - 1;

/// CAN-FD data-length-code to payload length.
pub const DLC_TO_LEN: [usize; 16] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 12, 16, 20, 24, 32, 48, 64];

/// Payload length for a data-length code, or `None` for codes above 15.
pub fn dlc_to_len(dlc: u8) -> Option<usize> {
    DLC_TO_LEN.get(usize::from(dlc)).copied()
}

/// Data-length code for an exact payload length, or `None` when the length
/// is not one of the CAN-FD sizes.
pub fn len_to_dlc(len: usize) -> Option<u8> {
    DLC_TO_LEN
        .iter()
        .position(|&l| l == len)
        .and_then(|dlc| u8::try_from(dlc).ok())
}

/// A decoded `(address, bus, payload)` tuple.
///
/// Deserialization goes through [`CanFrame::new`], so a serialized frame is
/// held to the same address and length rules as a constructed one.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawFrame", into = "RawFrame")]
pub struct CanFrame {
    address: u32,
    bus: u8,
    len: u8,
    data: [u8; MAX_PAYLOAD_LEN],
}

/// Wire form of a [`CanFrame`]: only the valid payload bytes are stored.
#[derive(Serialize, Deserialize)]
struct RawFrame {
    address: u32,
    bus: u8,
    payload: Vec<u8>,
}

impl TryFrom<RawFrame> for CanFrame {
    type Error = SafetyError;

    fn try_from(raw: RawFrame) -> Result<Self, Self::Error> {
        CanFrame::new(raw.address, raw.bus, &raw.payload)
    }
}

impl From<CanFrame> for RawFrame {
    fn from(frame: CanFrame) -> Self {
        RawFrame {
            address: frame.address,
            bus: frame.bus,
            payload: frame.payload().to_vec(),
        }
    }
}

impl CanFrame {
    /// Build a frame, validating the address width and the payload length.
    ///
    /// # Errors
    ///
    /// - [`SafetyError::AddressOutOfRange`] – address does not fit in 29 bits.
    /// - [`SafetyError::InvalidLength`] – payload length is not a CAN-FD size.
    pub fn new(address: u32, bus: u8, payload: &[u8]) -> Result<Self, SafetyError> {
        if address > MAX_ADDRESS {
            return Err(SafetyError::AddressOutOfRange(address));
        }
        let dlc = len_to_dlc(payload.len()).ok_or(SafetyError::InvalidLength(payload.len()))?;
        let mut data = [0u8; MAX_PAYLOAD_LEN];
        data[..payload.len()].copy_from_slice(payload);
        Ok(Self {
            address,
            bus,
            len: DLC_TO_LEN[usize::from(dlc)] as u8,
            data,
        })
    }

    /// A zero-filled frame of `len` bytes.
    pub fn zeroed(address: u32, bus: u8, len: usize) -> Result<Self, SafetyError> {
        if len > MAX_PAYLOAD_LEN {
            return Err(SafetyError::InvalidLength(len));
        }
        Self::new(address, bus, &[0u8; MAX_PAYLOAD_LEN][..len])
    }

    pub fn address(&self) -> u32 {
        self.address
    }

    pub fn bus(&self) -> u8 {
        self.bus
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        usize::from(self.len)
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The valid part of the payload.
    pub fn payload(&self) -> &[u8] {
        &self.data[..self.len()]
    }

    /// Mutable view of the valid part of the payload.
    pub fn payload_mut(&mut self) -> &mut [u8] {
        let len = self.len();
        &mut self.data[..len]
    }

    /// The same frame re-addressed to another bus.
    pub fn on_bus(mut self, bus: u8) -> Self {
        self.bus = bus;
        self
    }
}

impl std::fmt::Debug for CanFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CanFrame")
            .field("address", &format_args!("{:#x}", self.address))
            .field("bus", &self.bus)
            .field("payload", &self.payload())
            .finish()
    }
}
