//! Bit-level signal codec over a static message database.
//!
//! A [`SignalDatabase`] is a read-only table of [`MessageDef`]s, each listing
//! its [`SignalDef`]s. Bit positions use big-endian stream numbering: bit 0 is
//! the most significant bit of byte 0, bit 8 the most significant bit of
//! byte 1, and a signal occupies `size` consecutive stream bits starting at
//! `start`, most significant bit first.
//!
//! Decoding ([`SignalCodec::extract`]) never allocates. Packing
//! ([`SignalDatabase::pack`]) is meant for harnesses and tooling.

use canguard_types::{CanFrame, SafetyError, SignalCodec};

/// One signal inside a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalDef {
    pub name: &'static str,
    /// First (most significant) bit in big-endian stream numbering.
    pub start: u16,
    /// Width in bits, 1..=63.
    pub size: u8,
    pub signed: bool,
}

impl SignalDef {
    /// Inclusive range of raw values this signal can carry.
    pub fn range(&self) -> (i64, i64) {
        let size = u32::from(self.size);
        if self.signed {
            (-(1i64 << (size - 1)), (1i64 << (size - 1)) - 1)
        } else {
            (0, (1i64 << size) - 1)
        }
    }

    fn end(&self) -> usize {
        usize::from(self.start) + usize::from(self.size)
    }
}

/// One message: its identifier, expected payload length and signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageDef {
    pub name: &'static str,
    pub address: u32,
    pub length: usize,
    pub signals: &'static [SignalDef],
}

impl MessageDef {
    pub fn signal(&self, name: &str) -> Option<&SignalDef> {
        self.signals.iter().find(|s| s.name == name)
    }
}

/// A static CAN database.
#[derive(Debug, Clone, Copy)]
pub struct SignalDatabase {
    messages: &'static [MessageDef],
}

impl SignalDatabase {
    pub const fn new(messages: &'static [MessageDef]) -> Self {
        Self { messages }
    }

    pub fn message(&self, name: &str) -> Option<&MessageDef> {
        self.messages.iter().find(|m| m.name == name)
    }

    pub fn messages(&self) -> &'static [MessageDef] {
        self.messages
    }

    /// Build a frame for `message` on `bus` with every listed signal set and
    /// every other bit zero.
    ///
    /// # Errors
    ///
    /// - [`SafetyError::UnknownSignal`] – message or signal not in the database.
    /// - [`SafetyError::ValueOutOfRange`] – value does not fit the signal width.
    pub fn pack(&self, message: &str, bus: u8, values: &[(&str, i64)]) -> Result<CanFrame, SafetyError> {
        let msg = self.message(message).ok_or_else(|| SafetyError::UnknownSignal {
            message: message.to_string(),
            signal: String::new(),
        })?;
        let mut frame = CanFrame::zeroed(msg.address, bus, msg.length)?;
        for &(name, value) in values {
            let def = msg.signal(name).ok_or_else(|| SafetyError::UnknownSignal {
                message: message.to_string(),
                signal: name.to_string(),
            })?;
            let (lo, hi) = def.range();
            if value < lo || value > hi {
                return Err(SafetyError::ValueOutOfRange {
                    signal: format!("{message}.{name}"),
                    value,
                });
            }
            write_bits(frame.payload_mut(), def, value);
        }
        Ok(frame)
    }
}

impl SignalCodec for SignalDatabase {
    fn extract(&self, frame: &CanFrame, message: &str, signal: &str) -> Option<i64> {
        let msg = self.message(message)?;
        if msg.address != frame.address() {
            return None;
        }
        let def = msg.signal(signal)?;
        read_bits(frame.payload(), def)
    }
}

fn read_bits(payload: &[u8], def: &SignalDef) -> Option<i64> {
    if def.size == 0 || def.size > 63 || def.end() > payload.len() * 8 {
        return None;
    }
    let mut raw = 0u64;
    for pos in usize::from(def.start)..def.end() {
        let bit = (payload[pos / 8] >> (7 - pos % 8)) & 1;
        raw = (raw << 1) | u64::from(bit);
    }
    let mut value = raw as i64;
    if def.signed && raw & (1 << (def.size - 1)) != 0 {
        value -= 1i64 << def.size;
    }
    Some(value)
}

fn write_bits(payload: &mut [u8], def: &SignalDef, value: i64) {
    let raw = (value as u64) & ((1u64 << def.size) - 1);
    for (i, pos) in (usize::from(def.start)..def.end()).enumerate() {
        let bit = (raw >> (usize::from(def.size) - 1 - i)) & 1;
        let mask = 1u8 << (7 - pos % 8);
        if bit == 1 {
            payload[pos / 8] |= mask;
        } else {
            payload[pos / 8] &= !mask;
        }
    }
}
