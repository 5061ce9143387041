//! `canguard-hal` – Hardware Abstraction Layer
//!
//! Everything that touches the shape of bytes on the wire or the passage of
//! time lives here, so the kernel only ever sees decoded values.
//!
//! # Modules
//!
//! - [`codec`] – [`SignalDatabase`][codec::SignalDatabase]: a static message
//!   table implementing [`SignalCodec`][canguard_types::SignalCodec], plus a
//!   packer for building frames in tests and tools.
//! - [`gm_dbc`] – the GM global-A message definitions read by the GM hooks.
//! - [`timer`] – [`MonotonicTimer`][timer::MonotonicTimer] for real runs and
//!   [`SimTimer`][timer::SimTimer] for deterministic tests.
//! - [`sim`] – [`SimCanBus`][sim::SimCanBus]: an in-process loopback used to
//!   soak the transmit path with randomized CAN-FD traffic.

pub mod codec;
pub mod gm_dbc;
pub mod sim;
pub mod timer;

pub use codec::{MessageDef, SignalDatabase, SignalDef};
pub use gm_dbc::gm_database;
pub use sim::{SimCanBus, SoakOutcome, random_batch, run_soak_batch};
pub use timer::{MonotonicTimer, SimTimer};
