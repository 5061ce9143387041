//! In-process CAN loopback for CI testing without physical transceivers.
//!
//! [`SimCanBus`] stands in for the wire between a sending and a receiving
//! interface: frames admitted by the sender's transmit gate are queued per
//! bus and handed to the receiver in FIFO order. A bounded receive buffer
//! models the hardware FIFO; frames that do not fit are counted as
//! overflow rather than silently vanishing.
//!
//! [`run_soak_batch`] drives one randomized CAN-FD batch through the
//! loopback and accounts for every frame: each sent `(address, payload, bus)`
//! must be received exactly once.
//!
//! # Example
//!
//! ```rust
//! use canguard_hal::sim::{SimCanBus, random_batch, run_soak_batch};
//!
//! let mut rng = rand::thread_rng();
//! let mut bus = SimCanBus::new(8192);
//! let frames = random_batch(&mut rng, 10);
//! let outcome = run_soak_batch(&mut bus, &frames, |_| true, |_| {});
//! assert!(outcome.is_clean());
//! ```

use std::collections::{HashMap, VecDeque};

use canguard_types::{BUS_COUNT, CanFrame, DLC_TO_LEN, MAX_ADDRESS, MAX_PAYLOAD_LEN};
use rand::Rng;
use tracing::debug;

/// Buses exercised by the soak (the three CAN-FD capable ones).
pub const SOAK_BUSES: u8 = 3;

/// CAN-FD payload lengths exercised by the soak: every size a frame accepts.
pub const SOAK_LENGTHS: &[usize] = &DLC_TO_LEN;

/// Loopback medium with one FIFO per bus.
#[derive(Debug)]
pub struct SimCanBus {
    queues: [VecDeque<CanFrame>; BUS_COUNT],
    capacity: usize,
    overflow: usize,
}

impl SimCanBus {
    /// `capacity` bounds the total number of frames buffered across buses.
    pub fn new(capacity: usize) -> Self {
        Self {
            queues: Default::default(),
            capacity,
            overflow: 0,
        }
    }

    /// Offer `frames` to the wire. Each frame is first passed to `tx_gate`
    /// (typically a safety engine's transmit check); only admitted frames are
    /// queued. Returns the number of frames put on the wire.
    pub fn send_many<F>(&mut self, frames: &[CanFrame], mut tx_gate: F) -> usize
    where
        F: FnMut(&CanFrame) -> bool,
    {
        let mut sent = 0;
        for frame in frames {
            if !tx_gate(frame) {
                continue;
            }
            let full = self.pending_total() >= self.capacity;
            let Some(queue) = self.queues.get_mut(usize::from(frame.bus())).filter(|_| !full) else {
                self.overflow += 1;
                continue;
            };
            queue.push_back(*frame);
            sent += 1;
        }
        debug!(offered = frames.len(), sent, "sim bus send");
        sent
    }

    /// Drain up to `max` frames, taking from each bus in turn.
    pub fn recv(&mut self, max: usize) -> Vec<CanFrame> {
        let mut out = Vec::with_capacity(max.min(self.pending_total()));
        while out.len() < max && self.pending_total() > 0 {
            for queue in &mut self.queues {
                if out.len() >= max {
                    break;
                }
                if let Some(frame) = queue.pop_front() {
                    out.push(frame);
                }
            }
        }
        out
    }

    pub fn pending_total(&self) -> usize {
        self.queues.iter().map(VecDeque::len).sum()
    }

    /// Frames lost because the buffer was full or the bus did not exist.
    pub fn overflow(&self) -> usize {
        self.overflow
    }
}

/// Result of one soak batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SoakOutcome {
    pub sent: usize,
    pub received: usize,
    /// Sent but never received.
    pub missing: usize,
    /// Received but never sent, or received more often than sent.
    pub unexpected: usize,
}

impl SoakOutcome {
    pub fn is_clean(&self) -> bool {
        self.missing == 0 && self.unexpected == 0 && self.sent == self.received
    }
}

/// `rounds` rounds of one frame per soak length, each on a random bus with a
/// random 29-bit address and random payload.
pub fn random_batch<R: Rng>(rng: &mut R, rounds: usize) -> Vec<CanFrame> {
    let mut frames = Vec::with_capacity(rounds * SOAK_LENGTHS.len());
    let mut data = [0u8; MAX_PAYLOAD_LEN];
    for _ in 0..rounds {
        let bus = rng.gen_range(0..SOAK_BUSES);
        for &len in SOAK_LENGTHS {
            let address = rng.gen_range(1..=MAX_ADDRESS);
            rng.fill(&mut data[..len]);
            if let Ok(frame) = CanFrame::new(address, bus, &data[..len]) {
                frames.push(frame);
            }
        }
    }
    frames
}

/// Send `frames` through `bus` using `tx_gate`, drain everything, hand each
/// received frame to `on_rx`, and account for every frame.
pub fn run_soak_batch<G, R>(bus: &mut SimCanBus, frames: &[CanFrame], tx_gate: G, mut on_rx: R) -> SoakOutcome
where
    G: FnMut(&CanFrame) -> bool,
    R: FnMut(&CanFrame),
{
    let mut expected: HashMap<(u8, u32, Vec<u8>), usize> = HashMap::new();
    let mut outcome = SoakOutcome::default();

    // Every admitted frame is owed to the receiver; overflow counts as loss.
    let mut gate = tx_gate;
    outcome.sent = bus.send_many(frames, |frame| {
        let ok = gate(frame);
        if ok {
            *expected
                .entry((frame.bus(), frame.address(), frame.payload().to_vec()))
                .or_default() += 1;
        }
        ok
    });

    loop {
        let batch = bus.recv(256);
        if batch.is_empty() {
            break;
        }
        for frame in &batch {
            outcome.received += 1;
            on_rx(frame);
            let key = (frame.bus(), frame.address(), frame.payload().to_vec());
            match expected.get_mut(&key) {
                Some(count) if *count > 0 => *count -= 1,
                _ => outcome.unexpected += 1,
            }
        }
    }
    outcome.missing = expected.values().sum();
    outcome
}
