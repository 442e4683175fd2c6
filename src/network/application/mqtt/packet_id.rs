//! Packet identifier generation.
//!
//! Identifiers come from a 16-bit Galois LFSR with taps `0xB400`, which
//! cycles through every nonzero value before repeating. Zero is never
//! produced, so it can stand for "no identifier" inside the queue.

use super::queue::MessageQueue;

/// Initial LFSR state.
pub const SEED: u16 = 163;
/// Feedback taps (x^16 + x^14 + x^13 + x^11 + 1).
pub const TAPS: u16 = 0xB400;

/// Source of packet identifiers unique among queued messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketIdGenerator {
    state: u16,
}

impl Default for PacketIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl PacketIdGenerator {
    /// Generator in its seeded state.
    pub const fn new() -> Self {
        Self { state: SEED }
    }

    /// One LFSR step.
    pub const fn step(state: u16) -> u16 {
        let lsb = state & 1;
        let next = state >> 1;
        if lsb != 0 { next ^ TAPS } else { next }
    }

    /// Next identifier not carried by any message in `queue`.
    pub fn next_id(&mut self, queue: &MessageQueue<'_>) -> u16 {
        loop {
            self.state = Self::step(self.state);
            if !queue.contains_packet_id(self.state) {
                return self.state;
            }
            trace!("packet id {} in use, advancing", self.state);
        }
    }
}
