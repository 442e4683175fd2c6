//! # Retransmission queue
//!
//! Outgoing messages are packed directly into one caller-supplied buffer and
//! stay there until the broker acknowledges them. The buffer holds two
//! regions that grow toward each other:
//!
//! ```text
//!  0                curr                tail                      end
//!  ┌────────────────┬───────────────────┬──────────┬─────┬─────────┐
//!  │ packed message │     free space    │ desc n-1 │ ... │ desc 0  │
//!  │ bytes, oldest  │                   │ (newest) │     │(oldest) │
//!  │ first          │                   │          │     │         │
//!  └────────────────┴───────────────────┴──────────┴─────┴─────────┘
//! ```
//!
//! Every descriptor occupies [`DESCRIPTOR_LEN`] bytes and is addressed by
//! index, index 0 being the oldest. `curr <= tail` always holds.
//!
//! Descriptors are never removed individually. [`MessageQueue::clean`]
//! compacts away the oldest run of completed messages in place.
//!
//! ```rust
//! use libmqtt::network::application::mqtt::codec::{self, ControlType};
//! use libmqtt::network::application::mqtt::queue::{MessageQueue, MessageState};
//!
//! let mut storage = [0u8; 128];
//! let mut queue = MessageQueue::new(&mut storage);
//!
//! let n = codec::pack_ping(queue.free_space_mut()).unwrap();
//! let index = queue.register(n, ControlType::Pingreq, None).unwrap();
//! assert_eq!(queue.message_bytes(index), Some(&[0xC0, 0x00][..]));
//!
//! queue.mark_sent(index, MessageState::Complete, 10).unwrap();
//! queue.clean();
//! assert!(queue.is_empty());
//! ```

use core::fmt;

use super::codec::ControlType;
use super::error::Error;

/// Bytes taken by one descriptor inside the queue buffer.
///
/// Layout: `offset: u16`, `len: u16`, `control_type: u8`, `state: u8`,
/// `packet_id: u16` (0 when absent), `time_sent: u32`, all big-endian.
pub const DESCRIPTOR_LEN: usize = 12;

/// Largest buffer the queue addresses. Longer buffers are truncated.
pub const MAX_BUFFER_LEN: usize = u16::MAX as usize;

/// Lifecycle of a queued message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum MessageState {
    /// Packed but not yet handed to the transport.
    Unsent = 0,
    /// Sent, waiting for the broker's acknowledgment.
    AwaitingAck = 1,
    /// Done; the bytes can be reclaimed.
    Complete = 2,
}

impl MessageState {
    const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(MessageState::Unsent),
            1 => Some(MessageState::AwaitingAck),
            2 => Some(MessageState::Complete),
            _ => None,
        }
    }
}

/// A decoded descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct QueuedMessage {
    /// Start of the packed bytes in the payload region.
    pub offset: usize,
    /// Number of packed bytes.
    pub len: usize,
    /// Control type of the packed message.
    pub control_type: ControlType,
    /// Current lifecycle state.
    pub state: MessageState,
    /// Packet identifier, when the message carries one.
    pub packet_id: Option<u16>,
    /// Time of the last transmission, in seconds.
    pub time_sent: u32,
}

impl QueuedMessage {
    fn encode(&self) -> [u8; DESCRIPTOR_LEN] {
        let mut raw = [0u8; DESCRIPTOR_LEN];
        raw[0..2].copy_from_slice(&(self.offset as u16).to_be_bytes());
        raw[2..4].copy_from_slice(&(self.len as u16).to_be_bytes());
        raw[4] = self.control_type as u8;
        raw[5] = self.state as u8;
        raw[6..8].copy_from_slice(&self.packet_id.unwrap_or(0).to_be_bytes());
        raw[8..12].copy_from_slice(&self.time_sent.to_be_bytes());
        raw
    }

    fn decode(raw: &[u8]) -> Option<Self> {
        let raw: &[u8; DESCRIPTOR_LEN] = raw.try_into().ok()?;
        let packet_id = u16::from_be_bytes([raw[6], raw[7]]);
        Some(Self {
            offset: u16::from_be_bytes([raw[0], raw[1]]) as usize,
            len: u16::from_be_bytes([raw[2], raw[3]]) as usize,
            control_type: ControlType::from_nibble(raw[4]).ok()?,
            state: MessageState::from_u8(raw[5])?,
            packet_id: (packet_id != 0).then_some(packet_id),
            time_sent: u32::from_be_bytes([raw[8], raw[9], raw[10], raw[11]]),
        })
    }
}

/// Queue of outgoing messages living inside a borrowed buffer.
pub struct MessageQueue<'b> {
    buf: &'b mut [u8],
    curr: usize,
    tail: usize,
}

impl<'b> MessageQueue<'b> {
    /// Create an empty queue over `buf`.
    pub fn new(buf: &'b mut [u8]) -> Self {
        let len = buf.len().min(MAX_BUFFER_LEN);
        let buf = &mut buf[..len];
        Self {
            curr: 0,
            tail: buf.len(),
            buf,
        }
    }

    /// Drop every message.
    pub fn reset(&mut self) {
        self.curr = 0;
        self.tail = self.buf.len();
    }

    /// Usable size of the underlying buffer.
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Number of descriptors, completed ones included.
    pub fn len(&self) -> usize {
        (self.buf.len() - self.tail) / DESCRIPTOR_LEN
    }

    /// Whether the queue holds no descriptors.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes taken by packed messages and descriptors.
    pub fn used(&self) -> usize {
        self.curr + (self.buf.len() - self.tail)
    }

    /// Room left for the next packed message, once its descriptor is
    /// accounted for.
    pub fn free_space(&self) -> usize {
        self.tail.saturating_sub(DESCRIPTOR_LEN).saturating_sub(self.curr)
    }

    /// The free region, for packing the next message in place.
    pub fn free_space_mut(&mut self) -> &mut [u8] {
        let end = self.curr + self.free_space();
        &mut self.buf[self.curr..end]
    }

    /// Claim the `len` bytes just packed into [`free_space_mut`](Self::free_space_mut)
    /// and describe them with a new `Unsent` descriptor.
    ///
    /// Returns the index of the new descriptor.
    pub fn register(
        &mut self,
        len: usize,
        control_type: ControlType,
        packet_id: Option<u16>,
    ) -> Result<usize, Error> {
        if len > self.free_space() {
            return Err(Error::SendBufferIsFull);
        }
        let message = QueuedMessage {
            offset: self.curr,
            len,
            control_type,
            state: MessageState::Unsent,
            packet_id,
            time_sent: 0,
        };
        self.tail -= DESCRIPTOR_LEN;
        self.curr += len;
        let index = self.len() - 1;
        self.write_descriptor(index, &message);
        trace!("queue: registered {} ({} bytes) at {}", control_type, len, index);
        Ok(index)
    }

    /// Descriptor at `index`.
    pub fn get(&self, index: usize) -> Option<QueuedMessage> {
        let slot = self.slot(index)?;
        QueuedMessage::decode(&self.buf[slot..slot + DESCRIPTOR_LEN])
    }

    /// Packed bytes of the message at `index`.
    pub fn message_bytes(&self, index: usize) -> Option<&[u8]> {
        let message = self.get(index)?;
        self.buf.get(message.offset..message.offset + message.len)
    }

    /// Change the state of the message at `index`.
    pub fn set_state(&mut self, index: usize, state: MessageState) -> Result<(), Error> {
        let mut message = self.get(index).ok_or(Error::MalformedRequest)?;
        message.state = state;
        self.write_descriptor(index, &message);
        Ok(())
    }

    /// Record a completed transmission of the message at `index`.
    pub fn mark_sent(&mut self, index: usize, state: MessageState, now: u32) -> Result<(), Error> {
        let mut message = self.get(index).ok_or(Error::MalformedRequest)?;
        message.state = state;
        message.time_sent = now;
        self.write_descriptor(index, &message);
        Ok(())
    }

    /// Index of the oldest message of `control_type` that is not yet
    /// complete. With a packet identifier, only an exact match qualifies.
    pub fn find(&self, control_type: ControlType, packet_id: Option<u16>) -> Option<usize> {
        self.iter().position(|message| {
            message.control_type == control_type
                && message.state != MessageState::Complete
                && (packet_id.is_none() || message.packet_id == packet_id)
        })
    }

    /// Whether any queued message carries `packet_id`.
    pub fn contains_packet_id(&self, packet_id: u16) -> bool {
        self.iter().any(|message| message.packet_id == Some(packet_id))
    }

    /// Descriptors from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = QueuedMessage> + '_ {
        (0..self.len()).filter_map(move |index| self.get(index))
    }

    /// Reclaim the oldest run of completed messages.
    pub fn clean(&mut self) {
        let count = self.len();
        let Some(first_live) = self.iter().position(|m| m.state != MessageState::Complete) else {
            if count > 0 {
                trace!("queue: all {} messages complete, reset", count);
            }
            self.reset();
            return;
        };
        if first_live == 0 {
            return;
        }
        let Some(oldest_live) = self.get(first_live) else {
            return;
        };

        // payload is laid out in registration order
        let reclaimed = oldest_live.offset;
        self.buf.copy_within(reclaimed..self.curr, 0);
        self.curr -= reclaimed;

        let dropped = first_live * DESCRIPTOR_LEN;
        let live_end = self.buf.len() - dropped;
        self.buf.copy_within(self.tail..live_end, self.tail + dropped);
        self.tail += dropped;

        for index in 0..self.len() {
            if let Some(mut message) = self.get(index) {
                message.offset -= reclaimed;
                self.write_descriptor(index, &message);
            }
        }
        trace!("queue: reclaimed {} messages, {} bytes", first_live, reclaimed);
    }

    fn slot(&self, index: usize) -> Option<usize> {
        if index >= self.len() {
            return None;
        }
        Some(self.buf.len() - (index + 1) * DESCRIPTOR_LEN)
    }

    fn write_descriptor(&mut self, index: usize, message: &QueuedMessage) {
        if let Some(slot) = self.slot(index) {
            self.buf[slot..slot + DESCRIPTOR_LEN].copy_from_slice(&message.encode());
        }
    }
}

impl fmt::Debug for MessageQueue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageQueue")
            .field("capacity", &self.capacity())
            .field("curr", &self.curr)
            .field("tail", &self.tail)
            .field("len", &self.len())
            .finish()
    }
}
