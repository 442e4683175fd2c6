//! MQTT client state machine.
//!
//! [`Client`] ties the pieces together. Requests (`connect`, `publish`,
//! `subscribe`, `ping`, `disconnect`) are packed straight into the
//! retransmission queue and return immediately. Nothing touches the network
//! until the owner calls [`Client::sync`], which
//!
//! 1. feeds the current inbound segment through the reassembler, decoding
//!    and dispatching every message it completes, with a send step after each,
//! 2. runs one more send step, which transmits at most one queued message
//!    and queues a keep-alive ping when the link has been quiet.
//!
//! # Error model
//!
//! Protocol refusals and engine faults are stored in the client. Once an
//! error is stored every request and every `sync` returns it until
//! [`Client::reinitialize`] is called, typically after reopening the TCP
//! connection. A full queue is the exception: it is reported to the caller
//! but not stored, so the request can simply be retried later.
//!
//! A fresh client holds [`Error::ConnectNotCalled`] until
//! [`Client::connect`] clears it.
//!
//! # Examples
//!
//! ```rust
//! use libmqtt::network::application::mqtt::{
//!     Client, ClientConfig, Mode, Options, PublishMessage, QoS,
//! };
//! use libmqtt::network::{Receive, TimeSource, Write};
//!
//! struct Segment<'a>(&'a [u8]);
//! impl Receive for Segment<'_> {
//!     fn new_data(&self) -> bool { !self.0.is_empty() }
//!     fn acked(&self) -> bool { false }
//!     fn segment(&self) -> &[u8] { self.0 }
//! }
//!
//! struct Wire(heapless::Vec<u8, 256>);
//! impl Write for Wire {
//!     type Error = ();
//!     fn write(&mut self, buf: &[u8]) -> Result<usize, ()> {
//!         self.0.extend_from_slice(buf)?;
//!         Ok(buf.len())
//!     }
//!     fn flush(&mut self) -> Result<(), ()> { Ok(()) }
//! }
//!
//! struct Clock(u32);
//! impl TimeSource for Clock {
//!     fn now_secs(&self) -> u32 { self.0 }
//! }
//!
//! let mut buffer = [0u8; 512];
//! let mut last_value = None;
//! let handler = |msg: &PublishMessage<'_>| last_value = msg.payload.first().copied();
//! let mut client: Client<'_, _, 128> =
//!     Client::new(&mut buffer, Mode::Generic, handler, &ClientConfig::default());
//!
//! let options = Options {
//!     client_id: "relay-01",
//!     will_topic: "relay-01/status",
//!     will_message: b"offline",
//!     user_name: None,
//!     password: None,
//!     keep_alive_seconds: 60,
//!     clean_session: true,
//!     will_qos: QoS::AtMostOnce,
//! };
//! client.connect(&options).unwrap();
//!
//! let mut wire = Wire(heapless::Vec::new());
//! client.sync(&Segment(&[]), &mut wire, &Clock(0)).unwrap();
//! assert_eq!(wire.0[0], 0x10);
//!
//! // CONNACK accepted
//! client.sync(&Segment(&[0x20, 0x02, 0x00, 0x00]), &mut wire, &Clock(1)).unwrap();
//! assert!(client.connack_received());
//! ```

use core::fmt;

use super::codec::{self, ConnackReturnCode, ControlType, Options, PublishMessage, QoS, Response};
use super::config::ClientConfig;
use super::error::Error;
use super::filter::FilterFields;
use super::packet_id::PacketIdGenerator;
use super::queue::{MessageQueue, MessageState};
use super::reassembler::{Mode, Progress, Reassembler};
use crate::network::{Receive, TimeSource, Write};

/// Receiver of application messages.
///
/// Called synchronously from [`Client::sync`] for every PUBLISH the broker
/// delivers. The message borrows the reassembly buffer and is only valid for
/// the duration of the call.
pub trait PublishHandler {
    /// Handle one message.
    fn on_publish(&mut self, message: &PublishMessage<'_>);
}

impl<F> PublishHandler for F
where
    F: FnMut(&PublishMessage<'_>),
{
    fn on_publish(&mut self, message: &PublishMessage<'_>) {
        self(message)
    }
}

/// Everything except the reassembler and the handler, so that a staged
/// message can be dispatched while the rest of the client is updated.
#[derive(Debug)]
struct Context<'b> {
    queue: MessageQueue<'b>,
    error: Option<Error>,
    config: ClientConfig,
    keep_alive: u16,
    number_of_timeouts: u32,
    last_send: u32,
    send_offset: usize,
    /// Message whose bytes are partly written.
    in_flight: Option<usize>,
    packet_ids: PacketIdGenerator,
    startup_complete: bool,
    connack_received: bool,
    suback_received: bool,
}

/// An MQTT 3.1.1 client over a caller-supplied queue buffer.
///
/// # Type Parameters
///
/// * `H` - The [`PublishHandler`] receiving application messages
/// * `P` - Size of the reassembly scratch buffer, which bounds the largest
///   inbound message in generic mode
pub struct Client<'b, H, const P: usize> {
    context: Context<'b>,
    reassembler: Reassembler<P>,
    handler: H,
}

impl<'b, H: PublishHandler, const P: usize> Client<'b, H, P> {
    /// Create a client whose retransmission queue lives in `buffer`.
    pub fn new(buffer: &'b mut [u8], mode: Mode, handler: H, config: &ClientConfig) -> Self {
        Self {
            context: Context {
                queue: MessageQueue::new(buffer),
                error: Some(Error::ConnectNotCalled),
                config: config.clone(),
                keep_alive: 0,
                number_of_timeouts: 0,
                last_send: 0,
                send_offset: 0,
                in_flight: None,
                packet_ids: PacketIdGenerator::new(),
                startup_complete: false,
                connack_received: false,
                suback_received: false,
            },
            reassembler: Reassembler::new(mode, config.max_unfiltered_body),
            handler,
        }
    }

    /// Return to the freshly created state, keeping the buffer, handler and
    /// configuration. Used after the transport reconnects.
    pub fn reinitialize(&mut self) {
        let ctx = &mut self.context;
        ctx.queue.reset();
        ctx.error = Some(Error::ConnectNotCalled);
        ctx.keep_alive = 0;
        ctx.number_of_timeouts = 0;
        ctx.last_send = 0;
        ctx.send_offset = 0;
        ctx.in_flight = None;
        ctx.startup_complete = false;
        ctx.connack_received = false;
        ctx.suback_received = false;
        self.reassembler.reset();
        debug!("client: reinitialized");
    }

    /// Queue a CONNECT.
    ///
    /// Clears [`Error::ConnectNotCalled`]; any other stored error still
    /// blocks the request.
    pub fn connect(&mut self, options: &Options<'_>) -> Result<(), Error> {
        let ctx = &mut self.context;
        ctx.keep_alive = options.keep_alive_seconds;
        if ctx.error == Some(Error::ConnectNotCalled) {
            ctx.error = None;
        }
        ctx.enqueue(ControlType::Connect, false, |buf, _| codec::pack_connect(buf, options))
    }

    /// Queue a QoS 0 PUBLISH.
    pub fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), Error> {
        let flags = if retain { codec::publish_flags::RETAIN } else { 0 };
        self.context.enqueue(ControlType::Publish, true, |buf, _| {
            codec::pack_publish(buf, topic, payload, flags)
        })
    }

    /// Queue a SUBSCRIBE for one topic filter.
    pub fn subscribe(&mut self, topic: &str, max_qos: QoS) -> Result<(), Error> {
        self.context.enqueue(ControlType::Subscribe, true, |buf, packet_id| {
            codec::pack_subscribe(buf, packet_id, topic, max_qos)
        })
    }

    /// Queue a PINGREQ.
    pub fn ping(&mut self) -> Result<(), Error> {
        self.context.ping()
    }

    /// Queue a DISCONNECT.
    pub fn disconnect(&mut self) -> Result<(), Error> {
        self.context
            .enqueue(ControlType::Disconnect, false, |buf, _| codec::pack_disconnect(buf))
    }

    /// Compact the queue if it holds more than the configured margin, then
    /// report how many bytes the next message may use.
    pub fn check_send_buffer(&mut self) -> usize {
        let ctx = &mut self.context;
        if ctx.queue.used() > ctx.config.clean_margin {
            ctx.clean();
        }
        ctx.queue.free_space()
    }

    /// Process the inbound segment, if any, and transmit queued messages.
    ///
    /// Returns the stored error, if one is set once processing is done.
    pub fn sync<R, W, C>(&mut self, rx: &R, tx: &mut W, clock: &C) -> Result<(), Error>
    where
        R: Receive + ?Sized,
        W: Write + ?Sized,
        C: TimeSource + ?Sized,
    {
        let now = clock.now_secs();

        if rx.new_data() || (rx.acked() && rx.available() > 0) {
            let mut input = rx.segment();
            while !input.is_empty() {
                let (consumed, progress) = match self.reassembler.advance(input) {
                    Ok(step) => step,
                    Err(err) => {
                        self.context.fail(err);
                        break;
                    }
                };
                input = &input[consumed..];
                if progress == Progress::Staged {
                    if let Some(staged) = self.reassembler.staged() {
                        self.context.receive(staged, self.reassembler.fields(), &mut self.handler);
                    }
                    self.reassembler.reset();
                    self.context.send(tx, now);
                }
            }
        }

        self.context.send(tx, now);

        match self.context.error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Stored error, if any.
    pub fn error(&self) -> Option<Error> {
        self.context.error
    }

    /// Whether no error is stored.
    pub fn is_ok(&self) -> bool {
        self.context.error.is_none()
    }

    /// Enable keep-alive pings. Called once the application finished its
    /// connect and subscribe sequence.
    pub fn mark_startup_complete(&mut self) {
        self.context.startup_complete = true;
    }

    /// Number of acknowledgment timeouts since the last reinitialization.
    pub fn number_of_timeouts(&self) -> u32 {
        self.context.number_of_timeouts
    }

    /// Whether a CONNACK resolved the pending CONNECT.
    pub fn connack_received(&self) -> bool {
        self.context.connack_received
    }

    /// Whether a SUBACK resolved a pending SUBSCRIBE.
    pub fn suback_received(&self) -> bool {
        self.context.suback_received
    }

    /// The retransmission queue.
    pub fn queue(&self) -> &MessageQueue<'b> {
        &self.context.queue
    }

    /// The publish handler.
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// The publish handler, mutably.
    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }
}

impl Context<'_> {
    fn fail(&mut self, err: Error) {
        warn!("client: {}", err);
        self.error = Some(err);
    }

    fn ping(&mut self) -> Result<(), Error> {
        self.enqueue(ControlType::Pingreq, false, |buf, _| codec::pack_ping(buf))
    }

    fn enqueue<F>(&mut self, control_type: ControlType, with_packet_id: bool, pack: F) -> Result<(), Error>
    where
        F: FnOnce(&mut [u8], u16) -> Result<usize, Error>,
    {
        if let Some(err) = self.error {
            return Err(err);
        }
        let packet_id = with_packet_id.then(|| self.packet_ids.next_id(&self.queue));

        self.clean();
        let len = match pack(self.queue.free_space_mut(), packet_id.unwrap_or(0)) {
            Ok(0) => {
                debug!("client: no room for {}", control_type);
                return Err(Error::SendBufferIsFull);
            }
            Ok(len) => len,
            Err(err) => {
                self.fail(err);
                return Err(err);
            }
        };
        self.queue.register(len, control_type, packet_id)?;
        Ok(())
    }

    /// Compact the queue unless a message is partly written, whose index
    /// must stay put until it is finished.
    fn clean(&mut self) {
        if self.in_flight.is_none() {
            self.queue.clean();
        }
    }

    fn send<W: Write + ?Sized>(&mut self, tx: &mut W, now: u32) {
        if self.error.is_some() {
            return;
        }
        self.clean();

        let next = match self.in_flight {
            Some(index) => Some(index),
            None => self.next_due(now),
        };
        if let Some(index) = next {
            if !self.transmit(tx, index, now) {
                return;
            }
        }

        let quiet_for = now.wrapping_sub(self.last_send);
        let threshold = u32::from(self.keep_alive) * 3 / 4;
        if self.startup_complete
            && self.keep_alive > 0
            && quiet_for > threshold
            && self.queue.find(ControlType::Pingreq, None).is_none()
        {
            debug!("client: keep-alive ping after {}s", quiet_for);
            // a full queue retries on the next step
            let _ = self.ping();
        }
    }

    /// The oldest message that is unsent or whose acknowledgment timed out.
    fn next_due(&mut self, now: u32) -> Option<usize> {
        for (index, message) in self.queue.iter().enumerate() {
            match message.state {
                MessageState::Unsent => return Some(index),
                MessageState::AwaitingAck
                    if now.wrapping_sub(message.time_sent) > self.config.response_timeout_secs =>
                {
                    warn!("client: {} timed out, resending", message.control_type);
                    self.number_of_timeouts += 1;
                    return Some(index);
                }
                _ => {}
            }
        }
        None
    }

    /// Write what is left of message `index`. Returns `false` once an error
    /// is stored.
    fn transmit<W: Write + ?Sized>(&mut self, tx: &mut W, index: usize, now: u32) -> bool {
        let Some(message) = self.queue.get(index) else {
            self.fail(Error::MalformedRequest);
            return false;
        };
        let Some(pending) = self
            .queue
            .message_bytes(index)
            .and_then(|bytes| bytes.get(self.send_offset..))
        else {
            self.fail(Error::MalformedRequest);
            return false;
        };
        let written = match tx.write(pending) {
            Ok(written) => written,
            Err(_) => {
                self.fail(Error::Transport);
                return false;
            }
        };
        self.send_offset += written;
        if self.send_offset < message.len {
            // partial write, resume on the next step
            self.in_flight = Some(index);
            return true;
        }
        self.send_offset = 0;
        self.in_flight = None;
        if tx.flush().is_err() {
            self.fail(Error::Transport);
            return false;
        }
        self.last_send = now;

        let next_state = match message.control_type {
            // acknowledged while its resend was still being written
            _ if message.state == MessageState::Complete => MessageState::Complete,
            ControlType::Publish | ControlType::Disconnect => MessageState::Complete,
            ControlType::Connect | ControlType::Subscribe | ControlType::Pingreq => {
                MessageState::AwaitingAck
            }
            _ => {
                self.fail(Error::MalformedRequest);
                return false;
            }
        };
        if let Err(err) = self.queue.mark_sent(index, next_state, now) {
            self.fail(err);
            return false;
        }
        trace!("client: sent {}", message.control_type);
        true
    }

    fn receive<H: PublishHandler>(&mut self, staged: &[u8], fields: Option<&FilterFields>, handler: &mut H) {
        if self.error.is_some() {
            return;
        }
        let response = match codec::unpack_response(staged) {
            Ok(Some((response, _))) => response,
            Ok(None) => {
                self.fail(Error::MalformedResponse);
                return;
            }
            Err(err) => {
                self.fail(err);
                return;
            }
        };

        match response {
            Response::Connack(connack) => {
                if !self.resolve(ControlType::Connect, None) {
                    return;
                }
                self.connack_received = true;
                match connack.return_code {
                    ConnackReturnCode::Accepted => debug!("client: connection accepted"),
                    ConnackReturnCode::RefusedIdentifierRejected => self.fail(Error::ClientIdRefused),
                    _ => self.fail(Error::ConnectionRefused),
                }
            }
            Response::Publish(mut message) => {
                message.fields = fields;
                handler.on_publish(&message);
            }
            Response::Suback(suback) => {
                if !self.resolve(ControlType::Subscribe, Some(suback.packet_id)) {
                    return;
                }
                self.suback_received = true;
                if suback.return_codes.contains(&codec::SUBACK_FAILURE) {
                    self.fail(Error::SubscribeFailed);
                }
            }
            Response::Pingresp => {
                self.resolve(ControlType::Pingreq, None);
            }
        }
    }

    /// Complete the pending request an acknowledgment refers to.
    fn resolve(&mut self, control_type: ControlType, packet_id: Option<u16>) -> bool {
        let Some(index) = self.queue.find(control_type, packet_id) else {
            self.fail(Error::AckOfUnknown);
            return false;
        };
        if let Err(err) = self.queue.set_state(index, MessageState::Complete) {
            self.fail(err);
            return false;
        }
        true
    }
}

impl<H, const P: usize> fmt::Debug for Client<'_, H, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("context", &self.context)
            .field("mode", &self.reassembler.mode())
            .finish_non_exhaustive()
    }
}
