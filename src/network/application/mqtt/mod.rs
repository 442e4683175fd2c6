//! MQTT 3.1.1 protocol engine for memory-constrained devices.
//!
//! The engine speaks the client side of a small MQTT subset: CONNECT (always
//! with a last-will), QoS 0 PUBLISH, single-topic SUBSCRIBE, PINGREQ and
//! DISCONNECT out; CONNACK, PUBLISH, SUBACK and PINGRESP in. It never
//! allocates: outgoing messages live in a caller-supplied buffer until they
//! are acknowledged, and incoming messages are rebuilt from transport segments
//! in a fixed scratch buffer.
//!
//! # Layers
//!
//! ```text
//!            ┌──────────────────────────────────────────┐
//!            │                 Client                   │
//!            │  connect / publish / subscribe / sync    │
//!            └───────┬───────────────┬──────────────┬───┘
//!                    │               │              │
//!            ┌───────▼──────┐ ┌──────▼──────┐ ┌─────▼───────┐
//!            │ MessageQueue │ │ Reassembler │ │ PacketIdGen │
//!            └───────┬──────┘ └──────┬──────┘ └─────────────┘
//!                    │               │ filtering mode
//!                    │        ┌──────▼──────┐
//!                    │        │ FieldFilter │
//!                    │        └─────────────┘
//!            ┌───────▼──────────────────────────────────┐
//!            │                  codec                   │
//!            └──────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! The main entry point is [`Client`]. The owner drives it by calling
//! [`Client::sync`] from its network loop, passing the transport's receive
//! side, its send side and a seconds clock:
//!
//! ```rust,no_run
//! use libmqtt::network::application::mqtt::{Client, ClientConfig, Mode, Options, QoS};
//! # use libmqtt::network::{Receive, TimeSource, Write};
//! # struct Link;
//! # impl Receive for Link {
//! #     fn new_data(&self) -> bool { false }
//! #     fn acked(&self) -> bool { false }
//! #     fn segment(&self) -> &[u8] { &[] }
//! # }
//! # impl Write for Link {
//! #     type Error = ();
//! #     fn write(&mut self, buf: &[u8]) -> Result<usize, ()> { Ok(buf.len()) }
//! #     fn flush(&mut self) -> Result<(), ()> { Ok(()) }
//! # }
//! # struct Uptime;
//! # impl TimeSource for Uptime { fn now_secs(&self) -> u32 { 0 } }
//! # let (rx, mut tx, clock) = (Link, Link, Uptime);
//!
//! let mut buffer = [0u8; 600];
//! let mut client: Client<'_, _, 64> = Client::new(
//!     &mut buffer,
//!     Mode::Filtering,
//!     |msg: &libmqtt::network::application::mqtt::PublishMessage<'_>| {
//!         if let Some(fields) = msg.fields {
//!             let _ = (fields.idx_value(), fields.nvalue_value());
//!         }
//!     },
//!     &ClientConfig::default(),
//! );
//!
//! client.connect(&Options {
//!     client_id: "relay-01",
//!     will_topic: "relay-01/status",
//!     will_message: b"offline",
//!     user_name: None,
//!     password: None,
//!     keep_alive_seconds: 60,
//!     clean_session: true,
//!     will_qos: QoS::AtMostOnce,
//! })?;
//!
//! loop {
//!     client.sync(&rx, &mut tx, &clock)?;
//!     if client.connack_received() && !client.suback_received() && client.queue().is_empty() {
//!         client.subscribe("domoticz/out", QoS::AtMostOnce)?;
//!     }
//!     if client.suback_received() {
//!         client.mark_startup_complete();
//!     }
//! }
//! # Ok::<(), libmqtt::network::application::mqtt::Error>(())
//! ```

/// Wire format encoding and decoding.
pub mod codec;

/// Client state machine.
pub mod client;

/// Engine tunables.
pub mod config;

/// Error type of the engine.
pub mod error;

/// Field extraction for filtering reassembly.
pub mod filter;

/// Packet identifier generation.
pub mod packet_id;

/// In-buffer retransmission queue.
pub mod queue;

/// Segment-to-message reassembly.
pub mod reassembler;

pub use client::{Client, PublishHandler};
pub use codec::{Connack, ConnackReturnCode, Options, PublishMessage, QoS, Response, Suback};
pub use config::ClientConfig;
pub use error::Error;
pub use filter::FilterFields;
pub use reassembler::Mode;
