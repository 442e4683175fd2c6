//! # libmqtt - MQTT client engine for small devices
//!
//! An MQTT 3.1.1 client protocol engine for memory-constrained embedded
//! devices. It builds and parses MQTT wire messages, keeps outgoing messages in
//! a bounded retransmission queue inside one caller-supplied buffer, and
//! rebuilds incoming messages that arrive batched or split across transport
//! segments. Nothing is allocated at runtime.
//!
//! ## Features
//!
//! - **Wire codec**: byte-exact CONNECT, PUBLISH, SUBSCRIBE, PINGREQ and
//!   DISCONNECT encoding; CONNACK, PUBLISH, SUBACK and PINGRESP decoding
//! - **Retransmission queue**: messages stay packed in place until
//!   acknowledged, and are resent after a response timeout
//! - **Stream reassembly**: generic mode, or a filtering mode that extracts
//!   the two values a switch-controlled device needs from large JSON updates
//! - **Keep-alive**: automatic PINGREQ when the link has been quiet
//! - **Transport agnostic**: runs on anything implementing the small traits
//!   in [`network`]
//!
//! ## Usage
//!
//! Add this to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! libmqtt = "0.1.0"
//! ```
//!
//! ### Connecting and publishing
//!
//! ```rust
//! use libmqtt::network::application::mqtt::{
//!     Client, ClientConfig, Mode, Options, PublishMessage, QoS,
//! };
//! use libmqtt::network::{Receive, TimeSource, Write};
//!
//! # struct Idle;
//! # impl Receive for Idle {
//! #     fn new_data(&self) -> bool { false }
//! #     fn acked(&self) -> bool { false }
//! #     fn segment(&self) -> &[u8] { &[] }
//! # }
//! # struct Sink(usize);
//! # impl Write for Sink {
//! #     type Error = ();
//! #     fn write(&mut self, buf: &[u8]) -> Result<usize, ()> { self.0 += buf.len(); Ok(buf.len()) }
//! #     fn flush(&mut self) -> Result<(), ()> { Ok(()) }
//! # }
//! # struct Uptime;
//! # impl TimeSource for Uptime { fn now_secs(&self) -> u32 { 0 } }
//! let mut buffer = [0u8; 256];
//! let mut client: Client<'_, _, 64> = Client::new(
//!     &mut buffer,
//!     Mode::Generic,
//!     |_: &PublishMessage<'_>| {},
//!     &ClientConfig::default(),
//! );
//!
//! client.connect(&Options {
//!     client_id: "sensor-01",
//!     will_topic: "sensor-01/status",
//!     will_message: b"offline",
//!     user_name: None,
//!     password: None,
//!     keep_alive_seconds: 60,
//!     clean_session: true,
//!     will_qos: QoS::AtMostOnce,
//! })?;
//! client.publish("sensor-01/temperature", b"23.5", false)?;
//!
//! let mut sink = Sink(0);
//! client.sync(&Idle, &mut sink, &Uptime)?; // sends CONNECT
//! client.sync(&Idle, &mut sink, &Uptime)?; // sends PUBLISH
//! assert!(client.queue().find(
//!     libmqtt::network::application::mqtt::codec::ControlType::Publish,
//!     None,
//! ).is_none());
//! # Ok::<(), libmqtt::network::application::mqtt::Error>(())
//! ```
//!
//! ## Platform Support
//!
//! This library is designed to work on:
//! - 8-bit and 32-bit microcontrollers behind a single-buffer TCP/IP stack
//! - Linux-based gateways (through the `std` TCP adapter)
//! - Any platform supporting Rust's `core` library
//!
//! ## Optional Features
//!
//! - `std`: Enable the `TcpStream` transport adapter and a monotonic clock
//! - `defmt`: Enable defmt logging support for embedded debugging

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(missing_docs)]
#![warn(missing_debug_implementations)]
#![doc(html_root_url = "https://shishir-dey.github.io/libmqtt/")]

#[macro_use]
mod fmt;

/// Transport abstraction and the protocol engine built on it.
///
/// This module contains the transport traits the engine is driven through
/// and the MQTT implementation itself.
pub mod network;
