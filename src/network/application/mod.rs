//! # Application Layer Network Protocols
//!
//! Application layer (OSI Layer 7) protocols built on the transport traits in
//! [`crate::network`].
//!
//! ## Available Protocols
//!
//! - **[`mqtt`]**: MQTT 3.1.1 client engine for lightweight publish-subscribe
//!   messaging on memory-constrained devices
//!
//! ## Design Principles
//!
//! - **Transport Agnostic**: Work with anything implementing
//!   [`Receive`](crate::network::Receive) and [`Write`](crate::network::Write)
//! - **No-std Compatible**: No heap allocation
//! - **Resource Conscious**: Fixed-size, caller-supplied buffers
//! - **Error Handling**: Comprehensive error types for robust applications

/// MQTT client engine.
///
/// Provides the wire codec, the in-buffer retransmission queue, the stream
/// reassembler and the client state machine tying them together.
pub mod mqtt;
