//! A transport abstraction layer for embedded systems
//!
//! The MQTT engine never owns a socket. It sees the transport through three
//! small traits, so that it can sit on top of a uIP-style single-buffer TCP
//! stack, a vendor socket API or a host `TcpStream` alike:
//!
//! - [`Receive`]: predicates telling whether a new segment (or an
//!   acknowledgment carrying data) is available, plus read access to that
//!   segment as one contiguous byte range.
//! - [`Write`]: a send primitive that reports how many bytes it accepted.
//! - [`TimeSource`]: a seconds counter used for response timeouts and
//!   keep-alive.
//!
//! ```rust
//! use libmqtt::network::{Receive, TimeSource, Write};
//!
//! struct Link {
//!     rx: [u8; 64],
//!     rx_len: usize,
//!     tx: heapless::Vec<u8, 64>,
//! }
//!
//! impl Receive for Link {
//!     fn new_data(&self) -> bool { self.rx_len > 0 }
//!     fn acked(&self) -> bool { false }
//!     fn segment(&self) -> &[u8] { &self.rx[..self.rx_len] }
//! }
//!
//! impl Write for Link {
//!     type Error = ();
//!     fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
//!         let n = buf.len().min(self.tx.capacity() - self.tx.len());
//!         self.tx.extend_from_slice(&buf[..n]).map_err(|_| ())?;
//!         Ok(n)
//!     }
//!     fn flush(&mut self) -> Result<(), Self::Error> { Ok(()) }
//! }
//!
//! struct Ticks(u32);
//! impl TimeSource for Ticks {
//!     fn now_secs(&self) -> u32 { self.0 }
//! }
//! ```

#![allow(missing_docs)]
#![deny(unsafe_code)]

/// Common error types for transport operations
pub mod error;

/// Protocol implementations layered on top of the transport traits
pub mod application;

/// Host-side TCP adapter
#[cfg(feature = "std")]
pub mod std;

/// Re-exports of common traits
pub mod prelude {
    pub use super::{Receive, TimeSource, Write};
}

/// Inbound side of a transport.
///
/// The transport stages one segment at a time in a buffer the engine can
/// read. The segment stays valid until the transport is advanced by its
/// owner, which never happens while the engine is running.
pub trait Receive {
    /// A new segment arrived since the last poll of the transport.
    fn new_data(&self) -> bool;

    /// The peer acknowledged outstanding data. Some stacks deliver payload
    /// piggy-backed on the acknowledgment, so the engine checks both.
    fn acked(&self) -> bool;

    /// Number of bytes in the current segment.
    fn available(&self) -> usize {
        self.segment().len()
    }

    /// The current segment as one contiguous byte range.
    fn segment(&self) -> &[u8];
}

/// Outbound side of a transport.
pub trait Write {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Hand bytes to the transport. Returns how many were accepted, which may
    /// be fewer than `buf.len()`.
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error>;
    /// Flush the write buffer
    fn flush(&mut self) -> Result<(), Self::Error>;
}

/// Seconds counter
///
/// Only differences between readings matter, so a free-running counter
/// started at boot is enough.
pub trait TimeSource {
    /// Current time in seconds.
    fn now_secs(&self) -> u32;
}

impl<T: TimeSource + ?Sized> TimeSource for &T {
    fn now_secs(&self) -> u32 {
        (**self).now_secs()
    }
}
