//! Host TCP transport.
//!
//! [`TcpTransport`] adapts a non-blocking [`TcpStream`] to the engine's
//! transport traits, so the client can run against a real broker from a
//! desktop, a gateway or a test. Each [`poll`](TcpTransport::poll) reads at
//! most one segment; call it once before every [`Client::sync`].
//!
//! [`Client::sync`]: crate::network::application::mqtt::Client::sync
//!
//! ```rust,no_run
//! use libmqtt::network::std::TcpTransport;
//!
//! let mut transport = TcpTransport::connect("127.0.0.1:1883")?;
//! transport.poll()?;
//! let (rx, tx) = transport.split();
//! // client.sync(rx, tx, &clock)
//! # let _ = (rx, tx);
//! # Ok::<(), libmqtt::network::error::Error>(())
//! ```

use ::std::io::{self, ErrorKind, Read as _, Write as _};
use ::std::net::{TcpStream, ToSocketAddrs};
use ::std::time::Instant;

use super::error::Error;
use super::{Receive, TimeSource, Write};

/// Largest segment read in one poll, one Ethernet MSS.
pub const SEGMENT_LEN: usize = 1460;

fn map_io_error(err: &io::Error) -> Error {
    match err.kind() {
        ErrorKind::ConnectionRefused => Error::ConnectionRefused,
        ErrorKind::TimedOut | ErrorKind::WouldBlock => Error::Timeout,
        ErrorKind::InvalidInput | ErrorKind::AddrNotAvailable => Error::InvalidAddress,
        ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted | ErrorKind::BrokenPipe => {
            Error::ConnectionClosed
        }
        ErrorKind::NotConnected => Error::NotOpen,
        _ => Error::ReadError,
    }
}

/// Non-blocking TCP connection exposing one inbound segment at a time.
///
/// The engine reads the current segment while it writes replies, so the
/// transport hands out its two directions separately through
/// [`split`](Self::split).
#[derive(Debug)]
pub struct TcpTransport {
    inbound: TcpInbound,
    outbound: TcpOutbound,
}

/// Receiving half of a [`TcpTransport`].
#[derive(Debug)]
pub struct TcpInbound {
    stream: TcpStream,
    segment: [u8; SEGMENT_LEN],
    len: usize,
    fresh: bool,
}

/// Sending half of a [`TcpTransport`].
#[derive(Debug)]
pub struct TcpOutbound {
    stream: TcpStream,
}

impl TcpTransport {
    /// Connect to a broker.
    pub fn connect<A: ToSocketAddrs>(address: A) -> Result<Self, Error> {
        let stream = TcpStream::connect(address).map_err(|e| map_io_error(&e))?;
        Self::from_stream(stream)
    }

    /// Wrap an already connected stream, switching it to non-blocking mode.
    pub fn from_stream(stream: TcpStream) -> Result<Self, Error> {
        stream.set_nonblocking(true).map_err(|e| map_io_error(&e))?;
        stream.set_nodelay(true).map_err(|e| map_io_error(&e))?;
        let read_half = stream.try_clone().map_err(|e| map_io_error(&e))?;
        Ok(Self {
            inbound: TcpInbound {
                stream: read_half,
                segment: [0; SEGMENT_LEN],
                len: 0,
                fresh: false,
            },
            outbound: TcpOutbound { stream },
        })
    }

    /// Read the next segment, if one is waiting.
    ///
    /// Returns `Ok(true)` when a new segment is available through
    /// [`Receive::segment`]. The previous segment is discarded either way.
    pub fn poll(&mut self) -> Result<bool, Error> {
        let inbound = &mut self.inbound;
        inbound.fresh = false;
        inbound.len = 0;
        match inbound.stream.read(&mut inbound.segment) {
            Ok(0) => Err(Error::ConnectionClosed),
            Ok(n) => {
                inbound.len = n;
                inbound.fresh = true;
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(false),
            Err(e) if e.kind() == ErrorKind::Interrupted => Ok(false),
            Err(e) => Err(map_io_error(&e)),
        }
    }

    /// Both directions, for [`Client::sync`].
    ///
    /// [`Client::sync`]: crate::network::application::mqtt::Client::sync
    pub fn split(&mut self) -> (&TcpInbound, &mut TcpOutbound) {
        (&self.inbound, &mut self.outbound)
    }
}

impl Receive for TcpInbound {
    fn new_data(&self) -> bool {
        self.fresh
    }

    fn acked(&self) -> bool {
        false
    }

    fn segment(&self) -> &[u8] {
        &self.segment[..self.len]
    }
}

impl Write for TcpOutbound {
    type Error = Error;

    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        match self.stream.write(buf) {
            Ok(n) => Ok(n),
            // the socket buffer is full, the engine retries the rest later
            Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(0),
            Err(_) => Err(Error::WriteError),
        }
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        match self.stream.flush() {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(()),
            Err(_) => Err(Error::WriteError),
        }
    }
}

/// Seconds elapsed since the clock was created.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    start: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    /// Start counting from now.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl TimeSource for MonotonicClock {
    fn now_secs(&self) -> u32 {
        self.start.elapsed().as_secs() as u32
    }
}
