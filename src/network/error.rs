//! Transport errors

/// Failure reported by a transport adapter.
///
/// The engine itself only sees these through [`Write::Error`]; any write or
/// flush failure is latched as the engine's own `Transport` error. The bundled
/// TCP adapter maps `std::io` error kinds onto these variants.
///
/// [`Write::Error`]: super::Write::Error
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// The socket is not connected.
    NotOpen,
    /// The transport rejected outgoing bytes.
    WriteError,
    /// Reading a segment failed.
    ReadError,
    /// The broker refused the TCP connection.
    ConnectionRefused,
    /// The operation did not complete in time.
    Timeout,
    /// The peer closed or reset the connection.
    ConnectionClosed,
    /// The broker address could not be used.
    InvalidAddress,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::NotOpen => write!(f, "connection is not open"),
            Error::WriteError => write!(f, "write failed"),
            Error::ReadError => write!(f, "read failed"),
            Error::ConnectionRefused => write!(f, "connection refused"),
            Error::Timeout => write!(f, "operation timed out"),
            Error::ConnectionClosed => write!(f, "connection closed"),
            Error::InvalidAddress => write!(f, "invalid address"),
        }
    }
}

impl core::error::Error for Error {}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::NotOpen => defmt::write!(f, "NotOpen"),
            Error::WriteError => defmt::write!(f, "WriteError"),
            Error::ReadError => defmt::write!(f, "ReadError"),
            Error::ConnectionRefused => defmt::write!(f, "ConnectionRefused"),
            Error::Timeout => defmt::write!(f, "Timeout"),
            Error::ConnectionClosed => defmt::write!(f, "ConnectionClosed"),
            Error::InvalidAddress => defmt::write!(f, "InvalidAddress"),
        }
    }
}
