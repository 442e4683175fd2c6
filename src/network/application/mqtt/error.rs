//! Error type shared by every layer of the MQTT engine.

/// Errors produced by the codec, the queue, the reassembler and the client.
///
/// "Not enough space" and "not enough data yet" are not errors: the codec
/// signals them with `Ok(0)` or `Ok(None)` so the caller can retry later.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// A required argument was missing or empty.
    NullArgument,
    /// The retransmission queue has no room for the message.
    SendBufferIsFull,
    /// The Remaining Length field needs more than four bytes or exceeds
    /// 268 435 455.
    InvalidRemainingLength,
    /// The control type nibble is reserved (0 or 15).
    ForbiddenControlType,
    /// The fixed header flags do not match what the control type requires.
    InvalidFlags,
    /// A received message is structurally short or inconsistent.
    MalformedResponse,
    /// A received message has a control type a client never receives.
    ResponseInvalidControlType,
    /// CONNACK reserved flag bits are set.
    ConnackForbiddenFlags,
    /// CONNACK return code is above the highest defined value.
    ConnackForbiddenCode,
    /// A PUBLISH was requested with QoS 1 or 2.
    PublishForbiddenQos,
    /// A string or binary field does not fit its 16-bit length prefix.
    FieldTooLong,
    /// An acknowledgment arrived with no matching pending request.
    AckOfUnknown,
    /// The broker rejected the subscription.
    SubscribeFailed,
    /// The broker refused the connection.
    ConnectionRefused,
    /// The broker refused the connection because of the client identifier.
    ClientIdRefused,
    /// The engine reached a state that should be unreachable.
    MalformedRequest,
    /// An operation was attempted before [`connect`](super::Client::connect).
    ConnectNotCalled,
    /// The transport send primitive failed.
    Transport,
    /// A publish payload could not be decoded as JSON.
    InvalidPayload,
    /// A configuration document could not be decoded.
    InvalidConfig,
}

impl Error {
    /// Numeric status code for reporting surfaces that can only show an
    /// integer. Codes are negative, zero is reserved for "ok".
    pub const fn code(self) -> i16 {
        match self {
            Error::NullArgument => -1,
            Error::ForbiddenControlType => -2,
            Error::InvalidFlags => -3,
            Error::ClientIdRefused => -5,
            Error::ConnackForbiddenFlags => -8,
            Error::ConnackForbiddenCode => -9,
            Error::PublishForbiddenQos => -10,
            Error::MalformedResponse => -12,
            Error::ResponseInvalidControlType => -14,
            Error::ConnectNotCalled => -15,
            Error::SendBufferIsFull => -16,
            Error::Transport => -17,
            Error::MalformedRequest => -18,
            Error::AckOfUnknown => -20,
            Error::ConnectionRefused => -22,
            Error::SubscribeFailed => -23,
            Error::InvalidRemainingLength => -26,
            Error::FieldTooLong => -29,
            Error::InvalidPayload => -30,
            Error::InvalidConfig => -31,
        }
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::NullArgument => write!(f, "required argument missing"),
            Error::SendBufferIsFull => write!(f, "send buffer is full"),
            Error::InvalidRemainingLength => write!(f, "invalid remaining length"),
            Error::ForbiddenControlType => write!(f, "forbidden control type"),
            Error::InvalidFlags => write!(f, "invalid fixed header flags"),
            Error::MalformedResponse => write!(f, "malformed response"),
            Error::ResponseInvalidControlType => write!(f, "unexpected control type in response"),
            Error::ConnackForbiddenFlags => write!(f, "CONNACK reserved flags set"),
            Error::ConnackForbiddenCode => write!(f, "CONNACK return code out of range"),
            Error::PublishForbiddenQos => write!(f, "only QoS 0 publish is supported"),
            Error::FieldTooLong => write!(f, "field longer than 65535 bytes"),
            Error::AckOfUnknown => write!(f, "acknowledgment of unknown message"),
            Error::SubscribeFailed => write!(f, "subscription rejected"),
            Error::ConnectionRefused => write!(f, "connection refused"),
            Error::ClientIdRefused => write!(f, "client identifier refused"),
            Error::MalformedRequest => write!(f, "malformed request"),
            Error::ConnectNotCalled => write!(f, "connect has not been called"),
            Error::Transport => write!(f, "transport send failed"),
            Error::InvalidPayload => write!(f, "payload is not valid JSON for the target type"),
            Error::InvalidConfig => write!(f, "invalid configuration"),
        }
    }
}

impl core::error::Error for Error {}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::NullArgument => defmt::write!(f, "NullArgument"),
            Error::SendBufferIsFull => defmt::write!(f, "SendBufferIsFull"),
            Error::InvalidRemainingLength => defmt::write!(f, "InvalidRemainingLength"),
            Error::ForbiddenControlType => defmt::write!(f, "ForbiddenControlType"),
            Error::InvalidFlags => defmt::write!(f, "InvalidFlags"),
            Error::MalformedResponse => defmt::write!(f, "MalformedResponse"),
            Error::ResponseInvalidControlType => defmt::write!(f, "ResponseInvalidControlType"),
            Error::ConnackForbiddenFlags => defmt::write!(f, "ConnackForbiddenFlags"),
            Error::ConnackForbiddenCode => defmt::write!(f, "ConnackForbiddenCode"),
            Error::PublishForbiddenQos => defmt::write!(f, "PublishForbiddenQos"),
            Error::FieldTooLong => defmt::write!(f, "FieldTooLong"),
            Error::AckOfUnknown => defmt::write!(f, "AckOfUnknown"),
            Error::SubscribeFailed => defmt::write!(f, "SubscribeFailed"),
            Error::ConnectionRefused => defmt::write!(f, "ConnectionRefused"),
            Error::ClientIdRefused => defmt::write!(f, "ClientIdRefused"),
            Error::MalformedRequest => defmt::write!(f, "MalformedRequest"),
            Error::ConnectNotCalled => defmt::write!(f, "ConnectNotCalled"),
            Error::Transport => defmt::write!(f, "Transport"),
            Error::InvalidPayload => defmt::write!(f, "InvalidPayload"),
            Error::InvalidConfig => defmt::write!(f, "InvalidConfig"),
        }
    }
}
