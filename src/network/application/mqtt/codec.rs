//! MQTT 3.1.1 wire codec.
//!
//! Byte-exact translation between the in-memory message model and the MQTT
//! wire format, for the subset of the protocol this engine speaks.
//!
//! # Conventions
//!
//! Every `pack_*` function writes into a caller-supplied slice and returns the
//! number of bytes written. `Ok(0)` means the message would not fit; nothing
//! useful was written and the caller should retry later with more space.
//!
//! Every `unpack_*` function reads from a slice and returns `Ok(None)` when the
//! slice does not yet hold a complete message. Only structurally invalid input
//! produces an [`Error`].
//!
//! # Fixed header
//!
//! ```text
//!  byte 0     : control type (high nibble) | flags (low nibble)
//!  byte 1..=4 : Remaining Length, 7 value bits per byte, bit 7 = continuation
//! ```
//!
//! # Examples
//!
//! ```rust
//! use libmqtt::network::application::mqtt::codec::{self, Response};
//!
//! let mut buf = [0u8; 32];
//! let n = codec::pack_publish(&mut buf, "sensors/t", b"23.5", 0).unwrap();
//!
//! // Pretend the broker echoed it back
//! let (response, consumed) = codec::unpack_response(&buf[..n]).unwrap().unwrap();
//! assert_eq!(consumed, n);
//! match response {
//!     Response::Publish(msg) => {
//!         assert_eq!(msg.topic, b"sensors/t");
//!         assert_eq!(msg.payload, b"23.5");
//!     }
//!     _ => unreachable!(),
//! }
//! ```

use super::error::Error;
use super::filter::FilterFields;

/// Protocol name carried in every CONNECT.
pub const PROTOCOL_NAME: &[u8] = b"MQTT";
/// MQTT protocol level for version 3.1.1.
pub const PROTOCOL_LEVEL: u8 = 4;
/// Largest value the Remaining Length field can carry.
pub const MAX_REMAINING_LENGTH: u32 = 268_435_455;
/// Size of the CONNECT variable header.
pub const CONNECT_VARIABLE_HEADER_LEN: usize = 10;
/// SUBACK return code signalling a rejected subscription.
pub const SUBACK_FAILURE: u8 = 0x80;

/// CONNECT flag bits.
pub mod connect_flags {
    /// Must be zero on the wire.
    pub const RESERVED: u8 = 0x01;
    /// Discard any previous session.
    pub const CLEAN_SESSION: u8 = 0x02;
    /// A will topic and message follow the client identifier.
    pub const WILL_FLAG: u8 = 0x04;
    /// Will QoS bits.
    pub const WILL_QOS_MASK: u8 = 0x18;
    /// The will message is retained.
    pub const WILL_RETAIN: u8 = 0x20;
    /// A password follows.
    pub const PASSWORD: u8 = 0x40;
    /// A user name follows.
    pub const USER_NAME: u8 = 0x80;
}

/// PUBLISH fixed header flag bits.
pub mod publish_flags {
    /// Duplicate delivery.
    pub const DUP: u8 = 0x08;
    /// QoS bits.
    pub const QOS_MASK: u8 = 0x06;
    /// Retained message.
    pub const RETAIN: u8 = 0x01;
}

/// MQTT control packet types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ControlType {
    /// Client request to connect to the server.
    Connect = 1,
    /// Connect acknowledgment.
    Connack = 2,
    /// Publish message.
    Publish = 3,
    /// Publish acknowledgment.
    Puback = 4,
    /// Publish received (QoS 2, part 1).
    Pubrec = 5,
    /// Publish release (QoS 2, part 2).
    Pubrel = 6,
    /// Publish complete (QoS 2, part 3).
    Pubcomp = 7,
    /// Subscribe request.
    Subscribe = 8,
    /// Subscribe acknowledgment.
    Suback = 9,
    /// Unsubscribe request.
    Unsubscribe = 10,
    /// Unsubscribe acknowledgment.
    Unsuback = 11,
    /// Ping request.
    Pingreq = 12,
    /// Ping response.
    Pingresp = 13,
    /// Client is disconnecting.
    Disconnect = 14,
}

impl ControlType {
    /// Decode the high nibble of the first header byte.
    pub const fn from_nibble(nibble: u8) -> Result<Self, Error> {
        Ok(match nibble {
            1 => ControlType::Connect,
            2 => ControlType::Connack,
            3 => ControlType::Publish,
            4 => ControlType::Puback,
            5 => ControlType::Pubrec,
            6 => ControlType::Pubrel,
            7 => ControlType::Pubcomp,
            8 => ControlType::Subscribe,
            9 => ControlType::Suback,
            10 => ControlType::Unsubscribe,
            11 => ControlType::Unsuback,
            12 => ControlType::Pingreq,
            13 => ControlType::Pingresp,
            14 => ControlType::Disconnect,
            _ => return Err(Error::ForbiddenControlType),
        })
    }

    /// Flag bits this control type must carry.
    pub const fn required_flags(self) -> u8 {
        match self {
            ControlType::Pubrel | ControlType::Subscribe | ControlType::Unsubscribe => 0x02,
            _ => 0x00,
        }
    }

    /// Which flag bits are fixed for this control type.
    pub const fn flags_mask(self) -> u8 {
        match self {
            ControlType::Publish => 0x00,
            _ => 0x0F,
        }
    }

    /// Reject flags whose fixed bits differ from [`required_flags`](Self::required_flags).
    pub const fn check_flags(self, flags: u8) -> Result<(), Error> {
        if (flags ^ self.required_flags()) & self.flags_mask() != 0 {
            return Err(Error::InvalidFlags);
        }
        Ok(())
    }
}

/// Quality of Service levels for MQTT messages.
///
/// The engine only publishes at [`QoS::AtMostOnce`]; the other levels are used
/// as the maximum QoS requested in a SUBSCRIBE and for the will message.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum QoS {
    /// At most once delivery.
    AtMostOnce = 0,
    /// At least once delivery.
    AtLeastOnce = 1,
    /// Exactly once delivery.
    ExactlyOnce = 2,
}

impl QoS {
    /// Decode a two-bit QoS value.
    pub const fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(QoS::AtMostOnce),
            1 => Some(QoS::AtLeastOnce),
            2 => Some(QoS::ExactlyOnce),
            _ => None,
        }
    }
}

/// The fixed header present at the start of every MQTT message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FixedHeader {
    /// Message type.
    pub control_type: ControlType,
    /// Low nibble of the first byte.
    pub flags: u8,
    /// Number of bytes following the fixed header.
    pub remaining_length: u32,
}

impl FixedHeader {
    /// Build a header with the control type's required flags.
    pub const fn new(control_type: ControlType, remaining_length: u32) -> Self {
        Self {
            control_type,
            flags: control_type.required_flags(),
            remaining_length,
        }
    }
}

/// Number of bytes needed to encode `value` as a Remaining Length.
pub const fn remaining_length_len(value: u32) -> usize {
    if value < 128 {
        1
    } else if value < 16_384 {
        2
    } else if value < 2_097_152 {
        3
    } else {
        4
    }
}

/// Encode `value` as a Remaining Length into `buf`.
///
/// Returns the number of bytes written, or `Ok(0)` if `buf` is too short.
pub fn encode_remaining_length(buf: &mut [u8], value: u32) -> Result<usize, Error> {
    if value > MAX_REMAINING_LENGTH {
        return Err(Error::InvalidRemainingLength);
    }
    let needed = remaining_length_len(value);
    if buf.len() < needed {
        return Ok(0);
    }
    let mut rest = value;
    for slot in buf.iter_mut().take(needed) {
        let mut byte = (rest & 0x7F) as u8;
        rest >>= 7;
        if rest > 0 {
            byte |= 0x80;
        }
        *slot = byte;
    }
    Ok(needed)
}

/// Decode a Remaining Length from the start of `buf`.
///
/// Returns the value and the number of bytes it occupied, or `Ok(None)` if
/// `buf` ends before the terminating byte.
pub fn decode_remaining_length(buf: &[u8]) -> Result<Option<(u32, usize)>, Error> {
    let mut value = 0u32;
    let mut shift = 0u32;
    for (i, &byte) in buf.iter().enumerate() {
        // The field is 28 bits wide, a fifth byte is never legal.
        if shift == 28 {
            return Err(Error::InvalidRemainingLength);
        }
        value |= u32::from(byte & 0x7F) << shift;
        shift += 7;
        if byte & 0x80 == 0 {
            return Ok(Some((value, i + 1)));
        }
    }
    if shift == 28 {
        return Err(Error::InvalidRemainingLength);
    }
    Ok(None)
}

/// Pack a fixed header.
///
/// Returns `Ok(0)` if the header, or the body it announces, would not fit in
/// `buf`.
pub fn pack_fixed_header(buf: &mut [u8], header: &FixedHeader) -> Result<usize, Error> {
    header.control_type.check_flags(header.flags)?;
    if header.remaining_length > MAX_REMAINING_LENGTH {
        return Err(Error::InvalidRemainingLength);
    }
    let Some((first, rest)) = buf.split_first_mut() else {
        return Ok(0);
    };
    let length_len = encode_remaining_length(rest, header.remaining_length)?;
    if length_len == 0 {
        return Ok(0);
    }
    *first = ((header.control_type as u8) << 4) | (header.flags & 0x0F);

    let written = 1 + length_len;
    if buf.len() - written < header.remaining_length as usize {
        return Ok(0);
    }
    Ok(written)
}

/// Unpack a fixed header.
///
/// Returns the header and its size, or `Ok(None)` if `buf` does not yet hold
/// the whole header and the body it announces.
pub fn unpack_fixed_header(buf: &[u8]) -> Result<Option<(FixedHeader, usize)>, Error> {
    let Some((&first, rest)) = buf.split_first() else {
        return Ok(None);
    };
    let Some((remaining_length, length_len)) = decode_remaining_length(rest)? else {
        return Ok(None);
    };

    let control_type = ControlType::from_nibble(first >> 4)?;
    let flags = first & 0x0F;
    control_type.check_flags(flags)?;

    let consumed = 1 + length_len;
    if buf.len() - consumed < remaining_length as usize {
        return Ok(None);
    }
    Ok(Some((
        FixedHeader {
            control_type,
            flags,
            remaining_length,
        },
        consumed,
    )))
}

/// Pack a big-endian `u16` into the first two bytes of `buf`.
///
/// Returns `None` if `buf` is shorter than two bytes.
pub fn pack_u16(buf: &mut [u8], value: u16) -> Option<usize> {
    let out = buf.get_mut(..2)?;
    out.copy_from_slice(&value.to_be_bytes());
    Some(2)
}

/// Read a big-endian `u16` from the first two bytes of `buf`.
pub fn unpack_u16(buf: &[u8]) -> Option<u16> {
    match buf {
        [hi, lo, ..] => Some(u16::from_be_bytes([*hi, *lo])),
        _ => None,
    }
}

/// Pack a length-prefixed string (or binary field).
///
/// Returns `Ok(0)` if `buf` is too short.
pub fn pack_str(buf: &mut [u8], bytes: &[u8]) -> Result<usize, Error> {
    let len = field_len(bytes)?;
    let total = 2 + bytes.len();
    if buf.len() < total {
        return Ok(0);
    }
    buf[..2].copy_from_slice(&len.to_be_bytes());
    buf[2..total].copy_from_slice(bytes);
    Ok(total)
}

fn field_len(bytes: &[u8]) -> Result<u16, Error> {
    u16::try_from(bytes.len()).map_err(|_| Error::FieldTooLong)
}

fn to_remaining_length(len: usize) -> Result<u32, Error> {
    u32::try_from(len)
        .ok()
        .filter(|&len| len <= MAX_REMAINING_LENGTH)
        .ok_or(Error::InvalidRemainingLength)
}

/// Sequential writer over a slice whose capacity was checked up front.
struct Cursor<'b> {
    buf: &'b mut [u8],
    pos: usize,
}

impl<'b> Cursor<'b> {
    fn new(buf: &'b mut [u8], pos: usize) -> Self {
        Self { buf, pos }
    }

    fn put_u8(&mut self, value: u8) {
        self.buf[self.pos] = value;
        self.pos += 1;
    }

    fn put_u16(&mut self, value: u16) {
        self.put_bytes(&value.to_be_bytes());
    }

    fn put_bytes(&mut self, bytes: &[u8]) {
        self.buf[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
        self.pos += bytes.len();
    }

    /// Length prefix plus bytes; the length was validated when sizing.
    fn put_field(&mut self, bytes: &[u8]) {
        self.put_u16(bytes.len() as u16);
        self.put_bytes(bytes);
    }

    fn finish(self) -> usize {
        self.pos
    }
}

/// Sequential reader over a message body.
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn u8(&mut self) -> Result<u8, Error> {
        let byte = *self.buf.get(self.pos).ok_or(Error::MalformedResponse)?;
        self.pos += 1;
        Ok(byte)
    }

    fn u16(&mut self) -> Result<u16, Error> {
        let value = unpack_u16(&self.buf[self.pos..]).ok_or(Error::MalformedResponse)?;
        self.pos += 2;
        Ok(value)
    }

    fn bytes(&mut self, len: usize) -> Result<&'a [u8], Error> {
        let bytes = self
            .buf
            .get(self.pos..self.pos + len)
            .ok_or(Error::MalformedResponse)?;
        self.pos += len;
        Ok(bytes)
    }

    fn field(&mut self) -> Result<&'a [u8], Error> {
        let len = self.u16()? as usize;
        self.bytes(len)
    }

    fn str(&mut self) -> Result<&'a str, Error> {
        core::str::from_utf8(self.field()?).map_err(|_| Error::MalformedResponse)
    }

    fn rest(&mut self) -> &'a [u8] {
        let rest = &self.buf[self.pos..];
        self.pos = self.buf.len();
        rest
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }
}

/// Connection parameters carried by a CONNECT message.
///
/// This client always announces a last-will message: the broker publishes it,
/// retained, when the device drops off the network without a DISCONNECT.
///
/// # Examples
///
/// ```rust
/// use libmqtt::network::application::mqtt::{Options, QoS};
///
/// let options = Options {
///     client_id: "relay-board-01",
///     will_topic: "relay-board-01/availability",
///     will_message: b"offline",
///     user_name: Some("device"),
///     password: Some("secret"),
///     keep_alive_seconds: 60,
///     clean_session: true,
///     will_qos: QoS::AtMostOnce,
/// };
/// assert_eq!(options.client_id, "relay-board-01");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options<'a> {
    /// The client identifier, must be unique within the broker.
    pub client_id: &'a str,
    /// Topic the will message is published on.
    pub will_topic: &'a str,
    /// The will message itself.
    pub will_message: &'a [u8],
    /// Optional user name.
    pub user_name: Option<&'a str>,
    /// Optional password.
    pub password: Option<&'a str>,
    /// The keep-alive time interval in seconds, 0 disables keep-alive.
    pub keep_alive_seconds: u16,
    /// Whether to start a clean session.
    pub clean_session: bool,
    /// QoS the broker uses when publishing the will.
    pub will_qos: QoS,
}

/// Pack a CONNECT message.
pub fn pack_connect(buf: &mut [u8], options: &Options<'_>) -> Result<usize, Error> {
    let mut flags = connect_flags::WILL_FLAG
        | connect_flags::WILL_RETAIN
        | (((options.will_qos as u8) << 3) & connect_flags::WILL_QOS_MASK);
    if options.clean_session {
        flags |= connect_flags::CLEAN_SESSION;
    }
    flags &= !connect_flags::RESERVED;

    let mut remaining = CONNECT_VARIABLE_HEADER_LEN;
    for field in [
        options.client_id.as_bytes(),
        options.will_topic.as_bytes(),
        options.will_message,
    ] {
        field_len(field)?;
        remaining += 2 + field.len();
    }
    if let Some(user_name) = options.user_name {
        field_len(user_name.as_bytes())?;
        flags |= connect_flags::USER_NAME;
        remaining += 2 + user_name.len();
    }
    if let Some(password) = options.password {
        field_len(password.as_bytes())?;
        flags |= connect_flags::PASSWORD;
        remaining += 2 + password.len();
    }

    let header = FixedHeader::new(ControlType::Connect, to_remaining_length(remaining)?);
    let header_len = pack_fixed_header(buf, &header)?;
    if header_len == 0 {
        return Ok(0);
    }

    let mut out = Cursor::new(buf, header_len);
    out.put_field(PROTOCOL_NAME);
    out.put_u8(PROTOCOL_LEVEL);
    out.put_u8(flags);
    out.put_u16(options.keep_alive_seconds);
    out.put_field(options.client_id.as_bytes());
    out.put_field(options.will_topic.as_bytes());
    out.put_field(options.will_message);
    if let Some(user_name) = options.user_name {
        out.put_field(user_name.as_bytes());
    }
    if let Some(password) = options.password {
        out.put_field(password.as_bytes());
    }
    Ok(out.finish())
}

/// Pack a QoS 0 PUBLISH message.
///
/// The DUP flag is always cleared since QoS 0 messages are never
/// retransmitted. Only [`publish_flags::RETAIN`] is meaningful in `flags`.
pub fn pack_publish(buf: &mut [u8], topic: &str, payload: &[u8], flags: u8) -> Result<usize, Error> {
    if topic.is_empty() {
        return Err(Error::NullArgument);
    }
    let flags = flags & !publish_flags::DUP & 0x0F;
    if flags & publish_flags::QOS_MASK != 0 {
        return Err(Error::PublishForbiddenQos);
    }
    field_len(topic.as_bytes())?;
    let remaining = to_remaining_length(2 + topic.len() + payload.len())?;

    let header = FixedHeader {
        control_type: ControlType::Publish,
        flags,
        remaining_length: remaining,
    };
    let header_len = pack_fixed_header(buf, &header)?;
    if header_len == 0 {
        return Ok(0);
    }

    let mut out = Cursor::new(buf, header_len);
    out.put_field(topic.as_bytes());
    out.put_bytes(payload);
    Ok(out.finish())
}

/// Pack a single-topic SUBSCRIBE message.
pub fn pack_subscribe(buf: &mut [u8], packet_id: u16, topic: &str, max_qos: QoS) -> Result<usize, Error> {
    if topic.is_empty() {
        return Err(Error::NullArgument);
    }
    field_len(topic.as_bytes())?;
    let remaining = to_remaining_length(2 + 2 + topic.len() + 1)?;

    let header = FixedHeader::new(ControlType::Subscribe, remaining);
    let header_len = pack_fixed_header(buf, &header)?;
    if header_len == 0 {
        return Ok(0);
    }

    let mut out = Cursor::new(buf, header_len);
    out.put_u16(packet_id);
    out.put_field(topic.as_bytes());
    out.put_u8(max_qos as u8);
    Ok(out.finish())
}

/// Pack a PINGREQ message.
pub fn pack_ping(buf: &mut [u8]) -> Result<usize, Error> {
    pack_fixed_header(buf, &FixedHeader::new(ControlType::Pingreq, 0))
}

/// Pack a DISCONNECT message.
pub fn pack_disconnect(buf: &mut [u8]) -> Result<usize, Error> {
    pack_fixed_header(buf, &FixedHeader::new(ControlType::Disconnect, 0))
}

/// CONNACK return codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ConnackReturnCode {
    /// Connection accepted.
    Accepted = 0,
    /// The server does not support the requested protocol level.
    RefusedProtocolVersion = 1,
    /// The client identifier is not allowed.
    RefusedIdentifierRejected = 2,
    /// The MQTT service is unavailable.
    RefusedServerUnavailable = 3,
    /// Malformed user name or password.
    RefusedBadUserNameOrPassword = 4,
    /// The client is not authorized to connect.
    RefusedNotAuthorized = 5,
}

impl TryFrom<u8> for ConnackReturnCode {
    type Error = Error;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Ok(match code {
            0 => ConnackReturnCode::Accepted,
            1 => ConnackReturnCode::RefusedProtocolVersion,
            2 => ConnackReturnCode::RefusedIdentifierRejected,
            3 => ConnackReturnCode::RefusedServerUnavailable,
            4 => ConnackReturnCode::RefusedBadUserNameOrPassword,
            5 => ConnackReturnCode::RefusedNotAuthorized,
            _ => return Err(Error::ConnackForbiddenCode),
        })
    }
}

/// A decoded CONNACK.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Connack {
    /// The broker resumed a stored session.
    pub session_present: bool,
    /// Outcome of the connection attempt.
    pub return_code: ConnackReturnCode,
}

/// A decoded PUBLISH, borrowing the buffer it was decoded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishMessage<'a> {
    /// Duplicate delivery flag.
    pub dup: bool,
    /// QoS level the message was delivered at.
    pub qos: u8,
    /// Retained message flag.
    pub retain: bool,
    /// Topic name bytes. UTF-8 validity is not checked.
    pub topic: &'a [u8],
    /// Application payload.
    pub payload: &'a [u8],
    /// Fields extracted by a filtering reassembler. The codec never sets
    /// this; the client attaches it before invoking the publish handler.
    pub fields: Option<&'a FilterFields>,
}

impl<'a> PublishMessage<'a> {
    /// The topic as a string slice, if it is valid UTF-8.
    pub fn topic_str(&self) -> Option<&'a str> {
        core::str::from_utf8(self.topic).ok()
    }

    /// Decode the payload as a JSON document.
    ///
    /// ```rust
    /// use libmqtt::network::application::mqtt::PublishMessage;
    ///
    /// #[derive(serde::Deserialize)]
    /// struct Switch {
    ///     idx: u32,
    ///     nvalue: u8,
    /// }
    ///
    /// let msg = PublishMessage {
    ///     dup: false,
    ///     qos: 0,
    ///     retain: false,
    ///     topic: b"domoticz/out",
    ///     payload: br#"{"idx": 7, "nvalue": 1}"#,
    ///     fields: None,
    /// };
    /// let switch: Switch = msg.payload_json().unwrap();
    /// assert_eq!((switch.idx, switch.nvalue), (7, 1));
    /// ```
    pub fn payload_json<T: serde::Deserialize<'a>>(&self) -> Result<T, Error> {
        serde_json_core::from_slice(self.payload)
            .map(|(value, _)| value)
            .map_err(|_| Error::InvalidPayload)
    }
}

/// A decoded SUBACK, borrowing the buffer it was decoded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Suback<'a> {
    /// Identifier of the SUBSCRIBE being acknowledged.
    pub packet_id: u16,
    /// One granted QoS (or [`SUBACK_FAILURE`]) per requested topic.
    pub return_codes: &'a [u8],
}

/// A message received from the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response<'a> {
    /// Connect acknowledgment.
    Connack(Connack),
    /// Application message.
    Publish(PublishMessage<'a>),
    /// Subscribe acknowledgment.
    Suback(Suback<'a>),
    /// Ping response.
    Pingresp,
}

/// A message sent by a client, as seen by a broker.
///
/// Decoding requests is not needed on the device; it exists so that mock
/// brokers and host tools can inspect what the engine put on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request<'a> {
    /// Connection request.
    Connect(Options<'a>),
    /// Application message.
    Publish(PublishMessage<'a>),
    /// Subscription request.
    Subscribe {
        /// Packet identifier.
        packet_id: u16,
        /// Topic filter.
        topic: &'a str,
        /// Requested maximum QoS.
        max_qos: QoS,
    },
    /// Ping request.
    Pingreq,
    /// Disconnect notification.
    Disconnect,
}

/// Unpack a CONNACK body.
pub fn unpack_connack(header: &FixedHeader, body: &[u8]) -> Result<(Connack, usize), Error> {
    if header.remaining_length != 2 {
        return Err(Error::MalformedResponse);
    }
    let mut r = Reader::new(body);
    let ack_flags = r.u8()?;
    if ack_flags & 0xFE != 0 {
        return Err(Error::ConnackForbiddenFlags);
    }
    let return_code = ConnackReturnCode::try_from(r.u8()?)?;
    Ok((
        Connack {
            session_present: ack_flags & 0x01 != 0,
            return_code,
        },
        2,
    ))
}

/// Unpack a PUBLISH body.
///
/// The payload length is whatever follows the topic inside the Remaining
/// Length.
pub fn unpack_publish<'a>(header: &FixedHeader, body: &'a [u8]) -> Result<(PublishMessage<'a>, usize), Error> {
    let remaining = header.remaining_length as usize;
    if remaining < 4 {
        return Err(Error::MalformedResponse);
    }
    let body = body.get(..remaining).ok_or(Error::MalformedResponse)?;
    let mut r = Reader::new(body);
    let topic = r.field()?;
    let payload = r.rest();
    Ok((
        PublishMessage {
            dup: header.flags & publish_flags::DUP != 0,
            qos: (header.flags & publish_flags::QOS_MASK) >> 1,
            retain: header.flags & publish_flags::RETAIN != 0,
            topic,
            payload,
            fields: None,
        },
        remaining,
    ))
}

/// Unpack a SUBACK body.
pub fn unpack_suback<'a>(header: &FixedHeader, body: &'a [u8]) -> Result<(Suback<'a>, usize), Error> {
    let remaining = header.remaining_length as usize;
    // packet id plus at least one return code
    if remaining < 3 {
        return Err(Error::MalformedResponse);
    }
    let body = body.get(..remaining).ok_or(Error::MalformedResponse)?;
    let mut r = Reader::new(body);
    let packet_id = r.u16()?;
    let return_codes = r.rest();
    Ok((
        Suback {
            packet_id,
            return_codes,
        },
        remaining,
    ))
}

/// Unpack one broker-to-client message from the start of `buf`.
///
/// Returns the response and the total bytes it occupied, or `Ok(None)` if
/// `buf` holds only part of a message.
pub fn unpack_response(buf: &[u8]) -> Result<Option<(Response<'_>, usize)>, Error> {
    let Some((header, header_len)) = unpack_fixed_header(buf)? else {
        return Ok(None);
    };
    let body = &buf[header_len..];
    let (response, body_len) = match header.control_type {
        ControlType::Connack => {
            let (connack, n) = unpack_connack(&header, body)?;
            (Response::Connack(connack), n)
        }
        ControlType::Publish => {
            let (publish, n) = unpack_publish(&header, body)?;
            (Response::Publish(publish), n)
        }
        ControlType::Suback => {
            let (suback, n) = unpack_suback(&header, body)?;
            (Response::Suback(suback), n)
        }
        ControlType::Pingresp => (Response::Pingresp, 0),
        _ => return Err(Error::ResponseInvalidControlType),
    };
    Ok(Some((response, header_len + body_len)))
}

/// Unpack one client-to-broker message from the start of `buf`.
pub fn unpack_request(buf: &[u8]) -> Result<Option<(Request<'_>, usize)>, Error> {
    let Some((header, header_len)) = unpack_fixed_header(buf)? else {
        return Ok(None);
    };
    let total = header_len + header.remaining_length as usize;
    let body = &buf[header_len..total];
    let request = match header.control_type {
        ControlType::Connect => Request::Connect(unpack_connect(body)?),
        ControlType::Publish => {
            let mut r = Reader::new(body);
            let topic = r.field()?;
            Request::Publish(PublishMessage {
                dup: header.flags & publish_flags::DUP != 0,
                qos: (header.flags & publish_flags::QOS_MASK) >> 1,
                retain: header.flags & publish_flags::RETAIN != 0,
                topic,
                payload: r.rest(),
                fields: None,
            })
        }
        ControlType::Subscribe => {
            let mut r = Reader::new(body);
            let packet_id = r.u16()?;
            let topic = r.str()?;
            let max_qos = QoS::from_bits(r.u8()?).ok_or(Error::MalformedResponse)?;
            if !r.is_empty() {
                // more than one topic filter
                return Err(Error::MalformedResponse);
            }
            Request::Subscribe {
                packet_id,
                topic,
                max_qos,
            }
        }
        ControlType::Pingreq => Request::Pingreq,
        ControlType::Disconnect => Request::Disconnect,
        _ => return Err(Error::ResponseInvalidControlType),
    };
    Ok(Some((request, total)))
}

fn unpack_connect(body: &[u8]) -> Result<Options<'_>, Error> {
    let mut r = Reader::new(body);
    if r.field()? != PROTOCOL_NAME || r.u8()? != PROTOCOL_LEVEL {
        return Err(Error::MalformedResponse);
    }
    let flags = r.u8()?;
    if flags & connect_flags::RESERVED != 0 || flags & connect_flags::WILL_FLAG == 0 {
        return Err(Error::MalformedResponse);
    }
    let keep_alive_seconds = r.u16()?;
    let client_id = r.str()?;
    let will_topic = r.str()?;
    let will_message = r.field()?;
    let user_name = match flags & connect_flags::USER_NAME {
        0 => None,
        _ => Some(r.str()?),
    };
    let password = match flags & connect_flags::PASSWORD {
        0 => None,
        _ => Some(r.str()?),
    };
    Ok(Options {
        client_id,
        will_topic,
        will_message,
        user_name,
        password,
        keep_alive_seconds,
        clean_session: flags & connect_flags::CLEAN_SESSION != 0,
        will_qos: QoS::from_bits((flags & connect_flags::WILL_QOS_MASK) >> 3)
            .ok_or(Error::MalformedResponse)?,
    })
}

/// Pack a CONNACK, as a broker would send it.
pub fn pack_connack(buf: &mut [u8], connack: &Connack) -> Result<usize, Error> {
    let header_len = pack_fixed_header(buf, &FixedHeader::new(ControlType::Connack, 2))?;
    if header_len == 0 {
        return Ok(0);
    }
    let mut out = Cursor::new(buf, header_len);
    out.put_u8(connack.session_present as u8);
    out.put_u8(connack.return_code as u8);
    Ok(out.finish())
}

/// Pack a SUBACK, as a broker would send it.
pub fn pack_suback(buf: &mut [u8], suback: &Suback<'_>) -> Result<usize, Error> {
    let remaining = to_remaining_length(2 + suback.return_codes.len())?;
    let header_len = pack_fixed_header(buf, &FixedHeader::new(ControlType::Suback, remaining))?;
    if header_len == 0 {
        return Ok(0);
    }
    let mut out = Cursor::new(buf, header_len);
    out.put_u16(suback.packet_id);
    out.put_bytes(suback.return_codes);
    Ok(out.finish())
}

/// Pack a PINGRESP, as a broker would send it.
pub fn pack_pingresp(buf: &mut [u8]) -> Result<usize, Error> {
    pack_fixed_header(buf, &FixedHeader::new(ControlType::Pingresp, 0))
}
