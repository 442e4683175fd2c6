#![allow(dead_code)]

use libmqtt::network::application::mqtt::codec::{self, Request};
use libmqtt::network::application::mqtt::{
    Client, Error as MqttError, Options, PublishHandler, PublishMessage, QoS,
};
use libmqtt::network::error::Error;
use libmqtt::network::{Receive, TimeSource, Write};

/// Receiving side of the in-memory link: one segment at a time.
#[derive(Debug, Default)]
pub struct Inbound {
    segment: Vec<u8>,
    fresh: bool,
    acked: bool,
}

impl Receive for Inbound {
    fn new_data(&self) -> bool {
        self.fresh
    }

    fn acked(&self) -> bool {
        self.acked
    }

    fn segment(&self) -> &[u8] {
        &self.segment
    }
}

/// Sending side of the in-memory link: every written byte is recorded.
#[derive(Debug, Default)]
pub struct Outbound {
    pub sent: Vec<u8>,
    /// Accept at most this many bytes per write.
    pub write_limit: Option<usize>,
    pub fail_writes: bool,
    pub flushes: usize,
}

impl Write for Outbound {
    type Error = Error;

    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        if self.fail_writes {
            return Err(Error::WriteError);
        }
        let len = self.write_limit.map_or(buf.len(), |limit| buf.len().min(limit));
        self.sent.extend_from_slice(&buf[..len]);
        Ok(len)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.flushes += 1;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MockLink {
    pub rx: Inbound,
    pub tx: Outbound,
}

impl MockLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `bytes` the next segment.
    pub fn deliver(&mut self, bytes: &[u8]) {
        self.rx.segment = bytes.to_vec();
        self.rx.fresh = true;
        self.rx.acked = false;
    }

    /// Deliver `bytes` piggy-backed on an acknowledgment.
    pub fn deliver_with_ack(&mut self, bytes: &[u8]) {
        self.rx.segment = bytes.to_vec();
        self.rx.fresh = false;
        self.rx.acked = true;
    }

    /// Nothing new arrived.
    pub fn idle(&mut self) {
        self.rx.segment.clear();
        self.rx.fresh = false;
        self.rx.acked = false;
    }

    /// Take everything written so far.
    pub fn take_sent(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.tx.sent)
    }

    /// Run one client sync over the current segment, then mark it consumed.
    pub fn sync<H: PublishHandler, const P: usize>(
        &mut self,
        client: &mut Client<'_, H, P>,
        now: u32,
    ) -> Result<(), MqttError> {
        let result = client.sync(&self.rx, &mut self.tx, &MockClock(now));
        self.idle();
        result
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MockClock(pub u32);

impl TimeSource for MockClock {
    fn now_secs(&self) -> u32 {
        self.0
    }
}

/// A received application message, copied out of the reassembly buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Received {
    pub topic: Vec<u8>,
    pub payload: Vec<u8>,
    pub retain: bool,
    pub idx: Option<String>,
    pub nvalue: Option<String>,
}

#[derive(Debug, Default)]
pub struct Recorder {
    pub messages: Vec<Received>,
}

impl PublishHandler for Recorder {
    fn on_publish(&mut self, message: &PublishMessage<'_>) {
        self.messages.push(Received {
            topic: message.topic.to_vec(),
            payload: message.payload.to_vec(),
            retain: message.retain,
            idx: message.fields.map(|f| f.idx.as_str().to_owned()),
            nvalue: message.fields.map(|f| f.nvalue.as_str().to_owned()),
        });
    }
}

/// Decode every message the client wrote.
pub fn requests(bytes: &[u8]) -> Vec<Request<'_>> {
    let mut out = Vec::new();
    let mut rest = bytes;
    while !rest.is_empty() {
        let (request, consumed) = codec::unpack_request(rest)
            .expect("client wrote an invalid message")
            .expect("client wrote a truncated message");
        out.push(request);
        rest = &rest[consumed..];
    }
    out
}

pub fn options(keep_alive_seconds: u16) -> Options<'static> {
    Options {
        client_id: "libmqtt-test",
        will_topic: "libmqtt-test/status",
        will_message: b"offline",
        user_name: None,
        password: None,
        keep_alive_seconds,
        clean_session: true,
        will_qos: QoS::AtMostOnce,
    }
}

pub fn publish_bytes(topic: &str, payload: &[u8]) -> Vec<u8> {
    let mut buf = vec![0u8; topic.len() + payload.len() + 8];
    let n = codec::pack_publish(&mut buf, topic, payload, 0).unwrap();
    buf.truncate(n);
    buf
}

pub const CONNACK_ACCEPTED: [u8; 4] = [0x20, 0x02, 0x00, 0x00];
pub const PINGRESP: [u8; 2] = [0xD0, 0x00];

pub fn suback(packet_id: u16, code: u8) -> [u8; 5] {
    let [hi, lo] = packet_id.to_be_bytes();
    [0x90, 0x03, hi, lo, code]
}

pub const DOMOTICZ_UPDATE: &[u8] = b"{\n\t\"Battery\" : 255,\n\t\"RSSI\" : 12,\n\t\"description\" : \"\",\n\t\"dtype\" : \"Light/Switch\",\n\t\"id\" : \"00014051\",\n\t\"idx\" : 42,\n\t\"name\" : \"Kitchen light\",\n\t\"nvalue\" : 1,\n\t\"stype\" : \"Switch\",\n\t\"svalue1\" : \"0\",\n\t\"switchType\" : \"On/Off\",\n\t\"unit\" : 1\n}\n";
