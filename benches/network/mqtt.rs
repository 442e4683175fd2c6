use criterion::{BatchSize, Criterion, Throughput};
use libmqtt::network::application::mqtt::codec;
use libmqtt::network::application::mqtt::reassembler::{Mode, Progress, Reassembler};
use libmqtt::network::application::mqtt::{Client, ClientConfig, Options, PublishMessage, QoS};
use libmqtt::network::{Receive, TimeSource, Write};
use std::hint::black_box;

const TOPIC: &str = "libmqtt/bench-topic";

const DOMOTICZ_UPDATE: &[u8] = b"{\n\t\"Battery\" : 255,\n\t\"RSSI\" : 12,\n\t\"description\" : \"\",\n\t\"dtype\" : \"Light/Switch\",\n\t\"id\" : \"00014051\",\n\t\"idx\" : 42,\n\t\"name\" : \"Kitchen light\",\n\t\"nvalue\" : 1,\n\t\"stype\" : \"Switch\",\n\t\"svalue1\" : \"0\",\n\t\"switchType\" : \"On/Off\",\n\t\"unit\" : 1\n}\n";

struct Segment<'a>(&'a [u8]);

impl Receive for Segment<'_> {
    fn new_data(&self) -> bool {
        !self.0.is_empty()
    }

    fn acked(&self) -> bool {
        false
    }

    fn segment(&self) -> &[u8] {
        self.0
    }
}

/// Accepts and forgets everything.
struct Discard;

impl Write for Discard {
    type Error = ();

    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

struct Frozen;

impl TimeSource for Frozen {
    fn now_secs(&self) -> u32 {
        0
    }
}

fn publish_bytes(topic: &str, payload: &[u8]) -> Vec<u8> {
    let mut buf = vec![0u8; topic.len() + payload.len() + 8];
    let n = codec::pack_publish(&mut buf, topic, payload, 0).expect("Failed to pack");
    buf.truncate(n);
    buf
}

fn drain<const P: usize>(reassembler: &mut Reassembler<P>, stream: &[u8]) -> usize {
    let mut staged = 0;
    let mut input = stream;
    while !input.is_empty() {
        let (consumed, progress) = reassembler.advance(input).expect("Failed to reassemble");
        input = &input[consumed..];
        if progress == Progress::Staged {
            staged += 1;
            reassembler.reset();
        }
    }
    staged
}

pub fn bench_pack_publish(c: &mut Criterion) {
    let mut group = c.benchmark_group("pack_publish");
    let payload = b"hello from pack_publish";
    group.throughput(Throughput::Bytes(payload.len() as u64));
    group.bench_function("pack_publish", |b| {
        let mut buf = [0u8; 128];
        b.iter(|| codec::pack_publish(black_box(&mut buf), TOPIC, black_box(payload), 0))
    });
    group.finish();
}

pub fn bench_unpack_response(c: &mut Criterion) {
    let mut group = c.benchmark_group("unpack_response");
    let message = publish_bytes(TOPIC, b"hello from unpack_response");
    group.throughput(Throughput::Bytes(message.len() as u64));
    group.bench_function("unpack_publish", |b| {
        b.iter(|| codec::unpack_response(black_box(&message)).expect("Failed to unpack"))
    });
    group.finish();
}

pub fn bench_reassemble(c: &mut Criterion) {
    let mut group = c.benchmark_group("reassemble");
    let stream: Vec<u8> = (0..50).flat_map(|_| publish_bytes(TOPIC, b"hello world from bench")).collect();
    group.throughput(Throughput::Bytes(stream.len() as u64));
    group.bench_function("generic_50_messages", |b| {
        let mut reassembler: Reassembler<256> = Reassembler::new(Mode::Generic, 0);
        b.iter(|| drain(&mut reassembler, black_box(&stream)))
    });
    group.finish();
}

pub fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter");
    let message = publish_bytes("domoticz/out", DOMOTICZ_UPDATE);
    group.throughput(Throughput::Bytes(message.len() as u64));
    group.bench_function("domoticz_update", |b| {
        let mut reassembler: Reassembler<64> = Reassembler::new(Mode::Filtering, 59);
        b.iter(|| drain(&mut reassembler, black_box(&message)))
    });
    group.finish();
}

pub fn bench_publish_and_sync(c: &mut Criterion) {
    let mut group = c.benchmark_group("publish_and_sync");
    let payload = b"hello world from bench";
    group.throughput(Throughput::Bytes(payload.len() as u64 * 50));

    group.bench_function("publish_and_sync_qos0", |b| {
        b.iter_batched_ref(
            || [0u8; 1024],
            |buffer| {
                let mut client: Client<'_, _, 64> = Client::new(
                    buffer,
                    Mode::Generic,
                    |_: &PublishMessage<'_>| {},
                    &ClientConfig::default(),
                );
                client
                    .connect(&Options {
                        client_id: "libmqtt-bench",
                        will_topic: "libmqtt-bench/status",
                        will_message: b"offline",
                        user_name: None,
                        password: None,
                        keep_alive_seconds: 0,
                        clean_session: true,
                        will_qos: QoS::AtMostOnce,
                    })
                    .expect("Failed to connect");
                client
                    .sync(&Segment(&[]), &mut Discard, &Frozen)
                    .expect("Failed to sync");
                client
                    .sync(&Segment(&[0x20, 0x02, 0x00, 0x00]), &mut Discard, &Frozen)
                    .expect("Failed to sync");
                for _ in 0..50 {
                    client.publish(TOPIC, payload, false).expect("Failed to publish");
                    client.sync(&Segment(&[]), &mut Discard, &Frozen).expect("Failed to sync");
                }
            },
            BatchSize::SmallInput,
        )
    });
    group.finish();
}
