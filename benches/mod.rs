use criterion::{criterion_group, criterion_main};

mod network;

criterion_group!(
    benches,
    network::mqtt::bench_pack_publish,
    network::mqtt::bench_unpack_response,
    network::mqtt::bench_reassemble,
    network::mqtt::bench_filter,
    network::mqtt::bench_publish_and_sync
);
criterion_main!(benches);
