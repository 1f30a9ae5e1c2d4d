// Codec benchmarks for the XToken wire layer.
//
// Covers encoding and decoding of the cross-transfer payload at several data
// sizes, plus address parsing on the inbound hot path.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use xtoken_protocol::{Amount, Message, NetworkAddress};

fn cross_transfer(data_len: usize) -> Message {
    Message::CrossTransfer {
        from: "0x1.icon/hxc0007b426f8880f9afbab72fd8c7817f0d3fd5c0".into(),
        to: "0x5.moonbeam/0x5425F5d4ba2B7dcb277C369cCbCb5f0E7185FB41".into(),
        value: Amount::from(1u64 << 18) * Amount::from(10u64).pow(Amount::from(18u64)),
        data: vec![0xAB; data_len],
    }
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec/encode_cross_transfer");
    for size in [0usize, 64, 1024, 16 * 1024] {
        let msg = cross_transfer(size);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &msg, |b, msg| {
            b.iter(|| msg.encode());
        });
    }
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec/decode_cross_transfer");
    for size in [0usize, 64, 1024, 16 * 1024] {
        let payload = cross_transfer(size).encode();
        group.throughput(Throughput::Bytes(payload.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &payload, |b, payload| {
            b.iter(|| Message::decode(payload).expect("valid payload"));
        });
    }
    group.finish();
}

fn bench_decode_revert(c: &mut Criterion) {
    let payload = Message::CrossTransferRevert {
        to: "1.ETH/0x32".into(),
        value: Amount::from(262_144u64),
    }
    .encode();

    c.bench_function("codec/decode_cross_transfer_revert", |b| {
        b.iter(|| Message::decode(&payload).expect("valid payload"));
    });
}

fn bench_parse_address(c: &mut Criterion) {
    c.bench_function("address/parse", |b| {
        b.iter(|| NetworkAddress::parse("0x5.moonbeam/0x5425F5d4ba2B7dcb277C369cCbCb5f0E7185FB41"));
    });
}

criterion_group!(
    benches,
    bench_encode,
    bench_decode,
    bench_decode_revert,
    bench_parse_address,
);
criterion_main!(benches);
