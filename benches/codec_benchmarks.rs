// ABOUTME: Benchmark suite for the CHAT frame and RUDP packet codecs
// ABOUTME: measures encode/decode throughput and ingress-buffer completeness checks

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use netcourse::chat::frame::{Frame, FrameType, PeerName};
use netcourse::rudp::packet::Packet;
use std::time::Duration;

fn sample_chat_frame(body_len: usize) -> Frame {
    Frame {
        frame_type: FrameType::Chat.into(),
        source: PeerName::try_from("alice").unwrap(),
        destination: PeerName::try_from("bob").unwrap(),
        msg_id: 7,
        data: Bytes::from(vec![0u8; body_len]),
    }
}

fn bench_chat_frame_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("chat_frame_encode");
    for body_len in [0, 64, 400] {
        let frame = sample_chat_frame(body_len);
        group.bench_with_input(BenchmarkId::from_parameter(body_len), &frame, |b, frame| {
            b.iter(|| black_box(frame.encode().unwrap()));
        });
    }
    group.finish();
}

fn bench_chat_frame_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("chat_frame_decode");
    for body_len in [0, 64, 400] {
        let encoded = sample_chat_frame(body_len).encode().unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(body_len), &encoded, |b, encoded| {
            b.iter(|| black_box(Frame::parse(encoded).unwrap()));
        });
    }
    group.finish();
}

fn bench_chat_frame_completeness_check(c: &mut Criterion) {
    let encoded = sample_chat_frame(400).encode().unwrap();
    c.bench_function("chat_frame_check_complete", |b| {
        b.iter(|| black_box(Frame::check(&encoded).unwrap()));
    });
}

fn bench_rudp_data_packet_roundtrip(c: &mut Criterion) {
    let mut group = c.benchmark_group("rudp_data_packet");
    for payload_len in [1, 256, 512] {
        let packet = Packet::Data {
            seqno: 3,
            payload: Bytes::from(vec![0u8; payload_len]),
        };
        group.bench_with_input(BenchmarkId::from_parameter(payload_len), &packet, |b, packet| {
            b.iter(|| {
                let encoded = packet.encode().unwrap();
                black_box(Packet::decode(&encoded).unwrap())
            });
        });
    }
    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default().measurement_time(Duration::from_secs(5));
    targets = bench_chat_frame_encode, bench_chat_frame_decode, bench_chat_frame_completeness_check, bench_rudp_data_packet_roundtrip
}
criterion_main!(benches);
