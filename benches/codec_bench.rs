//! Benchmarks for DriftKV codec operations

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use driftkv::protocol::{encode_command, Command, ResponseDecoder};

fn codec_benchmarks(c: &mut Criterion) {
    let small = Command::Set {
        key: "bench".to_string(),
        value: Bytes::from_static(b"value1"),
        expire_secs: Some(300),
    };
    c.bench_function("encode_set_small", |b| {
        b.iter(|| encode_command(black_box(&small)).unwrap())
    });

    let large = Command::Set {
        key: "bench".to_string(),
        value: vec![b'a'; 64 * 1024].into(),
        expire_secs: None,
    };
    c.bench_function("encode_set_chunked_64k", |b| {
        b.iter(|| encode_command(black_box(&large)).unwrap())
    });

    let reply = b"OK\r\n\r\nvalue1\r\n\r\n";
    c.bench_function("decode_get_reply", |b| {
        b.iter(|| {
            let mut decoder = ResponseDecoder::new();
            decoder.feed(black_box(reply));
            decoder.try_decode().unwrap().unwrap()
        })
    });

    let mut chunked_reply = b"OK\r\ntransfer-encoding: chunked\r\n\r\n".to_vec();
    for chunk in vec![b'a'; 64 * 1024].chunks(4096) {
        chunked_reply.extend_from_slice(format!("{}\r\n", chunk.len()).as_bytes());
        chunked_reply.extend_from_slice(chunk);
        chunked_reply.extend_from_slice(b"\r\n");
    }
    chunked_reply.extend_from_slice(b"0\r\n\r\n");
    c.bench_function("decode_chunked_reply_64k", |b| {
        b.iter(|| {
            let mut decoder = ResponseDecoder::new();
            decoder.feed(black_box(&chunked_reply));
            decoder.try_decode().unwrap().unwrap()
        })
    });
}

criterion_group!(benches, codec_benchmarks);
criterion_main!(benches);
