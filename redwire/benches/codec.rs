use bytes::{Bytes, BytesMut};
use criterion::{criterion_group, criterion_main, Criterion};
use redwire::protocol::{decode, encode_command};
use redwire::ProtocolVersion;
use std::hint::black_box;
use std::io::Cursor;

fn bench_encode(c: &mut Criterion) {
    let args = [
        Bytes::from_static(b"benchmark:key"),
        Bytes::from_static(b"some moderately sized value payload"),
    ];

    c.bench_function("encode SET", |b| {
        b.iter(|| {
            let mut buf = BytesMut::with_capacity(128);
            encode_command(&mut buf, black_box("SET"), black_box(&args));
            black_box(buf);
        });
    });
}

fn bench_decode(c: &mut Criterion) {
    let bulk = b"$35\r\nsome moderately sized value payload\r\n";
    let nested = b"*3\r\n:42\r\n$5\r\nhello\r\n*2\r\n+OK\r\n$-1\r\n";

    c.bench_function("decode bulk (resp2)", |b| {
        b.iter(|| {
            let mut cursor = Cursor::new(&bulk[..]);
            black_box(decode(ProtocolVersion::Resp2, &mut cursor).unwrap());
        });
    });

    c.bench_function("decode nested array (resp2)", |b| {
        b.iter(|| {
            let mut cursor = Cursor::new(&nested[..]);
            black_box(decode(ProtocolVersion::Resp2, &mut cursor).unwrap());
        });
    });

    let resp3_map = b"%2\r\n+first\r\n:1\r\n+second\r\n,3.5\r\n";
    c.bench_function("decode map (resp3)", |b| {
        b.iter(|| {
            let mut cursor = Cursor::new(&resp3_map[..]);
            black_box(decode(ProtocolVersion::Resp3, &mut cursor).unwrap());
        });
    });
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
