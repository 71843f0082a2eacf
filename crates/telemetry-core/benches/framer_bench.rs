//! Criterion benchmarks for line framing and decoding.
//!
//! The server broadcasts one `DATA` line per tick to every client, so the
//! framer + decoder path runs for each line a console ever receives.
//!
//! Run with:
//! ```bash
//! cargo bench --package telemetry-core --bench framer_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use telemetry_core::protocol::{decode_line, Decoder, LineFramer, Session};

const DATA_LINE: &str =
    "DATA speed=52.3 battery=89.0 temp=36.2 heading=175.0 ts=1700000000000\r\n";

fn make_stream(lines: usize) -> Vec<u8> {
    DATA_LINE.repeat(lines).into_bytes()
}

fn bench_framing(c: &mut Criterion) {
    let mut group = c.benchmark_group("framer");
    let stream = make_stream(256);

    for chunk in [16usize, 512, 4096] {
        group.bench_with_input(BenchmarkId::new("feed", chunk), &chunk, |b, &chunk| {
            b.iter(|| {
                let mut framer = LineFramer::new();
                let mut count = 0usize;
                for piece in stream.chunks(chunk) {
                    count += framer.feed(black_box(piece)).count();
                }
                count
            })
        });
    }
    group.finish();
}

fn bench_decoding(c: &mut Criterion) {
    let line = DATA_LINE.trim_end();

    c.bench_function("decode_line/data", |b| {
        b.iter(|| decode_line(black_box(line), Session::default()))
    });

    c.bench_function("decoder/users_listing", |b| {
        b.iter(|| {
            let mut decoder = Decoder::new();
            decoder.decode(black_box("USERS count=3"));
            for i in 0..3 {
                let entry = format!("USER {i} ip=10.0.0.{i} port=5000 role=VIEWER name=-");
                decoder.decode(black_box(&entry));
            }
            decoder.decode(black_box("OK users"))
        })
    });
}

criterion_group!(benches, bench_framing, bench_decoding);
criterion_main!(benches);
