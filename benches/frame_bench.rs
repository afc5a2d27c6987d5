//! Performance benchmarks for frame parsing.
//!
//! Every read burst of a session goes through `FrameParser::try_parse`, so
//! the cost of a match (and of rejecting noise) bounds how fast a session
//! gets back to waiting on its port.
//!
//! # Run Benchmarks
//!
//! ```sh
//! # Run all frame benchmarks
//! cargo bench --bench frame_bench
//!
//! # Run one group
//! cargo bench --bench frame_bench -- leser9
//!
//! # Compare against a saved baseline
//! cargo bench --bench frame_bench -- --save-baseline main
//! cargo bench --bench frame_bench -- --baseline main
//! ```
//!
//! # Expected Results
//!
//! - Leading noise is rejected at the first byte, well below a full match
//! - A buffer at the 1024 byte limit costs a linear scan of the wildcard

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use strikeplate_core::{ReaderId, ReaderVariant, constants::MAX_FRAME_BUFFER};
use strikeplate_protocol::FrameParser;

fn leser7plus_buffer(trailer: usize) -> Vec<u8> {
    let mut buffer = b"\x0201EMAB12EF34CD".to_vec();
    buffer.extend(std::iter::repeat_n(b'0', trailer));
    buffer.push(0x04);
    buffer
}

fn leser9_buffer(trailer: usize) -> Vec<u8> {
    let mut buffer = b"\x02RAB12EF34CD\x04".to_vec();
    buffer.extend(std::iter::repeat_n(b'\r', trailer));
    buffer
}

/// Benchmark Leser 7plus matching with growing wildcard sections.
fn bench_leser7plus(c: &mut Criterion) {
    let parser = FrameParser::new(ReaderVariant::Leser7Plus, None).unwrap();
    let mut group = c.benchmark_group("leser7plus");

    for trailer in [4, 64, MAX_FRAME_BUFFER - 16] {
        let buffer = leser7plus_buffer(trailer);
        group.throughput(Throughput::Bytes(buffer.len() as u64));
        group.bench_with_input(BenchmarkId::new("valid", buffer.len()), &buffer, |b, buf| {
            b.iter(|| black_box(parser.try_parse(black_box(buf))));
        });
    }

    group.finish();
}

/// Benchmark Leser 9 matching, including rejection paths.
fn bench_leser9(c: &mut Criterion) {
    let parser =
        FrameParser::new(ReaderVariant::Leser9, Some(ReaderId::new("D1").unwrap())).unwrap();
    let mut group = c.benchmark_group("leser9");
    group.throughput(Throughput::Elements(1));

    let scenarios: Vec<(&str, Vec<u8>)> = vec![
        ("valid", leser9_buffer(0)),
        ("trailing_noise", leser9_buffer(32)),
        ("leading_noise", [b"xx".as_slice(), &leser9_buffer(0)[..]].concat()),
        ("truncated", b"\x02RAB12E".to_vec()),
        ("lower_case", b"\x02Rab12ef34cd\x04".to_vec()),
    ];

    for (name, buffer) in scenarios {
        group.bench_function(name, |b| {
            b.iter(|| black_box(parser.try_parse(black_box(&buffer))));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_leser7plus, bench_leser9);
criterion_main!(benches);
