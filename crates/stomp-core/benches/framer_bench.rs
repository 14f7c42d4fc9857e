//! Criterion benchmarks for the STOMP framer.
//!
//! Measures boundary detection for small and large frames on both body-length
//! paths (declared `content-length` and NUL scan).
//!
//! Run with:
//! ```bash
//! cargo bench --package stomp-core --bench framer_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use stomp_core::{Frame, Framer};

fn make_frame(body_len: usize, declare_length: bool) -> Vec<u8> {
    let frame = Frame::new("MESSAGE")
        .with_header("destination", "/topic/bench")
        .with_header("message-id", "ID:bench-1:1:1:1");
    let frame = if declare_length {
        frame.with_header("content-length", body_len)
    } else {
        frame
    };
    frame.with_body(vec![b'x'; body_len]).to_bytes()
}

fn bench_fill_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("fill_frame");
    for &body_len in &[16usize, 1024, 64 * 1024] {
        for &declared in &[false, true] {
            let bytes = make_frame(body_len, declared);
            let label = if declared { "content_length" } else { "nul_scan" };
            group.bench_with_input(BenchmarkId::new(label, body_len), &bytes, |b, bytes| {
                let mut frame = Frame::default();
                b.iter(|| {
                    let consumed = Framer::new().fill_frame(black_box(bytes), &mut frame);
                    black_box(consumed)
                });
            });
        }
    }
    group.finish();
}

fn bench_incomplete_frame(c: &mut Criterion) {
    let bytes = make_frame(64 * 1024, true);
    let partial = &bytes[..bytes.len() / 2];
    c.bench_function("fill_frame_incomplete_64k", |b| {
        let mut frame = Frame::default();
        b.iter(|| black_box(Framer::new().fill_frame(black_box(partial), &mut frame)));
    });
}

criterion_group!(benches, bench_fill_frame, bench_incomplete_frame);
criterion_main!(benches);
