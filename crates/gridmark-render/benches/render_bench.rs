//! Benchmarks for the diffing renderer.
//!
//! Compares the cost of each render path on common screen sizes:
//! - full: cold renderer, every line regenerated
//! - partial: one line changed since the previous frame
//! - unchanged: identical buffer, previous markup reused
//!
//! Run with: cargo bench -p gridmark-render --bench render_bench

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use gridmark_render::buffer::Buffer;
use gridmark_render::cell::{NamedColor, Style};
use gridmark_render::drawing::{BorderStyle, Draw};
use gridmark_render::renderer::Renderer;
use std::hint::black_box;

fn sample_screen(w: u16, h: u16) -> Buffer {
    let mut buf = Buffer::new(w, h);
    buf.draw_box(0, 0, w, h, BorderStyle::Rounded);
    for y in 1..h.saturating_sub(1) {
        buf.write_at(2, y, "The quick brown fox jumps over the lazy dog");
    }
    buf.write_styled(2, 1, "status: ok", Style::new().bold().fg(NamedColor::Green));
    buf
}

// =============================================================================
// Render paths
// =============================================================================

fn bench_render_paths(c: &mut Criterion) {
    let mut group = c.benchmark_group("renderer/paths");

    for (w, h) in [(80, 24), (120, 40), (200, 60)] {
        let cells = w as u64 * h as u64;
        group.throughput(Throughput::Elements(cells));
        let screen = sample_screen(w, h);

        group.bench_with_input(
            BenchmarkId::new("full", format!("{w}x{h}")),
            &screen,
            |b, screen| {
                b.iter(|| {
                    let mut renderer = Renderer::new();
                    black_box(renderer.render(screen))
                })
            },
        );

        let mut renderer = Renderer::new();
        let mut alternate = screen.clone();
        let mut tick = 0u32;
        group.bench_with_input(
            BenchmarkId::new("partial", format!("{w}x{h}")),
            &(),
            |b, _| {
                b.iter(|| {
                    tick = tick.wrapping_add(1);
                    alternate.write_at(2, h / 2, &format!("{tick:>8}"));
                    black_box(renderer.render(&alternate))
                })
            },
        );

        let mut warm = Renderer::new();
        warm.render(&screen);
        group.bench_with_input(
            BenchmarkId::new("unchanged", format!("{w}x{h}")),
            &screen,
            |b, screen| b.iter(|| black_box(warm.render(screen))),
        );
    }

    group.finish();
}

// =============================================================================
// Buffer fingerprint
// =============================================================================

fn bench_fingerprint(c: &mut Criterion) {
    let mut group = c.benchmark_group("buffer/fingerprint");

    for (w, h) in [(80, 24), (200, 60)] {
        group.throughput(Throughput::Elements(w as u64 * h as u64));
        let screen = sample_screen(w, h);
        group.bench_with_input(
            BenchmarkId::new("fnv1a", format!("{w}x{h}")),
            &screen,
            |b, screen| b.iter(|| black_box(screen.fingerprint())),
        );
    }

    group.finish();
}

criterion_group!(benches, bench_render_paths, bench_fingerprint);
criterion_main!(benches);
