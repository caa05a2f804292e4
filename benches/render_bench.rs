use audioscribe::subtitles::{format_timestamp, render_listing, SRT_SEPARATOR};
use audioscribe::{render, Config, ExportFormat, Segment, TranscriptionResult};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn transcript(segments: usize) -> TranscriptionResult {
    let segments: Vec<Segment> = (0..segments)
        .map(|i| {
            Segment::new(
                i as f64 * 3.0, // 3 second segments
                (i + 1) as f64 * 3.0,
                format!(" Segment {} of a long recorded lecture with several clauses ", i + 1),
            )
        })
        .collect();
    let text = segments.iter().map(|s| s.text.trim()).collect::<Vec<_>>().join(" ");
    TranscriptionResult::new(text, "en".to_string(), segments, 0.0)
}

fn bench_timestamps(c: &mut Criterion) {
    c.bench_function("timestamp_formatting", |b| {
        b.iter(|| {
            black_box(format_timestamp(black_box(3725.25), SRT_SEPARATOR));
            black_box(format_timestamp(black_box(0.0), SRT_SEPARATOR));
            black_box(format_timestamp(black_box(86399.999), SRT_SEPARATOR));
        })
    });
}

fn bench_subtitle_rendering(c: &mut Criterion) {
    let small = transcript(10);
    let large = transcript(1000); // Roughly an hour of speech

    c.bench_function("srt_small_file", |b| {
        b.iter(|| black_box(render(&small, ExportFormat::Srt)))
    });

    c.bench_function("srt_large_file", |b| {
        b.iter(|| black_box(render(&large, ExportFormat::Srt)))
    });

    c.bench_function("vtt_large_file", |b| {
        b.iter(|| black_box(render(&large, ExportFormat::Vtt)))
    });

    c.bench_function("segment_listing_large", |b| {
        b.iter(|| black_box(render_listing(large.segments())))
    });
}

fn bench_config_operations(c: &mut Criterion) {
    c.bench_function("config_creation", |b| b.iter(|| black_box(Config::default())));

    c.bench_function("config_validation", |b| {
        let config = Config::default();
        b.iter(|| black_box(config.validate().is_ok()))
    });
}

criterion_group!(benches, bench_timestamps, bench_subtitle_rendering, bench_config_operations);
criterion_main!(benches);
