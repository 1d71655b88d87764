use criterion::{Criterion, criterion_group, criterion_main};

fn bench_format_english(c: &mut Criterion) {
    c.bench_function("format_relative_duration_en", |b| {
        b.iter(|| {
            for s in [45u64, 3_599, 86_399, 90_000] {
                let _ = ephemera_lib::relative_time::format_relative_duration(s, &["en"]);
            }
        })
    });
}

fn bench_format_russian_fallback(c: &mut Criterion) {
    c.bench_function("format_relative_duration_fr_ru", |b| {
        b.iter(|| {
            let _ = ephemera_lib::relative_time::format_relative_duration(7_322, &["fr", "ru"]);
        })
    });
}

criterion_group!(benches, bench_format_english, bench_format_russian_fallback);
criterion_main!(benches);
