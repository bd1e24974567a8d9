//! Benchmarks for the SID sample hot path
//!
//! Run with: cargo bench --bench chip

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use sid6581::{ChipModel, Sid, SidConfig};
use std::hint::black_box;

/// Three voices playing, voice 1 and 2 through the low-pass filter
fn playing_chip(model: ChipModel) -> Sid {
    let mut sid = Sid::with_model(SidConfig::pal().with_model(model)).unwrap();
    let setup: [(u8, u8); 16] = [
        (0x00, 0x25), (0x01, 0x1D), (0x03, 0x08), (0x05, 0x09), (0x06, 0xF0), (0x04, 0x41),
        (0x08, 0x0E), (0x0C, 0x09), (0x0D, 0xF0), (0x0B, 0x11),
        (0x0F, 0x3A), (0x14, 0xF0), (0x12, 0x21),
        (0x16, 0x40), (0x17, 0xF3), (0x18, 0x1F),
    ];
    for (addr, value) in setup {
        sid.write_register(addr, value);
    }
    sid
}

fn bench_compute_sample(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute_sample");

    let mut chip = playing_chip(ChipModel::Mos6581);

    for iterations in [100, 1000, 10000].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(iterations),
            iterations,
            |b, &iterations| {
                b.iter(|| {
                    for _ in 0..iterations {
                        black_box(chip.compute_sample().unwrap());
                    }
                });
            },
        );
    }

    group.finish();
}

fn bench_generate_samples(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate_samples");

    let mut chip = playing_chip(ChipModel::Mos8580);
    let mut buffer = vec![0i16; 44100];

    for sample_count in [882, 4410, 44100].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(sample_count),
            sample_count,
            |b, &sample_count| {
                b.iter(|| {
                    chip.generate_samples_into(&mut buffer[..sample_count]).unwrap();
                    black_box(&buffer);
                });
            },
        );
    }

    group.finish();
}

fn bench_register_updates(c: &mut Criterion) {
    let mut chip = playing_chip(ChipModel::Mos6581);

    c.bench_function("write_register_frame", |b| {
        b.iter(|| {
            // Typical player frame: pitch and pulse width of all voices, then one sample
            for voice in 0..3u8 {
                let base = voice * 7;
                chip.write_register(black_box(base), black_box(0x10));
                chip.write_register(black_box(base + 1), black_box(0x1D));
                chip.write_register(black_box(base + 2), black_box(0x80));
            }
            black_box(chip.compute_sample().unwrap());
        });
    });
}

fn bench_filter_modes(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter_mode");

    for mode in [0x10u8, 0x20, 0x40, 0x50] {
        let mut chip = playing_chip(ChipModel::Mos6581);
        chip.write_register(0x18, mode | 0x0F);
        group.bench_with_input(BenchmarkId::from_parameter(mode), &mode, |b, _| {
            b.iter(|| {
                for _ in 0..1000 {
                    black_box(chip.compute_sample().unwrap());
                }
            });
        });
    }

    group.finish();
}

fn bench_wave_table_build(c: &mut Criterion) {
    c.bench_function("wave_tables_6581", |b| {
        b.iter(|| black_box(sid6581::WaveTables::new(black_box(ChipModel::Mos6581))));
    });
}

criterion_group!(
    benches,
    bench_compute_sample,
    bench_generate_samples,
    bench_register_updates,
    bench_filter_modes,
    bench_wave_table_build
);
criterion_main!(benches);
