//! Criterion benchmarks for patchrome-core DSP primitives
//!
//! Run with: cargo bench -p patchrome-core
#![allow(missing_docs)]

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use patchrome_core::{Biquad, BiquadType, InterpolatedDelay, Lfo, ParamChannel, coefficients};

const SAMPLE_RATE: f32 = 48000.0;
const BLOCK_SIZES: &[usize] = &[64, 128, 256, 512, 1024];

fn generate_test_signal(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE;
            (2.0 * std::f32::consts::PI * 440.0 * t).sin() * 0.5
        })
        .collect()
}

fn bench_biquad(c: &mut Criterion) {
    let mut group = c.benchmark_group("Biquad");

    for &block_size in BLOCK_SIZES {
        let input = generate_test_signal(block_size);

        group.bench_with_input(
            BenchmarkId::new("process", block_size),
            &block_size,
            |b, _| {
                let mut biquad = Biquad::new();
                biquad.set(coefficients(
                    BiquadType::Lowpass,
                    1000.0,
                    1.0,
                    0.0,
                    SAMPLE_RATE,
                ));
                b.iter(|| {
                    for &sample in &input {
                        black_box(biquad.process(black_box(sample)));
                    }
                });
            },
        );
    }

    group.bench_function("coefficient_calc", |b| {
        b.iter(|| {
            black_box(coefficients(
                black_box(BiquadType::Allpass),
                black_box(1500.0),
                black_box(1.0),
                0.0,
                SAMPLE_RATE,
            ))
        });
    });

    group.finish();
}

fn bench_delay(c: &mut Criterion) {
    let mut group = c.benchmark_group("InterpolatedDelay");

    for &block_size in BLOCK_SIZES {
        let input = generate_test_signal(block_size);
        group.bench_with_input(
            BenchmarkId::new("modulated", block_size),
            &block_size,
            |b, _| {
                let mut delay = InterpolatedDelay::from_time(SAMPLE_RATE, 0.02);
                let mut lfo = Lfo::new(SAMPLE_RATE, 0.5);
                b.iter(|| {
                    for &sample in &input {
                        let d = 240.0 + 120.0 * lfo.advance();
                        black_box(delay.process(black_box(sample), d));
                    }
                });
            },
        );
    }

    group.finish();
}

fn bench_param_channel(c: &mut Criterion) {
    static PARAMS: [patchrome_core::ParamDescriptor; 3] = [
        patchrome_core::ParamDescriptor::mix(50.0),
        patchrome_core::ParamDescriptor::mix(50.0),
        patchrome_core::ParamDescriptor::mix(50.0),
    ];
    let channel = ParamChannel::new(&PARAMS);
    let mut block = [0.0_f32; 3];

    c.bench_function("ParamChannel/read_into", |b| {
        b.iter(|| black_box(channel.read_into(black_box(&mut block))));
    });
}

criterion_group!(benches, bench_biquad, bench_delay, bench_param_channel);
criterion_main!(benches);
