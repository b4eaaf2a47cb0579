//! Criterion benchmarks for the reference renderer
//!
//! Run with: cargo bench -p patchrome-engine
#![allow(missing_docs)]

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use patchrome_core::RENDER_QUANTUM;
use patchrome_engine::{
    AudioEngine, BufferSource, MediaElement, Primitive, RenderEngine, SourceId,
};

const SAMPLE_RATE: f32 = 48000.0;

fn noise(len: usize, seed: u32) -> Vec<f32> {
    let mut state = seed;
    (0..len)
        .map(|_| {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            (state >> 8) as f32 / 16_777_216.0 * 2.0 - 1.0
        })
        .collect()
}

fn engine_with(primitive: Primitive) -> RenderEngine {
    let mut engine = RenderEngine::new(SAMPLE_RATE);
    let element = MediaElement::with_signal(
        SourceId::new(1),
        BufferSource::mono(noise(SAMPLE_RATE as usize, 7)).looping(),
    );
    let src = engine.create_media_source(&element).unwrap();
    let node = engine.create(primitive).unwrap();
    engine.connect(src, 0, node, 0).unwrap();
    engine.connect(node, 0, engine.destination(), 0).unwrap();
    engine
}

fn bench_primitives(c: &mut Criterion) {
    let mut group = c.benchmark_group("RenderEngine");

    for ir_seconds in [0.1_f32, 1.0, 2.0] {
        let len = (SAMPLE_RATE * ir_seconds) as usize;
        let mut engine = engine_with(Primitive::Convolver {
            impulse: vec![noise(len, 1), noise(len, 2)],
            normalize: true,
        });
        group.bench_with_input(
            BenchmarkId::new("convolver_quantum", format!("{ir_seconds}s")),
            &ir_seconds,
            |b, _| {
                let mut l = vec![0.0; RENDER_QUANTUM];
                let mut r = vec![0.0; RENDER_QUANTUM];
                b.iter(|| engine.render(black_box(&mut l), black_box(&mut r)));
            },
        );
    }

    let mut engine = engine_with(Primitive::WaveShaper {
        curve: (0..44100).map(|i| (i as f32 / 22050.0 - 1.0).tanh()).collect(),
        oversample: patchrome_engine::Oversample::X4,
    });
    group.bench_function("waveshaper_4x_quantum", |b| {
        let mut l = vec![0.0; RENDER_QUANTUM];
        let mut r = vec![0.0; RENDER_QUANTUM];
        b.iter(|| engine.render(black_box(&mut l), black_box(&mut r)));
    });

    group.finish();
}

criterion_group!(benches, bench_primitives);
criterion_main!(benches);
