//! Criterion benchmarks for graph construction and parameter updates
//!
//! Run with: cargo bench -p patchrome-graph
#![allow(missing_docs)]

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use patchrome_engine::{AudioEngine, BufferSource, MediaElement, RenderEngine, SourceId};
use patchrome_graph::{
    GraphDescription, GraphEdge, GraphNode, NodeType, ParamChange, ParamMap, ParamValue, build,
    register_processors, update,
};

const SAMPLE_RATE: f32 = 48000.0;

/// `input → e0 → e1 → … → output`, cycling through the effect types.
fn chain(len: usize) -> GraphDescription {
    let effects = [
        NodeType::Delay,
        NodeType::Utility,
        NodeType::Equalizer,
        NodeType::Distortion,
        NodeType::Phaser,
        NodeType::SpectralGate,
    ];
    let mut description =
        GraphDescription::default().with_node(GraphNode::new("input", NodeType::Input));
    let mut previous = "input".to_string();
    for i in 0..len {
        let id = format!("e{i}");
        description = description
            .with_node(GraphNode::new(&id, effects[i % effects.len()]))
            .with_edge(GraphEdge::new(&previous, &id));
        previous = id;
    }
    description
        .with_node(GraphNode::new("output", NodeType::Output))
        .with_edge(GraphEdge::new(&previous, "output"))
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("GraphBuild");

    for len in [1, 4, 16] {
        let description = chain(len);
        group.bench_with_input(BenchmarkId::new("chain", len), &description, |b, d| {
            b.iter_batched(
                || {
                    let mut engine = RenderEngine::new(SAMPLE_RATE);
                    register_processors(&mut engine);
                    let element =
                        MediaElement::with_signal(SourceId::new(1), BufferSource::mono(vec![0.0; 128]));
                    let source = engine.create_media_source(&element).unwrap();
                    (engine, source)
                },
                |(mut engine, source)| {
                    let destination = engine.destination();
                    black_box(build(&mut engine, source, d, destination, true));
                    engine
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn bench_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("GraphUpdate");

    let mut engine = RenderEngine::new(SAMPLE_RATE);
    register_processors(&mut engine);
    let element = MediaElement::with_signal(SourceId::new(1), BufferSource::mono(vec![0.0; 128]));
    let source = engine.create_media_source(&element).unwrap();
    let destination = engine.destination();
    let mut graph = build(&mut engine, source, &chain(16), destination, true);

    let mut mix = 0.0_f32;
    group.bench_function("mix_sweep_16", |b| {
        b.iter(|| {
            mix = (mix + 1.0) % 100.0;
            let changes: Vec<ParamChange> = (0..16)
                .map(|i| {
                    let params = ParamMap::from([("mix".to_string(), ParamValue::from(mix))]);
                    ParamChange::new(format!("e{i}"), params)
                })
                .collect();
            black_box(update(&mut graph, &mut engine, &changes, None))
        });
    });

    let unchanged = vec![ParamChange::new("e0", ParamMap::new()); 16];
    group.bench_function("no_op_16", |b| {
        b.iter(|| black_box(update(&mut graph, &mut engine, &unchanged, None)));
    });

    group.finish();
}

criterion_group!(benches, bench_build, bench_update);
criterion_main!(benches);
