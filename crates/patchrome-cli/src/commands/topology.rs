//! Realized topology of a graph description.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use patchrome_engine::{AudioEngine, BufferSource, MediaElement, RenderEngine, SourceId};
use patchrome_graph::{build, register_processors};

use super::common::load_settings;

#[derive(Args)]
pub struct TopologyArgs {
    /// Settings or graph description JSON
    pub file: PathBuf,

    /// Print the topology key as JSON instead of a table
    #[arg(long)]
    json: bool,

    /// Sample rate for the build
    #[arg(long, default_value = "48000")]
    sample_rate: f32,
}

pub fn run(args: TopologyArgs) -> anyhow::Result<()> {
    let settings = load_settings(&args.file)?;
    let mut engine = RenderEngine::new(args.sample_rate);
    register_processors(&mut engine);
    let element = MediaElement::with_signal(SourceId::new(0), BufferSource::mono(Vec::new()));
    let source = engine
        .create_media_source(&element)
        .context("failed to wrap the test element")?;
    let destination = engine.destination();
    let graph = build(
        &mut engine,
        source,
        &settings.audio_graph,
        destination,
        settings.enabled,
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&graph.topology())?);
        return Ok(());
    }

    if graph.is_bypassed() {
        println!("bypassed (processing disabled)");
    }
    println!("Units ({}):", graph.len());
    for (id, unit) in graph.units() {
        let kind = unit
            .node_type()
            .map_or_else(|| "bypass".to_string(), |t| t.to_string());
        println!("  {id:16} {kind}");
    }
    println!("Edges ({}):", graph.edges().len());
    for edge in graph.edges() {
        println!("  {} -> {}", edge.source, edge.target);
    }
    let skipped = settings
        .audio_graph
        .edges
        .len()
        .saturating_sub(graph.edges().len());
    if skipped > 0 && !graph.is_bypassed() {
        println!("Skipped edges: {skipped}");
    }
    println!("Engine nodes: {}", engine.node_count());
    Ok(())
}
