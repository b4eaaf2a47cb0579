//! Offline render of a test signal through a graph.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, ValueEnum};
use patchrome_engine::{AudioEngine, BufferSource, MediaElement, RenderEngine, SourceId};
use patchrome_graph::{build, register_processors};
use patchrome_session::{EngineConfig, PlaybackGovernor};

use super::common::settings_or_default;

/// Test signal fed into the graph.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Signal {
    /// Single unit sample at t = 0
    Impulse,
    /// Uniform white noise at -6 dBFS peak
    Noise,
    /// 440 Hz sine at -6 dBFS
    Sine,
}

#[derive(Args)]
pub struct RenderArgs {
    /// Settings or graph description JSON (default: pass-through)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Engine configuration TOML
    #[arg(long)]
    config: Option<PathBuf>,

    /// Input signal
    #[arg(long, value_enum, default_value = "sine")]
    signal: Signal,

    /// Seconds to render
    #[arg(long, default_value = "1.0")]
    duration: f32,
}

/// Generates `len` samples of `signal`.
pub fn generate(signal: Signal, len: usize, sample_rate: f32) -> Vec<f32> {
    match signal {
        Signal::Impulse => {
            let mut out = vec![0.0; len];
            if let Some(first) = out.first_mut() {
                *first = 1.0;
            }
            out
        }
        Signal::Noise => {
            let mut state: u32 = 0x2545_f491;
            (0..len)
                .map(|_| {
                    state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                    (state >> 8) as f32 / (1u32 << 24) as f32 - 0.5
                })
                .collect()
        }
        Signal::Sine => (0..len)
            .map(|i| 0.5 * (core::f32::consts::TAU * 440.0 * i as f32 / sample_rate).sin())
            .collect(),
    }
}

/// Peak and RMS of a channel.
pub fn levels(samples: &[f32]) -> (f32, f32) {
    if samples.is_empty() {
        return (0.0, 0.0);
    }
    let peak = samples.iter().fold(0.0f32, |m, s| m.max(s.abs()));
    let rms = (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt();
    (peak, rms)
}

fn db(level: f32) -> String {
    if level <= 0.0 {
        "-inf".to_string()
    } else {
        format!("{:.1}", 20.0 * level.log10())
    }
}

pub fn run(args: RenderArgs) -> anyhow::Result<()> {
    let config = match &args.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    let settings = settings_or_default(args.settings.as_deref())?;
    if !(args.duration.is_finite() && args.duration > 0.0) {
        anyhow::bail!("duration must be positive, got {}", args.duration);
    }

    let frames = (config.sample_rate * args.duration) as usize;
    let input = generate(args.signal, frames, config.sample_rate);
    let element = MediaElement::with_signal(SourceId::new(0), BufferSource::mono(input));

    let mut engine = RenderEngine::with_max_delay(config.sample_rate, config.max_delay_seconds);
    register_processors(&mut engine);
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
    PlaybackGovernor::new(settings).enforce(element.playback());
    tracing::info!(
        units = graph.len(),
        frames,
        block = config.render_quantum,
        "rendering"
    );

    let mut left = Vec::with_capacity(frames);
    let mut right = Vec::with_capacity(frames);
    let mut block_l = vec![0.0; config.render_quantum];
    let mut block_r = vec![0.0; config.render_quantum];
    while left.len() < frames {
        let n = config.render_quantum.min(frames - left.len());
        engine.render(&mut block_l[..n], &mut block_r[..n]);
        left.extend_from_slice(&block_l[..n]);
        right.extend_from_slice(&block_r[..n]);
    }

    println!(
        "Rendered {} frames at {} Hz ({:?} input)",
        frames, config.sample_rate, args.signal
    );
    println!(
        "Playback:    rate {:.2}, preserves pitch {}",
        element.playback().playback_rate(),
        element.playback().preserves_pitch()
    );
    for (name, channel) in [("Left", &left), ("Right", &right)] {
        let (peak, rms) = levels(channel);
        println!(
            "{name:5}        peak {} dBFS, rms {} dBFS",
            db(peak),
            db(rms)
        );
    }
    graph.teardown(&mut engine);
    Ok(())
}
