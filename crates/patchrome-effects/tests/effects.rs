//! Integration tests for the effect processors.

use patchrome_core::BlockProcessor;
use patchrome_effects::{Bitcrusher, DESCRIPTORS, Flanger, Phaser};
use proptest::prelude::*;

const SAMPLE_RATE: f32 = 48000.0;

fn sine(freq: f32, len: usize) -> Vec<f32> {
    (0..len)
        .map(|n| (std::f32::consts::TAU * freq * n as f32 / SAMPLE_RATE).sin() * 0.5)
        .collect()
}

fn run_stereo(processor: &mut dyn BlockProcessor, input: &[f32], params: &[f32]) -> (Vec<f32>, Vec<f32>) {
    let mut left = vec![0.0_f32; input.len()];
    let mut right = vec![0.0_f32; input.len()];
    let mut pos = 0;
    while pos < input.len() {
        let end = (pos + 128).min(input.len());
        let inputs: [&[f32]; 2] = [&input[pos..end], &input[pos..end]];
        let mut outputs: [&mut [f32]; 2] = [&mut left[pos..end], &mut right[pos..end]];
        processor.process(&inputs, &mut outputs, params);
        pos = end;
    }
    (left, right)
}

fn rms(signal: &[f32]) -> f32 {
    (signal.iter().map(|s| s * s).sum::<f32>() / signal.len() as f32).sqrt()
}

#[test]
fn identical_channels_stay_identical() {
    let input = sine(440.0, 9600);
    let processors: [(Box<dyn BlockProcessor>, Vec<f32>); 3] = [
        (Box::new(Phaser::new(SAMPLE_RATE)), vec![1.0, 80.0, 50.0]),
        (Box::new(Flanger::new(SAMPLE_RATE)), vec![1.0, 5.0, 80.0, 50.0]),
        (Box::new(Bitcrusher::new(SAMPLE_RATE)), vec![8000.0, 6.0]),
    ];
    for (mut processor, params) in processors {
        let (left, right) = run_stereo(processor.as_mut(), &input, &params);
        assert_eq!(left, right);
    }
}

#[test]
fn modulated_phaser_changes_the_signal_over_time() {
    let input = sine(1500.0, 48000);
    let mut phaser = Phaser::new(SAMPLE_RATE);
    let (left, _) = run_stereo(&mut phaser, &input, &[2.0, 100.0, 0.0]);
    let diff: f32 = left[24000..]
        .iter()
        .zip(&input[24000..])
        .map(|(a, b)| (a - b).abs())
        .sum();
    assert!(diff > 1.0);
    // All-pass stages keep the level bounded
    assert!(left.iter().all(|s| s.abs() < 2.0));
}

#[test]
fn reset_clears_the_flanger_tail() {
    let input = sine(300.0, 4800);
    let mut flanger = Flanger::new(SAMPLE_RATE);
    run_stereo(&mut flanger, &input, &[0.5, 10.0, 50.0, 90.0]);
    flanger.reset();
    let silence = vec![0.0_f32; 1024];
    let (left, right) = run_stereo(&mut flanger, &silence, &[0.5, 10.0, 50.0, 90.0]);
    assert!(left.iter().chain(&right).all(|&s| s == 0.0));
}

#[test]
fn coarse_bitcrusher_loses_detail() {
    let input = sine(200.0, 48000);
    let mut crusher = Bitcrusher::new(SAMPLE_RATE);
    let (left, _) = run_stereo(&mut crusher, &input, &[2000.0, 2.0]);
    let mut levels: Vec<i32> = left.iter().map(|s| (s * 4.0).round() as i32).collect();
    levels.sort_unstable();
    levels.dedup();
    assert!(levels.len() <= 9, "levels {levels:?}");
    assert!(rms(&left) < rms(&input));
}

#[test]
fn descriptors_instantiate() {
    for d in DESCRIPTORS {
        let mut processor = d.instantiate(SAMPLE_RATE);
        let defaults = d.defaults();
        let input = sine(440.0, 256);
        let (left, _) = run_stereo(processor.as_mut(), &input, &defaults);
        assert!(left.iter().all(|s| s.is_finite()), "{}", d.name);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn outputs_stay_finite_across_parameter_space(
        rate in 0.1_f32..10.0,
        depth in 0.0_f32..100.0,
        feedback in 0.0_f32..100.0,
        delay in 0.1_f32..20.0,
    ) {
        let input = sine(880.0, 2048);
        let mut phaser = Phaser::new(SAMPLE_RATE);
        let (p, _) = run_stereo(&mut phaser, &input, &[rate, depth, feedback]);
        let mut flanger = Flanger::new(SAMPLE_RATE);
        let (f, _) = run_stereo(&mut flanger, &input, &[rate, delay, depth, feedback]);
        prop_assert!(p.iter().chain(&f).all(|s| s.is_finite() && s.abs() < 10.0));
    }
}
