//! Per-node render state and the quantum-level processing of each primitive.

use patchrome_core::{
    Biquad, BiquadType, BlockProcessor, InterpolatedDelay, Lfo, ParamChannel, RENDER_QUANTUM,
    coefficients,
};

use super::convolver::Convolver;
use super::dynamics::Compressor;
use super::oversample::Oversampler;
use crate::media::SignalSource;
use crate::primitive::Oversample;

/// One channel of one render quantum.
pub(crate) type Block = [f32; RENDER_QUANTUM];
/// Both channels of one render quantum.
pub(crate) type StereoBlock = [Block; 2];

pub(crate) const SILENCE: StereoBlock = [[0.0; RENDER_QUANTUM]; 2];

/// Down-mixes a stereo block to mono (`0.5·(L + R)`).
#[inline]
fn down_mix(block: &StereoBlock, i: usize) -> f32 {
    0.5 * (block[0][i] + block[1][i])
}

pub(crate) struct BiquadNode {
    pub(crate) kind: BiquadType,
    pub(crate) frequency: f32,
    pub(crate) q: f32,
    pub(crate) gain: f32,
    filters: [Biquad; 2],
    dirty: bool,
}

impl BiquadNode {
    pub(crate) fn new(kind: BiquadType, frequency: f32, q: f32, gain: f32) -> Self {
        Self {
            kind,
            frequency,
            q,
            gain,
            filters: [Biquad::new(), Biquad::new()],
            dirty: true,
        }
    }

    pub(crate) fn invalidate(&mut self) {
        self.dirty = true;
    }

    fn process(&mut self, sample_rate: f32, input: &StereoBlock, output: &mut StereoBlock) {
        if self.dirty {
            let c = coefficients(self.kind, self.frequency, self.q, self.gain, sample_rate);
            for filter in &mut self.filters {
                filter.set(c);
            }
            self.dirty = false;
        }
        for ch in 0..2 {
            for (y, &x) in output[ch].iter_mut().zip(&input[ch]) {
                *y = self.filters[ch].process(x);
            }
        }
    }
}

/// Ring-buffered delay that reads at the start of a quantum and writes at
/// the end, so a feedback loop through it is well defined.
pub(crate) struct DelayNode {
    lines: [InterpolatedDelay; 2],
    pub(crate) delay_seconds: f32,
    pub(crate) max_seconds: f32,
}

impl DelayNode {
    pub(crate) fn new(sample_rate: f32, max_seconds: f32, delay_seconds: f32) -> Self {
        // One quantum of headroom for the minimum delay
        let capacity = (sample_rate * max_seconds) as usize + RENDER_QUANTUM + 2;
        Self {
            lines: [InterpolatedDelay::new(capacity), InterpolatedDelay::new(capacity)],
            delay_seconds: delay_seconds.clamp(0.0, max_seconds),
            max_seconds,
        }
    }

    fn read(&self, sample_rate: f32, output: &mut StereoBlock) {
        let delay = (self.delay_seconds * sample_rate).max(RENDER_QUANTUM as f32);
        for ch in 0..2 {
            for (i, y) in output[ch].iter_mut().enumerate() {
                // Distance back from the last sample written before this quantum
                *y = self.lines[ch].read(delay - 1.0 - i as f32);
            }
        }
    }

    pub(crate) fn consume(&mut self, input: &StereoBlock) {
        for ch in 0..2 {
            for &x in &input[ch] {
                self.lines[ch].write(x);
            }
        }
    }
}

pub(crate) struct OscillatorNode {
    pub(crate) lfo: Lfo,
    pub(crate) started: bool,
    pub(crate) stopped: bool,
}

pub(crate) struct WaveShaperNode {
    pub(crate) curve: Vec<f32>,
    stages: [Oversampler; 2],
}

impl WaveShaperNode {
    pub(crate) fn new(curve: Vec<f32>, oversample: Oversample) -> Self {
        Self {
            curve,
            stages: [Oversampler::new(oversample), Oversampler::new(oversample)],
        }
    }
}

pub(crate) struct WorkletNode {
    pub(crate) name: &'static str,
    pub(crate) processor: Box<dyn BlockProcessor>,
    pub(crate) channel: ParamChannel,
    values: Vec<f32>,
}

impl WorkletNode {
    pub(crate) fn new(
        name: &'static str,
        processor: Box<dyn BlockProcessor>,
        channel: ParamChannel,
    ) -> Self {
        let values = vec![0.0; channel.len()];
        Self {
            name,
            processor,
            channel,
            values,
        }
    }
}

/// Render state of one primitive.
pub(crate) enum NodeKind {
    Destination,
    MediaSource(Box<dyn SignalSource>),
    Gain(f32),
    Biquad(BiquadNode),
    Convolver(Box<Convolver>),
    Delay(DelayNode),
    Compressor(Compressor),
    Oscillator(OscillatorNode),
    WaveShaper(WaveShaperNode),
    Splitter,
    Merger,
    Panner(f32),
    Worklet(WorkletNode),
}

impl NodeKind {
    pub(crate) fn type_name(&self) -> &'static str {
        match self {
            Self::Destination => "destination",
            Self::MediaSource(_) => "media-source",
            Self::Gain(_) => "gain",
            Self::Biquad(_) => "biquad",
            Self::Convolver(_) => "convolver",
            Self::Delay(_) => "delay",
            Self::Compressor(_) => "compressor",
            Self::Oscillator(_) => "oscillator",
            Self::WaveShaper(_) => "waveshaper",
            Self::Splitter => "splitter",
            Self::Merger => "merger",
            Self::Panner(_) => "panner",
            Self::Worklet(_) => "worklet",
        }
    }

    /// Registered processor name of a worklet node.
    pub(crate) fn processor_name(&self) -> Option<&'static str> {
        match self {
            Self::Worklet(node) => Some(node.name),
            _ => None,
        }
    }

    /// Renders one quantum from the summed `inputs` into `outputs`.
    ///
    /// Delay nodes ignore `inputs` here; their input is consumed separately
    /// once every node has rendered.
    pub(crate) fn process(
        &mut self,
        sample_rate: f32,
        inputs: &[StereoBlock],
        outputs: &mut [StereoBlock],
    ) {
        let input = inputs.first().unwrap_or(&SILENCE);
        match self {
            Self::Destination => {}
            Self::MediaSource(signal) => {
                let [left, right] = &mut outputs[0];
                signal.render(left, right);
            }
            Self::Gain(gain) => {
                for ch in 0..2 {
                    for (y, &x) in outputs[0][ch].iter_mut().zip(&input[ch]) {
                        *y = x * *gain;
                    }
                }
            }
            Self::Biquad(node) => node.process(sample_rate, input, &mut outputs[0]),
            Self::Convolver(conv) => {
                for ch in 0..2 {
                    conv.process(ch, &input[ch], &mut outputs[0][ch]);
                }
            }
            Self::Delay(node) => node.read(sample_rate, &mut outputs[0]),
            Self::Compressor(comp) => {
                for i in 0..RENDER_QUANTUM {
                    let (l, r) = comp.process(input[0][i], input[1][i]);
                    outputs[0][0][i] = l;
                    outputs[0][1][i] = r;
                }
            }
            Self::Oscillator(osc) => {
                let out = &mut outputs[0];
                if osc.started && !osc.stopped {
                    for i in 0..RENDER_QUANTUM {
                        let v = osc.lfo.advance();
                        out[0][i] = v;
                        out[1][i] = v;
                    }
                } else {
                    *out = SILENCE;
                }
            }
            Self::WaveShaper(node) => {
                for ch in 0..2 {
                    let stage = &mut node.stages[ch];
                    for (y, &x) in outputs[0][ch].iter_mut().zip(&input[ch]) {
                        *y = stage.process(&node.curve, x);
                    }
                }
            }
            Self::Splitter => {
                for ch in 0..2 {
                    outputs[ch] = [input[ch], input[ch]];
                }
            }
            Self::Merger => {
                let second = inputs.get(1).unwrap_or(&SILENCE);
                for i in 0..RENDER_QUANTUM {
                    outputs[0][0][i] = down_mix(input, i);
                    outputs[0][1][i] = down_mix(second, i);
                }
            }
            Self::Panner(pan) => pan_equal_power(*pan, input, &mut outputs[0]),
            Self::Worklet(node) => {
                node.channel.read_into(&mut node.values);
                outputs[0] = SILENCE;
                let [out_l, out_r] = &mut outputs[0];
                let ins: [&[f32]; 2] = [&input[0], &input[1]];
                let mut outs: [&mut [f32]; 2] = [out_l, out_r];
                node.processor.process(&ins, &mut outs, &node.values);
            }
        }
    }
}

/// Equal-power stereo panning of a stereo input.
///
/// At `pan = 0` both channels pass unchanged; moving left folds the right
/// channel into the left, and vice versa.
fn pan_equal_power(pan: f32, input: &StereoBlock, output: &mut StereoBlock) {
    let pan = pan.clamp(-1.0, 1.0);
    let x = if pan <= 0.0 { pan + 1.0 } else { pan };
    let angle = x * core::f32::consts::FRAC_PI_2;
    let (gain_l, gain_r) = (angle.cos(), angle.sin());
    for i in 0..RENDER_QUANTUM {
        let (l, r) = (input[0][i], input[1][i]);
        if pan <= 0.0 {
            output[0][i] = l + r * gain_l;
            output[1][i] = r * gain_r;
        } else {
            output[0][i] = l * gain_l;
            output[1][i] = r + l * gain_r;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(l: f32, r: f32) -> StereoBlock {
        [[l; RENDER_QUANTUM], [r; RENDER_QUANTUM]]
    }

    #[test]
    fn centre_pan_is_transparent() {
        let mut out = SILENCE;
        pan_equal_power(0.0, &block(0.3, -0.2), &mut out);
        assert!((out[0][0] - 0.3).abs() < 1e-6);
        assert!((out[1][0] + 0.2).abs() < 1e-6);
    }

    #[test]
    fn hard_left_folds_right_into_left() {
        let mut out = SILENCE;
        pan_equal_power(-1.0, &block(0.3, 0.2), &mut out);
        assert!((out[0][5] - 0.5).abs() < 1e-6);
        assert!(out[1][5].abs() < 1e-6);
    }

    #[test]
    fn splitter_and_merger_route_channels() {
        let mut split = NodeKind::Splitter;
        let mut outs = [SILENCE, SILENCE];
        split.process(48000.0, &[block(1.0, 2.0)], &mut outs);
        assert_eq!(outs[0][1][0], 1.0);
        assert_eq!(outs[1][0][0], 2.0);

        let mut merge = NodeKind::Merger;
        let mut out = [SILENCE];
        merge.process(48000.0, &[block(1.0, 3.0), block(-1.0, -1.0)], &mut out);
        assert_eq!(out[0][0][0], 2.0);
        assert_eq!(out[0][1][0], -1.0);
    }

    #[test]
    fn delay_reads_before_it_writes() {
        let mut node = DelayNode::new(48000.0, 1.0, 0.0);
        let mut impulse = SILENCE;
        impulse[0][0] = 1.0;
        let mut out = SILENCE;
        node.read(48000.0, &mut out);
        assert!(out[0].iter().all(|&s| s == 0.0));
        node.consume(&impulse);
        node.read(48000.0, &mut out);
        // Clamped to one quantum: the impulse reappears at the same offset
        assert!((out[0][0] - 1.0).abs() < 1e-6);
        assert!(out[0][1..].iter().all(|&s| s.abs() < 1e-6));
    }
}
