//! Media elements: the playback controls and decoded audio an engine wraps.
//!
//! A [`MediaElement`] can feed exactly one source node across every engine.
//! The first [`capture`](MediaElement::capture) hands out its
//! [`SignalSource`]; later attempts get nothing, which the engine reports as
//! [`EngineError::SourceAlreadyCaptured`](crate::EngineError).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use parking_lot::Mutex;

use crate::handle::SourceId;

/// Playback rate and pitch-preservation flag of a media element.
///
/// Hosts may reset these behind the application's back, which is why the
/// session re-applies them periodically.
pub trait PlaybackControl: Send + Sync {
    /// Current playback rate.
    fn playback_rate(&self) -> f32;
    /// Sets the playback rate.
    fn set_playback_rate(&self, rate: f32);
    /// Whether the host time-stretches to keep the natural pitch.
    fn preserves_pitch(&self) -> bool;
    /// Enables or disables pitch preservation.
    fn set_preserves_pitch(&self, preserve: bool);
}

/// Decoded audio a media element plays.
pub trait SignalSource: Send {
    /// Fills both channels with the next samples.
    fn render(&mut self, left: &mut [f32], right: &mut [f32]);
}

/// Lock-free [`PlaybackControl`] backed by atomics.
#[derive(Debug)]
pub struct AtomicPlayback {
    rate: AtomicU32,
    preserves_pitch: AtomicBool,
}

impl AtomicPlayback {
    /// Normal speed with pitch preservation on, as hosts default to.
    pub fn new() -> Self {
        Self {
            rate: AtomicU32::new(1.0_f32.to_bits()),
            preserves_pitch: AtomicBool::new(true),
        }
    }
}

impl Default for AtomicPlayback {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackControl for AtomicPlayback {
    fn playback_rate(&self) -> f32 {
        f32::from_bits(self.rate.load(Ordering::Acquire))
    }

    fn set_playback_rate(&self, rate: f32) {
        self.rate.store(rate.to_bits(), Ordering::Release);
    }

    fn preserves_pitch(&self) -> bool {
        self.preserves_pitch.load(Ordering::Acquire)
    }

    fn set_preserves_pitch(&self, preserve: bool) {
        self.preserves_pitch.store(preserve, Ordering::Release);
    }
}

/// Plays a fixed stereo buffer, optionally looping, then silence.
#[derive(Debug, Clone)]
pub struct BufferSource {
    left: Vec<f32>,
    right: Vec<f32>,
    position: usize,
    looping: bool,
}

impl BufferSource {
    /// Stereo buffer. The shorter channel is padded with silence.
    pub fn stereo(mut left: Vec<f32>, mut right: Vec<f32>) -> Self {
        let len = left.len().max(right.len());
        left.resize(len, 0.0);
        right.resize(len, 0.0);
        Self {
            left,
            right,
            position: 0,
            looping: false,
        }
    }

    /// Mono buffer played on both channels.
    pub fn mono(samples: Vec<f32>) -> Self {
        Self::stereo(samples.clone(), samples)
    }

    /// Restarts from the beginning whenever the end is reached.
    pub fn looping(mut self) -> Self {
        self.looping = true;
        self
    }

    /// Number of frames in the buffer.
    pub fn len(&self) -> usize {
        self.left.len()
    }

    /// Whether the buffer has no frames.
    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }
}

impl SignalSource for BufferSource {
    fn render(&mut self, left: &mut [f32], right: &mut [f32]) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            if self.position >= self.left.len() && self.looping && !self.left.is_empty() {
                self.position = 0;
            }
            match (self.left.get(self.position), self.right.get(self.position)) {
                (Some(&a), Some(&b)) => {
                    *l = a;
                    *r = b;
                    self.position += 1;
                }
                _ => {
                    *l = 0.0;
                    *r = 0.0;
                }
            }
        }
    }
}

/// A playing media element.
pub struct MediaElement {
    id: SourceId,
    playback: Arc<dyn PlaybackControl>,
    signal: Mutex<Option<Box<dyn SignalSource>>>,
}

impl MediaElement {
    /// Creates an element from its playback controls and audio.
    pub fn new(
        id: SourceId,
        playback: Arc<dyn PlaybackControl>,
        signal: Box<dyn SignalSource>,
    ) -> Self {
        Self {
            id,
            playback,
            signal: Mutex::new(Some(signal)),
        }
    }

    /// Element with [`AtomicPlayback`] controls.
    pub fn with_signal(id: SourceId, signal: impl SignalSource + 'static) -> Self {
        Self::new(id, Arc::new(AtomicPlayback::new()), Box::new(signal))
    }

    /// Stable identifier.
    pub fn id(&self) -> SourceId {
        self.id
    }

    /// Playback controls.
    pub fn playback(&self) -> &dyn PlaybackControl {
        self.playback.as_ref()
    }

    /// Takes the element's audio. Returns `None` once captured.
    pub fn capture(&self) -> Option<Box<dyn SignalSource>> {
        self.signal.lock().take()
    }

    /// Whether a source node already owns this element's audio.
    pub fn is_captured(&self) -> bool {
        self.signal.lock().is_none()
    }
}

impl std::fmt::Debug for MediaElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaElement")
            .field("id", &self.id)
            .field("playback_rate", &self.playback.playback_rate())
            .field("preserves_pitch", &self.playback.preserves_pitch())
            .field("captured", &self.is_captured())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_happens_once() {
        let element = MediaElement::with_signal(SourceId::new(1), BufferSource::mono(vec![1.0]));
        assert!(!element.is_captured());
        assert!(element.capture().is_some());
        assert!(element.capture().is_none());
        assert!(element.is_captured());
    }

    #[test]
    fn buffer_source_pads_and_loops() {
        let mut once = BufferSource::mono(vec![1.0, 2.0]);
        let mut l = [0.0; 4];
        let mut r = [0.0; 4];
        once.render(&mut l, &mut r);
        assert_eq!(l, [1.0, 2.0, 0.0, 0.0]);

        let mut looped = BufferSource::stereo(vec![1.0, 2.0], vec![3.0]).looping();
        looped.render(&mut l, &mut r);
        assert_eq!(l, [1.0, 2.0, 1.0, 2.0]);
        assert_eq!(r, [3.0, 0.0, 3.0, 0.0]);
    }

    #[test]
    fn atomic_playback_defaults() {
        let p = AtomicPlayback::new();
        assert_eq!(p.playback_rate(), 1.0);
        assert!(p.preserves_pitch());
        p.set_playback_rate(1.5);
        p.set_preserves_pitch(false);
        assert_eq!(p.playback_rate(), 1.5);
        assert!(!p.preserves_pitch());
    }
}
