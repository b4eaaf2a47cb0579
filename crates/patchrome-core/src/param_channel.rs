//! Lock-free parameter store between the control thread and a processor.
//!
//! [`ParamChannel`] stores one atomic f32 per [`ParamDescriptor`], laid out in
//! descriptor order. The control thread calls [`set`](ParamChannel::set) (values
//! are clamped into the descriptor range); the audio thread copies the whole
//! table once per render quantum with [`read_into`](ParamChannel::read_into).
//!
//! A generation counter is bumped on every write, so the reader can tell
//! whether anything changed since its last copy.
//!
//! ```rust
//! use patchrome_core::{ParamChannel, ParamDescriptor, ParamUnit};
//!
//! static PARAMS: [ParamDescriptor; 1] =
//!     [ParamDescriptor::new("cutoff", ParamUnit::Decibels, -60.0, 24.0, -20.0)];
//!
//! let channel = ParamChannel::new(&PARAMS);
//! let audio_side = channel.clone();
//!
//! channel.set_by_name("cutoff", 99.0);
//!
//! let mut block = [0.0_f32; 1];
//! audio_side.read_into(&mut block);
//! assert_eq!(block[0], 24.0);
//! ```

use alloc::boxed::Box;
use alloc::sync::Arc;
use core::sync::atomic::{AtomicU32, Ordering};

use crate::ParamDescriptor;

struct Shared {
    descriptors: &'static [ParamDescriptor],
    /// f32 bit patterns, one per descriptor.
    values: Box<[AtomicU32]>,
    generation: AtomicU32,
}

/// Shared, clonable handle to a processor's parameter values.
#[derive(Clone)]
pub struct ParamChannel {
    inner: Arc<Shared>,
}

impl core::fmt::Debug for ParamChannel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ParamChannel")
            .field("len", &self.len())
            .field("generation", &self.generation())
            .finish()
    }
}

impl ParamChannel {
    /// Creates a channel initialized to each descriptor's default.
    pub fn new(descriptors: &'static [ParamDescriptor]) -> Self {
        let values = descriptors
            .iter()
            .map(|d| AtomicU32::new(d.default.to_bits()))
            .collect();
        Self {
            inner: Arc::new(Shared {
                descriptors,
                values,
                generation: AtomicU32::new(0),
            }),
        }
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.inner.values.len()
    }

    /// Returns `true` if the channel carries no parameters.
    pub fn is_empty(&self) -> bool {
        self.inner.values.is_empty()
    }

    /// Descriptor table the channel was built from.
    pub fn descriptors(&self) -> &'static [ParamDescriptor] {
        self.inner.descriptors
    }

    /// Stores a clamped value. Returns `false` for an out-of-range index.
    pub fn set(&self, index: usize, value: f32) -> bool {
        let (Some(slot), Some(desc)) = (
            self.inner.values.get(index),
            self.inner.descriptors.get(index),
        ) else {
            return false;
        };
        let clamped = desc.clamp(value);
        #[cfg(feature = "tracing")]
        if clamped != value {
            tracing::debug!(param = desc.name, value, clamped, "param channel: value clamped");
        }
        slot.store(clamped.to_bits(), Ordering::Release);
        self.inner.generation.fetch_add(1, Ordering::Release);
        true
    }

    /// Stores a clamped value by parameter name.
    pub fn set_by_name(&self, name: &str, value: f32) -> bool {
        self.inner
            .descriptors
            .iter()
            .position(|d| d.name == name)
            .is_some_and(|index| self.set(index, value))
    }

    /// Current value at `index`, or `None` when out of range.
    pub fn get(&self, index: usize) -> Option<f32> {
        self.inner
            .values
            .get(index)
            .map(|v| f32::from_bits(v.load(Ordering::Acquire)))
    }

    /// Number of writes since creation (wrapping).
    pub fn generation(&self) -> u32 {
        self.inner.generation.load(Ordering::Acquire)
    }

    /// Copies every value into `out` and returns the generation observed
    /// before the copy. Extra `out` entries are left untouched.
    pub fn read_into(&self, out: &mut [f32]) -> u32 {
        let generation = self.generation();
        for (dst, src) in out.iter_mut().zip(self.inner.values.iter()) {
            *dst = f32::from_bits(src.load(Ordering::Acquire));
        }
        generation
    }
}
