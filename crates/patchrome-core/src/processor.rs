//! Block-processor contract.
//!
//! Effects that cannot be composed from the engine's built-in primitives (the
//! spectral effects, phaser, flanger, bitcrusher) are written as
//! [`BlockProcessor`]s and registered with the engine under a name through a
//! [`ProcessorDescriptor`].
//!
//! ## Design Decisions
//!
//! - **Object-safe**: processors are created by name at graph-build time, so
//!   the engine stores them as `Box<dyn BlockProcessor>`.
//! - **Planar channels**: `inputs[ch]` / `outputs[ch]` hold one slice per
//!   channel. Processors handle `min(inputs.len(), outputs.len())` channels
//!   and leave any extra output channel untouched.
//! - **k-rate parameters**: `params` holds one value per descriptor entry,
//!   in table order, sampled once per call.

use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::ParamDescriptor;

/// Number of frames the engine renders per processing call.
pub const RENDER_QUANTUM: usize = 128;

/// A named custom block processor.
///
/// # Example
///
/// ```rust
/// use patchrome_core::BlockProcessor;
///
/// struct Invert;
///
/// impl BlockProcessor for Invert {
///     fn process(&mut self, inputs: &[&[f32]], outputs: &mut [&mut [f32]], _params: &[f32]) -> bool {
///         for (input, output) in inputs.iter().zip(outputs.iter_mut()) {
///             for (i, o) in input.iter().zip(output.iter_mut()) {
///                 *o = -*i;
///             }
///         }
///         true
///     }
///
///     fn reset(&mut self) {}
/// }
/// ```
pub trait BlockProcessor: Send {
    /// Process one block.
    ///
    /// All slices share the same length, which may be any size (not only
    /// [`RENDER_QUANTUM`]). Returns `false` once the processor no longer
    /// needs to be called.
    fn process(&mut self, inputs: &[&[f32]], outputs: &mut [&mut [f32]], params: &[f32]) -> bool;

    /// Clear all internal state (buffers, phase accumulators).
    fn reset(&mut self);

    /// Processing latency in samples.
    fn latency_samples(&self) -> usize {
        0
    }
}

/// Creates a processor instance for a sample rate.
pub type ProcessorFactory = fn(sample_rate: f32) -> Box<dyn BlockProcessor>;

/// Registration record for a block processor.
#[derive(Debug, Clone, Copy)]
pub struct ProcessorDescriptor {
    /// Name the processor is registered and instantiated under.
    pub name: &'static str,
    /// Parameter table; a running processor receives values in this order.
    pub params: &'static [ParamDescriptor],
    /// Instance constructor.
    pub factory: ProcessorFactory,
}

impl ProcessorDescriptor {
    /// Position of the parameter called `name` in [`params`](Self::params).
    pub fn param_index(&self, name: &str) -> Option<usize> {
        self.params.iter().position(|p| p.name == name)
    }

    /// Descriptor of the parameter called `name`.
    pub fn param(&self, name: &str) -> Option<&'static ParamDescriptor> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Default value of every parameter in table order.
    pub fn defaults(&self) -> Vec<f32> {
        self.params.iter().map(|p| p.default).collect()
    }

    /// Creates a processor instance.
    pub fn instantiate(&self, sample_rate: f32) -> Box<dyn BlockProcessor> {
        (self.factory)(sample_rate)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for ProcessorDescriptor {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut s = serializer.serialize_struct("ProcessorDescriptor", 2)?;
        s.serialize_field("name", self.name)?;
        s.serialize_field("parameterDescriptors", self.params)?;
        s.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ParamUnit;

    struct Scale;

    impl BlockProcessor for Scale {
        fn process(
            &mut self,
            inputs: &[&[f32]],
            outputs: &mut [&mut [f32]],
            params: &[f32],
        ) -> bool {
            for (input, output) in inputs.iter().zip(outputs.iter_mut()) {
                for (i, o) in input.iter().zip(output.iter_mut()) {
                    *o = *i * params[0];
                }
            }
            true
        }

        fn reset(&mut self) {}
    }

    const SCALE_PARAMS: &[ParamDescriptor] =
        &[ParamDescriptor::new("amount", ParamUnit::None, 0.0, 4.0, 2.0)];

    fn create_scale(_sample_rate: f32) -> Box<dyn BlockProcessor> {
        Box::new(Scale)
    }

    const SCALE: ProcessorDescriptor = ProcessorDescriptor {
        name: "scale-processor",
        params: SCALE_PARAMS,
        factory: create_scale,
    };

    #[test]
    fn descriptor_lookup() {
        assert_eq!(SCALE.param_index("amount"), Some(0));
        assert_eq!(SCALE.param_index("missing"), None);
        assert_eq!(SCALE.defaults(), alloc::vec![2.0]);
    }

    #[test]
    fn instantiate_and_process() {
        let mut p = SCALE.instantiate(48000.0);
        let input = [1.0_f32, -0.5];
        let mut out = [0.0_f32; 2];
        let inputs: [&[f32]; 1] = [&input];
        let mut outputs: [&mut [f32]; 1] = [&mut out];
        assert!(p.process(&inputs, &mut outputs, &SCALE.defaults()));
        assert_eq!(out, [2.0, -1.0]);
        assert_eq!(p.latency_samples(), 0);
    }
}
